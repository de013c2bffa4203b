use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;

use crate::issuer::TokenIntent;
use crate::server::error::ApiResult;
use crate::server::state::AppState;

/// `/auth` query string. Only `expired=1` selects the expired path.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub expired: Option<String>,
}

impl AuthQuery {
    pub fn intent(&self) -> TokenIntent {
        TokenIntent::from_expired_flag(self.expired.as_deref() == Some("1"))
    }
}

// ============ Key Publication ============

pub async fn jwks(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    // The file store does blocking I/O and key parsing.
    let set = tokio::task::spawn_blocking(move || state.jwks(Utc::now())).await?;
    Ok(Json(set))
}

// ============ Token Issuance ============

pub async fn auth(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AuthQuery>,
) -> ApiResult<impl IntoResponse> {
    let intent = query.intent();
    tracing::debug!(?intent, "Token requested");

    // RSA signing is CPU bound.
    let issued = tokio::task::spawn_blocking(move || state.issue(intent, Utc::now())).await??;
    Ok(Json(issued))
}

// ============ Health ============

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let health = tokio::task::spawn_blocking(move || state.health(Utc::now())).await??;
    Ok(Json(health))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(expired: Option<&str>) -> AuthQuery {
        AuthQuery {
            expired: expired.map(str::to_string),
        }
    }

    #[test]
    fn test_only_literal_one_selects_expired() {
        assert_eq!(query(Some("1")).intent(), TokenIntent::Expired);
        assert_eq!(query(None).intent(), TokenIntent::Valid);
        for other in ["0", "true", "yes", "", "01", " 1"] {
            assert_eq!(query(Some(other)).intent(), TokenIntent::Valid, "value {:?}", other);
        }
    }
}
