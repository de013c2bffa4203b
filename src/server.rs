//! HTTP surface: JWKS publication, token issuance and health.
//!
//! 中文: HTTP 接口，发布公钥集合并签发测试令牌。

pub mod error;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

pub use self::error::{ApiError, ApiResult};
pub use self::state::{AppState, HealthResponse, build_store};

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Key publication
        .route("/.well-known/jwks.json", get(handlers::jwks))
        .route("/jwks", get(handlers::jwks))
        // Token issuance
        .route("/auth", post(handlers::auth))
        // Health
        .route("/health", get(handlers::health))
        .with_state(state)
}
