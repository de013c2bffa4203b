use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::common::errors::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The store holds no key of the requested class.
    #[error("{0}")]
    KeyUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_key_unavailable() {
            ApiError::KeyUnavailable(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("request task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Both kinds are server-side failures for the caller.
        let detail = match &self {
            ApiError::KeyUnavailable(msg) => {
                tracing::warn!("{}", msg);
                msg.clone()
            }
            ApiError::Internal(msg) => {
                tracing::error!("{}", msg);
                msg.clone()
            }
        };

        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { detail })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_unavailable_keeps_message() {
        let err = ApiError::from(Error::NoValidKey);
        assert!(matches!(&err, ApiError::KeyUnavailable(msg) if msg == "No valid key"));

        let err = ApiError::from(Error::NoExpiredKey);
        assert!(matches!(&err, ApiError::KeyUnavailable(msg) if msg == "No expired key available"));
    }

    #[test]
    fn test_other_errors_are_internal() {
        let err = ApiError::from(Error::key_load("kid-x", "bad pem"));
        assert!(matches!(&err, ApiError::Internal(msg) if msg.contains("kid-x")));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
