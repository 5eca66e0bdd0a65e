//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use regwatch_common::RegwatchError;
use serde_json::json;
use thiserror::Error;

/// Result type alias for handlers
pub type AppResult<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("a run is already in progress")]
    Busy,

    #[error(transparent)]
    Job(RegwatchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<RegwatchError> for AppError {
    fn from(err: RegwatchError) -> Self {
        match err {
            RegwatchError::Config(message) => AppError::Config(message),
            other => AppError::Job(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, json!({ "error": "unauthorized" })),
            AppError::Busy => (
                StatusCode::CONFLICT,
                json!({ "ok": false, "error": self.to_string() }),
            ),
            AppError::Job(ref e) => {
                tracing::error!(error = %e, "Daily run failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "error": e.to_string() }),
                )
            },
            AppError::Internal(ref message) => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "error": self.to_string() }),
                )
            },
            AppError::Config(ref message) => {
                tracing::error!("Configuration error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "error": self.to_string() }),
                )
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_body() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({ "error": "unauthorized" }));
    }

    #[tokio::test]
    async fn test_busy_is_conflict() {
        let response = AppError::Busy.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            body_json(response).await,
            json!({ "ok": false, "error": "a run is already in progress" })
        );
    }

    #[tokio::test]
    async fn test_job_error_carries_message() {
        let response = AppError::from(RegwatchError::NoDateField).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "ok": false, "error": "Could not detect date field" })
        );
    }

    #[tokio::test]
    async fn test_internal_error_is_server_error() {
        let response = AppError::Internal("run task failed: panicked".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "ok": false, "error": "Internal server error: run task failed: panicked" })
        );
    }

    #[test]
    fn test_config_errors_are_split_out() {
        let err = AppError::from(RegwatchError::Config("bad client".into()));
        assert!(matches!(err, AppError::Config(_)));
    }
}
