use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::voters::sampling::SampleError;
use crate::voters::store::LoadError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Generation failures never reach this type; they are reported per voter.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Voter data error: {0}")]
    Load(#[from] LoadError),

    #[error("Sample error: {0}")]
    Sample(#[from] SampleError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Sample(e) => (StatusCode::BAD_REQUEST, "SAMPLE_ERROR", e.to_string()),
            AppError::Load(e) => {
                tracing::error!("Voter data error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LOAD_ERROR",
                    e.to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_error_is_bad_request() {
        let response = AppError::from(SampleError::NegativeSize(-2)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_load_error_is_server_error() {
        let response =
            AppError::from(LoadError::MissingColumns(vec!["party_id".to_string()])).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
