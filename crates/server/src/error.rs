//! API errors and their HTTP rendering.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use reglens_core::AppError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned by a handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body is not valid JSON (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Body is well-formed but fields are missing or invalid (422)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Generation or search capability failed (502)
    #[error("Upstream capability failed: {0}")]
    Upstream(String),

    /// Anything else (500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Upstream(_) => "UPSTREAM_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        if err.is_capability_failure() {
            Self::Upstream(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => Self::Validation(e.body_text()),
            other => Self::BadRequest(other.body_text()),
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            Self::Upstream(_) | Self::Internal(_) => tracing::error!("API error: {}", self),
            _ => tracing::warn!("API error: {}", self),
        }

        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Validation("x".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Upstream("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_capability_failures_are_upstream() {
        let err: ApiError = AppError::Llm("refused".into()).into();
        assert_eq!(err.error_code(), "UPSTREAM_ERROR");

        let err: ApiError = AppError::Timeout("slow".into()).into();
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let err: ApiError = AppError::Pipeline("bug".into()).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
