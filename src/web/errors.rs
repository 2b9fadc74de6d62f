//! # Web API Error Types
//!
//! Errors returned by handlers and their HTTP response conversions.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::error::StormTrackerError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found")]
    NotFound,

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    #[error("Service temporarily unavailable")]
    ServiceUnavailable,

    #[error("Database operation failed: {operation}")]
    DatabaseError { operation: String },

    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn database_error(operation: impl Into<String>) -> Self {
        Self::DatabaseError {
            operation: operation.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::DatabaseError { .. } | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound => "NOT_FOUND",
            ApiError::BadRequest { .. } => "BAD_REQUEST",
            ApiError::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ApiError::DatabaseError { .. } => "DATABASE_ERROR",
            ApiError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl From<StormTrackerError> for ApiError {
    fn from(err: StormTrackerError) -> Self {
        match err {
            StormTrackerError::StormNotFound { .. } => ApiError::NotFound,
            StormTrackerError::DatabaseError(message) => {
                // Driver detail stays in the logs
                error!(error = %message, "Repository operation failed");
                ApiError::database_error("storm repository")
            }
            other => {
                error!(error = %other, "Unhandled error in web handler");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.error_code(),
            "message": self.to_string(),
        }));
        (self.status_code(), body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::bad_request("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::ServiceUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::database_error("count").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_tracker_error() {
        let err: ApiError = StormTrackerError::StormNotFound { id: 7 }.into();
        assert!(matches!(err, ApiError::NotFound));

        let err: ApiError = StormTrackerError::DatabaseError("connection reset".into()).into();
        assert!(matches!(err, ApiError::DatabaseError { .. }));
        assert!(!err.to_string().contains("connection reset"));
    }
}
