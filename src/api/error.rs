//! API error types and conversions

use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Storage operation failed
    StorageError(String),

    /// Invalid request parameters or body
    InvalidRequest(String),

    /// Resource or endpoint not found
    NotFound(String),

    /// A collaborator is missing, silent or timed out
    Unavailable(String),

    /// Internal server error
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::StorageError(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Value of the `error` field in the response body
    pub fn category(&self) -> &'static str {
        match self {
            ApiError::StorageError(_) => "Database Error",
            ApiError::InvalidRequest(_) => "Bad Request",
            ApiError::NotFound(_) => "Not Found",
            ApiError::Unavailable(_) => "Service Unavailable",
            ApiError::Internal(_) => "Internal Server Error",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ApiError::StorageError(msg)
            | ApiError::InvalidRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unavailable(msg)
            | ApiError::Internal(msg) => msg,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category(), self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.category(),
            "message": self.message(),
        }));

        (self.status(), body).into_response()
    }
}

impl From<crate::storage::error::StorageError> for ApiError {
    fn from(err: crate::storage::error::StorageError) -> Self {
        ApiError::StorageError(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
