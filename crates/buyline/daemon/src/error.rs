//! Error types for buyline-daemon

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use buyline_storage::StorageError;
use buyline_workflow::WorkflowError;
use serde::Serialize;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server startup error
    #[error("server error: {0}")]
    Server(String),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Notification channel error
    #[error("notification error: {0}")]
    Notify(#[from] buyline_notify::NotifyError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;

/// API-facing errors, mapped onto HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Write conflicted with a concurrent actor; the caller can retry
    #[error("conflict: {0}")]
    Conflict(String),

    /// The step already carries a decision; retrying cannot help
    #[error("already decided: {0}")]
    AlreadyDecided(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::AlreadyDecided(_) => (StatusCode::CONFLICT, "ALREADY_DECIDED"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(detail) => ApiError::NotFound(detail),
            StorageError::Conflict(detail) => ApiError::Conflict(detail),
            StorageError::InvariantViolation(detail) => ApiError::Conflict(detail),
            StorageError::InvalidInput(detail) => ApiError::BadRequest(detail),
            StorageError::Serialization(detail) | StorageError::Backend(detail) => {
                ApiError::Internal(detail)
            }
        }
    }
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::Storage(inner) => inner.into(),
            other if other.is_validation() => ApiError::BadRequest(other.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buyline_adserver::AdServerError;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::NotFound("x".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::BadRequest("x".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Conflict("x".to_string()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::AlreadyDecided("x".to_string())
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("x".to_string()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_errors_map_to_http_classes() {
        assert!(matches!(
            ApiError::from(StorageError::NotFound("gone".to_string())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(StorageError::Conflict("version".to_string())),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from(StorageError::InvalidInput("bad".to_string())),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(StorageError::Backend("down".to_string())),
            ApiError::Internal(_)
        ));
    }

    #[test]
    fn test_workflow_validation_maps_to_bad_request() {
        let err = WorkflowError::InvalidRequest("budget must be positive".to_string());
        assert!(matches!(ApiError::from(err), ApiError::BadRequest(_)));

        let err = WorkflowError::AdServer(AdServerError::UnknownLineItemType(
            "takeover".to_string(),
        ));
        assert!(matches!(ApiError::from(err), ApiError::BadRequest(_)));

        let err = WorkflowError::AdServer(AdServerError::Unavailable("down".to_string()));
        assert!(matches!(ApiError::from(err), ApiError::Internal(_)));
    }
}
