//! Error Types for the Pilot Log API
//!
//! This module defines error handling for the HTTP layer, including:
//! - ApiError struct for structured error responses
//! - ErrorCode enum for categorizing errors
//! - IntoResponse implementation for Axum HTTP responses
//! - Conversion from the core `PilotLogError` taxonomy
//!
//! All errors are serialized as JSON with appropriate HTTP status codes.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pilotlog_core::{ConfigError, PilotLogError, StorageError, UploadError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
///
/// Each error code maps to a specific HTTP status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Authentication Errors (401, 403)
    // ========================================================================
    /// Request lacks a known API key
    Unauthorized,

    /// Caller role may not invoke the operation, or has no tenant
    Forbidden,

    // ========================================================================
    // Validation Errors (400)
    // ========================================================================
    /// Pilot identity is neither a stamp nor a canonical UUID
    InvalidIdentity,

    /// Tenant name is not a valid namespace
    InvalidTenant,

    /// Request body could not be interpreted
    InvalidInput,

    // ========================================================================
    // Not Found Errors (404)
    // ========================================================================
    /// No record for the identity in the tenant
    LogNotFound,

    // ========================================================================
    // Conflict Errors (409)
    // ========================================================================
    /// Operation conflicts with the record's lifecycle state
    StateConflict,

    // ========================================================================
    // Server Errors (500, 501, 503)
    // ========================================================================
    /// Local storage failure
    StorageError,

    /// Configured backend does not provide the capability
    NotSupported,

    /// Internal server error
    InternalError,

    /// Backend cannot serve requests
    ServiceUnavailable,
}

impl ErrorCode {
    /// Get the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,

            ErrorCode::InvalidIdentity | ErrorCode::InvalidTenant | ErrorCode::InvalidInput => {
                StatusCode::BAD_REQUEST
            }

            ErrorCode::LogNotFound => StatusCode::NOT_FOUND,
            ErrorCode::StateConflict => StatusCode::CONFLICT,
            ErrorCode::NotSupported => StatusCode::NOT_IMPLEMENTED,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::StorageError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Authentication required",
            ErrorCode::Forbidden => "Access forbidden",
            ErrorCode::InvalidIdentity => "Pilot UUID is invalid",
            ErrorCode::InvalidTenant => "Tenant is invalid",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::LogNotFound => "Pilot log not found",
            ErrorCode::StateConflict => "Operation conflicts with current state",
            ErrorCode::StorageError => "Log storage operation failed",
            ErrorCode::NotSupported => "Operation not supported by the logging backend",
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response for API operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn invalid_identity(identity: &str) -> Self {
        Self::from_code(ErrorCode::InvalidIdentity)
            .with_details(serde_json::json!({ "identity": identity }))
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn log_not_found(tenant: impl fmt::Display, identity: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::LogNotFound,
            format!("No log for pilot {} in tenant {}", identity, tenant),
        )
    }

    pub fn state_conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StateConflict, message)
    }

    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self);
        (status, body).into_response()
    }
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidIdentity { identity } => ApiError::invalid_identity(&identity),
            ValidationError::InvalidTenant { .. } => {
                ApiError::new(ErrorCode::InvalidTenant, err.to_string())
            }
            ValidationError::InvalidPayload { reason } => ApiError::invalid_input(reason),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::NotFound { tenant, identity } => ApiError::log_not_found(tenant, identity),
            StorageError::AlreadyFinalized { .. } => ApiError::state_conflict(err.to_string()),
            StorageError::Unsupported { .. } => ApiError::new(ErrorCode::NotSupported, err.to_string()),
            StorageError::NoLogRoot { .. } | StorageError::RelayClosed { .. } => {
                tracing::warn!(error = %err, "Logging backend unavailable");
                ApiError::service_unavailable(err.to_string())
            }
            StorageError::Io { .. } | StorageError::TaskFailed { .. } => {
                // Log the full error, return a generic message to avoid leaking paths
                tracing::error!(error = %err, "Log storage failure");
                ApiError::from_code(ErrorCode::StorageError)
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        tracing::error!(error = %err, "Configuration error while serving request");
        ApiError::internal_error(err.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        ApiError::internal_error(err.to_string())
    }
}

impl From<PilotLogError> for ApiError {
    fn from(err: PilotLogError) -> Self {
        match err {
            PilotLogError::Storage(e) => e.into(),
            PilotLogError::Validation(e) => e.into(),
            PilotLogError::Config(e) => e.into(),
            PilotLogError::Upload(e) => e.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::invalid_input(format!("Invalid JSON: {}", rejection.body_text()))
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(ErrorCode::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::InvalidIdentity.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::LogNotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::StateConflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ErrorCode::StorageError.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ErrorCode::ServiceUnavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let err: ApiError = PilotLogError::from(StorageError::NotFound {
            tenant: "vo1".to_string(),
            identity: "abc".to_string(),
        })
        .into();
        assert_eq!(err.code, ErrorCode::LogNotFound);
        assert!(err.message.contains("vo1"));
    }

    #[test]
    fn test_io_error_hides_path() {
        let err: ApiError = StorageError::Io {
            operation: "append".to_string(),
            path: "/srv/pilotlogs/vo1/x".to_string(),
            reason: "disk full".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::StorageError);
        assert!(!err.message.contains("/srv"));
    }

    #[test]
    fn test_invalid_identity_carries_details() {
        let err: ApiError = ValidationError::InvalidIdentity {
            identity: "../x".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::InvalidIdentity);
        assert_eq!(err.details, Some(serde_json::json!({ "identity": "../x" })));
    }

    #[test]
    fn test_error_serialization() -> Result<(), serde_json::Error> {
        let err = ApiError::unauthorized("Missing API key");
        let json = serde_json::to_string(&err)?;
        assert!(json.contains("UNAUTHORIZED"));
        assert!(json.contains("Missing API key"));
        assert!(!json.contains("details"));
        Ok(())
    }
}
