//! Error types for pilot log operations

use std::path::Path;
use thiserror::Error;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("No open log for pilot {identity} in tenant {tenant}")]
    NotFound { tenant: String, identity: String },

    #[error("Log for pilot {identity} in tenant {tenant} is already finalized")]
    AlreadyFinalized { tenant: String, identity: String },

    #[error("I/O failure during {operation} on {path}: {reason}")]
    Io {
        operation: String,
        path: String,
        reason: String,
    },

    #[error("Backend {backend} does not support {capability}")]
    Unsupported { backend: String, capability: String },

    #[error("Backend {backend} has no usable log root: {reason}")]
    NoLogRoot { backend: String, reason: String },

    #[error("Relay channel closed: {reason}")]
    RelayClosed { reason: String },

    #[error("Blocking storage task failed: {reason}")]
    TaskFailed { reason: String },
}

impl StorageError {
    /// Build an `Io` error from a std I/O error, keeping the operation and path.
    pub fn io(operation: &str, path: &Path, err: &std::io::Error) -> Self {
        StorageError::Io {
            operation: operation.to_string(),
            path: path.display().to_string(),
            reason: err.to_string(),
        }
    }

    /// Whether this error is the "record does not exist" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

/// Validation errors raised before any mutation happens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Pilot identity is invalid: {identity:?}")]
    InvalidIdentity { identity: String },

    #[error("Tenant name {tenant:?} is invalid: {reason}")]
    InvalidTenant { tenant: String, reason: String },

    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown logging backend: {key}")]
    UnknownBackend { key: String },

    #[error("Tenant {tenant} is misconfigured: {reason}")]
    TenantMisconfigured { tenant: String, reason: String },
}

/// Errors reported by the durable archive collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("Upload of {identity} to {target} rejected: {reason}")]
    Rejected {
        identity: String,
        target: String,
        reason: String,
    },

    #[error("Upload of {identity} timed out after {timeout_secs}s")]
    Timeout { identity: String, timeout_secs: u64 },

    #[error("Could not stage {identity} for upload: {reason}")]
    Staging { identity: String, reason: String },
}

/// Master error type for all pilot log errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PilotLogError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),
}

/// Result type alias for pilot log operations.
pub type PilotLogResult<T> = Result<T, PilotLogError>;

// =============================================================================
// TESTS
// =============================================================================
