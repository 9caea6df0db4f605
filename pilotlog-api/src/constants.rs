//! Constants for the Pilot Log API
//!
//! Centralizes default values used by configuration and the agent.

// ============================================================================
// SERVER
// ============================================================================

/// Default bind host
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Default request body limit (bytes). Pilot messages are batches of lines.
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 4 * 1024 * 1024;

/// Default per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Header carrying the caller's API key
pub const API_KEY_HEADER: &str = "x-api-key";

// ============================================================================
// STORAGE
// ============================================================================

/// Default log cache directory name, relative to the working directory
pub const DEFAULT_LOG_ROOT_DIR: &str = "pilotlogs";

/// Default backend registry key
pub const DEFAULT_BACKEND: &str = "file";

// ============================================================================
// UPLOAD AGENT
// ============================================================================

/// Default interval between agent cycles (1 hour)
pub const DEFAULT_AGENT_INTERVAL_SECS: u64 = 3600;

/// Default timeout for a single archive upload
pub const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 120;

/// Default cache retention window
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Default archive directory name for the local archive store
pub const DEFAULT_ARCHIVE_ROOT_DIR: &str = "pilotlog-archive";
