//! Service Configuration Module
//!
//! Server, storage and request-hardening settings. Loaded from environment
//! variables with defaults suitable for a single-node deployment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use pilotlog_core::ConfigError;
use pilotlog_storage::BackendSettings;

use crate::constants::{
    DEFAULT_BACKEND, DEFAULT_BIND_HOST, DEFAULT_BODY_LIMIT_BYTES, DEFAULT_LOG_ROOT_DIR,
    DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS,
};

// ============================================================================
// SERVICE CONFIGURATION
// ============================================================================

/// Service configuration for the HTTP front door and its backend.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    // ========================================================================
    // Storage
    // ========================================================================
    /// Root directory of the filesystem log cache.
    pub log_root: PathBuf,

    /// Backend registry key (`file`, `noop`, `relay`).
    pub backend: String,

    /// Relay channel capacity, used by the `relay` backend only.
    pub relay_capacity: usize,

    // ========================================================================
    // Server
    // ========================================================================
    pub bind_host: String,
    pub port: u16,

    /// Maximum request body size in bytes.
    pub body_limit_bytes: usize,

    /// Per-request timeout.
    pub request_timeout: Duration,

    /// Allowed CORS origins. Empty means allow all.
    pub cors_origins: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let log_root = std::env::current_dir()
            .map(|cwd| cwd.join(DEFAULT_LOG_ROOT_DIR))
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOG_ROOT_DIR));
        Self {
            log_root,
            backend: DEFAULT_BACKEND.to_string(),
            relay_capacity: BackendSettings::default().relay_capacity,
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cors_origins: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Create ServiceConfig from environment variables.
    ///
    /// Environment variables:
    /// - `PILOTLOG_LOG_ROOT`: cache directory (default: `<cwd>/pilotlogs`)
    /// - `PILOTLOG_BACKEND`: backend key (default: file)
    /// - `PILOTLOG_RELAY_CAPACITY`: relay channel capacity (default: 1024)
    /// - `PILOTLOG_API_BIND`: bind host (default: 0.0.0.0)
    /// - `PORT` or `PILOTLOG_API_PORT`: listen port (default: 8080)
    /// - `PILOTLOG_BODY_LIMIT_BYTES`: request body limit (default: 4 MiB)
    /// - `PILOTLOG_REQUEST_TIMEOUT_SECS`: request timeout (default: 30)
    /// - `PILOTLOG_CORS_ORIGINS`: comma-separated origins (default: allow all)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let log_root = std::env::var("PILOTLOG_LOG_ROOT")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.log_root);

        let backend = std::env::var("PILOTLOG_BACKEND")
            .ok()
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.backend);

        let port = match std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("PILOTLOG_API_PORT").ok())
        {
            Some(raw) => parse_value("PILOTLOG_API_PORT", &raw)?,
            None => defaults.port,
        };

        let cors_origins = std::env::var("PILOTLOG_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            log_root,
            backend,
            relay_capacity: env_or("PILOTLOG_RELAY_CAPACITY", defaults.relay_capacity)?,
            bind_host: std::env::var("PILOTLOG_API_BIND").unwrap_or(defaults.bind_host),
            port,
            body_limit_bytes: env_or("PILOTLOG_BODY_LIMIT_BYTES", defaults.body_limit_bytes)?,
            request_timeout: Duration::from_secs(env_or(
                "PILOTLOG_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            cors_origins,
        })
    }

    /// Settings handed to the backend registry.
    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            log_root: self.log_root.clone(),
            relay_capacity: self.relay_capacity,
        }
    }

    /// Socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "PILOTLOG_API_BIND".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            })
    }
}

/// Read and parse an optional numeric env var.
pub(crate) fn env_or<T: std::str::FromStr>(field: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(field) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(field, &raw),
        _ => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a boolean flag: "true"/"1"/"yes" are true, "false"/"0"/"no" false.
pub(crate) fn env_flag(field: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(field) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            "" => Ok(default),
            _ => Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: raw,
                reason: "expected true or false".to_string(),
            }),
        },
        Err(_) => Ok(default),
    }
}

// ============================================================================
// TESTS
// ============================================================================
