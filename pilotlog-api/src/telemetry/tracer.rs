//! Tracing subscriber initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ApiError, ApiResult};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "pilotlog_api=debug,pilotlog_storage=info,tower_http=info,info";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to the startup log
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Emit JSON log lines instead of human-readable text
    pub json_logs: bool,

    /// Expose `/metrics`
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "pilotlog-api".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            json_logs: true,
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Environment variables:
    /// - `PILOTLOG_SERVICE_NAME` (default: pilotlog-api)
    /// - `PILOTLOG_LOG_JSON`: "true"/"1" for JSON lines (default: true)
    /// - `PILOTLOG_METRICS_ENABLED`: "true"/"1" (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: std::env::var("PILOTLOG_SERVICE_NAME").unwrap_or(defaults.service_name),
            service_version: defaults.service_version,
            json_logs: std::env::var("PILOTLOG_LOG_JSON")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.json_logs),
            metrics_enabled: std::env::var("PILOTLOG_METRICS_ENABLED")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }
}

/// Install the global tracing subscriber. Call once at startup.
pub fn init_tracing(config: &TelemetryConfig) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let result = if config.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };
    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))?;

    tracing::info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        json_logs = config.json_logs,
        "Telemetry initialized"
    );
    Ok(())
}
