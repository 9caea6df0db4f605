//! Pilot Log API Server Entry Point
//!
//! Bootstraps configuration, builds the configured cache backend, spawns the
//! upload agent when enabled, and serves the Axum router until Ctrl-C.

use std::sync::Arc;

use axum::Router;
use pilotlog_api::jobs::{
    upload_agent_task, LocalArchiveStore, StaticTenantSettings, UploadAgent, UploadAgentConfig,
};
use pilotlog_api::telemetry::{init_tracing, TelemetryConfig};
use pilotlog_api::{create_api_router, ApiError, ApiResult, AuthConfig, LoggingService, ServiceConfig};
use pilotlog_storage::{BackendRegistry, LogCacheBackend, RelayEnvelope};
use tokio::sync::{mpsc, watch};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    init_tracing(&telemetry_config)?;

    let config = ServiceConfig::from_env()?;
    let auth_config = AuthConfig::from_env()?;
    let agent_config = UploadAgentConfig::from_env()?;

    let handle = BackendRegistry::builtin().build(&config.backend, &config.backend_settings())?;
    let backend = handle.backend;
    tracing::info!(backend = backend.name(), log_root = %config.log_root.display(), "Log cache backend ready");

    if let Some(relay_rx) = handle.relay_rx {
        tokio::spawn(forward_relay(relay_rx));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let agent_handle = if agent_config.enabled {
        let raw = std::env::var("PILOTLOG_TENANT_SETTINGS").unwrap_or_default();
        let settings = StaticTenantSettings::parse(&raw)?;
        if settings.is_empty() {
            tracing::warn!("Upload agent enabled but no tenants are configured");
        }
        let archive = LocalArchiveStore::new(agent_config.archive_root.clone());
        let agent = UploadAgent::new(
            backend.clone(),
            Arc::new(archive),
            Arc::new(settings),
            agent_config,
        );
        Some(tokio::spawn(upload_agent_task(agent, shutdown_rx)))
    } else {
        tracing::info!("Upload agent disabled");
        None
    };

    let service = LoggingService::new(backend);
    let app: Router = create_api_router(service, &config, auth_config, &telemetry_config);

    let addr = config.bind_addr()?;
    tracing::info!(%addr, "Starting pilot log API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Could not listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await
        .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    let _ = shutdown_tx.send(true);
    if let Some(agent_handle) = agent_handle {
        if let Err(e) = agent_handle.await {
            tracing::error!(error = %e, "Upload agent task failed");
        }
    }

    Ok(())
}

/// Drain relayed records. Downstream delivery is out of process; here the
/// records are surfaced in the structured log.
async fn forward_relay(mut relay_rx: mpsc::Receiver<RelayEnvelope>) {
    while let Some(envelope) = relay_rx.recv().await {
        for record in &envelope.records {
            tracing::debug!(
                tenant = %envelope.tenant,
                identity = %envelope.identity,
                level = %record.level,
                source = record.source.as_deref().unwrap_or(""),
                message = %record.message,
                "Relayed pilot log record"
            );
        }
    }
    tracing::info!("Relay channel closed");
}
