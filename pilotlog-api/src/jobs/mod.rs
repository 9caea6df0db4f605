//! Background Jobs for the Pilot Log API
//!
//! - `log_upload`: archives finalized pilot logs and evicts stale records
//!
//! # Usage
//!
//! The agent is spawned during server startup when enabled:
//!
//! ```ignore
//! use pilotlog_api::jobs::{upload_agent_task, LocalArchiveStore, UploadAgent, UploadAgentConfig};
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! let agent = UploadAgent::new(backend, Arc::new(LocalArchiveStore::new(root)), settings, config);
//! tokio::spawn(upload_agent_task(agent, shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod archive;
pub mod log_upload;
pub mod tenant_settings;

pub use archive::{ArchiveRequest, ArchiveStore, LocalArchiveStore};
pub use log_upload::{
    archive_lfn, upload_agent_task, CycleReport, TenantOutcome, UploadAgent, UploadAgentConfig,
    UploadAgentMetrics, UploadAgentSnapshot,
};
pub use tenant_settings::{StaticTenantSettings, TenantArchiveSettings, TenantSettings};
