//! Pilot Log Upload/Eviction Background Task
//!
//! One cycle visits every configured tenant, independently and in parallel:
//!
//! 1. Skip the tenant when remote logging is disabled; fail it with a
//!    configuration error when its upload target or path is missing.
//! 2. List the tenant's finalized logs.
//! 3. Stage each log in a temporary file and upload it to the archive
//!    store, bounded by a per-upload timeout.
//! 4. Delete exactly the logs that uploaded. Failed uploads stay finalized
//!    in the cache and are retried next cycle (at-least-once delivery).
//! 5. Evict records older than the retention window, whatever their state.
//!
//! A failure is attributed to its identity or tenant and never aborts the
//! rest of the cycle.
//!
//! # Configuration
//!
//! ```rust
//! use pilotlog_api::jobs::UploadAgentConfig;
//! use std::time::Duration;
//!
//! let config = UploadAgentConfig {
//!     enabled: true,
//!     interval: Duration::from_secs(3600),     // one cycle per hour
//!     upload_timeout: Duration::from_secs(120),
//!     retention_days: 30,
//!     archive_root: "/srv/pilot-archive".into(),
//! };
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pilotlog_core::{ConfigError, PilotIdentity, TenantId, UploadError};
use pilotlog_storage::LogCacheBackend;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};

use super::archive::{ArchiveRequest, ArchiveStore};
use super::tenant_settings::TenantSettings;
use crate::config::{env_flag, env_or};
use crate::constants::{
    DEFAULT_AGENT_INTERVAL_SECS, DEFAULT_ARCHIVE_ROOT_DIR, DEFAULT_RETENTION_DAYS,
    DEFAULT_UPLOAD_TIMEOUT_SECS,
};
use crate::telemetry::with_metrics;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the upload agent.
#[derive(Debug, Clone)]
pub struct UploadAgentConfig {
    /// Whether the server spawns the agent at all (default: false)
    pub enabled: bool,

    /// Time between cycles (default: 1 hour)
    pub interval: Duration,

    /// Bound on a single upload; a timeout fails only that record
    /// (default: 120 seconds)
    pub upload_timeout: Duration,

    /// Cache retention window for eviction (default: 30 days)
    pub retention_days: u32,

    /// Root of the local archive store
    pub archive_root: PathBuf,
}

impl Default for UploadAgentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(DEFAULT_AGENT_INTERVAL_SECS),
            upload_timeout: Duration::from_secs(DEFAULT_UPLOAD_TIMEOUT_SECS),
            retention_days: DEFAULT_RETENTION_DAYS,
            archive_root: PathBuf::from(DEFAULT_ARCHIVE_ROOT_DIR),
        }
    }
}

impl UploadAgentConfig {
    /// Create UploadAgentConfig from environment variables.
    ///
    /// # Environment Variables
    /// - `PILOTLOG_AGENT_ENABLED`: spawn the agent (default: false)
    /// - `PILOTLOG_AGENT_INTERVAL_SECS`: cycle interval (default: 3600)
    /// - `PILOTLOG_UPLOAD_TIMEOUT_SECS`: per-upload timeout (default: 120)
    /// - `PILOTLOG_RETENTION_DAYS`: eviction window (default: 30)
    /// - `PILOTLOG_ARCHIVE_ROOT`: local archive directory (default: pilotlog-archive)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let interval_secs = env_or("PILOTLOG_AGENT_INTERVAL_SECS", DEFAULT_AGENT_INTERVAL_SECS)?;
        if interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "PILOTLOG_AGENT_INTERVAL_SECS".to_string(),
                value: "0".to_string(),
                reason: "interval must be positive".to_string(),
            });
        }
        Ok(Self {
            enabled: env_flag("PILOTLOG_AGENT_ENABLED", defaults.enabled)?,
            interval: Duration::from_secs(interval_secs),
            upload_timeout: Duration::from_secs(env_or(
                "PILOTLOG_UPLOAD_TIMEOUT_SECS",
                DEFAULT_UPLOAD_TIMEOUT_SECS,
            )?),
            retention_days: env_or("PILOTLOG_RETENTION_DAYS", defaults.retention_days)?,
            archive_root: std::env::var("PILOTLOG_ARCHIVE_ROOT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.archive_root),
        })
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters for agent activity since startup.
#[derive(Debug, Default)]
pub struct UploadAgentMetrics {
    pub cycles: AtomicU64,
    pub uploaded: AtomicU64,
    pub upload_failures: AtomicU64,
    pub evicted: AtomicU64,
    pub tenant_errors: AtomicU64,
}

impl UploadAgentMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> UploadAgentSnapshot {
        UploadAgentSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            uploaded: self.uploaded.load(Ordering::Relaxed),
            upload_failures: self.upload_failures.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            tenant_errors: self.tenant_errors.load(Ordering::Relaxed),
        }
    }

    fn record(&self, report: &CycleReport) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        for outcome in report.tenants.values() {
            self.uploaded
                .fetch_add(outcome.uploaded.len() as u64, Ordering::Relaxed);
            self.upload_failures
                .fetch_add(outcome.upload_failures.len() as u64, Ordering::Relaxed);
            self.evicted.fetch_add(outcome.evicted as u64, Ordering::Relaxed);
            if outcome.error.is_some() {
                self.tenant_errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Snapshot of agent metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAgentSnapshot {
    pub cycles: u64,
    pub uploaded: u64,
    pub upload_failures: u64,
    pub evicted: u64,
    pub tenant_errors: u64,
}

// ============================================================================
// CYCLE RESULTS
// ============================================================================

/// What one cycle did for one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantOutcome {
    /// Remote logging disabled; nothing was touched.
    pub skipped: bool,
    /// Identities archived and removed from the cache.
    pub uploaded: Vec<String>,
    /// identity -> reason; these remain cached for the next cycle.
    pub upload_failures: BTreeMap<String, String>,
    /// Archived identities the cache could not remove. They are uploaded
    /// again next cycle, which the overwrite makes harmless.
    pub delete_failures: BTreeMap<String, String>,
    /// Records removed by eviction.
    pub evicted: usize,
    /// Tenant-level failure: configuration, listing, or a backend call.
    pub error: Option<String>,
}

impl TenantOutcome {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    fn failed(error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    /// Whether this tenant recorded an error.
    pub fn has_error(&self) -> bool {
        self.error.is_some() || !self.upload_failures.is_empty()
    }
}

/// Aggregate result of one agent cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub tenants: BTreeMap<TenantId, TenantOutcome>,
}

impl CycleReport {
    /// False when at least one tenant recorded an error.
    pub fn is_success(&self) -> bool {
        !self.tenants.values().any(TenantOutcome::has_error)
    }

    /// Tenants that recorded an error.
    pub fn failed_tenants(&self) -> Vec<&TenantId> {
        self.tenants
            .iter()
            .filter(|(_, outcome)| outcome.has_error())
            .map(|(tenant, _)| tenant)
            .collect()
    }
}

// ============================================================================
// AGENT
// ============================================================================

/// Moves finalized logs from the cache into durable storage.
#[derive(Clone)]
pub struct UploadAgent {
    backend: Arc<dyn LogCacheBackend>,
    archive: Arc<dyn ArchiveStore>,
    settings: Arc<dyn TenantSettings>,
    config: UploadAgentConfig,
    metrics: Arc<UploadAgentMetrics>,
}

impl std::fmt::Debug for UploadAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadAgent")
            .field("backend", &self.backend.name())
            .field("archive", &self.archive.name())
            .field("config", &self.config)
            .finish()
    }
}

impl UploadAgent {
    pub fn new(
        backend: Arc<dyn LogCacheBackend>,
        archive: Arc<dyn ArchiveStore>,
        settings: Arc<dyn TenantSettings>,
        config: UploadAgentConfig,
    ) -> Self {
        Self {
            backend,
            archive,
            settings,
            config,
            metrics: Arc::new(UploadAgentMetrics::new()),
        }
    }

    pub fn config(&self) -> &UploadAgentConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<UploadAgentMetrics> {
        &self.metrics
    }

    /// Run one cycle over every configured tenant.
    pub async fn run_cycle(&self) -> CycleReport {
        let tenants = self.settings.tenants();
        let mut tasks = JoinSet::new();
        for tenant in tenants.iter().cloned() {
            let agent = self.clone();
            tasks.spawn(async move {
                let outcome = agent.process_tenant(&tenant).await;
                (tenant, outcome)
            });
        }

        let mut report = CycleReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((tenant, outcome)) => {
                    report.tenants.insert(tenant, outcome);
                }
                Err(e) => tracing::error!(error = %e, "Tenant upload task failed"),
            }
        }
        // a panicked task still counts against its tenant
        for tenant in tenants {
            report
                .tenants
                .entry(tenant)
                .or_insert_with(|| TenantOutcome::failed("tenant upload task failed"));
        }

        self.metrics.record(&report);
        if report.is_success() {
            tracing::info!(tenants = report.tenants.len(), "Pilot log upload cycle completed");
        } else {
            tracing::warn!(
                tenants = report.tenants.len(),
                failed = ?report.failed_tenants(),
                "Pilot log upload cycle finished with errors"
            );
        }
        report
    }

    /// One tenant's cycle. Never fails; problems land in the outcome.
    pub async fn process_tenant(&self, tenant: &TenantId) -> TenantOutcome {
        let settings = self.settings.settings(tenant);
        if !settings.enabled {
            tracing::debug!(tenant = %tenant, "Remote pilot logging disabled, skipping");
            return TenantOutcome::skipped();
        }
        let (target, upload_path) = match settings.archive_location(tenant) {
            Ok(location) => location,
            Err(e) => {
                tracing::error!(tenant = %tenant, error = %e, "Tenant archive misconfigured, skipping");
                return TenantOutcome::failed(e);
            }
        };
        tracing::info!(tenant = %tenant, target, upload_path, "Pilot log upload started");

        let mut outcome = TenantOutcome::default();
        match self.backend.list(tenant).await {
            Ok(listing) => {
                for (identity, reason) in listing.failed {
                    outcome.upload_failures.insert(identity, reason);
                }
                for (identity, content) in listing.successful {
                    match self.archive_one(tenant, target, upload_path, &identity, &content).await {
                        Ok(()) => {
                            with_metrics(|m| m.record_upload(true));
                            outcome.uploaded.push(identity);
                        }
                        Err(e) => {
                            with_metrics(|m| m.record_upload(false));
                            tracing::warn!(tenant = %tenant, identity = %identity, error = %e, "Could not upload pilot log");
                            outcome.upload_failures.insert(identity, e.to_string());
                        }
                    }
                }
            }
            Err(e) => {
                tracing::error!(tenant = %tenant, error = %e, "Could not list finalized pilot logs");
                outcome.error = Some(e.to_string());
            }
        }

        if !outcome.uploaded.is_empty() {
            match self.backend.delete(tenant, &outcome.uploaded).await {
                Ok(report) => outcome.delete_failures = report.failed,
                Err(e) => {
                    tracing::error!(tenant = %tenant, error = %e, "Could not delete archived pilot logs");
                    outcome.error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        match self.backend.evict(tenant, self.config.retention_days).await {
            Ok(report) => {
                outcome.evicted = report.evicted.len();
                with_metrics(|m| m.record_evicted(tenant.as_str(), report.evicted.len()));
                for (record, reason) in report.failed {
                    tracing::warn!(tenant = %tenant, record = %record, reason = %reason, "Eviction left a record behind");
                }
            }
            Err(e) => {
                tracing::error!(tenant = %tenant, error = %e, "Pilot log eviction failed");
                outcome.error.get_or_insert_with(|| e.to_string());
            }
        }

        tracing::info!(
            tenant = %tenant,
            uploaded = outcome.uploaded.len(),
            upload_failures = outcome.upload_failures.len(),
            evicted = outcome.evicted,
            "Pilot log upload finished for tenant"
        );
        outcome
    }

    /// Stage one log and upload it under the configured timeout.
    async fn archive_one(
        &self,
        tenant: &TenantId,
        target: &str,
        upload_path: &str,
        identity: &str,
        content: &str,
    ) -> Result<(), UploadError> {
        let staging = |reason: String| UploadError::Staging {
            identity: identity.to_string(),
            reason,
        };
        let pilot = PilotIdentity::parse(identity).map_err(|e| staging(e.to_string()))?;
        let lfn = archive_lfn(tenant, upload_path, &pilot);

        let owned = content.to_owned();
        let staged = tokio::task::spawn_blocking(move || stage_content(&owned))
            .await
            .map_err(|e| staging(format!("staging task failed: {e}")))?
            .map_err(|e| staging(e.to_string()))?;

        let request = ArchiveRequest {
            identity: &pilot,
            target,
            lfn: &lfn,
            local_path: staged.path(),
        };
        let outcome =
            match tokio::time::timeout(self.config.upload_timeout, self.archive.put_and_register(request)).await {
                Ok(result) => result,
                Err(_) => Err(UploadError::Timeout {
                    identity: identity.to_string(),
                    timeout_secs: self.config.upload_timeout.as_secs(),
                }),
            };
        // Unlinking the staged file is blocking I/O too.
        drop(tokio::task::spawn_blocking(move || drop(staged)));
        outcome
    }
}

/// Write record content to a fresh temporary file for the archive to read.
fn stage_content(content: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let mut staged = tempfile::NamedTempFile::new()?;
    staged.write_all(content.as_bytes())?;
    staged.flush()?;
    Ok(staged)
}

/// Logical file name: `/<tenant>/<uploadPath>/<identity>.log`.
pub fn archive_lfn(tenant: &TenantId, upload_path: &str, identity: &PilotIdentity) -> String {
    let upload_path = upload_path.trim_matches('/');
    if upload_path.is_empty() {
        format!("/{}/{}.log", tenant, identity)
    } else {
        format!("/{}/{}/{}.log", tenant, upload_path, identity)
    }
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Background task that runs agent cycles until shutdown.
///
/// The first cycle runs immediately. Missed ticks are skipped rather than
/// replayed, so a slow cycle never causes a burst of catch-up cycles.
///
/// # Example
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = tokio::spawn(upload_agent_task(agent, shutdown_rx));
///
/// // Later, trigger shutdown
/// let _ = shutdown_tx.send(true);
/// let metrics = handle.await?;
/// ```
pub async fn upload_agent_task(
    agent: UploadAgent,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<UploadAgentMetrics> {
    let mut cycle_interval = interval(agent.config.interval);
    cycle_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        interval_secs = agent.config.interval.as_secs(),
        upload_timeout_secs = agent.config.upload_timeout.as_secs(),
        retention_days = agent.config.retention_days,
        "Pilot log upload agent started"
    );

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Pilot log upload agent shutting down");
                    break;
                }
            }

            _ = cycle_interval.tick() => {
                agent.run_cycle().await;
            }
        }
    }

    let snapshot = agent.metrics.snapshot();
    tracing::info!(
        cycles = snapshot.cycles,
        uploaded = snapshot.uploaded,
        upload_failures = snapshot.upload_failures,
        evicted = snapshot.evicted,
        tenant_errors = snapshot.tenant_errors,
        "Pilot log upload agent completed"
    );

    agent.metrics.clone()
}

// ============================================================================
// TESTS
// ============================================================================
