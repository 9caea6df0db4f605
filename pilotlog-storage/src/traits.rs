//! Log cache backend capability set.
//!
//! Every backend variant implements the same set of operations so the
//! service front door and the upload agent can hold an
//! `Arc<dyn LogCacheBackend>` chosen once at startup.

use async_trait::async_trait;
use pilotlog_core::{
    AppendReceipt, BackendMetadata, DeleteReport, EvictionReport, FinalizePayload, LogListing,
    LogMessage, PilotIdentity, PilotLogRecord, PilotLogResult, TenantId,
};

/// Cache backend trait for pluggable log stores.
///
/// Identities and tenants arrive already validated. Implementations must be
/// safe to call concurrently for distinct identities; calls for the same
/// identity are expected to be sequential, but each append and finalize is
/// still atomic at the record level.
#[async_trait]
pub trait LogCacheBackend: Send + Sync {
    /// Short name used in logs, metrics and metadata.
    fn name(&self) -> &'static str;

    /// Append one message to the Open record, creating it if needed.
    ///
    /// All-or-nothing: on failure no partial line is left behind.
    async fn append(
        &self,
        tenant: &TenantId,
        identity: &PilotIdentity,
        message: &LogMessage,
    ) -> PilotLogResult<AppendReceipt>;

    /// Transition the Open record to Finalized.
    ///
    /// Fails with `NotFound` when no Open record exists, so a second
    /// finalize of the same identity fails.
    async fn finalize(
        &self,
        tenant: &TenantId,
        identity: &PilotIdentity,
        payload: &FinalizePayload,
    ) -> PilotLogResult<()>;

    /// All Finalized records of a tenant, for archival pickup.
    async fn list(&self, tenant: &TenantId) -> PilotLogResult<LogListing>;

    /// Full content of one record, preferring the Open one.
    async fn read(&self, tenant: &TenantId, identity: &PilotIdentity)
        -> PilotLogResult<PilotLogRecord>;

    /// Best-effort bulk delete of Finalized records.
    ///
    /// Per-item problems, including invalid or missing identities, are
    /// reported in the result and never fail the call.
    async fn delete(&self, tenant: &TenantId, identities: &[String])
        -> PilotLogResult<DeleteReport>;

    /// Remove records in any state whose last modification is at least
    /// `retention_days` old.
    async fn evict(&self, tenant: &TenantId, retention_days: u32)
        -> PilotLogResult<EvictionReport>;

    /// Operational facts. Errors when no usable log root exists.
    async fn metadata(&self) -> PilotLogResult<BackendMetadata>;
}
