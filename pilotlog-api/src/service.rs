//! Logging Service front door.
//!
//! Stateless dispatcher between authenticated callers and the configured
//! [`LogCacheBackend`]. Every operation authorizes the caller's role,
//! resolves the target tenant, validates the pilot identity and only then
//! touches the backend, so an invalid request never has side effects.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use pilotlog_core::{
    AppendReceipt, BackendMetadata, DeleteReport, EvictionReport, FinalizePayload, LogListing,
    LogMessage, PilotIdentity, PilotLogRecord, PilotLogResult, TenantId,
};
use pilotlog_storage::LogCacheBackend;

use crate::auth::{AuthContext, Operation};
use crate::error::{ApiError, ApiResult};
use crate::telemetry::with_metrics;

/// Tenant-resolving front door over a log cache backend.
#[derive(Clone)]
pub struct LoggingService {
    backend: Arc<dyn LogCacheBackend>,
}

impl std::fmt::Debug for LoggingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggingService")
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl LoggingService {
    pub fn new(backend: Arc<dyn LogCacheBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn LogCacheBackend> {
        &self.backend
    }

    // ========================================================================
    // PILOT OPERATIONS (caller's own tenant)
    // ========================================================================

    /// sendMessage: append a message to the caller's pilot log.
    pub async fn send_message(
        &self,
        auth: &AuthContext,
        identity: &str,
        message: &LogMessage,
    ) -> ApiResult<AppendReceipt> {
        auth.authorize(Operation::Append)?;
        let tenant = auth.own_tenant()?;
        let identity = parse_identity(identity)?;

        self.observe(Operation::Append, self.backend.append(tenant, &identity, message))
            .await
    }

    /// finaliseLogs: mark the caller's pilot log complete.
    pub async fn finalise_logs(
        &self,
        auth: &AuthContext,
        identity: &str,
        payload: &FinalizePayload,
    ) -> ApiResult<()> {
        auth.authorize(Operation::Finalize)?;
        let tenant = auth.own_tenant()?;
        let identity = parse_identity(identity)?;

        self.observe(
            Operation::Finalize,
            self.backend.finalize(tenant, &identity, payload),
        )
        .await
    }

    /// getLog for the caller's own tenant.
    pub async fn get_log(&self, auth: &AuthContext, identity: &str) -> ApiResult<PilotLogRecord> {
        auth.authorize(Operation::Read)?;
        let tenant = auth.own_tenant()?;
        let identity = parse_identity(identity)?;

        self.observe(Operation::Read, self.backend.read(tenant, &identity))
            .await
    }

    /// getLog for an explicit tenant. Reading outside the caller's own
    /// tenant needs the administrative roles.
    pub async fn get_tenant_log(
        &self,
        auth: &AuthContext,
        tenant: &str,
        identity: &str,
    ) -> ApiResult<PilotLogRecord> {
        let tenant = TenantId::parse(tenant)?;
        if auth.tenant.as_ref() == Some(&tenant) {
            auth.authorize(Operation::Read)?;
        } else {
            auth.authorize(Operation::List)?;
        }
        let identity = parse_identity(identity)?;

        self.observe(Operation::Read, self.backend.read(&tenant, &identity))
            .await
    }

    // ========================================================================
    // ADMINISTRATIVE OPERATIONS
    // ========================================================================

    /// getMetadata: backend descriptor.
    pub async fn get_metadata(&self, auth: &AuthContext) -> ApiResult<BackendMetadata> {
        auth.authorize(Operation::Metadata)?;
        self.observe(Operation::Metadata, self.backend.metadata())
            .await
    }

    /// getLogs: all finalized logs of a tenant.
    pub async fn get_logs(&self, auth: &AuthContext, tenant: &str) -> ApiResult<LogListing> {
        auth.authorize(Operation::List)?;
        let tenant = TenantId::parse(tenant)?;
        self.observe(Operation::List, self.backend.list(&tenant))
            .await
    }

    /// deleteLogs: best-effort bulk delete.
    pub async fn delete_logs(
        &self,
        auth: &AuthContext,
        tenant: &str,
        identities: &[String],
    ) -> ApiResult<DeleteReport> {
        auth.authorize(Operation::Delete)?;
        let tenant = TenantId::parse(tenant)?;
        let report = self
            .observe(Operation::Delete, self.backend.delete(&tenant, identities))
            .await?;
        tracing::info!(
            principal = %auth.caller.principal,
            tenant = %tenant,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Deleted pilot logs"
        );
        Ok(report)
    }

    /// clearLogs: evict records older than the retention window.
    pub async fn clear_logs(
        &self,
        auth: &AuthContext,
        tenant: &str,
        retention_days: u32,
    ) -> ApiResult<EvictionReport> {
        auth.authorize(Operation::Evict)?;
        let tenant = TenantId::parse(tenant)?;
        let report = self
            .observe(Operation::Evict, self.backend.evict(&tenant, retention_days))
            .await?;
        with_metrics(|m| m.record_evicted(tenant.as_str(), report.evicted.len()));
        Ok(report)
    }

    /// Run one backend call and record its outcome.
    async fn observe<T, F>(&self, operation: Operation, call: F) -> ApiResult<T>
    where
        F: Future<Output = PilotLogResult<T>>,
    {
        let start = Instant::now();
        let result = call.await;
        with_metrics(|m| {
            m.record_backend_operation(
                self.backend.name(),
                operation.as_str(),
                result.is_ok(),
                start.elapsed().as_secs_f64(),
            )
        });
        if let Err(e) = &result {
            tracing::debug!(operation = %operation, error = %e, "Backend operation failed");
        }
        result.map_err(ApiError::from)
    }
}

fn parse_identity(identity: &str) -> ApiResult<PilotIdentity> {
    PilotIdentity::parse(identity).map_err(|e| {
        tracing::warn!(identity = %identity, "Rejected invalid pilot identity");
        ApiError::from(e)
    })
}
