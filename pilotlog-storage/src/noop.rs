//! Fallback backend used when remote pilot logging has no store.
//!
//! Messages are only traced at debug level. Nothing is retained, so there is
//! never anything to list, read, delete or evict.

use async_trait::async_trait;
use pilotlog_core::{
    AppendReceipt, BackendMetadata, DeleteReport, EvictionReport, FinalizePayload, LogListing,
    LogMessage, PilotIdentity, PilotLogRecord, PilotLogResult, StorageError, TenantId,
};
use tracing::{debug, warn};

use crate::traits::LogCacheBackend;

pub const BACKEND_NAME: &str = "noop";

#[derive(Debug, Clone, Default)]
pub struct NoopBackend;

impl NoopBackend {
    pub fn new() -> Self {
        warn!("No-op pilot logging backend in use; messages are only traced at debug level");
        Self
    }
}

#[async_trait]
impl LogCacheBackend for NoopBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn append(
        &self,
        tenant: &TenantId,
        identity: &PilotIdentity,
        message: &LogMessage,
    ) -> PilotLogResult<AppendReceipt> {
        let rendered = message.render();
        debug!(tenant = %tenant, identity = %identity, message = %rendered, "Pilot log message");
        Ok(AppendReceipt {
            identity: identity.to_string(),
            tenant: tenant.to_string(),
            bytes_written: 0,
        })
    }

    async fn finalize(
        &self,
        tenant: &TenantId,
        identity: &PilotIdentity,
        payload: &FinalizePayload,
    ) -> PilotLogResult<()> {
        debug!(
            tenant = %tenant,
            identity = %identity,
            ret_code = payload.ret_code_or_default(),
            "Pilot log finalize ignored"
        );
        Ok(())
    }

    async fn list(&self, _tenant: &TenantId) -> PilotLogResult<LogListing> {
        Ok(LogListing::default())
    }

    async fn read(
        &self,
        tenant: &TenantId,
        identity: &PilotIdentity,
    ) -> PilotLogResult<PilotLogRecord> {
        Err(StorageError::NotFound {
            tenant: tenant.to_string(),
            identity: identity.to_string(),
        }
        .into())
    }

    async fn delete(&self, _tenant: &TenantId, _identities: &[String]) -> PilotLogResult<DeleteReport> {
        Ok(DeleteReport::default())
    }

    async fn evict(&self, _tenant: &TenantId, _retention_days: u32) -> PilotLogResult<EvictionReport> {
        Ok(EvictionReport::default())
    }

    async fn metadata(&self) -> PilotLogResult<BackendMetadata> {
        Err(StorageError::NoLogRoot {
            backend: BACKEND_NAME.to_string(),
            reason: "messages are not stored".to_string(),
        }
        .into())
    }
}
