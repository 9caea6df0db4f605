//! Message relay backend.
//!
//! Each appended line is parsed into a structured [`RelayRecord`] and handed
//! to a [`RelaySink`], typically a bounded channel drained by a forwarder
//! to an external message queue. Nothing is cached, so the archival
//! capabilities report `Unsupported`.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use pilotlog_core::{
    AppendReceipt, BackendMetadata, DeleteReport, EvictionReport, FinalizePayload, LogListing,
    LogMessage, PilotIdentity, PilotLogRecord, PilotLogResult, StorageError, TenantId,
    ValidationError,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::traits::LogCacheBackend;

pub const BACKEND_NAME: &str = "relay";

/// Default capacity of the in-process relay channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

// e.g. 2022-06-10T11:02:02,823512Z DEBUG [pilotLogger] X509_USER_PROXY=/scratch/user.proxy
static LINE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<date>[0-9-]+)T(?P<time>[0-9:,]+)Z (?P<level>DEBUG|INFO|ERROR|NOTICE) (?:\[(?P<source>[a-zA-Z]+)\] )?(?P<message>.*)$",
    )
    .expect("relay line pattern is valid")
});

/// One structured pilot log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRecord {
    pub date: String,
    pub time: String,
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub message: String,
}

impl RelayRecord {
    /// Parse a single pilot log line; `None` when it is not in pilot format.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = LINE_PATTERN.captures(line)?;
        Some(Self {
            date: caps.name("date")?.as_str().to_string(),
            time: caps.name("time")?.as_str().to_string(),
            level: caps.name("level")?.as_str().to_string(),
            source: caps.name("source").map(|m| m.as_str().to_string()),
            message: caps.name("message")?.as_str().to_string(),
        })
    }
}

/// Records of one append call, addressed to their pilot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayEnvelope {
    pub tenant: TenantId,
    pub identity: PilotIdentity,
    pub records: Vec<RelayRecord>,
}

/// Destination for relayed records.
#[async_trait]
pub trait RelaySink: Send + Sync {
    async fn publish(&self, envelope: RelayEnvelope) -> PilotLogResult<()>;
}

/// Sink backed by a bounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<RelayEnvelope>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RelayEnvelope>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl RelaySink for ChannelSink {
    async fn publish(&self, envelope: RelayEnvelope) -> PilotLogResult<()> {
        self.tx.send(envelope).await.map_err(|e| {
            StorageError::RelayClosed {
                reason: e.to_string(),
            }
            .into()
        })
    }
}

pub struct MessageRelayBackend {
    sink: std::sync::Arc<dyn RelaySink>,
}

impl std::fmt::Debug for MessageRelayBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRelayBackend").finish_non_exhaustive()
    }
}

impl MessageRelayBackend {
    pub fn new(sink: std::sync::Arc<dyn RelaySink>) -> Self {
        Self { sink }
    }

    /// Backend plus the receiving end of its channel.
    pub fn with_channel(capacity: usize) -> (Self, mpsc::Receiver<RelayEnvelope>) {
        let (sink, rx) = ChannelSink::new(capacity);
        (Self::new(std::sync::Arc::new(sink)), rx)
    }

    fn unsupported(capability: &str) -> StorageError {
        StorageError::Unsupported {
            backend: BACKEND_NAME.to_string(),
            capability: capability.to_string(),
        }
    }
}

/// Parse every line of a message. One bad line rejects the whole message.
pub fn parse_message(message: &LogMessage) -> Result<Vec<RelayRecord>, ValidationError> {
    message
        .lines()
        .into_iter()
        .enumerate()
        .map(|(idx, line)| {
            RelayRecord::parse(line).ok_or_else(|| ValidationError::InvalidPayload {
                reason: format!("line {idx} is not a pilot log line: {line:?}"),
            })
        })
        .collect()
}

#[async_trait]
impl LogCacheBackend for MessageRelayBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn append(
        &self,
        tenant: &TenantId,
        identity: &PilotIdentity,
        message: &LogMessage,
    ) -> PilotLogResult<AppendReceipt> {
        let records = parse_message(message)?;
        let count = records.len();
        self.sink
            .publish(RelayEnvelope {
                tenant: tenant.clone(),
                identity: identity.clone(),
                records,
            })
            .await?;
        debug!(tenant = %tenant, identity = %identity, records = count, "Relayed pilot log lines");
        Ok(AppendReceipt {
            identity: identity.to_string(),
            tenant: tenant.to_string(),
            bytes_written: 0,
        })
    }

    async fn finalize(
        &self,
        _tenant: &TenantId,
        _identity: &PilotIdentity,
        _payload: &FinalizePayload,
    ) -> PilotLogResult<()> {
        Err(Self::unsupported("finalize").into())
    }

    async fn list(&self, _tenant: &TenantId) -> PilotLogResult<LogListing> {
        Err(Self::unsupported("list").into())
    }

    async fn read(
        &self,
        _tenant: &TenantId,
        _identity: &PilotIdentity,
    ) -> PilotLogResult<PilotLogRecord> {
        Err(Self::unsupported("read").into())
    }

    async fn delete(&self, _tenant: &TenantId, _identities: &[String]) -> PilotLogResult<DeleteReport> {
        Err(Self::unsupported("delete").into())
    }

    async fn evict(&self, _tenant: &TenantId, _retention_days: u32) -> PilotLogResult<EvictionReport> {
        Err(Self::unsupported("evict").into())
    }

    async fn metadata(&self) -> PilotLogResult<BackendMetadata> {
        Err(StorageError::NoLogRoot {
            backend: BACKEND_NAME.to_string(),
            reason: "records are relayed, not stored".to_string(),
        }
        .into())
    }
}
