//! Pilot log core types.
//!
//! Identity classification, tenant namespaces, log records, tagged payloads,
//! backend report shapes and the shared error taxonomy. This crate performs
//! no I/O.

pub mod error;
pub mod identity;
pub mod payload;
pub mod record;
pub mod report;

pub use error::*;
pub use identity::{classify, IdentityClass, PilotIdentity};
pub use payload::{FinalizePayload, LogMessage};
pub use record::{is_expired, LogState, PilotLogRecord, TenantId, FINALIZED_SUFFIX, MAX_TENANT_LEN};
pub use report::{AppendReceipt, BackendMetadata, DeleteReport, EvictionReport, LogListing};
