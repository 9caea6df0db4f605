//! Result shapes returned by backend operations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Acknowledgement for a successful append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AppendReceipt {
    pub identity: String,
    pub tenant: String,
    pub bytes_written: usize,
}

/// Finalized records of one tenant, split by read outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct LogListing {
    /// identity -> content
    pub successful: BTreeMap<String, String>,
    /// identity -> reason
    pub failed: BTreeMap<String, String>,
}

impl LogListing {
    pub fn is_empty(&self) -> bool {
        self.successful.is_empty() && self.failed.is_empty()
    }
}

/// Outcome of a best-effort bulk delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: BTreeMap<String, String>,
}

/// Outcome of an eviction scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct EvictionReport {
    /// Storage names removed, in either state.
    pub evicted: Vec<String>,
    pub failed: BTreeMap<String, String>,
}

/// Operational facts a backend reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct BackendMetadata {
    pub backend: String,
    pub log_root: String,
}
