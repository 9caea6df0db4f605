//! Tenant namespaces and the stored log record.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::identity::PilotIdentity;

/// Longest tenant name accepted as a namespace.
pub const MAX_TENANT_LEN: usize = 128;

/// Suffix that marks a finalized record in path-like layouts.
pub const FINALIZED_SUFFIX: &str = ".log";

static TENANT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9._-]*$").expect("tenant pattern is valid"));

/// A tenant (VO) namespace.
///
/// Tenant names become a directory under the log root, so they are held to a
/// conservative character set and may not start with a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn parse(tenant: &str) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidTenant {
            tenant: tenant.to_string(),
            reason: reason.to_string(),
        };
        if tenant.is_empty() {
            return Err(invalid("empty"));
        }
        if tenant.len() > MAX_TENANT_LEN {
            return Err(invalid("too long"));
        }
        if !TENANT_PATTERN.is_match(tenant) {
            return Err(invalid("contains disallowed characters"));
        }
        Ok(Self(tenant.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for TenantId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        TenantId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Lifecycle state of a record. `Open -> Finalized` is one-way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum LogState {
    Open,
    Finalized,
}

impl LogState {
    /// Filename suffix for a record in this state.
    pub fn suffix(&self) -> &'static str {
        match self {
            LogState::Open => "",
            LogState::Finalized => FINALIZED_SUFFIX,
        }
    }

    /// Storage name of a record for `identity` in this state.
    pub fn file_name(&self, identity: &PilotIdentity) -> String {
        format!("{}{}", identity.as_str(), self.suffix())
    }

    /// Split a storage name back into the identity text and state.
    ///
    /// Returns `None` for names that are neither form, so stray files in a
    /// tenant namespace are ignored.
    pub fn from_file_name(name: &str) -> Option<(PilotIdentity, LogState)> {
        match name.strip_suffix(FINALIZED_SUFFIX) {
            Some(stem) => PilotIdentity::parse(stem)
                .ok()
                .map(|id| (id, LogState::Finalized)),
            None => PilotIdentity::parse(name).ok().map(|id| (id, LogState::Open)),
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, LogState::Finalized)
    }
}

impl fmt::Display for LogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogState::Open => f.write_str("open"),
            LogState::Finalized => f.write_str("finalized"),
        }
    }
}

/// The unit of storage: one pilot's log within one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotLogRecord {
    pub identity: PilotIdentity,
    pub tenant: TenantId,
    pub state: LogState,
    pub content: String,
    pub last_modified: DateTime<Utc>,
}

impl PilotLogRecord {
    /// Content split into lines, without terminators.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.content.lines()
    }

    /// Whether the record is at least `retention_days` old at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, retention_days: u32) -> bool {
        is_expired(self.last_modified, now, retention_days)
    }
}

/// Eviction rule: expired when `last_modified <= now - days * 86400s`.
///
/// A window reaching past the representable range expires nothing.
pub fn is_expired(last_modified: DateTime<Utc>, now: DateTime<Utc>, retention_days: u32) -> bool {
    let window = chrono::Duration::seconds(i64::from(retention_days) * 86_400);
    now.checked_sub_signed(window)
        .is_some_and(|cutoff| last_modified <= cutoff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const STAMP: &str = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4";

    #[test]
    fn test_tenant_accepts_common_vo_names() {
        for name in ["vo1", "lhcb", "my-vo.example", "VO_2"] {
            assert!(TenantId::parse(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_tenant_rejects_unsafe_names() {
        for name in ["", ".", "..", ".hidden", "a/b", "a\\b", "a b"] {
            assert!(TenantId::parse(name).is_err(), "{name:?} should be invalid");
        }
        let long = "v".repeat(MAX_TENANT_LEN + 1);
        assert!(TenantId::parse(&long).is_err());
    }

    #[test]
    fn test_file_name_round_trip() {
        let id = PilotIdentity::parse(STAMP).unwrap();
        assert_eq!(LogState::Open.file_name(&id), STAMP);
        assert_eq!(LogState::Finalized.file_name(&id), format!("{STAMP}.log"));

        let (parsed, state) = LogState::from_file_name(&format!("{STAMP}.log")).unwrap();
        assert_eq!(parsed, id);
        assert_eq!(state, LogState::Finalized);

        let (_, state) = LogState::from_file_name(STAMP).unwrap();
        assert_eq!(state, LogState::Open);
    }

    #[test]
    fn test_from_file_name_ignores_stray_files() {
        assert!(LogState::from_file_name(".lock").is_none());
        assert!(LogState::from_file_name("notes.txt").is_none());
        assert!(LogState::from_file_name("abc.log").is_none());
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        assert!(is_expired(now, now, 0));
        assert!(!is_expired(now, now, 1));
        assert!(is_expired(now - Duration::days(2), now, 1));
        assert!(!is_expired(now - Duration::hours(23), now, 1));
    }

    #[test]
    fn test_retention_beyond_calendar_range_never_expires() {
        let now = Utc::now();
        assert!(!is_expired(now, now, u32::MAX));
        assert!(!is_expired(DateTime::<Utc>::MIN_UTC, now, u32::MAX));
    }

    #[test]
    fn test_record_lines() {
        let record = PilotLogRecord {
            identity: PilotIdentity::parse(STAMP).unwrap(),
            tenant: TenantId::parse("vo1").unwrap(),
            state: LogState::Open,
            content: "line1\nline2\n".to_string(),
            last_modified: Utc::now(),
        };
        assert_eq!(record.lines().collect::<Vec<_>>(), vec!["line1", "line2"]);
    }
}
