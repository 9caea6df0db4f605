//! Pilot Log Test Utilities
//!
//! Shared test infrastructure for the pilot log workspace:
//! - Proptest generators for identities, tenants and log messages
//! - Fixtures for temp-dir backed caches
//! - Assertions for pilot log results

pub use pilotlog_core::{
    classify, FinalizePayload, IdentityClass, LogMessage, LogState, PilotIdentity,
    PilotLogError, PilotLogResult, StorageError, TenantId, ValidationError, MAX_TENANT_LEN,
};
pub use pilotlog_storage::{FileCacheBackend, LogCacheBackend, NoopBackend};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for pilot log inputs.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    /// A 32-character lowercase hex stamp.
    pub fn arb_stamp() -> impl Strategy<Value = String> {
        "[0-9a-f]{32}"
    }

    /// A canonical hyphenated lowercase UUID.
    pub fn arb_canonical_uuid() -> impl Strategy<Value = String> {
        any::<[u8; 16]>().prop_map(|bytes| Uuid::from_bytes(bytes).hyphenated().to_string())
    }

    /// Any identity accepted by [`classify`].
    pub fn arb_valid_identity() -> impl Strategy<Value = String> {
        prop_oneof![arb_stamp(), arb_canonical_uuid()]
    }

    /// A parsed identity.
    pub fn arb_pilot_identity() -> impl Strategy<Value = PilotIdentity> {
        arb_valid_identity().prop_map(|s| {
            PilotIdentity::parse(&s).expect("generated identity should be valid")
        })
    }

    /// Strings that must be rejected as identities.
    pub fn arb_invalid_identity() -> impl Strategy<Value = String> {
        prop_oneof![
            // wrong length
            "[0-9a-f]{0,31}",
            "[0-9a-f]{33,40}",
            // uppercase hex
            "[0-9A-F]{32}".prop_filter("needs an uppercase digit", |s| {
                s.chars().any(|c| c.is_ascii_uppercase())
            }),
            // path traversal and separators
            Just("../../etc/passwd".to_string()),
            "[0-9a-f]{8}/[0-9a-f]{23}",
            "[0-9a-f]{16}\\.\\.[0-9a-f]{14}",
            // braced or unhyphenated-but-long UUID forms
            arb_canonical_uuid().prop_map(|u| format!("{{{u}}}")),
            arb_canonical_uuid().prop_map(|u| u.to_uppercase()),
        ]
    }

    /// A valid tenant name.
    pub fn arb_tenant() -> impl Strategy<Value = TenantId> {
        "[a-z0-9_-][a-z0-9._-]{0,15}".prop_map(|s| {
            TenantId::parse(&s).expect("generated tenant should be valid")
        })
    }

    /// Strings that must be rejected as tenants.
    pub fn arb_invalid_tenant() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("..".to_string()),
            Just(".hidden".to_string()),
            "[a-z]{1,8}/[a-z]{1,8}",
            "[a-z]{1,8} [a-z]{1,8}",
            Just("x".repeat(MAX_TENANT_LEN + 1)),
        ]
    }

    /// A log line free of line breaks.
    pub fn arb_log_line() -> impl Strategy<Value = String> {
        "[ -~]{0,80}"
    }

    /// A message in either accepted shape.
    pub fn arb_log_message() -> impl Strategy<Value = LogMessage> {
        prop_oneof![
            prop::collection::vec(arb_log_line(), 1..6).prop_map(LogMessage::Lines),
            arb_log_line().prop_map(LogMessage::Text),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use tempfile::TempDir;

    pub const STAMP: &str = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4";
    pub const CANONICAL_UUID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

    /// A file cache over a fresh temp dir. Keep the `TempDir` alive for as
    /// long as the backend is in use.
    pub fn temp_file_backend() -> (TempDir, FileCacheBackend) {
        let dir = TempDir::new().expect("temp dir should be created");
        let backend = FileCacheBackend::new(dir.path()).expect("file backend should open");
        (dir, backend)
    }

    pub fn tenant(name: &str) -> TenantId {
        TenantId::parse(name).expect("fixture tenant should be valid")
    }

    pub fn identity(raw: &str) -> PilotIdentity {
        PilotIdentity::parse(raw).expect("fixture identity should be valid")
    }

    pub fn lines(lines: &[&str]) -> LogMessage {
        LogMessage::Lines(lines.iter().map(|l| l.to_string()).collect())
    }

    /// Append `lines` and finalize, leaving one Finalized record.
    pub async fn finalized_record(
        backend: &dyn LogCacheBackend,
        tenant: &TenantId,
        identity: &PilotIdentity,
        content: &[&str],
    ) -> PilotLogResult<()> {
        backend.append(tenant, identity, &lines(content)).await?;
        backend
            .finalize(tenant, identity, &FinalizePayload::default())
            .await
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for pilot log results.

    use super::*;

    /// Assert that a result failed with `NotFound`.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &PilotLogResult<T>) {
        match result {
            Err(PilotLogError::Storage(StorageError::NotFound { .. })) => {}
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    /// Assert that a result failed validation.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &PilotLogResult<T>) {
        match result {
            Err(PilotLogError::Validation(_)) => {}
            other => panic!("Expected validation error, got: {:?}", other),
        }
    }
}
