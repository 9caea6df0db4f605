//! Pilot identity classification.
//!
//! A pilot labels its log stream with either a 32-character hex stamp or a
//! canonical hyphenated UUID. Identities end up as a single filename segment
//! in the file cache, so anything outside the two lexical forms is rejected
//! before a record is touched.
//!
//! # Precedence
//!
//! The stamp form is checked first, then the UUID form. The two forms cannot
//! both match the same string today (a stamp has no hyphens), but the order is
//! fixed so that a future widening of either pattern stays deterministic.
//! Both forms accept lowercase hex only.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

static STAMP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-f]{32}$").expect("stamp pattern is a valid regex"));

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$")
        .expect("uuid pattern is a valid regex")
});

/// Lexical class of a caller-supplied identity string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum IdentityClass {
    /// Exactly 32 hex digits.
    Stamp,
    /// 8-4-4-4-12 hyphenated hex.
    CanonicalUuid,
    /// Anything else.
    Invalid,
}

impl IdentityClass {
    pub fn is_valid(&self) -> bool {
        !matches!(self, IdentityClass::Invalid)
    }
}

/// Classify an identity string. Pure, no side effects.
pub fn classify(identity: &str) -> IdentityClass {
    if STAMP_PATTERN.is_match(identity) {
        IdentityClass::Stamp
    } else if UUID_PATTERN.is_match(identity) {
        IdentityClass::CanonicalUuid
    } else {
        IdentityClass::Invalid
    }
}

/// A pilot identity that has passed [`classify`].
///
/// Holding a `PilotIdentity` is proof that the string is safe to use as a
/// single path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PilotIdentity {
    value: String,
    #[serde(skip)]
    class: IdentityClass,
}

impl PilotIdentity {
    /// Validate and wrap an identity string.
    pub fn parse(identity: &str) -> Result<Self, ValidationError> {
        match classify(identity) {
            IdentityClass::Invalid => Err(ValidationError::InvalidIdentity {
                identity: identity.to_string(),
            }),
            class => Ok(Self {
                value: identity.to_string(),
                class,
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn class(&self) -> IdentityClass {
        self.class
    }
}

impl fmt::Display for PilotIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for PilotIdentity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PilotIdentity {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl<'de> Deserialize<'de> for PilotIdentity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        PilotIdentity::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_is_valid() {
        assert_eq!(
            classify("a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4"),
            IdentityClass::Stamp
        );
    }

    #[test]
    fn test_canonical_uuid_is_valid() {
        assert_eq!(
            classify("550e8400-e29b-41d4-a716-446655440000"),
            IdentityClass::CanonicalUuid
        );
    }

    #[test]
    fn test_uppercase_is_invalid() {
        assert_eq!(
            classify("A1B2C3D4E5F6A1B2C3D4E5F6A1B2C3D4"),
            IdentityClass::Invalid
        );
        assert_eq!(
            classify("550E8400-E29B-41D4-A716-446655440000"),
            IdentityClass::Invalid
        );
    }

    #[test]
    fn test_rejects_empty_and_wrong_lengths() {
        assert_eq!(classify(""), IdentityClass::Invalid);
        assert_eq!(classify("a1b2c3d4"), IdentityClass::Invalid);
        assert_eq!(
            classify("a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4e"),
            IdentityClass::Invalid
        );
    }

    #[test]
    fn test_rejects_path_traversal() {
        assert_eq!(classify("../../etc/passwd"), IdentityClass::Invalid);
        assert_eq!(
            classify("a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4/x"),
            IdentityClass::Invalid
        );
        assert_eq!(
            classify("a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d\\"),
            IdentityClass::Invalid
        );
    }

    #[test]
    fn test_rejects_trailing_newline() {
        assert_eq!(
            classify("a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4\n"),
            IdentityClass::Invalid
        );
    }

    #[test]
    fn test_parse_keeps_class() {
        let id = PilotIdentity::parse("550e8400-e29b-41d4-a716-446655440000")
            .expect("uuid identity should parse");
        assert_eq!(id.class(), IdentityClass::CanonicalUuid);
        assert_eq!(id.as_str(), "550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_parse_invalid_reports_identity() {
        let err = PilotIdentity::parse("nope").unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidIdentity {
                identity: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        let ok: Result<PilotIdentity, _> =
            serde_json::from_str("\"a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4\"");
        assert!(ok.is_ok());
        let bad: Result<PilotIdentity, _> = serde_json::from_str("\"../x\"");
        assert!(bad.is_err());
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Any 32 lowercase hex characters classify as a stamp.
        #[test]
        fn prop_hex32_is_stamp(bytes in any::<[u8; 16]>()) {
            let stamp = hex::encode(bytes);
            prop_assert_eq!(classify(&stamp), IdentityClass::Stamp);
        }

        /// Hyphenated UUIDs classify as canonical UUIDs.
        #[test]
        fn prop_uuid_is_canonical(bytes in any::<[u8; 16]>()) {
            let id = uuid::Uuid::from_bytes(bytes).hyphenated().to_string();
            prop_assert_eq!(classify(&id), IdentityClass::CanonicalUuid);
        }

        /// A path separator anywhere makes the identity invalid.
        #[test]
        fn prop_separator_is_invalid(
            prefix in "[0-9a-f]{0,31}",
            sep in prop_oneof![Just('/'), Just('\\')],
            suffix in "[0-9a-f]{0,31}",
        ) {
            let candidate = format!("{prefix}{sep}{suffix}");
            prop_assert_eq!(classify(&candidate), IdentityClass::Invalid);
        }

        /// Disallowed characters make the identity invalid.
        #[test]
        fn prop_disallowed_chars_invalid(
            s in "[0-9a-f]{0,16}[g-zG-Z .~!]{1}[0-9a-f]{0,15}",
        ) {
            prop_assert_eq!(classify(&s), IdentityClass::Invalid);
        }
    }
}
