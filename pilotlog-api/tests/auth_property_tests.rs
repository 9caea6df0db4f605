//! Property-Based Tests for Authentication and Role Enforcement
//!
//! For any request to `/api/v1/*`: a missing or unknown API key yields 401;
//! a known caller whose roles do not cover the operation yields 403; a
//! pilot whose group maps to no tenant yields 403 for own-tenant operations.

#[path = "support/app.rs"]
mod app;

use app::*;
use axum::http::StatusCode;
use pilotlog_test_utils::generators::arb_stamp;
use proptest::prelude::*;
use serde_json::json;

#[derive(Debug, Clone, Copy)]
enum Key {
    Missing,
    Unknown,
    Pilot,
    GenericPilot,
    Operator,
    TrustedHost,
    Orphan,
}

impl Key {
    fn header(self) -> Option<&'static str> {
        match self {
            Key::Missing => None,
            Key::Unknown => Some("not-a-configured-key"),
            Key::Pilot => Some(PILOT_KEY),
            Key::GenericPilot => Some(GENERIC_PILOT_KEY),
            Key::Operator => Some(OPERATOR_KEY),
            Key::TrustedHost => Some(TRUSTED_HOST_KEY),
            Key::Orphan => Some(ORPHAN_PILOT_KEY),
        }
    }
}

fn key_strategy() -> impl Strategy<Value = Key> {
    prop_oneof![
        Just(Key::Missing),
        Just(Key::Unknown),
        Just(Key::Pilot),
        Just(Key::GenericPilot),
        Just(Key::Operator),
        Just(Key::TrustedHost),
        Just(Key::Orphan),
    ]
}

#[derive(Debug, Clone, Copy)]
enum Call {
    Append,
    Read,
    List,
    Delete,
    Clear,
    Metadata,
}

fn call_strategy() -> impl Strategy<Value = Call> {
    prop_oneof![
        Just(Call::Append),
        Just(Call::Read),
        Just(Call::List),
        Just(Call::Delete),
        Just(Call::Clear),
        Just(Call::Metadata),
    ]
}

/// Expected status for a key/call pair on an empty cache.
fn expected(key: Key, call: Call) -> StatusCode {
    use Call::*;
    use Key::*;
    match (key, call) {
        (Missing | Unknown, _) => StatusCode::UNAUTHORIZED,
        // Operator holds pilot and admin rights but has no own tenant
        (Operator, Append | Read) => StatusCode::FORBIDDEN,
        (TrustedHost, Append | Read) => StatusCode::FORBIDDEN,
        (Orphan, Append | Read) => StatusCode::FORBIDDEN,
        (Pilot | GenericPilot, Append) => StatusCode::OK,
        (Pilot | GenericPilot, Read) => StatusCode::NOT_FOUND,
        (Pilot | GenericPilot | Orphan, _) => StatusCode::FORBIDDEN,
        (Operator | TrustedHost, _) => StatusCode::OK,
    }
}

async fn perform(app: &TestApp, key: Key, call: Call, stamp: &str) -> StatusCode {
    let key = key.header();
    let (status, _) = match call {
        Call::Append => {
            app.post(
                &format!("/api/v1/pilots/{stamp}/messages"),
                key,
                json!({ "message": ["x"] }),
            )
            .await
        }
        Call::Read => app.get(&format!("/api/v1/pilots/{stamp}/log"), key).await,
        Call::List => app.get("/api/v1/tenants/vo1/logs", key).await,
        Call::Delete => {
            app.post(
                "/api/v1/tenants/vo1/logs/delete",
                key,
                json!({ "identities": [stamp] }),
            )
            .await
        }
        Call::Clear => {
            app.post(
                "/api/v1/tenants/vo1/logs/clear",
                key,
                json!({ "retentionDays": 30 }),
            )
            .await
        }
        Call::Metadata => app.get("/api/v1/metadata", key).await,
    };
    status
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_role_policy_enforced(key in key_strategy(), call in call_strategy(), stamp in arb_stamp()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let status = rt.block_on(async {
            let app = TestApp::new();
            perform(&app, key, call, &stamp).await
        });
        prop_assert_eq!(status, expected(key, call), "key {:?} call {:?}", key, call);
    }

    #[test]
    fn prop_unknown_keys_rejected(raw in "[a-z0-9_-]{1,40}") {
        prop_assume!(![PILOT_KEY, GENERIC_PILOT_KEY, OPERATOR_KEY, TRUSTED_HOST_KEY, ORPHAN_PILOT_KEY]
            .contains(&raw.as_str()));
        let rt = tokio::runtime::Runtime::new().unwrap();
        let status = rt.block_on(async {
            let app = TestApp::new();
            app.get("/api/v1/metadata", Some(&raw)).await.0
        });
        prop_assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_unauthorized_error_envelope() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/v1/metadata", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_pilot_cannot_read_other_tenant() {
    let app = TestApp::new();
    let stamp = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4";
    let (status, _) = app
        .get(&format!("/api/v1/tenants/vo2/pilots/{stamp}/log"), Some(PILOT_KEY))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // own tenant through the explicit route is a plain read
    let (status, _) = app
        .get(&format!("/api/v1/tenants/vo1/pilots/{stamp}/log"), Some(PILOT_KEY))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
