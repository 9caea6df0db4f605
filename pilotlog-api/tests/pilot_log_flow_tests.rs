//! End-to-end tests for the pilot log lifecycle over HTTP
//!
//! A pilot streams lines and finalises; an operator lists, deletes and
//! clears. Every request goes through the full router: authentication,
//! role checks, the file cache and the JSON envelope.

#[path = "support/app.rs"]
mod app;

use app::*;
use axum::http::StatusCode;
use serde_json::json;

const STAMP: &str = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4";
const CANONICAL_UUID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

#[tokio::test]
async fn test_stream_finalise_list_delete() {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            &format!("/api/v1/pilots/{STAMP}/messages"),
            Some(PILOT_KEY),
            json!({ "message": ["line1", "line2"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ok"], true);
    assert_eq!(body["tenant"], "vo1");
    assert_eq!(body["bytesWritten"], 12);

    let (status, body) = app
        .post(
            &format!("/api/v1/pilots/{STAMP}/finalise"),
            Some(PILOT_KEY),
            json!({ "retCode": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!({ "ok": true }));

    let (status, body) = app.get("/api/v1/tenants/vo1/logs", Some(OPERATOR_KEY)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body,
        json!({ "successful": { STAMP: "line1\nline2\n" }, "failed": {} })
    );

    let missing = "ffffffffffffffffffffffffffffffff";
    let (status, body) = app
        .post(
            "/api/v1/tenants/vo1/logs/delete",
            Some(TRUSTED_HOST_KEY),
            json!({ "identities": [STAMP, missing] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["deleted"], json!([STAMP]));
    assert!(body["failed"][missing].is_string());

    let (_, body) = app.get("/api/v1/tenants/vo1/logs", Some(OPERATOR_KEY)).await;
    assert_eq!(body, json!({ "successful": {}, "failed": {} }));
}

#[tokio::test]
async fn test_read_prefers_open_log() {
    let app = TestApp::new();
    let uri = format!("/api/v1/pilots/{CANONICAL_UUID}");

    app.post(&format!("{uri}/messages"), Some(PILOT_KEY), json!({ "message": "first\n" }))
        .await;
    let (status, body) = app.get(&format!("{uri}/log"), Some(PILOT_KEY)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["state"], "open");
    assert_eq!(body["content"], "first\n");

    app.post_raw(&format!("{uri}/finalise"), Some(PILOT_KEY), "").await;
    let (status, body) = app.get(&format!("{uri}/log"), Some(PILOT_KEY)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["state"], "finalized");
}

#[tokio::test]
async fn test_finalise_payload_as_encoded_string() {
    let app = TestApp::new();
    app.post(
        &format!("/api/v1/pilots/{STAMP}/messages"),
        Some(PILOT_KEY),
        json!({ "message": ["done"] }),
    )
    .await;

    let (status, body) = app
        .post(
            &format!("/api/v1/pilots/{STAMP}/finalise"),
            Some(PILOT_KEY),
            json!("{\"retCode\": 3}"),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn test_append_after_finalise_conflicts() {
    let app = TestApp::new();
    let uri = format!("/api/v1/pilots/{STAMP}");
    app.post(&format!("{uri}/messages"), Some(PILOT_KEY), json!({ "message": ["a"] }))
        .await;
    app.post_raw(&format!("{uri}/finalise"), Some(PILOT_KEY), "").await;

    let (status, body) = app
        .post(&format!("{uri}/messages"), Some(PILOT_KEY), json!({ "message": ["b"] }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, _) = app.post_raw(&format!("{uri}/finalise"), Some(PILOT_KEY), "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_identity_leaves_no_record() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/v1/pilots/NOT-A-STAMP/messages",
            Some(PILOT_KEY),
            json!({ "message": ["x"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], "INVALID_IDENTITY");
    assert!(!app.dir.path().join("vo1").exists());
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let app = TestApp::new();
    app.post(
        &format!("/api/v1/pilots/{STAMP}/messages"),
        Some(PILOT_KEY),
        json!({ "message": ["vo1 line"] }),
    )
    .await;

    // same identity under another tenant is a different record
    let (status, _) = app
        .get(&format!("/api/v1/pilots/{STAMP}/log"), Some(GENERIC_PILOT_KEY))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .get(&format!("/api/v1/tenants/vo1/pilots/{STAMP}/log"), Some(OPERATOR_KEY))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["content"], "vo1 line\n");
}

#[tokio::test]
async fn test_clear_with_zero_days_evicts_everything() {
    let app = TestApp::new();
    app.post(
        &format!("/api/v1/pilots/{STAMP}/messages"),
        Some(PILOT_KEY),
        json!({ "message": ["open"] }),
    )
    .await;
    let uri = format!("/api/v1/pilots/{CANONICAL_UUID}");
    app.post(&format!("{uri}/messages"), Some(PILOT_KEY), json!({ "message": ["closed"] }))
        .await;
    app.post_raw(&format!("{uri}/finalise"), Some(PILOT_KEY), "").await;

    let (status, body) = app
        .post("/api/v1/tenants/vo1/logs/clear", Some(OPERATOR_KEY), json!({ "retentionDays": 0 }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["evicted"], 2);

    let (status, _) = app.get(&format!("/api/v1/pilots/{STAMP}/log"), Some(PILOT_KEY)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_keeps_recent_logs() {
    let app = TestApp::new();
    app.post(
        &format!("/api/v1/pilots/{STAMP}/messages"),
        Some(PILOT_KEY),
        json!({ "message": ["fresh"] }),
    )
    .await;

    let (_, body) = app
        .post("/api/v1/tenants/vo1/logs/clear", Some(OPERATOR_KEY), json!({ "retentionDays": 30 }))
        .await;
    assert_eq!(body["evicted"], 0);

    let (status, _) = app.get(&format!("/api/v1/pilots/{STAMP}/log"), Some(PILOT_KEY)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_clear_with_max_retention_keeps_logs() {
    let app = TestApp::new();
    app.post(
        &format!("/api/v1/pilots/{STAMP}/messages"),
        Some(PILOT_KEY),
        json!({ "message": ["fresh"] }),
    )
    .await;

    let (status, body) = app
        .post_raw(
            "/api/v1/tenants/vo1/logs/clear",
            Some(OPERATOR_KEY),
            r#"{"retentionDays": 4294967295}"#,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["evicted"], 0);

    let (status, body) = app.get(&format!("/api/v1/pilots/{STAMP}/log"), Some(PILOT_KEY)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
}

#[tokio::test]
async fn test_encoded_non_string_array_is_appended_verbatim() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            &format!("/api/v1/pilots/{STAMP}/messages"),
            Some(PILOT_KEY),
            json!({ "message": "[1, 2]" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = app.get(&format!("/api/v1/pilots/{STAMP}/log"), Some(PILOT_KEY)).await;
    assert_eq!(body["content"], "[1, 2]");
}

#[tokio::test]
async fn test_malformed_bodies_get_error_envelope() {
    let app = TestApp::new();
    let cases = [
        (format!("/api/v1/pilots/{STAMP}/messages"), PILOT_KEY),
        ("/api/v1/tenants/vo1/logs/delete".to_string(), OPERATOR_KEY),
        ("/api/v1/tenants/vo1/logs/clear".to_string(), OPERATOR_KEY),
    ];
    for (uri, key) in cases {
        let (status, body) = app.post_raw(&uri, Some(key), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}: {body}");
        assert_eq!(body["code"], "INVALID_INPUT", "{uri}: {body}");
    }

    let (status, body) = app
        .post_raw("/api/v1/tenants/vo1/logs/clear", Some(OPERATOR_KEY), r#"{"retentionDays": -1}"#)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_metadata_reports_backend() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/v1/metadata", Some(OPERATOR_KEY)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["backend"], "file");
    assert!(body["logRoot"].as_str().is_some());

    let (status, _) = app.get("/health/ready", None).await;
    assert_eq!(status, StatusCode::OK);
}
