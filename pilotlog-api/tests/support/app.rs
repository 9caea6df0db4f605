#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use pilotlog_api::auth::{ApiKeyEntry, AuthConfig, CallerIdentity, CallerRole};
use pilotlog_api::{build_router, AuthMiddlewareState, LoggingService, ServiceConfig};
use pilotlog_storage::FileCacheBackend;
use pilotlog_test_utils::fixtures::tenant;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const PILOT_KEY: &str = "pilot-key-vo1";
pub const GENERIC_PILOT_KEY: &str = "generic-pilot-key-vo2";
pub const OPERATOR_KEY: &str = "operator-key";
pub const TRUSTED_HOST_KEY: &str = "trusted-host-key";
pub const ORPHAN_PILOT_KEY: &str = "pilot-key-no-vo";

/// Keys for each role. Pilots of `vo1_pilot` belong to `vo1`, generic
/// pilots of `vo2_pilot` to `vo2`; the orphan's group maps to no tenant.
pub fn test_auth_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.add_api_key(ApiKeyEntry::new(
        PILOT_KEY,
        CallerIdentity::new("pilot", "vo1_pilot", vec![CallerRole::Pilot]),
    ));
    config.add_api_key(ApiKeyEntry::new(
        GENERIC_PILOT_KEY,
        CallerIdentity::new("generic", "vo2_pilot", vec![CallerRole::GenericPilot]),
    ));
    config.add_api_key(ApiKeyEntry::new(
        OPERATOR_KEY,
        CallerIdentity::new("operator", "dirac_admin", vec![CallerRole::Operator]),
    ));
    config.add_api_key(ApiKeyEntry::new(
        TRUSTED_HOST_KEY,
        CallerIdentity::new("host", "trusted_hosts", vec![CallerRole::TrustedHost]),
    ));
    config.add_api_key(ApiKeyEntry::new(
        ORPHAN_PILOT_KEY,
        CallerIdentity::new("orphan", "unmapped_pilot", vec![CallerRole::Pilot]),
    ));
    config.map_group("vo1_pilot", tenant("vo1"));
    config.map_group("vo2_pilot", tenant("vo2"));
    config
}

/// Router over a file cache in a fresh temp dir.
pub struct TestApp {
    pub dir: TempDir,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("temp dir should be created");
        let backend = FileCacheBackend::new(dir.path()).expect("file backend should open");
        let config = ServiceConfig {
            log_root: dir.path().to_path_buf(),
            ..ServiceConfig::default()
        };
        let router = build_router(
            LoggingService::new(Arc::new(backend)),
            &config,
            AuthMiddlewareState::new(test_auth_config()),
            true,
        );
        Self { dir, router }
    }

    pub async fn get(&self, uri: &str, key: Option<&str>) -> (StatusCode, Value) {
        self.send("GET", uri, key, None).await
    }

    pub async fn post(&self, uri: &str, key: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, key, Some(body.to_string())).await
    }

    pub async fn post_raw(&self, uri: &str, key: Option<&str>, body: &str) -> (StatusCode, Value) {
        self.send("POST", uri, key, Some(body.to_string())).await
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        key: Option<&str>,
        body: Option<String>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body)),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body should be readable")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }
}
