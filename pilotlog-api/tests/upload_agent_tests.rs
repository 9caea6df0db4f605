//! Integration tests for the upload/eviction agent
//!
//! Logs are produced through the HTTP surface, then archived by the agent
//! into an in-memory store with injected failures.

#[path = "support/archive.rs"]
mod archive;

use std::sync::Arc;
use std::time::Duration;

use archive::InMemoryArchive;
use pilotlog_api::jobs::{
    StaticTenantSettings, TenantArchiveSettings, UploadAgent, UploadAgentConfig,
};
use pilotlog_storage::{FileCacheBackend, LogCacheBackend};
use pilotlog_test_utils::fixtures::{finalized_record, identity, tenant, temp_file_backend};

const STAMP_A: &str = "a1b2c3d4e5f6a1b2c3d4e5f6a1b2c3d4";
const STAMP_B: &str = "0123456789abcdef0123456789abcdef";

fn settings() -> StaticTenantSettings {
    StaticTenantSettings::parse("vo1:true:SE-DISK:/pilot/logs/,vo2:false").unwrap()
}

fn agent(backend: Arc<FileCacheBackend>, archive: Arc<InMemoryArchive>) -> UploadAgent {
    UploadAgent::new(
        backend,
        archive,
        Arc::new(settings()),
        UploadAgentConfig {
            enabled: true,
            upload_timeout: Duration::from_secs(5),
            ..UploadAgentConfig::default()
        },
    )
}

#[tokio::test]
async fn test_failed_upload_retried_next_cycle() {
    let (_dir, backend) = temp_file_backend();
    let backend = Arc::new(backend);
    let vo1 = tenant("vo1");
    finalized_record(backend.as_ref(), &vo1, &identity(STAMP_A), &["a"]).await.unwrap();
    finalized_record(backend.as_ref(), &vo1, &identity(STAMP_B), &["b"]).await.unwrap();

    let archive = Arc::new(InMemoryArchive::new());
    archive.fail_on(STAMP_A);
    let agent = agent(backend.clone(), archive.clone());

    let first = agent.run_cycle().await;
    assert!(!first.is_success());
    assert_eq!(first.tenants[&vo1].uploaded, vec![STAMP_B.to_string()]);
    let pending = backend.list(&vo1).await.unwrap();
    assert_eq!(pending.successful.len(), 1);
    assert!(pending.successful.contains_key(STAMP_A));

    archive.heal(STAMP_A);
    let second = agent.run_cycle().await;
    assert!(second.is_success());
    assert_eq!(second.tenants[&vo1].uploaded, vec![STAMP_A.to_string()]);
    assert!(backend.list(&vo1).await.unwrap().is_empty());

    let objects = archive.objects();
    assert_eq!(
        objects.get(&("SE-DISK".to_string(), format!("/vo1/pilot/logs/{STAMP_A}.log"))),
        Some(&"a\n".to_string())
    );
    assert_eq!(objects.len(), 2);
    assert_eq!(agent.metrics().snapshot().cycles, 2);
}

#[tokio::test]
async fn test_disabled_tenant_is_untouched() {
    let (_dir, backend) = temp_file_backend();
    let backend = Arc::new(backend);
    let vo2 = tenant("vo2");
    finalized_record(backend.as_ref(), &vo2, &identity(STAMP_A), &["kept"]).await.unwrap();

    let archive = Arc::new(InMemoryArchive::new());
    let report = agent(backend.clone(), archive.clone()).run_cycle().await;

    assert!(report.is_success());
    assert!(report.tenants[&vo2].skipped);
    assert!(archive.attempts().is_empty());
    assert_eq!(backend.list(&vo2).await.unwrap().successful.len(), 1);
}

#[tokio::test]
async fn test_open_logs_are_not_uploaded() {
    let (_dir, backend) = temp_file_backend();
    let backend = Arc::new(backend);
    let vo1 = tenant("vo1");
    backend
        .append(&vo1, &identity(STAMP_A), &pilotlog_test_utils::fixtures::lines(&["running"]))
        .await
        .unwrap();

    let archive = Arc::new(InMemoryArchive::new());
    let report = agent(backend.clone(), archive.clone()).run_cycle().await;

    assert!(report.is_success());
    assert!(report.tenants[&vo1].uploaded.is_empty());
    assert!(archive.attempts().is_empty());
    assert!(backend.read(&vo1, &identity(STAMP_A)).await.is_ok());
}
