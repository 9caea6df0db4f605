#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use pilotlog_api::jobs::{ArchiveRequest, ArchiveStore};
use pilotlog_core::UploadError;

/// Archive store that keeps uploads in memory and fails on demand.
#[derive(Default)]
pub struct InMemoryArchive {
    failing: Mutex<HashSet<String>>,
    objects: Mutex<BTreeMap<(String, String), String>>,
    attempts: Mutex<Vec<String>>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every upload of `identity` until [`Self::heal`] is called.
    pub fn fail_on(&self, identity: &str) {
        self.failing.lock().unwrap().insert(identity.to_string());
    }

    pub fn heal(&self, identity: &str) {
        self.failing.lock().unwrap().remove(identity);
    }

    /// Stored content keyed by `(target, lfn)`.
    pub fn objects(&self) -> BTreeMap<(String, String), String> {
        self.objects.lock().unwrap().clone()
    }

    /// Identities in the order uploads were attempted.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveStore for InMemoryArchive {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn put_and_register(&self, request: ArchiveRequest<'_>) -> Result<(), UploadError> {
        let identity = request.identity.to_string();
        self.attempts.lock().unwrap().push(identity.clone());
        if self.failing.lock().unwrap().contains(&identity) {
            return Err(UploadError::Rejected {
                identity,
                target: request.target.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        let content = tokio::fs::read_to_string(request.local_path)
            .await
            .map_err(|e| UploadError::Staging {
                identity: identity.clone(),
                reason: e.to_string(),
            })?;
        self.objects
            .lock()
            .unwrap()
            .insert((request.target.to_string(), request.lfn.to_string()), content);
        Ok(())
    }
}
