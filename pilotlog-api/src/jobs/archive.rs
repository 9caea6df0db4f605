//! Durable archive collaborator.
//!
//! The upload agent hands each finalized log to an [`ArchiveStore`] as a
//! staged local file plus a logical file name. Writes overwrite, so
//! re-uploading the same identity after a partial cycle is harmless.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use pilotlog_core::{PilotIdentity, UploadError};

/// One upload-and-register call.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveRequest<'a> {
    pub identity: &'a PilotIdentity,
    /// Storage element name.
    pub target: &'a str,
    /// Logical file name, `/<tenant>/<uploadPath>/<identity>.log`.
    pub lfn: &'a str,
    /// Staged copy of the content.
    pub local_path: &'a Path,
}

/// Durable storage the agent archives finalized logs into.
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Upload and register, overwriting any existing copy.
    async fn put_and_register(&self, request: ArchiveRequest<'_>) -> Result<(), UploadError>;
}

/// Archive store backed by a local directory tree:
/// `<root>/<target>/<lfn>`.
#[derive(Debug, Clone)]
pub struct LocalArchiveStore {
    root: PathBuf,
}

impl LocalArchiveStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Destination of a request, refusing anything that would leave the root.
    pub fn destination(&self, target: &str, lfn: &str) -> Option<PathBuf> {
        let target = Path::new(target);
        let lfn = Path::new(lfn.trim_start_matches('/'));
        let confined = |p: &Path| {
            p.components().count() > 0 && p.components().all(|c| matches!(c, Component::Normal(_)))
        };
        if target.components().count() != 1 || !confined(target) || !confined(lfn) {
            return None;
        }
        Some(self.root.join(target).join(lfn))
    }
}

#[async_trait]
impl ArchiveStore for LocalArchiveStore {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn put_and_register(&self, request: ArchiveRequest<'_>) -> Result<(), UploadError> {
        let rejected = |reason: String| UploadError::Rejected {
            identity: request.identity.to_string(),
            target: request.target.to_string(),
            reason,
        };

        let dest = self
            .destination(request.target, request.lfn)
            .ok_or_else(|| rejected(format!("unsafe destination {}", request.lfn)))?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| rejected(format!("cannot create {}: {}", parent.display(), e)))?;
        }
        tokio::fs::copy(request.local_path, &dest)
            .await
            .map_err(|e| rejected(format!("cannot write {}: {}", dest.display(), e)))?;

        tracing::debug!(
            identity = %request.identity,
            target = request.target,
            lfn = request.lfn,
            "Archived pilot log"
        );
        Ok(())
    }
}
