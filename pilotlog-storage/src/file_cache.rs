//! Filesystem-backed log cache.
//!
//! Layout under the log root:
//!
//! ```text
//! <root>/<tenant>/<identity>       Open record
//! <root>/<tenant>/<identity>.log   Finalized record
//! ```
//!
//! # Atomicity
//!
//! Append and finalize each hold an exclusive advisory lock (`fs2`) on the
//! Open file for the duration of the operation. Append writes the whole
//! rendered message in one `write_all` and truncates back to the original
//! length if the write fails. Finalize re-checks both paths under the lock
//! before renaming, so a racing append either lands before the rename or is
//! rejected with `AlreadyFinalized`.
//!
//! All filesystem work runs on the blocking pool.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use pilotlog_core::{
    is_expired, AppendReceipt, BackendMetadata, DeleteReport, EvictionReport, FinalizePayload,
    LogListing, LogMessage, LogState, PilotIdentity, PilotLogRecord, PilotLogResult, StorageError,
    TenantId,
};
use tracing::{debug, error, info, warn};

use crate::traits::LogCacheBackend;

/// Registry key and metadata name of this backend.
pub const BACKEND_NAME: &str = "file";

/// Per-tenant, per-identity append store on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileCacheBackend {
    root: Arc<PathBuf>,
}

impl FileCacheBackend {
    /// Create the backend, creating the log root if needed.
    pub fn new(root: impl Into<PathBuf>) -> PilotLogResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError::io("create log root", &root, &e))?;
        info!(log_root = %root.display(), "Pilot logging directory ready");
        Ok(Self {
            root: Arc::new(root),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tenant_dir(&self, tenant: &TenantId) -> PathBuf {
        self.root.join(tenant.as_str())
    }

    pub fn record_path(&self, tenant: &TenantId, identity: &PilotIdentity, state: LogState) -> PathBuf {
        self.tenant_dir(tenant).join(state.file_name(identity))
    }

    fn append_sync(
        &self,
        tenant: &TenantId,
        identity: &PilotIdentity,
        message: &LogMessage,
    ) -> PilotLogResult<AppendReceipt> {
        let dir = self.tenant_dir(tenant);
        // create_dir_all tolerates a concurrent creator
        fs::create_dir_all(&dir)
            .map_err(|e| StorageError::io("create tenant namespace", &dir, &e))?;

        let open_path = dir.join(LogState::Open.file_name(identity));
        let final_path = dir.join(LogState::Finalized.file_name(identity));
        if final_path.exists() {
            return Err(already_finalized(tenant, identity).into());
        }

        let data = message.render();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&open_path)
            .map_err(|e| StorageError::io("open for append", &open_path, &e))?;
        FileExt::lock_exclusive(&file).map_err(|e| StorageError::io("lock", &open_path, &e))?;

        let outcome = append_locked(&mut file, &open_path, &final_path, data.as_bytes());
        release(&file, &open_path);

        match outcome {
            Ok(()) => {
                debug!(
                    tenant = %tenant,
                    identity = %identity,
                    bytes = data.len(),
                    "Appended pilot log message"
                );
                Ok(AppendReceipt {
                    identity: identity.to_string(),
                    tenant: tenant.to_string(),
                    bytes_written: data.len(),
                })
            }
            Err(AppendFailure::Finalized) => Err(already_finalized(tenant, identity).into()),
            Err(AppendFailure::Storage(err)) => {
                error!(tenant = %tenant, identity = %identity, error = %err, "Pilot log append failed");
                Err(err.into())
            }
        }
    }

    fn finalize_sync(
        &self,
        tenant: &TenantId,
        identity: &PilotIdentity,
        payload: &FinalizePayload,
    ) -> PilotLogResult<()> {
        let open_path = self.record_path(tenant, identity, LogState::Open);
        let final_path = self.record_path(tenant, identity, LogState::Finalized);

        let file = match OpenOptions::new().read(true).write(true).open(&open_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(tenant = %tenant, identity = %identity, "Finalize without an open log");
                return Err(not_found(tenant, identity).into());
            }
            Err(e) => return Err(StorageError::io("open for finalize", &open_path, &e).into()),
        };
        FileExt::lock_exclusive(&file).map_err(|e| StorageError::io("lock", &open_path, &e))?;
        let outcome = finalize_locked(&file, &open_path, &final_path, tenant, identity);
        release(&file, &open_path);
        outcome?;

        info!(
            tenant = %tenant,
            identity = %identity,
            ret_code = payload.ret_code_or_default(),
            "Pilot log finalized"
        );
        Ok(())
    }

    fn read_sync(&self, tenant: &TenantId, identity: &PilotIdentity) -> PilotLogResult<PilotLogRecord> {
        for state in [LogState::Open, LogState::Finalized] {
            let path = self.record_path(tenant, identity, state);
            match read_record_file(&path) {
                Ok((content, last_modified)) => {
                    return Ok(PilotLogRecord {
                        identity: identity.clone(),
                        tenant: tenant.clone(),
                        state,
                        content,
                        last_modified,
                    })
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io("read", &path, &e).into()),
            }
        }
        Err(not_found(tenant, identity).into())
    }

    fn list_sync(&self, tenant: &TenantId) -> PilotLogResult<LogListing> {
        let mut listing = LogListing::default();
        for entry in self.scan_records(tenant)? {
            if !entry.state.is_finalized() {
                continue;
            }
            match read_record_file(&entry.path) {
                Ok((content, _)) => {
                    listing.successful.insert(entry.identity.to_string(), content);
                }
                Err(e) => {
                    warn!(
                        tenant = %tenant,
                        identity = %entry.identity,
                        error = %e,
                        "Could not read finalized pilot log"
                    );
                    listing.failed.insert(entry.identity.to_string(), e.to_string());
                }
            }
        }
        Ok(listing)
    }

    fn delete_sync(&self, tenant: &TenantId, identities: &[String]) -> PilotLogResult<DeleteReport> {
        let mut report = DeleteReport::default();
        for raw in identities {
            let identity = match PilotIdentity::parse(raw) {
                Ok(identity) => identity,
                Err(e) => {
                    warn!(tenant = %tenant, identity = %raw, "Skipping delete of invalid identity");
                    report.failed.insert(raw.clone(), e.to_string());
                    continue;
                }
            };
            let path = self.record_path(tenant, &identity, LogState::Finalized);
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!(tenant = %tenant, identity = %identity, "Deleted pilot log");
                    report.deleted.push(raw.clone());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(tenant = %tenant, identity = %identity, "Pilot log to delete not found");
                    report.failed.insert(raw.clone(), "not found".to_string());
                }
                Err(e) => {
                    error!(
                        tenant = %tenant,
                        identity = %identity,
                        path = %path.display(),
                        error = %e,
                        "Cannot remove pilot log"
                    );
                    report.failed.insert(raw.clone(), e.to_string());
                }
            }
        }
        Ok(report)
    }

    fn evict_sync(&self, tenant: &TenantId, retention_days: u32) -> PilotLogResult<EvictionReport> {
        let now = Utc::now();
        let mut report = EvictionReport::default();
        for entry in self.scan_records(tenant)? {
            let name = entry.state.file_name(&entry.identity);
            let modified = match fs::metadata(&entry.path).and_then(|m| m.modified()) {
                Ok(modified) => DateTime::<Utc>::from(modified),
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(tenant = %tenant, record = %name, error = %e, "Cannot stat pilot log");
                    report.failed.insert(name, e.to_string());
                    continue;
                }
            };
            if !is_expired(modified, now, retention_days) {
                continue;
            }
            match fs::remove_file(&entry.path) {
                Ok(()) => {
                    debug!(tenant = %tenant, record = %name, "Evicted old pilot log");
                    report.evicted.push(name);
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    error!(tenant = %tenant, record = %name, error = %e, "Cannot evict old pilot log");
                    report.failed.insert(name, e.to_string());
                }
            }
        }
        if !report.evicted.is_empty() {
            info!(
                tenant = %tenant,
                evicted = report.evicted.len(),
                retention_days,
                "Evicted stale pilot logs"
            );
        }
        Ok(report)
    }

    fn metadata_sync(&self) -> PilotLogResult<BackendMetadata> {
        if !self.root.is_dir() {
            return Err(StorageError::NoLogRoot {
                backend: BACKEND_NAME.to_string(),
                reason: format!("{} is not a directory", self.root.display()),
            }
            .into());
        }
        Ok(BackendMetadata {
            backend: BACKEND_NAME.to_string(),
            log_root: self.root.display().to_string(),
        })
    }

    /// Record files of a tenant. A namespace that was never written is empty.
    fn scan_records(&self, tenant: &TenantId) -> PilotLogResult<Vec<RecordEntry>> {
        let dir = self.tenant_dir(tenant);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io("scan tenant namespace", &dir, &e).into()),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(tenant = %tenant, error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if let Some((identity, state)) = LogState::from_file_name(name) {
                records.push(RecordEntry {
                    identity,
                    state,
                    path: entry.path(),
                });
            }
        }
        Ok(records)
    }
}

struct RecordEntry {
    identity: PilotIdentity,
    state: LogState,
    path: PathBuf,
}

enum AppendFailure {
    Finalized,
    Storage(StorageError),
}

fn append_locked(
    file: &mut File,
    open_path: &Path,
    final_path: &Path,
    data: &[u8],
) -> Result<(), AppendFailure> {
    let original_len = file
        .metadata()
        .map_err(|e| AppendFailure::Storage(StorageError::io("stat", open_path, &e)))?
        .len();

    if final_path.exists() {
        // finalized while we waited for the lock; drop the file we just created
        if original_len == 0 {
            let _ = fs::remove_file(open_path);
        }
        return Err(AppendFailure::Finalized);
    }

    if let Err(err) = file.write_all(data).and_then(|()| file.flush()) {
        if let Err(trunc) = file.set_len(original_len) {
            error!(
                path = %open_path.display(),
                error = %trunc,
                "Could not roll back partial append"
            );
        }
        return Err(AppendFailure::Storage(StorageError::io("append", open_path, &err)));
    }
    Ok(())
}

fn finalize_locked(
    file: &File,
    open_path: &Path,
    final_path: &Path,
    tenant: &TenantId,
    identity: &PilotIdentity,
) -> PilotLogResult<()> {
    if final_path.exists() {
        return Err(already_finalized(tenant, identity).into());
    }
    if !open_path.exists() {
        return Err(not_found(tenant, identity).into());
    }
    file.set_modified(SystemTime::now())
        .map_err(|e| StorageError::io("touch", open_path, &e))?;
    fs::rename(open_path, final_path).map_err(|e| StorageError::io("finalize", open_path, &e))?;
    Ok(())
}

fn release(file: &File, path: &Path) {
    if let Err(e) = FileExt::unlock(file) {
        warn!(path = %path.display(), error = %e, "Failed to release pilot log lock");
    }
}

fn read_record_file(path: &Path) -> io::Result<(String, DateTime<Utc>)> {
    let bytes = fs::read(path)?;
    let modified = fs::metadata(path)?.modified()?;
    Ok((String::from_utf8_lossy(&bytes).into_owned(), modified.into()))
}

fn not_found(tenant: &TenantId, identity: &PilotIdentity) -> StorageError {
    StorageError::NotFound {
        tenant: tenant.to_string(),
        identity: identity.to_string(),
    }
}

fn already_finalized(tenant: &TenantId, identity: &PilotIdentity) -> StorageError {
    StorageError::AlreadyFinalized {
        tenant: tenant.to_string(),
        identity: identity.to_string(),
    }
}

async fn run_blocking<T, F>(op: F) -> PilotLogResult<T>
where
    F: FnOnce() -> PilotLogResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| StorageError::TaskFailed {
            reason: e.to_string(),
        })?
}

#[async_trait]
impl LogCacheBackend for FileCacheBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    async fn append(
        &self,
        tenant: &TenantId,
        identity: &PilotIdentity,
        message: &LogMessage,
    ) -> PilotLogResult<AppendReceipt> {
        let (this, tenant, identity, message) =
            (self.clone(), tenant.clone(), identity.clone(), message.clone());
        run_blocking(move || this.append_sync(&tenant, &identity, &message)).await
    }

    async fn finalize(
        &self,
        tenant: &TenantId,
        identity: &PilotIdentity,
        payload: &FinalizePayload,
    ) -> PilotLogResult<()> {
        let (this, tenant, identity, payload) =
            (self.clone(), tenant.clone(), identity.clone(), payload.clone());
        run_blocking(move || this.finalize_sync(&tenant, &identity, &payload)).await
    }

    async fn list(&self, tenant: &TenantId) -> PilotLogResult<LogListing> {
        let (this, tenant) = (self.clone(), tenant.clone());
        run_blocking(move || this.list_sync(&tenant)).await
    }

    async fn read(
        &self,
        tenant: &TenantId,
        identity: &PilotIdentity,
    ) -> PilotLogResult<PilotLogRecord> {
        let (this, tenant, identity) = (self.clone(), tenant.clone(), identity.clone());
        run_blocking(move || this.read_sync(&tenant, &identity)).await
    }

    async fn delete(&self, tenant: &TenantId, identities: &[String]) -> PilotLogResult<DeleteReport> {
        let (this, tenant, identities) = (self.clone(), tenant.clone(), identities.to_vec());
        run_blocking(move || this.delete_sync(&tenant, &identities)).await
    }

    async fn evict(&self, tenant: &TenantId, retention_days: u32) -> PilotLogResult<EvictionReport> {
        let (this, tenant) = (self.clone(), tenant.clone());
        run_blocking(move || this.evict_sync(&tenant, retention_days)).await
    }

    async fn metadata(&self) -> PilotLogResult<BackendMetadata> {
        let this = self.clone();
        run_blocking(move || this.metadata_sync()).await
    }
}

// =============================================================================
// TESTS
// =============================================================================
