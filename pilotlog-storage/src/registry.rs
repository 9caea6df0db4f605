//! Compile-time registry of backend variants.
//!
//! The configured backend key selects a constructor from a fixed table at
//! startup. Extra variants can be registered before the service is built.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use pilotlog_core::{ConfigError, PilotLogResult};
use tokio::sync::mpsc;

use crate::file_cache::{self, FileCacheBackend};
use crate::noop::{self, NoopBackend};
use crate::relay::{self, MessageRelayBackend, RelayEnvelope, DEFAULT_CHANNEL_CAPACITY};
use crate::traits::LogCacheBackend;

/// Inputs every backend constructor may draw on.
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub log_root: PathBuf,
    pub relay_capacity: usize,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            log_root: PathBuf::from("pilotlogs"),
            relay_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// A constructed backend. Relay backends also hand back their receiver so
/// the caller can attach a forwarder.
pub struct BackendHandle {
    pub backend: Arc<dyn LogCacheBackend>,
    pub relay_rx: Option<mpsc::Receiver<RelayEnvelope>>,
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("backend", &self.backend.name())
            .field("relay_rx", &self.relay_rx.is_some())
            .finish()
    }
}

pub type BackendConstructor = fn(&BackendSettings) -> PilotLogResult<BackendHandle>;

fn build_file(settings: &BackendSettings) -> PilotLogResult<BackendHandle> {
    Ok(BackendHandle {
        backend: Arc::new(FileCacheBackend::new(settings.log_root.clone())?),
        relay_rx: None,
    })
}

fn build_noop(_settings: &BackendSettings) -> PilotLogResult<BackendHandle> {
    Ok(BackendHandle {
        backend: Arc::new(NoopBackend::new()),
        relay_rx: None,
    })
}

fn build_relay(settings: &BackendSettings) -> PilotLogResult<BackendHandle> {
    let (backend, rx) = MessageRelayBackend::with_channel(settings.relay_capacity);
    Ok(BackendHandle {
        backend: Arc::new(backend),
        relay_rx: Some(rx),
    })
}

const BUILTIN: &[(&str, BackendConstructor)] = &[
    (file_cache::BACKEND_NAME, build_file),
    (noop::BACKEND_NAME, build_noop),
    (relay::BACKEND_NAME, build_relay),
];

/// Config key to constructor map.
#[derive(Clone)]
pub struct BackendRegistry {
    entries: BTreeMap<&'static str, BackendConstructor>,
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl BackendRegistry {
    /// Registry holding the file, noop and relay backends.
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN.iter().copied().collect(),
        }
    }

    pub fn register(&mut self, key: &'static str, constructor: BackendConstructor) {
        self.entries.insert(key, constructor);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Construct the backend registered under `key`.
    pub fn build(&self, key: &str, settings: &BackendSettings) -> PilotLogResult<BackendHandle> {
        let constructor = self
            .entries
            .get(key)
            .ok_or_else(|| ConfigError::UnknownBackend {
                key: key.to_string(),
            })?;
        let handle = constructor(settings)?;
        tracing::info!(backend = handle.backend.name(), "Pilot logging backend loaded");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilotlog_core::PilotLogError;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_keys() {
        let registry = BackendRegistry::builtin();
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["file", "noop", "relay"]);
    }

    #[tokio::test]
    async fn test_build_file_backend() {
        let dir = TempDir::new().unwrap();
        let settings = BackendSettings {
            log_root: dir.path().join("logs"),
            ..Default::default()
        };
        let handle = BackendRegistry::builtin().build("file", &settings).unwrap();
        assert_eq!(handle.backend.name(), "file");
        assert!(handle.relay_rx.is_none());
        assert!(handle.backend.metadata().await.is_ok());
    }

    #[tokio::test]
    async fn test_build_relay_returns_receiver() {
        let handle = BackendRegistry::builtin()
            .build("relay", &BackendSettings::default())
            .unwrap();
        assert_eq!(handle.backend.name(), "relay");
        assert!(handle.relay_rx.is_some());
    }

    #[test]
    fn test_unknown_key_is_config_error() {
        let err = BackendRegistry::builtin()
            .build("plugin.so", &BackendSettings::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PilotLogError::Config(ConfigError::UnknownBackend { .. })
        ));
    }

    #[test]
    fn test_register_custom_constructor() {
        fn custom(_: &BackendSettings) -> PilotLogResult<BackendHandle> {
            Ok(BackendHandle {
                backend: Arc::new(NoopBackend::default()),
                relay_rx: None,
            })
        }
        let mut registry = BackendRegistry::builtin();
        registry.register("custom", custom);
        assert!(registry.contains("custom"));
        assert!(registry.build("custom", &BackendSettings::default()).is_ok());
    }
}
