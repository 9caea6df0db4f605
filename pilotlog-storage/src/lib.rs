//! Pilot Log Storage - log cache backends
//!
//! Defines the [`LogCacheBackend`] capability set and its variants: the
//! filesystem store used in production, a no-op fallback, and a message
//! relay that forwards parsed lines instead of caching them.

pub mod file_cache;
pub mod noop;
pub mod registry;
pub mod relay;
pub mod traits;

pub use file_cache::FileCacheBackend;
pub use noop::NoopBackend;
pub use registry::{BackendConstructor, BackendHandle, BackendRegistry, BackendSettings};
pub use relay::{ChannelSink, MessageRelayBackend, RelayEnvelope, RelayRecord, RelaySink};
pub use traits::LogCacheBackend;
