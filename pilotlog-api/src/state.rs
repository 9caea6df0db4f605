//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use crate::service::LoggingService;

/// Application-wide state shared across all routes.
///
/// Built once at startup and handed to every handler; there is no global
/// backend handle.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LoggingService>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(service: LoggingService) -> Self {
        Self {
            service: Arc::new(service),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(Arc<LoggingService>, service);
crate::impl_from_ref!(Instant, start_time);
