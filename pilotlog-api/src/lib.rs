//! Pilot Log API - HTTP Front Door and Upload Agent
//!
//! Authenticated REST endpoints through which pilots stream their log lines
//! into a multi-tenant cache, and through which operators list, delete and
//! clear those logs. A background agent archives finalized logs into durable
//! storage and evicts stale records.
//!
//! Storage itself lives in `pilotlog-storage`; this crate owns caller
//! authorization, request hardening, telemetry and the agent.

#[macro_use]
pub mod macros;

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod extractors;
pub mod jobs;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod service;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use auth::{AuthConfig, AuthContext};
pub use config::ServiceConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::{build_router, create_api_router};
pub use service::LoggingService;
pub use state::AppState;
