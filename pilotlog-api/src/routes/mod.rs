//! REST API Routes Module
//!
//! Includes:
//! - Pilot routes (own-tenant append, finalise, read)
//! - Administrative routes (metadata, list, delete, clear, cross-tenant read)
//! - Health check endpoints (Kubernetes-compatible)
//! - Prometheus metrics and the OpenAPI document

pub mod admin;
pub mod health;
pub mod pilot;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, header::HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;

use crate::auth::AuthConfig;
use crate::config::ServiceConfig;
use crate::constants::API_KEY_HEADER;
use crate::middleware::{auth_middleware, AuthMiddlewareState};
use crate::service::LoggingService;
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware, TelemetryConfig};

pub use admin::create_router as admin_router;
pub use health::create_router as health_router;
pub use pilot::create_router as pilot_router;

/// Max age for CORS preflight cache.
const CORS_MAX_AGE: Duration = Duration::from_secs(86400);

#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

fn build_cors_layer(config: &ServiceConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(API_KEY_HEADER),
        ])
        .max_age(CORS_MAX_AGE);

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricted origins");
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    }
}

/// Create the complete API router with authentication from static config.
pub fn create_api_router(
    service: LoggingService,
    config: &ServiceConfig,
    auth_config: AuthConfig,
    telemetry: &TelemetryConfig,
) -> Router {
    build_router(
        service,
        config,
        AuthMiddlewareState::new(auth_config),
        telemetry.metrics_enabled,
    )
}

/// Create the API router over an explicit authentication state.
///
/// Layers, outermost first: CORS, observability, request timeout, body
/// limit. `/api/v1/*` additionally requires a valid API key; health, metrics
/// and the OpenAPI document do not.
pub fn build_router(
    service: LoggingService,
    config: &ServiceConfig,
    auth_state: AuthMiddlewareState,
    metrics_enabled: bool,
) -> Router {
    let state = AppState::new(service);

    let api_routes = Router::new()
        .nest("/pilots", pilot::create_router())
        .nest("/tenants", admin::create_router())
        .route("/metadata", get(admin::get_metadata))
        .layer(from_fn_with_state(auth_state, auth_middleware))
        .with_state(state.clone());

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .nest(
            "/health",
            health::create_router(state.service.clone(), state.start_time),
        );

    if metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    #[cfg(feature = "openapi")]
    {
        router = router.route("/openapi.json", get(openapi_json));
    }

    router.layer(
        ServiceBuilder::new()
            .layer(build_cors_layer(config))
            .layer(from_fn(observability_middleware))
            .layer(TimeoutLayer::new(config.request_timeout))
            .layer(DefaultBodyLimit::max(config.body_limit_bytes)),
    )
}
