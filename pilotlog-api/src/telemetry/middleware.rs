//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request in a tracing span and records Prometheus metrics.

use axum::{extract::Request, middleware::Next, response::Response};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::with_metrics;

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}(/|$)")
        .expect("Invalid UUID regex")
});

static STAMP_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/[0-9a-fA-F]{32}(/|$)").expect("Invalid stamp regex"));

static TENANT_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/tenants/[^/]+").expect("Invalid tenant regex"));

static PILOT_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/pilots/[^/]+").expect("Invalid pilot regex"));

/// Normalize path for metrics/spans.
///
/// Pilot identities and tenant names are replaced with placeholders to keep
/// Prometheus label cardinality bounded.
pub fn normalize_path(path: &str) -> String {
    let result = UUID_SEGMENT.replace_all(path, "/{identity}$1");
    let result = STAMP_SEGMENT.replace_all(&result, "/{identity}$1");
    let result = PILOT_SEGMENT.replace_all(&result, "/pilots/{identity}");
    let result = TENANT_SEGMENT.replace_all(&result, "/tenants/{tenant}");
    result.to_string()
}

/// Observability middleware for Axum.
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.route = %normalized_path,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();
    with_metrics(|m| {
        m.record_http_request(
            method.as_str(),
            &normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        )
    });

    tracing::info!(
        method = %method,
        path = %normalized_path,
        status = status.as_u16(),
        duration_ms = duration.as_millis() as u64,
        "Request completed"
    );

    response
}
