//! Prometheus Metrics Definitions
//!
//! Defines the pilot log service metrics and exposes a /metrics endpoint for
//! Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Backend operation latency buckets (seconds)
const BACKEND_LATENCY_BUCKETS: &[f64] =
    &[0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 5.0];

/// Global metrics instance - initialized once on first use
pub static METRICS: Lazy<ApiResult<PilotLogMetrics>> = Lazy::new(PilotLogMetrics::new);

/// Run `f` against the global metrics if they registered successfully.
pub fn with_metrics(f: impl FnOnce(&PilotLogMetrics)) {
    if let Ok(metrics) = METRICS.as_ref() {
        f(metrics);
    }
}

/// Container for all pilot log metrics.
#[derive(Clone)]
pub struct PilotLogMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Backend operation counter - labels: backend, operation, status
    pub backend_operations_total: CounterVec,

    /// Backend operation duration histogram - labels: backend, operation
    pub backend_operation_duration_seconds: HistogramVec,

    /// Archive upload counter - labels: status (success/failure)
    pub uploads_total: CounterVec,

    /// Evicted record counter - labels: tenant
    pub evicted_records_total: CounterVec,
}

impl PilotLogMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "pilotlog_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| registration_error("http_requests_total", e))?,

            http_request_duration_seconds: register_histogram_vec!(
                "pilotlog_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("http_request_duration_seconds", e))?,

            backend_operations_total: register_counter_vec!(
                "pilotlog_backend_operations_total",
                "Total number of log cache backend operations",
                &["backend", "operation", "status"]
            )
            .map_err(|e| registration_error("backend_operations_total", e))?,

            backend_operation_duration_seconds: register_histogram_vec!(
                "pilotlog_backend_operation_duration_seconds",
                "Log cache backend operation duration in seconds",
                &["backend", "operation"],
                BACKEND_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| registration_error("backend_operation_duration_seconds", e))?,

            uploads_total: register_counter_vec!(
                "pilotlog_uploads_total",
                "Total finalized logs handed to the archive store",
                &["status"]
            )
            .map_err(|e| registration_error("uploads_total", e))?,

            evicted_records_total: register_counter_vec!(
                "pilotlog_evicted_records_total",
                "Total cache records removed by age-based eviction",
                &["tenant"]
            )
            .map_err(|e| registration_error("evicted_records_total", e))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record a backend operation.
    pub fn record_backend_operation(
        &self,
        backend: &str,
        operation: &str,
        success: bool,
        duration_secs: f64,
    ) {
        let status = if success { "success" } else { "error" };
        self.backend_operations_total
            .with_label_values(&[backend, operation, status])
            .inc();
        self.backend_operation_duration_seconds
            .with_label_values(&[backend, operation])
            .observe(duration_secs);
    }

    /// Record one archive upload attempt.
    pub fn record_upload(&self, success: bool) {
        let status = if success { "success" } else { "failure" };
        self.uploads_total.with_label_values(&[status]).inc();
    }

    /// Record evicted records for a tenant.
    pub fn record_evicted(&self, tenant: &str, count: usize) {
        self.evicted_records_total
            .with_label_values(&[tenant])
            .inc_by(count as f64);
    }
}

fn registration_error(name: &str, err: prometheus::Error) -> ApiError {
    ApiError::internal_error(format!("Failed to register {}: {}", name, err))
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Observability",
    responses(
        (status = 200, description = "Prometheus metrics in text format", content_type = "text/plain"),
        (status = 500, description = "Failed to encode metrics"),
    ),
)]
pub async fn metrics_handler() -> impl IntoResponse {
    // touch the registry so families exist before the first request lands
    Lazy::force(&METRICS);

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
