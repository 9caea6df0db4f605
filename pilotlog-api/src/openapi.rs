//! OpenAPI Specification for the Pilot Log API
//!
//! Generated with utoipa from the route annotations and schema derives.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::admin::{
    ClearLogsRequest, ClearLogsResponse, DeleteLogsRequest, DeleteLogsResponse, MetadataResponse,
};
use crate::routes::health::{ComponentHealth, HealthDetails, HealthResponse, HealthStatus};
use crate::routes::pilot::{LogResponse, OkResponse, SendMessageRequest, SendMessageResponse};
use crate::routes::{admin, health, pilot};
use crate::telemetry::metrics;

use pilotlog_core::{FinalizePayload, LogListing};

/// OpenAPI document for the Pilot Log API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pilot Log API",
        description = "Multi-tenant pilot log cache: streaming, finalisation, archival pickup and eviction",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    tags(
        (name = "Pilot Logs", description = "Pilot-side log streaming and finalisation"),
        (name = "Administration", description = "Bulk tenant operations for operators and trusted hosts"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        pilot::send_message,
        pilot::finalise_logs,
        pilot::get_log,
        admin::get_metadata,
        admin::get_logs,
        admin::get_tenant_log,
        admin::delete_logs,
        admin::clear_logs,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError, ErrorCode,
            SendMessageRequest, SendMessageResponse, OkResponse, LogResponse,
            FinalizePayload, LogListing,
            MetadataResponse, DeleteLogsRequest, DeleteLogsResponse,
            ClearLogsRequest, ClearLogsResponse,
            HealthResponse, HealthStatus, HealthDetails, ComponentHealth
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security scheme modifier for the OpenAPI document.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
            );
        }
    }
}

impl ApiDoc {
    /// Generate OpenAPI spec as JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "Pilot Log API");
        assert!(openapi.paths.paths.contains_key("/api/v1/pilots/{identity}/messages"));
        assert!(openapi.paths.paths.contains_key("/api/v1/tenants/{tenant}/logs/delete"));
        assert!(openapi.paths.paths.contains_key("/health/ready"));
    }

    #[test]
    fn test_security_scheme_registered() {
        let openapi = ApiDoc::openapi();
        let components = openapi.components.expect("components should exist");
        assert!(components.security_schemes.contains_key("api_key"));
    }

    #[test]
    fn test_to_json() {
        let json = ApiDoc::to_json().unwrap();
        assert!(json.contains("\"Pilot Log API\""));
    }
}
