//! Administrative REST API Routes
//!
//! Bulk operations over a tenant's cache: list finalised logs, delete after
//! archival, evict by age, plus backend metadata and cross-tenant reads.
//! Restricted to Operator and TrustedHost callers.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use pilotlog_core::LogListing;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extractors::ApiJson;
use crate::middleware::AuthExtractor;
use crate::routes::pilot::LogResponse;
use crate::service::LoggingService;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MetadataResponse {
    pub ok: bool,
    pub backend: String,
    pub log_root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeleteLogsRequest {
    pub identities: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DeleteLogsResponse {
    pub ok: bool,
    pub deleted: Vec<String>,
    /// identity -> reason, for items that could not be deleted
    pub failed: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ClearLogsRequest {
    pub retention_days: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClearLogsResponse {
    pub ok: bool,
    /// Number of records removed
    pub evicted: usize,
    pub failed: BTreeMap<String, String>,
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET /api/v1/metadata - Backend descriptor
#[utoipa::path(
    get,
    path = "/api/v1/metadata",
    tag = "Administration",
    responses(
        (status = 200, description = "Backend metadata", body = MetadataResponse),
        (status = 403, description = "Caller may not read metadata", body = ApiError),
        (status = 503, description = "Backend has no usable log root", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn get_metadata(
    State(service): State<Arc<LoggingService>>,
    auth: AuthExtractor,
) -> ApiResult<Json<MetadataResponse>> {
    let metadata = service.get_metadata(&auth).await?;
    Ok(Json(MetadataResponse {
        ok: true,
        backend: metadata.backend,
        log_root: metadata.log_root,
    }))
}

/// GET /api/v1/tenants/{tenant}/logs - Finalised logs of a tenant
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant}/logs",
    tag = "Administration",
    params(("tenant" = String, Path, description = "Tenant (VO) name")),
    responses(
        (status = 200, description = "Finalised logs keyed by identity", body = LogListing),
        (status = 400, description = "Invalid tenant", body = ApiError),
        (status = 403, description = "Caller may not list logs", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn get_logs(
    State(service): State<Arc<LoggingService>>,
    auth: AuthExtractor,
    Path(tenant): Path<String>,
) -> ApiResult<Json<LogListing>> {
    let listing = service.get_logs(&auth, &tenant).await?;
    Ok(Json(listing))
}

/// GET /api/v1/tenants/{tenant}/pilots/{identity}/log - Read any log of a tenant
#[utoipa::path(
    get,
    path = "/api/v1/tenants/{tenant}/pilots/{identity}/log",
    tag = "Administration",
    params(
        ("tenant" = String, Path, description = "Tenant (VO) name"),
        ("identity" = String, Path, description = "Pilot stamp or canonical UUID"),
    ),
    responses(
        (status = 200, description = "Log content", body = LogResponse),
        (status = 400, description = "Invalid tenant or identity", body = ApiError),
        (status = 403, description = "Caller may not read this tenant", body = ApiError),
        (status = 404, description = "No log for the identity", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn get_tenant_log(
    State(service): State<Arc<LoggingService>>,
    auth: AuthExtractor,
    Path((tenant, identity)): Path<(String, String)>,
) -> ApiResult<Json<LogResponse>> {
    let record = service.get_tenant_log(&auth, &tenant, &identity).await?;
    Ok(Json(record.into()))
}

/// POST /api/v1/tenants/{tenant}/logs/delete - Best-effort bulk delete
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant}/logs/delete",
    tag = "Administration",
    params(("tenant" = String, Path, description = "Tenant (VO) name")),
    request_body = DeleteLogsRequest,
    responses(
        (status = 200, description = "Per-item delete outcome", body = DeleteLogsResponse),
        (status = 400, description = "Invalid tenant", body = ApiError),
        (status = 403, description = "Caller may not delete logs", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn delete_logs(
    State(service): State<Arc<LoggingService>>,
    auth: AuthExtractor,
    Path(tenant): Path<String>,
    ApiJson(req): ApiJson<DeleteLogsRequest>,
) -> ApiResult<Json<DeleteLogsResponse>> {
    let report = service.delete_logs(&auth, &tenant, &req.identities).await?;
    Ok(Json(DeleteLogsResponse {
        ok: true,
        deleted: report.deleted,
        failed: report.failed,
    }))
}

/// POST /api/v1/tenants/{tenant}/logs/clear - Evict logs older than the window
#[utoipa::path(
    post,
    path = "/api/v1/tenants/{tenant}/logs/clear",
    tag = "Administration",
    params(("tenant" = String, Path, description = "Tenant (VO) name")),
    request_body = ClearLogsRequest,
    responses(
        (status = 200, description = "Eviction outcome", body = ClearLogsResponse),
        (status = 400, description = "Invalid tenant", body = ApiError),
        (status = 403, description = "Caller may not evict logs", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn clear_logs(
    State(service): State<Arc<LoggingService>>,
    auth: AuthExtractor,
    Path(tenant): Path<String>,
    ApiJson(req): ApiJson<ClearLogsRequest>,
) -> ApiResult<Json<ClearLogsResponse>> {
    let report = service
        .clear_logs(&auth, &tenant, req.retention_days)
        .await?;
    Ok(Json(ClearLogsResponse {
        ok: true,
        evicted: report.evicted.len(),
        failed: report.failed,
    }))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Tenant-scoped administrative routes (mounted under `/tenants`).
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/:tenant/logs", get(get_logs))
        .route("/:tenant/logs/delete", post(delete_logs))
        .route("/:tenant/logs/clear", post(clear_logs))
        .route("/:tenant/pilots/:identity/log", get(get_tenant_log))
}
