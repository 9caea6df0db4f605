//! Pilot Log REST API Routes
//!
//! Operations a pilot performs on its own log: stream messages, finalise,
//! read back. The tenant always comes from the caller's credentials.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use pilotlog_core::{FinalizePayload, LogMessage, PilotLogRecord};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::extractors::ApiJson;
use crate::middleware::AuthExtractor;
use crate::service::LoggingService;
use crate::state::AppState;

// ============================================================================
// TYPES
// ============================================================================

/// Request body for sendMessage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SendMessageRequest {
    /// A JSON array of line strings, or a string appended verbatim.
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub message: serde_json::Value,
}

/// Acknowledgement of an append.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub ok: bool,
    pub identity: String,
    pub tenant: String,
    pub bytes_written: usize,
}

/// Generic success marker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub const OK: Self = Self { ok: true };
}

/// One pilot log with its lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct LogResponse {
    pub ok: bool,
    pub identity: String,
    pub tenant: String,
    /// `open` or `finalized`
    pub state: String,
    pub content: String,
    pub last_modified: chrono::DateTime<chrono::Utc>,
}

impl From<PilotLogRecord> for LogResponse {
    fn from(record: PilotLogRecord) -> Self {
        Self {
            ok: true,
            identity: record.identity.to_string(),
            tenant: record.tenant.to_string(),
            state: record.state.to_string(),
            content: record.content,
            last_modified: record.last_modified,
        }
    }
}

// ============================================================================
// HANDLERS
// ============================================================================

/// POST /api/v1/pilots/{identity}/messages - Append to the pilot's log
#[utoipa::path(
    post,
    path = "/api/v1/pilots/{identity}/messages",
    tag = "Pilot Logs",
    params(("identity" = String, Path, description = "Pilot stamp or canonical UUID")),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message appended", body = SendMessageResponse),
        (status = 400, description = "Invalid identity or payload", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 403, description = "Caller may not append", body = ApiError),
        (status = 409, description = "Log already finalised", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn send_message(
    State(service): State<Arc<LoggingService>>,
    auth: AuthExtractor,
    Path(identity): Path<String>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    let message = LogMessage::from_value(req.message)?;
    let receipt = service.send_message(&auth, &identity, &message).await?;
    Ok(Json(SendMessageResponse {
        ok: true,
        identity: receipt.identity,
        tenant: receipt.tenant,
        bytes_written: receipt.bytes_written,
    }))
}

/// POST /api/v1/pilots/{identity}/finalise - Finalise the pilot's log
///
/// The body is optional. It may be a JSON object `{"retCode": n}` or a JSON
/// string carrying that object encoded.
#[utoipa::path(
    post,
    path = "/api/v1/pilots/{identity}/finalise",
    tag = "Pilot Logs",
    params(("identity" = String, Path, description = "Pilot stamp or canonical UUID")),
    request_body(content = FinalizePayload, description = "Optional finalise payload"),
    responses(
        (status = 200, description = "Log finalised", body = OkResponse),
        (status = 400, description = "Invalid identity or payload", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
        (status = 404, description = "No open log for the identity", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn finalise_logs(
    State(service): State<Arc<LoggingService>>,
    auth: AuthExtractor,
    Path(identity): Path<String>,
    body: Bytes,
) -> ApiResult<Json<OkResponse>> {
    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        FinalizePayload::default()
    } else {
        FinalizePayload::from_value(serde_json::from_slice(&body)?)?
    };
    service.finalise_logs(&auth, &identity, &payload).await?;
    Ok(Json(OkResponse::OK))
}

/// GET /api/v1/pilots/{identity}/log - Read the pilot's log
#[utoipa::path(
    get,
    path = "/api/v1/pilots/{identity}/log",
    tag = "Pilot Logs",
    params(("identity" = String, Path, description = "Pilot stamp or canonical UUID")),
    responses(
        (status = 200, description = "Log content", body = LogResponse),
        (status = 400, description = "Invalid identity", body = ApiError),
        (status = 404, description = "No log for the identity", body = ApiError),
    ),
    security(("api_key" = []))
)]
pub async fn get_log(
    State(service): State<Arc<LoggingService>>,
    auth: AuthExtractor,
    Path(identity): Path<String>,
) -> ApiResult<Json<LogResponse>> {
    let record = service.get_log(&auth, &identity).await?;
    Ok(Json(record.into()))
}

// ============================================================================
// ROUTER
// ============================================================================

/// Create the pilot routes router (mounted under `/pilots`).
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/:identity/messages", post(send_message))
        .route("/:identity/finalise", post(finalise_logs))
        .route("/:identity/log", get(get_log))
}
