//! Axum Middleware for Authentication
//!
//! This module provides Axum middleware that:
//! - Reads the `X-API-Key` header
//! - Resolves the caller and the caller's tenant
//! - Injects AuthContext into request extensions
//! - Returns 401 for unauthenticated requests
//!
//! Role checks happen per operation in the service layer, since the same
//! route tree mixes pilot and administrative operations.

use crate::auth::{authenticate, AuthConfig, AuthContext, CredentialResolver, TenantResolver};
use crate::constants::API_KEY_HEADER;
use crate::error::ApiError;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

// ============================================================================
// MIDDLEWARE STATE
// ============================================================================

/// Shared state for authentication middleware.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub credentials: Arc<dyn CredentialResolver>,
    pub tenants: Arc<dyn TenantResolver>,
}

impl AuthMiddlewareState {
    /// Create middleware state from the static configuration.
    pub fn new(auth_config: AuthConfig) -> Self {
        Self {
            credentials: Arc::new(auth_config.credentials),
            tenants: Arc::new(auth_config.group_tenants),
        }
    }

    /// Create middleware state over custom resolvers.
    pub fn with_resolvers(
        credentials: Arc<dyn CredentialResolver>,
        tenants: Arc<dyn TenantResolver>,
    ) -> Self {
        Self {
            credentials,
            tenants,
        }
    }
}

impl std::fmt::Debug for AuthMiddlewareState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthMiddlewareState").finish_non_exhaustive()
    }
}

// ============================================================================
// MIDDLEWARE FUNCTION
// ============================================================================

/// Axum middleware for authentication.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use pilotlog_api::middleware::{auth_middleware, AuthMiddlewareState};
/// use pilotlog_api::AuthConfig;
///
/// let auth_state = AuthMiddlewareState::new(AuthConfig::from_env()?);
///
/// let app = Router::new()
///     .route("/api/v1/metadata", axum::routing::get(|| async { "OK" }))
///     .layer(middleware::from_fn_with_state(auth_state, auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|h| h.to_str().ok());

    let auth_context = authenticate(state.credentials.as_ref(), state.tenants.as_ref(), api_key)
        .inspect_err(|e| tracing::debug!(error = %e, "Request rejected by authentication"))?;

    request.extensions_mut().insert(auth_context);
    Ok(next.run(request).await)
}

// ============================================================================
// TYPED EXTRACTOR
// ============================================================================

/// Typed Axum extractor for authentication context.
///
/// `auth_middleware` must be applied to the route; without it the extractor
/// fails with 500.
#[derive(Debug, Clone)]
pub struct AuthExtractor(pub AuthContext);

#[async_trait]
impl<S> FromRequestParts<S> for AuthExtractor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthExtractor)
            .ok_or_else(|| {
                ApiError::internal_error(
                    "AuthContext not found in request extensions. \
                     Ensure auth_middleware is applied to this route.",
                )
            })
    }
}

impl std::ops::Deref for AuthExtractor {
    type Target = AuthContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ApiKeyEntry, CallerIdentity, CallerRole};
    use crate::error::ErrorCode;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use pilotlog_core::TenantId;
    use tower::ServiceExt;

    fn app() -> Router {
        let mut config = AuthConfig::default();
        config.add_api_key(ApiKeyEntry::new(
            "pilot-key",
            CallerIdentity::new("pilot", "vo1_pilot", vec![CallerRole::Pilot]),
        ));
        config.map_group("vo1_pilot", TenantId::parse("vo1").unwrap());

        Router::new()
            .route(
                "/whoami",
                get(|auth: AuthExtractor| async move {
                    auth.tenant.as_ref().map(|t| t.to_string()).unwrap_or_default()
                }),
            )
            .layer(middleware::from_fn_with_state(
                AuthMiddlewareState::new(config),
                auth_middleware,
            ))
    }

    #[tokio::test]
    async fn test_missing_key_is_unauthorized() {
        let response = app()
            .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_key_injects_context() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header("X-API-Key", "pilot-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_fails() {
        let mut parts = Request::builder().uri("/").body(()).unwrap().into_parts().0;
        let err = AuthExtractor::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
    }
}
