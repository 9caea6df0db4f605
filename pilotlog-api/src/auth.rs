//! Authentication Module
//!
//! Callers authenticate with an API key (`X-API-Key` header). The key
//! resolves to a [`CallerIdentity`] (principal, group, roles) through a
//! [`CredentialResolver`], and the group resolves to a tenant through a
//! [`TenantResolver`]. Both resolvers are traits so deployments can plug in
//! their own registry; the static implementations here are loaded from the
//! environment.
//!
//! Authorization is a fixed role policy per [`Operation`]: pilots may append,
//! finalize and read their own logs, while bulk operations are reserved for
//! operators and trusted hosts.

use crate::error::{ApiError, ApiResult};
use pilotlog_core::{ConfigError, TenantId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ROLES AND OPERATIONS
// ============================================================================

/// Caller role as carried by credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum CallerRole {
    Pilot,
    GenericPilot,
    Operator,
    TrustedHost,
}

impl CallerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallerRole::Pilot => "Pilot",
            CallerRole::GenericPilot => "GenericPilot",
            CallerRole::Operator => "Operator",
            CallerRole::TrustedHost => "TrustedHost",
        }
    }
}

impl fmt::Display for CallerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallerRole {
    type Err = ConfigError;

    /// Parse a role name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pilot" => Ok(CallerRole::Pilot),
            "genericpilot" => Ok(CallerRole::GenericPilot),
            "operator" => Ok(CallerRole::Operator),
            "trustedhost" => Ok(CallerRole::TrustedHost),
            _ => Err(ConfigError::InvalidValue {
                field: "role".to_string(),
                value: s.to_string(),
                reason: "expected Pilot, GenericPilot, Operator or TrustedHost".to_string(),
            }),
        }
    }
}

/// Operations exposed by the logging service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Append,
    Finalize,
    Read,
    Metadata,
    List,
    Delete,
    Evict,
}

const PILOT_ROLES: &[CallerRole] = &[
    CallerRole::Operator,
    CallerRole::Pilot,
    CallerRole::GenericPilot,
];

const ADMIN_ROLES: &[CallerRole] = &[CallerRole::Operator, CallerRole::TrustedHost];

impl Operation {
    /// Roles allowed to invoke this operation.
    pub fn allowed_roles(&self) -> &'static [CallerRole] {
        match self {
            Operation::Append | Operation::Finalize | Operation::Read => PILOT_ROLES,
            Operation::Metadata | Operation::List | Operation::Delete | Operation::Evict => {
                ADMIN_ROLES
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Append => "append",
            Operation::Finalize => "finalize",
            Operation::Read => "read",
            Operation::Metadata => "metadata",
            Operation::List => "list",
            Operation::Delete => "delete",
            Operation::Evict => "evict",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CALLER IDENTITY AND RESOLVERS
// ============================================================================

/// Who a credential belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub principal: String,
    pub group: String,
    pub roles: Vec<CallerRole>,
}

impl CallerIdentity {
    pub fn new(principal: impl Into<String>, group: impl Into<String>, roles: Vec<CallerRole>) -> Self {
        Self {
            principal: principal.into(),
            group: group.into(),
            roles,
        }
    }

    pub fn has_role(&self, role: CallerRole) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[CallerRole]) -> bool {
        roles.iter().any(|role| self.has_role(*role))
    }
}

/// Maps a presented credential to a caller.
pub trait CredentialResolver: Send + Sync {
    fn resolve(&self, api_key: &str) -> Option<CallerIdentity>;
}

/// Maps a caller group to its tenant (VO).
pub trait TenantResolver: Send + Sync {
    fn tenant_for_group(&self, group: &str) -> Option<TenantId>;
}

/// One configured API key.
#[derive(Clone)]
pub struct ApiKeyEntry {
    key: SecretString,
    pub identity: CallerIdentity,
}

impl ApiKeyEntry {
    pub fn new(key: impl Into<String>, identity: CallerIdentity) -> Self {
        let key: String = key.into();
        Self {
            key: SecretString::from(key),
            identity,
        }
    }

    fn matches(&self, presented: &str) -> bool {
        self.key.expose_secret() == presented
    }

    /// Parse `key:principal:group:role|role`.
    pub fn parse(entry: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidValue {
            field: "PILOTLOG_API_KEYS".to_string(),
            // never echo the key itself
            value: entry.split(':').skip(1).collect::<Vec<_>>().join(":"),
            reason: reason.to_string(),
        };
        let parts: Vec<&str> = entry.trim().splitn(4, ':').collect();
        let [key, principal, group, roles] = parts.as_slice() else {
            return Err(invalid("expected key:principal:group:roles"));
        };
        if key.is_empty() || principal.is_empty() {
            return Err(invalid("key and principal must not be empty"));
        }
        let roles = roles
            .split('|')
            .filter(|r| !r.trim().is_empty())
            .map(CallerRole::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        if roles.is_empty() {
            return Err(invalid("at least one role is required"));
        }
        Ok(Self::new(*key, CallerIdentity::new(*principal, *group, roles)))
    }
}

impl fmt::Debug for ApiKeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyEntry")
            .field("key", &"[REDACTED]")
            .field("identity", &self.identity)
            .finish()
    }
}

/// In-memory table of API keys.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    entries: Vec<ApiKeyEntry>,
}

impl StaticCredentials {
    pub fn new(entries: Vec<ApiKeyEntry>) -> Self {
        Self { entries }
    }

    pub fn add(&mut self, entry: ApiKeyEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CredentialResolver for StaticCredentials {
    fn resolve(&self, api_key: &str) -> Option<CallerIdentity> {
        self.entries
            .iter()
            .find(|entry| entry.matches(api_key))
            .map(|entry| entry.identity.clone())
    }
}

/// In-memory group to tenant map.
#[derive(Debug, Clone, Default)]
pub struct StaticTenantMap {
    groups: HashMap<String, TenantId>,
}

impl StaticTenantMap {
    pub fn insert(&mut self, group: impl Into<String>, tenant: TenantId) {
        self.groups.insert(group.into(), tenant);
    }

    /// Parse comma-separated `group=tenant` entries.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut map = Self::default();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (group, tenant) = entry.split_once('=').ok_or_else(|| ConfigError::InvalidValue {
                field: "PILOTLOG_GROUP_TENANTS".to_string(),
                value: entry.to_string(),
                reason: "expected group=tenant".to_string(),
            })?;
            let tenant = TenantId::parse(tenant.trim()).map_err(|e| ConfigError::InvalidValue {
                field: "PILOTLOG_GROUP_TENANTS".to_string(),
                value: entry.to_string(),
                reason: e.to_string(),
            })?;
            map.insert(group.trim(), tenant);
        }
        Ok(map)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl TenantResolver for StaticTenantMap {
    fn tenant_for_group(&self, group: &str) -> Option<TenantId> {
        self.groups.get(group).cloned()
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub credentials: StaticCredentials,
    pub group_tenants: StaticTenantMap,
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `PILOTLOG_API_KEYS`: comma-separated `key:principal:group:role|role`
    /// - `PILOTLOG_GROUP_TENANTS`: comma-separated `group=tenant`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut credentials = StaticCredentials::default();
        if let Ok(raw) = std::env::var("PILOTLOG_API_KEYS") {
            for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
                credentials.add(ApiKeyEntry::parse(entry)?);
            }
        }

        let group_tenants = match std::env::var("PILOTLOG_GROUP_TENANTS") {
            Ok(raw) => StaticTenantMap::parse(&raw)?,
            Err(_) => StaticTenantMap::default(),
        };

        if credentials.is_empty() {
            tracing::warn!("No API keys configured; every request will be rejected");
        }

        Ok(Self {
            credentials,
            group_tenants,
        })
    }

    pub fn add_api_key(&mut self, entry: ApiKeyEntry) {
        self.credentials.add(entry);
    }

    pub fn map_group(&mut self, group: impl Into<String>, tenant: TenantId) {
        self.group_tenants.insert(group, tenant);
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Authentication context injected into request extensions.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub caller: CallerIdentity,

    /// Tenant of the caller's group, if it has one.
    pub tenant: Option<TenantId>,
}

impl AuthContext {
    pub fn new(caller: CallerIdentity, tenant: Option<TenantId>) -> Self {
        Self { caller, tenant }
    }

    /// Fail with 403 unless a caller role is allowed for `operation`.
    pub fn authorize(&self, operation: Operation) -> ApiResult<()> {
        if self.caller.has_any_role(operation.allowed_roles()) {
            Ok(())
        } else {
            tracing::warn!(
                principal = %self.caller.principal,
                operation = %operation,
                "Caller role not permitted"
            );
            Err(ApiError::forbidden(format!(
                "Operation '{}' is not permitted for this caller",
                operation
            )))
        }
    }

    /// The caller's own tenant; 403 when its group has none.
    pub fn own_tenant(&self) -> ApiResult<&TenantId> {
        self.tenant.as_ref().ok_or_else(|| {
            ApiError::forbidden(format!("No tenant configured for group '{}'", self.caller.group))
        })
    }
}

// ============================================================================
// AUTHENTICATION FUNCTIONS
// ============================================================================

/// Authenticate an API key and resolve the caller's tenant.
pub fn authenticate(
    credentials: &dyn CredentialResolver,
    tenants: &dyn TenantResolver,
    api_key: Option<&str>,
) -> ApiResult<AuthContext> {
    let api_key = api_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::unauthorized("Authentication required: provide X-API-Key"))?;
    let caller = credentials
        .resolve(api_key)
        .ok_or_else(|| ApiError::unauthorized("Invalid API key"))?;
    let tenant = tenants.tenant_for_group(&caller.group);
    Ok(AuthContext::new(caller, tenant))
}

// ============================================================================
// TESTS
// ============================================================================
