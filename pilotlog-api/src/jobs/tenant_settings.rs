//! Per-tenant archival settings consumed by the upload agent.

use std::collections::BTreeMap;

use pilotlog_core::{ConfigError, TenantId};

/// Archival settings of one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantArchiveSettings {
    /// Remote logging switch. Disabled tenants are skipped.
    pub enabled: bool,
    /// Storage element to upload to.
    pub upload_target: Option<String>,
    /// Directory below `/<tenant>/` in the archive namespace.
    pub upload_path: Option<String>,
}

impl TenantArchiveSettings {
    /// Target and path, or the configuration error naming what is missing.
    pub fn archive_location(&self, tenant: &TenantId) -> Result<(&str, &str), ConfigError> {
        let missing = |what: &str| ConfigError::TenantMisconfigured {
            tenant: tenant.to_string(),
            reason: format!("no {what} configured"),
        };
        let target = self
            .upload_target
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("upload target"))?;
        let path = self
            .upload_path
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("upload path"))?;
        Ok((target, path))
    }
}

/// Source of tenant archival settings.
pub trait TenantSettings: Send + Sync {
    /// Tenants the agent should visit.
    fn tenants(&self) -> Vec<TenantId>;

    fn settings(&self, tenant: &TenantId) -> TenantArchiveSettings;
}

/// Settings table loaded once from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTenantSettings {
    tenants: BTreeMap<TenantId, TenantArchiveSettings>,
}

impl StaticTenantSettings {
    pub fn insert(&mut self, tenant: TenantId, settings: TenantArchiveSettings) {
        self.tenants.insert(tenant, settings);
    }

    /// Parse comma-separated `tenant:enabled:uploadTarget:uploadPath` entries.
    /// Target and path may be left empty; that tenant then fails its cycle
    /// with a configuration error rather than failing startup.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut table = Self::default();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = |reason: String| ConfigError::InvalidValue {
                field: "PILOTLOG_TENANT_SETTINGS".to_string(),
                value: entry.to_string(),
                reason,
            };
            let parts: Vec<&str> = entry.splitn(4, ':').collect();
            let (tenant, enabled, target, path) = match parts.as_slice() {
                [tenant, enabled] => (*tenant, *enabled, "", ""),
                [tenant, enabled, target] => (*tenant, *enabled, *target, ""),
                [tenant, enabled, target, path] => (*tenant, *enabled, *target, *path),
                _ => return Err(invalid("expected tenant:enabled:target:path".to_string())),
            };
            let tenant = TenantId::parse(tenant.trim()).map_err(|e| invalid(e.to_string()))?;
            let enabled = match enabled.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                other => return Err(invalid(format!("enabled flag '{other}' is not a boolean"))),
            };
            let optional = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
            table.insert(
                tenant,
                TenantArchiveSettings {
                    enabled,
                    upload_target: optional(target),
                    upload_path: optional(path),
                },
            );
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

impl TenantSettings for StaticTenantSettings {
    fn tenants(&self) -> Vec<TenantId> {
        self.tenants.keys().cloned().collect()
    }

    fn settings(&self, tenant: &TenantId) -> TenantArchiveSettings {
        self.tenants.get(tenant).cloned().unwrap_or_default()
    }
}
