//! Tenant identity and resolution
//!
//! Every endpoint, queue, and log entry is scoped to exactly one tenant.
//! Tenant identification itself (sessions, tokens) lives outside this
//! system; callers supply a [`TenantProvider`] at construction time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque tenant identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Supplies the tenant of the current caller
pub trait TenantProvider: Send + Sync {
    fn current_tenant(&self) -> TenantId;
}

/// Fixed-tenant provider for single-tenant deployments and tests
#[derive(Debug, Clone)]
pub struct StaticTenant {
    tenant: TenantId,
}

impl StaticTenant {
    pub fn new(tenant: impl Into<TenantId>) -> Self {
        Self {
            tenant: tenant.into(),
        }
    }
}

impl TenantProvider for StaticTenant {
    fn current_tenant(&self) -> TenantId {
        self.tenant.clone()
    }
}
