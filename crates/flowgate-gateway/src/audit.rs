//! Request/response audit trail
//!
//! Bounded, tenant-scoped log of every routing outcome, including the
//! early-rejection cases, so failed routes are observable identically to
//! successful ones.

use chrono::{DateTime, Utc};
use flowgate_core::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// One routed request and its outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub tenant: TenantId,
    pub request_id: Uuid,
    pub endpoint_id: Uuid,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Build an entry from a request/response exchange
    pub fn from_exchange(request: &OutboundRequest, response: &OutboundResponse) -> Self {
        Self {
            id: Uuid::now_v7(),
            tenant: request.tenant.clone(),
            request_id: request.id,
            endpoint_id: request.endpoint_id,
            method: request.method.clone(),
            path: request.path.clone(),
            status: response.status,
            success: response.success,
            error: response.error.clone(),
            duration_ms: response.duration_ms,
            timestamp: Utc::now(),
        }
    }
}

/// Bounded audit trail shared by all routing paths
pub struct AuditLog {
    entries: RwLock<BoundedLog<AuditEntry>>,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(BoundedLog::new(capacity)),
        }
    }

    pub async fn push(&self, entry: AuditEntry) {
        self.entries.write().await.push(entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Tenant-scoped entries, newest first, optionally time-filtered,
    /// capped at `limit`
    pub async fn query(
        &self,
        tenant: &TenantId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .rev()
            .filter(|e| &e.tenant == tenant)
            .filter(|e| from.map(|f| e.timestamp >= f).unwrap_or(true))
            .filter(|e| to.map(|t| e.timestamp <= t).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tenant: &str, path: &str) -> AuditEntry {
        let mut request = OutboundRequest::new(Uuid::new_v4(), "GET", path);
        request.tenant = TenantId::new(tenant);
        let response = OutboundResponse::ok(request.id, 200, "");
        AuditEntry::from_exchange(&request, &response)
    }

    #[tokio::test]
    async fn test_query_is_tenant_scoped_and_descending() {
        let log = AuditLog::new(100);
        log.push(entry("acme", "/a")).await;
        log.push(entry("rival", "/x")).await;
        log.push(entry("acme", "/b")).await;

        let entries = log.query(&TenantId::new("acme"), None, None, 10).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].path, "/b");
        assert_eq!(entries[1].path, "/a");
    }

    #[tokio::test]
    async fn test_query_respects_limit() {
        let log = AuditLog::new(100);
        for i in 0..20 {
            log.push(entry("acme", &format!("/{}", i))).await;
        }
        let entries = log.query(&TenantId::new("acme"), None, None, 5).await;
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].path, "/19");
    }

    #[tokio::test]
    async fn test_capacity_eviction() {
        let log = AuditLog::new(10);
        for i in 0..25 {
            log.push(entry("acme", &format!("/{}", i))).await;
        }
        assert_eq!(log.len().await, 10);
        let entries = log.query(&TenantId::new("acme"), None, None, 100).await;
        assert_eq!(entries.last().unwrap().path, "/15");
    }
}
