//! Active alerts
//!
//! An alert materializes when a rule's condition is satisfied by an
//! incoming event, deduplicated per `(rule, endpoint)` while unresolved.
//! Unmanaged alerts are auto-resolved by the expiry sweep after the
//! configured TTL.

use crate::rules::AlertSeverity;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use flowgate_core::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Deduplication key for active alerts
pub type AlertKey = (String, Option<Uuid>);

/// A materialized alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub rule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<Uuid>,
    pub severity: AlertSeverity,
    pub description: String,
    pub tenant: TenantId,
    pub created_at: DateTime<Utc>,
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(
        rule_id: impl Into<String>,
        endpoint_id: Option<Uuid>,
        severity: AlertSeverity,
        description: impl Into<String>,
        tenant: TenantId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id: rule_id.into(),
            endpoint_id,
            severity,
            description: description.into(),
            tenant,
            created_at: Utc::now(),
            resolved: false,
            resolved_at: None,
        }
    }

    /// Deduplication key
    pub fn key(&self) -> AlertKey {
        (self.rule_id.clone(), self.endpoint_id)
    }

    /// Mark resolved now
    pub fn resolve(&mut self) {
        self.resolved = true;
        self.resolved_at = Some(Utc::now());
    }

    /// True once the alert has outlived the TTL without being managed
    pub fn expired(&self, ttl: Duration) -> bool {
        let ttl = ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::hours(24));
        !self.resolved && Utc::now() - self.created_at > ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let mut alert = Alert::new(
            "high-error-rate",
            Some(Uuid::new_v4()),
            AlertSeverity::Critical,
            "errors",
            TenantId::new("acme"),
        );
        assert!(!alert.resolved);
        alert.resolve();
        assert!(alert.resolved);
        assert!(alert.resolved_at.is_some());
    }

    #[test]
    fn test_expiry() {
        let mut alert = Alert::new(
            "endpoint-down",
            None,
            AlertSeverity::Critical,
            "down",
            TenantId::new("acme"),
        );
        assert!(!alert.expired(Duration::from_secs(86_400)));

        alert.created_at = Utc::now() - ChronoDuration::hours(25);
        assert!(alert.expired(Duration::from_secs(86_400)));

        alert.resolve();
        assert!(!alert.expired(Duration::from_secs(86_400)));
    }
}
