//! Metrics and health aggregation over the event log

use crate::alerts::Alert;
use chrono::{DateTime, Utc};
use flowgate_core::event::data_keys;
use flowgate_core::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Time-ranged, tenant-scoped request metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationMetrics {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// successful / total, 1.0 when no traffic
    pub success_rate: f64,
    pub avg_processing_time_ms: f64,
    /// Request count per endpoint
    pub endpoint_usage: HashMap<Uuid, u64>,
    /// Error count per event type tag
    pub error_counts: HashMap<String, u64>,
}

/// Aggregate tenant-scoped events in `[from, to]`
pub fn compute_metrics<'a>(
    events: impl Iterator<Item = &'a IntegrationEvent>,
    tenant: &TenantId,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> IntegrationMetrics {
    let mut total = 0u64;
    let mut successful = 0u64;
    let mut processing_time_sum = 0f64;
    let mut processing_time_count = 0u64;
    let mut endpoint_usage: HashMap<Uuid, u64> = HashMap::new();
    let mut error_counts: HashMap<String, u64> = HashMap::new();

    for event in events {
        if &event.tenant != tenant || event.timestamp < from || event.timestamp > to {
            continue;
        }

        if event.severity == Severity::Error {
            *error_counts.entry(event.kind.as_str().to_string()).or_default() += 1;
        }

        if event.kind != EventKind::RequestProcessed {
            continue;
        }

        total += 1;
        let success = event
            .data_bool(data_keys::SUCCESS)
            .unwrap_or(event.severity == Severity::Info);
        if success {
            successful += 1;
        }

        if let Some(ms) = event.data_f64(data_keys::PROCESSING_TIME_MS) {
            processing_time_sum += ms;
            processing_time_count += 1;
        }

        if let Some(endpoint_id) = event.endpoint_id {
            *endpoint_usage.entry(endpoint_id).or_default() += 1;
        }
    }

    IntegrationMetrics {
        from,
        to,
        total_requests: total,
        successful_requests: successful,
        failed_requests: total - successful,
        success_rate: if total > 0 {
            successful as f64 / total as f64
        } else {
            1.0
        },
        avg_processing_time_ms: if processing_time_count > 0 {
            processing_time_sum / processing_time_count as f64
        } else {
            0.0
        },
        endpoint_usage,
        error_counts,
    }
}

/// Per-endpoint success ratio within the dashboard window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointHealth {
    pub endpoint_id: Uuid,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub success_rate: f64,
}

/// Trailing-window health dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDashboard {
    pub generated_at: DateTime<Utc>,
    pub total_endpoints: usize,
    pub healthy_endpoints: usize,
    /// healthy / total as a percentage, 100 when no traffic
    pub health_score: f64,
    pub endpoints: Vec<EndpointHealth>,
    /// Endpoints under 50% success within the window
    pub recently_failed: Vec<Uuid>,
    pub critical_alerts: Vec<Alert>,
}

/// Endpoints at or above this success ratio count as healthy
const HEALTHY_THRESHOLD: f64 = 0.95;

/// Endpoints under this success ratio surface as recently failed
const FAILED_THRESHOLD: f64 = 0.50;

/// Build the dashboard from tenant-scoped events after `cutoff`
pub fn compute_dashboard<'a>(
    events: impl Iterator<Item = &'a IntegrationEvent>,
    tenant: &TenantId,
    cutoff: DateTime<Utc>,
    critical_alerts: Vec<Alert>,
) -> HealthDashboard {
    let mut per_endpoint: HashMap<Uuid, (u64, u64)> = HashMap::new();

    for event in events {
        if &event.tenant != tenant
            || event.kind != EventKind::RequestProcessed
            || event.timestamp < cutoff
        {
            continue;
        }
        let Some(endpoint_id) = event.endpoint_id else {
            continue;
        };

        let entry = per_endpoint.entry(endpoint_id).or_default();
        entry.0 += 1;
        let success = event
            .data_bool(data_keys::SUCCESS)
            .unwrap_or(event.severity == Severity::Info);
        if success {
            entry.1 += 1;
        }
    }

    let mut endpoints: Vec<EndpointHealth> = per_endpoint
        .into_iter()
        .map(|(endpoint_id, (total, successes))| EndpointHealth {
            endpoint_id,
            total_requests: total,
            successful_requests: successes,
            success_rate: successes as f64 / total as f64,
        })
        .collect();
    endpoints.sort_by(|a, b| a.endpoint_id.cmp(&b.endpoint_id));

    let total = endpoints.len();
    let healthy = endpoints
        .iter()
        .filter(|e| e.success_rate >= HEALTHY_THRESHOLD)
        .count();
    let recently_failed = endpoints
        .iter()
        .filter(|e| e.success_rate < FAILED_THRESHOLD)
        .map(|e| e.endpoint_id)
        .collect();

    HealthDashboard {
        generated_at: Utc::now(),
        total_endpoints: total,
        healthy_endpoints: healthy,
        health_score: if total > 0 {
            healthy as f64 / total as f64 * 100.0
        } else {
            100.0
        },
        endpoints,
        recently_failed,
        critical_alerts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn event(tenant: &str, endpoint: Uuid, success: bool, ms: u64) -> IntegrationEvent {
        let mut e = IntegrationEvent::new(EventKind::RequestProcessed, tenant, "routed")
            .for_endpoint(endpoint)
            .with_data(data_keys::SUCCESS, success)
            .with_data(data_keys::PROCESSING_TIME_MS, ms);
        if !success {
            e = e.error();
        }
        e
    }

    #[test]
    fn test_metrics_aggregation() {
        let ep = Uuid::new_v4();
        let events = vec![
            event("acme", ep, true, 100),
            event("acme", ep, true, 200),
            event("acme", ep, false, 300),
            event("other", ep, false, 900), // different tenant, excluded
        ];

        let from = Utc::now() - ChronoDuration::hours(1);
        let to = Utc::now() + ChronoDuration::hours(1);
        let metrics = compute_metrics(events.iter(), &TenantId::new("acme"), from, to);

        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.successful_requests, 2);
        assert_eq!(metrics.failed_requests, 1);
        assert!((metrics.success_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((metrics.avg_processing_time_ms - 200.0).abs() < 1e-9);
        assert_eq!(metrics.endpoint_usage.get(&ep), Some(&3));
        assert_eq!(metrics.error_counts.get("REQUEST_PROCESSED"), Some(&1));
    }

    #[test]
    fn test_metrics_time_filter() {
        let ep = Uuid::new_v4();
        let mut old = event("acme", ep, true, 50);
        old.timestamp = Utc::now() - ChronoDuration::hours(3);
        let events = vec![old, event("acme", ep, true, 50)];

        let from = Utc::now() - ChronoDuration::hours(1);
        let to = Utc::now() + ChronoDuration::hours(1);
        let metrics = compute_metrics(events.iter(), &TenantId::new("acme"), from, to);
        assert_eq!(metrics.total_requests, 1);
    }

    #[test]
    fn test_dashboard_health_score() {
        let good = Uuid::new_v4();
        let bad = Uuid::new_v4();
        let mut events = Vec::new();
        for _ in 0..20 {
            events.push(event("acme", good, true, 10));
        }
        for i in 0..10 {
            events.push(event("acme", bad, i < 2, 10)); // 20% success
        }

        let cutoff = Utc::now() - ChronoDuration::hours(1);
        let dash = compute_dashboard(events.iter(), &TenantId::new("acme"), cutoff, Vec::new());

        assert_eq!(dash.total_endpoints, 2);
        assert_eq!(dash.healthy_endpoints, 1);
        assert!((dash.health_score - 50.0).abs() < 1e-9);
        assert_eq!(dash.recently_failed, vec![bad]);
    }

    #[test]
    fn test_dashboard_empty_is_fully_healthy() {
        let cutoff = Utc::now() - ChronoDuration::hours(1);
        let dash = compute_dashboard(
            std::iter::empty(),
            &TenantId::new("acme"),
            cutoff,
            Vec::new(),
        );
        assert_eq!(dash.total_endpoints, 0);
        assert!((dash.health_score - 100.0).abs() < 1e-9);
    }
}
