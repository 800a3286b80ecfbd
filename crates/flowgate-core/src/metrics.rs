//! Metrics for Flowgate
//!
//! Provides Prometheus-compatible metrics for observability.

use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// Metric names as constants for consistency
pub mod names {
    // Gateway metrics
    pub const GATEWAY_REQUESTS_TOTAL: &str = "flowgate_gateway_requests_total";
    pub const GATEWAY_REQUEST_DURATION: &str = "flowgate_gateway_request_duration_seconds";
    pub const GATEWAY_ENDPOINTS: &str = "flowgate_gateway_endpoints";
    pub const GATEWAY_HEALTH_CHECKS: &str = "flowgate_gateway_health_checks_total";

    // Orchestrator metrics
    pub const ORCH_ENQUEUED_TOTAL: &str = "flowgate_orchestrator_enqueued_total";
    pub const ORCH_PROCESSED_TOTAL: &str = "flowgate_orchestrator_processed_total";
    pub const ORCH_RETRIES_TOTAL: &str = "flowgate_orchestrator_retries_total";
    pub const ORCH_DEAD_LETTER_TOTAL: &str = "flowgate_orchestrator_dead_letter_total";
    pub const ORCH_QUEUE_DEPTH: &str = "flowgate_orchestrator_queue_depth";
    pub const ORCH_PROCESS_DURATION: &str = "flowgate_orchestrator_process_duration_seconds";

    // Monitor metrics
    pub const MONITOR_EVENTS_TOTAL: &str = "flowgate_monitor_events_total";
    pub const MONITOR_ALERTS_RAISED: &str = "flowgate_monitor_alerts_raised_total";
    pub const MONITOR_ALERTS_ACTIVE: &str = "flowgate_monitor_alerts_active";
}

/// Labels for metrics
pub mod labels {
    pub const PROTOCOL: &str = "protocol";
    pub const OUTCOME: &str = "outcome";
    pub const QUEUE: &str = "queue";
    pub const PRIORITY: &str = "priority";
    pub const STATUS: &str = "status";
    pub const KIND: &str = "kind";
    pub const SEVERITY: &str = "severity";
    pub const RULE: &str = "rule";
}

/// Gateway metrics
#[derive(Clone)]
pub struct GatewayMetrics;

impl GatewayMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Record a routed request and its outcome
    pub fn record_request(&self, protocol: &str, outcome: &str) {
        counter!(
            names::GATEWAY_REQUESTS_TOTAL,
            labels::PROTOCOL => protocol.to_string(),
            labels::OUTCOME => outcome.to_string(),
        )
        .increment(1);
    }

    /// Record routing latency
    pub fn record_duration(&self, protocol: &str, duration: Duration) {
        histogram!(
            names::GATEWAY_REQUEST_DURATION,
            labels::PROTOCOL => protocol.to_string(),
        )
        .record(duration.as_secs_f64());
    }

    /// Update the registered endpoint count
    pub fn set_endpoint_count(&self, count: usize) {
        gauge!(names::GATEWAY_ENDPOINTS).set(count as f64);
    }

    /// Record a health probe and its result
    pub fn record_health_check(&self, outcome: &str) {
        counter!(
            names::GATEWAY_HEALTH_CHECKS,
            labels::OUTCOME => outcome.to_string(),
        )
        .increment(1);
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Orchestrator metrics
#[derive(Clone)]
pub struct OrchestratorMetrics;

impl OrchestratorMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Record an enqueued message
    pub fn record_enqueued(&self, queue: &str, priority: &str) {
        counter!(
            names::ORCH_ENQUEUED_TOTAL,
            labels::QUEUE => queue.to_string(),
            labels::PRIORITY => priority.to_string(),
        )
        .increment(1);
    }

    /// Record a processing outcome
    pub fn record_processed(&self, queue: &str, status: &str) {
        counter!(
            names::ORCH_PROCESSED_TOTAL,
            labels::QUEUE => queue.to_string(),
            labels::STATUS => status.to_string(),
        )
        .increment(1);
    }

    /// Record a retry
    pub fn record_retry(&self, queue: &str) {
        counter!(
            names::ORCH_RETRIES_TOTAL,
            labels::QUEUE => queue.to_string(),
        )
        .increment(1);
    }

    /// Record a dead-lettered message
    pub fn record_dead_letter(&self, queue: &str) {
        counter!(
            names::ORCH_DEAD_LETTER_TOTAL,
            labels::QUEUE => queue.to_string(),
        )
        .increment(1);
    }

    /// Update a queue's pending depth
    pub fn set_queue_depth(&self, queue: &str, depth: usize) {
        gauge!(
            names::ORCH_QUEUE_DEPTH,
            labels::QUEUE => queue.to_string(),
        )
        .set(depth as f64);
    }

    /// Record processing latency
    pub fn record_process_duration(&self, queue: &str, duration: Duration) {
        histogram!(
            names::ORCH_PROCESS_DURATION,
            labels::QUEUE => queue.to_string(),
        )
        .record(duration.as_secs_f64());
    }
}

impl Default for OrchestratorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Monitor metrics
#[derive(Clone)]
pub struct MonitorMetrics;

impl MonitorMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Record an ingested event
    pub fn record_event(&self, kind: &str, severity: &str) {
        counter!(
            names::MONITOR_EVENTS_TOTAL,
            labels::KIND => kind.to_string(),
            labels::SEVERITY => severity.to_string(),
        )
        .increment(1);
    }

    /// Record a raised alert
    pub fn record_alert(&self, rule: &str) {
        counter!(
            names::MONITOR_ALERTS_RAISED,
            labels::RULE => rule.to_string(),
        )
        .increment(1);
    }

    /// Update the active alert count
    pub fn set_active_alerts(&self, count: usize) {
        gauge!(names::MONITOR_ALERTS_ACTIVE).set(count as f64);
    }
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}
