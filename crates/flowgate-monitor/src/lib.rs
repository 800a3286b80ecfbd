//! # Flowgate Monitor
//!
//! Observes the integration event stream: bounded event log, alert rule
//! evaluation, active alert management, metrics aggregation, and the
//! health dashboard.
//!
//! ## Architecture
//!
//! ```text
//!  Gateway ──┐                        ┌── metrics timer (gauges)
//!            ├─ MonitorHandle ──mpsc──► MonitorService ── MonitorCore
//!  Orchestr ─┘      (emit)             └── sweep timer (alert expiry)
//! ```
//!
//! [`MonitorCore`] holds the synchronous logic and is directly usable in
//! tests; [`MonitorService`] is the channel-fed async shell that owns the
//! periodic timers. Producers hold a cloneable [`MonitorHandle`] and never
//! touch the shared state directly.

pub mod aggregate;
pub mod alerts;
pub mod rules;

pub use aggregate::{EndpointHealth, HealthDashboard, IntegrationMetrics};
pub use alerts::{Alert, AlertKey};
pub use rules::{builtin_rules, AlertRule, AlertSeverity, FieldPredicate, RuleCondition};

use chrono::{DateTime, Utc};
use flowgate_core::prelude::*;
use flowgate_core::{MonitorMetrics, MonitorSettings};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Synchronous monitoring state and logic
pub struct MonitorCore {
    settings: MonitorSettings,
    events: RwLock<BoundedLog<IntegrationEvent>>,
    rules: RwLock<Vec<AlertRule>>,
    alerts: RwLock<HashMap<AlertKey, Alert>>,
    metrics: MonitorMetrics,
}

impl MonitorCore {
    /// Create a core seeded with the built-in rules
    pub fn new(settings: MonitorSettings) -> Self {
        Self {
            events: RwLock::new(BoundedLog::new(settings.event_capacity)),
            rules: RwLock::new(builtin_rules()),
            alerts: RwLock::new(HashMap::new()),
            metrics: MonitorMetrics::new(),
            settings,
        }
    }

    /// Append an event and evaluate every enabled rule against it
    pub fn log_event(&self, mut event: IntegrationEvent) {
        if event.id.is_nil() {
            event.id = Uuid::now_v7();
        }

        let severity = match event.severity {
            Severity::Info => "info",
            Severity::Error => "error",
        };
        self.metrics.record_event(event.kind.as_str(), severity);

        {
            let mut events = self.events.write();
            events.push(event.clone());
        }

        // Window rules only consult same-endpoint request traffic
        let history: Vec<IntegrationEvent> =
            if event.kind == EventKind::RequestProcessed && event.endpoint_id.is_some() {
                let events = self.events.read();
                events
                    .iter()
                    .filter(|e| {
                        e.kind == EventKind::RequestProcessed && e.endpoint_id == event.endpoint_id
                    })
                    .cloned()
                    .collect()
            } else {
                Vec::new()
            };

        let rules = self.rules.read().clone();
        for rule in rules.iter() {
            if rule.matches(&event, &history) {
                self.raise_alert(rule, &event);
            }
        }
    }

    /// Create an alert unless one is already active for `(rule, endpoint)`
    fn raise_alert(&self, rule: &AlertRule, event: &IntegrationEvent) {
        let key: AlertKey = (rule.id.clone(), event.endpoint_id);
        let mut alerts = self.alerts.write();

        if let Some(existing) = alerts.get(&key) {
            if !existing.resolved {
                debug!(rule = %rule.id, "alert already active, deduplicated");
                return;
            }
        }

        let alert = Alert::new(
            rule.id.clone(),
            event.endpoint_id,
            rule.severity,
            format!("{}: {}", rule.name, event.description),
            event.tenant.clone(),
        );
        warn!(
            rule = %rule.id,
            endpoint = ?event.endpoint_id,
            severity = %rule.severity,
            "alert raised"
        );
        self.metrics.record_alert(&rule.id);
        alerts.insert(key, alert);
        self.metrics
            .set_active_alerts(alerts.values().filter(|a| !a.resolved).count());
    }

    /// Unresolved alerts, optionally tenant-scoped
    pub fn active_alerts(&self, tenant: Option<&TenantId>) -> Vec<Alert> {
        let alerts = self.alerts.read();
        let mut active: Vec<Alert> = alerts
            .values()
            .filter(|a| !a.resolved)
            .filter(|a| tenant.map(|t| &a.tenant == t).unwrap_or(true))
            .cloned()
            .collect();
        active.sort_by_key(|a| a.created_at);
        active
    }

    /// Operator resolution of a single alert
    pub fn resolve_alert(&self, id: Uuid) -> bool {
        let mut alerts = self.alerts.write();
        for alert in alerts.values_mut() {
            if alert.id == id && !alert.resolved {
                alert.resolve();
                self.metrics
                    .set_active_alerts(alerts.values().filter(|a| !a.resolved).count());
                return true;
            }
        }
        false
    }

    /// Auto-resolve alerts older than the configured TTL; returns how many
    pub fn sweep_expired(&self) -> usize {
        let ttl = self.settings.alert_ttl;
        let mut alerts = self.alerts.write();
        let mut swept = 0;
        for alert in alerts.values_mut() {
            if alert.expired(ttl) {
                alert.resolve();
                swept += 1;
            }
        }
        if swept > 0 {
            self.metrics
                .set_active_alerts(alerts.values().filter(|a| !a.resolved).count());
        }
        swept
    }

    /// Add or replace a rule (custom rules share the id namespace)
    pub fn add_rule(&self, rule: AlertRule) {
        let mut rules = self.rules.write();
        rules.retain(|r| r.id != rule.id);
        rules.push(rule);
    }

    /// Snapshot of configured rules
    pub fn rules(&self) -> Vec<AlertRule> {
        self.rules.read().clone()
    }

    /// Time-ranged tenant metrics
    pub fn get_metrics(
        &self,
        tenant: &TenantId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> IntegrationMetrics {
        let events = self.events.read();
        aggregate::compute_metrics(events.iter(), tenant, from, to)
    }

    /// Trailing-window health dashboard
    pub fn health_dashboard(&self, tenant: &TenantId) -> HealthDashboard {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.settings.dashboard_window)
                .unwrap_or_else(|_| chrono::Duration::hours(1));
        let critical = self
            .active_alerts(Some(tenant))
            .into_iter()
            .filter(|a| a.severity == AlertSeverity::Critical)
            .collect();

        let events = self.events.read();
        aggregate::compute_dashboard(events.iter(), tenant, cutoff, critical)
    }

    /// Most recent tenant events, newest first
    pub fn recent_events(&self, tenant: &TenantId, limit: usize) -> Vec<IntegrationEvent> {
        let events = self.events.read();
        events
            .iter()
            .rev()
            .filter(|e| &e.tenant == tenant)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Current event log length
    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    /// Refresh exported gauges
    pub fn refresh_gauges(&self) {
        let alerts = self.alerts.read();
        self.metrics
            .set_active_alerts(alerts.values().filter(|a| !a.resolved).count());
    }
}

/// Cloneable emitter handed to the gateway and orchestrator
#[derive(Clone)]
pub struct MonitorHandle {
    tx: Option<mpsc::UnboundedSender<IntegrationEvent>>,
}

impl MonitorHandle {
    /// Handle that drops every event; for tests and standalone use
    pub fn disconnected() -> Self {
        Self { tx: None }
    }

    /// Fire-and-forget event emission
    pub fn emit(&self, event: IntegrationEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                debug!("monitor channel closed, event dropped");
            }
        }
    }
}

/// Channel-fed monitoring service owning the periodic timers
pub struct MonitorService {
    core: Arc<MonitorCore>,
    rx: mpsc::UnboundedReceiver<IntegrationEvent>,
}

impl MonitorService {
    /// Build the service, its emitter handle, and a query handle to the core
    pub fn new(settings: MonitorSettings) -> (Self, MonitorHandle, Arc<MonitorCore>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let core = Arc::new(MonitorCore::new(settings));
        (
            Self {
                core: core.clone(),
                rx,
            },
            MonitorHandle { tx: Some(tx) },
            core,
        )
    }

    /// Consume events and drive the timers until every handle is dropped
    pub async fn run(mut self) {
        let mut metrics_tick = interval(self.core.settings.metrics_interval);
        let mut sweep_tick = interval(self.core.settings.sweep_interval);

        info!("monitor service started");
        loop {
            tokio::select! {
                maybe_event = self.rx.recv() => match maybe_event {
                    Some(event) => self.core.log_event(event),
                    None => break,
                },
                _ = metrics_tick.tick() => self.core.refresh_gauges(),
                _ = sweep_tick.tick() => {
                    let swept = self.core.sweep_expired();
                    if swept > 0 {
                        info!(swept, "auto-resolved expired alerts");
                    }
                }
            }
        }
        info!("monitor service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowgate_core::event::data_keys;
    use std::time::Duration;

    fn settings() -> MonitorSettings {
        MonitorSettings::default()
    }

    fn request_event(tenant: &str, endpoint: Uuid, success: bool) -> IntegrationEvent {
        let mut e = IntegrationEvent::new(EventKind::RequestProcessed, tenant, "request routed")
            .for_endpoint(endpoint)
            .with_data(data_keys::SUCCESS, success)
            .with_data(data_keys::PROCESSING_TIME_MS, 25);
        if !success {
            e = e.error();
        }
        e
    }

    #[test]
    fn test_high_error_rate_scenario() {
        // 20 REQUEST_PROCESSED events for endpoint E, 3 of them errors,
        // within the 5-minute window at a 10% threshold
        let core = MonitorCore::new(settings());
        let endpoint = Uuid::new_v4();

        for i in 0..20 {
            core.log_event(request_event("acme", endpoint, i % 7 != 0));
        }

        let active = core.active_alerts(None);
        assert!(active
            .iter()
            .any(|a| a.rule_id == "high-error-rate" && a.endpoint_id == Some(endpoint)));
    }

    #[test]
    fn test_alert_dedup_is_idempotent() {
        let core = MonitorCore::new(settings());
        let endpoint = Uuid::new_v4();

        // every failed event re-satisfies the rule; only one alert may exist
        for _ in 0..10 {
            core.log_event(request_event("acme", endpoint, false));
        }

        let count = core
            .active_alerts(None)
            .iter()
            .filter(|a| a.rule_id == "high-error-rate")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_event_log_capacity() {
        let mut s = settings();
        s.event_capacity = 100;
        let core = MonitorCore::new(s);

        for i in 0..150 {
            core.log_event(
                IntegrationEvent::new(EventKind::MessageEnqueued, "acme", format!("msg {}", i)),
            );
        }
        assert_eq!(core.event_count(), 100);

        // oldest evicted: the most recent 100 survive
        let recent = core.recent_events(&TenantId::new("acme"), 1_000);
        assert_eq!(recent.len(), 100);
        assert_eq!(recent.first().unwrap().description, "msg 149");
        assert_eq!(recent.last().unwrap().description, "msg 50");
    }

    #[test]
    fn test_sweep_resolves_expired_alerts() {
        let mut s = settings();
        s.alert_ttl = Duration::from_millis(10);
        let core = MonitorCore::new(s);
        let endpoint = Uuid::new_v4();

        for _ in 0..6 {
            core.log_event(request_event("acme", endpoint, false));
        }
        assert!(!core.active_alerts(None).is_empty());

        std::thread::sleep(Duration::from_millis(30));
        let swept = core.sweep_expired();
        assert!(swept > 0);
        assert!(core.active_alerts(None).is_empty());
    }

    #[test]
    fn test_custom_rule_addition() {
        let core = MonitorCore::new(settings());
        core.add_rule(AlertRule::new(
            "deep-retry",
            "Deep retry",
            "message retried more than three times",
            RuleCondition::Field {
                path: "retry_count".to_string(),
                predicate: FieldPredicate::GreaterThan(3.0),
            },
            AlertSeverity::Warning,
        ));
        assert_eq!(core.rules().len(), 4);

        core.log_event(
            IntegrationEvent::new(EventKind::MessageProcessed, "acme", "completed")
                .with_data("retry_count", 5),
        );
        assert!(core
            .active_alerts(None)
            .iter()
            .any(|a| a.rule_id == "deep-retry"));
    }

    #[test]
    fn test_dashboard_surfaces_critical_alerts() {
        let core = MonitorCore::new(settings());
        let endpoint = Uuid::new_v4();
        for _ in 0..6 {
            core.log_event(request_event("acme", endpoint, false));
        }

        let dash = core.health_dashboard(&TenantId::new("acme"));
        assert!(!dash.critical_alerts.is_empty());
        assert_eq!(dash.recently_failed, vec![endpoint]);
        assert_eq!(dash.healthy_endpoints, 0);
    }

    #[test]
    fn test_resolve_alert_allows_refire() {
        let core = MonitorCore::new(settings());
        let endpoint = Uuid::new_v4();
        for _ in 0..6 {
            core.log_event(request_event("acme", endpoint, false));
        }

        let alert = core.active_alerts(None).first().cloned().unwrap();
        assert!(core.resolve_alert(alert.id));

        // the same rule may fire again once the prior alert is resolved
        core.log_event(request_event("acme", endpoint, false));
        assert!(core
            .active_alerts(None)
            .iter()
            .any(|a| a.rule_id == alert.rule_id));
    }

    #[tokio::test]
    async fn test_service_consumes_emitted_events() {
        let (service, handle, core) = MonitorService::new(settings());
        let task = tokio::spawn(service.run());

        handle.emit(IntegrationEvent::new(
            EventKind::MessageEnqueued,
            "acme",
            "queued",
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(core.event_count(), 1);

        drop(handle);
        task.await.unwrap();
    }
}
