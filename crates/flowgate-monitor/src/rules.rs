//! Alert rules
//!
//! A rule is a named condition evaluated against each incoming event,
//! with access to the trailing event window for rate-style conditions.
//! Three built-ins are seeded at startup; custom rules with field
//! predicates over the event data map can be added at runtime.

use chrono::Duration as ChronoDuration;
use flowgate_core::prelude::*;
use flowgate_core::event::data_keys;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Alert severity, ordered by urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Predicate for custom field conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPredicate {
    /// Field exists
    Exists,
    /// Field equals value
    Equals(Value),
    /// Field not equals value
    NotEquals(Value),
    /// Field contains string
    Contains(String),
    /// Field greater than numeric value
    GreaterThan(f64),
    /// Field less than numeric value
    LessThan(f64),
    /// Field is in list of values
    In(Vec<Value>),
}

impl FieldPredicate {
    fn eval(&self, value: &Value) -> bool {
        match self {
            Self::Exists => true,
            Self::Equals(expected) => value == expected,
            Self::NotEquals(expected) => value != expected,
            Self::Contains(needle) => value.as_str().map(|s| s.contains(needle)).unwrap_or(false),
            Self::GreaterThan(threshold) => value.as_f64().map(|n| n > *threshold).unwrap_or(false),
            Self::LessThan(threshold) => value.as_f64().map(|n| n < *threshold).unwrap_or(false),
            Self::In(values) => values.contains(value),
        }
    }
}

/// Rule condition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCondition {
    /// Error fraction of same-endpoint REQUEST_PROCESSED events within a
    /// sliding window exceeds the threshold
    HighErrorRate {
        #[serde(with = "humantime_serde")]
        window: Duration,
        threshold: f64,
    },

    /// A single REQUEST_PROCESSED event's processing time exceeds the
    /// threshold
    SlowResponse { threshold_ms: f64 },

    /// At least `min_requests` same-endpoint attempts within the trailing
    /// window, none successful
    EndpointDown {
        #[serde(with = "humantime_serde")]
        window: Duration,
        min_requests: usize,
    },

    /// Field predicate over the event data map (dot-notation path)
    Field {
        path: String,
        predicate: FieldPredicate,
    },
}

/// A named alerting condition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub name: String,
    pub description: String,
    pub condition: RuleCondition,
    pub severity: AlertSeverity,
    pub enabled: bool,
}

impl AlertRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        condition: RuleCondition,
        severity: AlertSeverity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            condition,
            severity,
            enabled: true,
        }
    }

    /// Evaluate the rule against an incoming event
    ///
    /// `history` is the trailing event log, oldest first, including the
    /// incoming event itself.
    pub fn matches(&self, event: &IntegrationEvent, history: &[IntegrationEvent]) -> bool {
        if !self.enabled {
            return false;
        }

        match &self.condition {
            RuleCondition::HighErrorRate { window, threshold } => {
                if event.kind != EventKind::RequestProcessed
                    || event.severity != Severity::Error
                    || event.endpoint_id.is_none()
                {
                    return false;
                }

                let (total, errors) = window_stats(event, history, *window);
                total > 0 && errors as f64 / total as f64 > *threshold
            }

            RuleCondition::SlowResponse { threshold_ms } => {
                event.kind == EventKind::RequestProcessed
                    && event
                        .data_f64(data_keys::PROCESSING_TIME_MS)
                        .map(|ms| ms > *threshold_ms)
                        .unwrap_or(false)
            }

            RuleCondition::EndpointDown {
                window,
                min_requests,
            } => {
                if event.kind != EventKind::RequestProcessed || event.endpoint_id.is_none() {
                    return false;
                }

                let (total, errors) = window_stats(event, history, *window);
                total >= *min_requests && errors == total
            }

            RuleCondition::Field { path, predicate } => lookup_field(&event.data, path)
                .map(|value| predicate.eval(value))
                .unwrap_or(matches!(predicate, FieldPredicate::NotEquals(_))),
        }
    }
}

/// Count same-endpoint REQUEST_PROCESSED events (total, errors) within
/// the window ending at the incoming event
fn window_stats(
    event: &IntegrationEvent,
    history: &[IntegrationEvent],
    window: Duration,
) -> (usize, usize) {
    let cutoff = event.timestamp
        - ChronoDuration::from_std(window).unwrap_or_else(|_| ChronoDuration::minutes(5));

    let mut total = 0;
    let mut errors = 0;
    for e in history {
        if e.kind != EventKind::RequestProcessed
            || e.endpoint_id != event.endpoint_id
            || e.timestamp < cutoff
            || e.timestamp > event.timestamp
        {
            continue;
        }
        total += 1;
        let success = e.data_bool(data_keys::SUCCESS).unwrap_or(e.severity == Severity::Info);
        if !success {
            errors += 1;
        }
    }
    (total, errors)
}

/// Resolve a dot-notation path into the event data map
fn lookup_field<'a>(
    data: &'a std::collections::HashMap<String, Value>,
    path: &str,
) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = data.get(parts.next()?)?;

    for part in parts {
        match current {
            Value::Object(map) => current = map.get(part)?,
            Value::Array(arr) => {
                let idx: usize = part.parse().ok()?;
                current = arr.get(idx)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// The three rules seeded at startup
pub fn builtin_rules() -> Vec<AlertRule> {
    vec![
        AlertRule::new(
            "high-error-rate",
            "High error rate",
            "Error fraction over the trailing five minutes exceeds 10%",
            RuleCondition::HighErrorRate {
                window: Duration::from_secs(300),
                threshold: 0.10,
            },
            AlertSeverity::Critical,
        ),
        AlertRule::new(
            "slow-response",
            "Slow response time",
            "A request took longer than five seconds to process",
            RuleCondition::SlowResponse { threshold_ms: 5000.0 },
            AlertSeverity::Warning,
        ),
        AlertRule::new(
            "endpoint-down",
            "Endpoint down",
            "No successful requests among at least five attempts in five minutes",
            RuleCondition::EndpointDown {
                window: Duration::from_secs(300),
                min_requests: 5,
            },
            AlertSeverity::Critical,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn request_event(endpoint: Uuid, success: bool, age_secs: i64) -> IntegrationEvent {
        let mut event = IntegrationEvent::new(EventKind::RequestProcessed, "acme", "routed")
            .for_endpoint(endpoint)
            .with_data(data_keys::SUCCESS, success);
        if !success {
            event = event.error();
        }
        event.timestamp = chrono::Utc::now() - ChronoDuration::seconds(age_secs);
        event
    }

    fn rule(condition: RuleCondition) -> AlertRule {
        AlertRule::new("r", "r", "", condition, AlertSeverity::Warning)
    }

    #[test]
    fn test_high_error_rate_fires_above_threshold() {
        let ep = Uuid::new_v4();
        let mut history: Vec<_> = (0..17).map(|i| request_event(ep, true, 200 - i)).collect();
        history.push(request_event(ep, false, 3));
        history.push(request_event(ep, false, 2));
        let incoming = request_event(ep, false, 0);
        history.push(incoming.clone());

        let rule = rule(RuleCondition::HighErrorRate {
            window: Duration::from_secs(300),
            threshold: 0.10,
        });
        // 3 errors of 20 = 15% > 10%
        assert!(rule.matches(&incoming, &history));
    }

    #[test]
    fn test_high_error_rate_ignores_info_events() {
        let ep = Uuid::new_v4();
        let incoming = request_event(ep, true, 0);
        let rule = rule(RuleCondition::HighErrorRate {
            window: Duration::from_secs(300),
            threshold: 0.10,
        });
        assert!(!rule.matches(&incoming, &[incoming.clone()]));
    }

    #[test]
    fn test_high_error_rate_scopes_to_endpoint() {
        let ep = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut history: Vec<_> = (0..10).map(|i| request_event(other, false, 100 - i)).collect();
        let incoming = request_event(ep, false, 0);
        history.push(incoming.clone());

        let rule = rule(RuleCondition::HighErrorRate {
            window: Duration::from_secs(300),
            threshold: 0.5,
        });
        // only the incoming event counts for `ep`: 1/1 = 100% > 50%
        assert!(rule.matches(&incoming, &history));

        // ...but the other endpoint's errors never contribute to ep's window
        let clean_incoming = request_event(ep, true, 0);
        assert!(!rule.matches(&clean_incoming, &history));
    }

    #[test]
    fn test_slow_response() {
        let ep = Uuid::new_v4();
        let slow = IntegrationEvent::new(EventKind::RequestProcessed, "acme", "routed")
            .for_endpoint(ep)
            .with_data(data_keys::PROCESSING_TIME_MS, 7000);
        let fast = IntegrationEvent::new(EventKind::RequestProcessed, "acme", "routed")
            .for_endpoint(ep)
            .with_data(data_keys::PROCESSING_TIME_MS, 120);

        let rule = rule(RuleCondition::SlowResponse { threshold_ms: 5000.0 });
        assert!(rule.matches(&slow, &[slow.clone()]));
        assert!(!rule.matches(&fast, &[fast.clone()]));
    }

    #[test]
    fn test_endpoint_down_needs_minimum_volume() {
        let ep = Uuid::new_v4();
        let rule = rule(RuleCondition::EndpointDown {
            window: Duration::from_secs(300),
            min_requests: 5,
        });

        let mut history: Vec<_> = (0..3).map(|i| request_event(ep, false, 50 - i)).collect();
        let incoming = request_event(ep, false, 0);
        history.push(incoming.clone());
        // 4 attempts < 5 minimum
        assert!(!rule.matches(&incoming, &history));

        history.insert(0, request_event(ep, false, 60));
        assert!(rule.matches(&incoming, &history));
    }

    #[test]
    fn test_endpoint_down_any_success_clears() {
        let ep = Uuid::new_v4();
        let rule = rule(RuleCondition::EndpointDown {
            window: Duration::from_secs(300),
            min_requests: 5,
        });

        let mut history: Vec<_> = (0..5).map(|i| request_event(ep, false, 50 - i)).collect();
        history.push(request_event(ep, true, 10));
        let incoming = request_event(ep, false, 0);
        history.push(incoming.clone());
        assert!(!rule.matches(&incoming, &history));
    }

    #[test]
    fn test_custom_field_rule() {
        let event = IntegrationEvent::new(EventKind::MessageProcessed, "acme", "done")
            .with_data("retry_count", 5);
        let rule = rule(RuleCondition::Field {
            path: "retry_count".to_string(),
            predicate: FieldPredicate::GreaterThan(3.0),
        });
        assert!(rule.matches(&event, &[event.clone()]));
    }

    #[test]
    fn test_disabled_rule_never_fires() {
        let event = IntegrationEvent::new(EventKind::MessageProcessed, "acme", "done")
            .with_data("x", 10);
        let mut rule = rule(RuleCondition::Field {
            path: "x".to_string(),
            predicate: FieldPredicate::Exists,
        });
        rule.enabled = false;
        assert!(!rule.matches(&event, &[event.clone()]));
    }

    #[test]
    fn test_builtins_seeded() {
        let ids: Vec<_> = builtin_rules().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["high-error-rate", "slow-response", "endpoint-down"]);
    }
}
