//! Integration events
//!
//! Append-only records emitted by the gateway and orchestrator, consumed
//! by the monitoring service as the source of truth for metrics and
//! alerting.

use crate::tenant::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Event taxonomy, shared by logging and alert matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    RequestProcessed,
    EndpointRegistered,
    EndpointUnregistered,
    MessageEnqueued,
    MessageDequeued,
    MessageProcessed,
    MessageDeadLetter,
    MessageTransformed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequestProcessed => "REQUEST_PROCESSED",
            Self::EndpointRegistered => "ENDPOINT_REGISTERED",
            Self::EndpointUnregistered => "ENDPOINT_UNREGISTERED",
            Self::MessageEnqueued => "MESSAGE_ENQUEUED",
            Self::MessageDequeued => "MESSAGE_DEQUEUED",
            Self::MessageProcessed => "MESSAGE_PROCESSED",
            Self::MessageDeadLetter => "MESSAGE_DEAD_LETTER",
            Self::MessageTransformed => "MESSAGE_TRANSFORMED",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Error,
}

/// Well-known keys in the event data map
pub mod data_keys {
    pub const SUCCESS: &str = "success";
    pub const STATUS: &str = "status";
    pub const PROCESSING_TIME_MS: &str = "processing_time_ms";
    pub const QUEUE: &str = "queue";
    pub const MESSAGE_ID: &str = "message_id";
    pub const PRIORITY: &str = "priority";
    pub const RETRY_COUNT: &str = "retry_count";
    pub const SOURCE_FORMAT: &str = "source_format";
    pub const TARGET_FORMAT: &str = "target_format";
    pub const PROTOCOL: &str = "protocol";
}

/// Append-only integration event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationEvent {
    /// Unique event identifier (UUIDv7 for time-ordering); stamped on
    /// ingestion when absent
    #[serde(default = "Uuid::nil")]
    pub id: Uuid,

    /// Event type tag
    pub kind: EventKind,

    /// Endpoint the event concerns, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<Uuid>,

    /// Free-text description
    pub description: String,

    /// Severity
    pub severity: Severity,

    /// Structured payload
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, serde_json::Value>,

    /// Owning tenant
    pub tenant: TenantId,

    /// Emission time; stamped on ingestion when absent
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl IntegrationEvent {
    /// Create an Info-severity event
    pub fn new(kind: EventKind, tenant: impl Into<TenantId>, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            endpoint_id: None,
            description: description.into(),
            severity: Severity::Info,
            data: HashMap::new(),
            tenant: tenant.into(),
            timestamp: Utc::now(),
        }
    }

    /// Builder: mark as Error severity
    pub fn error(mut self) -> Self {
        self.severity = Severity::Error;
        self
    }

    /// Builder: attach an endpoint id
    pub fn for_endpoint(mut self, endpoint_id: Uuid) -> Self {
        self.endpoint_id = Some(endpoint_id);
        self
    }

    /// Builder: attach a data field
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Read a numeric data field
    pub fn data_f64(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(|v| v.as_f64())
    }

    /// Read a boolean data field
    pub fn data_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(|v| v.as_bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_tags() {
        assert_eq!(EventKind::RequestProcessed.as_str(), "REQUEST_PROCESSED");
        assert_eq!(EventKind::MessageDeadLetter.as_str(), "MESSAGE_DEAD_LETTER");
        assert_eq!(
            serde_json::to_string(&EventKind::EndpointRegistered).unwrap(),
            "\"ENDPOINT_REGISTERED\""
        );
    }

    #[test]
    fn test_event_builder() {
        let ep = Uuid::new_v4();
        let event = IntegrationEvent::new(EventKind::RequestProcessed, "acme", "routed")
            .for_endpoint(ep)
            .with_data(data_keys::PROCESSING_TIME_MS, 42)
            .error();

        assert_eq!(event.severity, Severity::Error);
        assert_eq!(event.endpoint_id, Some(ep));
        assert_eq!(event.data_f64(data_keys::PROCESSING_TIME_MS), Some(42.0));
    }
}
