//! Outbound request/response model
//!
//! One immutable response per request. Gateway-detected rejections use
//! synthetic status codes (404/403/503/501); adapters use 408 for
//! timeouts, 500 for unclassified transport failures, and the wire
//! protocol's native status otherwise.

use crate::error::FlowgateError;
use crate::tenant::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// A generic outbound call to a registered endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// Unique request identifier
    pub id: Uuid,

    /// Tenant of the caller; stamped by the gateway before routing
    pub tenant: TenantId,

    /// Target endpoint
    pub endpoint_id: Uuid,

    /// HTTP-ish method hint (REST); ignored by protocols that POST
    pub method: String,

    /// Path appended to the endpoint base address
    #[serde(default)]
    pub path: String,

    /// Per-request headers, merged over the endpoint defaults
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,

    /// Raw body; JSON for REST/GraphQL, XML for pre-built SOAP bodies
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,

    /// Protocol-specific parameters (query string, SOAP method args,
    /// GraphQL query/variables)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub parameters: HashMap<String, serde_json::Value>,

    /// Per-call timeout
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub timeout: Duration,

    /// Correlation identifier for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

impl OutboundRequest {
    pub fn new(endpoint_id: Uuid, method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant: TenantId::new(""),
            endpoint_id,
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
            body: None,
            parameters: HashMap::new(),
            timeout: default_request_timeout(),
            correlation_id: None,
        }
    }

    /// Builder: set body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Builder: add a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Builder: add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Builder: set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder: set correlation id
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }
}

/// Normalized response for an outbound request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundResponse {
    pub request_id: Uuid,
    pub success: bool,
    pub status: u16,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl OutboundResponse {
    /// Successful response with the wire protocol's native status
    pub fn ok(request_id: Uuid, status: u16, body: impl Into<String>) -> Self {
        Self {
            request_id,
            success: true,
            status,
            body: body.into(),
            headers: HashMap::new(),
            error: None,
            processed_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Failed response with an error message
    pub fn failure(request_id: Uuid, status: u16, error: impl Into<String>) -> Self {
        Self {
            request_id,
            success: false,
            status,
            body: String::new(),
            headers: HashMap::new(),
            error: Some(error.into()),
            processed_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Distinguished timeout failure (status 408)
    pub fn timed_out(request_id: Uuid, operation: &str, duration_ms: u64) -> Self {
        let mut resp = Self::failure(
            request_id,
            408,
            format!("{} exceeded {}ms", operation, duration_ms),
        );
        resp.duration_ms = duration_ms;
        resp
    }

    /// Rejection derived from a typed error (gateway fail-closed path)
    pub fn rejected(request_id: Uuid, error: &FlowgateError) -> Self {
        Self::failure(request_id, error.status_code(), error.to_string())
    }

    /// Builder: attach response headers
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Builder: attach response body
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Stamp the processing duration
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_carries_synthetic_status() {
        let id = Uuid::new_v4();
        let resp = OutboundResponse::rejected(id, &FlowgateError::access_denied("endpoint"));
        assert!(!resp.success);
        assert_eq!(resp.status, 403);
        assert!(resp.error.is_some());
    }

    #[test]
    fn test_timeout_is_distinguished() {
        let resp = OutboundResponse::timed_out(Uuid::new_v4(), "send", 5000);
        assert_eq!(resp.status, 408);
        assert_eq!(resp.duration_ms, 5000);
    }
}
