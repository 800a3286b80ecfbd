//! # Flowgate Adapters
//!
//! Wire-protocol adapters translating generic outbound requests into
//! concrete protocols and back into normalized responses.
//!
//! ## Adapter Hierarchy
//!
//! ```text
//! ProtocolAdapter (send / validate_endpoint / check_health)
//!     ├── RestAdapter     (method+path+query, JSON body, non-2xx => failure)
//!     ├── SoapAdapter     (XML envelope, Fault detection, WSDL probe)
//!     └── GraphQlAdapter  (query/variables/operationName, errors array)
//! ```
//!
//! Adapters are resolved from an [`AdapterRegistry`] by exact match on the
//! endpoint's protocol tag. Expected failures never surface as errors from
//! `send`; they are folded into the normalized response (408 for timeouts,
//! 500 for unclassified transport errors, the native status otherwise).

pub mod auth;
pub mod graphql;
pub mod rest;
pub mod soap;

pub use graphql::GraphQlAdapter;
pub use rest::RestAdapter;
pub use soap::SoapAdapter;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flowgate_core::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Result of a health probe against an endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub checked_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn healthy(response_time_ms: u64) -> Self {
        Self {
            healthy: true,
            response_time_ms,
            details: None,
            checked_at: Utc::now(),
        }
    }

    pub fn unhealthy(response_time_ms: u64, reason: impl Into<String>) -> Self {
        Self {
            healthy: false,
            response_time_ms,
            details: Some(serde_json::Value::String(reason.into())),
            checked_at: Utc::now(),
        }
    }

    /// Builder: attach diagnostic payload
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Protocol adapter capability set
#[async_trait]
pub trait ProtocolAdapter: Send + Sync {
    /// The protocol this adapter speaks; used for registry resolution
    fn protocol(&self) -> Protocol;

    /// Translate the request onto the wire and normalize the response
    ///
    /// Never returns an error: timeouts become 408 responses, transport
    /// failures become 500 responses with the message recorded.
    async fn send(&self, request: &OutboundRequest, endpoint: &Endpoint) -> OutboundResponse;

    /// Validate an endpoint definition before registration
    ///
    /// Rejects structurally invalid base addresses. Protocol probes
    /// (WSDL fetch, introspection) are best-effort: their failure logs a
    /// warning and does not block registration.
    async fn validate_endpoint(&self, endpoint: &Endpoint) -> Result<()>;

    /// Lightweight protocol-appropriate health probe
    async fn check_health(&self, endpoint: &Endpoint) -> HealthReport;
}

/// Registry of adapters keyed by protocol tag
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<&'static str, Arc<dyn ProtocolAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in adapters
    pub fn with_defaults() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(RestAdapter::new()?));
        registry.register(Arc::new(SoapAdapter::new()?));
        registry.register(Arc::new(GraphQlAdapter::new()?));
        Ok(registry)
    }

    /// Register an adapter under its declared protocol tag
    pub fn register(&mut self, adapter: Arc<dyn ProtocolAdapter>) {
        self.adapters.insert(adapter.protocol().as_tag(), adapter);
    }

    /// Resolve an adapter by exact protocol tag
    pub fn resolve(&self, tag: &str) -> Option<Arc<dyn ProtocolAdapter>> {
        self.adapters.get(tag).cloned()
    }

    /// Resolve an adapter for a typed protocol
    pub fn resolve_protocol(&self, protocol: Protocol) -> Option<Arc<dyn ProtocolAdapter>> {
        self.resolve(protocol.as_tag())
    }

    /// Registered protocol tags
    pub fn protocols(&self) -> Vec<&'static str> {
        self.adapters.keys().copied().collect()
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Default connect timeout for adapter HTTP clients
pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Validate the endpoint base address: absolute http(s) URL
pub(crate) fn validate_base_url(endpoint: &Endpoint) -> Result<Url> {
    if endpoint.base_url.trim().is_empty() {
        return Err(FlowgateError::config("endpoint base address is empty"));
    }

    let url = Url::parse(&endpoint.base_url)
        .map_err(|e| FlowgateError::config(format!("invalid base address: {}", e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FlowgateError::config(format!(
            "unsupported scheme '{}' in base address",
            other
        ))),
    }
}

/// Join a request path onto the endpoint base address
pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

/// Fold a transport error into a normalized failure response
pub(crate) fn transport_failure(
    request_id: Uuid,
    operation: &str,
    timeout: Duration,
    err: reqwest::Error,
) -> OutboundResponse {
    if err.is_timeout() {
        OutboundResponse::timed_out(request_id, operation, timeout.as_millis() as u64)
    } else {
        OutboundResponse::failure(request_id, 500, err.to_string())
    }
}

/// Convert a reqwest header map into plain strings, dropping opaque values
pub(crate) fn headers_to_map(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_resolution_is_exact() {
        let registry = AdapterRegistry::with_defaults().unwrap();
        assert!(registry.resolve("REST").is_some());
        assert!(registry.resolve("SOAP").is_some());
        assert!(registry.resolve("GraphQL").is_some());
        assert!(registry.resolve("rest").is_none());
        assert!(registry.resolve("GRAPHQL").is_none());
    }

    #[test]
    fn test_validate_base_url() {
        let ok = Endpoint::new("t", "svc", "https://svc.example/api", Protocol::Rest);
        assert!(validate_base_url(&ok).is_ok());

        let empty = Endpoint::new("t", "svc", "  ", Protocol::Rest);
        assert!(validate_base_url(&empty).is_err());

        let relative = Endpoint::new("t", "svc", "/api", Protocol::Rest);
        assert!(validate_base_url(&relative).is_err());

        let ftp = Endpoint::new("t", "svc", "ftp://svc.example", Protocol::Rest);
        assert!(validate_base_url(&ftp).is_err());
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://svc.example/api", "/widgets/1"),
            "https://svc.example/api/widgets/1"
        );
        assert_eq!(
            join_url("https://svc.example/api/", "widgets"),
            "https://svc.example/api/widgets"
        );
        assert_eq!(join_url("https://svc.example", ""), "https://svc.example");
    }
}
