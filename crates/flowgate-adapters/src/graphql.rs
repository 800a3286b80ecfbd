//! GraphQL adapter
//!
//! Posts a `{query, variables, operationName}` object assembled from the
//! request body or parameters. A top-level `errors` array in the response
//! JSON marks the call failed regardless of HTTP status.

use crate::auth::{apply_auth, apply_correlation, apply_headers};
use crate::{
    headers_to_map, transport_failure, validate_base_url, HealthReport, ProtocolAdapter,
    CONNECT_TIMEOUT,
};
use async_trait::async_trait;
use flowgate_core::prelude::*;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Introspection query used for validation and health probes
const INTROSPECTION_QUERY: &str = "{ __schema { queryType { name } } }";

/// Timeout for the best-effort introspection probe during validation
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// GraphQL protocol adapter
pub struct GraphQlAdapter {
    client: Client,
}

impl GraphQlAdapter {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FlowgateError::internal(format!("failed to create client: {}", e)))?;
        Ok(Self { client })
    }

    /// Assemble the GraphQL request payload
    ///
    /// Precedence: a JSON body already carrying `query` is used as-is; any
    /// other body is treated as a raw query document; otherwise the
    /// `query` / `variables` / `operation_name` parameters are consulted.
    pub fn build_payload(request: &OutboundRequest) -> Result<Value> {
        if let Some(ref body) = request.body {
            if let Ok(value) = serde_json::from_str::<Value>(body) {
                if value.get("query").is_some() {
                    return Ok(value);
                }
            }
            return Ok(json!({ "query": body }));
        }

        let query = request
            .parameters
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| FlowgateError::config("GraphQL request carries no query"))?;

        let mut payload = json!({ "query": query });
        if let Some(variables) = request.parameters.get("variables") {
            payload["variables"] = variables.clone();
        }
        if let Some(op) = request.parameters.get("operation_name").and_then(|v| v.as_str()) {
            payload["operationName"] = Value::String(op.to_string());
        }
        Ok(payload)
    }

    /// Collect messages from a top-level `errors` array, if present
    pub fn collect_errors(body: &Value) -> Option<String> {
        let errors = body.get("errors")?.as_array()?;
        if errors.is_empty() {
            return None;
        }
        let joined = errors
            .iter()
            .map(|e| {
                e.get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("; ");
        Some(joined)
    }

    async fn introspect(&self, endpoint: &Endpoint, timeout: Duration) -> Result<Value> {
        let resp = self
            .client
            .post(&endpoint.base_url)
            .timeout(timeout)
            .json(&json!({ "query": INTROSPECTION_QUERY }))
            .send()
            .await
            .map_err(|e| FlowgateError::transient(format!("introspection failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(FlowgateError::transient(format!(
                "introspection returned {}",
                resp.status()
            )));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| FlowgateError::serialization_with_source("introspection response", e))
    }
}

#[async_trait]
impl ProtocolAdapter for GraphQlAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::GraphQl
    }

    async fn send(&self, request: &OutboundRequest, endpoint: &Endpoint) -> OutboundResponse {
        let start = Instant::now();

        let payload = match Self::build_payload(request) {
            Ok(p) => p,
            Err(e) => return OutboundResponse::failure(request.id, 500, e.to_string()),
        };

        trace!(endpoint = %endpoint.base_url, "Sending GraphQL request");

        let mut builder = self
            .client
            .post(&endpoint.base_url)
            .timeout(request.timeout)
            .json(&payload);
        builder = apply_headers(builder, endpoint, request);
        builder = apply_auth(builder, &endpoint.auth);
        builder = apply_correlation(builder, request);

        let resp = match builder.send().await {
            Ok(r) => r,
            Err(e) => return transport_failure(request.id, "GraphQL send", request.timeout, e),
        };

        let status = resp.status();
        let headers = headers_to_map(resp.headers());
        let body = resp.text().await.unwrap_or_default();
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(status = status.as_u16(), duration_ms, "GraphQL request completed");

        if let Ok(parsed) = serde_json::from_str::<Value>(&body) {
            if let Some(errors) = Self::collect_errors(&parsed) {
                return OutboundResponse::failure(request.id, status.as_u16(), errors)
                    .with_body(body)
                    .with_headers(headers)
                    .with_duration(duration_ms);
            }
        }

        if status.is_success() {
            OutboundResponse::ok(request.id, status.as_u16(), body)
                .with_headers(headers)
                .with_duration(duration_ms)
        } else {
            OutboundResponse::failure(request.id, status.as_u16(), format!("HTTP {}", status))
                .with_body(body)
                .with_headers(headers)
                .with_duration(duration_ms)
        }
    }

    async fn validate_endpoint(&self, endpoint: &Endpoint) -> Result<()> {
        validate_base_url(endpoint)?;

        // Best-effort introspection probe; a failing probe only warns
        match self.introspect(endpoint, PROBE_TIMEOUT).await {
            Ok(body) if Self::collect_errors(&body).is_none() => {}
            Ok(_) => warn!(endpoint = %endpoint.base_url, "introspection returned errors"),
            Err(e) => warn!(endpoint = %endpoint.base_url, error = %e, "introspection probe failed"),
        }

        Ok(())
    }

    async fn check_health(&self, endpoint: &Endpoint) -> HealthReport {
        let start = Instant::now();
        let result = self.introspect(endpoint, endpoint.timeout).await;
        let elapsed = start.elapsed().as_millis() as u64;

        match result {
            Ok(body) => match Self::collect_errors(&body) {
                None => HealthReport::healthy(elapsed).with_details(body),
                Some(errors) => HealthReport::unhealthy(elapsed, errors),
            },
            Err(e) => HealthReport::unhealthy(elapsed, e.to_string()),
        }
    }
}
