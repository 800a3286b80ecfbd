//! REST adapter
//!
//! Builds method+path+query requests with JSON bodies. Any non-2xx
//! status is a failure; the native status is always reported.

use crate::auth::{apply_auth, apply_correlation, apply_headers};
use crate::{
    headers_to_map, join_url, transport_failure, validate_base_url, HealthReport, ProtocolAdapter,
    CONNECT_TIMEOUT,
};
use async_trait::async_trait;
use flowgate_core::prelude::*;
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, trace};

/// REST protocol adapter
pub struct RestAdapter {
    client: Client,
}

impl RestAdapter {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FlowgateError::internal(format!("failed to create client: {}", e)))?;
        Ok(Self { client })
    }

    /// Query pairs from the request parameter map
    fn query_pairs(request: &OutboundRequest) -> Vec<(String, String)> {
        request
            .parameters
            .iter()
            .map(|(k, v)| {
                let value = match v.as_str() {
                    Some(s) => s.to_string(),
                    None => v.to_string(),
                };
                (k.clone(), value)
            })
            .collect()
    }
}

#[async_trait]
impl ProtocolAdapter for RestAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Rest
    }

    async fn send(&self, request: &OutboundRequest, endpoint: &Endpoint) -> OutboundResponse {
        let start = Instant::now();

        let method = match reqwest::Method::from_bytes(request.method.as_bytes()) {
            Ok(m) => m,
            Err(_) => {
                return OutboundResponse::failure(
                    request.id,
                    500,
                    format!("invalid method '{}'", request.method),
                );
            }
        };

        let url = join_url(&endpoint.base_url, &request.path);
        trace!(%url, method = %request.method, "Sending REST request");

        let mut builder = self.client.request(method, &url).timeout(request.timeout);
        builder = apply_headers(builder, endpoint, request);
        builder = apply_auth(builder, &endpoint.auth);
        builder = apply_correlation(builder, request);

        if !request.parameters.is_empty() {
            builder = builder.query(&Self::query_pairs(request));
        }

        if let Some(ref body) = request.body {
            if !request.headers.contains_key("Content-Type")
                && !endpoint.default_headers.contains_key("Content-Type")
            {
                builder = builder.header("Content-Type", "application/json");
            }
            builder = builder.body(body.clone());
        }

        let resp = match builder.send().await {
            Ok(r) => r,
            Err(e) => return transport_failure(request.id, "REST send", request.timeout, e),
        };

        let status = resp.status();
        let headers = headers_to_map(resp.headers());
        let body = resp.text().await.unwrap_or_default();
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(status = status.as_u16(), duration_ms, "REST request completed");

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
        validate_base_url(endpoint).map(|_| ())
    }

    async fn check_health(&self, endpoint: &Endpoint) -> HealthReport {
        let start = Instant::now();
        let url = join_url(&endpoint.base_url, "/health");

        let result = self
            .client
            .get(&url)
            .timeout(endpoint.timeout)
            .send()
            .await;

        let elapsed = start.elapsed().as_millis() as u64;
        match result {
            Ok(resp) if resp.status().is_success() => {
                let mut report = HealthReport::healthy(elapsed);
                if let Ok(details) = resp.json::<serde_json::Value>().await {
                    report = report.with_details(details);
                }
                report
            }
            Ok(resp) => HealthReport::unhealthy(elapsed, format!("HTTP {}", resp.status())),
            Err(e) => HealthReport::unhealthy(elapsed, e.to_string()),
        }
    }
}
