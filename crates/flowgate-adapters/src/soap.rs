//! SOAP adapter
//!
//! Wraps requests in a SOAP 1.1 envelope. The body is either the
//! request's pre-built XML or a method element synthesized from the
//! parameter map. Responses are scanned for a `Fault` element; fault
//! code/string are extracted into the normalized failure.

use crate::auth::{apply_auth, apply_correlation, apply_headers};
use crate::{
    headers_to_map, transport_failure, validate_base_url, HealthReport, ProtocolAdapter,
    CONNECT_TIMEOUT,
};
use async_trait::async_trait;
use flowgate_core::prelude::*;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Timeout for the best-effort WSDL probe during validation
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Extracted SOAP fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    pub code: Option<String>,
    pub reason: String,
}

/// SOAP protocol adapter
pub struct SoapAdapter {
    client: Client,
}

impl SoapAdapter {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| FlowgateError::internal(format!("failed to create client: {}", e)))?;
        Ok(Self { client })
    }

    /// Build the SOAP envelope around the request body
    ///
    /// A body starting with `<` is taken as pre-built XML; otherwise a
    /// method element named after the request method is synthesized from
    /// the parameter map.
    pub fn build_envelope(request: &OutboundRequest) -> String {
        let body = match &request.body {
            Some(body) if body.trim_start().starts_with('<') => body.trim().to_string(),
            _ => Self::synthesize_method(request),
        };

        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
             <soap:Envelope xmlns:soap=\"{}\">\
             <soap:Body>{}</soap:Body>\
             </soap:Envelope>",
            SOAP_ENVELOPE_NS, body
        )
    }

    fn synthesize_method(request: &OutboundRequest) -> String {
        let mut element = format!("<{}>", request.method);
        for (key, value) in &request.parameters {
            if key == "soap_action" {
                continue;
            }
            let text = match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
            element.push_str(&format!("<{}>{}</{}>", key, escape(&text), key));
        }
        element.push_str(&format!("</{}>", request.method));
        element
    }

    /// Scan a response body for a SOAP Fault element
    pub fn parse_fault(body: &str) -> Option<SoapFault> {
        let mut reader = Reader::from_str(body);
        reader.trim_text(true);

        let mut in_fault = false;
        let mut current: Option<&'static str> = None;
        let mut code = None;
        let mut reason = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    if name == "Fault" {
                        in_fault = true;
                    } else if in_fault {
                        current = match name.as_str() {
                            "faultcode" => Some("code"),
                            "faultstring" => Some("reason"),
                            _ => None,
                        };
                    }
                }
                Ok(Event::Text(ref t)) if in_fault => {
                    if let Ok(text) = t.unescape() {
                        match current {
                            Some("code") if code.is_none() => code = Some(text.to_string()),
                            Some("reason") if reason.is_none() => reason = Some(text.to_string()),
                            _ => {}
                        }
                    }
                }
                Ok(Event::End(ref e)) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                    if name == "Fault" {
                        in_fault = false;
                    }
                    current = None;
                }
                Ok(Event::Eof) => break,
                Err(_) => break,
                _ => {}
            }
        }

        reason.map(|reason| SoapFault { code, reason })
    }

    fn wsdl_url(base: &str) -> String {
        format!("{}?wsdl", base.trim_end_matches('/'))
    }

    async fn fetch_wsdl(&self, endpoint: &Endpoint, timeout: Duration) -> Result<String> {
        let url = Self::wsdl_url(&endpoint.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FlowgateError::transient(format!("WSDL fetch failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(FlowgateError::transient(format!(
                "WSDL fetch returned {}",
                resp.status()
            )));
        }

        resp.text()
            .await
            .map_err(|e| FlowgateError::transient(format!("WSDL read failed: {}", e)))
    }
}

#[async_trait]
impl ProtocolAdapter for SoapAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Soap
    }

    async fn send(&self, request: &OutboundRequest, endpoint: &Endpoint) -> OutboundResponse {
        let start = Instant::now();
        let envelope = Self::build_envelope(request);

        trace!(endpoint = %endpoint.base_url, operation = %request.method, "Sending SOAP request");

        let soap_action = request
            .parameters
            .get("soap_action")
            .and_then(|v| v.as_str())
            .unwrap_or("");

        let mut builder = self
            .client
            .post(&endpoint.base_url)
            .timeout(request.timeout)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{}\"", soap_action));
        builder = apply_headers(builder, endpoint, request);
        builder = apply_auth(builder, &endpoint.auth);
        builder = apply_correlation(builder, request);

        let resp = match builder.body(envelope).send().await {
            Ok(r) => r,
            Err(e) => return transport_failure(request.id, "SOAP send", request.timeout, e),
        };

        let status = resp.status();
        let headers = headers_to_map(resp.headers());
        let body = resp.text().await.unwrap_or_default();
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(status = status.as_u16(), duration_ms, "SOAP request completed");

        if let Some(fault) = Self::parse_fault(&body) {
            let error = match &fault.code {
                Some(code) => format!("SOAP fault {}: {}", code, fault.reason),
                None => format!("SOAP fault: {}", fault.reason),
            };
            return OutboundResponse::failure(request.id, status.as_u16(), error)
                .with_body(body)
                .with_headers(headers)
                .with_duration(duration_ms);
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

        // Best-effort WSDL sanity check; a failing probe only warns
        match self.fetch_wsdl(endpoint, PROBE_TIMEOUT).await {
            Ok(wsdl) if wsdl.contains("definitions") => {}
            Ok(_) => warn!(endpoint = %endpoint.base_url, "WSDL probe returned a non-WSDL document"),
            Err(e) => warn!(endpoint = %endpoint.base_url, error = %e, "WSDL probe failed"),
        }

        Ok(())
    }

    async fn check_health(&self, endpoint: &Endpoint) -> HealthReport {
        let start = Instant::now();
        let result = self.fetch_wsdl(endpoint, endpoint.timeout).await;
        let elapsed = start.elapsed().as_millis() as u64;

        match result {
            Ok(wsdl) if wsdl.contains("definitions") => HealthReport::healthy(elapsed)
                .with_details(serde_json::json!({ "wsdl_bytes": wsdl.len() })),
            Ok(_) => HealthReport::unhealthy(elapsed, "WSDL document missing definitions"),
            Err(e) => HealthReport::unhealthy(elapsed, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const FAULT_BODY: &str = r#"<?xml version="1.0"?>
        <soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
          <soap:Body>
            <soap:Fault>
              <faultcode>soap:Server</faultcode>
              <faultstring>Order service unavailable</faultstring>
            </soap:Fault>
          </soap:Body>
        </soap:Envelope>"#;

    #[test]
    fn test_envelope_synthesizes_method_element() {
        let request = OutboundRequest::new(Uuid::new_v4(), "GetOrder", "")
            .with_param("orderId", "42")
            .with_param("soap_action", "urn:GetOrder");

        let envelope = SoapAdapter::build_envelope(&request);
        assert!(envelope.contains("<soap:Envelope"));
        assert!(envelope.contains("<GetOrder>"));
        assert!(envelope.contains("<orderId>42</orderId>"));
        assert!(!envelope.contains("soap_action"));
    }

    #[test]
    fn test_envelope_passes_prebuilt_xml_through() {
        let request = OutboundRequest::new(Uuid::new_v4(), "GetOrder", "")
            .with_body("<GetOrder><orderId>42</orderId></GetOrder>");

        let envelope = SoapAdapter::build_envelope(&request);
        assert!(envelope.contains("<soap:Body><GetOrder><orderId>42</orderId></GetOrder></soap:Body>"));
    }

    #[test]
    fn test_envelope_escapes_parameter_text() {
        let request =
            OutboundRequest::new(Uuid::new_v4(), "Echo", "").with_param("text", "a<b&c");
        let envelope = SoapAdapter::build_envelope(&request);
        assert!(envelope.contains("a&lt;b&amp;c"));
    }

    #[test]
    fn test_parse_fault_extracts_code_and_string() {
        let fault = SoapAdapter::parse_fault(FAULT_BODY).unwrap();
        assert_eq!(fault.code.as_deref(), Some("soap:Server"));
        assert_eq!(fault.reason, "Order service unavailable");
    }

    #[test]
    fn test_parse_fault_none_for_clean_response() {
        let body = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
            <soap:Body><GetOrderResponse><status>ok</status></GetOrderResponse></soap:Body>
          </soap:Envelope>"#;
        assert!(SoapAdapter::parse_fault(body).is_none());
    }

    #[tokio::test]
    async fn test_fault_response_is_protocol_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(500)
            .with_body(FAULT_BODY)
            .create_async()
            .await;

        let adapter = SoapAdapter::new().unwrap();
        let ep = Endpoint::new("acme", "orders", server.url(), Protocol::Soap);
        let request = OutboundRequest::new(ep.id, "GetOrder", "").with_param("orderId", "42");

        let resp = adapter.send(&request, &ep).await;
        assert!(!resp.success);
        assert_eq!(resp.status, 500);
        assert!(resp.error.unwrap().contains("Order service unavailable"));
    }

    #[tokio::test]
    async fn test_health_fetches_wsdl() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(mockito::Matcher::Regex("wsdl".to_string()))
            .with_status(200)
            .with_body("<definitions name=\"Orders\"></definitions>")
            .create_async()
            .await;

        let adapter = SoapAdapter::new().unwrap();
        let ep = Endpoint::new("acme", "orders", server.url(), Protocol::Soap);
        let report = adapter.check_health(&ep).await;
        assert!(report.healthy);
    }
}
