//! Authentication header application
//!
//! Selected by the endpoint's auth-type tag: API-key header, Bearer
//! token, or Basic credentials. Missing parameters degrade to an
//! unauthenticated request rather than failing the call.

use flowgate_core::prelude::*;
use reqwest::RequestBuilder;
use tracing::warn;

/// Header used for API-key authentication unless overridden via the
/// `header` auth parameter
pub const DEFAULT_API_KEY_HEADER: &str = "X-Api-Key";

/// Correlation headers attached to every outbound call
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

/// Apply the endpoint's authentication descriptor to an outbound call
pub fn apply_auth(builder: RequestBuilder, auth: &AuthConfig) -> RequestBuilder {
    match auth.kind {
        AuthKind::None => builder,
        AuthKind::ApiKey => match auth.param("key") {
            Some(key) => {
                let header = auth.param("header").unwrap_or(DEFAULT_API_KEY_HEADER);
                builder.header(header, key)
            }
            None => {
                warn!("APIKEY auth configured without 'key' parameter");
                builder
            }
        },
        AuthKind::Bearer => match auth.param("token") {
            Some(token) => builder.bearer_auth(token),
            None => {
                warn!("BEARER auth configured without 'token' parameter");
                builder
            }
        },
        AuthKind::Basic => match auth.param("username") {
            Some(user) => builder.basic_auth(user, auth.param("password")),
            None => {
                warn!("BASIC auth configured without 'username' parameter");
                builder
            }
        },
    }
}

/// Attach request-id and correlation-id headers
pub fn apply_correlation(builder: RequestBuilder, request: &OutboundRequest) -> RequestBuilder {
    let builder = builder.header(REQUEST_ID_HEADER, request.id.to_string());
    match &request.correlation_id {
        Some(id) => builder.header(CORRELATION_ID_HEADER, id.as_str()),
        None => builder,
    }
}

/// Merge endpoint default headers with per-request headers
/// (request headers win on conflict)
pub fn apply_headers(
    mut builder: RequestBuilder,
    endpoint: &Endpoint,
    request: &OutboundRequest,
) -> RequestBuilder {
    for (key, value) in &endpoint.default_headers {
        if !request.headers.contains_key(key) {
            builder = builder.header(key.as_str(), value.as_str());
        }
    }
    for (key, value) in &request.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn probe_builder() -> RequestBuilder {
        reqwest::Client::new().get("https://svc.example/")
    }

    fn header_value(builder: RequestBuilder, name: &str) -> Option<String> {
        let req = builder.build().unwrap();
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    }

    #[test]
    fn test_api_key_default_header() {
        let auth = AuthConfig::api_key("s3cr3t");
        let value = header_value(apply_auth(probe_builder(), &auth), DEFAULT_API_KEY_HEADER);
        assert_eq!(value.as_deref(), Some("s3cr3t"));
    }

    #[test]
    fn test_api_key_custom_header() {
        let mut auth = AuthConfig::api_key("s3cr3t");
        auth.params
            .insert("header".to_string(), "X-Custom-Key".to_string());
        let value = header_value(apply_auth(probe_builder(), &auth), "X-Custom-Key");
        assert_eq!(value.as_deref(), Some("s3cr3t"));
    }

    #[test]
    fn test_bearer_token() {
        let auth = AuthConfig::bearer("tok123");
        let value = header_value(apply_auth(probe_builder(), &auth), "authorization");
        assert_eq!(value.as_deref(), Some("Bearer tok123"));
    }

    #[test]
    fn test_basic_credentials() {
        let auth = AuthConfig::basic("svc", "secret");
        let value = header_value(apply_auth(probe_builder(), &auth), "authorization").unwrap();
        assert!(value.starts_with("Basic "));
    }

    #[test]
    fn test_missing_params_leave_request_unauthenticated() {
        let auth = AuthConfig {
            kind: AuthKind::Bearer,
            params: Default::default(),
        };
        let value = header_value(apply_auth(probe_builder(), &auth), "authorization");
        assert!(value.is_none());
    }

    #[test]
    fn test_request_headers_override_endpoint_defaults() {
        let endpoint = Endpoint::new("t", "svc", "https://svc.example", Protocol::Rest)
            .with_header("X-Env", "staging")
            .with_header("X-Team", "integrations");
        let request = OutboundRequest::new(Uuid::new_v4(), "GET", "/")
            .with_header("X-Env", "production");

        let built = apply_headers(probe_builder(), &endpoint, &request)
            .build()
            .unwrap();
        assert_eq!(built.headers().get("X-Env").unwrap(), "production");
        assert_eq!(built.headers().get("X-Team").unwrap(), "integrations");
    }

    #[test]
    fn test_correlation_headers() {
        let request = OutboundRequest::new(Uuid::new_v4(), "GET", "/").with_correlation_id("corr-7");
        let built = apply_correlation(probe_builder(), &request).build().unwrap();
        assert_eq!(
            built.headers().get(REQUEST_ID_HEADER).unwrap(),
            &request.id.to_string()
        );
        assert_eq!(built.headers().get(CORRELATION_ID_HEADER).unwrap(), "corr-7");
    }
}
