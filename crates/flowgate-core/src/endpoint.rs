//! Endpoint model
//!
//! An endpoint is a registered external system reachable through exactly
//! one protocol adapter. Endpoints are created on registration, mutated
//! only by health checks, and deactivated rather than hard-deleted.

use crate::tenant::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Wire protocol tag; matched case-sensitively against adapter registrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "REST")]
    Rest,
    #[serde(rename = "SOAP")]
    Soap,
    #[serde(rename = "GraphQL")]
    GraphQl,
}

impl Protocol {
    /// The exact tag used for adapter resolution
    pub fn as_tag(&self) -> &'static str {
        match self {
            Self::Rest => "REST",
            Self::Soap => "SOAP",
            Self::GraphQl => "GraphQL",
        }
    }

    /// Parse a protocol tag (exact match, case-sensitive)
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "REST" => Some(Self::Rest),
            "SOAP" => Some(Self::Soap),
            "GraphQL" => Some(Self::GraphQl),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Authentication scheme selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AuthKind {
    #[default]
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "APIKEY")]
    ApiKey,
    #[serde(rename = "BEARER")]
    Bearer,
    #[serde(rename = "BASIC")]
    Basic,
}

/// Authentication descriptor: scheme plus key/value configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub kind: AuthKind,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, String>,
}

impl AuthConfig {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::ApiKey,
            params: HashMap::from([("key".to_string(), key.into())]),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Bearer,
            params: HashMap::from([("token".to_string(), token.into())]),
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            kind: AuthKind::Basic,
            params: HashMap::from([
                ("username".to_string(), username.into()),
                ("password".to_string(), password.into()),
            ]),
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// A registered external system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    /// Unique endpoint identifier
    pub id: Uuid,

    /// Owning tenant
    pub tenant: TenantId,

    /// Display name
    pub name: String,

    /// Absolute http/https base address
    pub base_url: String,

    /// Wire protocol
    pub protocol: Protocol,

    /// Headers attached to every outbound call
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub default_headers: HashMap<String, String>,

    /// Authentication descriptor
    #[serde(default)]
    pub auth: AuthConfig,

    /// Inactive endpoints reject routing with 503
    pub active: bool,

    /// Last-known health, unset until the first probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthy: Option<bool>,

    /// Timestamp of the last health probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_health_check: Option<DateTime<Utc>>,

    /// Per-call timeout
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,

    /// Registration time
    pub created_at: DateTime<Utc>,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Endpoint {
    /// Create a new endpoint pending registration
    pub fn new(
        tenant: impl Into<TenantId>,
        name: impl Into<String>,
        base_url: impl Into<String>,
        protocol: Protocol,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant: tenant.into(),
            name: name.into(),
            base_url: base_url.into(),
            protocol,
            default_headers: HashMap::new(),
            auth: AuthConfig::none(),
            active: true,
            healthy: None,
            last_health_check: None,
            timeout: default_timeout(),
            created_at: Utc::now(),
        }
    }

    /// Builder: add a default header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    /// Builder: set authentication
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Builder: set per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Record a health probe result
    pub fn record_health(&mut self, healthy: bool) {
        self.healthy = Some(healthy);
        self.last_health_check = Some(Utc::now());
    }
}
