//! # Flowgate Core
//!
//! Core types, configuration, and utilities for the Flowgate integration
//! gateway: the endpoint/request/response model, the integration event
//! taxonomy, the asynchronous message model, tenancy, and the bounded
//! ring buffer backing the audit and event logs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌──────────────┐      ┌──────────────┐
//! │   Gateway    │─────►│   Adapters   │─────►│   External   │
//! │  (routing)   │      │ REST/SOAP/GQL│      │   systems    │
//! └──────┬───────┘      └──────────────┘      └──────────────┘
//!        │ events                  ▲
//!        ▼                         │ drain
//! ┌──────────────┐      ┌──────────┴───┐
//! │   Monitor    │◄─────│ Orchestrator │
//! │ (rules/alerts)│ events│  (queues)   │
//! └──────────────┘      └──────────────┘
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod message;
pub mod metrics;
pub mod request;
pub mod ring;
pub mod tenant;

pub use config::*;
pub use endpoint::*;
pub use error::*;
pub use event::*;
pub use message::*;
pub use metrics::*;
pub use request::*;
pub use ring::*;
pub use tenant::*;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::FlowgateConfig;
    pub use crate::endpoint::{AuthConfig, AuthKind, Endpoint, Protocol};
    pub use crate::error::{FlowgateError, Result};
    pub use crate::event::{EventKind, IntegrationEvent, Severity};
    pub use crate::message::{Message, MessagePriority, MessageStatus};
    pub use crate::request::{OutboundRequest, OutboundResponse};
    pub use crate::ring::BoundedLog;
    pub use crate::tenant::{StaticTenant, TenantId, TenantProvider};
}
