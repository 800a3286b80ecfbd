//! Error types for Flowgate
//!
//! Uses `thiserror` for ergonomic error handling with full context preservation.

use thiserror::Error;

/// Result type alias for Flowgate operations
pub type Result<T, E = FlowgateError> = std::result::Result<T, E>;

/// Primary error type for all Flowgate operations
#[derive(Error, Debug)]
pub enum FlowgateError {
    /// Unknown endpoint, message, or queue
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// Cross-tenant access attempt
    #[error("Access denied: {resource}")]
    AccessDenied { resource: String },

    /// Endpoint is registered but inactive
    #[error("Unavailable: {resource}")]
    Unavailable { resource: String },

    /// No adapter registered for the protocol tag
    #[error("Unsupported protocol: {protocol}")]
    UnsupportedProtocol { protocol: String },

    /// Operation exceeded its deadline
    #[error("Timeout: {operation} exceeded {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },

    /// Protocol-level failure reported by the remote system
    /// (SOAP Fault element, GraphQL errors array)
    #[error("{protocol} fault: {message}")]
    ProtocolFault {
        protocol: String,
        code: Option<String>,
        message: String,
    },

    /// Processing failure eligible for retry
    #[error("Transient failure: {message}")]
    TransientFailure { message: String },

    /// Retry budget consumed, message dead-lettered
    #[error("Retries exhausted after {attempts} attempts: {message}")]
    Exhausted { attempts: u32, message: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Payload serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FlowgateError {
    /// Create a not-found error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an access-denied error
    pub fn access_denied(resource: impl Into<String>) -> Self {
        Self::AccessDenied {
            resource: resource.into(),
        }
    }

    /// Create an unavailable error
    pub fn unavailable(resource: impl Into<String>) -> Self {
        Self::Unavailable {
            resource: resource.into(),
        }
    }

    /// Create an unsupported-protocol error
    pub fn unsupported_protocol(protocol: impl Into<String>) -> Self {
        Self::UnsupportedProtocol {
            protocol: protocol.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration_ms,
        }
    }

    /// Create a protocol fault
    pub fn fault(
        protocol: impl Into<String>,
        code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProtocolFault {
            protocol: protocol.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a transient failure
    pub fn transient(message: impl Into<String>) -> Self {
        Self::TransientFailure {
            message: message.into(),
        }
    }

    /// Create an exhausted error
    pub fn exhausted(attempts: u32, message: impl Into<String>) -> Self {
        Self::Exhausted {
            attempts,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            source: None,
        }
    }

    /// Create a serialization error with source
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::TransientFailure { .. } | Self::Unavailable { .. }
        )
    }

    /// Check if error is transient (may resolve on its own)
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::TransientFailure { .. })
    }

    /// Synthetic HTTP status code reported to callers for this failure class
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::AccessDenied { .. } => 403,
            Self::Unavailable { .. } => 503,
            Self::UnsupportedProtocol { .. } => 501,
            Self::Timeout { .. } => 408,
            _ => 500,
        }
    }
}

impl From<serde_json::Error> for FlowgateError {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization_with_source("JSON error", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(FlowgateError::not_found("endpoint").status_code(), 404);
        assert_eq!(FlowgateError::access_denied("endpoint").status_code(), 403);
        assert_eq!(FlowgateError::unavailable("endpoint").status_code(), 503);
        assert_eq!(
            FlowgateError::unsupported_protocol("FTP").status_code(),
            501
        );
        assert_eq!(FlowgateError::timeout("send", 5000).status_code(), 408);
        assert_eq!(FlowgateError::internal("boom").status_code(), 500);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(FlowgateError::timeout("send", 100).is_retryable());
        assert!(FlowgateError::transient("flaky").is_retryable());
        assert!(!FlowgateError::access_denied("endpoint").is_retryable());
        assert!(!FlowgateError::exhausted(3, "gave up").is_retryable());
    }
}
