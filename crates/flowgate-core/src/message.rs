//! Asynchronous work messages
//!
//! A message is the unit of asynchronous work flowing through the
//! orchestrator. Status transitions are owned exclusively by the
//! orchestrator:
//!
//! ```text
//! Pending -> Processing -> Completed            (terminal)
//!                       -> Retrying -> Pending  (loop)
//!                       -> DeadLetter           (terminal; operator retry
//!                                                resets to Pending)
//! ```

use crate::tenant::TenantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Scheduling priority; Critical and High drain before Normal and Low
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePriority {
    Low,
    Normal,
    High,
    Critical,
}

impl MessagePriority {
    /// Ordering rank; larger drains first
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }
}

impl fmt::Display for MessagePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Message lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Processing,
    Completed,
    Retrying,
    DeadLetter,
}

impl MessageStatus {
    /// Terminal states cannot transition automatically
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::DeadLetter)
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Retrying => "retrying",
            Self::DeadLetter => "dead_letter",
        };
        f.write_str(s)
    }
}

/// Unit of asynchronous work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message identifier (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Owning tenant
    pub tenant: TenantId,

    /// Logical queue name (scoped to the tenant)
    pub queue: String,

    /// Scheduling priority
    pub priority: MessagePriority,

    /// Lifecycle state
    pub status: MessageStatus,

    /// Raw payload content
    pub payload: String,

    /// Declared payload type (e.g. "application/json")
    pub content_type: String,

    /// Failed processing attempts so far
    pub retry_count: u32,

    /// Retry budget before dead-lettering
    pub max_retries: u32,

    /// Last processing error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Enqueue time
    pub created_at: DateTime<Utc>,

    /// Completion or dead-letter time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn new(
        tenant: impl Into<TenantId>,
        queue: impl Into<String>,
        payload: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            tenant: tenant.into(),
            queue: queue.into(),
            priority: MessagePriority::Normal,
            status: MessageStatus::Pending,
            payload: payload.into(),
            content_type: content_type.into(),
            retry_count: 0,
            max_retries: 3,
            error: None,
            created_at: Utc::now(),
            processed_at: None,
        }
    }

    /// Builder: set priority
    pub fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: set retry budget
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Check whether the retry budget is consumed
    pub fn exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Record a failed attempt; returns true once the budget is consumed
    pub fn record_failure(&mut self, error: impl Into<String>) -> bool {
        self.retry_count += 1;
        self.error = Some(error.into());
        self.exhausted()
    }

    /// Reset for operator-driven resurrection from the dead-letter index
    pub fn reset_for_retry(&mut self) {
        self.status = MessageStatus::Pending;
        self.retry_count = 0;
        self.error = None;
        self.processed_at = None;
    }
}
