//! Pending message queues
//!
//! Logical queue identity is `tenant:name`. The pending queue is a true
//! priority queue keyed by `(priority, sequence)`: an enqueue is a single
//! ordered-map insert, so concurrent enqueues cannot lose updates, unlike
//! a rebuild-and-swap scheme. Within a priority class, messages drain in
//! insertion order.

use flowgate_core::prelude::*;
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;

/// Queue identity scoped to a tenant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueueKey {
    pub tenant: TenantId,
    pub name: String,
}

impl QueueKey {
    pub fn new(tenant: impl Into<TenantId>, name: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tenant, self.name)
    }
}

/// Priority-ordered queue of Pending messages
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: BTreeMap<(Reverse<u8>, u64), Message>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a message under its priority and global sequence number
    pub fn insert(&mut self, seq: u64, message: Message) {
        self.entries
            .insert((Reverse(message.priority.rank()), seq), message);
    }

    /// Highest-priority, oldest message without removing it
    pub fn peek(&self) -> Option<&Message> {
        self.entries.values().next()
    }

    /// Pop the head message
    pub fn pop(&mut self) -> Option<Message> {
        self.entries.pop_first().map(|(_, message)| message)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
