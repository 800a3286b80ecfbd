//! # Flowgate Orchestrator
//!
//! Maintains named, tenant-scoped priority queues of asynchronous
//! messages, drives a timer-based drain loop through a bounded worker
//! pool, applies retry/backoff/dead-letter policy, and performs payload
//! format transformation.
//!
//! ## Message lifecycle
//!
//! ```text
//! Pending -> Processing -> Completed
//!                       -> Retrying --(backoff)--> Pending
//!                       -> DeadLetter --(operator retry)--> Pending
//! ```

pub mod queue;
pub mod retry;
pub mod transform;
pub mod worker;

pub use queue::{PendingQueue, QueueKey};
pub use retry::RetryPolicy;
pub use transform::{detect_format, transform_payload, PayloadFormat, TransformOutcome, TransformResult};
pub use worker::OrchestratorRuntime;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use flowgate_core::event::data_keys;
use flowgate_core::prelude::*;
use flowgate_core::{OrchestratorMetrics, OrchestratorSettings, SimulationSettings};
use flowgate_monitor::MonitorHandle;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Processing strategy applied to each drained message
#[async_trait]
pub trait MessageProcessor: Send + Sync {
    async fn process(&self, message: &Message) -> Result<()>;
}

/// Default processor: bounded simulated work with a probabilistic outcome
pub struct SimulatedProcessor {
    settings: SimulationSettings,
}

impl SimulatedProcessor {
    pub fn new(settings: SimulationSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl MessageProcessor for SimulatedProcessor {
    async fn process(&self, _message: &Message) -> Result<()> {
        // draw outside the await point; thread-local rng is not Send
        let (work, succeed) = {
            use rand::Rng;
            let mut rng = rand::thread_rng();
            let min = self.settings.work_min.as_millis() as u64;
            let max = (self.settings.work_max.as_millis() as u64).max(min);
            let work = if max > min { rng.gen_range(min..=max) } else { min };
            let succeed = rng.gen_bool(self.settings.success_rate.clamp(0.0, 1.0));
            (Duration::from_millis(work), succeed)
        };

        tokio::time::sleep(work).await;
        if succeed {
            Ok(())
        } else {
            Err(FlowgateError::transient("simulated processing failure"))
        }
    }
}

/// Per-queue counters and health flag
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueueStatus {
    pub tenant: TenantId,
    pub queue: String,
    pub pending: usize,
    pub processing: usize,
    pub dead_lettered: usize,
    pub healthy: bool,
}

/// Message orchestrator: queues, retry policy, and transformation
pub struct MessageOrchestrator {
    settings: OrchestratorSettings,
    queues: DashMap<QueueKey, Arc<Mutex<PendingQueue>>>,
    processing: DashMap<Uuid, Message>,
    dead_letters: DashMap<Uuid, Message>,
    seq: AtomicU64,
    retry: RetryPolicy,
    processor: Arc<dyn MessageProcessor>,
    tenants: Arc<dyn TenantProvider>,
    monitor: MonitorHandle,
    metrics: OrchestratorMetrics,
}

impl MessageOrchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        processor: Arc<dyn MessageProcessor>,
        tenants: Arc<dyn TenantProvider>,
        monitor: MonitorHandle,
    ) -> Self {
        Self {
            retry: RetryPolicy::from(&settings.retry),
            settings,
            queues: DashMap::new(),
            processing: DashMap::new(),
            dead_letters: DashMap::new(),
            seq: AtomicU64::new(0),
            processor,
            tenants,
            monitor,
            metrics: OrchestratorMetrics::new(),
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Enqueue a message under the caller's tenant
    pub async fn enqueue(&self, mut message: Message, priority: MessagePriority) -> Result<Uuid> {
        message.tenant = self.tenants.current_tenant();
        message.priority = priority;
        message.status = MessageStatus::Pending;
        message.created_at = Utc::now();
        if message.max_retries == 0 {
            message.max_retries = self.settings.default_max_retries;
        }

        let id = message.id;
        let queue = message.queue.clone();
        let tenant = message.tenant.clone();

        self.insert_pending(message).await;

        self.metrics.record_enqueued(&queue, &priority.to_string());
        self.monitor.emit(
            IntegrationEvent::new(
                EventKind::MessageEnqueued,
                tenant,
                format!("message enqueued to '{}'", queue),
            )
            .with_data(data_keys::MESSAGE_ID, id.to_string())
            .with_data(data_keys::QUEUE, queue.clone())
            .with_data(data_keys::PRIORITY, priority.to_string()),
        );
        debug!(message = %id, queue = %queue, %priority, "message enqueued");
        Ok(id)
    }

    /// Pop the head of the caller's queue and mark it Processing
    pub async fn dequeue(&self, queue_name: &str) -> Option<Message> {
        let key = QueueKey::new(self.tenants.current_tenant(), queue_name);
        self.dequeue_key(&key).await
    }

    async fn dequeue_key(&self, key: &QueueKey) -> Option<Message> {
        let queue = self.queues.get(key)?.clone();
        let mut guard = queue.lock().await;

        // stop if the head is not Pending
        if guard
            .peek()
            .map(|m| m.status != MessageStatus::Pending)
            .unwrap_or(true)
        {
            return None;
        }

        let mut message = guard.pop()?;
        let depth = guard.len();
        drop(guard);
        self.metrics.set_queue_depth(&key.to_string(), depth);

        message.status = MessageStatus::Processing;
        self.processing.insert(message.id, message.clone());

        self.monitor.emit(
            IntegrationEvent::new(
                EventKind::MessageDequeued,
                message.tenant.clone(),
                format!("message dequeued from '{}'", message.queue),
            )
            .with_data(data_keys::MESSAGE_ID, message.id.to_string())
            .with_data(data_keys::QUEUE, message.queue.clone()),
        );
        Some(message)
    }

    /// Run one processing attempt to its outcome
    ///
    /// On transient failure the backoff sleep happens here, inside the
    /// calling worker, before the message re-enters its queue.
    pub async fn process(&self, mut message: Message) -> MessageStatus {
        let start = Instant::now();
        message.status = MessageStatus::Processing;
        self.processing.insert(message.id, message.clone());

        let result = self.processor.process(&message).await;
        self.metrics
            .record_process_duration(&message.queue, start.elapsed());

        match result {
            Ok(()) => {
                message.status = MessageStatus::Completed;
                message.processed_at = Some(Utc::now());
                self.processing.remove(&message.id);

                self.metrics.record_processed(&message.queue, "completed");
                self.monitor.emit(
                    IntegrationEvent::new(
                        EventKind::MessageProcessed,
                        message.tenant.clone(),
                        format!("message completed on '{}'", message.queue),
                    )
                    .with_data(data_keys::MESSAGE_ID, message.id.to_string())
                    .with_data(data_keys::QUEUE, message.queue.clone())
                    .with_data(data_keys::RETRY_COUNT, message.retry_count)
                    .with_data(
                        data_keys::PROCESSING_TIME_MS,
                        start.elapsed().as_millis() as u64,
                    ),
                );
                debug!(message = %message.id, "message completed");
                MessageStatus::Completed
            }
            Err(error) => self.handle_failure(message, error).await,
        }
    }

    async fn handle_failure(&self, mut message: Message, error: FlowgateError) -> MessageStatus {
        let exhausted = message.record_failure(error.to_string());

        if exhausted {
            message.status = MessageStatus::DeadLetter;
            message.processed_at = Some(Utc::now());
            self.processing.remove(&message.id);
            self.dead_letters.insert(message.id, message.clone());

            self.metrics.record_dead_letter(&message.queue);
            self.monitor.emit(
                IntegrationEvent::new(
                    EventKind::MessageDeadLetter,
                    message.tenant.clone(),
                    format!(
                        "message dead-lettered after {} attempts on '{}'",
                        message.retry_count, message.queue
                    ),
                )
                .error()
                .with_data(data_keys::MESSAGE_ID, message.id.to_string())
                .with_data(data_keys::QUEUE, message.queue.clone())
                .with_data(data_keys::RETRY_COUNT, message.retry_count),
            );
            warn!(
                message = %message.id,
                queue = %message.queue,
                attempts = message.retry_count,
                "message dead-lettered"
            );
            return MessageStatus::DeadLetter;
        }

        message.status = MessageStatus::Retrying;
        self.metrics.record_retry(&message.queue);
        let delay = self.retry.delay(message.retry_count);
        debug!(
            message = %message.id,
            retry = message.retry_count,
            delay_ms = delay.as_millis() as u64,
            "message retrying after backoff"
        );

        // backoff occupies this worker by design; see worker module docs
        tokio::time::sleep(delay).await;

        message.status = MessageStatus::Pending;
        self.processing.remove(&message.id);
        self.insert_pending(message).await;
        MessageStatus::Retrying
    }

    /// Transform a message payload, recording the attempt as an event
    pub fn transform(&self, message: &Message, target: PayloadFormat) -> TransformResult {
        let result = transform_payload(&message.payload, target);

        let mut event = IntegrationEvent::new(
            EventKind::MessageTransformed,
            message.tenant.clone(),
            format!("transform {} -> {}", result.source, target),
        )
        .with_data(data_keys::MESSAGE_ID, message.id.to_string())
        .with_data(data_keys::SOURCE_FORMAT, result.source.to_string())
        .with_data(data_keys::TARGET_FORMAT, target.to_string())
        .with_data(data_keys::SUCCESS, result.succeeded());
        if !result.succeeded() {
            event = event.error();
        }
        self.monitor.emit(event);
        result
    }

    /// Move a dead-lettered message back to Pending with a fresh budget
    pub async fn retry_failed(&self, id: Uuid) -> Result<()> {
        let tenant = self.tenants.current_tenant();
        let Some((_, mut message)) = self.dead_letters.remove(&id) else {
            return Err(FlowgateError::not_found("message"));
        };

        if message.tenant != tenant {
            // put it back untouched; the caller does not own it
            self.dead_letters.insert(id, message);
            return Err(FlowgateError::access_denied("message"));
        }

        message.reset_for_retry();
        let queue = message.queue.clone();
        self.insert_pending(message).await;

        info!(message = %id, queue = %queue, "dead-lettered message re-enqueued");
        self.monitor.emit(
            IntegrationEvent::new(
                EventKind::MessageEnqueued,
                tenant,
                format!("dead-lettered message re-enqueued to '{}'", queue),
            )
            .with_data(data_keys::MESSAGE_ID, id.to_string())
            .with_data(data_keys::QUEUE, queue),
        );
        Ok(())
    }

    /// Counters and health for every known queue
    pub async fn queue_status(&self) -> Vec<QueueStatus> {
        let mut statuses: HashMap<QueueKey, QueueStatus> = HashMap::new();

        let queues: Vec<(QueueKey, Arc<Mutex<PendingQueue>>)> = self
            .queues
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        for (key, queue) in queues {
            let pending = queue.lock().await.len();
            statuses.insert(
                key.clone(),
                QueueStatus {
                    tenant: key.tenant,
                    queue: key.name,
                    pending,
                    processing: 0,
                    dead_lettered: 0,
                    healthy: true,
                },
            );
        }

        for entry in self.processing.iter() {
            let key = QueueKey::new(entry.tenant.clone(), entry.queue.clone());
            statuses
                .entry(key.clone())
                .or_insert_with(|| empty_status(&key))
                .processing += 1;
        }
        for entry in self.dead_letters.iter() {
            let key = QueueKey::new(entry.tenant.clone(), entry.queue.clone());
            statuses
                .entry(key.clone())
                .or_insert_with(|| empty_status(&key))
                .dead_lettered += 1;
        }

        let mut result: Vec<QueueStatus> = statuses
            .into_values()
            .map(|mut s| {
                s.healthy = s.pending < self.settings.healthy_pending_limit
                    && s.dead_lettered < self.settings.healthy_dead_letter_limit;
                s
            })
            .collect();
        result.sort_by(|a, b| (&a.tenant, &a.queue).cmp(&(&b.tenant, &b.queue)));
        result
    }

    /// Dead-lettered messages for the caller's tenant
    pub fn dead_letter_messages(&self) -> Vec<Message> {
        let tenant = self.tenants.current_tenant();
        let mut messages: Vec<Message> = self
            .dead_letters
            .iter()
            .filter(|m| m.tenant == tenant)
            .map(|m| m.clone())
            .collect();
        messages.sort_by_key(|m| m.created_at);
        messages
    }

    /// Pop up to `drain_batch` messages per queue and feed the worker pool
    pub async fn drain_once(&self, dispatch: &mpsc::Sender<Message>) -> usize {
        let keys: Vec<QueueKey> = self.queues.iter().map(|e| e.key().clone()).collect();
        let mut dispatched = 0;

        for key in keys {
            for _ in 0..self.settings.drain_batch {
                match self.dequeue_key(&key).await {
                    Some(message) => {
                        if dispatch.send(message).await.is_err() {
                            // pool gone; nothing more to do this tick
                            return dispatched;
                        }
                        dispatched += 1;
                    }
                    None => break,
                }
            }
        }
        dispatched
    }

    async fn insert_pending(&self, message: Message) {
        let key = QueueKey::new(message.tenant.clone(), message.queue.clone());
        let queue = self
            .queues
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(PendingQueue::new())))
            .clone();

        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut guard = queue.lock().await;
        guard.insert(seq, message);
        self.metrics.set_queue_depth(&key.to_string(), guard.len());
    }
}

fn empty_status(key: &QueueKey) -> QueueStatus {
    QueueStatus {
        tenant: key.tenant.clone(),
        queue: key.name.clone(),
        pending: 0,
        processing: 0,
        dead_lettered: 0,
        healthy: true,
    }
}
