//! Drain loop and bounded worker pool
//!
//! The drain timer pops pending messages and feeds them over a bounded
//! channel to a fixed-size worker pool, so the number of in-flight
//! `process` calls is an explicit, tunable limit rather than unbounded
//! task fan-out. Backoff sleeps run inside the worker and therefore
//! occupy a pool slot for their duration.

use crate::MessageOrchestrator;
use flowgate_core::prelude::*;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, trace};

/// Handles for the background drain loop and worker pool
pub struct OrchestratorRuntime {
    dispatch: mpsc::Sender<Message>,
    handles: Vec<JoinHandle<()>>,
}

impl OrchestratorRuntime {
    /// Spawn the worker pool and the drain timer
    pub fn spawn(orchestrator: Arc<MessageOrchestrator>) -> Self {
        let workers = orchestrator.settings().workers.max(1);
        let (tx, rx) = mpsc::channel::<Message>(workers * 2);
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(workers + 1);
        for worker_id in 0..workers {
            let rx = rx.clone();
            let orchestrator = orchestrator.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let message = rx.lock().await.recv().await;
                    match message {
                        Some(message) => {
                            orchestrator.process(message).await;
                        }
                        None => break,
                    }
                }
                debug!(worker_id, "worker stopped");
            }));
        }

        let drain_orchestrator = orchestrator.clone();
        let drain_tx = tx.clone();
        handles.push(tokio::spawn(async move {
            let mut tick = interval(drain_orchestrator.settings().drain_interval);
            loop {
                tick.tick().await;
                let dispatched = drain_orchestrator.drain_once(&drain_tx).await;
                if dispatched > 0 {
                    trace!(dispatched, "drain tick");
                }
            }
        }));

        info!(workers, "orchestrator runtime started");
        Self {
            dispatch: tx,
            handles,
        }
    }

    /// Sender feeding the worker pool; lets callers bypass the drain
    /// timer for immediate dispatch
    pub fn dispatcher(&self) -> mpsc::Sender<Message> {
        self.dispatch.clone()
    }

    /// Abort the drain loop and workers
    pub fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        info!("orchestrator runtime stopped");
    }
}
