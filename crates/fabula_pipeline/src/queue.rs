//! In-process task queue and worker pool.

use crate::JobWorker;
use async_trait::async_trait;
use fabula_core::JobSpec;
use fabula_error::{DispatchError, DispatchErrorKind, FabulaResult};
use fabula_interface::TaskQueue;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

/// Channel-backed [`TaskQueue`] consumed by an in-process worker pool.
#[derive(Clone)]
pub struct InProcessQueue {
    tx: mpsc::Sender<JobSpec>,
}

impl InProcessQueue {
    /// Create a queue with the given buffer capacity, returning the queue
    /// and the receiver to hand to [`spawn_workers`].
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<JobSpec>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }
}

#[async_trait]
impl TaskQueue for InProcessQueue {
    async fn enqueue(&self, spec: JobSpec) -> FabulaResult<String> {
        let task_id = spec.task_id().clone();
        self.tx.send(spec).await.map_err(|e| {
            DispatchError::new(DispatchErrorKind::QueueUnavailable(e.to_string()))
        })?;
        tracing::debug!(task_id, "job enqueued");
        Ok(task_id)
    }
}

/// Spawn `count` worker tasks draining the queue receiver.
///
/// Workers run until the queue's last sender drops. A job failure is
/// settled by the worker itself and never tears down the pool.
pub fn spawn_workers(
    count: usize,
    rx: mpsc::Receiver<JobSpec>,
    worker: Arc<JobWorker>,
) -> Vec<JoinHandle<()>> {
    let rx = Arc::new(Mutex::new(rx));
    (0..count)
        .map(|worker_index| {
            let rx = Arc::clone(&rx);
            let worker = Arc::clone(&worker);
            tokio::spawn(async move {
                tracing::info!(worker_index, "generation worker started");
                loop {
                    let spec = {
                        let mut rx = rx.lock().await;
                        rx.recv().await
                    };
                    let Some(spec) = spec else {
                        tracing::info!(worker_index, "generation worker stopping");
                        break;
                    };
                    worker.execute(spec).await;
                }
            })
        })
        .collect()
}
