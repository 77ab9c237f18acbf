use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::TaskStatus;
use crate::handler::ExportHandler;
use crate::ports::queue::TaskQueue;

/// Worker group handle.
/// - `request_shutdown()` でワーカー全体が新しい lease を取らなくなる
/// - `join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers.
    pub fn spawn(n: usize, queue: Arc<dyn TaskQueue>, handler: Arc<ExportHandler>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let q = Arc::clone(&queue);
            let h = Arc::clone(&handler);
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, q, h, &mut rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// Request shutdown for all workers.
    /// In-flight operations finish and report; no new leases are taken.
    pub fn request_shutdown(&self) {
        // receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Wait for all workers (they exit on shutdown or when the queue closes).
    pub async fn join(self) {
        for j in self.joins {
            if let Err(e) = j.await {
                warn!(error = %e, "worker task panicked");
            }
        }
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        self.join().await;
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn TaskQueue>,
    handler: Arc<ExportHandler>,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    debug!(worker_id, "worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // lease は「待つ」可能性があるので select で shutdown と競合させる
        let lease = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            lease = queue.lease() => lease,
        };

        let Some(lease) = lease else {
            // queue closed
            break;
        };

        let task = lease.task();
        let task_id = task.id;
        let action = task.action.clone();
        let failures = task.signalled_failures;
        debug!(worker_id, %task_id, %action, failures, "leased task");

        let result = handler
            .handle(&task.action, task.body.as_deref(), failures)
            .await;

        match result.status {
            TaskStatus::Completed => {
                info!(worker_id, %task_id, %action, "task completed");
            }
            TaskStatus::Aborted => {
                warn!(
                    worker_id,
                    %task_id,
                    %action,
                    failures,
                    error = result.error.as_deref().unwrap_or_default(),
                    "task aborted, will be retried"
                );
            }
            TaskStatus::Invalid => {
                warn!(
                    worker_id,
                    %task_id,
                    %action,
                    failures,
                    error = result.error.as_deref().unwrap_or_default(),
                    "task failed permanently"
                );
            }
        }

        if let Err(e) = lease.report(result).await {
            warn!(worker_id, %task_id, error = %e, "result report failed");
        }
    }
    debug!(worker_id, "worker stopped");
}
