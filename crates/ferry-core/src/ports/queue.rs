//! TaskQueue port - the narrow contract with the lease-based task queue.
//!
//! The queue delivers `(action, body, signalled failures)` and accepts one
//! `TaskResult` per delivery. Leasing, heartbeats and persistence live behind
//! this seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use thiserror::Error;

use crate::domain::{ExportError, ExportTask, TaskId, TaskResult};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    #[error("cannot encode task: {0}")]
    Encode(#[from] ExportError),
}

/// One delivery of a task, as seen by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    pub id: TaskId,
    pub action: String,
    pub body: Option<Vec<u8>>,
    /// Failures reported for earlier deliveries of this task.
    pub signalled_failures: u32,
}

/// Per-state counts, for observability and for waiting on a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub dead: usize,
}

impl QueueCounts {
    pub fn in_flight(&self) -> usize {
        self.queued + self.running
    }
}

/// A leased task. The worker owns it until it reports a result.
#[async_trait]
pub trait TaskLease: Send {
    fn task(&self) -> &QueuedTask;

    /// Report the outcome of this delivery (queue decides redelivery).
    async fn report(self: Box<Self>, result: TaskResult) -> Result<(), QueueError>;
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Submit a raw `(action, body)` pair exactly as the queue would store it.
    async fn submit(&self, action: String, body: Option<Vec<u8>>) -> Result<TaskId, QueueError>;

    /// Lease one ready task (waits until available, or returns None once closed).
    async fn lease(&self) -> Option<Box<dyn TaskLease>>;

    async fn counts(&self) -> QueueCounts;

    async fn enqueue(&self, task: &ExportTask) -> Result<TaskId, QueueError> {
        let body = task.encode()?;
        self.submit(task.action().as_str().to_string(), Some(body))
            .await
    }
}
