//! InMemoryTaskQueue - 開発・テスト用の at-least-once キュー
//!
//! Not a replacement for the real lease-based queue: no persistence, no lease
//! timeouts. It does reproduce the parts the handler has to tolerate:
//! - `Aborted` is redelivered with an incremented failure count
//! - a lease dropped without a report is redelivered (worker crash)
//! - redeliveries are bounded by the queue's own budget

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

use crate::domain::{TaskId, TaskResult, TaskStatus};
use crate::ports::queue::{QueueCounts, QueueError, QueuedTask, TaskLease, TaskQueue};

/// State transitions:
/// - Queued -> Running -> Succeeded
/// - Queued -> Running -> Queued (aborted or lease lost, budget left)
/// - Queued -> Running -> Dead (aborted, budget exhausted)
/// - Queued -> Running -> Failed (invalid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Dead,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed | TaskState::Dead)
    }
}

/// Snapshot of one task, for tests and reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: TaskId,
    pub action: String,
    pub state: TaskState,
    pub signalled_failures: u32,
    pub deliveries: u32,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct TaskRecord {
    action: String,
    body: Option<Vec<u8>>,
    state: TaskState,
    signalled_failures: u32,
    deliveries: u32,
    last_error: Option<String>,
}

#[derive(Debug)]
struct QueueState {
    records: HashMap<TaskId, TaskRecord>,
    ready: VecDeque<TaskId>,
    closed: bool,
    max_deliveries: u32,
}

impl QueueState {
    fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in self.records.values() {
            match record.state {
                TaskState::Queued => counts.queued += 1,
                TaskState::Running => counts.running += 1,
                TaskState::Succeeded => counts.succeeded += 1,
                TaskState::Failed => counts.failed += 1,
                TaskState::Dead => counts.dead += 1,
            }
        }
        counts
    }

    fn requeue(&mut self, id: TaskId) {
        if let Some(record) = self.records.get_mut(&id) {
            record.state = TaskState::Queued;
            self.ready.push_back(id);
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    /// Wakes workers waiting in `lease`.
    ready: Notify,
    /// Wakes callers of `wait_idle`.
    idle: Notify,
}

impl Shared {
    // ロックは await を跨がない。poison されても状態自体は一貫している。
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn after_transition(&self, state: &QueueState, requeued: bool) {
        if requeued {
            self.ready.notify_one();
        }
        if state.counts().in_flight() == 0 {
            self.idle.notify_waiters();
        }
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryTaskQueue {
    shared: Arc<Shared>,
}

impl InMemoryTaskQueue {
    pub fn new(max_deliveries: u32) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    records: HashMap::new(),
                    ready: VecDeque::new(),
                    closed: false,
                    max_deliveries,
                }),
                ready: Notify::new(),
                idle: Notify::new(),
            }),
        }
    }

    /// Stop handing out work; idle `lease` calls return `None`.
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.ready.notify_waiters();
    }

    pub fn get(&self, id: TaskId) -> Option<TaskView> {
        let state = self.shared.lock();
        state.records.get(&id).map(|r| TaskView {
            id,
            action: r.action.clone(),
            state: r.state,
            signalled_failures: r.signalled_failures,
            deliveries: r.deliveries,
            last_error: r.last_error.clone(),
        })
    }

    /// Resolve once nothing is queued or running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.shared.lock().counts().in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn submit(&self, action: String, body: Option<Vec<u8>>) -> Result<TaskId, QueueError> {
        let id = TaskId::generate();
        {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            state.records.insert(
                id,
                TaskRecord {
                    action,
                    body,
                    state: TaskState::Queued,
                    signalled_failures: 0,
                    deliveries: 0,
                    last_error: None,
                },
            );
            state.ready.push_back(id);
        }
        self.shared.ready.notify_one();
        Ok(id)
    }

    async fn lease(&self) -> Option<Box<dyn TaskLease>> {
        loop {
            // Register interest before looking, so a concurrent submit/close
            // between the check and the await is not lost.
            let notified = self.shared.ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.shared.lock();
                while let Some(id) = state.ready.pop_front() {
                    let Some(record) = state.records.get_mut(&id) else {
                        continue;
                    };
                    if record.state != TaskState::Queued {
                        continue;
                    }
                    record.state = TaskState::Running;
                    record.deliveries += 1;
                    let task = QueuedTask {
                        id,
                        action: record.action.clone(),
                        body: record.body.clone(),
                        signalled_failures: record.signalled_failures,
                    };
                    let lease: Box<dyn TaskLease> = Box::new(InMemoryLease {
                        task,
                        shared: Arc::clone(&self.shared),
                        reported: false,
                    });
                    return Some(lease);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    async fn counts(&self) -> QueueCounts {
        self.shared.lock().counts()
    }
}

struct InMemoryLease {
    task: QueuedTask,
    shared: Arc<Shared>,
    reported: bool,
}

#[async_trait]
impl TaskLease for InMemoryLease {
    fn task(&self) -> &QueuedTask {
        &self.task
    }

    async fn report(self: Box<Self>, result: TaskResult) -> Result<(), QueueError> {
        let mut lease = self;
        lease.reported = true;
        let id = lease.task.id;
        let shared = Arc::clone(&lease.shared);
        let mut state = shared.lock();
        let max_deliveries = state.max_deliveries;
        let record = state
            .records
            .get_mut(&id)
            .ok_or(QueueError::UnknownTask(id))?;

        let mut requeue = false;
        match result.status {
            TaskStatus::Completed => {
                record.state = TaskState::Succeeded;
                record.last_error = None;
            }
            TaskStatus::Invalid => {
                record.state = TaskState::Failed;
                record.last_error = result.error;
            }
            TaskStatus::Aborted => {
                record.signalled_failures += 1;
                record.last_error = result.error;
                if record.deliveries >= max_deliveries {
                    record.state = TaskState::Dead;
                } else {
                    requeue = true;
                }
            }
        }

        if requeue {
            state.requeue(id);
        }
        shared.after_transition(&state, requeue);
        Ok(())
    }
}

impl Drop for InMemoryLease {
    fn drop(&mut self) {
        if self.reported {
            return;
        }
        // lease lost without a report: redeliver within the budget, failure
        // count unchanged
        let mut state = self.shared.lock();
        let max_deliveries = state.max_deliveries;
        let Some(record) = state.records.get_mut(&self.task.id) else {
            return;
        };
        if record.state != TaskState::Running {
            return;
        }

        let requeue = record.deliveries < max_deliveries;
        if requeue {
            state.requeue(self.task.id);
        } else {
            record.state = TaskState::Dead;
            record.last_error = Some("lease lost without a report".to_string());
        }
        self.shared.after_transition(&state, requeue);
    }
}
