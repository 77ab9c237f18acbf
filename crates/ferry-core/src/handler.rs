//! ExportHandler - decodes a queue delivery and runs the matching operation.
//!
//! `handle` is a pure function of its inputs plus backend state: it keeps no
//! per-task state and is safe to call concurrently and repeatedly.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::{
    Escalation, EscalationPolicy, ExportError, ExportTask, MaxFailures, TaskAction, TaskResult,
};
use crate::ops;
use crate::ports::storage::{PutOptions, StorageAdapter, StorageError};

pub const DEFAULT_MAX_SIGNALLED_FAILURES: u32 = 5;

pub struct ExportHandler {
    store: Arc<dyn StorageAdapter>,
    escalation: Arc<dyn EscalationPolicy>,
    operation_timeout: Option<Duration>,
    put_options: PutOptions,
}

impl ExportHandler {
    pub fn new(store: Arc<dyn StorageAdapter>) -> Self {
        Self {
            store,
            escalation: Arc::new(MaxFailures::new(DEFAULT_MAX_SIGNALLED_FAILURES)),
            operation_timeout: None,
            put_options: PutOptions::default(),
        }
    }

    pub fn with_escalation(mut self, escalation: Arc<dyn EscalationPolicy>) -> Self {
        self.escalation = escalation;
        self
    }

    /// Abandon an operation that runs longer than `timeout`.
    pub fn with_operation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Options passed to every write (storage class of copies and markers).
    pub fn with_put_options(mut self, put_options: PutOptions) -> Self {
        self.put_options = put_options;
        self
    }

    /// Handle one delivery: `(action, body, signalled failures)` -> result.
    pub async fn handle(
        &self,
        action: &str,
        body: Option<&[u8]>,
        signalled_failures: u32,
    ) -> TaskResult {
        match decode(action, body) {
            Ok(task) => self.handle_task(&task, signalled_failures).await,
            Err(err) => TaskResult::invalid(err.to_string()),
        }
    }

    /// Handle an already decoded task.
    pub async fn handle_task(&self, task: &ExportTask, signalled_failures: u32) -> TaskResult {
        match self.execute(task).await {
            Ok(()) => TaskResult::completed(),
            Err(err) => self.escalate(&err, signalled_failures),
        }
    }

    fn escalate(&self, err: &ExportError, signalled_failures: u32) -> TaskResult {
        match self.escalation.escalate(err, signalled_failures) {
            Escalation::Retry => TaskResult::aborted(err.to_string()),
            Escalation::GiveUp if err.is_permanent() => TaskResult::invalid(err.to_string()),
            Escalation::GiveUp => TaskResult::invalid(format!(
                "giving up after {signalled_failures} signalled failures: {err}"
            )),
        }
    }

    async fn execute(&self, task: &ExportTask) -> Result<(), ExportError> {
        let store = self.store.as_ref();
        let opts = &self.put_options;
        let operation = async {
            match task {
                ExportTask::Copy(payload) => {
                    let (from, to) = payload.pointers()?;
                    ops::copy(store, &from, &to, opts).await
                }
                ExportTask::Delete(payload) => ops::delete(store, &payload.pointer()?).await,
                ExportTask::Touch(payload) => ops::touch(store, &payload.pointer()?, opts).await,
            }
        };

        match self.operation_timeout {
            None => operation.await,
            Some(limit) => match tokio::time::timeout(limit, operation).await {
                Ok(result) => result,
                Err(_) => Err(ExportError::storage(
                    task.action().as_str(),
                    StorageError::Timeout(limit),
                )),
            },
        }
    }
}

fn decode(action: &str, body: Option<&[u8]>) -> Result<ExportTask, ExportError> {
    let action: TaskAction = action.parse()?;
    let body = body.ok_or(ExportError::MissingBody(action))?;
    ExportTask::decode(action, body)
}
