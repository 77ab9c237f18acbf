//! Domain model (pointers, tasks, results, errors, escalation).

pub mod errors;
pub mod escalation;
pub mod ids;
pub mod outcome;
pub mod pointer;
pub mod task;

pub use self::errors::{ErrorKind, ExportError};
pub use self::escalation::{Escalation, EscalationPolicy, MaxFailures};
pub use self::ids::TaskId;
pub use self::outcome::{TaskResult, TaskStatus};
pub use self::pointer::{LocationError, ObjectPointer};
pub use self::task::{CopyPayload, DeletePayload, ExportTask, TaskAction, TouchPayload};
