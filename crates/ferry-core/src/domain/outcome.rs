//! Task result model: what the handler hands back to the queue.
//!
//! The queue owns what happens next. `Aborted` asks for a redelivery,
//! `Completed` and `Invalid` are terminal from the handler's point of view.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result status reported to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// The operation succeeded, or its effect was already in place.
    Completed,
    /// Transient failure; the queue may redeliver subject to its own budget.
    Aborted,
    /// Malformed input, unknown action, or a failure escalated to permanent.
    Invalid,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Invalid)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Aborted => "ABORTED",
            TaskStatus::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    pub fn completed() -> Self {
        Self {
            status: TaskStatus::Completed,
            error: None,
        }
    }

    pub fn aborted(error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Aborted,
            error: Some(error.into()),
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            status: TaskStatus::Invalid,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_screaming_names() {
        let s = serde_json::to_string(&TaskStatus::Completed).unwrap();
        assert_eq!(s, "\"COMPLETED\"");
        let s = serde_json::to_string(&TaskStatus::Aborted).unwrap();
        assert_eq!(s, "\"ABORTED\"");
        assert_eq!(TaskStatus::Invalid.to_string(), "INVALID");
    }

    #[test]
    fn completed_result_omits_error() {
        let v = serde_json::to_value(TaskResult::completed()).unwrap();
        assert_eq!(v, serde_json::json!({ "status": "COMPLETED" }));
        assert!(!TaskStatus::Aborted.is_terminal());
        assert!(TaskStatus::Invalid.is_terminal());
    }
}
