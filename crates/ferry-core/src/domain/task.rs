//! Export task model: action kinds and their payload shapes.
//!
//! The queue carries `(action, body)` pairs. `ExportTask` is the decoded,
//! closed form of that pair: adding an action means adding a variant here and
//! a branch in the handler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::ExportError;
use super::pointer::ObjectPointer;

/// Action kind carried alongside the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskAction {
    Copy,
    Delete,
    Touch,
}

impl TaskAction {
    pub const ALL: [TaskAction; 3] = [TaskAction::Copy, TaskAction::Delete, TaskAction::Touch];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskAction::Copy => "copy",
            TaskAction::Delete => "delete",
            TaskAction::Touch => "touch",
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskAction {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| ExportError::UnknownAction(s.to_string()))
    }
}

/// Copy `from` to `to`, both fully qualified locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyPayload {
    #[serde(rename = "From", alias = "from")]
    pub from: String,
    #[serde(rename = "To", alias = "to")]
    pub to: String,
}

/// Ensure `file` does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletePayload {
    #[serde(rename = "File", alias = "file")]
    pub file: String,
}

/// Write a zero-length object at `file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchPayload {
    #[serde(rename = "File", alias = "file")]
    pub file: String,
}

impl CopyPayload {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn pointers(&self) -> Result<(ObjectPointer, ObjectPointer), ExportError> {
        Ok((
            parse_field("From", &self.from)?,
            parse_field("To", &self.to)?,
        ))
    }
}

impl DeletePayload {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }

    pub fn pointer(&self) -> Result<ObjectPointer, ExportError> {
        parse_field("File", &self.file)
    }
}

impl TouchPayload {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }

    pub fn pointer(&self) -> Result<ObjectPointer, ExportError> {
        parse_field("File", &self.file)
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<ObjectPointer, ExportError> {
    if value.is_empty() {
        return Err(ExportError::EmptyField(field));
    }
    ObjectPointer::parse(value).map_err(|source| ExportError::InvalidLocation { field, source })
}

/// A decoded export task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportTask {
    Copy(CopyPayload),
    Delete(DeletePayload),
    Touch(TouchPayload),
}

impl ExportTask {
    /// Decode a queue body for `action`.
    ///
    /// Unknown fields are ignored; missing ones are an error.
    pub fn decode(action: TaskAction, body: &[u8]) -> Result<Self, ExportError> {
        let task = match action {
            TaskAction::Copy => ExportTask::Copy(decode_body(action, body)?),
            TaskAction::Delete => ExportTask::Delete(decode_body(action, body)?),
            TaskAction::Touch => ExportTask::Touch(decode_body(action, body)?),
        };
        Ok(task)
    }

    pub fn action(&self) -> TaskAction {
        match self {
            ExportTask::Copy(_) => TaskAction::Copy,
            ExportTask::Delete(_) => TaskAction::Delete,
            ExportTask::Touch(_) => TaskAction::Touch,
        }
    }

    /// Serialize the payload back into the queue's body format.
    pub fn encode(&self) -> Result<Vec<u8>, ExportError> {
        let body = match self {
            ExportTask::Copy(p) => serde_json::to_vec(p),
            ExportTask::Delete(p) => serde_json::to_vec(p),
            ExportTask::Touch(p) => serde_json::to_vec(p),
        };
        body.map_err(|source| ExportError::InvalidPayload {
            action: self.action(),
            source,
        })
    }

    pub fn copy(from: impl Into<String>, to: impl Into<String>) -> Self {
        ExportTask::Copy(CopyPayload::new(from, to))
    }

    pub fn delete(file: impl Into<String>) -> Self {
        ExportTask::Delete(DeletePayload::new(file))
    }

    pub fn touch(file: impl Into<String>) -> Self {
        ExportTask::Touch(TouchPayload::new(file))
    }
}

fn decode_body<T: serde::de::DeserializeOwned>(
    action: TaskAction,
    body: &[u8],
) -> Result<T, ExportError> {
    serde_json::from_slice(body).map_err(|source| ExportError::InvalidPayload { action, source })
}
