//! Errors - エラー型と分類
//!
//! Operations return `ExportError` without any retry opinion. Only the
//! escalation policy turns an `ErrorKind` into retry / give up.

use thiserror::Error;

use super::pointer::LocationError;
use super::task::TaskAction;
use crate::ports::storage::StorageError;

/// ErrorKind は実行エラーの分類
///
/// - Transient: 一時的なエラー（リトライ推奨）
/// - Permanent: 恒久的なエラー（リトライ無意味）
/// - Infrastructure: インフラエラー（backend の設定・配線の問題）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

/// Error raised while decoding or executing an export task.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("missing body for action '{0}'")]
    MissingBody(TaskAction),

    #[error("invalid payload for action '{action}': {source}")]
    InvalidPayload {
        action: TaskAction,
        #[source]
        source: serde_json::Error,
    },

    #[error("field '{0}' is empty")]
    EmptyField(&'static str),

    #[error("invalid location in field '{field}': {source}")]
    InvalidLocation {
        field: &'static str,
        #[source]
        source: LocationError,
    },

    #[error("{operation} failed: {source}")]
    Storage {
        operation: &'static str,
        #[source]
        source: StorageError,
    },
}

impl ExportError {
    pub fn storage(operation: &'static str, source: StorageError) -> Self {
        ExportError::Storage { operation, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ExportError::UnknownAction(_)
            | ExportError::MissingBody(_)
            | ExportError::InvalidPayload { .. }
            | ExportError::EmptyField(_)
            | ExportError::InvalidLocation { .. } => ErrorKind::Permanent,
            ExportError::Storage { source, .. } => source.kind(),
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.kind() == ErrorKind::Permanent
    }
}
