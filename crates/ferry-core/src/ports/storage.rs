//! StorageAdapter port - namespace + key object storage (mem / local / s3 ...)
//!
//! Callers never assume filesystem semantics: no rename, no listing order.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::domain::{ErrorKind, ObjectPointer};

/// Per-write options. Backends ignore what they do not support.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub storage_class: Option<String>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(ObjectPointer),

    #[error("size mismatch for {pointer}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        pointer: ObjectPointer,
        expected: u64,
        actual: u64,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("io error on {pointer}: {source}")]
    Io {
        pointer: ObjectPointer,
        #[source]
        source: io::Error,
    },

    #[error("no backend for namespace '{0}'")]
    UnsupportedNamespace(String),

    #[error("identifier '{0}' cannot be stored by this backend")]
    InvalidIdentifier(String),
}

impl StorageError {
    pub fn io(pointer: &ObjectPointer, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(pointer.clone())
        } else {
            StorageError::Io {
                pointer: pointer.clone(),
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// A missing object may be an eventual-consistency artifact, so it is
    /// transient like any other backend failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_)
            | StorageError::Unavailable(_)
            | StorageError::Timeout(_)
            | StorageError::Io { .. } => ErrorKind::Transient,
            StorageError::SizeMismatch { .. } | StorageError::UnsupportedNamespace(_) => {
                ErrorKind::Infrastructure
            }
            StorageError::InvalidIdentifier(_) => ErrorKind::Permanent,
        }
    }
}

/// Uniform get/put/remove over `(namespace, identifier)`.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Write `content` to `pointer`, replacing anything already there.
    ///
    /// `size` must equal `content.len()`.
    async fn put(
        &self,
        pointer: &ObjectPointer,
        size: u64,
        content: Bytes,
        opts: &PutOptions,
    ) -> Result<(), StorageError>;

    /// Read the full object. `expected_size`, when given, is checked.
    async fn get(
        &self,
        pointer: &ObjectPointer,
        expected_size: Option<u64>,
    ) -> Result<Bytes, StorageError>;

    /// Remove the object. A missing object is reported as `NotFound`.
    async fn remove(&self, pointer: &ObjectPointer) -> Result<(), StorageError>;
}

/// Shared size check used by the bundled adapters.
pub(crate) fn check_size(
    pointer: &ObjectPointer,
    expected: u64,
    actual: usize,
) -> Result<(), StorageError> {
    let actual = actual as u64;
    if expected != actual {
        return Err(StorageError::SizeMismatch {
            pointer: pointer.clone(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let p = ObjectPointer::new("local://root", "a");
        let err = StorageError::io(&p, io::Error::from(io::ErrorKind::NotFound));
        assert!(err.is_not_found());

        let err = StorageError::io(&p, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(!err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test]
    fn size_check() {
        let p = ObjectPointer::new("mem://b", "a");
        assert!(check_size(&p, 3, 3).is_ok());
        let err = check_size(&p, 3, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }
}
