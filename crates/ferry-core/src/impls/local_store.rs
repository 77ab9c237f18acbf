//! LocalStore - ローカルファイルシステム上の object store
//!
//! `<scheme>://<root>/<key>` maps to `<base>/<root>/<key>`. Only one scheme is
//! served (default `local`); other namespaces are rejected.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use ulid::Ulid;

use crate::domain::ObjectPointer;
use crate::ports::storage::{PutOptions, StorageAdapter, StorageError, check_size};

pub const DEFAULT_SCHEME: &str = "local";

#[derive(Debug, Clone)]
pub struct LocalStore {
    base: PathBuf,
    scheme: String,
}

impl LocalStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self::with_scheme(base, DEFAULT_SCHEME)
    }

    pub fn with_scheme(base: impl Into<PathBuf>, scheme: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            scheme: scheme.into(),
        }
    }

    /// Filesystem path for `pointer`.
    pub fn path_for(&self, pointer: &ObjectPointer) -> Result<PathBuf, StorageError> {
        if pointer.scheme() != self.scheme {
            return Err(StorageError::UnsupportedNamespace(
                pointer.storage_namespace().to_string(),
            ));
        }

        let mut path = self.base.clone();
        push_segments(&mut path, pointer.root())?;
        push_segments(&mut path, pointer.identifier())?;
        Ok(path)
    }
}

// Empty, `.` and `..` segments would let a key escape or alias another key.
fn push_segments(path: &mut PathBuf, value: &str) -> Result<(), StorageError> {
    for segment in value.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
            return Err(StorageError::InvalidIdentifier(value.to_string()));
        }
        path.push(segment);
    }
    Ok(())
}

#[async_trait]
impl StorageAdapter for LocalStore {
    async fn put(
        &self,
        pointer: &ObjectPointer,
        size: u64,
        content: Bytes,
        _opts: &PutOptions,
    ) -> Result<(), StorageError> {
        check_size(pointer, size, content.len())?;
        let path = self.path_for(pointer)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(pointer, e))?;
        }

        // 一時ファイルに書いてから rename する（途中で中断されても壊れた object を残さない）
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{file_name}.{}.tmp", Ulid::new()));
        if let Err(e) = tokio::fs::write(&tmp, &content).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::io(pointer, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(StorageError::io(pointer, e));
        }
        Ok(())
    }

    async fn get(
        &self,
        pointer: &ObjectPointer,
        expected_size: Option<u64>,
    ) -> Result<Bytes, StorageError> {
        let path = self.path_for(pointer)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| StorageError::io(pointer, e))?;
        if let Some(expected) = expected_size {
            check_size(pointer, expected, data.len())?;
        }
        Ok(Bytes::from(data))
    }

    async fn remove(&self, pointer: &ObjectPointer) -> Result<(), StorageError> {
        let path = self.path_for(pointer)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::io(pointer, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(location: &str) -> ObjectPointer {
        ObjectPointer::parse(location).unwrap()
    }

    #[test]
    fn path_mapping() {
        let store = LocalStore::new("/data");
        let path = store.path_for(&pointer("local://bucket/a/b.txt")).unwrap();
        assert_eq!(path, PathBuf::from("/data/bucket/a/b.txt"));

        let err = store.path_for(&pointer("s3://bucket/a")).unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedNamespace(ref ns) if ns == "s3://bucket"));

        for bad in ["local://bucket/../etc/passwd", "local://bucket/a//b", "local://../x/y"] {
            let err = store.path_for(&pointer(bad)).unwrap_err();
            assert!(matches!(err, StorageError::InvalidIdentifier(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn put_get_remove_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let p = pointer("local://bucket/one/two");

        store
            .put(&p, 4, Bytes::from_static(b"data"), &PutOptions::default())
            .await
            .unwrap();
        assert!(dir.path().join("bucket/one/two").is_file());
        assert_eq!(store.get(&p, Some(4)).await.unwrap(), Bytes::from_static(b"data"));

        // overwrite
        store
            .put(&p, 0, Bytes::new(), &PutOptions::default())
            .await
            .unwrap();
        assert!(store.get(&p, None).await.unwrap().is_empty());

        store.remove(&p).await.unwrap();
        assert!(store.get(&p, None).await.unwrap_err().is_not_found());
        assert!(store.remove(&p).await.unwrap_err().is_not_found());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("bucket/one"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty());
    }
}
