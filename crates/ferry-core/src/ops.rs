//! Primitive export operations.
//!
//! Each operation may run any number of times with the same inputs and must
//! converge to the same destination state. Errors are returned raw; the
//! handler decides whether they are worth a retry.

use bytes::Bytes;

use crate::domain::{ExportError, ObjectPointer};
use crate::ports::storage::{PutOptions, StorageAdapter};

/// Copy the full contents of `from` to `to`, overwriting `to`.
///
/// A missing source is an error: the task was planned while it existed.
pub async fn copy(
    store: &dyn StorageAdapter,
    from: &ObjectPointer,
    to: &ObjectPointer,
    opts: &PutOptions,
) -> Result<(), ExportError> {
    let content = store
        .get(from, None)
        .await
        .map_err(|e| ExportError::storage("read source", e))?;
    let size = content.len() as u64;
    store
        .put(to, size, content, opts)
        .await
        .map_err(|e| ExportError::storage("write destination", e))
}

/// Ensure `file` does not exist. Already absent counts as done.
pub async fn delete(store: &dyn StorageAdapter, file: &ObjectPointer) -> Result<(), ExportError> {
    match store.remove(file).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(ExportError::storage("remove", e)),
    }
}

/// Write a zero-length object at `file`, replacing any previous content.
pub async fn touch(
    store: &dyn StorageAdapter,
    file: &ObjectPointer,
    opts: &PutOptions,
) -> Result<(), ExportError> {
    store
        .put(file, 0, Bytes::new(), opts)
        .await
        .map_err(|e| ExportError::storage("write marker", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorKind;
    use crate::impls::InMemoryStore;
    use rstest::rstest;

    const ALL_BYTES: [u8; 256] = {
        let mut bytes = [0u8; 256];
        let mut i = 0;
        while i < 256 {
            bytes[i] = i as u8;
            i += 1;
        }
        bytes
    };

    fn pointer(ns: &str, id: &str) -> ObjectPointer {
        ObjectPointer::new(ns, id)
    }

    async fn put(store: &InMemoryStore, p: &ObjectPointer, data: &'static [u8]) {
        store
            .put(p, data.len() as u64, Bytes::from_static(data), &PutOptions::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn copy_is_idempotent() {
        let store = InMemoryStore::new();
        let src = pointer("mem://lakefs", "one/two");
        let dst = pointer("mem://external", "one/two");
        put(&store, &src, b"payload").await;

        copy(&store, &src, &dst, &PutOptions::default()).await.unwrap();
        copy(&store, &src, &dst, &PutOptions::default()).await.unwrap();

        assert_eq!(store.get(&dst, None).await.unwrap(), Bytes::from_static(b"payload"));
        assert_eq!(store.len().await, 2);
    }

    #[rstest]
    #[case::empty(b"")]
    #[case::non_utf8(&[0xff, 0xfe, 0x00, 0x80, 0xc3, 0x28, 0x00])]
    #[case::all_bytes(&ALL_BYTES)]
    #[tokio::test]
    async fn copy_preserves_any_byte_content(#[case] data: &'static [u8]) {
        let store = InMemoryStore::new();
        let src = pointer("mem://lakefs", "blob");
        let dst = pointer("mem://external", "blob");
        put(&store, &src, data).await;

        copy(&store, &src, &dst, &PutOptions::default()).await.unwrap();
        let got = store.get(&dst, Some(data.len() as u64)).await.unwrap();
        assert_eq!(got.as_ref(), data);
    }

    #[tokio::test]
    async fn writes_carry_the_storage_class() {
        let store = InMemoryStore::new();
        let src = pointer("mem://lakefs", "f");
        let dst = pointer("mem://external", "f");
        let marker = pointer("mem://external", "_SUCCESS");
        put(&store, &src, b"x").await;
        let opts = PutOptions {
            storage_class: Some("STANDARD_IA".into()),
        };

        copy(&store, &src, &dst, &opts).await.unwrap();
        touch(&store, &marker, &opts).await.unwrap();
        assert_eq!(store.storage_class(&dst).await.as_deref(), Some("STANDARD_IA"));
        assert_eq!(store.storage_class(&marker).await.as_deref(), Some("STANDARD_IA"));
    }

    #[tokio::test]
    async fn copy_overwrites_stale_destination() {
        let store = InMemoryStore::new();
        let src = pointer("mem://lakefs", "f");
        let dst = pointer("mem://external", "f");
        put(&store, &src, b"new").await;
        put(&store, &dst, b"half-written old").await;

        copy(&store, &src, &dst, &PutOptions::default()).await.unwrap();
        assert_eq!(store.get(&dst, None).await.unwrap(), Bytes::from_static(b"new"));
    }

    #[tokio::test]
    async fn copy_fails_when_source_is_missing() {
        let store = InMemoryStore::new();
        let err = copy(
            &store,
            &pointer("mem://a", "x"),
            &pointer("mem://b", "x"),
            &PutOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExportError::Storage { operation: "read source", .. }));
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn delete_tolerates_absent_objects() {
        let store = InMemoryStore::new();
        let p = pointer("mem://external", "gone");
        put(&store, &p, b"x").await;

        delete(&store, &p).await.unwrap();
        delete(&store, &p).await.unwrap();
        assert!(!store.contains(&p).await);
    }

    #[tokio::test]
    async fn touch_truncates_existing_content() {
        let store = InMemoryStore::new();
        let p = pointer("mem://external", "_SUCCESS");
        put(&store, &p, b"leftover").await;

        touch(&store, &p, &PutOptions::default()).await.unwrap();
        touch(&store, &p, &PutOptions::default()).await.unwrap();
        assert!(store.get(&p, Some(0)).await.unwrap().is_empty());
    }
}
