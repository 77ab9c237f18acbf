//! InMemoryStore - 開発・テスト用の object store
//!
//! Any namespace is accepted; objects are keyed by the normalized pointer.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::ObjectPointer;
use crate::ports::storage::{PutOptions, StorageAdapter, StorageError, check_size};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    storage_class: Option<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: RwLock<HashMap<ObjectPointer, StoredObject>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    pub async fn contains(&self, pointer: &ObjectPointer) -> bool {
        self.objects.read().await.contains_key(pointer)
    }

    /// Storage class recorded by the last `put`, if any.
    pub async fn storage_class(&self, pointer: &ObjectPointer) -> Option<String> {
        self.objects
            .read()
            .await
            .get(pointer)
            .and_then(|o| o.storage_class.clone())
    }

    /// Sorted identifiers stored under `namespace`, relative to it.
    /// `namespace` may carry a path (`mem://bucket/repo1`).
    pub async fn identifiers(&self, namespace: &str) -> Vec<String> {
        let prefix = format!("{}/", namespace.trim_end_matches('/'));
        let objects = self.objects.read().await;
        let mut ids: Vec<String> = objects
            .keys()
            .filter_map(|p| p.location().strip_prefix(&prefix).map(str::to_string))
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl StorageAdapter for InMemoryStore {
    async fn put(
        &self,
        pointer: &ObjectPointer,
        size: u64,
        content: Bytes,
        opts: &PutOptions,
    ) -> Result<(), StorageError> {
        check_size(pointer, size, content.len())?;
        let object = StoredObject {
            data: content,
            storage_class: opts.storage_class.clone(),
        };
        self.objects.write().await.insert(pointer.clone(), object);
        Ok(())
    }

    async fn get(
        &self,
        pointer: &ObjectPointer,
        expected_size: Option<u64>,
    ) -> Result<Bytes, StorageError> {
        let objects = self.objects.read().await;
        let object = objects
            .get(pointer)
            .ok_or_else(|| StorageError::NotFound(pointer.clone()))?;
        if let Some(expected) = expected_size {
            check_size(pointer, expected, object.data.len())?;
        }
        Ok(object.data.clone())
    }

    async fn remove(&self, pointer: &ObjectPointer) -> Result<(), StorageError> {
        match self.objects.write().await.remove(pointer) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(pointer.clone())),
        }
    }
}
