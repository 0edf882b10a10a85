//! In-memory [`ObjectStorage`] backend for tests and local development.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{ObjectStorage, StorageError};

/// [`ObjectStorage`] backed by a process-local map.
///
/// A `BTreeMap` keeps listings in lexicographic order, which is
/// "stable enough across a single polling cycle" as the interface
/// requires.
#[derive(Default)]
pub struct MemStorage {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStorage for MemStorage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        Ok(objects.contains_key(path))
    }

    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects.insert(path.to_string(), data);
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        objects
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::Backend(format!("no such object: {path}")))
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        Ok(objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<(), StorageError> {
        let mut objects = self.objects.lock().unwrap_or_else(|e| e.into_inner());
        let data = objects
            .get(src)
            .cloned()
            .ok_or_else(|| StorageError::Backend(format!("no such object: {src}")))?;
        objects.insert(dst.to_string(), data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_overwrites_and_copy_duplicates() {
        let storage = MemStorage::new();
        storage.upload("a/x", b"one".to_vec(), None).await.unwrap();
        storage.upload("a/x", b"two".to_vec(), None).await.unwrap();
        storage.copy("a/x", "b/x").await.unwrap();

        assert_eq!(storage.download("a/x").await.unwrap(), b"two");
        assert_eq!(storage.download("b/x").await.unwrap(), b"two");
        assert_eq!(storage.list("a").await.unwrap(), vec!["a/x"]);
        assert!(storage.exists("b/x").await.unwrap());
        assert!(!storage.exists("c/x").await.unwrap());
    }
}
