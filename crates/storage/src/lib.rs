//! Object storage port and the job data archive codec.
//!
//! [`ObjectStorage`] is the thin capability interface the
//! orchestration core needs from a prefix-addressable blob store:
//! exists / upload / download / list-by-prefix / copy. Two backends
//! are provided: S3 ([`s3::S3Storage`]) and an in-memory store
//! ([`memory::MemStorage`]) for tests and local development.
//!
//! [`archive`] packs storage prefixes into a single deflate-compressed
//! zip for transfer to the remote compute service and unpacks result
//! archives back into storage.

use async_trait::async_trait;

pub mod archive;
pub mod memory;
pub mod s3;

/// Errors from an object-storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend request failed (network, auth, missing object, ...).
    #[error("object storage error: {0}")]
    Backend(String),
}

/// Capability interface against a prefix-addressable blob store.
///
/// Uploads are idempotent overwrites. Listing carries no ordering
/// guarantee beyond being stable across a single polling cycle.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Whether an object exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Store `data` at `path`, overwriting any existing object.
    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StorageError>;

    /// Fetch the object at `path`.
    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// All object paths under `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Server-side copy of the object at `src` to `dst`.
    async fn copy(&self, src: &str, dst: &str) -> Result<(), StorageError>;
}
