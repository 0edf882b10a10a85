//! S3 implementation of the [`ObjectStorage`] port.
//!
//! Works against AWS S3 or any S3-compatible store (MinIO et al.)
//! via a custom endpoint URL with path-style addressing.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::{ObjectStorage, StorageError};

/// [`ObjectStorage`] backed by a single S3 bucket.
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    /// Wrap an existing S3 client and bucket.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the ambient AWS environment (credentials,
    /// region), optionally pointed at a custom S3-compatible endpoint.
    pub async fn from_env(bucket: impl Into<String>, endpoint_url: Option<&str>) -> Self {
        let base = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&base).force_path_style(true);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url);
        }
        Self::new(Client::from_conf(builder.build()), bucket)
    }
}

#[async_trait]
impl ObjectStorage for S3Storage {
    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false);
                if not_found {
                    Ok(false)
                } else {
                    Err(StorageError::Backend(format!("head {path}: {err}")))
                }
            }
        }
    }

    async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .set_content_type(content_type.map(str::to_string))
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|err| StorageError::Backend(format!("put {path}: {err}")))?;
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|err| StorageError::Backend(format!("get {path}: {err}")))?;
        let bytes = response
            .body
            .collect()
            .await
            .map_err(|err| StorageError::Backend(format!("read {path}: {err}")))?;
        Ok(bytes.into_bytes().to_vec())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut paths = Vec::new();
        while let Some(page) = pages.next().await {
            let page =
                page.map_err(|err| StorageError::Backend(format!("list {prefix}: {err}")))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    paths.push(key.to_string());
                }
            }
        }
        Ok(paths)
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<(), StorageError> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, src))
            .key(dst)
            .send()
            .await
            .map_err(|err| StorageError::Backend(format!("copy {src} -> {dst}: {err}")))?;
        Ok(())
    }
}
