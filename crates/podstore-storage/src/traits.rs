//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// User-defined metadata attached to a stored object.
pub type ObjectMetadata = BTreeMap<String, String>;

/// Body of a streamed upload.
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// The gateway treats the store as a remote key/value blob service and never
/// assumes anything about its layout beyond the key it passes in.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under `key` in a single request.
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<()>;

    /// Store the contents of `reader` under `key` without buffering the whole
    /// payload.
    ///
    /// The reader is consumed until EOF. `content_length` is the expected
    /// size; backends may use it to size parts. Returns the number of bytes
    /// written. A failure to read from `reader` is reported as
    /// [`StorageError::IoError`] carrying the reader's error, and no object is
    /// left behind under `key`.
    async fn put_object_stream(
        &self,
        key: &str,
        reader: ObjectReader,
        content_length: u64,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> StorageResult<u64>;

    /// Generate a presigned/temporary URL for direct read access (GET)
    async fn presigned_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Delete an object. Deleting a key that does not exist succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Non-expiring URL of an object, for publicly readable content.
    fn public_url(&self, key: &str) -> String;

    /// Bucket (or root) objects are stored in.
    fn bucket_name(&self) -> &str;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
