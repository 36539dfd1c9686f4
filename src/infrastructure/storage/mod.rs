use std::path::Path;
use thiserror::Error;

pub mod s3;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("storage request failed: {0}")]
    Transient(String),
}

/// Narrow contract the dispatcher needs from object storage.
/// `NotFound` stays distinguishable from `Transient` so a permanently
/// missing source can be dropped while outages stay retryable.
#[allow(async_fn_in_trait)]
pub trait ObjectStorage {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    async fn download(
        &self,
        bucket: &str,
        key: &str,
        local_path: &Path,
    ) -> Result<(), StorageError>;

    async fn upload(
        &self,
        local_path: &Path,
        bucket: &str,
        key: &str,
        content_type: &str,
    ) -> Result<(), StorageError>;
}
