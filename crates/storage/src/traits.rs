//! Blob container interface implemented by each transport.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reality_transfer_common::ProgressCallback;

use crate::error::StorageError;

/// Information about a blob from a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobInfo {
    /// Full blob name inside the container.
    pub name: String,
    /// Blob size in bytes.
    pub size: u64,
}

impl BlobInfo {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Progress of a single blob transfer, reported at chunk boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobProgress {
    /// Bytes of this blob moved so far.
    pub bytes_transferred: u64,
    /// Size of the blob, when known.
    pub total_bytes: u64,
}

/// Low-level container operations - implemented by each backend.
///
/// Every transfer takes an optional progress callback. Implementations call
/// it after each chunk and stop with `StorageError::Cancelled` as soon as it
/// returns false.
#[async_trait]
pub trait ContainerClient: Send + Sync {
    /// Container name, used in error messages.
    fn container_name(&self) -> &str;

    /// List every blob whose name starts with `prefix` (flat listing).
    async fn list_blobs(&self, prefix: &str) -> Result<Vec<BlobInfo>, StorageError>;

    /// Upload bytes as a blob, replacing any existing one.
    async fn upload_blob(
        &self,
        name: &str,
        data: &[u8],
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError>;

    /// Upload a local file as a blob.
    async fn upload_blob_from_file(
        &self,
        name: &str,
        file_path: &Path,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError>;

    /// Download a blob to memory.
    async fn download_blob(
        &self,
        name: &str,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<Vec<u8>, StorageError>;

    /// Download a blob to a local file, replacing it.
    async fn download_blob_to_file(
        &self,
        name: &str,
        file_path: &Path,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError>;
}

#[async_trait]
impl<T: ContainerClient + ?Sized> ContainerClient for Arc<T> {
    fn container_name(&self) -> &str {
        (**self).container_name()
    }

    async fn list_blobs(&self, prefix: &str) -> Result<Vec<BlobInfo>, StorageError> {
        (**self).list_blobs(prefix).await
    }

    async fn upload_blob(
        &self,
        name: &str,
        data: &[u8],
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError> {
        (**self).upload_blob(name, data, progress).await
    }

    async fn upload_blob_from_file(
        &self,
        name: &str,
        file_path: &Path,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError> {
        (**self).upload_blob_from_file(name, file_path, progress).await
    }

    async fn download_blob(
        &self,
        name: &str,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<Vec<u8>, StorageError> {
        (**self).download_blob(name, progress).await
    }

    async fn download_blob_to_file(
        &self,
        name: &str,
        file_path: &Path,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError> {
        (**self).download_blob_to_file(name, file_path, progress).await
    }
}
