//! In-process container, for tests and offline tooling.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use reality_transfer_common::ProgressCallback;

use crate::error::StorageError;
use crate::traits::{BlobInfo, BlobProgress, ContainerClient};

/// Default chunk size used to report progress.
pub const DEFAULT_MEMORY_CHUNK_SIZE: usize = 64 * 1024;

/// An operation started against a [`MemoryContainer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobOperation {
    List(String),
    Upload(String),
    Download(String),
}

impl BlobOperation {
    /// Blob name (or prefix for listings).
    pub fn name(&self) -> &str {
        match self {
            BlobOperation::List(name)
            | BlobOperation::Upload(name)
            | BlobOperation::Download(name) => name,
        }
    }
}

/// Blob container held in memory.
///
/// Records every operation it starts, reports progress in fixed chunks and
/// can be told to fail specific blobs.
#[derive(Debug)]
pub struct MemoryContainer {
    name: String,
    chunk_size: usize,
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
    operations: Mutex<Vec<BlobOperation>>,
    failures: Mutex<HashMap<String, StorageError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryContainer {
    /// Create an empty container.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunk_size: DEFAULT_MEMORY_CHUNK_SIZE,
            blobs: Mutex::new(BTreeMap::new()),
            operations: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Set the chunk size progress is reported at.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Store a blob directly, without recording an operation.
    pub fn insert(&self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        lock(&self.blobs).insert(name.into(), data.into());
    }

    /// Content of a blob.
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        lock(&self.blobs).get(name).cloned()
    }

    /// Names of all stored blobs, sorted.
    pub fn blob_names(&self) -> Vec<String> {
        lock(&self.blobs).keys().cloned().collect()
    }

    /// Operations started so far, in order.
    pub fn operations(&self) -> Vec<BlobOperation> {
        lock(&self.operations).clone()
    }

    /// Make every later upload or download of `name` fail with `error`.
    pub fn fail_on(&self, name: impl Into<String>, error: StorageError) {
        lock(&self.failures).insert(name.into(), error);
    }

    fn record(&self, operation: BlobOperation) -> Result<(), StorageError> {
        let name: String = operation.name().to_string();
        lock(&self.operations).push(operation);
        match lock(&self.failures).get(&name) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// Walk `data` chunk by chunk, reporting each boundary.
    fn report_chunks(
        &self,
        data: &[u8],
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError> {
        let Some(callback) = progress else {
            return Ok(());
        };
        let total_bytes: u64 = data.len() as u64;
        let mut bytes_transferred: u64 = 0;

        for chunk in data.chunks(self.chunk_size) {
            bytes_transferred += chunk.len() as u64;
            let update = BlobProgress {
                bytes_transferred,
                total_bytes,
            };
            if !callback.on_progress(&update) {
                return Err(StorageError::Cancelled);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContainerClient for MemoryContainer {
    fn container_name(&self) -> &str {
        &self.name
    }

    async fn list_blobs(&self, prefix: &str) -> Result<Vec<BlobInfo>, StorageError> {
        self.record(BlobOperation::List(prefix.to_string()))?;
        Ok(lock(&self.blobs)
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, data)| BlobInfo::new(name.clone(), data.len() as u64))
            .collect())
    }

    async fn upload_blob(
        &self,
        name: &str,
        data: &[u8],
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError> {
        self.record(BlobOperation::Upload(name.to_string()))?;
        self.report_chunks(data, progress)?;
        self.insert(name, data);
        Ok(())
    }

    async fn upload_blob_from_file(
        &self,
        name: &str,
        file_path: &Path,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError> {
        self.record(BlobOperation::Upload(name.to_string()))?;
        let data: Vec<u8> = tokio::fs::read(file_path)
            .await
            .map_err(|e| StorageError::io(file_path, e))?;
        self.report_chunks(&data, progress)?;
        self.insert(name, data);
        Ok(())
    }

    async fn download_blob(
        &self,
        name: &str,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<Vec<u8>, StorageError> {
        self.record(BlobOperation::Download(name.to_string()))?;
        let data: Vec<u8> = self.get(name).ok_or_else(|| StorageError::NotFound {
            container: self.name.clone(),
            name: name.to_string(),
        })?;
        self.report_chunks(&data, progress)?;
        Ok(data)
    }

    async fn download_blob_to_file(
        &self,
        name: &str,
        file_path: &Path,
        progress: Option<&dyn ProgressCallback<BlobProgress>>,
    ) -> Result<(), StorageError> {
        let data: Vec<u8> = self.download_blob(name, progress).await?;
        tokio::fs::write(file_path, &data)
            .await
            .map_err(|e| StorageError::io(file_path, e))
    }
}
