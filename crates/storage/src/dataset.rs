//! Dataset lifecycle service: creation and container access.
//!
//! The service itself (authentication, the REST API, SAS issuance) lives
//! outside this workspace. Transfers only need the calls below.

use async_trait::async_trait;
use reality_transfer_common::DatasetType;

use crate::error::StorageError;
use crate::traits::ContainerClient;

/// Request to create a cloud dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDataset {
    /// Name shown to users.
    pub display_name: String,
    /// Dataset type, e.g. `ContextScene`.
    pub dataset_type: DatasetType,
    /// Project the dataset belongs to.
    pub itwin_id: String,
    /// Relative name of the main document, when the dataset has one.
    pub root_document: Option<String>,
}

/// A created dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetHandle {
    /// Cloud id, the value recorded in reference tables.
    pub id: String,
    pub display_name: String,
    pub dataset_type: DatasetType,
}

/// Creates datasets and hands out containers to read or write them.
#[async_trait]
pub trait DatasetService: Send + Sync {
    /// Create a new, empty dataset.
    async fn create_dataset(&self, request: &NewDataset) -> Result<DatasetHandle, StorageError>;

    /// Container that accepts uploads for `dataset_id`.
    async fn container_for_write(
        &self,
        dataset_id: &str,
    ) -> Result<Box<dyn ContainerClient>, StorageError>;

    /// Container to download `dataset_id` from.
    async fn container_for_read(
        &self,
        dataset_id: &str,
    ) -> Result<Box<dyn ContainerClient>, StorageError>;
}
