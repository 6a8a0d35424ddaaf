//! Dataset-level transfers: plan, create or open the dataset, move the
//! files, and record the new local/cloud pair in the reference table.

use std::path::{Path, PathBuf};

use reality_transfer_common::{DatasetType, TransferPlan};
use reality_transfer_filesystem::{LocalPlanner, PlanOptions};
use reality_transfer_scene::{ReferenceTable, SceneDialect};

use crate::dataset::{DatasetHandle, DatasetService, NewDataset};
use crate::download::{DownloadOptions, DownloadOrchestrator};
use crate::error::{StorageError, TransferError};
use crate::plan::plan_cloud_download;
use crate::session::{SessionState, TransferSession};
use crate::traits::ContainerClient;
use crate::types::{TransferOutcome, TransferReport};
use crate::upload::{UploadOptions, UploadOrchestrator};

/// Uploads and downloads whole datasets through a [`DatasetService`].
///
/// Scenes reference other datasets, so transfer the referenced datasets
/// first with the same table: each completed transfer records its pair and
/// later scenes resolve against it.
pub struct RealityDataTransfer<'s, S: DatasetService + ?Sized> {
    service: &'s S,
    plan_options: PlanOptions,
    upload_options: UploadOptions,
    download_options: DownloadOptions,
}

impl<'s, S: DatasetService + ?Sized> RealityDataTransfer<'s, S> {
    pub fn new(service: &'s S) -> Self {
        Self {
            service,
            plan_options: PlanOptions::default(),
            upload_options: UploadOptions::default(),
            download_options: DownloadOptions::default(),
        }
    }

    /// Set local enumeration options.
    pub fn with_plan_options(mut self, options: PlanOptions) -> Self {
        self.plan_options = options;
        self
    }

    /// Set upload options. The dataset type is taken from each call.
    pub fn with_upload_options(mut self, options: UploadOptions) -> Self {
        self.upload_options = options;
        self
    }

    /// Set download options. The dataset type is taken from each call.
    pub fn with_download_options(mut self, options: DownloadOptions) -> Self {
        self.download_options = options;
        self
    }

    /// Upload `local_root` as a new dataset.
    ///
    /// # Arguments
    /// * `local_root` - Directory (or single file) to upload
    /// * `display_name` - Name of the new dataset
    /// * `dataset_type` - Type of the new dataset
    /// * `itwin_id` - Project the dataset belongs to
    /// * `table` - References used to rewrite scenes; receives the dataset's
    ///   local root and its id (for a lone file, the file's directory)
    /// * `session` - Fresh session carrying cancellation and progress
    ///
    /// # Returns
    /// The new dataset id once every file is uploaded.
    pub async fn upload_dataset(
        &self,
        local_root: &Path,
        display_name: &str,
        dataset_type: DatasetType,
        itwin_id: &str,
        table: &mut ReferenceTable,
        session: &TransferSession,
    ) -> TransferOutcome<String> {
        let plan: TransferPlan = match LocalPlanner::new()
            .with_options(self.plan_options.clone())
            .plan(local_root)
        {
            Ok(plan) => plan,
            Err(e) => return failed_early(session, e.into()),
        };

        let request = NewDataset {
            display_name: display_name.to_string(),
            root_document: root_document(&plan, &dataset_type),
            dataset_type: dataset_type.clone(),
            itwin_id: itwin_id.to_string(),
        };
        let handle: DatasetHandle = match self.service.create_dataset(&request).await {
            Ok(handle) => handle,
            Err(source) => return failed_early(session, dataset_error("create the dataset", source)),
        };
        log::info!("Created dataset {} ({})", handle.id, handle.display_name);

        let container: Box<dyn ContainerClient> =
            match self.service.container_for_write(&handle.id).await {
                Ok(container) => container,
                Err(source) => {
                    return failed_early(session, dataset_error("open the dataset for writing", source))
                }
            };

        // The upload root is a file's parent when a lone file is uploaded.
        let upload_root: &Path = if local_root.is_file() {
            local_root.parent().unwrap_or(local_root)
        } else {
            local_root
        };

        let outcome: TransferOutcome<TransferReport> = UploadOrchestrator::new(&*container)
            .with_options(self.upload_options.clone().with_dataset_type(dataset_type))
            .with_reference_table(table)
            .upload(&plan, upload_root, session)
            .await;

        if outcome.is_completed() {
            table.add_reference(upload_root.to_string_lossy(), handle.id.as_str());
        }
        outcome.map(|_| handle.id)
    }

    /// Download dataset `dataset_id` into `destination`.
    ///
    /// # Arguments
    /// * `dataset_id` - Cloud id of the dataset
    /// * `destination` - Local directory, created as needed
    /// * `dataset_type` - Type of the dataset
    /// * `table` - References used to rewrite scenes; receives `(destination, id)`
    /// * `session` - Fresh session carrying cancellation and progress
    ///
    /// # Returns
    /// The destination once every file is written.
    pub async fn download_dataset(
        &self,
        dataset_id: &str,
        destination: &Path,
        dataset_type: DatasetType,
        table: &mut ReferenceTable,
        session: &TransferSession,
    ) -> TransferOutcome<PathBuf> {
        let container: Box<dyn ContainerClient> =
            match self.service.container_for_read(dataset_id).await {
                Ok(container) => container,
                Err(source) => {
                    return failed_early(session, dataset_error("open the dataset for reading", source))
                }
            };

        let plan: TransferPlan = match plan_cloud_download(&*container, "").await {
            Ok(plan) => plan,
            Err(source) => {
                return failed_early(
                    session,
                    TransferError::Listing {
                        prefix: String::new(),
                        source,
                    },
                )
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(destination).await {
            let file: String = destination.display().to_string();
            return failed_early(
                session,
                TransferError::transfer(file, StorageError::io(destination, e)),
            );
        }

        let outcome: TransferOutcome<TransferReport> = DownloadOrchestrator::new(&*container)
            .with_options(self.download_options.clone().with_dataset_type(dataset_type))
            .with_reference_table(table)
            .download(&plan, destination, session)
            .await;

        if outcome.is_completed() {
            table.add_reference(destination.to_string_lossy(), dataset_id);
        }
        outcome.map(|_| destination.to_path_buf())
    }
}

/// First scene document of the plan, if the type has any.
fn root_document(plan: &TransferPlan, dataset_type: &DatasetType) -> Option<String> {
    plan.iter()
        .find(|entry| SceneDialect::detect(dataset_type, &entry.relative_name).is_some())
        .map(|entry| entry.relative_name.clone())
}

fn dataset_error(operation: &'static str, source: StorageError) -> TransferError {
    TransferError::Dataset { operation, source }
}

/// Outcome for a session that failed before any file moved.
fn failed_early<T>(session: &TransferSession, error: TransferError) -> TransferOutcome<T> {
    log::warn!("Transfer failed before starting: {}", error);
    let report: TransferReport = if session.state() == SessionState::Planned {
        session.finish(SessionState::Failed, Vec::new(), Vec::new())
    } else {
        TransferReport::default()
    };
    TransferOutcome::Failed { error, report }
}
