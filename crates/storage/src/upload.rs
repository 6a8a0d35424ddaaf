//! Upload orchestration.
//!
//! Files of a plan are uploaded one after the other. Scene and orientation
//! documents are rewritten so their references point at cloud datasets,
//! and only the rewritten bytes leave the machine; every other file is
//! streamed from disk as is.
//!
//! # Example
//!
//! ```ignore
//! use reality_transfer_storage::{TransferSession, UploadOptions, UploadOrchestrator};
//!
//! let session = TransferSession::new().with_progress(progress_fn(|p| {
//!     println!("{:.1}%", p.current_percentage);
//!     true
//! }));
//! let outcome = UploadOrchestrator::new(&container)
//!     .with_options(UploadOptions::new().with_dataset_type(DatasetType::ContextScene))
//!     .with_reference_table(&table)
//!     .upload(&plan, root, &session)
//!     .await;
//! ```

use std::path::{Path, PathBuf};

use reality_transfer_common::{from_posix_path, DatasetType, PlanEntry, TransferPlan};
use reality_transfer_scene::{
    ReferenceTable, RewriteDirection, RewriteOptions, SceneDialect, SceneReferenceRewriter,
};

use crate::error::{StorageError, TransferError};
use crate::session::{EntryProgress, SessionState, TransferSession};
use crate::types::{OperationType, TransferOutcome, TransferReport};
use crate::traits::ContainerClient;

/// Options for upload operations.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Type of the dataset; decides which files are scene documents.
    pub dataset_type: Option<DatasetType>,
    /// Options for rewriting scene documents.
    pub rewrite: RewriteOptions,
}

impl UploadOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dataset type.
    pub fn with_dataset_type(mut self, dataset_type: DatasetType) -> Self {
        self.dataset_type = Some(dataset_type);
        self
    }

    /// Set scene rewrite options.
    pub fn with_rewrite_options(mut self, rewrite: RewriteOptions) -> Self {
        self.rewrite = rewrite;
        self
    }
}

/// High-level upload operations using any ContainerClient implementation.
pub struct UploadOrchestrator<'a, C: ContainerClient + ?Sized> {
    /// Destination container.
    client: &'a C,
    /// Table used to rewrite scene documents; none means upload verbatim.
    table: Option<&'a ReferenceTable>,
    /// Upload options.
    options: UploadOptions,
}

impl<'a, C: ContainerClient + ?Sized> UploadOrchestrator<'a, C> {
    /// Create a new upload orchestrator.
    ///
    /// # Arguments
    /// * `client` - Destination container
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            table: None,
            options: UploadOptions::default(),
        }
    }

    /// Set upload options.
    pub fn with_options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    /// Rewrite scene documents against `table` before uploading them.
    pub fn with_reference_table(mut self, table: &'a ReferenceTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Upload every file of `plan` under its relative name.
    ///
    /// # Arguments
    /// * `plan` - Files to upload, from `plan_local_upload`
    /// * `root` - Local root the plan was built from
    /// * `session` - Fresh session carrying cancellation and progress
    ///
    /// # Returns
    /// `Completed` with the report, `Cancelled` when the session was
    /// cancelled, or `Failed` naming the first file that failed. Files
    /// uploaded before a failure stay in the container.
    pub async fn upload(
        &self,
        plan: &TransferPlan,
        root: &Path,
        session: &TransferSession,
    ) -> TransferOutcome<TransferReport> {
        if let Err(error) = session.begin(OperationType::Uploading, plan) {
            return TransferOutcome::Failed {
                error,
                report: TransferReport::default(),
            };
        }
        log::info!(
            "Uploading {} files ({} bytes) to {}",
            plan.len(),
            plan.total_bytes(),
            self.client.container_name()
        );
        if self.table.is_none()
            && self
                .options
                .dataset_type
                .as_ref()
                .is_some_and(DatasetType::carries_references)
        {
            log::warn!("No reference table set; scene documents are uploaded verbatim");
        }

        let mut transferred: Vec<String> = Vec::with_capacity(plan.len());
        for entry in plan {
            if session.is_cancelled() {
                return cancelled(session, transferred);
            }

            match self.upload_entry(entry, root, session).await {
                Ok(()) => {}
                Err(error) if error.is_cancellation() => return cancelled(session, transferred),
                Err(error) => {
                    log::warn!("Upload stopped: {}", error);
                    let report = session.finish(SessionState::Failed, transferred, Vec::new());
                    return TransferOutcome::Failed { error, report };
                }
            }

            transferred.push(entry.relative_name.clone());
            session.complete_file(entry);
        }

        log::info!(
            "Uploaded {} files to {}",
            transferred.len(),
            self.client.container_name()
        );
        TransferOutcome::Completed(session.finish(SessionState::Completed, transferred, Vec::new()))
    }

    /// Upload one file, rewriting it first if it is a scene document.
    async fn upload_entry(
        &self,
        entry: &PlanEntry,
        root: &Path,
        session: &TransferSession,
    ) -> Result<(), TransferError> {
        let source: PathBuf = entry
            .local_path
            .clone()
            .unwrap_or_else(|| from_posix_path(&entry.relative_name, root));
        let progress = EntryProgress::new(session, entry);
        let name: &str = &entry.relative_name;

        match self.scene_candidate(name) {
            Some((typed, table)) => {
                let document: Vec<u8> = tokio::fs::read(&source)
                    .await
                    .map_err(|e| TransferError::transfer(name, StorageError::io(&source, e)))?;
                let dialect: Option<SceneDialect> =
                    typed.or_else(|| SceneDialect::from_file_name(name, &document));
                let body: Vec<u8> = match dialect {
                    Some(dialect) => {
                        log::debug!("Uploading rewritten {} ({})", name, dialect);
                        SceneReferenceRewriter::new()
                            .with_options(self.options.rewrite.clone())
                            .rewrite(&document, dialect, table, RewriteDirection::LocalToCloud)
                            .map_err(|e| TransferError::rewrite(name, e))?
                    }
                    None => document,
                };

                self.client
                    .upload_blob(name, &body, Some(&progress))
                    .await
                    .map_err(|e| TransferError::transfer(name, e))
            }
            None => {
                log::debug!("Uploading {} ({} bytes)", name, entry.byte_size);
                self.client
                    .upload_blob_from_file(name, &source, Some(&progress))
                    .await
                    .map_err(|e| TransferError::transfer(name, e))
            }
        }
    }

    /// Files that may need rewriting, with their dialect when the dataset
    /// type already decides it. Untyped XML and JSON files are sniffed once
    /// read.
    fn scene_candidate(&self, name: &str) -> Option<(Option<SceneDialect>, &'a ReferenceTable)> {
        let table: &'a ReferenceTable = self.table?;
        match &self.options.dataset_type {
            Some(dataset_type) => {
                SceneDialect::detect(dataset_type, name).map(|d| (Some(d), table))
            }
            None => SceneDialect::is_candidate(name).then_some((None, table)),
        }
    }
}

fn cancelled(session: &TransferSession, transferred: Vec<String>) -> TransferOutcome<TransferReport> {
    log::info!("Upload cancelled after {} files", transferred.len());
    TransferOutcome::Cancelled(session.finish(SessionState::Cancelled, transferred, Vec::new()))
}
