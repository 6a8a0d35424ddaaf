//! Download orchestration.
//!
//! Blobs of a plan are downloaded one after the other to
//! `destination/relative_name`. Scene and orientation documents are fetched
//! to memory and rewritten so their references point at local datasets;
//! only the rewritten document is written, so a scene that fails to
//! resolve never reaches the disk.
//!
//! # Example
//!
//! ```ignore
//! use reality_transfer_storage::{plan_cloud_download, DownloadOrchestrator, TransferSession};
//!
//! let plan = plan_cloud_download(&container, "").await?;
//! let outcome = DownloadOrchestrator::new(&container)
//!     .with_options(DownloadOptions::new().with_dataset_type(DatasetType::CCOrientations))
//!     .with_reference_table(&table)
//!     .download(&plan, "/data/orientations".as_ref(), &TransferSession::new())
//!     .await;
//! ```

use std::path::{Path, PathBuf};

use reality_transfer_common::{from_posix_path, is_within_root, DatasetType, PlanEntry, TransferPlan};
use reality_transfer_scene::{
    ReferenceTable, RewriteDirection, RewriteOptions, SceneDialect, SceneReferenceRewriter,
};

use crate::error::{StorageError, TransferError};
use crate::session::{EntryProgress, SessionState, TransferSession};
use crate::traits::ContainerClient;
use crate::types::{ConflictResolution, OperationType, TransferOutcome, TransferReport};

/// Options for download operations.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Type of the dataset; decides which files are scene documents.
    pub dataset_type: Option<DatasetType>,
    /// Options for rewriting scene documents.
    pub rewrite: RewriteOptions,
    /// How to handle files that already exist.
    pub conflict_resolution: ConflictResolution,
    /// Verify downloaded file size matches the plan (not for rewritten scenes).
    pub verify_size: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            dataset_type: None,
            rewrite: RewriteOptions::default(),
            conflict_resolution: ConflictResolution::default(),
            verify_size: true,
        }
    }
}

impl DownloadOptions {
    /// Create options with all verification enabled (default).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create options with no post-download verification.
    pub fn no_verification() -> Self {
        Self {
            verify_size: false,
            ..Default::default()
        }
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

    /// Set how existing files are handled.
    pub fn with_conflict_resolution(mut self, conflict_resolution: ConflictResolution) -> Self {
        self.conflict_resolution = conflict_resolution;
        self
    }
}

/// Whether a plan entry was written or left alone.
enum EntryResult {
    Downloaded,
    Skipped,
}

/// High-level download operations using any ContainerClient implementation.
pub struct DownloadOrchestrator<'a, C: ContainerClient + ?Sized> {
    /// Source container.
    client: &'a C,
    /// Table used to rewrite scene documents; none means write verbatim.
    table: Option<&'a ReferenceTable>,
    /// Download options.
    options: DownloadOptions,
}

impl<'a, C: ContainerClient + ?Sized> DownloadOrchestrator<'a, C> {
    /// Create a new download orchestrator.
    ///
    /// # Arguments
    /// * `client` - Source container
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            table: None,
            options: DownloadOptions::default(),
        }
    }

    /// Set download options.
    pub fn with_options(mut self, options: DownloadOptions) -> Self {
        self.options = options;
        self
    }

    /// Rewrite scene documents against `table` before writing them.
    pub fn with_reference_table(mut self, table: &'a ReferenceTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Download every blob of `plan` under `destination`.
    ///
    /// # Arguments
    /// * `plan` - Blobs to download, from `plan_cloud_download`
    /// * `destination` - Local root directory, created as needed
    /// * `session` - Fresh session carrying cancellation and progress
    ///
    /// # Returns
    /// `Completed` with the report, `Cancelled` when the session was
    /// cancelled, or `Failed` naming the first file that failed. Files
    /// written before a failure stay on disk.
    pub async fn download(
        &self,
        plan: &TransferPlan,
        destination: &Path,
        session: &TransferSession,
    ) -> TransferOutcome<TransferReport> {
        if let Err(error) = session.begin(OperationType::Downloading, plan) {
            return TransferOutcome::Failed {
                error,
                report: TransferReport::default(),
            };
        }
        log::info!(
            "Downloading {} files ({} bytes) from {} to {}",
            plan.len(),
            plan.total_bytes(),
            self.client.container_name(),
            destination.display()
        );
        if self.table.is_none()
            && self
                .options
                .dataset_type
                .as_ref()
                .is_some_and(DatasetType::carries_references)
        {
            log::warn!("No reference table set; scene documents are written verbatim");
        }

        let mut transferred: Vec<String> = Vec::with_capacity(plan.len());
        let mut skipped: Vec<String> = Vec::new();
        for entry in plan {
            if session.is_cancelled() {
                log::info!("Download cancelled after {} files", transferred.len());
                let report = session.finish(SessionState::Cancelled, transferred, skipped);
                return TransferOutcome::Cancelled(report);
            }

            match self.download_entry(entry, destination, session).await {
                Ok(EntryResult::Downloaded) => transferred.push(entry.relative_name.clone()),
                Ok(EntryResult::Skipped) => skipped.push(entry.relative_name.clone()),
                Err(error) if error.is_cancellation() => {
                    log::info!("Download cancelled during {}", entry.relative_name);
                    let report = session.finish(SessionState::Cancelled, transferred, skipped);
                    return TransferOutcome::Cancelled(report);
                }
                Err(error) => {
                    log::warn!("Download stopped: {}", error);
                    let report = session.finish(SessionState::Failed, transferred, skipped);
                    return TransferOutcome::Failed { error, report };
                }
            }

            session.complete_file(entry);
        }

        log::info!(
            "Downloaded {} files ({} skipped) to {}",
            transferred.len(),
            skipped.len(),
            destination.display()
        );
        TransferOutcome::Completed(session.finish(SessionState::Completed, transferred, skipped))
    }

    /// Download a single entry, rewriting it if it is a scene document.
    async fn download_entry(
        &self,
        entry: &PlanEntry,
        destination: &Path,
        session: &TransferSession,
    ) -> Result<EntryResult, TransferError> {
        let name: &str = &entry.relative_name;
        let local_path: PathBuf = from_posix_path(name, destination);
        if !is_within_root(&local_path, destination) {
            return Err(TransferError::transfer(
                name,
                StorageError::IoError {
                    path: local_path.display().to_string(),
                    message: "blob name escapes the destination directory".to_string(),
                },
            ));
        }

        // Handle conflict resolution
        let final_path: PathBuf = if local_path.exists() {
            match self.options.conflict_resolution {
                ConflictResolution::Skip => {
                    log::debug!("Skipping existing {}", local_path.display());
                    return Ok(EntryResult::Skipped);
                }
                ConflictResolution::Overwrite => local_path,
                ConflictResolution::CreateCopy => generate_unique_copy_path(&local_path)
                    .map_err(|e| TransferError::transfer(name, e))?,
            }
        } else {
            local_path
        };

        if let Some(parent) = final_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TransferError::transfer(name, StorageError::io(parent, e)))?;
        }

        let progress = EntryProgress::new(session, entry);
        match self.scene_candidate(name) {
            Some((typed, table)) => {
                let document: Vec<u8> = self
                    .client
                    .download_blob(name, Some(&progress))
                    .await
                    .map_err(|e| TransferError::transfer(name, e))?;
                let dialect: Option<SceneDialect> =
                    typed.or_else(|| SceneDialect::from_file_name(name, &document));
                let body: Vec<u8> = match dialect {
                    Some(dialect) => {
                        log::debug!("Writing rewritten {} ({})", name, dialect);
                        SceneReferenceRewriter::new()
                            .with_options(self.options.rewrite.clone())
                            .rewrite(&document, dialect, table, RewriteDirection::CloudToLocal)
                            .map_err(|e| TransferError::rewrite(name, e))?
                    }
                    None => {
                        let actual: u64 = document.len() as u64;
                        if self.options.verify_size && actual != entry.byte_size {
                            return Err(TransferError::transfer(
                                name,
                                StorageError::SizeMismatch {
                                    name: final_path.display().to_string(),
                                    expected: entry.byte_size,
                                    actual,
                                },
                            ));
                        }
                        document
                    }
                };

                tokio::fs::write(&final_path, &body)
                    .await
                    .map_err(|e| TransferError::transfer(name, StorageError::io(&final_path, e)))?;
            }
            None => {
                log::debug!("Downloading {} ({} bytes)", name, entry.byte_size);
                self.client
                    .download_blob_to_file(name, &final_path, Some(&progress))
                    .await
                    .map_err(|e| TransferError::transfer(name, e))?;

                if self.options.verify_size {
                    verify_file_size(&final_path, entry.byte_size)
                        .map_err(|e| TransferError::transfer(name, e))?;
                }
            }
        }

        Ok(EntryResult::Downloaded)
    }

    /// Blobs that may need rewriting; see `UploadOrchestrator`.
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

/// Verify downloaded file size.
///
/// # Arguments
/// * `path` - Path to the downloaded file
/// * `expected_size` - Expected file size in bytes
///
/// # Errors
/// Returns `StorageError::SizeMismatch` if sizes don't match.
pub fn verify_file_size(path: &Path, expected_size: u64) -> Result<(), StorageError> {
    let actual_size: u64 = std::fs::metadata(path)
        .map_err(|e| StorageError::io(path, e))?
        .len();

    if actual_size != expected_size {
        return Err(StorageError::SizeMismatch {
            name: path.display().to_string(),
            expected: expected_size,
            actual: actual_size,
        });
    }

    Ok(())
}

/// Generate a unique file path for conflict resolution.
///
/// Tries "file (1).ext", "file (2).ext", etc. until finding
/// a path that doesn't exist.
pub fn generate_unique_copy_path(original: &Path) -> Result<PathBuf, StorageError> {
    let stem: &str = original
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let extension: String = original
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();
    let parent: &Path = original.parent().unwrap_or(Path::new(""));

    for counter in 1..=10_000u32 {
        let candidate: PathBuf = parent.join(format!("{} ({}){}", stem, counter, extension));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(StorageError::IoError {
        path: original.display().to_string(),
        message: "Too many file conflicts".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryContainer;
    use crate::plan::plan_cloud_download;
    use reality_transfer_common::PlanEntry;
    use tempfile::TempDir;

    const ORIENTATIONS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<BlocksExchange version="3.2">
  <Block>
    <Photogroups>
      <Photogroup>
        <Photo>
          <Id>0</Id>
          <ImagePath>cloud-abc/IMG_0001.jpg</ImagePath>
          <MaskPath>cloud-abc/masks/IMG_0001.png</MaskPath>
        </Photo>
      </Photogroup>
    </Photogroups>
  </Block>
</BlocksExchange>
"#;

    fn container() -> MemoryContainer {
        let container = MemoryContainer::new("orientations");
        container.insert("Orientations.xml", ORIENTATIONS);
        container.insert("notes/readme.txt", "calibrated");
        container
    }

    #[tokio::test]
    async fn test_download_rewrites_orientations() {
        let dest: TempDir = TempDir::new().unwrap();
        let container = container();
        let plan = plan_cloud_download(&container, "").await.unwrap();
        let mut table = ReferenceTable::new();
        table.add_reference("/data/images", "cloud-abc");

        let outcome = DownloadOrchestrator::new(&container)
            .with_options(DownloadOptions::new().with_dataset_type(DatasetType::CCOrientations))
            .with_reference_table(&table)
            .download(&plan, dest.path(), &TransferSession::new())
            .await;

        let report = outcome.completed().unwrap();
        assert_eq!(report.transferred.len(), 2);

        let written = std::fs::read_to_string(dest.path().join("Orientations.xml")).unwrap();
        assert!(written.contains("<ImagePath>/data/images/IMG_0001.jpg</ImagePath>"));
        assert!(written.contains("<MaskPath>/data/images/masks/IMG_0001.png</MaskPath>"));
        assert_eq!(
            std::fs::read_to_string(dest.path().join("notes/readme.txt")).unwrap(),
            "calibrated"
        );
    }

    #[tokio::test]
    async fn test_download_conflict_skip() {
        let dest: TempDir = TempDir::new().unwrap();
        std::fs::create_dir_all(dest.path().join("notes")).unwrap();
        std::fs::write(dest.path().join("notes/readme.txt"), "local").unwrap();

        let container = container();
        let plan = TransferPlan::new(vec![PlanEntry::new("notes/readme.txt", 10)]);
        let session = TransferSession::new();
        let outcome = DownloadOrchestrator::new(&container)
            .with_options(DownloadOptions::new().with_conflict_resolution(ConflictResolution::Skip))
            .download(&plan, dest.path(), &session)
            .await;

        let report = outcome.completed().unwrap();
        assert_eq!(report.skipped, vec!["notes/readme.txt"]);
        assert_eq!(report.processed_bytes, 10);
        assert_eq!(
            std::fs::read_to_string(dest.path().join("notes/readme.txt")).unwrap(),
            "local"
        );
        assert!(container.operations().is_empty());
    }

    #[tokio::test]
    async fn test_download_conflict_create_copy() {
        let dest: TempDir = TempDir::new().unwrap();
        std::fs::create_dir_all(dest.path().join("notes")).unwrap();
        std::fs::write(dest.path().join("notes/readme.txt"), "local").unwrap();

        let container = container();
        let plan = TransferPlan::new(vec![PlanEntry::new("notes/readme.txt", 10)]);
        let outcome = DownloadOrchestrator::new(&container)
            .with_options(
                DownloadOptions::new().with_conflict_resolution(ConflictResolution::CreateCopy),
            )
            .download(&plan, dest.path(), &TransferSession::new())
            .await;

        assert!(outcome.is_completed());
        assert_eq!(
            std::fs::read_to_string(dest.path().join("notes/readme (1).txt")).unwrap(),
            "calibrated"
        );
    }

    #[tokio::test]
    async fn test_download_size_mismatch() {
        let dest: TempDir = TempDir::new().unwrap();
        let container = container();
        let plan = TransferPlan::new(vec![PlanEntry::new("notes/readme.txt", 99)]);

        let outcome = DownloadOrchestrator::new(&container)
            .download(&plan, dest.path(), &TransferSession::new())
            .await;

        assert!(matches!(
            outcome.error(),
            Some(TransferError::Transfer {
                source: StorageError::SizeMismatch { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_download_keeps_plain_json_byte_identical() {
        let dest: TempDir = TempDir::new().unwrap();
        let container = MemoryContainer::new("dataset");
        container.insert("metadata.json", "[1,2,3]");
        container.insert("scene/thumbs.json", "{\"a\":1}");
        let plan = plan_cloud_download(&container, "").await.unwrap();
        let table = ReferenceTable::new();

        let outcome = DownloadOrchestrator::new(&container)
            .with_reference_table(&table)
            .download(&plan, dest.path(), &TransferSession::new())
            .await;

        assert!(outcome.is_completed());
        assert_eq!(
            std::fs::read(dest.path().join("metadata.json")).unwrap(),
            b"[1,2,3]"
        );
        assert_eq!(
            std::fs::read(dest.path().join("scene/thumbs.json")).unwrap(),
            b"{\"a\":1}"
        );
    }

    #[tokio::test]
    async fn test_download_size_mismatch_on_sniffed_document() {
        let dest: TempDir = TempDir::new().unwrap();
        let container = MemoryContainer::new("dataset");
        container.insert("metadata.json", "[1,2,3]");
        let plan = TransferPlan::new(vec![PlanEntry::new("metadata.json", 3)]);
        let table = ReferenceTable::new();

        let outcome = DownloadOrchestrator::new(&container)
            .with_reference_table(&table)
            .download(&plan, dest.path(), &TransferSession::new())
            .await;

        assert!(matches!(
            outcome.error(),
            Some(TransferError::Transfer {
                source: StorageError::SizeMismatch {
                    expected: 3,
                    actual: 7,
                    ..
                },
                ..
            })
        ));
        assert!(!dest.path().join("metadata.json").exists());
    }

    #[tokio::test]
    async fn test_download_rejects_escaping_names() {
        let dest: TempDir = TempDir::new().unwrap();
        let container = container();
        container.insert("../evil.txt", "x");
        let plan = TransferPlan::new(vec![PlanEntry::new("../evil.txt", 1)]);

        let outcome = DownloadOrchestrator::new(&container)
            .download(&plan, dest.path(), &TransferSession::new())
            .await;

        assert_eq!(outcome.error().and_then(|e| e.file()), Some("../evil.txt"));
        assert!(container.operations().is_empty());
    }

    #[test]
    fn test_generate_unique_copy_path() {
        let temp_dir: TempDir = TempDir::new().unwrap();
        let original: PathBuf = temp_dir.path().join("test.txt");

        let result: PathBuf = generate_unique_copy_path(&original).unwrap();
        assert_eq!(result.file_name().unwrap().to_str().unwrap(), "test (1).txt");

        std::fs::write(&result, "content").unwrap();
        let result2: PathBuf = generate_unique_copy_path(&original).unwrap();
        assert_eq!(result2.file_name().unwrap().to_str().unwrap(), "test (2).txt");
    }

    #[test]
    fn test_generate_unique_copy_path_no_extension() {
        let temp_dir: TempDir = TempDir::new().unwrap();
        let original: PathBuf = temp_dir.path().join("README");

        let result: PathBuf = generate_unique_copy_path(&original).unwrap();
        assert_eq!(result.file_name().unwrap().to_str().unwrap(), "README (1)");
    }

    #[test]
    fn test_verify_file_size() {
        let temp_dir: TempDir = TempDir::new().unwrap();
        let file_path: PathBuf = temp_dir.path().join("test.txt");
        std::fs::write(&file_path, "hello").unwrap();

        assert!(verify_file_size(&file_path, 5).is_ok());
        let result = verify_file_size(&file_path, 10);
        assert!(matches!(result, Err(StorageError::SizeMismatch { .. })));
    }

    #[test]
    fn test_download_options_default() {
        let options = DownloadOptions::default();
        assert!(options.verify_size);
        assert_eq!(options.conflict_resolution, ConflictResolution::Overwrite);
        assert!(options.dataset_type.is_none());
        assert!(!DownloadOptions::no_verification().verify_size);
    }
}
