//! Local side of the container enumerator.

use std::path::{Path, PathBuf};

use reality_transfer_common::{
    lexical_normalize, relative_to_root, to_absolute, PlanEntry, TransferPlan,
};
use walkdir::WalkDir;

use crate::error::FileSystemError;

/// Options for local enumeration.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Whether to follow symlinks (false = skip them with a warning).
    pub follow_symlinks: bool,
}

impl PlanOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether symlinks are followed.
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }
}

/// Builds upload plans from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalPlanner {
    options: PlanOptions,
}

impl LocalPlanner {
    /// Create a planner with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set plan options.
    pub fn with_options(mut self, options: PlanOptions) -> Self {
        self.options = options;
        self
    }

    /// Enumerate `root` into a transfer plan.
    ///
    /// Directories are walked depth-first with entries sorted by name at
    /// each level, so an unmodified tree always yields the same plan. A lone
    /// file becomes a one-entry plan named `<parent dir>/<file name>`.
    ///
    /// # Arguments
    /// * `root` - Directory or file to upload
    ///
    /// # Errors
    /// `NotFound` if `root` does not exist; IO errors while walking.
    pub fn plan(&self, root: &Path) -> Result<TransferPlan, FileSystemError> {
        let metadata: std::fs::Metadata = match std::fs::metadata(root) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FileSystemError::NotFound {
                    path: root.display().to_string(),
                });
            }
            Err(e) => {
                return Err(FileSystemError::IoError {
                    path: root.display().to_string(),
                    source: e,
                });
            }
        };

        let plan: TransferPlan = if metadata.is_file() {
            self.plan_single_file(root, metadata.len())?
        } else {
            self.walk_directory(root)?
        };

        log::debug!(
            "Planned {} files ({} bytes) under {}",
            plan.len(),
            plan.total_bytes(),
            root.display()
        );
        Ok(plan)
    }

    /// One-entry plan for a file uploaded on its own.
    fn plan_single_file(&self, file: &Path, size: u64) -> Result<TransferPlan, FileSystemError> {
        let absolute: PathBuf = lexical_normalize(&to_absolute(file)?);

        let file_name: String = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let relative_name: String = match absolute
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy())
        {
            Some(parent) => format!("{}/{}", parent, file_name),
            None => file_name,
        };

        Ok(TransferPlan::new(vec![PlanEntry::local(
            relative_name,
            size,
            file,
        )]))
    }

    /// Walk a directory and collect every regular file.
    fn walk_directory(&self, root: &Path) -> Result<TransferPlan, FileSystemError> {
        let mut entries: Vec<PlanEntry> = Vec::new();

        for entry in WalkDir::new(root)
            .follow_links(self.options.follow_symlinks)
            .sort_by_file_name()
        {
            let entry: walkdir::DirEntry = entry.map_err(|e| FileSystemError::IoError {
                path: e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                source: e.into(),
            })?;

            let path: &Path = entry.path();
            let file_type: std::fs::FileType = entry.file_type();

            if file_type.is_symlink() {
                log::warn!("Skipping symlink {}", path.display());
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let size: u64 = entry
                .metadata()
                .map_err(|e| FileSystemError::IoError {
                    path: path.display().to_string(),
                    source: e.into(),
                })?
                .len();
            let relative_name: String = relative_to_root(path, root)?;

            entries.push(PlanEntry::local(relative_name, size, path));
        }

        Ok(TransferPlan::new(entries))
    }
}

/// Enumerate `root` with default options.
///
/// See [`LocalPlanner::plan`].
pub fn plan_local_upload(root: impl AsRef<Path>) -> Result<TransferPlan, FileSystemError> {
    LocalPlanner::new().plan(root.as_ref())
}
