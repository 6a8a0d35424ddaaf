//! Error types for file system operations.

use reality_transfer_common::PathError;
use thiserror::Error;

/// Errors that can occur while enumerating local files.
#[derive(Debug, Error)]
pub enum FileSystemError {
    /// The transfer root does not exist.
    #[error("Path not found: {path}")]
    NotFound {
        /// Missing path.
        path: String,
    },

    /// IO error while walking or reading metadata.
    #[error("IO error at {path}: {source}")]
    IoError {
        /// Path where the error occurred.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Path could not be expressed relative to the root.
    #[error(transparent)]
    Path(#[from] PathError),
}
