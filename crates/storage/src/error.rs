//! Error types for storage and transfer operations.

use reality_transfer_filesystem::FileSystemError;
use reality_transfer_scene::RewriteError;
use thiserror::Error;

use crate::session::SessionState;

/// Errors raised by container clients and dataset services.
#[derive(Error, Debug, Clone)]
pub enum StorageError {
    /// Blob (or prefix) not found in the container.
    #[error("Blob not found: {container}/{name}")]
    NotFound { container: String, name: String },

    /// Access denied, usually an expired or read-only SAS token.
    #[error("Access denied to {container}/{name}: {message}")]
    AccessDenied {
        container: String,
        name: String,
        message: String,
    },

    /// Size mismatch (corruption or incomplete download).
    #[error("Size mismatch for {name}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// Network error.
    #[error("Network error: {message}")]
    NetworkError { message: String, retryable: bool },

    /// Local I/O error.
    #[error("I/O error for {path}: {message}")]
    IoError { path: String, message: String },

    /// Operation cancelled through a progress callback.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl StorageError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::NetworkError { retryable, .. } => *retryable,
            StorageError::NotFound { .. } => false,
            StorageError::AccessDenied { .. } => false,
            StorageError::SizeMismatch { .. } => false,
            StorageError::IoError { .. } => false,
            StorageError::Cancelled => false,
            StorageError::InvalidConfig { .. } => false,
            StorageError::Other { .. } => false,
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl AsRef<std::path::Path>, err: std::io::Error) -> Self {
        StorageError::IoError {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::IoError {
            path: String::new(),
            message: err.to_string(),
        }
    }
}

/// Fatal error of a transfer session.
///
/// Every variant raised while moving files names the file that failed.
#[derive(Error, Debug)]
pub enum TransferError {
    /// Local enumeration failed (missing root, unreadable directory).
    #[error("Failed to plan transfer: {0}")]
    Plan(#[from] FileSystemError),

    /// Listing the source container failed (missing prefix, access denied).
    #[error("Failed to list blobs under '{prefix}': {source}")]
    Listing {
        prefix: String,
        #[source]
        source: StorageError,
    },

    /// Moving one file failed.
    #[error("Transfer of {file} failed: {source}")]
    Transfer {
        file: String,
        #[source]
        source: StorageError,
    },

    /// A scene document could not be rewritten.
    #[error("Reference rewrite of {file} failed: {source}")]
    Rewrite {
        file: String,
        #[source]
        source: RewriteError,
    },

    /// The dataset service rejected a lifecycle call.
    #[error("Dataset service failed to {operation}: {source}")]
    Dataset {
        operation: &'static str,
        #[source]
        source: StorageError,
    },

    /// Sessions run exactly once.
    #[error("Session already {state:?}, start a new session")]
    SessionReused { state: SessionState },
}

impl TransferError {
    /// Error for a file whose transfer failed.
    pub fn transfer(file: impl Into<String>, source: StorageError) -> Self {
        TransferError::Transfer {
            file: file.into(),
            source,
        }
    }

    /// Error for a scene document whose rewrite failed.
    pub fn rewrite(file: impl Into<String>, source: RewriteError) -> Self {
        TransferError::Rewrite {
            file: file.into(),
            source,
        }
    }

    /// The file that failed, when the error is tied to one.
    pub fn file(&self) -> Option<&str> {
        match self {
            TransferError::Transfer { file, .. } | TransferError::Rewrite { file, .. } => {
                Some(file)
            }
            _ => None,
        }
    }

    /// Whether the session root or listing prefix does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TransferError::Plan(FileSystemError::NotFound { .. })
                | TransferError::Listing {
                    source: StorageError::NotFound { .. },
                    ..
                }
        )
    }

    /// Whether a transport aborted because cancellation was requested.
    pub(crate) fn is_cancellation(&self) -> bool {
        matches!(
            self,
            TransferError::Transfer {
                source: StorageError::Cancelled,
                ..
            }
        )
    }
}
