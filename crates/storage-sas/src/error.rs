//! Error types for SAS container operations.

use reality_transfer_storage::StorageError;
use thiserror::Error;

/// Errors specific to the SAS container client.
#[derive(Error, Debug)]
pub enum SasError {
    /// The container URL cannot address blobs.
    #[error("Invalid container URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// The service answered with an error status.
    #[error("HTTP {status} during {operation}: {message}")]
    Status {
        operation: &'static str,
        status: u16,
        message: String,
    },

    /// The request never got an answer (connect, timeout, body).
    #[error("Request failed during {operation}: {message}")]
    Request {
        operation: &'static str,
        message: String,
        retryable: bool,
    },

    /// A List Blobs page could not be understood.
    #[error("Unexpected listing response: {0}")]
    Listing(String),

    /// Invalid settings or a blob too large for them.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Local I/O error.
    #[error("I/O error for {path}: {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The progress callback asked to stop.
    #[error("Operation cancelled")]
    Cancelled,
}

impl SasError {
    /// Map a reqwest error that happened before a status was received.
    pub(crate) fn from_request(operation: &'static str, err: reqwest::Error) -> Self {
        SasError::Request {
            operation,
            retryable: err.is_timeout() || err.is_connect() || err.is_body(),
            message: err.to_string(),
        }
    }

    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SasError::Status { status, .. } => is_transient_status(*status),
            SasError::Request { retryable, .. } => *retryable,
            SasError::InvalidUrl { .. }
            | SasError::Listing(_)
            | SasError::ConfigError(_)
            | SasError::IoError { .. }
            | SasError::Cancelled => false,
        }
    }

    /// Convert to the transport-independent error for `container`/`name`.
    pub fn into_storage_error(self, container: &str, name: &str) -> StorageError {
        let retryable: bool = self.is_retryable();
        match self {
            SasError::Status {
                status: 403,
                message,
                ..
            } => StorageError::AccessDenied {
                container: container.to_string(),
                name: name.to_string(),
                message,
            },
            SasError::Status { status: 404, .. } => StorageError::NotFound {
                container: container.to_string(),
                name: name.to_string(),
            },
            SasError::Status { .. } | SasError::Request { .. } | SasError::Listing(_) => {
                StorageError::NetworkError {
                    message: self.to_string(),
                    retryable,
                }
            }
            SasError::InvalidUrl { .. } | SasError::ConfigError(_) => {
                StorageError::InvalidConfig {
                    message: self.to_string(),
                }
            }
            SasError::IoError { path, source } => StorageError::IoError {
                path,
                message: source.to_string(),
            },
            SasError::Cancelled => StorageError::Cancelled,
        }
    }
}

/// Timeouts, throttling and server errors.
pub(crate) fn is_transient_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}
