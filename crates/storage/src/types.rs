//! Shared data structures for transfer sessions.

use crate::error::TransferError;

/// Type of operation in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationType {
    #[default]
    Uploading,
    Downloading,
}

/// Progress update for a transfer session.
///
/// `processed_bytes` only moves forward and never exceeds `total_bytes`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    /// Current operation type.
    pub operation: OperationType,
    /// Relative name of the file being moved.
    pub current_name: String,
    /// Planned bytes accounted for so far.
    pub processed_bytes: u64,
    /// Sum of the planned sizes.
    pub total_bytes: u64,
    /// `processed_bytes / total_bytes` as a percentage.
    pub current_percentage: f64,
    /// Files fully transferred.
    pub files_completed: u64,
    /// Files in the plan.
    pub files_total: u64,
}

/// What a session got done, whatever its outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Relative names of files that were transferred, in order.
    pub transferred: Vec<String>,
    /// Relative names of files left alone (existing local files).
    pub skipped: Vec<String>,
    /// Planned bytes accounted for when the session ended.
    pub processed_bytes: u64,
    /// Sum of the planned sizes.
    pub total_bytes: u64,
}

impl TransferReport {
    /// Files completed, transferred or skipped.
    pub fn files_processed(&self) -> usize {
        self.transferred.len() + self.skipped.len()
    }
}

/// Result of a transfer session.
///
/// Cancellation is an outcome, not an error: the report says how far the
/// session got before it stopped.
#[derive(Debug)]
pub enum TransferOutcome<T> {
    /// Every file was transferred.
    Completed(T),
    /// The session stopped after a cancellation request.
    Cancelled(TransferReport),
    /// A file failed; files before it stay transferred.
    Failed {
        error: TransferError,
        report: TransferReport,
    },
}

impl<T> TransferOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, TransferOutcome::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferOutcome::Cancelled(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TransferOutcome::Failed { .. })
    }

    /// Value of a completed session.
    pub fn completed(&self) -> Option<&T> {
        match self {
            TransferOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    /// Error of a failed session.
    pub fn error(&self) -> Option<&TransferError> {
        match self {
            TransferOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Map the value of a completed session.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TransferOutcome<U> {
        match self {
            TransferOutcome::Completed(value) => TransferOutcome::Completed(f(value)),
            TransferOutcome::Cancelled(report) => TransferOutcome::Cancelled(report),
            TransferOutcome::Failed { error, report } => TransferOutcome::Failed { error, report },
        }
    }
}

/// How to handle files that already exist when downloading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictResolution {
    /// Skip files that already exist locally.
    Skip,
    /// Overwrite existing files.
    #[default]
    Overwrite,
    /// Create copy with suffix: "file (1).ext".
    CreateCopy,
}
