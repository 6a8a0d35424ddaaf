//! Per-session transfer state: cancellation, progress accounting, lifecycle.
//!
//! A [`TransferSession`] is created by the caller, handed to one upload or
//! download, and consulted before every file and at every chunk boundary.
//! Nothing here is global, so concurrent sessions never interfere.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use reality_transfer_common::{percentage, PlanEntry, ProgressCallback, TransferPlan};

use crate::error::TransferError;
use crate::traits::BlobProgress;
use crate::types::{OperationType, TransferProgress, TransferReport};

/// Lifecycle of a session. Sessions are single-use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Planned,
    Transferring,
    Completed,
    Cancelled,
    Failed,
}

/// Cloneable cancellation flag.
///
/// Can be tripped from any task or thread; the session stops before the
/// next file or at the next chunk boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Default)]
struct Accounting {
    state: SessionState,
    operation: OperationType,
    total_bytes: u64,
    files_total: u64,
    /// Planned bytes of fully completed files.
    completed_bytes: u64,
    files_completed: u64,
    /// Highest value ever reported, so progress never goes backwards.
    reported_bytes: u64,
}

impl Accounting {
    fn snapshot(&self, current_name: &str) -> TransferProgress {
        TransferProgress {
            operation: self.operation,
            current_name: current_name.to_string(),
            processed_bytes: self.reported_bytes,
            total_bytes: self.total_bytes,
            current_percentage: percentage(self.reported_bytes, self.total_bytes),
            files_completed: self.files_completed,
            files_total: self.files_total,
        }
    }
}

/// Context of one upload or download.
pub struct TransferSession {
    cancellation: CancellationHandle,
    progress: Option<Box<dyn ProgressCallback<TransferProgress>>>,
    accounting: Mutex<Accounting>,
}

impl Default for TransferSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TransferSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferSession")
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("has_progress", &self.progress.is_some())
            .field("accounting", &*self.lock())
            .finish()
    }
}

impl TransferSession {
    /// Create a session without a progress callback.
    pub fn new() -> Self {
        Self {
            cancellation: CancellationHandle::new(),
            progress: None,
            accounting: Mutex::new(Accounting::default()),
        }
    }

    /// Report progress to `callback`; returning false from it cancels.
    pub fn with_progress(
        mut self,
        callback: impl ProgressCallback<TransferProgress> + 'static,
    ) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Share an existing cancellation flag with this session.
    pub fn with_cancellation(mut self, handle: CancellationHandle) -> Self {
        self.cancellation = handle;
        self
    }

    /// Handle that cancels this session.
    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancellation.clone()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    /// Planned bytes accounted for so far.
    pub fn processed_bytes(&self) -> u64 {
        self.lock().reported_bytes
    }

    fn lock(&self) -> MutexGuard<'_, Accounting> {
        self.accounting.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move from `Planned` to `Transferring` with the plan's totals.
    pub(crate) fn begin(
        &self,
        operation: OperationType,
        plan: &TransferPlan,
    ) -> Result<(), TransferError> {
        let mut accounting = self.lock();
        if accounting.state != SessionState::Planned {
            return Err(TransferError::SessionReused {
                state: accounting.state,
            });
        }
        accounting.state = SessionState::Transferring;
        accounting.operation = operation;
        accounting.total_bytes = plan.total_bytes();
        accounting.files_total = plan.len() as u64;
        Ok(())
    }

    /// Account for `bytes` moved so far within `entry`.
    ///
    /// Clamped to the entry's planned size. Returns false once cancellation
    /// has been requested.
    pub(crate) fn record_partial(&self, entry: &PlanEntry, bytes: u64) -> bool {
        let snapshot: TransferProgress = {
            let mut accounting = self.lock();
            let candidate: u64 = accounting.completed_bytes + bytes.min(entry.byte_size);
            accounting.reported_bytes = accounting.reported_bytes.max(candidate);
            accounting.snapshot(&entry.relative_name)
        };
        self.notify(&snapshot)
    }

    /// Account for a finished file: exactly its planned size is added.
    pub(crate) fn complete_file(&self, entry: &PlanEntry) -> bool {
        let snapshot: TransferProgress = {
            let mut accounting = self.lock();
            accounting.completed_bytes += entry.byte_size;
            accounting.files_completed += 1;
            accounting.reported_bytes = accounting.reported_bytes.max(accounting.completed_bytes);
            accounting.snapshot(&entry.relative_name)
        };
        self.notify(&snapshot)
    }

    /// Enter a terminal state and summarize the session.
    pub(crate) fn finish(
        &self,
        state: SessionState,
        transferred: Vec<String>,
        skipped: Vec<String>,
    ) -> TransferReport {
        let mut accounting = self.lock();
        accounting.state = state;
        TransferReport {
            transferred,
            skipped,
            processed_bytes: accounting.reported_bytes,
            total_bytes: accounting.total_bytes,
        }
    }

    fn notify(&self, progress: &TransferProgress) -> bool {
        if let Some(callback) = &self.progress {
            if !callback.on_progress(progress) {
                log::info!(
                    "Cancellation requested at {:.1}% ({})",
                    progress.current_percentage,
                    progress.current_name
                );
                self.cancel();
            }
        }
        !self.is_cancelled()
    }
}

/// Adapts blob-level progress of one plan entry to the session.
pub(crate) struct EntryProgress<'s> {
    session: &'s TransferSession,
    entry: &'s PlanEntry,
}

impl<'s> EntryProgress<'s> {
    pub(crate) fn new(session: &'s TransferSession, entry: &'s PlanEntry) -> Self {
        Self { session, entry }
    }
}

impl ProgressCallback<BlobProgress> for EntryProgress<'_> {
    fn on_progress(&self, progress: &BlobProgress) -> bool {
        self.session
            .record_partial(self.entry, progress.bytes_transferred)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reality_transfer_common::progress_fn;

    fn plan() -> TransferPlan {
        TransferPlan::new(vec![
            PlanEntry::new("a.jpg", 10),
            PlanEntry::new("b.jpg", 20),
            PlanEntry::new("c.jpg", 30),
        ])
    }

    #[test]
    fn test_state_machine() {
        let session = TransferSession::new();
        assert_eq!(session.state(), SessionState::Planned);

        session.begin(OperationType::Uploading, &plan()).unwrap();
        assert_eq!(session.state(), SessionState::Transferring);

        let report = session.finish(SessionState::Completed, vec![], vec![]);
        assert_eq!(report.total_bytes, 60);
        assert_eq!(session.state(), SessionState::Completed);

        let err = session.begin(OperationType::Uploading, &plan()).unwrap_err();
        assert!(matches!(
            err,
            TransferError::SessionReused {
                state: SessionState::Completed
            }
        ));
    }

    #[test]
    fn test_partial_progress_is_clamped_and_monotonic() {
        let plan = plan();
        let session = TransferSession::new();
        session.begin(OperationType::Downloading, &plan).unwrap();

        assert!(session.record_partial(&plan.entries()[0], 4));
        assert_eq!(session.processed_bytes(), 4);

        // Transports may report more than planned (rewritten documents).
        assert!(session.record_partial(&plan.entries()[0], 500));
        assert_eq!(session.processed_bytes(), 10);

        // A restarted stream must not move progress backwards.
        assert!(session.record_partial(&plan.entries()[0], 2));
        assert_eq!(session.processed_bytes(), 10);

        assert!(session.complete_file(&plan.entries()[0]));
        assert_eq!(session.processed_bytes(), 10);

        assert!(session.record_partial(&plan.entries()[1], 5));
        assert_eq!(session.processed_bytes(), 15);
    }

    #[test]
    fn test_callback_false_cancels() {
        let plan = plan();
        let session = TransferSession::new()
            .with_progress(progress_fn(|p: &TransferProgress| p.files_completed < 1));
        session.begin(OperationType::Uploading, &plan).unwrap();

        assert!(session.record_partial(&plan.entries()[0], 5));
        assert!(!session.complete_file(&plan.entries()[0]));
        assert!(session.is_cancelled());

        let report = session.finish(SessionState::Cancelled, vec!["a.jpg".into()], vec![]);
        assert_eq!(report.processed_bytes, 10);
        assert_eq!(session.state(), SessionState::Cancelled);
    }

    #[test]
    fn test_cancellation_handle_is_shared() {
        let handle = CancellationHandle::new();
        let session = TransferSession::new().with_cancellation(handle.clone());
        assert!(!session.is_cancelled());

        handle.cancel();
        assert!(session.is_cancelled());
        assert!(session.cancellation_handle().is_cancelled());
    }

    #[test]
    fn test_entry_progress_forwards_to_session() {
        let plan = plan();
        let session = TransferSession::new();
        session.begin(OperationType::Uploading, &plan).unwrap();

        let adapter = EntryProgress::new(&session, &plan.entries()[2]);
        assert!(adapter.on_progress(&BlobProgress {
            bytes_transferred: 12,
            total_bytes: 30,
        }));
        assert_eq!(session.processed_bytes(), 12);
    }
}
