//! Generic progress callback trait and implementations.
//!
//! Every progress hook in the workspace follows the same contract: it
//! receives the current progress value and answers whether the operation
//! should keep going.

use std::marker::PhantomData;

/// Generic progress callback trait.
///
/// Type parameter `T` is the progress data type, so blob-level and
/// session-level reporting share one callback shape.
pub trait ProgressCallback<T>: Send + Sync {
    /// Called with progress updates.
    ///
    /// # Returns
    /// - `true` to continue the operation
    /// - `false` to request cancellation
    fn on_progress(&self, progress: &T) -> bool;
}

/// A no-op progress callback that always continues.
pub struct NoOpProgress;

impl<T> ProgressCallback<T> for NoOpProgress {
    fn on_progress(&self, _progress: &T) -> bool {
        true
    }
}

/// A progress callback that wraps a closure.
pub struct FnProgress<F, T> {
    callback: F,
    _marker: PhantomData<fn(&T)>,
}

impl<F, T> FnProgress<F, T>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    /// Create a new closure-based progress callback.
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _marker: PhantomData,
        }
    }
}

impl<F, T> ProgressCallback<T> for FnProgress<F, T>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn on_progress(&self, progress: &T) -> bool {
        (self.callback)(progress)
    }
}

/// Create a progress callback from a closure.
///
/// # Arguments
/// * `f` - Closure that receives progress and returns whether to continue
pub fn progress_fn<F, T>(f: F) -> FnProgress<F, T>
where
    F: Fn(&T) -> bool + Send + Sync,
{
    FnProgress::new(f)
}

/// Percentage of `processed` over `total`, clamped to `0.0..=100.0`.
///
/// An empty total counts as complete.
pub fn percentage(processed: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    ((processed as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_noop_progress() {
        assert!(NoOpProgress.on_progress(&42u64));
    }

    #[test]
    fn test_fn_progress_cancel_threshold() {
        let callback = progress_fn(|bytes: &u64| *bytes < 100);
        assert!(callback.on_progress(&50));
        assert!(!callback.on_progress(&150));
    }

    #[test]
    fn test_fn_progress_captures_state() {
        let calls: Arc<AtomicU64> = Arc::new(AtomicU64::new(0));
        let calls_clone: Arc<AtomicU64> = calls.clone();

        let callback = progress_fn(move |_: &u64| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            true
        });

        callback.on_progress(&1);
        callback.on_progress(&2);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 200), 0.0);
        assert_eq!(percentage(50, 200), 25.0);
        assert_eq!(percentage(300, 200), 100.0);
        assert_eq!(percentage(0, 0), 100.0);
    }
}
