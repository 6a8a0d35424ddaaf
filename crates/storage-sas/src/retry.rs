//! Exponential backoff for transient failures.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::SasError;
use crate::settings::RetrySettings;

/// Longest stretch of backoff slept without asking `stop_requested`.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Run `attempt` until it succeeds, fails permanently or runs out of tries.
///
/// `stop_requested` is polled while backing off; once it answers true the
/// wait ends with `SasError::Cancelled` instead of another attempt.
pub(crate) async fn with_retry<T, F, Fut, S>(
    settings: &RetrySettings,
    operation: &str,
    mut attempt: F,
    stop_requested: S,
) -> Result<T, SasError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SasError>>,
    S: Fn() -> bool,
{
    let max_attempts: u32 = settings.max_attempts.max(1);
    let mut retry: u32 = 0;

    loop {
        match attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && retry + 1 < max_attempts => {
                let delay: Duration = settings.delay_for(retry);
                log::warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}: {}",
                    operation,
                    retry + 1,
                    max_attempts,
                    delay,
                    err
                );
                backoff(delay, &stop_requested).await?;
                retry += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

async fn backoff<S: Fn() -> bool>(delay: Duration, stop_requested: &S) -> Result<(), SasError> {
    let deadline: Instant = Instant::now() + delay;
    loop {
        if stop_requested() {
            return Err(SasError::Cancelled);
        }
        let now: Instant = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        tokio::time::sleep((deadline - now).min(STOP_POLL_INTERVAL)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_retries(max_attempts: u32) -> RetrySettings {
        RetrySettings {
            max_attempts,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
            backoff_multiplier: 2.0,
        }
    }

    fn unavailable() -> SasError {
        SasError::Status {
            operation: "Put Blob",
            status: 503,
            message: "server busy".into(),
        }
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, SasError> = with_retry(
            &instant_retries(3),
            "Put Blob",
            || {
                let call: u32 = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call < 2 {
                        Err(unavailable())
                    } else {
                        Ok(call)
                    }
                }
            },
            || false,
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), SasError> = with_retry(
            &instant_retries(2),
            "Put Blob",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(unavailable()) }
            },
            || false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), SasError> = with_retry(
            &instant_retries(5),
            "Get Blob",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(SasError::Status {
                        operation: "Get Blob",
                        status: 404,
                        message: "BlobNotFound".into(),
                    })
                }
            },
            || false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_instant_retry_still_checks_for_cancellation() {
        let calls = AtomicU32::new(0);
        let result: Result<(), SasError> = with_retry(
            &instant_retries(5),
            "Get Blob",
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(unavailable()) }
            },
            || true,
        )
        .await;

        assert!(matches!(result, Err(SasError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backoff_stops_when_cancelled() {
        let settings = RetrySettings {
            max_attempts: 5,
            initial_backoff_ms: 60_000,
            max_backoff_ms: 60_000,
            backoff_multiplier: 1.0,
        };
        let calls = AtomicU32::new(0);
        let checks = AtomicU32::new(0);

        let result: Result<(), SasError> = tokio::time::timeout(
            Duration::from_secs(10),
            with_retry(
                &settings,
                "Put Block",
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(unavailable()) }
                },
                || checks.fetch_add(1, Ordering::SeqCst) >= 2,
            ),
        )
        .await
        .unwrap();

        assert!(matches!(result, Err(SasError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }
}
