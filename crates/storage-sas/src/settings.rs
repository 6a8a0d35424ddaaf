//! Configuration for the SAS container client.

use std::time::Duration;

use reality_transfer_common::{
    DEFAULT_BLOCK_CONCURRENCY, DEFAULT_BLOCK_SIZE, DEFAULT_SINGLE_PUT_THRESHOLD,
};

/// Most blocks a single block blob may be committed from.
pub const MAX_BLOCKS_PER_BLOB: u64 = 50_000;

/// Default timeout for one HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Retry settings for transient HTTP failures.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Maximum number of attempts, the first one included.
    pub max_attempts: u32,
    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Backoff multiplier (exponential backoff).
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    /// Settings that never retry.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor: f64 = self.backoff_multiplier.max(1.0).powi(retry as i32);
        let millis: f64 = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
        Duration::from_millis(millis as u64)
    }
}

/// Configuration settings for the SAS container client.
#[derive(Debug, Clone)]
pub struct SasSettings {
    /// Size of each staged block for large blobs.
    pub block_size: u64,
    /// Blobs up to this size are sent with a single Put Blob.
    pub single_put_threshold: u64,
    /// Blocks of one blob staged concurrently.
    pub block_concurrency: usize,
    /// Timeout for one HTTP request.
    pub request_timeout: Duration,
    /// Retry settings.
    pub retry: RetrySettings,
}

impl Default for SasSettings {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            single_put_threshold: DEFAULT_SINGLE_PUT_THRESHOLD,
            block_concurrency: DEFAULT_BLOCK_CONCURRENCY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetrySettings::default(),
        }
    }
}

impl SasSettings {
    /// Create settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the block size.
    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the single-request upload threshold.
    pub fn with_single_put_threshold(mut self, threshold: u64) -> Self {
        self.single_put_threshold = threshold;
        self
    }

    /// Set how many blocks are staged at once.
    pub fn with_block_concurrency(mut self, concurrency: usize) -> Self {
        self.block_concurrency = concurrency;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set retry settings.
    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let retry = RetrySettings {
            max_attempts: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 350,
            backoff_multiplier: 2.0,
        };
        assert_eq!(retry.delay_for(0), Duration::from_millis(100));
        assert_eq!(retry.delay_for(1), Duration::from_millis(200));
        assert_eq!(retry.delay_for(2), Duration::from_millis(350));
        assert_eq!(retry.delay_for(10), Duration::from_millis(350));
    }

    #[test]
    fn test_settings_builders() {
        let settings = SasSettings::new()
            .with_block_size(1024)
            .with_single_put_threshold(2048)
            .with_block_concurrency(2)
            .with_retry(RetrySettings::none());
        assert_eq!(settings.block_size, 1024);
        assert_eq!(settings.single_put_threshold, 2048);
        assert_eq!(settings.block_concurrency, 2);
        assert_eq!(settings.retry.max_attempts, 1);
    }
}
