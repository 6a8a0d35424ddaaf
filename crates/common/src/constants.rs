//! Shared constants used across reality-transfer crates.

/// Prefix marking a cloud dataset reference inside a context scene (`rds:<id>`).
pub const CLOUD_REFERENCE_PREFIX: &str = "rds:";

/// Separator used for every reference path and blob name, regardless of host OS.
pub const REFERENCE_SEPARATOR: char = '/';

/// Default block size for chunked blob transfers (4MB).
pub const DEFAULT_BLOCK_SIZE: u64 = 4 * 1024 * 1024;

/// Default threshold above which uploads are split into blocks (32MB).
pub const DEFAULT_SINGLE_PUT_THRESHOLD: u64 = 32 * 1024 * 1024;

/// Default number of blocks in flight for a single blob upload.
pub const DEFAULT_BLOCK_CONCURRENCY: usize = 4;
