//! Shared types and utilities for reality-transfer.
//!
//! This crate provides common functionality used across all reality-transfer crates:
//! - Path normalization utilities (local paths, blob names, reference paths)
//! - Generic progress callback trait
//! - Shared constants and error types
//! - Dataset type names
//! - Transfer plans

pub mod constants;
pub mod dataset_type;
pub mod error;
pub mod path_utils;
pub mod plan;
pub mod progress;

// Re-export commonly used items at crate root
pub use constants::*;
pub use dataset_type::DatasetType;
pub use error::PathError;
pub use path_utils::{
    from_posix_path, is_within_root, join_reference_path, lexical_normalize,
    normalize_reference_path, relative_to_root, split_reference_path, to_absolute,
    to_posix_path,
};
pub use plan::{PlanEntry, TransferPlan};
pub use progress::{percentage, progress_fn, FnProgress, NoOpProgress, ProgressCallback};
