//! File system operations for reality-transfer.
//!
//! This crate enumerates the local side of a transfer:
//! - `plan_local_upload()` - Directory (or lone file) to `TransferPlan`
//! - `LocalPlanner` - Same walk with explicit `PlanOptions`

pub mod error;
pub mod planner;

// Re-export main types
pub use error::FileSystemError;
pub use planner::{plan_local_upload, LocalPlanner, PlanOptions};
