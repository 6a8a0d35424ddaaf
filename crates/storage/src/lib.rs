//! Transfer engine for reality-data datasets.
//!
//! This crate moves datasets between a local directory and a blob container
//! through any [`ContainerClient`] implementation:
//!
//! - **Planning** - `plan_cloud_download` lists a container into a transfer
//!   plan (the local side lives in `reality-transfer-filesystem`)
//! - **Orchestration** - `UploadOrchestrator` / `DownloadOrchestrator` move
//!   the files of a plan sequentially, rewriting scene and orientation
//!   documents on the fly
//! - **Sessions** - `TransferSession` carries cancellation and progress for
//!   exactly one transfer
//! - **Datasets** - `RealityDataTransfer` creates or opens datasets through
//!   a `DatasetService` and keeps the reference table up to date
//!
//! `MemoryContainer` is an in-process backend for tests and offline tools;
//! the HTTP backend lives in `reality-transfer-storage-sas`.

mod dataset;
mod download;
mod error;
mod memory;
mod plan;
mod session;
mod traits;
mod transfer;
mod types;
mod upload;

pub use dataset::{DatasetHandle, DatasetService, NewDataset};
pub use download::{
    generate_unique_copy_path, verify_file_size, DownloadOptions, DownloadOrchestrator,
};
pub use error::{StorageError, TransferError};
pub use memory::{BlobOperation, MemoryContainer, DEFAULT_MEMORY_CHUNK_SIZE};
pub use plan::plan_cloud_download;
pub use session::{CancellationHandle, SessionState, TransferSession};
pub use traits::{BlobInfo, BlobProgress, ContainerClient};
pub use transfer::RealityDataTransfer;
pub use types::{
    ConflictResolution, OperationType, TransferOutcome, TransferProgress, TransferReport,
};
pub use upload::{UploadOptions, UploadOrchestrator};
