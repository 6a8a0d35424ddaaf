//! HTTP blob backend for reality-transfer.
//!
//! This crate provides a `ContainerClient` implementation that talks to the
//! blob service with `reqwest`, authorized by a SAS container URL such as
//! the ones a dataset service hands out for read or write access.
//!
//! # Example
//!
//! ```ignore
//! use reality_transfer_storage::{TransferSession, UploadOrchestrator};
//! use reality_transfer_storage_sas::{SasContainerClient, SasSettings};
//!
//! let client = SasContainerClient::with_settings(&container_url, SasSettings::default())?;
//! let orchestrator = UploadOrchestrator::new(&client).with_reference_table(&table);
//! let outcome = orchestrator.upload(&plan, root, &TransferSession::new()).await;
//! ```

mod client;
mod error;
mod protocol;
mod retry;
mod settings;

pub use client::SasContainerClient;
pub use error::SasError;
pub use settings::{RetrySettings, SasSettings, DEFAULT_REQUEST_TIMEOUT, MAX_BLOCKS_PER_BLOB};
