//! Reference rewriting for reality-data scene documents.
//!
//! Context scenes and camera-orientation files point at sibling datasets.
//! Locally those pointers are filesystem paths; in the cloud they are dataset
//! identifiers. This crate keeps the two in sync:
//!
//! - `ReferenceTable` - bidirectional local path <-> cloud id lookup
//! - `SceneDialect` - which document format a file is written in
//! - `SceneReferenceRewriter` - rewrites every embedded reference of one
//!   document in either direction
//!
//! # Example
//!
//! ```ignore
//! use reality_transfer_scene::{ReferenceTable, RewriteDirection, SceneDialect, SceneReferenceRewriter};
//!
//! let mut table = ReferenceTable::new();
//! table.add_reference("images", "cloud-123");
//!
//! let rewriter = SceneReferenceRewriter::new();
//! let patched = rewriter.rewrite(
//!     &bytes,
//!     SceneDialect::ContextSceneXml,
//!     &table,
//!     RewriteDirection::LocalToCloud,
//! )?;
//! ```

mod dialect;
mod error;
mod json;
mod reference;
mod reference_table;
mod rewriter;
mod xml;

pub use dialect::SceneDialect;
pub use error::RewriteError;
pub use reference::{Reference, ReferenceKind};
pub use reference_table::ReferenceTable;
pub use rewriter::{MissingImagePath, RewriteDirection, RewriteOptions, SceneReferenceRewriter};
