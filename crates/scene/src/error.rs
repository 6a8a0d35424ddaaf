//! Error types for reference rewriting.

use thiserror::Error;

/// Errors that abort the rewrite of a scene document.
///
/// Every variant that concerns one reference carries its raw text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RewriteError {
    /// A required element or field is missing or empty.
    #[error("Malformed reference: <{element}> missing or empty in {context}")]
    MalformedReference {
        /// Name of the missing element or field (`Path`, `ImagePath`, ...).
        element: &'static str,
        /// Where it was expected (reference id, photo position, ...).
        context: String,
    },

    /// A cloud-side reference does not have the expected shape.
    #[error("Invalid reference format: {reference} ({reason})")]
    InvalidReferenceFormat {
        /// Raw reference text.
        reference: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// The reference has no entry in the reference table.
    #[error("Unresolved reference: {reference}")]
    UnresolvedReference {
        /// Raw reference text.
        reference: String,
    },

    /// The document is not well-formed XML.
    #[error("Invalid XML document: {message}")]
    Xml { message: String },

    /// The document is not valid JSON or cannot be serialized back.
    #[error("Invalid JSON document: {message}")]
    Json { message: String },

    /// The document is not UTF-8.
    #[error("Document is not valid UTF-8: {message}")]
    Encoding { message: String },
}

impl RewriteError {
    /// Raw reference text, when the error concerns a single reference.
    pub fn reference(&self) -> Option<&str> {
        match self {
            RewriteError::InvalidReferenceFormat { reference, .. }
            | RewriteError::UnresolvedReference { reference } => Some(reference),
            _ => None,
        }
    }
}
