//! Rewriting of every reference in one scene document.

use crate::dialect::SceneDialect;
use crate::error::RewriteError;
use crate::reference::Reference;
use crate::reference_table::ReferenceTable;
use crate::{json, xml};

const UTF8_BOM: char = '\u{feff}';

/// Which address space references are translated into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteDirection {
    /// Local paths become cloud ids (before upload).
    LocalToCloud,
    /// Cloud ids become local paths (after download).
    CloudToLocal,
}

/// What to do with a `<Photo>` that has no `<ImagePath>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingImagePath {
    /// Abort the rewrite with `MalformedReference`.
    #[default]
    Fail,
    /// Leave the photo untouched and log a warning.
    Skip,
}

/// Options for reference rewriting.
#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    /// Policy for orientation photos without an image path.
    pub missing_image_path: MissingImagePath,
}

impl RewriteOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy for photos without an image path.
    pub fn with_missing_image_path(mut self, policy: MissingImagePath) -> Self {
        self.missing_image_path = policy;
        self
    }
}

/// Rewrites the embedded references of scene and orientation documents.
///
/// Each call parses the document, resolves every reference against the
/// table and serializes the result. Nothing is written unless every
/// reference resolves.
#[derive(Debug, Clone, Default)]
pub struct SceneReferenceRewriter {
    options: RewriteOptions,
}

impl SceneReferenceRewriter {
    /// Create a rewriter with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set rewrite options.
    pub fn with_options(mut self, options: RewriteOptions) -> Self {
        self.options = options;
        self
    }

    /// Rewrite every reference of `document`.
    ///
    /// # Arguments
    /// * `document` - Raw document bytes (UTF-8, optional BOM)
    /// * `dialect` - Format of the document
    /// * `table` - Lookup table for the session
    /// * `direction` - Which way to translate references
    ///
    /// # Returns
    /// The patched document. XML dialects keep every untouched byte; JSON is
    /// re-serialized with its original key order, unless it has no
    /// `References` object, in which case it comes back unchanged.
    ///
    /// # Errors
    /// The first malformed, badly formatted or unresolved reference aborts
    /// the whole rewrite.
    pub fn rewrite(
        &self,
        document: &[u8],
        dialect: SceneDialect,
        table: &ReferenceTable,
        direction: RewriteDirection,
    ) -> Result<Vec<u8>, RewriteError> {
        self.rewrite_with_options(document, dialect, table, direction, &self.options)
    }

    /// Like [`rewrite`](Self::rewrite), with options for this call only.
    pub fn rewrite_with_options(
        &self,
        document: &[u8],
        dialect: SceneDialect,
        table: &ReferenceTable,
        direction: RewriteDirection,
        options: &RewriteOptions,
    ) -> Result<Vec<u8>, RewriteError> {
        let (bom, body) = decode(document)?;

        let mut patched: String = match dialect {
            SceneDialect::ContextSceneXml | SceneDialect::CcOrientations => {
                xml::rewrite(body, dialect, table, direction, options)?
            }
            SceneDialect::ContextSceneJson => json::rewrite(body, table, direction)?,
        };

        if bom {
            patched.insert(0, UTF8_BOM);
        }
        Ok(patched.into_bytes())
    }

    /// List every reference of `document` without resolving it.
    ///
    /// Useful to find which datasets must be transferred before a scene.
    pub fn references(
        &self,
        document: &[u8],
        dialect: SceneDialect,
    ) -> Result<Vec<Reference>, RewriteError> {
        let (_, body) = decode(document)?;
        match dialect {
            SceneDialect::ContextSceneXml | SceneDialect::CcOrientations => {
                xml::references(body, dialect, &self.options)
            }
            SceneDialect::ContextSceneJson => json::references(body),
        }
    }
}

/// Split off an optional UTF-8 byte order mark.
fn decode(document: &[u8]) -> Result<(bool, &str), RewriteError> {
    let text: &str = std::str::from_utf8(document).map_err(|e| RewriteError::Encoding {
        message: e.to_string(),
    })?;
    Ok(match text.strip_prefix(UTF8_BOM) {
        Some(body) => (true, body),
        None => (false, text),
    })
}
