//! Scene document dialects.

use std::fmt;
use std::path::Path;

use reality_transfer_common::DatasetType;

/// Format of a document that embeds dataset references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneDialect {
    /// `<Reference><Path>` elements of an XML context scene.
    ContextSceneXml,
    /// `References.<id>.Path` fields of a JSON context scene.
    ContextSceneJson,
    /// `<Photo><ImagePath>` / `<MaskPath>` elements of a `BlocksExchange` file.
    CcOrientations,
}

impl SceneDialect {
    /// Resolve the dialect of a file inside a dataset of the given type.
    ///
    /// Only context scenes and orientation datasets carry references; every
    /// other file is transferred untouched.
    ///
    /// # Arguments
    /// * `dataset_type` - Type of the dataset being transferred
    /// * `file_name` - Name of the file (relative name or path)
    ///
    /// # Returns
    /// The dialect to rewrite the file with, or `None` for plain data files.
    pub fn detect(dataset_type: &DatasetType, file_name: &str) -> Option<SceneDialect> {
        match (dataset_type, extension(file_name).as_str()) {
            (DatasetType::ContextScene, "xml") => Some(SceneDialect::ContextSceneXml),
            (DatasetType::ContextScene, "json") => Some(SceneDialect::ContextSceneJson),
            (DatasetType::CCOrientations, "xml") => Some(SceneDialect::CcOrientations),
            _ => None,
        }
    }

    /// Resolve the dialect of a file whose dataset type is unknown.
    ///
    /// A `.json` file is a JSON context scene when its root is an object
    /// with a `References` object. For `.xml` files the root element
    /// decides: `<ContextScene>` or `<BlocksExchange>`.
    ///
    /// # Arguments
    /// * `file_name` - Name of the file (relative name or path)
    /// * `document` - File content, used to sniff the document
    ///
    /// # Returns
    /// `None` for other extensions and for documents that are neither.
    pub fn from_file_name(file_name: &str, document: &[u8]) -> Option<SceneDialect> {
        let text: &str = std::str::from_utf8(document).ok()?;
        let text: &str = text.trim_start_matches('\u{feff}');

        match extension(file_name).as_str() {
            "json" => {
                let root: serde_json::Value = serde_json::from_str(text).ok()?;
                root.get("References")
                    .is_some_and(serde_json::Value::is_object)
                    .then_some(SceneDialect::ContextSceneJson)
            }
            "xml" => {
                let parsed = roxmltree::Document::parse(text).ok()?;
                let root: &str = parsed.root_element().tag_name().name();
                match root {
                    "ContextScene" => Some(SceneDialect::ContextSceneXml),
                    "BlocksExchange" => Some(SceneDialect::CcOrientations),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Whether an untyped file may be a scene document, judging by its extension.
    pub fn is_candidate(file_name: &str) -> bool {
        matches!(extension(file_name).as_str(), "xml" | "json")
    }
}

fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

impl fmt::Display for SceneDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &str = match self {
            SceneDialect::ContextSceneXml => "ContextScene XML",
            SceneDialect::ContextSceneJson => "ContextScene JSON",
            SceneDialect::CcOrientations => "CCOrientations",
        };
        f.write_str(name)
    }
}
