//! JSON context scenes.
//!
//! References live under `References.<id>.Path`. The document is parsed into
//! an order-preserving `Value`, patched in place and written back with a
//! fixed four-space indentation. Documents without a `References` object
//! are returned as they came in.

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::error::RewriteError;
use crate::reference::{Reference, ReferenceKind};
use crate::reference_table::ReferenceTable;
use crate::rewriter::RewriteDirection;

const REFERENCES_FIELD: &str = "References";
const PATH_FIELD: &str = "Path";

pub(crate) fn rewrite(
    text: &str,
    table: &ReferenceTable,
    direction: RewriteDirection,
) -> Result<String, RewriteError> {
    let mut root: Value = parse(text)?;

    // Nothing to patch: keep the document byte for byte.
    let Some(references) = references_mut(&mut root)? else {
        return Ok(text.to_string());
    };

    for (id, entry) in references.iter_mut() {
        let reference: Reference = Reference::new(ReferenceKind::Path, path_of(id, entry)?);
        let resolved: String = reference.resolve(table, direction)?;
        log::debug!("ContextScene JSON: {} -> {}", reference.raw_value, resolved);

        if let Some(fields) = entry.as_object_mut() {
            fields.insert(PATH_FIELD.to_string(), Value::String(resolved));
        }
    }

    let mut output: String = serialize(&root)?;
    if text.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}

pub(crate) fn references(text: &str) -> Result<Vec<Reference>, RewriteError> {
    let mut root: Value = parse(text)?;
    let mut found: Vec<Reference> = Vec::new();

    if let Some(references) = references_mut(&mut root)? {
        for (id, entry) in references.iter() {
            found.push(Reference::new(ReferenceKind::Path, path_of(id, entry)?));
        }
    }

    Ok(found)
}

fn parse(text: &str) -> Result<Value, RewriteError> {
    serde_json::from_str(text).map_err(|e| RewriteError::Json {
        message: e.to_string(),
    })
}

/// The `References` object, if the scene has one.
fn references_mut(root: &mut Value) -> Result<Option<&mut Map<String, Value>>, RewriteError> {
    match root.get_mut(REFERENCES_FIELD) {
        None => Ok(None),
        Some(Value::Object(references)) => Ok(Some(references)),
        Some(_) => Err(RewriteError::MalformedReference {
            element: REFERENCES_FIELD,
            context: "document root".to_string(),
        }),
    }
}

/// Trimmed `Path` of one reference entry; missing or empty is malformed.
fn path_of(id: &str, entry: &Value) -> Result<String, RewriteError> {
    entry
        .get(PATH_FIELD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(str::to_string)
        .ok_or_else(|| RewriteError::MalformedReference {
            element: PATH_FIELD,
            context: format!("Reference id={}", id),
        })
}

fn serialize(root: &Value) -> Result<String, RewriteError> {
    let mut buffer: Vec<u8> = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
    root.serialize(&mut serializer)
        .map_err(|e| RewriteError::Json {
            message: e.to_string(),
        })?;

    String::from_utf8(buffer).map_err(|e| RewriteError::Json {
        message: e.to_string(),
    })
}
