//! XML dialects: context scenes and `BlocksExchange` orientations.
//!
//! Documents are parsed with roxmltree only to locate the text of the
//! reference elements. The output is the original text with those byte
//! ranges replaced, so comments, attributes, formatting and every untouched
//! element survive byte for byte.

use std::ops::Range;

use roxmltree::{Document, Node};

use crate::dialect::SceneDialect;
use crate::error::RewriteError;
use crate::reference::{Reference, ReferenceKind};
use crate::reference_table::ReferenceTable;
use crate::rewriter::{MissingImagePath, RewriteDirection, RewriteOptions};

/// A reference and the byte range of its element content.
struct LocatedReference {
    reference: Reference,
    content: Range<usize>,
}

pub(crate) fn rewrite(
    text: &str,
    dialect: SceneDialect,
    table: &ReferenceTable,
    direction: RewriteDirection,
    options: &RewriteOptions,
) -> Result<String, RewriteError> {
    let document: Document = parse(text)?;
    let located: Vec<LocatedReference> = locate(&document, dialect, options)?;

    let mut edits: Vec<(Range<usize>, String)> = Vec::with_capacity(located.len());
    for item in located {
        let resolved: String = item.reference.resolve(table, direction)?;
        log::debug!("{}: {} -> {}", dialect, item.reference.raw_value, resolved);
        edits.push((item.content, escape_text(&resolved)));
    }

    Ok(splice(text, edits))
}

pub(crate) fn references(
    text: &str,
    dialect: SceneDialect,
    options: &RewriteOptions,
) -> Result<Vec<Reference>, RewriteError> {
    let document: Document = parse(text)?;
    Ok(locate(&document, dialect, options)?
        .into_iter()
        .map(|item| item.reference)
        .collect())
}

fn parse(text: &str) -> Result<Document<'_>, RewriteError> {
    Document::parse(text).map_err(|e| RewriteError::Xml {
        message: e.to_string(),
    })
}

fn locate(
    document: &Document,
    dialect: SceneDialect,
    options: &RewriteOptions,
) -> Result<Vec<LocatedReference>, RewriteError> {
    match dialect {
        SceneDialect::ContextSceneXml => locate_scene_paths(document),
        SceneDialect::CcOrientations => locate_photo_paths(document, options),
        SceneDialect::ContextSceneJson => Err(RewriteError::Xml {
            message: "JSON dialect passed to XML rewriter".to_string(),
        }),
    }
}

/// `<Reference><Path>` of a context scene; every reference needs a path.
fn locate_scene_paths(document: &Document) -> Result<Vec<LocatedReference>, RewriteError> {
    let mut located: Vec<LocatedReference> = Vec::new();

    for (index, node) in document
        .descendants()
        .filter(|n| n.has_tag_name("Reference"))
        .enumerate()
    {
        let context: String = match node.attribute("id") {
            Some(id) => format!("Reference id={}", id),
            None => format!("Reference #{}", index),
        };

        let path: Node = child_element(node, "Path").ok_or_else(|| {
            RewriteError::MalformedReference {
                element: "Path",
                context: context.clone(),
            }
        })?;

        located.push(required_reference(path, ReferenceKind::Path, context)?);
    }

    Ok(located)
}

/// `<Photo><ImagePath>` and optional `<MaskPath>` of an orientation file.
fn locate_photo_paths(
    document: &Document,
    options: &RewriteOptions,
) -> Result<Vec<LocatedReference>, RewriteError> {
    let mut located: Vec<LocatedReference> = Vec::new();

    for (index, photo) in document
        .descendants()
        .filter(|n| n.has_tag_name("Photo"))
        .enumerate()
    {
        let context: String = match child_element(photo, "Id").and_then(|n| n.text()) {
            Some(id) => format!("Photo Id={}", id.trim()),
            None => format!("Photo #{}", index),
        };

        match child_element(photo, "ImagePath") {
            Some(image) => {
                located.push(required_reference(image, ReferenceKind::ImagePath, context)?);
            }
            None => match options.missing_image_path {
                MissingImagePath::Fail => {
                    return Err(RewriteError::MalformedReference {
                        element: "ImagePath",
                        context,
                    });
                }
                MissingImagePath::Skip => {
                    log::warn!("Skipping {} without <ImagePath>", context);
                    continue;
                }
            },
        }

        // Empty masks are left as they are.
        if let Some(mask) = child_element(photo, "MaskPath") {
            let (value, content) = element_content(mask);
            let value: &str = value.trim();
            if !value.is_empty() {
                located.push(LocatedReference {
                    reference: Reference::new(ReferenceKind::MaskPath, value),
                    content,
                });
            }
        }
    }

    Ok(located)
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(name))
}

fn required_reference(
    element: Node,
    kind: ReferenceKind,
    context: String,
) -> Result<LocatedReference, RewriteError> {
    let (value, content) = element_content(element);
    let value: &str = value.trim();
    if value.is_empty() {
        return Err(RewriteError::MalformedReference {
            element: kind.element(),
            context,
        });
    }
    Ok(LocatedReference {
        reference: Reference::new(kind, value),
        content,
    })
}

/// Decoded text of an element and the byte range between its tags.
fn element_content(element: Node) -> (String, Range<usize>) {
    let value: String = element
        .children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect();

    let content: Range<usize> = match (element.first_child(), element.last_child()) {
        (Some(first), Some(last)) => first.range().start..last.range().end,
        _ => {
            let end: usize = element.range().end;
            end..end
        }
    };

    (value, content)
}

fn escape_text(value: &str) -> String {
    let mut escaped: String = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn splice(text: &str, mut edits: Vec<(Range<usize>, String)>) -> String {
    edits.sort_by_key(|(range, _)| range.start);

    let mut output: String = String::with_capacity(text.len());
    let mut cursor: usize = 0;
    for (range, replacement) in edits {
        output.push_str(&text[cursor..range.start]);
        output.push_str(&replacement);
        cursor = range.end;
    }
    output.push_str(&text[cursor..]);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ReferenceTable {
        let mut table = ReferenceTable::new();
        table.add_reference("images", "cloud-abc");
        table.add_reference("masks", "cloud-mask");
        table.add_reference("a&b", "cloud-amp");
        table
    }

    fn rewrite_default(
        text: &str,
        dialect: SceneDialect,
        direction: RewriteDirection,
    ) -> Result<String, RewriteError> {
        rewrite(text, dialect, &table(), direction, &RewriteOptions::default())
    }

    const ORIENTATIONS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<BlocksExchange version="2.1">
  <!-- exported by the survey tool -->
  <Block>
    <Photogroups>
      <Photogroup>
        <Photo>
          <Id>0</Id>
          <ImagePath>images/IMG_0001.jpg</ImagePath>
          <MaskPath>masks/IMG_0001.png</MaskPath>
          <Pose><Center><x>1.5</x></Center></Pose>
        </Photo>
        <Photo>
          <Id>1</Id>
          <ImagePath>images\IMG_0002.jpg</ImagePath>
        </Photo>
      </Photogroup>
    </Photogroups>
  </Block>
</BlocksExchange>"#;

    #[test]
    fn test_scene_path_local_to_cloud() {
        let text = "<ContextScene><References><Reference id=\"0\"><Path>images</Path></Reference></References></ContextScene>";
        let patched: String = rewrite_default(
            text,
            SceneDialect::ContextSceneXml,
            RewriteDirection::LocalToCloud,
        )
        .unwrap();
        assert_eq!(
            patched,
            "<ContextScene><References><Reference id=\"0\"><Path>rds:cloud-abc</Path></Reference></References></ContextScene>"
        );
    }

    #[test]
    fn test_scene_path_trims_whitespace() {
        let text = "<ContextScene><Reference><Path>\n  images\n</Path></Reference></ContextScene>";
        let patched: String = rewrite_default(
            text,
            SceneDialect::ContextSceneXml,
            RewriteDirection::LocalToCloud,
        )
        .unwrap();
        assert!(patched.contains("<Path>rds:cloud-abc</Path>"));
    }

    #[test]
    fn test_scene_missing_path_is_malformed() {
        let text = "<ContextScene><Reference id=\"7\"><Name>x</Name></Reference></ContextScene>";
        let err = rewrite_default(
            text,
            SceneDialect::ContextSceneXml,
            RewriteDirection::LocalToCloud,
        )
        .unwrap_err();
        assert_eq!(
            err,
            RewriteError::MalformedReference {
                element: "Path",
                context: "Reference id=7".to_string()
            }
        );
    }

    #[test]
    fn test_scene_empty_path_is_malformed() {
        for text in [
            "<ContextScene><Reference><Path></Path></Reference></ContextScene>",
            "<ContextScene><Reference><Path/></Reference></ContextScene>",
            "<ContextScene><Reference><Path>   </Path></Reference></ContextScene>",
        ] {
            let result = rewrite_default(
                text,
                SceneDialect::ContextSceneXml,
                RewriteDirection::CloudToLocal,
            );
            assert!(
                matches!(result, Err(RewriteError::MalformedReference { .. })),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_scene_escapes_resolved_value() {
        let text = "<ContextScene><Reference><Path>rds:cloud-amp</Path></Reference></ContextScene>";
        let patched: String = rewrite_default(
            text,
            SceneDialect::ContextSceneXml,
            RewriteDirection::CloudToLocal,
        )
        .unwrap();
        assert!(patched.contains("<Path>a&amp;b</Path>"));
    }

    #[test]
    fn test_scene_reads_escaped_value() {
        let text = "<ContextScene><Reference><Path>a&amp;b</Path></Reference></ContextScene>";
        let patched: String = rewrite_default(
            text,
            SceneDialect::ContextSceneXml,
            RewriteDirection::LocalToCloud,
        )
        .unwrap();
        assert!(patched.contains("<Path>rds:cloud-amp</Path>"));
    }

    #[test]
    fn test_invalid_xml() {
        let result = rewrite_default(
            "<ContextScene><Reference>",
            SceneDialect::ContextSceneXml,
            RewriteDirection::LocalToCloud,
        );
        assert!(matches!(result, Err(RewriteError::Xml { .. })));
    }

    #[test]
    fn test_orientations_local_to_cloud() {
        let patched: String = rewrite_default(
            ORIENTATIONS,
            SceneDialect::CcOrientations,
            RewriteDirection::LocalToCloud,
        )
        .unwrap();

        assert!(patched.contains("<ImagePath>cloud-abc/IMG_0001.jpg</ImagePath>"));
        assert!(patched.contains("<MaskPath>cloud-mask/IMG_0001.png</MaskPath>"));
        assert!(patched.contains("<ImagePath>cloud-abc/IMG_0002.jpg</ImagePath>"));
        assert!(patched.contains("<!-- exported by the survey tool -->"));
        assert!(patched.contains("<Pose><Center><x>1.5</x></Center></Pose>"));
    }

    #[test]
    fn test_orientations_round_trip() {
        let cloud: String = rewrite_default(
            ORIENTATIONS,
            SceneDialect::CcOrientations,
            RewriteDirection::LocalToCloud,
        )
        .unwrap();
        let local: String = rewrite_default(
            &cloud,
            SceneDialect::CcOrientations,
            RewriteDirection::CloudToLocal,
        )
        .unwrap();

        // Separators come back normalized.
        assert_eq!(local, ORIENTATIONS.replace(r"images\IMG_0002", "images/IMG_0002"));
    }

    #[test]
    fn test_orientations_missing_image_path_fails_by_default() {
        let text = "<BlocksExchange><Photo><Id>3</Id><MaskPath>masks/a.png</MaskPath></Photo></BlocksExchange>";
        let err = rewrite_default(
            text,
            SceneDialect::CcOrientations,
            RewriteDirection::CloudToLocal,
        )
        .unwrap_err();
        assert_eq!(
            err,
            RewriteError::MalformedReference {
                element: "ImagePath",
                context: "Photo Id=3".to_string()
            }
        );
    }

    #[test]
    fn test_orientations_missing_image_path_skip_policy() {
        let text = "<BlocksExchange><Photo><Id>3</Id><MaskPath>masks/a.png</MaskPath></Photo><Photo><ImagePath>images/b.jpg</ImagePath></Photo></BlocksExchange>";
        let options =
            RewriteOptions::default().with_missing_image_path(MissingImagePath::Skip);
        let patched: String = rewrite(
            text,
            SceneDialect::CcOrientations,
            &table(),
            RewriteDirection::LocalToCloud,
            &options,
        )
        .unwrap();

        assert!(patched.contains("<MaskPath>masks/a.png</MaskPath>"));
        assert!(patched.contains("<ImagePath>cloud-abc/b.jpg</ImagePath>"));
    }

    #[test]
    fn test_orientations_unresolved_image_path() {
        let text = "<BlocksExchange><Photo><ImagePath>other/a.jpg</ImagePath></Photo></BlocksExchange>";
        let err = rewrite_default(
            text,
            SceneDialect::CcOrientations,
            RewriteDirection::LocalToCloud,
        )
        .unwrap_err();
        assert_eq!(err.reference(), Some("other/a.jpg"));
    }

    #[test]
    fn test_orientations_empty_mask_is_untouched() {
        let text = "<BlocksExchange><Photo><ImagePath>images/a.jpg</ImagePath><MaskPath/></Photo></BlocksExchange>";
        let patched: String = rewrite_default(
            text,
            SceneDialect::CcOrientations,
            RewriteDirection::LocalToCloud,
        )
        .unwrap();
        assert!(patched.contains("<MaskPath/>"));
    }

    #[test]
    fn test_splice_orders_edits() {
        let text = "0123456789";
        let spliced: String = splice(
            text,
            vec![(6..8, "B".to_string()), (1..3, "A".to_string())],
        );
        assert_eq!(spliced, "0A345B89");
    }
}
