//! Single references and their translation between address spaces.

use reality_transfer_common::{
    join_reference_path, normalize_reference_path, split_reference_path, CLOUD_REFERENCE_PREFIX,
    REFERENCE_SEPARATOR,
};

use crate::error::RewriteError;
use crate::reference_table::ReferenceTable;
use crate::rewriter::RewriteDirection;

/// Which element or field a reference was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Context scene `Path` (whole dataset).
    Path,
    /// Orientation `ImagePath` (file inside a dataset).
    ImagePath,
    /// Orientation `MaskPath` (file inside a dataset).
    MaskPath,
}

impl ReferenceKind {
    /// Element or field name in the document.
    pub fn element(self) -> &'static str {
        match self {
            ReferenceKind::Path => "Path",
            ReferenceKind::ImagePath => "ImagePath",
            ReferenceKind::MaskPath => "MaskPath",
        }
    }
}

/// One reference extracted from a scene document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Element kind.
    pub kind: ReferenceKind,
    /// Text as found in the document, surrounding whitespace removed.
    pub raw_value: String,
}

impl Reference {
    /// Create a reference.
    pub fn new(kind: ReferenceKind, raw_value: impl Into<String>) -> Self {
        Self {
            kind,
            raw_value: raw_value.into(),
        }
    }

    /// Translate this reference into the other address space.
    ///
    /// # Arguments
    /// * `table` - Lookup table for the session
    /// * `direction` - Which way to translate
    ///
    /// # Errors
    /// `InvalidReferenceFormat` for cloud values of the wrong shape,
    /// `UnresolvedReference` when the table has no entry.
    pub fn resolve(
        &self,
        table: &ReferenceTable,
        direction: RewriteDirection,
    ) -> Result<String, RewriteError> {
        match (self.kind, direction) {
            (ReferenceKind::Path, RewriteDirection::LocalToCloud) => {
                let cloud_id: &str = table
                    .get_cloud_id_from_local_path(&self.raw_value)
                    .ok_or_else(|| self.unresolved())?;
                Ok(format!("{}{}", CLOUD_REFERENCE_PREFIX, cloud_id))
            }
            (ReferenceKind::Path, RewriteDirection::CloudToLocal) => {
                let cloud_id: &str = self
                    .raw_value
                    .strip_prefix(CLOUD_REFERENCE_PREFIX)
                    .ok_or_else(|| self.invalid("missing rds: prefix"))?;
                if cloud_id.is_empty() {
                    return Err(self.invalid("empty dataset id"));
                }
                table
                    .get_local_path_from_cloud_id(cloud_id)
                    .map(str::to_string)
                    .ok_or_else(|| self.unresolved())
            }
            (_, RewriteDirection::LocalToCloud) => {
                let path: String = normalize_reference_path(&self.raw_value);
                let (cloud_id, remainder) = table
                    .find_containing_dataset(&path)
                    .ok_or_else(|| self.unresolved())?;
                Ok(join_reference_path(cloud_id, remainder))
            }
            (_, RewriteDirection::CloudToLocal) => {
                let path: String = normalize_reference_path(&self.raw_value);
                let (cloud_id, remainder) = path
                    .split_once(REFERENCE_SEPARATOR)
                    .ok_or_else(|| self.invalid("expected <dataset id>/<file>"))?;
                if cloud_id.is_empty() || remainder.is_empty() {
                    return Err(self.invalid("expected <dataset id>/<file>"));
                }
                let local_dir: &str = table
                    .get_local_path_from_cloud_id(cloud_id)
                    .ok_or_else(|| self.unresolved())?;
                Ok(join_reference_path(local_dir, remainder))
            }
        }
    }

    /// Directory portion of a file reference (dataset-level references return themselves).
    pub fn dataset_path(&self) -> String {
        let path: String = normalize_reference_path(&self.raw_value);
        match self.kind {
            ReferenceKind::Path => path,
            ReferenceKind::ImagePath | ReferenceKind::MaskPath => {
                split_reference_path(&path).0.to_string()
            }
        }
    }

    fn unresolved(&self) -> RewriteError {
        RewriteError::UnresolvedReference {
            reference: self.raw_value.clone(),
        }
    }

    fn invalid(&self, reason: &'static str) -> RewriteError {
        RewriteError::InvalidReferenceFormat {
            reference: self.raw_value.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ReferenceTable {
        let mut table = ReferenceTable::new();
        table.add_reference("images", "cloud-123");
        table.add_reference(r"D:\scan\masks", "cloud-masks");
        table
    }

    #[test]
    fn test_path_local_to_cloud() {
        let reference = Reference::new(ReferenceKind::Path, "images");
        assert_eq!(
            reference.resolve(&table(), RewriteDirection::LocalToCloud).unwrap(),
            "rds:cloud-123"
        );
    }

    #[test]
    fn test_path_local_to_cloud_backslashes() {
        let reference = Reference::new(ReferenceKind::Path, r"D:\scan\masks\");
        assert_eq!(
            reference.resolve(&table(), RewriteDirection::LocalToCloud).unwrap(),
            "rds:cloud-masks"
        );
    }

    #[test]
    fn test_path_local_to_cloud_unresolved() {
        let reference = Reference::new(ReferenceKind::Path, "points");
        let err = reference
            .resolve(&table(), RewriteDirection::LocalToCloud)
            .unwrap_err();
        assert_eq!(
            err,
            RewriteError::UnresolvedReference {
                reference: "points".to_string()
            }
        );
    }

    #[test]
    fn test_path_cloud_to_local() {
        let reference = Reference::new(ReferenceKind::Path, "rds:cloud-masks");
        assert_eq!(
            reference.resolve(&table(), RewriteDirection::CloudToLocal).unwrap(),
            "D:/scan/masks"
        );
    }

    #[test]
    fn test_path_cloud_to_local_requires_prefix() {
        let reference = Reference::new(ReferenceKind::Path, "cloud-123");
        let err = reference
            .resolve(&table(), RewriteDirection::CloudToLocal)
            .unwrap_err();
        assert!(matches!(err, RewriteError::InvalidReferenceFormat { .. }));
        assert_eq!(err.reference(), Some("cloud-123"));
    }

    #[test]
    fn test_path_cloud_to_local_empty_id() {
        let reference = Reference::new(ReferenceKind::Path, "rds:");
        assert!(matches!(
            reference.resolve(&table(), RewriteDirection::CloudToLocal),
            Err(RewriteError::InvalidReferenceFormat { .. })
        ));
    }

    #[test]
    fn test_image_path_round_trip() {
        let table = table();
        let local = Reference::new(ReferenceKind::ImagePath, "images/IMG_0001.jpg");
        let cloud: String = local.resolve(&table, RewriteDirection::LocalToCloud).unwrap();
        assert_eq!(cloud, "cloud-123/IMG_0001.jpg");

        let back: String = Reference::new(ReferenceKind::ImagePath, cloud)
            .resolve(&table, RewriteDirection::CloudToLocal)
            .unwrap();
        assert_eq!(back, "images/IMG_0001.jpg");
    }

    #[test]
    fn test_mask_path_backslashes() {
        let reference = Reference::new(ReferenceKind::MaskPath, r"D:\scan\masks\m1.png");
        assert_eq!(
            reference.resolve(&table(), RewriteDirection::LocalToCloud).unwrap(),
            "cloud-masks/m1.png"
        );
    }

    #[test]
    fn test_image_path_without_directory_is_unresolved() {
        let reference = Reference::new(ReferenceKind::ImagePath, "IMG_0001.jpg");
        assert!(matches!(
            reference.resolve(&table(), RewriteDirection::LocalToCloud),
            Err(RewriteError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_image_path_cloud_without_file() {
        let reference = Reference::new(ReferenceKind::ImagePath, "cloud-123");
        assert!(matches!(
            reference.resolve(&table(), RewriteDirection::CloudToLocal),
            Err(RewriteError::InvalidReferenceFormat { .. })
        ));
    }

    #[test]
    fn test_image_path_cloud_unknown_id() {
        let reference = Reference::new(ReferenceKind::ImagePath, "cloud-999/IMG_0001.jpg");
        assert!(matches!(
            reference.resolve(&table(), RewriteDirection::CloudToLocal),
            Err(RewriteError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn test_dataset_path() {
        assert_eq!(
            Reference::new(ReferenceKind::ImagePath, r"scan\images\a.jpg").dataset_path(),
            "scan/images"
        );
        assert_eq!(Reference::new(ReferenceKind::Path, "images/").dataset_path(), "images");
    }
}
