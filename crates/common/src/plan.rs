//! Transfer plans: the ordered, size-annotated list of files a session moves.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One file of a transfer plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Name relative to the transfer root, always `/`-separated.
    pub relative_name: String,
    /// Size in bytes at planning time.
    pub byte_size: u64,
    /// Local source file (local plans only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<PathBuf>,
}

impl PlanEntry {
    /// Create an entry for a cloud blob.
    pub fn new(relative_name: impl Into<String>, byte_size: u64) -> Self {
        Self {
            relative_name: relative_name.into(),
            byte_size,
            local_path: None,
        }
    }

    /// Create an entry backed by a local file.
    pub fn local(relative_name: impl Into<String>, byte_size: u64, path: impl AsRef<Path>) -> Self {
        Self {
            relative_name: relative_name.into(),
            byte_size,
            local_path: Some(path.as_ref().to_path_buf()),
        }
    }
}

/// Immutable, ordered list of files plus their total size.
///
/// Serialized as the bare entry list; the total is recomputed on load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PlanEntry>", into = "Vec<PlanEntry>")]
pub struct TransferPlan {
    entries: Vec<PlanEntry>,
    total_bytes: u64,
}

impl TransferPlan {
    /// Build a plan; the total is computed from the entries.
    pub fn new(entries: Vec<PlanEntry>) -> Self {
        let total_bytes: u64 = entries.iter().map(|e| e.byte_size).sum();
        Self {
            entries,
            total_bytes,
        }
    }

    /// Entries in transfer order.
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    /// Sum of all planned sizes.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the plan has no files.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in transfer order.
    pub fn iter(&self) -> std::slice::Iter<'_, PlanEntry> {
        self.entries.iter()
    }
}

impl From<Vec<PlanEntry>> for TransferPlan {
    fn from(entries: Vec<PlanEntry>) -> Self {
        Self::new(entries)
    }
}

impl From<TransferPlan> for Vec<PlanEntry> {
    fn from(plan: TransferPlan) -> Self {
        plan.entries
    }
}

impl<'a> IntoIterator for &'a TransferPlan {
    type Item = &'a PlanEntry;
    type IntoIter = std::slice::Iter<'a, PlanEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_bytes() {
        let plan = TransferPlan::new(vec![
            PlanEntry::new("a.jpg", 10),
            PlanEntry::new("b/c.jpg", 20),
            PlanEntry::new("d.jpg", 30),
        ]);
        assert_eq!(plan.total_bytes(), 60);
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.entries()[1].relative_name, "b/c.jpg");
    }

    #[test]
    fn test_plan_json_recomputes_total() {
        let json = r#"[
            {"relative_name": "scene/ContextScene.xml", "byte_size": 12},
            {"relative_name": "images/a.jpg", "byte_size": 30}
        ]"#;
        let plan: TransferPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.total_bytes(), 42);
        assert_eq!(plan.entries()[0].local_path, None);

        let written: String = serde_json::to_string(&plan).unwrap();
        assert!(written.starts_with("[{\"relative_name\":\"scene/ContextScene.xml\""));
        assert!(!written.contains("local_path"));
    }

    #[test]
    fn test_empty_plan() {
        let plan = TransferPlan::default();
        assert!(plan.is_empty());
        assert_eq!(plan.total_bytes(), 0);
    }
}
