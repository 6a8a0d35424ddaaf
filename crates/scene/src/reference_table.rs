//! Bidirectional local path <-> cloud id lookup.

use std::collections::HashMap;

use reality_transfer_common::{normalize_reference_path, split_reference_path};

/// Mapping between local dataset paths and cloud dataset ids.
///
/// Both directions are always updated together. Local paths are stored
/// normalized (`/` separators, no trailing slash); ids are stored verbatim.
///
/// The table is owned by one transfer session at a time and is not
/// synchronized.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    local_to_cloud: HashMap<String, String>,
    cloud_to_local: HashMap<String, String>,
}

impl ReferenceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a local path / cloud id pair.
    ///
    /// Re-inserting a local path with a different id replaces the old pair
    /// in both directions (last write wins).
    ///
    /// # Arguments
    /// * `local_path` - Local dataset path, any separator style
    /// * `cloud_id` - Cloud dataset identifier
    pub fn add_reference(&mut self, local_path: impl AsRef<str>, cloud_id: impl Into<String>) {
        let local: String = normalize_reference_path(local_path.as_ref());
        let cloud: String = cloud_id.into();

        if let Some(previous_cloud) = self.local_to_cloud.get(&local) {
            if *previous_cloud != cloud {
                self.cloud_to_local.remove(previous_cloud);
            }
        }
        if let Some(previous_local) = self.cloud_to_local.get(&cloud) {
            if *previous_local != local {
                self.local_to_cloud.remove(previous_local);
            }
        }

        self.local_to_cloud.insert(local.clone(), cloud.clone());
        self.cloud_to_local.insert(cloud, local);
    }

    /// Look up the cloud id of a local path (exact match after normalization).
    pub fn get_cloud_id_from_local_path(&self, local_path: &str) -> Option<&str> {
        self.local_to_cloud
            .get(&normalize_reference_path(local_path))
            .map(String::as_str)
    }

    /// Look up the local path of a cloud id (exact match).
    pub fn get_local_path_from_cloud_id(&self, cloud_id: &str) -> Option<&str> {
        self.cloud_to_local.get(cloud_id).map(String::as_str)
    }

    /// Find the closest registered ancestor directory of `path`.
    ///
    /// Walks up from the directory containing `path` and returns the first
    /// directory present in the table together with the remainder of `path`
    /// below it.
    ///
    /// # Arguments
    /// * `path` - Normalized file path, e.g. `scan/images/sub/a.jpg`
    ///
    /// # Returns
    /// `(cloud_id, remainder)`, e.g. `("cloud-1", "sub/a.jpg")` when
    /// `scan/images` is registered.
    pub fn find_containing_dataset<'p>(&self, path: &'p str) -> Option<(&str, &'p str)> {
        let mut candidate: &str = path;
        loop {
            let (dir, _) = split_reference_path(candidate);
            if dir.is_empty() {
                return None;
            }
            if let Some(cloud_id) = self.local_to_cloud.get(dir) {
                return Some((cloud_id.as_str(), &path[dir.len() + 1..]));
            }
            candidate = dir;
        }
    }

    /// Number of pairs in the table.
    pub fn len(&self) -> usize {
        self.local_to_cloud.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.local_to_cloud.is_empty()
    }

    /// Iterate over `(local_path, cloud_id)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.local_to_cloud
            .iter()
            .map(|(local, cloud)| (local.as_str(), cloud.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup_both_directions() {
        let mut table = ReferenceTable::new();
        table.add_reference("images", "cloud-123");

        assert_eq!(table.get_cloud_id_from_local_path("images"), Some("cloud-123"));
        assert_eq!(table.get_local_path_from_cloud_id("cloud-123"), Some("images"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_paths_are_normalized() {
        let mut table = ReferenceTable::new();
        table.add_reference(r"C:\scan\images\", "cloud-1");

        assert_eq!(table.get_local_path_from_cloud_id("cloud-1"), Some("C:/scan/images"));
        assert_eq!(table.get_cloud_id_from_local_path("C:/scan/images/"), Some("cloud-1"));
        assert_eq!(table.get_cloud_id_from_local_path(r"C:\scan\images"), Some("cloud-1"));
    }

    #[test]
    fn test_missing_entries_return_none() {
        let table = ReferenceTable::new();
        assert!(table.get_cloud_id_from_local_path("images").is_none());
        assert!(table.get_local_path_from_cloud_id("cloud-1").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_same_pair_is_idempotent() {
        let mut table = ReferenceTable::new();
        table.add_reference("images", "cloud-1");
        table.add_reference("images/", "cloud-1");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reinsert_local_path_last_write_wins() {
        let mut table = ReferenceTable::new();
        table.add_reference("images", "cloud-old");
        table.add_reference("images", "cloud-new");

        assert_eq!(table.get_cloud_id_from_local_path("images"), Some("cloud-new"));
        assert_eq!(table.get_local_path_from_cloud_id("cloud-new"), Some("images"));
        assert!(table.get_local_path_from_cloud_id("cloud-old").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reinsert_cloud_id_keeps_maps_consistent() {
        let mut table = ReferenceTable::new();
        table.add_reference("old/images", "cloud-1");
        table.add_reference("new/images", "cloud-1");

        assert!(table.get_cloud_id_from_local_path("old/images").is_none());
        assert_eq!(table.get_local_path_from_cloud_id("cloud-1"), Some("new/images"));
        assert_eq!(table.iter().count(), 1);
    }

    #[test]
    fn test_find_containing_dataset() {
        let mut table = ReferenceTable::new();
        table.add_reference("scan/images", "cloud-1");

        assert_eq!(
            table.find_containing_dataset("scan/images/IMG_0001.jpg"),
            Some(("cloud-1", "IMG_0001.jpg"))
        );
        assert_eq!(
            table.find_containing_dataset("scan/images/left/IMG_0001.jpg"),
            Some(("cloud-1", "left/IMG_0001.jpg"))
        );
        assert_eq!(table.find_containing_dataset("other/IMG_0001.jpg"), None);
        assert_eq!(table.find_containing_dataset("IMG_0001.jpg"), None);
    }
}
