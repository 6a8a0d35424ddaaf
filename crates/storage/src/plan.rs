//! Cloud side of the container enumerator.

use reality_transfer_common::{PlanEntry, TransferPlan, REFERENCE_SEPARATOR};

use crate::error::StorageError;
use crate::traits::{BlobInfo, ContainerClient};

/// Build a download plan from the blobs under `prefix`.
///
/// Relative names are the blob names with `prefix` and any leading
/// separator removed. Folder placeholders (names ending in `/`) and a blob
/// named exactly like the prefix are ignored. The listing order is kept.
///
/// # Errors
/// `NotFound` when a non-empty prefix matches nothing; listing errors are
/// returned untouched.
pub async fn plan_cloud_download<C: ContainerClient + ?Sized>(
    container: &C,
    prefix: &str,
) -> Result<TransferPlan, StorageError> {
    let blobs: Vec<BlobInfo> = container.list_blobs(prefix).await?;

    if blobs.is_empty() && !prefix.is_empty() {
        return Err(StorageError::NotFound {
            container: container.container_name().to_string(),
            name: prefix.to_string(),
        });
    }

    let mut entries: Vec<PlanEntry> = Vec::with_capacity(blobs.len());
    for blob in blobs {
        let Some(rest) = blob.name.strip_prefix(prefix) else {
            log::warn!(
                "Listing of '{}' returned unrelated blob {}",
                prefix,
                blob.name
            );
            continue;
        };
        let relative_name: &str = rest.trim_start_matches(REFERENCE_SEPARATOR);
        if relative_name.is_empty() || relative_name.ends_with(REFERENCE_SEPARATOR) {
            continue;
        }
        entries.push(PlanEntry::new(relative_name, blob.size));
    }

    let plan = TransferPlan::new(entries);
    log::debug!(
        "Planned {} blobs ({} bytes) under '{}' in {}",
        plan.len(),
        plan.total_bytes(),
        prefix,
        container.container_name()
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryContainer;

    fn container() -> MemoryContainer {
        let container = MemoryContainer::new("dataset-1");
        container.insert("scene/ContextScene.xml", vec![0u8; 12]);
        container.insert("scene/images/IMG_0001.jpg", vec![0u8; 30]);
        container.insert("scene/images/", Vec::new());
        container.insert("other/readme.txt", vec![0u8; 4]);
        container
    }

    #[tokio::test]
    async fn test_plan_strips_prefix() {
        let plan: TransferPlan = plan_cloud_download(&container(), "scene").await.unwrap();
        let names: Vec<&str> = plan.iter().map(|e| e.relative_name.as_str()).collect();

        assert_eq!(names, vec!["ContextScene.xml", "images/IMG_0001.jpg"]);
        assert_eq!(plan.total_bytes(), 42);
        assert!(plan.iter().all(|e| e.local_path.is_none()));
    }

    #[tokio::test]
    async fn test_plan_whole_container() {
        let plan: TransferPlan = plan_cloud_download(&container(), "").await.unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.entries()[0].relative_name, "other/readme.txt");
    }

    #[tokio::test]
    async fn test_plan_missing_prefix() {
        let err = plan_cloud_download(&container(), "missing/").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { ref name, .. } if name == "missing/"));
    }

    #[tokio::test]
    async fn test_plan_empty_container() {
        let plan = plan_cloud_download(&MemoryContainer::new("empty"), "").await.unwrap();
        assert!(plan.is_empty());
    }
}
