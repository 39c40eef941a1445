//! # Top Data Extensions Report
//!
//! Lists the largest live data extensions of the account by row count,
//! straight from the remote catalog, and writes them out as JSON.

use crate::coordinator::fetch_all_data_extensions;
use crate::{Result, SyncError};
use bridge_traits::catalog::{RemoteCatalog, RemoteDataExtension};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument, warn};

const DEFAULT_FILE_STEM: &str = "export";

pub struct TopDataExtensionsReport {
    catalog: Arc<dyn RemoteCatalog>,
    page_size: u32,
}

impl TopDataExtensionsReport {
    pub fn new(catalog: Arc<dyn RemoteCatalog>, page_size: u32) -> Self {
        Self { catalog, page_size }
    }

    /// Collect the `top` largest data extensions outside the recycle bin.
    ///
    /// # Errors
    ///
    /// Fails if the root folders or any folder's data extensions cannot be
    /// listed. A failed child folder listing only skips that branch.
    #[instrument(skip(self))]
    pub async fn build(&self, top: usize) -> Result<TopDataExtensions> {
        let folder_ids = self.collect_folder_ids().await?;
        info!(folders = folder_ids.len(), "Folder set collected");

        let mut all = Vec::new();
        for folder_id in &folder_ids {
            let data_extensions =
                fetch_all_data_extensions(self.catalog.as_ref(), folder_id, self.page_size)
                    .await
                    .map_err(|e| {
                        SyncError::Provider(format!("folder {folder_id}: {e}"))
                    })?;
            all.extend(data_extensions.into_iter().filter(|de| !de.is_in_recycle_bin()));
        }
        info!(data_extensions = all.len(), "Data extensions collected");

        all.sort_by(|a, b| b.row_count.cmp(&a.row_count));
        all.truncate(top);

        Ok(TopDataExtensions {
            data_extensions: all,
        })
    }

    /// Breadth-first walk from the root set; every id is visited once.
    async fn collect_folder_ids(&self) -> Result<Vec<String>> {
        let roots = self
            .catalog
            .list_root_folders()
            .await
            .map_err(|e| SyncError::Provider(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        for folder in roots {
            if seen.insert(folder.id.clone()) {
                order.push(folder.id.clone());
                queue.push_back(folder.id);
            }
        }

        while let Some(id) = queue.pop_front() {
            let children = match self.catalog.list_child_folders(&id).await {
                Ok(children) => children,
                Err(e) => {
                    warn!(folder_id = %id, error = %e, "Failed to list child folders");
                    continue;
                }
            };

            for child in children {
                if seen.insert(child.id.clone()) {
                    order.push(child.id.clone());
                    queue.push_back(child.id);
                }
            }
        }

        Ok(order)
    }
}

/// Result of [`TopDataExtensionsReport::build`], largest first
#[derive(Debug, Clone)]
pub struct TopDataExtensions {
    pub data_extensions: Vec<RemoteDataExtension>,
}

impl TopDataExtensions {
    /// Write the list as pretty-printed JSON to `<dir>/<account_id>.json`,
    /// or `<dir>/export.json` without an account id. Creates `dir` if needed.
    pub fn write_json(&self, dir: &Path, account_id: Option<&str>) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .map_err(|e| SyncError::Export(format!("create {}: {e}", dir.display())))?;

        let stem = account_id
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_FILE_STEM);
        let path = dir.join(format!("{stem}.json"));

        let payload = serde_json::to_string_pretty(&self.data_extensions)
            .map_err(|e| SyncError::Export(e.to_string()))?;
        std::fs::write(&path, payload)
            .map_err(|e| SyncError::Export(format!("write {}: {e}", path.display())))?;

        info!(path = %path.display(), count = self.data_extensions.len(), "Export written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::catalog::{RemoteFolder, RetentionProperties};
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn folder(id: &str, parent: &str) -> RemoteFolder {
        RemoteFolder {
            id: id.to_string(),
            parent_id: parent.to_string(),
            folder_type: "dataextension".to_string(),
            name: id.to_string(),
            description: String::new(),
            icon_type: String::new(),
            last_updated: None,
            created_by: 1,
        }
    }

    fn data_extension(id: &str, folder: &str, rows: i64, recycled: bool) -> RemoteDataExtension {
        RemoteDataExtension {
            id: id.to_string(),
            name: id.to_string(),
            key: id.to_string(),
            description: String::new(),
            is_active: true,
            is_sendable: false,
            sendable_custom_object_field: None,
            sendable_subscriber_field: None,
            is_testable: false,
            category_id: folder.to_string(),
            owner_id: 1,
            is_object_deletable: true,
            is_field_addition_allowed: true,
            is_field_modification_allowed: true,
            created_date: None,
            created_by_id: 1,
            created_by_name: None,
            modified_date: None,
            modified_by_id: None,
            modified_by_name: None,
            owner_name: None,
            partner_api_object_type_id: None,
            partner_api_object_type_name: None,
            row_count: rows,
            field_count: 1,
            retention: None,
            category_full_path_for_recycle_bin: recycled.then(|| "Data Extensions/Old".to_string()),
        }
    }

    struct TreeCatalog {
        roots: Vec<RemoteFolder>,
        children: HashMap<String, Vec<RemoteFolder>>,
        broken_children: HashSet<String>,
        leaves: HashMap<String, Vec<RemoteDataExtension>>,
        child_calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RemoteCatalog for TreeCatalog {
        async fn list_root_folders(&self) -> BridgeResult<Vec<RemoteFolder>> {
            Ok(self.roots.clone())
        }

        async fn list_child_folders(&self, folder_id: &str) -> BridgeResult<Vec<RemoteFolder>> {
            self.child_calls.lock().unwrap().push(folder_id.to_string());
            if self.broken_children.contains(folder_id) {
                return Err(BridgeError::OperationFailed("connection reset".to_string()));
            }
            Ok(self.children.get(folder_id).cloned().unwrap_or_default())
        }

        async fn list_data_extensions(
            &self,
            folder_id: &str,
            page: u32,
            page_size: u32,
        ) -> BridgeResult<Vec<RemoteDataExtension>> {
            let all = self.leaves.get(folder_id).cloned().unwrap_or_default();
            let start = ((page - 1) * page_size) as usize;
            Ok(all.into_iter().skip(start).take(page_size as usize).collect())
        }

        async fn update_retention(
            &self,
            _data_extension_id: &str,
            _retention: &RetentionProperties,
        ) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn catalog() -> TreeCatalog {
        // "b" is reported both as a root and as a child of "a"
        let roots = vec![folder("a", "0"), folder("b", "a"), folder("broken", "0")];
        let children = HashMap::from([
            ("a".to_string(), vec![folder("b", "a"), folder("c", "a")]),
            ("c".to_string(), vec![folder("d", "c")]),
        ]);
        let leaves = HashMap::from([
            (
                "a".to_string(),
                vec![
                    data_extension("a1", "a", 10, false),
                    data_extension("a2", "a", 500, true),
                    data_extension("a3", "a", 30, false),
                ],
            ),
            ("d".to_string(), vec![data_extension("d1", "d", 70, false)]),
            ("b".to_string(), vec![data_extension("b1", "b", 20, false)]),
        ]);

        TreeCatalog {
            roots,
            children,
            broken_children: HashSet::from(["broken".to_string()]),
            leaves,
            child_calls: Mutex::new(Vec::new()),
        }
    }

    #[tokio::test]
    async fn test_visits_each_folder_once() {
        let catalog = Arc::new(catalog());
        let report = TopDataExtensionsReport::new(catalog.clone(), 2);

        let ids = report.collect_folder_ids().await.unwrap();

        assert_eq!(ids, vec!["a", "b", "broken", "c", "d"]);
        assert_eq!(catalog.child_calls.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_top_excludes_recycle_bin_and_sorts() {
        let report = TopDataExtensionsReport::new(Arc::new(catalog()), 2);

        let top = report.build(3).await.unwrap();
        let ids: Vec<_> = top.data_extensions.iter().map(|de| de.id.as_str()).collect();

        assert_eq!(ids, vec!["d1", "a3", "b1"]);
    }

    #[test]
    fn test_write_json_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("exports");
        let top = TopDataExtensions {
            data_extensions: vec![data_extension("x", "f", 5, false)],
        };

        let path = top.write_json(&out, Some("5100")).unwrap();
        assert_eq!(path, out.join("5100.json"));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written[0]["id"], "x");
        assert_eq!(written[0]["row_count"], 5);

        let path = top.write_json(&out, None).unwrap();
        assert_eq!(path, out.join("export.json"));
    }
}
