//! Integration tests for the sync engine
//!
//! These tests run full syncs against a scripted catalog and an in-memory
//! database and verify:
//! - Data extension paging
//! - Retention push outcomes in metrics, jobs and the retention table
//! - Parent-first persistence of nested folders
//! - Which failures abort a run and which are only counted

use async_trait::async_trait;
use bridge_traits::catalog::{
    RemoteCatalog, RemoteDataExtension, RemoteFolder, RetentionProperties,
};
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use core_library::db::create_test_pool;
use core_library::{
    DataExtensionRepository, FolderRepository, RetentionUpdateStatus,
    SqliteDataExtensionRepository, SqliteFolderRepository,
};
use core_runtime::config::SyncTuning;
use core_sync::{
    SqliteSyncJobRepository, SyncEngine, SyncError, SyncJobRepository, SyncStatus,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

// ============================================================================
// Scripted Catalog
// ============================================================================

#[derive(Default)]
struct ScriptedCatalog {
    roots: Vec<RemoteFolder>,
    roots_unavailable: bool,
    children: HashMap<String, Vec<RemoteFolder>>,
    broken_children: HashSet<String>,
    /// Pages served per folder, in order; anything past the script is empty
    pages: HashMap<String, Vec<Vec<RemoteDataExtension>>>,
    rejected_updates: HashSet<String>,
    page_calls: Mutex<HashMap<String, Vec<u32>>>,
    update_calls: Mutex<Vec<String>>,
}

impl ScriptedCatalog {
    fn page_calls(&self, folder_id: &str) -> Vec<u32> {
        self.page_calls
            .lock()
            .unwrap()
            .get(folder_id)
            .cloned()
            .unwrap_or_default()
    }

    fn update_calls(&self) -> usize {
        self.update_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteCatalog for ScriptedCatalog {
    async fn list_root_folders(&self) -> BridgeResult<Vec<RemoteFolder>> {
        if self.roots_unavailable {
            return Err(BridgeError::OperationFailed(
                "Service unavailable".to_string(),
            ));
        }
        Ok(self.roots.clone())
    }

    async fn list_child_folders(&self, folder_id: &str) -> BridgeResult<Vec<RemoteFolder>> {
        if self.broken_children.contains(folder_id) {
            return Err(BridgeError::OperationFailed("connection reset".to_string()));
        }
        Ok(self.children.get(folder_id).cloned().unwrap_or_default())
    }

    async fn list_data_extensions(
        &self,
        folder_id: &str,
        page: u32,
        _page_size: u32,
    ) -> BridgeResult<Vec<RemoteDataExtension>> {
        self.page_calls
            .lock()
            .unwrap()
            .entry(folder_id.to_string())
            .or_default()
            .push(page);

        Ok(self
            .pages
            .get(folder_id)
            .and_then(|pages| pages.get(page as usize - 1))
            .cloned()
            .unwrap_or_default())
    }

    async fn update_retention(
        &self,
        data_extension_id: &str,
        retention: &RetentionProperties,
    ) -> BridgeResult<()> {
        assert_eq!(*retention, RetentionProperties::normalized());
        self.update_calls
            .lock()
            .unwrap()
            .push(data_extension_id.to_string());

        if self.rejected_updates.contains(data_extension_id) {
            return Err(BridgeError::Rejected {
                status: 400,
                message: "Invalid retention settings".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn folder(id: &str, parent: &str) -> RemoteFolder {
    RemoteFolder {
        id: id.to_string(),
        parent_id: parent.to_string(),
        folder_type: "dataextension".to_string(),
        name: format!("Folder {id}"),
        description: String::new(),
        icon_type: "folder".to_string(),
        last_updated: None,
        created_by: 1,
    }
}

fn data_extension(id: &str, category_id: &str) -> RemoteDataExtension {
    RemoteDataExtension {
        id: id.to_string(),
        name: format!("DE {id}"),
        key: id.to_uppercase(),
        description: String::new(),
        is_active: true,
        is_sendable: false,
        sendable_custom_object_field: None,
        sendable_subscriber_field: None,
        is_testable: false,
        category_id: category_id.to_string(),
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
        row_count: 100,
        field_count: 4,
        retention: None,
        category_full_path_for_recycle_bin: None,
    }
}

struct Harness {
    catalog: Arc<ScriptedCatalog>,
    engine: SyncEngine,
    folders: Arc<SqliteFolderRepository>,
    data_extensions: Arc<SqliteDataExtensionRepository>,
    jobs: Arc<SqliteSyncJobRepository>,
}

async fn harness(catalog: ScriptedCatalog, tuning: SyncTuning) -> Harness {
    let pool = create_test_pool().await.unwrap();
    let catalog = Arc::new(catalog);
    let folders = Arc::new(SqliteFolderRepository::new(pool.clone()));
    let data_extensions = Arc::new(SqliteDataExtensionRepository::new(pool.clone()));
    let jobs = Arc::new(SqliteSyncJobRepository::new(pool));

    let engine = SyncEngine::new(
        catalog.clone(),
        folders.clone(),
        data_extensions.clone(),
        jobs.clone(),
        tuning,
    );

    Harness {
        catalog,
        engine,
        folders,
        data_extensions,
        jobs,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_full_page_then_empty_page_fetches_twice() {
    let catalog = ScriptedCatalog {
        roots: vec![folder("1", "0")],
        pages: HashMap::from([(
            "1".to_string(),
            vec![vec![
                data_extension("a", "1"),
                data_extension("b", "1"),
                data_extension("c", "1"),
            ]],
        )]),
        ..Default::default()
    };
    let tuning = SyncTuning {
        page_size: 3,
        ..SyncTuning::default()
    };
    let h = harness(catalog, tuning).await;

    let report = h.engine.run().await.unwrap();

    assert_eq!(h.catalog.page_calls("1"), vec![1, 2]);
    assert_eq!(h.data_extensions.count().await.unwrap(), 3);
    assert_eq!(report.metrics.data_extensions_succeeded, 3);
    assert_eq!(h.catalog.update_calls(), 3);
}

#[tokio::test]
async fn test_permanent_update_error_is_counted_not_fatal() {
    let catalog = ScriptedCatalog {
        roots: vec![folder("1", "0")],
        pages: HashMap::from([(
            "1".to_string(),
            vec![vec![data_extension("ok", "1"), data_extension("bad", "1")]],
        )]),
        rejected_updates: HashSet::from(["bad".to_string()]),
        ..Default::default()
    };
    let h = harness(catalog, SyncTuning::default()).await;

    let report = h.engine.run().await.unwrap();

    assert_eq!(report.metrics.data_extensions_succeeded, 1);
    assert_eq!(report.metrics.data_extensions_failed, 1);

    let jobs = h.jobs.find_by_status(SyncStatus::Completed).await.unwrap();
    assert_eq!(jobs.len(), 1);
    let job = &jobs[0];
    assert_eq!(job.total_items, 2);
    assert_eq!(job.processed_items, 2);
    assert_eq!(job.succeeded_items, 1);
    assert_eq!(job.failed_items, 1);
    assert_eq!(job.metadata.as_ref().unwrap().folder_id, "1");

    let bad = h
        .data_extensions
        .find_retention_state("bad")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bad.status(), Some(RetentionUpdateStatus::Failed));
    assert!(bad
        .last_api_update_error
        .unwrap()
        .contains("Invalid retention settings"));

    let ok = h
        .data_extensions
        .find_retention_state("ok")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ok.status(), Some(RetentionUpdateStatus::Succeeded));
}

#[tokio::test]
async fn test_metrics_account_for_every_attempt() {
    // A (top) -> B -> C; B is also in the root set. C holds two data
    // extensions plus one pointing at a folder that does not exist.
    let catalog = ScriptedCatalog {
        roots: vec![folder("A", "0"), folder("B", "A")],
        children: HashMap::from([
            ("A".to_string(), vec![folder("B", "A")]),
            ("B".to_string(), vec![folder("C", "B")]),
        ]),
        pages: HashMap::from([(
            "C".to_string(),
            vec![vec![
                data_extension("c1", "C"),
                data_extension("c2", "C"),
                data_extension("ghost", "missing"),
            ]],
        )]),
        ..Default::default()
    };
    let h = harness(catalog, SyncTuning::default()).await;

    let report = h.engine.run().await.unwrap();
    let m = report.metrics;

    // A twice (top-level stage, walk), B twice (walk from A, root walk),
    // C once per walk of B
    assert_eq!(m.folders_succeeded, 6);
    assert_eq!(m.folders_failed, 0);
    // B as child of A, C as child of B (twice)
    assert_eq!(m.sub_folders_succeeded, 3);
    assert_eq!(m.data_extensions_succeeded, 4);
    assert_eq!(m.data_extensions_failed, 2);

    let folder_attempts =
        m.folders_succeeded + m.folders_failed + m.sub_folders_succeeded + m.sub_folders_failed;
    let data_extension_attempts = m.data_extensions_succeeded + m.data_extensions_failed;
    assert_eq!(
        m.total_succeeded() + m.total_failed(),
        folder_attempts + data_extension_attempts
    );
    assert_eq!(folder_attempts + data_extension_attempts, 15);

    assert_eq!(h.folders.count().await.unwrap(), 3);
    assert_eq!(h.data_extensions.count().await.unwrap(), 2);

    // Persist failures are counted in metrics, not in the job counters
    for job in h.jobs.find_by_status(SyncStatus::Completed).await.unwrap() {
        assert_eq!(job.total_items, 3);
        assert_eq!(job.succeeded_items, 2);
        assert_eq!(job.failed_items, 0);
    }
}

#[tokio::test]
async fn test_nested_folders_are_stored_parent_first() {
    let catalog = ScriptedCatalog {
        roots: vec![folder("C", "B"), folder("B", "A"), folder("A", "0")],
        ..Default::default()
    };
    let h = harness(catalog, SyncTuning::default()).await;

    let report = h.engine.run().await.unwrap();

    assert!(report.unresolved_folders.is_empty());
    assert!(report.dropped_folders.is_empty());
    assert_eq!(h.folders.count().await.unwrap(), 3);

    let c = h.folders.find_by_id("C").await.unwrap().unwrap();
    assert_eq!(c.parent_id.as_deref(), Some("B"));
    let a = h.folders.find_by_id("A").await.unwrap().unwrap();
    assert_eq!(a.parent_id, None);
}

#[tokio::test]
async fn test_orphan_folder_is_reported_and_counted() {
    let catalog = ScriptedCatalog {
        roots: vec![folder("A", "0"), folder("orphan", "elsewhere")],
        ..Default::default()
    };
    let h = harness(catalog, SyncTuning::default()).await;

    let report = h.engine.run().await.unwrap();

    assert_eq!(report.unresolved_folders, vec!["orphan"]);
    assert_eq!(report.metrics.folders_failed, 1);
    assert!(h.folders.find_by_id("orphan").await.unwrap().is_none());
}

#[tokio::test]
async fn test_top_level_persist_failure_aborts_run() {
    let catalog = ScriptedCatalog {
        roots: vec![folder("", "0"), folder("fine", "0")],
        ..Default::default()
    };
    let h = harness(catalog, SyncTuning::default()).await;

    let err = h.engine.run().await.unwrap_err();

    assert!(matches!(err, SyncError::TopLevelPersist { ref folder_id, .. } if folder_id.is_empty()));
    assert_eq!(h.catalog.page_calls("fine"), Vec::<u32>::new());
}

#[tokio::test]
async fn test_root_fetch_failure_aborts_run() {
    let catalog = ScriptedCatalog {
        roots_unavailable: true,
        ..Default::default()
    };
    let h = harness(catalog, SyncTuning::default()).await;

    assert!(matches!(
        h.engine.run().await,
        Err(SyncError::Provider(_))
    ));
}

#[tokio::test]
async fn test_child_listing_failure_still_processes_folder() {
    let catalog = ScriptedCatalog {
        roots: vec![folder("1", "0")],
        broken_children: HashSet::from(["1".to_string()]),
        pages: HashMap::from([("1".to_string(), vec![vec![data_extension("x", "1")]])]),
        ..Default::default()
    };
    let h = harness(catalog, SyncTuning::default()).await;

    let report = h.engine.run().await.unwrap();

    assert_eq!(report.metrics.sub_folders_succeeded, 0);
    assert_eq!(report.metrics.data_extensions_succeeded, 1);
}

#[tokio::test]
async fn test_single_update_reports_rejection() {
    let catalog = ScriptedCatalog {
        rejected_updates: HashSet::from(["locked".to_string()]),
        ..Default::default()
    };
    let h = harness(catalog, SyncTuning::default()).await;

    h.engine.update_retention("open").await.unwrap();
    assert!(matches!(
        h.engine.update_retention("locked").await,
        Err(SyncError::Provider(_))
    ));
    assert_eq!(h.catalog.update_calls(), 2);
}
