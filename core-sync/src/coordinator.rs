//! # Sync Engine
//!
//! Mirrors the remote folder hierarchy into the local store and pushes the
//! normalized retention policy to every data extension found on the way.
//!
//! ## Workflow
//!
//! 1. Fetch the root folder set from the catalog
//! 2. Persist the top-level folders (bounded pool, any failure is fatal)
//! 3. Persist the nested folders through the [`HierarchyResolver`]
//! 4. Walk every fetched folder (bounded pool). Each walk persists the
//!    folder, recurses into its children (bounded per node), then pages
//!    through its data extensions, persists them and pushes retention
//! 5. Return a [`SyncReport`] with the run metrics
//!
//! Apart from step 2 and the root fetch, failures are counted and logged
//! but never abort the run.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::SyncEngine;
//!
//! let engine = SyncEngine::new(catalog, folders, data_extensions, jobs, tuning);
//! let report = engine.run().await?;
//! println!("{} succeeded, {} failed", report.metrics.total_succeeded(), report.metrics.total_failed());
//! ```

use crate::fanout::run_bounded;
use crate::metrics::{SyncMetrics, SyncMetricsSnapshot};
use crate::resolver::HierarchyResolver;
use crate::retention::RetentionUpdater;
use crate::tracker::ProgressTracker;
use crate::{Result, SyncError, SyncJobRepository};
use bridge_traits::catalog::{RemoteCatalog, RemoteDataExtension, RemoteFolder};
use bridge_traits::error::Result as BridgeResult;
use core_library::{DataExtension, DataExtensionRepository, Folder, FolderRepository};
use core_runtime::config::SyncTuning;
use futures::future::{BoxFuture, FutureExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Summary of one sync run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub metrics: SyncMetricsSnapshot,
    /// Nested folders whose parent never appeared within the pass limit
    pub unresolved_folders: Vec<String>,
    /// Nested folders rejected by the store for reasons other than ordering
    pub dropped_folders: Vec<String>,
    pub duration_ms: u64,
}

/// Fetch every data extension of a folder.
///
/// Pages are 1-based. Paging stops at the first empty page or the first
/// page shorter than `page_size`.
pub(crate) async fn fetch_all_data_extensions(
    catalog: &dyn RemoteCatalog,
    folder_id: &str,
    page_size: u32,
) -> BridgeResult<Vec<RemoteDataExtension>> {
    let mut all = Vec::new();
    let mut page = 1;

    loop {
        let batch = catalog
            .list_data_extensions(folder_id, page, page_size)
            .await?;
        let fetched = batch.len();
        all.extend(batch);

        if fetched == 0 || fetched < page_size as usize {
            break;
        }
        page += 1;
    }

    Ok(all)
}

/// Result of processing one data extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LeafOutcome {
    Updated,
    UpdateFailed,
    PersistFailed,
}

struct EngineInner {
    catalog: Arc<dyn RemoteCatalog>,
    folders: Arc<dyn FolderRepository>,
    data_extensions: Arc<dyn DataExtensionRepository>,
    tracker: ProgressTracker,
    retention: RetentionUpdater,
    tuning: SyncTuning,
}

/// Hierarchy sync engine
///
/// Cheap to clone; clones share the same catalog and stores.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

impl SyncEngine {
    pub fn new(
        catalog: Arc<dyn RemoteCatalog>,
        folders: Arc<dyn FolderRepository>,
        data_extensions: Arc<dyn DataExtensionRepository>,
        jobs: Arc<dyn SyncJobRepository>,
        tuning: SyncTuning,
    ) -> Self {
        let retention = RetentionUpdater::new(catalog.clone(), data_extensions.clone());
        Self {
            inner: Arc::new(EngineInner {
                catalog,
                folders,
                data_extensions,
                tracker: ProgressTracker::new(jobs),
                retention,
                tuning,
            }),
        }
    }

    /// Run a full sync.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Provider`] if the root folder set cannot be fetched
    /// - [`SyncError::TopLevelPersist`] if a top-level folder cannot be stored
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<SyncReport> {
        let started = Instant::now();
        let inner = &self.inner;
        let metrics = Arc::new(SyncMetrics::new());

        let roots = inner
            .catalog
            .list_root_folders()
            .await
            .map_err(|e| SyncError::Provider(e.to_string()))?;

        let (top_level, nested): (Vec<RemoteFolder>, Vec<RemoteFolder>) =
            roots.iter().cloned().partition(RemoteFolder::is_top_level);

        info!(
            folders = roots.len(),
            top_level = top_level.len(),
            nested = nested.len(),
            "Starting sync"
        );

        self.persist_top_level(top_level, &metrics).await?;

        let resolver = HierarchyResolver::new(inner.folders.clone(), inner.tuning.resolver_passes);
        let resolved = resolver.resolve(&nested, &roots).await;
        debug!(
            saved = resolved.saved.len(),
            passes = resolved.passes,
            "Nested folders resolved"
        );

        run_bounded(roots, inner.tuning.root_walk_concurrency, |folder| {
            walk(self.inner.clone(), metrics.clone(), folder)
        })
        .await;

        let report = SyncReport {
            metrics: metrics.snapshot(),
            unresolved_folders: resolved.unresolved,
            dropped_folders: resolved.dropped,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            succeeded = report.metrics.total_succeeded(),
            failed = report.metrics.total_failed(),
            duration_ms = report.duration_ms,
            "Sync finished"
        );
        Ok(report)
    }

    /// Push the normalized retention policy to a single data extension.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Provider`] if the remote update fails. The
    /// failure is also recorded against the data extension.
    #[instrument(skip(self))]
    pub async fn update_retention(&self, data_extension_id: &str) -> Result<()> {
        self.inner
            .retention
            .apply(data_extension_id)
            .await
            .map_err(|e| SyncError::Provider(e.to_string()))
    }

    async fn persist_top_level(
        &self,
        top_level: Vec<RemoteFolder>,
        metrics: &Arc<SyncMetrics>,
    ) -> Result<()> {
        let ids: Vec<String> = top_level.iter().map(|f| f.id.clone()).collect();

        let outcomes = run_bounded(top_level, self.inner.tuning.top_level_concurrency, |folder| {
            let folders = self.inner.folders.clone();
            async move { folders.upsert(&Folder::from(&folder)).await }
        })
        .await;

        let mut first_failure = None;
        for (id, outcome) in ids.into_iter().zip(outcomes) {
            let message = match outcome {
                Some(Ok(())) => {
                    metrics.record_folder_success();
                    continue;
                }
                Some(Err(e)) => e.to_string(),
                None => "persist task panicked".to_string(),
            };

            metrics.record_folder_failure();
            error!(folder_id = %id, error = %message, "Failed to persist top-level folder");
            first_failure.get_or_insert(SyncError::TopLevelPersist {
                folder_id: id,
                message,
            });
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Persist `folder`, then its subtree, then its data extensions.
fn walk(
    inner: Arc<EngineInner>,
    metrics: Arc<SyncMetrics>,
    folder: RemoteFolder,
) -> BoxFuture<'static, ()> {
    async move {
        if let Err(e) = inner.folders.upsert(&Folder::from(&folder)).await {
            metrics.record_folder_failure();
            warn!(folder_id = %folder.id, error = %e, "Failed to persist folder, skipping subtree");
            return;
        }
        metrics.record_folder_success();

        let children = match inner.catalog.list_child_folders(&folder.id).await {
            Ok(children) => children,
            Err(e) => {
                warn!(folder_id = %folder.id, error = %e, "Failed to list child folders");
                Vec::new()
            }
        };

        if !children.is_empty() {
            debug!(folder_id = %folder.id, children = children.len(), "Walking child folders");
            run_bounded(children, inner.tuning.child_concurrency, |child| {
                let inner = inner.clone();
                let metrics = metrics.clone();
                async move {
                    match inner.folders.upsert(&Folder::from(&child)).await {
                        Ok(()) => {
                            metrics.record_sub_folder_success();
                            walk(inner, metrics, child).await;
                        }
                        Err(e) => {
                            metrics.record_sub_folder_failure();
                            warn!(folder_id = %child.id, error = %e, "Failed to persist sub-folder");
                        }
                    }
                }
            })
            .await;
        }

        let data_extensions = match fetch_all_data_extensions(
            inner.catalog.as_ref(),
            &folder.id,
            inner.tuning.page_size,
        )
        .await
        {
            Ok(data_extensions) => data_extensions,
            Err(e) => {
                warn!(folder_id = %folder.id, error = %e, "Failed to list data extensions");
                return;
            }
        };

        process_data_extensions(&inner, &metrics, &folder, data_extensions).await;
    }
    .boxed()
}

async fn process_data_extensions(
    inner: &Arc<EngineInner>,
    metrics: &SyncMetrics,
    folder: &RemoteFolder,
    data_extensions: Vec<RemoteDataExtension>,
) {
    if data_extensions.is_empty() {
        return;
    }

    let total = data_extensions.len();
    let batch = inner.tracker.start(&folder.id, &folder.name, total).await;

    let outcomes = run_bounded(
        data_extensions,
        inner.tuning.data_extension_concurrency,
        |remote| process_leaf(inner.clone(), remote),
    )
    .await;

    let mut updated = 0u64;
    let mut update_failed = 0u64;
    let mut failed = 0u64;
    for outcome in &outcomes {
        match outcome {
            Some(LeafOutcome::Updated) => updated += 1,
            Some(LeafOutcome::UpdateFailed) => {
                update_failed += 1;
                failed += 1;
            }
            Some(LeafOutcome::PersistFailed) | None => failed += 1,
        }
    }

    metrics.add_data_extensions(updated, failed);

    if let Some(batch) = batch {
        inner.tracker.finish(batch, updated, update_failed).await;
    }

    debug!(
        folder_id = %folder.id,
        total,
        updated,
        failed,
        "Data extension batch processed"
    );
}

async fn process_leaf(inner: Arc<EngineInner>, remote: RemoteDataExtension) -> LeafOutcome {
    if let Err(e) = inner
        .data_extensions
        .upsert(&DataExtension::from(&remote))
        .await
    {
        warn!(data_extension_id = %remote.id, error = %e, "Failed to persist data extension");
        return LeafOutcome::PersistFailed;
    }

    match inner.retention.apply(&remote.id).await {
        Ok(()) => LeafOutcome::Updated,
        Err(_) => LeafOutcome::UpdateFailed,
    }
}
