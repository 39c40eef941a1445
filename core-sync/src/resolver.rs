//! # Hierarchy Resolver
//!
//! Persists a flat folder batch in an order that satisfies the parent
//! foreign key.
//!
//! The root query returns folders in arbitrary order, so a child may arrive
//! before its parent. Each pass persists every node whose parent is already
//! saved (or is outside the known set) and defers the rest. A node that hits
//! a foreign-key violation is deferred as well. Any other write error drops
//! the node for the rest of the run.

use bridge_traits::catalog::{is_root_parent, RemoteFolder};
use core_library::{Folder, FolderRepository};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Outcome of one resolution run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    /// Folder ids in commit order
    pub saved: Vec<String>,
    /// Ids still unsaved when the pass ceiling was reached
    pub unresolved: Vec<String>,
    /// Ids that failed with an error other than a missing parent
    pub dropped: Vec<String>,
    /// Passes executed
    pub passes: usize,
}

impl ResolveReport {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty() && self.dropped.is_empty()
    }
}

pub struct HierarchyResolver {
    folders: Arc<dyn FolderRepository>,
    max_passes: usize,
}

impl HierarchyResolver {
    pub fn new(folders: Arc<dyn FolderRepository>, max_passes: usize) -> Self {
        Self {
            folders,
            max_passes: max_passes.max(1),
        }
    }

    /// Persist `batch` in dependency order.
    ///
    /// `known` is the full folder set the batch was taken from. Top-level
    /// members of `known` that are not in `batch` count as already saved.
    #[instrument(skip(self, batch, known), fields(batch = batch.len()))]
    pub async fn resolve(&self, batch: &[RemoteFolder], known: &[RemoteFolder]) -> ResolveReport {
        let known_ids: HashSet<&str> = known.iter().map(|f| f.id.as_str()).collect();
        let batch_ids: HashSet<&str> = batch.iter().map(|f| f.id.as_str()).collect();

        let mut saved: HashSet<String> = known
            .iter()
            .filter(|f| f.is_top_level() && !batch_ids.contains(f.id.as_str()))
            .map(|f| f.id.clone())
            .collect();

        let mut report = ResolveReport::default();
        let mut pending: Vec<&RemoteFolder> = batch.iter().collect();

        while !pending.is_empty() && report.passes < self.max_passes {
            report.passes += 1;
            let mut deferred = Vec::new();

            for node in pending {
                let parent = node.parent_id.as_str();
                let waits_on_parent =
                    !is_root_parent(parent) && known_ids.contains(parent) && !saved.contains(parent);

                if waits_on_parent {
                    deferred.push(node);
                    continue;
                }

                match self.folders.upsert(&Folder::from(node)).await {
                    Ok(()) => {
                        saved.insert(node.id.clone());
                        report.saved.push(node.id.clone());
                    }
                    Err(e) if e.is_parent_missing() => {
                        debug!(folder_id = %node.id, parent_id = parent, "Parent not stored yet, deferring");
                        deferred.push(node);
                    }
                    Err(e) => {
                        warn!(folder_id = %node.id, error = %e, "Dropping folder after write failure");
                        report.dropped.push(node.id.clone());
                    }
                }
            }

            debug!(
                pass = report.passes,
                deferred = deferred.len(),
                "Resolution pass finished"
            );
            pending = deferred;
        }

        if !pending.is_empty() {
            report.unresolved = pending.iter().map(|f| f.id.clone()).collect();
            warn!(
                unresolved = ?report.unresolved,
                passes = report.passes,
                "Folders left unresolved after pass limit"
            );
        }

        report
    }
}
