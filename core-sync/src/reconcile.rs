//! # Retention Reconciliation
//!
//! Retries retention pushes that are still `pending` or `failed` in the
//! local store, skipping rows that have reached the retry ceiling.

use crate::fanout::run_bounded;
use crate::retention::RetentionUpdater;
use crate::Result;
use bridge_traits::catalog::RemoteCatalog;
use core_library::DataExtensionRepository;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};

const RECONCILE_CONCURRENCY: usize = 10;

/// Counts from one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct RetentionReconciler {
    data_extensions: Arc<dyn DataExtensionRepository>,
    updater: RetentionUpdater,
    max_retries: u32,
}

impl RetentionReconciler {
    pub fn new(
        catalog: Arc<dyn RemoteCatalog>,
        data_extensions: Arc<dyn DataExtensionRepository>,
        max_retries: u32,
    ) -> Self {
        let updater = RetentionUpdater::new(catalog, data_extensions.clone());
        Self {
            data_extensions,
            updater,
            max_retries,
        }
    }

    /// Re-apply the normalized policy to at most `limit` candidates.
    ///
    /// # Errors
    ///
    /// Returns an error only if the candidates cannot be loaded.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, limit: usize) -> Result<ReconcileReport> {
        let candidates = self
            .data_extensions
            .find_retry_candidates(self.max_retries, limit)
            .await?;

        let ids: Vec<String> = candidates
            .into_iter()
            .map(|state| state.data_extension_id)
            .collect();
        let attempted = ids.len();

        let outcomes = run_bounded(ids, RECONCILE_CONCURRENCY, |id| {
            let updater = self.updater.clone();
            async move { updater.apply(&id).await.is_ok() }
        })
        .await;

        let succeeded = outcomes.iter().filter(|o| matches!(o, Some(true))).count();
        let report = ReconcileReport {
            attempted,
            succeeded,
            failed: attempted - succeeded,
        };

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            "Reconciliation finished"
        );
        Ok(report)
    }
}
