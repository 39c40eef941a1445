//! Run-wide success and failure counters.
//!
//! Six counters live behind one mutex so that totals are always read from a
//! consistent state. The lock is never held across an await point.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetricsSnapshot {
    pub folders_succeeded: u64,
    pub folders_failed: u64,
    pub sub_folders_succeeded: u64,
    pub sub_folders_failed: u64,
    pub data_extensions_succeeded: u64,
    pub data_extensions_failed: u64,
}

impl SyncMetricsSnapshot {
    pub fn total_succeeded(&self) -> u64 {
        self.folders_succeeded + self.sub_folders_succeeded + self.data_extensions_succeeded
    }

    pub fn total_failed(&self) -> u64 {
        self.folders_failed + self.sub_folders_failed + self.data_extensions_failed
    }
}

/// Counters shared by every task of one sync run
#[derive(Debug, Default)]
pub struct SyncMetrics {
    counters: Mutex<SyncMetricsSnapshot>,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still holds valid counters.
    fn lock(&self) -> MutexGuard<'_, SyncMetricsSnapshot> {
        self.counters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record_folder_success(&self) {
        self.lock().folders_succeeded += 1;
    }

    pub fn record_folder_failure(&self) {
        self.lock().folders_failed += 1;
    }

    pub fn record_sub_folder_success(&self) {
        self.lock().sub_folders_succeeded += 1;
    }

    pub fn record_sub_folder_failure(&self) {
        self.lock().sub_folders_failed += 1;
    }

    /// Add a whole batch of data extension outcomes at once
    pub fn add_data_extensions(&self, succeeded: u64, failed: u64) {
        let mut counters = self.lock();
        counters.data_extensions_succeeded += succeeded;
        counters.data_extensions_failed += failed;
    }

    pub fn total_succeeded(&self) -> u64 {
        self.lock().total_succeeded()
    }

    pub fn total_failed(&self) -> u64 {
        self.lock().total_failed()
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_and_totals() {
        let metrics = SyncMetrics::new();

        metrics.record_folder_success();
        metrics.record_folder_failure();
        metrics.record_sub_folder_success();
        metrics.record_sub_folder_success();
        metrics.add_data_extensions(0, 1);
        metrics.add_data_extensions(5, 2);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.folders_succeeded, 1);
        assert_eq!(snapshot.sub_folders_succeeded, 2);
        assert_eq!(snapshot.data_extensions_succeeded, 5);
        assert_eq!(snapshot.data_extensions_failed, 3);
        assert_eq!(metrics.total_succeeded(), 8);
        assert_eq!(metrics.total_failed(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let metrics = Arc::new(SyncMetrics::new());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let metrics = Arc::clone(&metrics);
                tokio::spawn(async move {
                    for _ in 0..250 {
                        if i % 2 == 0 {
                            metrics.record_folder_success();
                        } else {
                            metrics.add_data_extensions(0, 1);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(metrics.total_succeeded(), 1000);
        assert_eq!(metrics.total_failed(), 1000);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = SyncMetrics::new();
        metrics.record_sub_folder_failure();

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["sub_folders_failed"], 1);
    }
}
