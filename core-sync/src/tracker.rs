//! # Progress Tracker
//!
//! Wraps every data extension batch in a durable [`SyncJob`].
//!
//! Tracking is best effort: if the job row cannot be written the batch runs
//! untracked, and later write failures are only logged.

use crate::{JobMetadata, JobType, SyncJob, SyncJobRepository};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// A running job and the instant its batch started
#[derive(Debug)]
pub struct TrackedBatch {
    job: SyncJob,
    started: Instant,
}

impl TrackedBatch {
    pub fn job(&self) -> &SyncJob {
        &self.job
    }
}

/// Creates and completes sync jobs around data extension batches
#[derive(Clone)]
pub struct ProgressTracker {
    jobs: Arc<dyn SyncJobRepository>,
}

impl ProgressTracker {
    pub fn new(jobs: Arc<dyn SyncJobRepository>) -> Self {
        Self { jobs }
    }

    /// Open a `running` job for a batch of `total` data extensions.
    ///
    /// Returns `None` for an empty batch, or when the job could not be
    /// stored.
    pub async fn start(
        &self,
        folder_id: &str,
        folder_name: &str,
        total: usize,
    ) -> Option<TrackedBatch> {
        if total == 0 {
            return None;
        }

        let job_type = JobType::DataRetentionUpdate;
        let metadata = JobMetadata::for_folder(folder_id, folder_name, job_type);
        let job = match SyncJob::new(job_type, total as u64, Some(metadata)).start() {
            Ok(job) => job,
            Err(e) => {
                warn!(folder_id, error = %e, "Failed to start sync job");
                return None;
            }
        };

        if let Err(e) = self.jobs.create(&job).await {
            warn!(folder_id, error = %e, "Failed to create sync job, batch runs untracked");
            return None;
        }

        debug!(job_id = %job.id, folder_id, total, "Sync job created");
        Some(TrackedBatch {
            job,
            started: Instant::now(),
        })
    }

    /// Record the outcome counts and complete the job.
    ///
    /// `succeeded` and `failed` count remote retention updates only.
    /// Returns the final job state, whether or not it could be stored.
    pub async fn finish(&self, batch: TrackedBatch, succeeded: u64, failed: u64) -> SyncJob {
        let TrackedBatch { mut job, started } = batch;
        let total = job.total_items;

        match job.update_progress(total, succeeded, failed) {
            Ok(()) => {
                if let Err(e) = self.jobs.update_progress(&job).await {
                    warn!(job_id = %job.id, error = %e, "Failed to update sync job progress");
                }
            }
            Err(e) => warn!(job_id = %job.id, error = %e, "Rejected sync job progress"),
        }

        let duration_ms = started.elapsed().as_millis() as i64;
        match job.clone().complete(duration_ms) {
            Ok(completed) => {
                if let Err(e) = self.jobs.complete(&completed).await {
                    warn!(job_id = %completed.id, error = %e, "Failed to complete sync job");
                } else {
                    debug!(job_id = %completed.id, duration_ms, "Sync job completed");
                }
                completed
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Rejected sync job completion");
                job
            }
        }
    }
}
