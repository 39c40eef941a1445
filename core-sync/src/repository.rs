//! # Sync Job Repository
//!
//! Provides database persistence for sync jobs.
//!
//! A job row is written three times over its life: on creation, when the
//! batch counters are known, and on completion.

use crate::{JobMetadata, JobType, Result, SyncError, SyncJob, SyncJobId, SyncStatus};
use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use tracing::warn;

// ============================================================================
// Repository Trait
// ============================================================================

/// Repository trait for sync job persistence
#[async_trait]
pub trait SyncJobRepository: Send + Sync {
    /// Insert a new sync job
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn create(&self, job: &SyncJob) -> Result<()>;

    /// Persist the processed, succeeded and failed counters of a job
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::JobNotFound`] if no row has the job's id
    async fn update_progress(&self, job: &SyncJob) -> Result<()>;

    /// Persist the terminal state of a job with its timing
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::JobNotFound`] if no row has the job's id
    async fn complete(&self, job: &SyncJob) -> Result<()>;

    /// Find a sync job by ID
    async fn find_by_id(&self, id: &SyncJobId) -> Result<Option<SyncJob>>;

    /// Get sync jobs by status, newest first
    async fn find_by_status(&self, status: SyncStatus) -> Result<Vec<SyncJob>>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of SyncJobRepository
pub struct SqliteSyncJobRepository {
    pool: SqlitePool,
}

impl SqliteSyncJobRepository {
    /// Create a new SQLite sync job repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a sync job
#[derive(Debug, FromRow)]
struct SyncJobRow {
    id: String,
    job_type: String,
    status: String,
    total_items: i64,
    processed_items: i64,
    succeeded_items: i64,
    failed_items: i64,
    metadata: Option<String>,
    error_message: Option<String>,
    started_at: Option<i64>,
    completed_at: Option<i64>,
    created_at: i64,
    duration_ms: Option<i64>,
    avg_processing_time_ms: Option<i64>,
}

impl TryFrom<SyncJobRow> for SyncJob {
    type Error = SyncError;

    fn try_from(row: SyncJobRow) -> Result<Self> {
        let job_type: JobType = row.job_type.parse()?;
        let status: SyncStatus = row.status.parse()?;

        let metadata = match row.metadata.as_deref() {
            Some(raw) => match serde_json::from_str::<JobMetadata>(raw) {
                Ok(meta) => Some(meta),
                Err(e) => {
                    warn!(job_id = %row.id, error = %e, "Unreadable job metadata");
                    None
                }
            },
            None => None,
        };

        Ok(SyncJob {
            id: SyncJobId::from_string(&row.id)?,
            job_type,
            status,
            total_items: row.total_items as u64,
            processed_items: row.processed_items as u64,
            succeeded_items: row.succeeded_items as u64,
            failed_items: row.failed_items as u64,
            metadata,
            error_message: row.error_message,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_ms: row.duration_ms,
            avg_processing_time_ms: row.avg_processing_time_ms,
        })
    }
}

const SELECT_JOB: &str = r#"
    SELECT id, job_type, status,
           total_items, processed_items, succeeded_items, failed_items,
           metadata, error_message,
           started_at, completed_at, created_at,
           duration_ms, avg_processing_time_ms
    FROM sync_jobs
"#;

#[async_trait]
impl SyncJobRepository for SqliteSyncJobRepository {
    async fn create(&self, job: &SyncJob) -> Result<()> {
        let metadata = job
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| SyncError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO sync_jobs (
                id, job_type, status,
                total_items, processed_items, succeeded_items, failed_items,
                metadata, error_message,
                started_at, completed_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.as_str())
        .bind(job.job_type.as_str())
        .bind(job.status.as_str())
        .bind(job.total_items as i64)
        .bind(job.processed_items as i64)
        .bind(job.succeeded_items as i64)
        .bind(job.failed_items as i64)
        .bind(metadata)
        .bind(&job.error_message)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        Ok(())
    }

    async fn update_progress(&self, job: &SyncJob) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sync_jobs SET
                processed_items = ?,
                succeeded_items = ?,
                failed_items = ?
            WHERE id = ?
            "#,
        )
        .bind(job.processed_items as i64)
        .bind(job.succeeded_items as i64)
        .bind(job.failed_items as i64)
        .bind(job.id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(SyncError::JobNotFound {
                job_id: job.id.to_string(),
            });
        }

        Ok(())
    }

    async fn complete(&self, job: &SyncJob) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE sync_jobs SET
                status = ?,
                error_message = ?,
                completed_at = ?,
                duration_ms = ?,
                avg_processing_time_ms = ?
            WHERE id = ?
            "#,
        )
        .bind(job.status.as_str())
        .bind(&job.error_message)
        .bind(job.completed_at)
        .bind(job.duration_ms)
        .bind(job.avg_processing_time_ms)
        .bind(job.id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(SyncError::JobNotFound {
                job_id: job.id.to_string(),
            });
        }

        Ok(())
    }

    async fn find_by_id(&self, id: &SyncJobId) -> Result<Option<SyncJob>> {
        let row = sqlx::query_as::<_, SyncJobRow>(&format!("{SELECT_JOB} WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        row.map(SyncJob::try_from).transpose()
    }

    async fn find_by_status(&self, status: SyncStatus) -> Result<Vec<SyncJob>> {
        let rows = sqlx::query_as::<_, SyncJobRow>(&format!(
            "{SELECT_JOB} WHERE status = ? ORDER BY created_at DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        rows.into_iter()
            .map(SyncJob::try_from)
            .collect::<Result<Vec<_>>>()
    }
}

// ============================================================================
// Tests
// ============================================================================
