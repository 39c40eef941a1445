//! # Sync Job State Machine
//!
//! Durable progress record for one data extension batch.
//!
//! ## State Machine
//!
//! ```text
//! Pending → Running → Completed
//!     ↓         ↓
//!     └──────→ Failed
//!     └──────→ Cancelled
//! ```
//!
//! Terminal states are final. Counters can only move while the job is
//! running.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{JobMetadata, JobType, SyncJob};
//!
//! let mut job = SyncJob::new(JobType::DataRetentionUpdate, 12, Some(metadata)).start()?;
//! job.update_progress(12, 11, 1)?;
//! let job = job.complete(840)?;
//! assert_eq!(job.avg_processing_time_ms, Some(70));
//! ```

use crate::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    /// Create a new random sync job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a sync job ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(
            Uuid::parse_str(s).map_err(|e| SyncError::InvalidJobId(e.to_string()))?,
        ))
    }

    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// The current status of a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SyncStatus {
    /// Check if this status represents a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncStatus::Completed | SyncStatus::Failed | SyncStatus::Cancelled
        )
    }

    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Running => "running",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
            SyncStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(SyncStatus::Pending),
            "running" => Ok(SyncStatus::Running),
            "completed" => Ok(SyncStatus::Completed),
            "failed" => Ok(SyncStatus::Failed),
            "cancelled" => Ok(SyncStatus::Cancelled),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of work a job tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Persist a folder's data extensions and push normalized retention
    DataRetentionUpdate,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::DataRetentionUpdate => "data_retention_update",
        }
    }
}

impl FromStr for JobType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "data_retention_update" => Ok(JobType::DataRetentionUpdate),
            _ => Err(SyncError::InvalidJobType(s.to_string())),
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Context stored with a job as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub folder_id: String,
    pub folder_name: String,
    pub operation: String,
}

impl JobMetadata {
    pub fn for_folder(folder_id: &str, folder_name: &str, job_type: JobType) -> Self {
        Self {
            folder_id: folder_id.to_string(),
            folder_name: folder_name.to_string(),
            operation: job_type.as_str().to_string(),
        }
    }
}

// ============================================================================
// Sync Job Entity
// ============================================================================

/// A sync job with state machine semantics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: SyncJobId,
    pub job_type: JobType,
    pub status: SyncStatus,
    pub total_items: u64,
    pub processed_items: u64,
    pub succeeded_items: u64,
    pub failed_items: u64,
    pub metadata: Option<JobMetadata>,
    pub error_message: Option<String>,
    /// When the job was created (unix seconds)
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    /// Wall time of the batch in milliseconds
    pub duration_ms: Option<i64>,
    pub avg_processing_time_ms: Option<i64>,
}

impl SyncJob {
    /// Create a new sync job in pending state
    pub fn new(job_type: JobType, total_items: u64, metadata: Option<JobMetadata>) -> Self {
        Self {
            id: SyncJobId::new(),
            job_type,
            status: SyncStatus::Pending,
            total_items,
            processed_items: 0,
            succeeded_items: 0,
            failed_items: 0,
            metadata,
            error_message: None,
            created_at: current_timestamp(),
            started_at: None,
            completed_at: None,
            duration_ms: None,
            avg_processing_time_ms: None,
        }
    }

    /// Start the sync job
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Pending` state
    pub fn start(mut self) -> Result<Self> {
        self.validate_transition(SyncStatus::Running)?;
        self.status = SyncStatus::Running;
        self.started_at = Some(current_timestamp());
        Ok(self)
    }

    /// Set the progress counters
    ///
    /// # Errors
    ///
    /// Returns an error if the job is not in `Running` state
    pub fn update_progress(&mut self, processed: u64, succeeded: u64, failed: u64) -> Result<()> {
        if self.status != SyncStatus::Running {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: "update_progress".to_string(),
                reason: "Job must be running to update progress".to_string(),
            });
        }

        self.processed_items = processed;
        self.succeeded_items = succeeded;
        self.failed_items = failed;
        Ok(())
    }

    /// Mark the job as completed after `duration_ms` of work
    ///
    /// The average is taken over `total_items`.
    pub fn complete(mut self, duration_ms: i64) -> Result<Self> {
        self.validate_transition(SyncStatus::Completed)?;
        self.status = SyncStatus::Completed;
        self.completed_at = Some(current_timestamp());
        self.duration_ms = Some(duration_ms);
        self.avg_processing_time_ms = Some(if self.total_items > 0 {
            duration_ms / self.total_items as i64
        } else {
            duration_ms
        });
        Ok(self)
    }

    /// Mark the job as failed with an error message
    pub fn fail(mut self, error_message: String) -> Result<Self> {
        self.validate_transition(SyncStatus::Failed)?;
        self.status = SyncStatus::Failed;
        self.completed_at = Some(current_timestamp());
        self.error_message = Some(error_message);
        Ok(self)
    }

    /// Cancel the job
    pub fn cancel(mut self) -> Result<Self> {
        self.validate_transition(SyncStatus::Cancelled)?;
        self.status = SyncStatus::Cancelled;
        self.completed_at = Some(current_timestamp());
        Ok(self)
    }

    /// Percentage of processed items that succeeded
    pub fn success_rate(&self) -> f64 {
        percentage(self.succeeded_items, self.processed_items)
    }

    /// Percentage of processed items that failed
    pub fn error_rate(&self) -> f64 {
        percentage(self.failed_items, self.processed_items)
    }

    fn validate_transition(&self, to: SyncStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (SyncStatus::Pending, SyncStatus::Running)
                | (SyncStatus::Pending, SyncStatus::Failed)
                | (SyncStatus::Pending, SyncStatus::Cancelled)
                | (SyncStatus::Running, SyncStatus::Completed)
                | (SyncStatus::Running, SyncStatus::Failed)
                | (SyncStatus::Running, SyncStatus::Cancelled)
        );

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

// ============================================================================
// Tests
// ============================================================================
