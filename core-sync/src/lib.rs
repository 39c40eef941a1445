//! # Sync Module
//!
//! Mirrors the remote folder hierarchy and its data extensions into the
//! local store, and pushes the normalized retention policy back.
//!
//! ## Components
//!
//! - **Sync Job State Machine** (`job`): Durable progress record per data extension batch
//! - **Repository** (`repository`): Database persistence for sync jobs
//! - **Progress Tracker** (`tracker`): Opens and completes a job around each batch
//! - **Metrics** (`metrics`): Run-wide success and failure counters
//! - **Hierarchy Resolver** (`resolver`): Persists unordered folders parent-first
//! - **Sync Engine** (`coordinator`): Bounded, recursive walk of the hierarchy
//! - **Reconciliation** (`reconcile`): Retries unfinished retention pushes
//! - **Report** (`report`): Largest data extensions exported as JSON

pub mod coordinator;
pub mod error;
mod fanout;
pub mod job;
pub mod metrics;
pub mod reconcile;
pub mod report;
pub mod repository;
pub mod resolver;
pub mod retention;
pub mod tracker;

pub use coordinator::{SyncEngine, SyncReport};
pub use error::{Result, SyncError};
pub use job::{JobMetadata, JobType, SyncJob, SyncJobId, SyncStatus};
pub use metrics::{SyncMetrics, SyncMetricsSnapshot};
pub use reconcile::{ReconcileReport, RetentionReconciler};
pub use report::{TopDataExtensions, TopDataExtensionsReport};
pub use repository::{SqliteSyncJobRepository, SyncJobRepository};
pub use resolver::{HierarchyResolver, ResolveReport};
pub use retention::RetentionUpdater;
pub use tracker::{ProgressTracker, TrackedBatch};
