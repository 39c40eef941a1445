use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync job {job_id} not found")]
    JobNotFound { job_id: String },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Failed to persist top-level folder {folder_id}: {message}")]
    TopLevelPersist { folder_id: String, message: String },

    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    #[error("Invalid sync status: {0}")]
    InvalidStatus(String),

    #[error("Invalid job type: {0}")]
    InvalidJobType(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Export failed: {0}")]
    Export(String),
}

impl From<core_library::LibraryError> for SyncError {
    fn from(error: core_library::LibraryError) -> Self {
        SyncError::Database(error.to_string())
    }
}

impl From<bridge_traits::error::BridgeError> for SyncError {
    fn from(error: bridge_traits::error::BridgeError) -> Self {
        SyncError::Provider(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
