use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Remote request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the failure came from a client-side rejection that must not be retried.
    pub fn is_permanent(&self) -> bool {
        matches!(self, BridgeError::Rejected { status, .. } if (400..500).contains(status))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
