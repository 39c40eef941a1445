use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication failed (HTTP {status}): {reason}")]
    AuthenticationFailed { status: u16, reason: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    #[error("Auth error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
