//! Error types for the Marketing Cloud provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Marketing Cloud provider errors
#[derive(Error, Debug)]
pub enum MarketingCloudError {
    /// No usable access token could be obtained
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned a non-success status
    #[error("Marketing Cloud API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Transport failure after the HTTP layer gave up
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Marketing Cloud operations
pub type Result<T> = std::result::Result<T, MarketingCloudError>;

impl From<core_auth::AuthError> for MarketingCloudError {
    fn from(error: core_auth::AuthError) -> Self {
        MarketingCloudError::AuthenticationFailed(error.to_string())
    }
}

impl From<MarketingCloudError> for BridgeError {
    fn from(error: MarketingCloudError) -> Self {
        match error {
            MarketingCloudError::AuthenticationFailed(msg) => {
                BridgeError::OperationFailed(format!("Authentication failed: {}", msg))
            }
            MarketingCloudError::ApiError {
                status_code,
                message,
            } if (400..500).contains(&status_code) => BridgeError::Rejected {
                status: status_code,
                message,
            },
            MarketingCloudError::ApiError {
                status_code,
                message,
            } => BridgeError::OperationFailed(format!(
                "API error (status {}): {}",
                status_code, message
            )),
            MarketingCloudError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            MarketingCloudError::NetworkError(msg) => {
                BridgeError::OperationFailed(format!("Network error: {}", msg))
            }
            MarketingCloudError::BridgeError(e) => e,
        }
    }
}
