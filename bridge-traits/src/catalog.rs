//! Remote Catalog Abstraction
//!
//! The remote system exposes a folder hierarchy whose leaves are data
//! extensions. Each data extension may carry a retention policy block that
//! this workspace normalizes and pushes back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Parent identifiers that mark a folder as top-level.
pub const ROOT_PARENT_SENTINELS: [&str; 2] = ["", "0"];

/// Returns true when `parent_id` is a "no parent" sentinel.
pub fn is_root_parent(parent_id: &str) -> bool {
    ROOT_PARENT_SENTINELS.contains(&parent_id)
}

/// A folder as reported by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFolder {
    pub id: String,
    /// Raw parent identifier, possibly a root sentinel
    pub parent_id: String,
    pub folder_type: String,
    pub name: String,
    pub description: String,
    pub icon_type: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub created_by: i64,
}

impl RemoteFolder {
    /// Whether this folder sits at the top of the hierarchy.
    pub fn is_top_level(&self) -> bool {
        is_root_parent(&self.parent_id)
    }
}

/// Unit of measure for a retention period.
///
/// The discriminants are the remote wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RetentionUnit {
    Days = 3,
    Weeks = 4,
    Months = 5,
    Years = 6,
}

impl RetentionUnit {
    pub fn code(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for RetentionUnit {
    type Error = BridgeError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            3 => Ok(RetentionUnit::Days),
            4 => Ok(RetentionUnit::Weeks),
            5 => Ok(RetentionUnit::Months),
            6 => Ok(RetentionUnit::Years),
            other => Err(BridgeError::OperationFailed(format!(
                "Unknown retention unit code: {}",
                other
            ))),
        }
    }
}

impl From<RetentionUnit> for i64 {
    fn from(unit: RetentionUnit) -> Self {
        unit.code()
    }
}

impl std::fmt::Display for RetentionUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RetentionUnit::Days => "days",
            RetentionUnit::Weeks => "weeks",
            RetentionUnit::Months => "months",
            RetentionUnit::Years => "years",
        };
        write!(f, "{}", name)
    }
}

/// Retention policy attached to a data extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionProperties {
    #[serde(rename = "dataRetentionPeriodLength")]
    pub period_length: i64,
    #[serde(rename = "dataRetentionPeriodUnitOfMeasure")]
    pub unit: RetentionUnit,
    pub is_delete_at_end_of_retention_period: bool,
    pub is_row_based_retention: bool,
    pub is_reset_retention_period_on_import: bool,
}

impl RetentionProperties {
    /// The policy pushed to every data extension: one month, row based,
    /// nothing deleted at period end, no reset on import.
    pub fn normalized() -> Self {
        Self {
            period_length: 1,
            unit: RetentionUnit::Months,
            is_delete_at_end_of_retention_period: false,
            is_row_based_retention: true,
            is_reset_retention_period_on_import: false,
        }
    }
}

/// A data extension as reported by the remote catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDataExtension {
    pub id: String,
    pub name: String,
    pub key: String,
    pub description: String,
    pub is_active: bool,
    pub is_sendable: bool,
    pub sendable_custom_object_field: Option<String>,
    pub sendable_subscriber_field: Option<String>,
    pub is_testable: bool,
    /// Owning folder identifier
    pub category_id: String,
    pub owner_id: i64,
    pub is_object_deletable: bool,
    pub is_field_addition_allowed: bool,
    pub is_field_modification_allowed: bool,
    pub created_date: Option<DateTime<Utc>>,
    pub created_by_id: i64,
    pub created_by_name: Option<String>,
    pub modified_date: Option<DateTime<Utc>>,
    pub modified_by_id: Option<i64>,
    pub modified_by_name: Option<String>,
    pub owner_name: Option<String>,
    pub partner_api_object_type_id: Option<i64>,
    pub partner_api_object_type_name: Option<String>,
    pub row_count: i64,
    pub field_count: i64,
    pub retention: Option<RetentionProperties>,
    pub category_full_path_for_recycle_bin: Option<String>,
}

impl RemoteDataExtension {
    /// Data extensions parked in the recycle bin carry a non-empty restore path.
    pub fn is_in_recycle_bin(&self) -> bool {
        self.category_full_path_for_recycle_bin
            .as_deref()
            .is_some_and(|path| !path.is_empty())
    }
}

/// Remote catalog trait
///
/// Implemented by provider crates on top of [`HttpClient`](crate::http::HttpClient).
/// Transient transport failures are retried below this layer; anything
/// returned as an error here is terminal for the call.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// List the folder set returned by the type-filtered root query.
    async fn list_root_folders(&self) -> Result<Vec<RemoteFolder>>;

    /// List the direct children of a folder.
    async fn list_child_folders(&self, folder_id: &str) -> Result<Vec<RemoteFolder>>;

    /// Fetch one page of data extensions owned by a folder.
    ///
    /// `page` is 1-based. A page shorter than `page_size` is the last one.
    async fn list_data_extensions(
        &self,
        folder_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RemoteDataExtension>>;

    /// Replace the retention policy of one data extension.
    async fn update_retention(
        &self,
        data_extension_id: &str,
        retention: &RetentionProperties,
    ) -> Result<()>;
}
