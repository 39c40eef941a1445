//! Domain models for the local mirror
//!
//! Rows are stored with unix-second timestamps; conversions from the remote
//! catalog types live here so every writer maps fields the same way.

use bridge_traits::catalog::{
    is_root_parent, RemoteDataExtension, RemoteFolder, RetentionProperties, RetentionUnit,
};
use bridge_traits::error::BridgeError;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

// =============================================================================
// Folder
// =============================================================================

/// Folder in the remote hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Folder {
    pub id: String,
    /// Parent folder ID (None for top-level folders)
    pub parent_id: Option<String>,
    pub folder_type: String,
    pub name: String,
    pub description: Option<String>,
    pub icon_type: Option<String>,
    /// Remote modification time (unix seconds)
    pub last_updated: Option<i64>,
    pub created_by: i64,
    /// When this row was last written (unix seconds)
    pub synced_at: i64,
}

impl Folder {
    /// Validate folder data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Folder id cannot be empty".to_string());
        }

        if self.parent_id.as_deref() == Some(self.id.as_str()) {
            return Err(format!("Folder {} cannot be its own parent", self.id));
        }

        Ok(())
    }
}

impl From<&RemoteFolder> for Folder {
    fn from(remote: &RemoteFolder) -> Self {
        Self {
            id: remote.id.clone(),
            parent_id: if is_root_parent(&remote.parent_id) {
                None
            } else {
                Some(remote.parent_id.clone())
            },
            folder_type: remote.folder_type.clone(),
            name: remote.name.clone(),
            description: non_empty(&remote.description),
            icon_type: non_empty(&remote.icon_type),
            last_updated: remote.last_updated.map(|t| t.timestamp()),
            created_by: remote.created_by,
            synced_at: chrono::Utc::now().timestamp(),
        }
    }
}

// =============================================================================
// Data Extension
// =============================================================================

/// Data extension (leaf record) owned by a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DataExtension {
    pub id: String,
    pub name: String,
    pub key: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub is_sendable: bool,
    pub sendable_custom_object_field: Option<String>,
    pub sendable_subscriber_field: Option<String>,
    pub is_testable: bool,
    /// Owning folder
    pub category_id: String,
    pub owner_id: i64,
    pub is_object_deletable: bool,
    pub is_field_addition_allowed: bool,
    pub is_field_modification_allowed: bool,
    pub created_date: Option<i64>,
    pub created_by_id: i64,
    pub created_by_name: Option<String>,
    pub modified_date: Option<i64>,
    pub modified_by_id: Option<i64>,
    pub modified_by_name: Option<String>,
    pub owner_name: Option<String>,
    pub partner_api_object_type_id: Option<i64>,
    pub partner_api_object_type_name: Option<String>,
    pub row_count: i64,
    pub field_count: i64,
    pub category_full_path_for_recycle_bin: Option<String>,
    pub synced_at: i64,
    /// Retention settings, stored in `data_retention_properties`
    #[sqlx(skip)]
    pub retention: Option<RetentionProperties>,
}

impl DataExtension {
    /// Validate data extension data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("Data extension id cannot be empty".to_string());
        }

        if self.category_id.trim().is_empty() {
            return Err(format!("Data extension {} has no category", self.id));
        }

        Ok(())
    }
}

impl From<&RemoteDataExtension> for DataExtension {
    fn from(remote: &RemoteDataExtension) -> Self {
        Self {
            id: remote.id.clone(),
            name: remote.name.clone(),
            key: remote.key.clone(),
            description: non_empty(&remote.description),
            is_active: remote.is_active,
            is_sendable: remote.is_sendable,
            sendable_custom_object_field: remote.sendable_custom_object_field.clone(),
            sendable_subscriber_field: remote.sendable_subscriber_field.clone(),
            is_testable: remote.is_testable,
            category_id: remote.category_id.clone(),
            owner_id: remote.owner_id,
            is_object_deletable: remote.is_object_deletable,
            is_field_addition_allowed: remote.is_field_addition_allowed,
            is_field_modification_allowed: remote.is_field_modification_allowed,
            created_date: remote.created_date.map(|t| t.timestamp()),
            created_by_id: remote.created_by_id,
            created_by_name: remote.created_by_name.clone(),
            modified_date: remote.modified_date.map(|t| t.timestamp()),
            modified_by_id: remote.modified_by_id,
            modified_by_name: remote.modified_by_name.clone(),
            owner_name: remote.owner_name.clone(),
            partner_api_object_type_id: remote.partner_api_object_type_id,
            partner_api_object_type_name: remote.partner_api_object_type_name.clone(),
            row_count: remote.row_count,
            field_count: remote.field_count,
            category_full_path_for_recycle_bin: remote.category_full_path_for_recycle_bin.clone(),
            synced_at: chrono::Utc::now().timestamp(),
            retention: remote.retention,
        }
    }
}

// =============================================================================
// Retention tracking
// =============================================================================

/// Outcome of the last attempt to push retention settings to the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionUpdateStatus {
    Pending,
    Succeeded,
    Failed,
}

impl RetentionUpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionUpdateStatus::Pending => "pending",
            RetentionUpdateStatus::Succeeded => "succeeded",
            RetentionUpdateStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RetentionUpdateStatus::Pending),
            "succeeded" => Some(RetentionUpdateStatus::Succeeded),
            "failed" => Some(RetentionUpdateStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RetentionUpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A `data_retention_properties` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RetentionState {
    pub data_extension_id: String,
    pub data_retention_period_length: i64,
    pub data_retention_period_unit_of_measure: i64,
    pub is_delete_at_end_of_retention_period: bool,
    pub is_row_based_retention: bool,
    pub is_reset_retention_period_on_import: bool,
    pub last_api_update_status: Option<String>,
    pub last_api_update_error: Option<String>,
    pub api_update_retry_count: i64,
    pub last_api_update_at: Option<i64>,
    pub updated_at: i64,
}

impl RetentionState {
    pub fn status(&self) -> Option<RetentionUpdateStatus> {
        self.last_api_update_status
            .as_deref()
            .and_then(RetentionUpdateStatus::parse)
    }

    /// Stored settings as the catalog type.
    pub fn properties(&self) -> Result<RetentionProperties, BridgeError> {
        Ok(RetentionProperties {
            period_length: self.data_retention_period_length,
            unit: RetentionUnit::try_from(self.data_retention_period_unit_of_measure)?,
            is_delete_at_end_of_retention_period: self.is_delete_at_end_of_retention_period,
            is_row_based_retention: self.is_row_based_retention,
            is_reset_retention_period_on_import: self.is_reset_retention_period_on_import,
        })
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
