//! Marketing Cloud REST response types
//!
//! Data structures for deserializing the legacy folder API and the
//! `customobjects` data extension API. Identifiers arrive as strings or
//! numbers depending on the endpoint, so they are normalized to strings here.

use bridge_traits::catalog::{RemoteDataExtension, RemoteFolder, RetentionProperties, RetentionUnit};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Parse a timestamp in one of the formats the API emits.
///
/// Accepts RFC 3339, or `YYYY-MM-DDTHH:MM:SS[.fff]` without an offset, which
/// is read as UTC. An empty string means "no timestamp".
pub fn parse_api_time(value: &str) -> Result<Option<DateTime<Utc>>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(Some(naive.and_utc()));
        }
    }

    Err(format!("unable to parse time string: {}", value))
}

fn deserialize_api_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_api_time(&raw).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Number(i64),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<IdValue>::deserialize(deserializer)? {
        Some(IdValue::Text(text)) => text,
        Some(IdValue::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

// =============================================================================
// Folders
// =============================================================================

/// Folder entry of the legacy folder API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(rename = "type", default)]
    pub folder_type: String,

    #[serde(default, deserialize_with = "deserialize_api_time")]
    pub last_updated: Option<DateTime<Utc>>,

    #[serde(default)]
    pub created_by: i64,

    /// `"0"` or empty for top-level folders
    #[serde(default, deserialize_with = "deserialize_id")]
    pub parent_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub icon_type: Option<String>,
}

impl From<FolderEntry> for RemoteFolder {
    fn from(entry: FolderEntry) -> Self {
        RemoteFolder {
            id: entry.id,
            parent_id: entry.parent_id,
            folder_type: entry.folder_type,
            name: entry.name,
            description: entry.description.unwrap_or_default(),
            icon_type: entry.icon_type.unwrap_or_default(),
            last_updated: entry.last_updated,
            created_by: entry.created_by,
        }
    }
}

/// Response of the folder and folder-children endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldersResponse {
    #[serde(default)]
    pub start_index: i64,

    #[serde(default)]
    pub items_per_page: i64,

    #[serde(default)]
    pub total_results: i64,

    #[serde(default)]
    pub entry: Vec<FolderEntry>,
}

// =============================================================================
// Data extensions
// =============================================================================

/// Retention block as sent by the API.
///
/// The unit is kept raw so one malformed block does not fail a whole page.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPropertiesEntry {
    #[serde(default)]
    pub data_retention_period_length: i64,
    #[serde(default)]
    pub data_retention_period_unit_of_measure: i64,
    #[serde(default)]
    pub is_delete_at_end_of_retention_period: bool,
    #[serde(default)]
    pub is_row_based_retention: bool,
    #[serde(default)]
    pub is_reset_retention_period_on_import: bool,
}

impl RetentionPropertiesEntry {
    fn into_properties(self, data_extension_id: &str) -> Option<RetentionProperties> {
        match RetentionUnit::try_from(self.data_retention_period_unit_of_measure) {
            Ok(unit) => Some(RetentionProperties {
                period_length: self.data_retention_period_length,
                unit,
                is_delete_at_end_of_retention_period: self.is_delete_at_end_of_retention_period,
                is_row_based_retention: self.is_row_based_retention,
                is_reset_retention_period_on_import: self.is_reset_retention_period_on_import,
            }),
            Err(e) => {
                warn!(data_extension_id, error = %e, "Ignoring retention block");
                None
            }
        }
    }
}

/// Data extension item of the `customobjects/category/{id}` endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExtensionEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_sendable: bool,
    #[serde(default)]
    pub sendable_custom_object_field: Option<String>,
    #[serde(default)]
    pub sendable_subscriber_field: Option<String>,
    #[serde(default)]
    pub is_testable: bool,
    #[serde(default, deserialize_with = "deserialize_id")]
    pub category_id: String,
    #[serde(default)]
    pub owner_id: i64,
    #[serde(default)]
    pub is_object_deletable: bool,
    #[serde(default)]
    pub is_field_addition_allowed: bool,
    #[serde(default)]
    pub is_field_modification_allowed: bool,
    #[serde(default, deserialize_with = "deserialize_api_time")]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_by_id: i64,
    #[serde(default)]
    pub created_by_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_api_time")]
    pub modified_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_by_id: Option<i64>,
    #[serde(default)]
    pub modified_by_name: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub partner_api_object_type_id: Option<i64>,
    #[serde(default)]
    pub partner_api_object_type_name: Option<String>,
    #[serde(default)]
    pub row_count: i64,
    #[serde(default)]
    pub data_retention_properties: Option<RetentionPropertiesEntry>,
    #[serde(default)]
    pub field_count: i64,
    #[serde(rename = "categoryFullPathForRecyclebin", default)]
    pub category_full_path_for_recycle_bin: Option<String>,
}

impl From<DataExtensionEntry> for RemoteDataExtension {
    fn from(entry: DataExtensionEntry) -> Self {
        let retention = entry
            .data_retention_properties
            .and_then(|block| block.into_properties(&entry.id));

        RemoteDataExtension {
            id: entry.id,
            name: entry.name,
            key: entry.key,
            description: entry.description.unwrap_or_default(),
            is_active: entry.is_active,
            is_sendable: entry.is_sendable,
            sendable_custom_object_field: entry.sendable_custom_object_field,
            sendable_subscriber_field: entry.sendable_subscriber_field,
            is_testable: entry.is_testable,
            category_id: entry.category_id,
            owner_id: entry.owner_id,
            is_object_deletable: entry.is_object_deletable,
            is_field_addition_allowed: entry.is_field_addition_allowed,
            is_field_modification_allowed: entry.is_field_modification_allowed,
            created_date: entry.created_date,
            created_by_id: entry.created_by_id,
            created_by_name: entry.created_by_name,
            modified_date: entry.modified_date,
            modified_by_id: entry.modified_by_id,
            modified_by_name: entry.modified_by_name,
            owner_name: entry.owner_name,
            partner_api_object_type_id: entry.partner_api_object_type_id,
            partner_api_object_type_name: entry.partner_api_object_type_name,
            row_count: entry.row_count,
            field_count: entry.field_count,
            retention,
            category_full_path_for_recycle_bin: entry.category_full_path_for_recycle_bin,
        }
    }
}

/// One page of data extensions
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataExtensionsResponse {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub page_size: i64,
    #[serde(default)]
    pub items: Vec<DataExtensionEntry>,
}

/// Body of the retention PATCH
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRetentionRequest<'a> {
    pub data_retention_properties: &'a RetentionProperties,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_api_time_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 9, 9, 4, 4, 2).unwrap();

        assert_eq!(parse_api_time("2020-09-09T04:04:02Z").unwrap(), Some(expected));
        assert_eq!(parse_api_time("2020-09-09T04:04:02").unwrap(), Some(expected));
        assert_eq!(
            parse_api_time("2020-09-09T04:04:02.257")
                .unwrap()
                .map(|t| t.timestamp()),
            Some(expected.timestamp())
        );
        assert_eq!(
            parse_api_time("2020-09-09T06:04:02+02:00").unwrap(),
            Some(expected)
        );
        assert_eq!(parse_api_time("").unwrap(), None);
        assert!(parse_api_time("09/09/2020").is_err());
    }

    #[test]
    fn test_folder_entry_numeric_ids() {
        let json = r#"{
            "id": 1234,
            "type": "dataextension",
            "lastUpdated": "2023-05-01T10:00:00Z",
            "createdBy": 7,
            "parentId": 0,
            "name": "Data Extensions",
            "description": null,
            "iconType": "dataextension"
        }"#;

        let folder: RemoteFolder = serde_json::from_str::<FolderEntry>(json).unwrap().into();
        assert_eq!(folder.id, "1234");
        assert_eq!(folder.parent_id, "0");
        assert!(folder.is_top_level());
        assert_eq!(folder.description, "");
    }

    #[test]
    fn test_data_extension_entry() {
        let json = r#"{
            "id": "5b2e-11",
            "name": "Subscribers",
            "key": "SUBS",
            "isActive": true,
            "categoryId": 1234,
            "createdDate": "2020-09-09T04:04:02.257",
            "modifiedDate": "",
            "rowCount": 42,
            "fieldCount": 3,
            "dataRetentionProperties": {
                "dataRetentionPeriodLength": 6,
                "dataRetentionPeriodUnitOfMeasure": 4,
                "isDeleteAtEndOfRetentionPeriod": true,
                "isRowBasedRetention": false,
                "isResetRetentionPeriodOnImport": false
            },
            "categoryFullPathForRecyclebin": null
        }"#;

        let de: RemoteDataExtension = serde_json::from_str::<DataExtensionEntry>(json)
            .unwrap()
            .into();

        assert_eq!(de.category_id, "1234");
        assert_eq!(de.row_count, 42);
        assert!(de.created_date.is_some());
        assert!(de.modified_date.is_none());
        let retention = de.retention.unwrap();
        assert_eq!(retention.unit, RetentionUnit::Weeks);
        assert_eq!(retention.period_length, 6);
        assert!(!de.is_in_recycle_bin());
    }

    #[test]
    fn test_unknown_retention_unit_is_dropped() {
        let json = r#"{
            "id": "x",
            "categoryId": "1",
            "dataRetentionProperties": { "dataRetentionPeriodUnitOfMeasure": 0 }
        }"#;

        let de: RemoteDataExtension = serde_json::from_str::<DataExtensionEntry>(json)
            .unwrap()
            .into();
        assert!(de.retention.is_none());
    }

    #[test]
    fn test_update_request_shape() {
        let props = RetentionProperties::normalized();
        let body = serde_json::to_value(UpdateRetentionRequest {
            data_retention_properties: &props,
        })
        .unwrap();

        assert_eq!(body["dataRetentionProperties"]["dataRetentionPeriodUnitOfMeasure"], 5);
        assert_eq!(body["dataRetentionProperties"]["isRowBasedRetention"], true);
    }
}
