//! Data extension repository trait and implementation
//!
//! A data extension row and its `data_retention_properties` row are written
//! together. Push-back status columns are owned by
//! [`DataExtensionRepository::record_retention_status`] and never touched by
//! a catalog upsert.

use crate::error::{classify_write_error, constraint_of, Constraint, LibraryError, Result};
use crate::models::{DataExtension, RetentionState, RetentionUpdateStatus};
use async_trait::async_trait;
use bridge_traits::catalog::RetentionProperties;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, instrument, warn};

/// Longest error text stored for a failed retention update.
pub const MAX_ERROR_LEN: usize = 1000;

/// Cut `message` to at most [`MAX_ERROR_LEN`] characters.
pub fn truncate_error(message: &str) -> String {
    message.chars().take(MAX_ERROR_LEN).collect()
}

/// Data extension repository interface for data access operations
#[async_trait]
pub trait DataExtensionRepository: Send + Sync {
    /// Insert or update a data extension and, when present, its retention
    /// settings, in one transaction.
    ///
    /// # Errors
    /// - [`LibraryError::ParentMissing`] if the owning folder is not stored
    async fn upsert(&self, data_extension: &DataExtension) -> Result<()>;

    /// Upsert a set of data extensions in one transaction
    async fn upsert_batch(&self, data_extensions: &[DataExtension]) -> Result<usize>;

    /// Record the outcome of a retention push for one data extension.
    ///
    /// Stores `properties` as the current settings. A success resets the
    /// retry counter, a failure increments it, `Pending` leaves it alone.
    async fn record_retention_status(
        &self,
        data_extension_id: &str,
        status: RetentionUpdateStatus,
        error: Option<&str>,
        properties: &RetentionProperties,
    ) -> Result<()>;

    /// Retention row of one data extension
    async fn find_retention_state(&self, data_extension_id: &str)
        -> Result<Option<RetentionState>>;

    /// Rows still waiting for a successful push with fewer than
    /// `max_retries` failed attempts, oldest attempt first.
    async fn find_retry_candidates(
        &self,
        max_retries: u32,
        limit: usize,
    ) -> Result<Vec<RetentionState>>;

    /// Largest data extensions by row count, recycle bin excluded
    async fn top_by_row_count(&self, limit: usize) -> Result<Vec<DataExtension>>;

    /// Find a data extension by ID, retention settings attached
    async fn find_by_id(&self, id: &str) -> Result<Option<DataExtension>>;

    /// Count total data extensions
    async fn count(&self) -> Result<i64>;
}

/// SQLite implementation of DataExtensionRepository
pub struct SqliteDataExtensionRepository {
    pool: SqlitePool,
}

impl SqliteDataExtensionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn write(conn: &mut SqliteConnection, de: &DataExtension) -> Result<()> {
        de.validate().map_err(|msg| LibraryError::InvalidInput {
            field: "DataExtension".to_string(),
            message: msg,
        })?;

        sqlx::query(
            r#"
            INSERT INTO data_extensions (
                id, name, key, description, is_active, is_sendable,
                sendable_custom_object_field, sendable_subscriber_field, is_testable,
                category_id, owner_id, is_object_deletable, is_field_addition_allowed,
                is_field_modification_allowed, created_date, created_by_id, created_by_name,
                modified_date, modified_by_id, modified_by_name, owner_name,
                partner_api_object_type_id, partner_api_object_type_name,
                row_count, field_count, category_full_path_for_recycle_bin, synced_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                key = excluded.key,
                description = excluded.description,
                is_active = excluded.is_active,
                is_sendable = excluded.is_sendable,
                sendable_custom_object_field = excluded.sendable_custom_object_field,
                sendable_subscriber_field = excluded.sendable_subscriber_field,
                is_testable = excluded.is_testable,
                category_id = excluded.category_id,
                owner_id = excluded.owner_id,
                is_object_deletable = excluded.is_object_deletable,
                is_field_addition_allowed = excluded.is_field_addition_allowed,
                is_field_modification_allowed = excluded.is_field_modification_allowed,
                created_date = excluded.created_date,
                created_by_id = excluded.created_by_id,
                created_by_name = excluded.created_by_name,
                modified_date = excluded.modified_date,
                modified_by_id = excluded.modified_by_id,
                modified_by_name = excluded.modified_by_name,
                owner_name = excluded.owner_name,
                partner_api_object_type_id = excluded.partner_api_object_type_id,
                partner_api_object_type_name = excluded.partner_api_object_type_name,
                row_count = excluded.row_count,
                field_count = excluded.field_count,
                category_full_path_for_recycle_bin = excluded.category_full_path_for_recycle_bin,
                synced_at = excluded.synced_at
            "#,
        )
        .bind(&de.id)
        .bind(&de.name)
        .bind(&de.key)
        .bind(&de.description)
        .bind(de.is_active)
        .bind(de.is_sendable)
        .bind(&de.sendable_custom_object_field)
        .bind(&de.sendable_subscriber_field)
        .bind(de.is_testable)
        .bind(&de.category_id)
        .bind(de.owner_id)
        .bind(de.is_object_deletable)
        .bind(de.is_field_addition_allowed)
        .bind(de.is_field_modification_allowed)
        .bind(de.created_date)
        .bind(de.created_by_id)
        .bind(&de.created_by_name)
        .bind(de.modified_date)
        .bind(de.modified_by_id)
        .bind(&de.modified_by_name)
        .bind(&de.owner_name)
        .bind(de.partner_api_object_type_id)
        .bind(&de.partner_api_object_type_name)
        .bind(de.row_count)
        .bind(de.field_count)
        .bind(&de.category_full_path_for_recycle_bin)
        .bind(de.synced_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| classify_write_error(e, "DataExtension", &de.id, Some(&de.category_id)))?;

        if let Some(retention) = &de.retention {
            sqlx::query(
                r#"
                INSERT INTO data_retention_properties (
                    data_extension_id, data_retention_period_length,
                    data_retention_period_unit_of_measure, is_delete_at_end_of_retention_period,
                    is_row_based_retention, is_reset_retention_period_on_import, updated_at
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(data_extension_id) DO UPDATE SET
                    data_retention_period_length = excluded.data_retention_period_length,
                    data_retention_period_unit_of_measure = excluded.data_retention_period_unit_of_measure,
                    is_delete_at_end_of_retention_period = excluded.is_delete_at_end_of_retention_period,
                    is_row_based_retention = excluded.is_row_based_retention,
                    is_reset_retention_period_on_import = excluded.is_reset_retention_period_on_import,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&de.id)
            .bind(retention.period_length)
            .bind(retention.unit.code())
            .bind(retention.is_delete_at_end_of_retention_period)
            .bind(retention.is_row_based_retention)
            .bind(retention.is_reset_retention_period_on_import)
            .bind(de.synced_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    async fn attach_retention(&self, mut de: DataExtension) -> Result<DataExtension> {
        if let Some(state) = self.find_retention_state(&de.id).await? {
            match state.properties() {
                Ok(props) => de.retention = Some(props),
                Err(e) => warn!(data_extension_id = %de.id, error = %e, "Stored retention unreadable"),
            }
        }
        Ok(de)
    }
}

#[async_trait]
impl DataExtensionRepository for SqliteDataExtensionRepository {
    #[instrument(skip(self, data_extension), fields(data_extension_id = %data_extension.id))]
    async fn upsert(&self, data_extension: &DataExtension) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::write(&mut tx, data_extension).await?;
        tx.commit().await?;
        debug!("Data extension upserted");
        Ok(())
    }

    #[instrument(skip(self, data_extensions), fields(count = data_extensions.len()))]
    async fn upsert_batch(&self, data_extensions: &[DataExtension]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for de in data_extensions {
            Self::write(&mut tx, de).await?;
        }

        tx.commit().await?;
        Ok(data_extensions.len())
    }

    #[instrument(skip(self, error, properties), fields(status = %status))]
    async fn record_retention_status(
        &self,
        data_extension_id: &str,
        status: RetentionUpdateStatus,
        error: Option<&str>,
        properties: &RetentionProperties,
    ) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let initial_retries: i64 = if status == RetentionUpdateStatus::Failed {
            1
        } else {
            0
        };

        sqlx::query(
            r#"
            INSERT INTO data_retention_properties (
                data_extension_id, data_retention_period_length,
                data_retention_period_unit_of_measure, is_delete_at_end_of_retention_period,
                is_row_based_retention, is_reset_retention_period_on_import,
                last_api_update_status, last_api_update_error, api_update_retry_count,
                last_api_update_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(data_extension_id) DO UPDATE SET
                data_retention_period_length = excluded.data_retention_period_length,
                data_retention_period_unit_of_measure = excluded.data_retention_period_unit_of_measure,
                is_delete_at_end_of_retention_period = excluded.is_delete_at_end_of_retention_period,
                is_row_based_retention = excluded.is_row_based_retention,
                is_reset_retention_period_on_import = excluded.is_reset_retention_period_on_import,
                last_api_update_status = excluded.last_api_update_status,
                last_api_update_error = excluded.last_api_update_error,
                api_update_retry_count = CASE excluded.last_api_update_status
                    WHEN 'succeeded' THEN 0
                    WHEN 'failed' THEN data_retention_properties.api_update_retry_count + 1
                    ELSE data_retention_properties.api_update_retry_count
                END,
                last_api_update_at = excluded.last_api_update_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(data_extension_id)
        .bind(properties.period_length)
        .bind(properties.unit.code())
        .bind(properties.is_delete_at_end_of_retention_period)
        .bind(properties.is_row_based_retention)
        .bind(properties.is_reset_retention_period_on_import)
        .bind(status.as_str())
        .bind(error.map(truncate_error))
        .bind(initial_retries)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match constraint_of(&e) {
            Constraint::ForeignKey => LibraryError::NotFound {
                entity_type: "DataExtension".to_string(),
                id: data_extension_id.to_string(),
            },
            _ => LibraryError::Database(e),
        })?;

        debug!(data_extension_id, "Retention status recorded");
        Ok(())
    }

    async fn find_retention_state(
        &self,
        data_extension_id: &str,
    ) -> Result<Option<RetentionState>> {
        let state = sqlx::query_as::<_, RetentionState>(
            "SELECT * FROM data_retention_properties WHERE data_extension_id = ?",
        )
        .bind(data_extension_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(state)
    }

    async fn find_retry_candidates(
        &self,
        max_retries: u32,
        limit: usize,
    ) -> Result<Vec<RetentionState>> {
        let rows = sqlx::query_as::<_, RetentionState>(
            r#"
            SELECT * FROM data_retention_properties
            WHERE last_api_update_status IN ('pending', 'failed')
              AND api_update_retry_count < ?
            ORDER BY last_api_update_at ASC
            LIMIT ?
            "#,
        )
        .bind(i64::from(max_retries))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn top_by_row_count(&self, limit: usize) -> Result<Vec<DataExtension>> {
        let rows = sqlx::query_as::<_, DataExtension>(
            r#"
            SELECT * FROM data_extensions
            WHERE category_full_path_for_recycle_bin IS NULL
               OR category_full_path_for_recycle_bin = ''
            ORDER BY row_count DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(rows.len());
        for de in rows {
            result.push(self.attach_retention(de).await?);
        }
        Ok(result)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<DataExtension>> {
        let row = sqlx::query_as::<_, DataExtension>("SELECT * FROM data_extensions WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(de) => Ok(Some(self.attach_retention(de).await?)),
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM data_extensions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
