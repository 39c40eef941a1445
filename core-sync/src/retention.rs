//! Retention push with local status tracking.

use bridge_traits::catalog::{RemoteCatalog, RetentionProperties};
use bridge_traits::error::BridgeError;
use core_library::{DataExtensionRepository, RetentionUpdateStatus};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Pushes the normalized retention policy to one data extension at a time.
///
/// Every attempt leaves a trail in `data_retention_properties`: the row is
/// marked `pending` before the remote call and `succeeded` or `failed`
/// after it. Status writes that fail are logged and otherwise ignored, so
/// the result reflects the remote call alone.
#[derive(Clone)]
pub struct RetentionUpdater {
    catalog: Arc<dyn RemoteCatalog>,
    data_extensions: Arc<dyn DataExtensionRepository>,
    properties: RetentionProperties,
}

impl RetentionUpdater {
    pub fn new(
        catalog: Arc<dyn RemoteCatalog>,
        data_extensions: Arc<dyn DataExtensionRepository>,
    ) -> Self {
        Self {
            catalog,
            data_extensions,
            properties: RetentionProperties::normalized(),
        }
    }

    pub fn properties(&self) -> &RetentionProperties {
        &self.properties
    }

    #[instrument(skip(self))]
    pub async fn apply(&self, data_extension_id: &str) -> Result<(), BridgeError> {
        self.record(data_extension_id, RetentionUpdateStatus::Pending, None)
            .await;

        match self
            .catalog
            .update_retention(data_extension_id, &self.properties)
            .await
        {
            Ok(()) => {
                self.record(data_extension_id, RetentionUpdateStatus::Succeeded, None)
                    .await;
                debug!("Retention updated");
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.record(
                    data_extension_id,
                    RetentionUpdateStatus::Failed,
                    Some(&message),
                )
                .await;
                warn!(error = %message, permanent = e.is_permanent(), "Retention update failed");
                Err(e)
            }
        }
    }

    async fn record(&self, id: &str, status: RetentionUpdateStatus, error: Option<&str>) {
        if let Err(e) = self
            .data_extensions
            .record_retention_status(id, status, error, &self.properties)
            .await
        {
            warn!(data_extension_id = id, %status, error = %e, "Failed to record retention status");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::catalog::{RemoteDataExtension, RemoteFolder};
    use bridge_traits::error::Result as BridgeResult;
    use core_library::db::create_test_pool;
    use core_library::{DataExtension, Folder, FolderRepository, SqliteDataExtensionRepository, SqliteFolderRepository};

    struct FixedCatalog {
        outcome: Option<u16>,
    }

    #[async_trait]
    impl RemoteCatalog for FixedCatalog {
        async fn list_root_folders(&self) -> BridgeResult<Vec<RemoteFolder>> {
            Ok(Vec::new())
        }

        async fn list_child_folders(&self, _folder_id: &str) -> BridgeResult<Vec<RemoteFolder>> {
            Ok(Vec::new())
        }

        async fn list_data_extensions(
            &self,
            _folder_id: &str,
            _page: u32,
            _page_size: u32,
        ) -> BridgeResult<Vec<RemoteDataExtension>> {
            Ok(Vec::new())
        }

        async fn update_retention(
            &self,
            _data_extension_id: &str,
            _retention: &RetentionProperties,
        ) -> BridgeResult<()> {
            match self.outcome {
                None => Ok(()),
                Some(status) => Err(BridgeError::Rejected {
                    status,
                    message: "Retention settings are locked".to_string(),
                }),
            }
        }
    }

    async fn setup(outcome: Option<u16>) -> (RetentionUpdater, Arc<SqliteDataExtensionRepository>) {
        let pool = create_test_pool().await.unwrap();
        let folders = SqliteFolderRepository::new(pool.clone());
        folders
            .upsert(&Folder {
                id: "10".to_string(),
                parent_id: None,
                folder_type: "dataextension".to_string(),
                name: "Data Extensions".to_string(),
                description: None,
                icon_type: None,
                last_updated: None,
                created_by: 1,
                synced_at: 0,
            })
            .await
            .unwrap();

        let data_extensions = Arc::new(SqliteDataExtensionRepository::new(pool));
        data_extensions
            .upsert(&DataExtension {
                id: "de-1".to_string(),
                name: "Subscribers".to_string(),
                key: "SUBS".to_string(),
                description: None,
                is_active: true,
                is_sendable: false,
                sendable_custom_object_field: None,
                sendable_subscriber_field: None,
                is_testable: false,
                category_id: "10".to_string(),
                owner_id: 1,
                is_object_deletable: true,
                is_field_addition_allowed: true,
                is_field_modification_allowed: true,
                created_date: None,
                created_by_id: 1,
                created_by_name: None,
                modified_date: None,
                modified_by_id: None,
                modified_by_name: None,
                owner_name: None,
                partner_api_object_type_id: None,
                partner_api_object_type_name: None,
                row_count: 10,
                field_count: 2,
                category_full_path_for_recycle_bin: None,
                synced_at: 0,
                retention: None,
            })
            .await
            .unwrap();

        let updater = RetentionUpdater::new(
            Arc::new(FixedCatalog { outcome }),
            data_extensions.clone(),
        );
        (updater, data_extensions)
    }

    #[tokio::test]
    async fn test_success_is_recorded() {
        let (updater, repo) = setup(None).await;

        updater.apply("de-1").await.unwrap();

        let state = repo.find_retention_state("de-1").await.unwrap().unwrap();
        assert_eq!(state.status(), Some(RetentionUpdateStatus::Succeeded));
        assert_eq!(state.properties().unwrap(), RetentionProperties::normalized());
        assert_eq!(state.api_update_retry_count, 0);
    }

    #[tokio::test]
    async fn test_rejection_is_recorded_and_returned() {
        let (updater, repo) = setup(Some(400)).await;

        let err = updater.apply("de-1").await.unwrap_err();
        assert!(err.is_permanent());

        let state = repo.find_retention_state("de-1").await.unwrap().unwrap();
        assert_eq!(state.status(), Some(RetentionUpdateStatus::Failed));
        assert!(state
            .last_api_update_error
            .unwrap()
            .contains("Retention settings are locked"));
        assert_eq!(state.api_update_retry_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_id_still_reaches_remote() {
        let (updater, repo) = setup(None).await;

        updater.apply("missing").await.unwrap();
        assert!(repo.find_retention_state("missing").await.unwrap().is_none());
    }
}
