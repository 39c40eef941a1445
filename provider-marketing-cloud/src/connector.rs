//! Marketing Cloud REST connector
//!
//! Implements the `RemoteCatalog` trait on top of the legacy folder API and
//! the `customobjects` data extension API.

use async_trait::async_trait;
use bridge_traits::catalog::{RemoteCatalog, RemoteDataExtension, RemoteFolder, RetentionProperties};
use bridge_traits::error::Result;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use core_auth::CredentialCache;
use core_runtime::config::MarketingCloudConfig;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{MarketingCloudError, Result as McResult};
use crate::types::{DataExtensionsResponse, FoldersResponse, UpdateRetentionRequest};

/// Folder types returned by the root folder query
const ROOT_FOLDER_FILTER: &str =
    "allowedtypes in ('synchronizeddataextension', 'dataextension', 'shared_data', 'recyclebin')";

/// Upper bound the children endpoint accepts for `$top`
const CHILDREN_PAGE_SIZE: u32 = 1000;

/// Data extension listing order
const DATA_EXTENSION_ORDER: &str = "modifiedDate DESC";

/// Marketing Cloud API connector
///
/// Every request carries a bearer token from the shared [`CredentialCache`].
/// A 401 response invalidates the cached token and the request is sent once
/// more with a fresh one.
///
/// # Example
///
/// ```ignore
/// use provider_marketing_cloud::MarketingCloudConnector;
/// use bridge_traits::catalog::RemoteCatalog;
///
/// let connector = MarketingCloudConnector::new(http_client, credentials, &config);
/// let roots = connector.list_root_folders().await?;
/// ```
pub struct MarketingCloudConnector {
    http_client: Arc<dyn HttpClient>,
    credentials: Arc<CredentialCache>,
    rest_base_uri: String,
}

impl MarketingCloudConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        credentials: Arc<CredentialCache>,
        config: &MarketingCloudConfig,
    ) -> Self {
        Self {
            http_client,
            credentials,
            rest_base_uri: config.rest_base_uri.clone(),
        }
    }

    fn root_folders_url(&self) -> String {
        format!(
            "{}/legacy/v1/beta/folder?$where={}&Localization=true",
            self.rest_base_uri,
            urlencoding::encode(ROOT_FOLDER_FILTER)
        )
    }

    fn child_folders_url(&self, folder_id: &str) -> String {
        format!(
            "{}/legacy/v1/beta/folder/{}/children?Localization=true&$top={}&$skip=0",
            self.rest_base_uri,
            urlencoding::encode(folder_id),
            CHILDREN_PAGE_SIZE
        )
    }

    fn data_extensions_url(&self, folder_id: &str, page: u32, page_size: u32) -> String {
        format!(
            "{}/data/v1/customobjects/category/{}?retrievalType=1&$page={}&$pagesize={}&$orderBy={}",
            self.rest_base_uri,
            urlencoding::encode(folder_id),
            page,
            page_size,
            urlencoding::encode(DATA_EXTENSION_ORDER)
        )
    }

    fn data_extension_url(&self, data_extension_id: &str) -> String {
        format!(
            "{}/data/v1/customobjects/{}",
            self.rest_base_uri,
            urlencoding::encode(data_extension_id)
        )
    }

    /// Send `request` with the current bearer token, refreshing it once on 401.
    async fn execute_authorized(&self, request: HttpRequest) -> McResult<HttpResponse> {
        let mut refreshed = false;

        loop {
            let credential = self.credentials.acquire().await?;
            let response = self
                .http_client
                .execute(
                    request
                        .clone()
                        .bearer_token(&credential.access_token)
                        .header("Accept", "application/json"),
                )
                .await?;

            if response.status == 401 && !refreshed {
                warn!(url = %request.url, "Access token rejected, refreshing");
                self.credentials.invalidate().await;
                refreshed = true;
                continue;
            }

            return Ok(response);
        }
    }

    /// Turn any status outside `accepted` into an API error.
    fn ensure_status(response: HttpResponse, accepted: &[u16]) -> McResult<HttpResponse> {
        if accepted.contains(&response.status) {
            return Ok(response);
        }

        let message = String::from_utf8_lossy(&response.body).to_string();
        warn!(status = response.status, error = %message, "API request failed");
        Err(MarketingCloudError::ApiError {
            status_code: response.status,
            message,
        })
    }

    async fn get_folders(&self, url: String) -> McResult<Vec<RemoteFolder>> {
        let response = self
            .execute_authorized(HttpRequest::new(HttpMethod::Get, url))
            .await?;
        let response = Self::ensure_status(response, &[200])?;

        let parsed: FoldersResponse = serde_json::from_slice(&response.body)
            .map_err(|e| MarketingCloudError::ParseError(e.to_string()))?;

        debug!(
            total_results = parsed.total_results,
            items = parsed.entry.len(),
            "Folders retrieved"
        );

        Ok(parsed.entry.into_iter().map(RemoteFolder::from).collect())
    }
}

#[async_trait]
impl RemoteCatalog for MarketingCloudConnector {
    #[instrument(skip(self))]
    async fn list_root_folders(&self) -> Result<Vec<RemoteFolder>> {
        info!("Listing root folders");
        Ok(self.get_folders(self.root_folders_url()).await?)
    }

    #[instrument(skip(self))]
    async fn list_child_folders(&self, folder_id: &str) -> Result<Vec<RemoteFolder>> {
        Ok(self.get_folders(self.child_folders_url(folder_id)).await?)
    }

    #[instrument(skip(self))]
    async fn list_data_extensions(
        &self,
        folder_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<RemoteDataExtension>> {
        let url = self.data_extensions_url(folder_id, page, page_size);
        let response = self
            .execute_authorized(HttpRequest::new(HttpMethod::Get, url))
            .await?;
        let response = MarketingCloudConnector::ensure_status(response, &[200])?;

        let parsed: DataExtensionsResponse = serde_json::from_slice(&response.body)
            .map_err(|e| MarketingCloudError::ParseError(e.to_string()))?;

        debug!(count = parsed.count, items = parsed.items.len(), "Data extensions page retrieved");

        Ok(parsed
            .items
            .into_iter()
            .map(RemoteDataExtension::from)
            .collect())
    }

    #[instrument(skip(self, retention))]
    async fn update_retention(
        &self,
        data_extension_id: &str,
        retention: &RetentionProperties,
    ) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Patch, self.data_extension_url(data_extension_id))
            .json(&UpdateRetentionRequest {
                data_retention_properties: retention,
            })?;

        let response = self.execute_authorized(request).await?;
        MarketingCloudConnector::ensure_status(response, &[200, 204])?;

        debug!("Retention updated");
        Ok(())
    }
}
