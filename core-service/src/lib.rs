//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges (HTTP client and database
//! pool) into the shared core: credential cache, Marketing Cloud connector,
//! repositories, sync engine, reconciler and export report. Desktop and
//! server hosts typically enable the `desktop-shims` feature, which builds
//! the bridges from an [`AppConfig`] via [`bootstrap`].

pub mod error;

pub use error::{CoreError, Result};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::{catalog::RemoteCatalog, http::HttpClient};
use core_auth::{ClientCredentialsAuthenticator, CredentialCache};
use core_library::{
    DataExtensionRepository, SqliteDataExtensionRepository, SqliteFolderRepository,
};
use core_runtime::config::AppConfig;
use core_sync::{
    ReconcileReport, RetentionReconciler, SqliteSyncJobRepository, SyncEngine, SyncReport,
    TopDataExtensionsReport,
};
use provider_marketing_cloud::MarketingCloudConnector;
use sqlx::SqlitePool;

/// Aggregated handle to the bridge dependencies the core requires.
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub pool: SqlitePool,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(http_client: Arc<dyn HttpClient>, pool: SqlitePool) -> Self {
        Self { http_client, pool }
    }
}

/// Primary façade exposed to the CLI and other hosts.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<AppConfig>,
    engine: SyncEngine,
    reconciler: Arc<RetentionReconciler>,
    report: Arc<TopDataExtensionsReport>,
    data_extensions: Arc<dyn DataExtensionRepository>,
}

impl CoreService {
    /// Create a new service from a validated configuration and its bridges.
    pub fn new(config: AppConfig, deps: CoreDependencies) -> Self {
        let authenticator = Arc::new(ClientCredentialsAuthenticator::new(
            deps.http_client.clone(),
            config.marketing_cloud.clone(),
        ));
        let credentials = Arc::new(CredentialCache::new(authenticator));
        let catalog: Arc<dyn RemoteCatalog> = Arc::new(MarketingCloudConnector::new(
            deps.http_client,
            credentials,
            &config.marketing_cloud,
        ));

        let folders = Arc::new(SqliteFolderRepository::new(deps.pool.clone()));
        let data_extensions: Arc<dyn DataExtensionRepository> =
            Arc::new(SqliteDataExtensionRepository::new(deps.pool.clone()));
        let jobs = Arc::new(SqliteSyncJobRepository::new(deps.pool));

        let tuning = config.tuning;
        let engine = SyncEngine::new(
            catalog.clone(),
            folders,
            data_extensions.clone(),
            jobs,
            tuning,
        );
        let reconciler = RetentionReconciler::new(
            catalog.clone(),
            data_extensions.clone(),
            tuning.reconcile_max_retries,
        );
        let report = TopDataExtensionsReport::new(catalog, tuning.page_size);

        Self {
            config: Arc::new(config),
            engine,
            reconciler: Arc::new(reconciler),
            report: Arc::new(report),
            data_extensions,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Mirror the hierarchy and push retention to every data extension.
    pub async fn sync(&self) -> Result<SyncReport> {
        Ok(self.engine.run().await?)
    }

    /// Push retention to a single data extension.
    pub async fn update_retention(&self, data_extension_id: &str) -> Result<()> {
        Ok(self.engine.update_retention(data_extension_id).await?)
    }

    /// Retry up to `limit` retention pushes that have not succeeded yet.
    pub async fn reconcile(&self, limit: usize) -> Result<ReconcileReport> {
        Ok(self.reconciler.reconcile(limit).await?)
    }

    /// Export the largest data extensions to `out_dir` and return the file
    /// path. `top` defaults to the configured export count.
    pub async fn export_top(&self, out_dir: &Path, top: Option<usize>) -> Result<PathBuf> {
        let top = top.unwrap_or(self.config.tuning.export_top_count);
        let result = self.report.build(top).await?;
        let path = result.write_json(out_dir, self.config.marketing_cloud.account_id.as_deref())?;
        Ok(path)
    }

    /// Number of data extensions in the local mirror.
    pub async fn data_extension_count(&self) -> Result<i64> {
        Ok(self.data_extensions.count().await?)
    }
}

/// Build the desktop bridges for `config` and return a ready service.
///
/// Opens (and migrates) the SQLite database at `config.database_path`.
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap(config: AppConfig) -> Result<CoreService> {
    use bridge_desktop::ReqwestHttpClient;
    use core_library::db::{create_pool, DatabaseConfig};
    use tracing::info;

    config.validate()?;

    let http_client = ReqwestHttpClient::new()
        .map_err(|err| CoreError::InitializationFailed(err.to_string()))?;
    let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;

    info!(database = %config.database_path.display(), "Core service ready");
    Ok(CoreService::new(
        config,
        CoreDependencies::new(Arc::new(http_client), pool),
    ))
}
