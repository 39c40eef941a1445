//! # Core Configuration Module
//!
//! Provides configuration management for the retention sync core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! [`AppConfig`] holding the remote credentials, the database location and the
//! concurrency knobs of the sync engine. Validation is fail-fast: a
//! misconfigured run stops before any connection is opened.
//!
//! ## Environment
//!
//! [`MarketingCloudConfig::from_env`] reads:
//!
//! - `MCE_AUTH_BASE_URI` - Authentication host (required)
//! - `MCE_REST_BASE_URI` - REST host (required)
//! - `MCE_CLIENT_ID` - Installed package client id (required)
//! - `MCE_CLIENT_SECRET` - Installed package client secret (required)
//! - `MCE_SCOPE` - Requested scope (required)
//! - `MCE_ACCOUNT_ID` - Business unit / MID (optional)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{AppConfig, MarketingCloudConfig};
//!
//! let config = AppConfig::builder()
//!     .marketing_cloud(MarketingCloudConfig::from_env()?)
//!     .database_path("/var/lib/retention-sync/state.db")
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Default SQLite database file, relative to the working directory.
pub const DEFAULT_DATABASE_PATH: &str = "retention-sync.db";

/// Credentials and endpoints of the remote marketing platform.
#[derive(Clone, PartialEq, Eq)]
pub struct MarketingCloudConfig {
    /// Base URI of the authentication host, without trailing slash
    pub auth_base_uri: String,
    /// Base URI of the REST host, without trailing slash
    pub rest_base_uri: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    /// Business unit the token is requested for
    pub account_id: Option<String>,
}

impl std::fmt::Debug for MarketingCloudConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketingCloudConfig")
            .field("auth_base_uri", &self.auth_base_uri)
            .field("rest_base_uri", &self.rest_base_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .field("account_id", &self.account_id)
            .finish()
    }
}

impl MarketingCloudConfig {
    pub fn new(
        auth_base_uri: impl Into<String>,
        rest_base_uri: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            auth_base_uri: trim_base_uri(auth_base_uri.into()),
            rest_base_uri: trim_base_uri(rest_base_uri.into()),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: scope.into(),
            account_id: None,
        }
    }

    /// Sets the business unit the token is requested for.
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        let account_id = account_id.into();
        self.account_id = if account_id.is_empty() {
            None
        } else {
            Some(account_id)
        };
        self
    }

    /// Reads the configuration from the `MCE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| Error::MissingSetting {
                    name: name.to_string(),
                    message: format!("Set the {} environment variable.", name),
                })
        };

        let config = Self::new(
            required("MCE_AUTH_BASE_URI")?,
            required("MCE_REST_BASE_URI")?,
            required("MCE_CLIENT_ID")?,
            required("MCE_CLIENT_SECRET")?,
            required("MCE_SCOPE")?,
        );

        Ok(match lookup("MCE_ACCOUNT_ID") {
            Some(account_id) => config.with_account_id(account_id.trim()),
            None => config,
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        validate_uri("Authentication base URI", &self.auth_base_uri)?;
        validate_uri("REST base URI", &self.rest_base_uri)?;

        if self.client_id.trim().is_empty() {
            return Err(Error::Config("Client id cannot be empty".to_string()));
        }

        if self.client_secret.trim().is_empty() {
            return Err(Error::Config("Client secret cannot be empty".to_string()));
        }

        if self.scope.trim().is_empty() {
            return Err(Error::Config("Scope cannot be empty".to_string()));
        }

        Ok(())
    }
}

fn trim_base_uri(uri: String) -> String {
    uri.trim().trim_end_matches('/').to_string()
}

fn validate_uri(label: &str, uri: &str) -> Result<()> {
    if uri.is_empty() {
        return Err(Error::Config(format!("{} cannot be empty", label)));
    }

    if !(uri.starts_with("https://") || uri.starts_with("http://")) {
        return Err(Error::Config(format!(
            "{} must start with http:// or https://, got '{}'",
            label, uri
        )));
    }

    Ok(())
}

/// Concurrency bounds and limits of the sync engine.
///
/// The defaults are the production values; tests shrink them to exercise
/// back-pressure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTuning {
    /// Top-level folders persisted concurrently
    pub top_level_concurrency: usize,
    /// Root folders walked concurrently
    pub root_walk_concurrency: usize,
    /// Children of one folder walked concurrently
    pub child_concurrency: usize,
    /// Data extensions of one batch processed concurrently
    pub data_extension_concurrency: usize,
    /// Page size for data extension listing
    pub page_size: u32,
    /// Maximum hierarchy resolution passes
    pub resolver_passes: usize,
    /// Retry ceiling for the reconciliation pass
    pub reconcile_max_retries: u32,
    /// Number of data extensions kept by the top export
    pub export_top_count: usize,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            top_level_concurrency: 10,
            root_walk_concurrency: 10,
            child_concurrency: 5,
            data_extension_concurrency: 10,
            page_size: 96,
            resolver_passes: 5,
            reconcile_max_retries: 3,
            export_top_count: 20,
        }
    }
}

impl SyncTuning {
    pub fn validate(&self) -> Result<()> {
        let bounds = [
            ("top_level_concurrency", self.top_level_concurrency),
            ("root_walk_concurrency", self.root_walk_concurrency),
            ("child_concurrency", self.child_concurrency),
            ("data_extension_concurrency", self.data_extension_concurrency),
            ("resolver_passes", self.resolver_passes),
            ("export_top_count", self.export_top_count),
        ];

        for (name, value) in bounds {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than 0", name)));
            }
        }

        if self.page_size == 0 {
            return Err(Error::Config(
                "page_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Top-level application configuration.
///
/// Use [`AppConfigBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub marketing_cloud: MarketingCloudConfig,

    /// Path to the SQLite database file
    pub database_path: PathBuf,

    pub tuning: SyncTuning,
}

impl AppConfig {
    /// Creates a new builder for constructing an `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Remote URIs, credentials and scope are present and well-formed
    /// - Database path is not empty
    /// - Every concurrency bound is positive
    pub fn validate(&self) -> Result<()> {
        self.marketing_cloud.validate()?;

        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        self.tuning.validate()
    }
}

/// Builder for [`AppConfig`].
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    marketing_cloud: Option<MarketingCloudConfig>,
    database_path: Option<PathBuf>,
    tuning: Option<SyncTuning>,
}

impl AppConfigBuilder {
    /// Sets the remote credentials (required).
    pub fn marketing_cloud(mut self, config: MarketingCloudConfig) -> Self {
        self.marketing_cloud = Some(config);
        self
    }

    /// Sets the database file path.
    ///
    /// Default: [`DEFAULT_DATABASE_PATH`]
    pub fn database_path(mut self, path: impl AsRef<Path>) -> Self {
        self.database_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Overrides the engine tuning.
    pub fn tuning(mut self, tuning: SyncTuning) -> Self {
        self.tuning = Some(tuning);
        self
    }

    /// Builds the final `AppConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote credentials are missing or any value
    /// fails validation.
    pub fn build(self) -> Result<AppConfig> {
        let marketing_cloud = self.marketing_cloud.ok_or_else(|| {
            Error::Config(
                "Marketing Cloud credentials are required. Use .marketing_cloud() to set them."
                    .to_string(),
            )
        })?;

        let config = AppConfig {
            marketing_cloud,
            database_path: self
                .database_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            tuning: self.tuning.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn remote() -> MarketingCloudConfig {
        MarketingCloudConfig::new(
            "https://auth.example.com/",
            "https://rest.example.com",
            "client",
            "secret",
            "data_extensions_read data_extensions_write",
        )
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_env() -> HashMap<String, String> {
        env(&[
            ("MCE_AUTH_BASE_URI", "https://auth.example.com"),
            ("MCE_REST_BASE_URI", "https://rest.example.com/"),
            ("MCE_CLIENT_ID", "client"),
            ("MCE_CLIENT_SECRET", "secret"),
            ("MCE_SCOPE", "scope"),
        ])
    }

    #[test]
    fn test_builder_requires_marketing_cloud() {
        let result = AppConfig::builder().database_path("/tmp/x.db").build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Marketing Cloud credentials are required"));
    }

    #[test]
    fn test_builder_defaults() {
        let config = AppConfig::builder().marketing_cloud(remote()).build().unwrap();

        assert_eq!(config.database_path, PathBuf::from(DEFAULT_DATABASE_PATH));
        assert_eq!(config.tuning, SyncTuning::default());
        assert_eq!(config.marketing_cloud.auth_base_uri, "https://auth.example.com");
    }

    #[test]
    fn test_default_tuning_values() {
        let tuning = SyncTuning::default();
        assert_eq!(tuning.top_level_concurrency, 10);
        assert_eq!(tuning.root_walk_concurrency, 10);
        assert_eq!(tuning.child_concurrency, 5);
        assert_eq!(tuning.data_extension_concurrency, 10);
        assert_eq!(tuning.page_size, 96);
        assert_eq!(tuning.resolver_passes, 5);
        assert_eq!(tuning.reconcile_max_retries, 3);
        assert_eq!(tuning.export_top_count, 20);
    }

    #[test]
    fn test_validate_rejects_zero_bounds() {
        let tuning = SyncTuning {
            child_concurrency: 0,
            ..SyncTuning::default()
        };

        let err = AppConfig::builder()
            .marketing_cloud(remote())
            .tuning(tuning)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("child_concurrency"));
    }

    #[test]
    fn test_validate_rejects_non_http_uri() {
        let mut config = remote();
        config.rest_base_uri = "ftp://rest.example.com".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("REST base URI"));
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = remote();
        config.client_secret = "  ".to_string();

        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_database_path() {
        let err = AppConfig::builder()
            .marketing_cloud(remote())
            .database_path("")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Database path"));
    }

    #[test]
    fn test_from_lookup_reads_all_variables() {
        let mut vars = full_env();
        vars.insert("MCE_ACCOUNT_ID".to_string(), "510000123".to_string());

        let config = MarketingCloudConfig::from_lookup(|name| vars.get(name).cloned()).unwrap();

        assert_eq!(config.rest_base_uri, "https://rest.example.com");
        assert_eq!(config.client_id, "client");
        assert_eq!(config.account_id.as_deref(), Some("510000123"));
    }

    #[test]
    fn test_from_lookup_reports_missing_variable() {
        let mut vars = full_env();
        vars.remove("MCE_CLIENT_SECRET");

        let err = MarketingCloudConfig::from_lookup(|name| vars.get(name).cloned()).unwrap_err();

        match err {
            Error::MissingSetting { name, .. } => assert_eq!(name, "MCE_CLIENT_SECRET"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_blank_account_id_is_ignored() {
        let mut vars = full_env();
        vars.insert("MCE_ACCOUNT_ID".to_string(), "  ".to_string());

        let config = MarketingCloudConfig::from_lookup(|name| vars.get(name).cloned()).unwrap();
        assert_eq!(config.account_id, None);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let rendered = format!("{:?}", remote());
        assert!(!rendered.contains("\"secret\""));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = AppConfig::builder().marketing_cloud(remote()).build().unwrap();
        let cloned = config.clone();
        assert_eq!(cloned.database_path, config.database_path);
    }
}
