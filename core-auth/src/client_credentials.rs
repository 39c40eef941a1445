//! OAuth 2.0 client-credentials grant against the `/v2/token` endpoint.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use core_runtime::config::MarketingCloudConfig;
use core_runtime::logging::redact_if_sensitive;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::credential_cache::Authenticator;
use crate::error::{AuthError, Result};
use crate::types::AccessGrant;

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    scope: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    account_id: Option<&'a str>,
}

/// Authenticates installed-package credentials.
pub struct ClientCredentialsAuthenticator {
    http_client: Arc<dyn HttpClient>,
    config: MarketingCloudConfig,
}

impl ClientCredentialsAuthenticator {
    pub fn new(http_client: Arc<dyn HttpClient>, config: MarketingCloudConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    fn token_url(&self) -> String {
        format!("{}/v2/token", self.config.auth_base_uri)
    }
}

#[async_trait]
impl Authenticator for ClientCredentialsAuthenticator {
    #[instrument(skip(self), fields(client_id = %self.config.client_id))]
    async fn authenticate(&self) -> Result<AccessGrant> {
        let body = TokenRequest {
            grant_type: "client_credentials",
            client_id: &self.config.client_id,
            client_secret: &self.config.client_secret,
            scope: &self.config.scope,
            account_id: self.config.account_id.as_deref(),
        };

        let request = HttpRequest::new(HttpMethod::Post, self.token_url())
            .json(&body)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;

        debug!("Requesting access token");

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let reason = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status = status, error = %reason, "Token request rejected");

            return Err(AuthError::AuthenticationFailed { status, reason });
        }

        let grant: AccessGrant = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        if grant.access_token.is_empty() {
            return Err(AuthError::InvalidResponse(
                "Token response carried an empty access_token".to_string(),
            ));
        }

        debug!(
            access_token = %redact_if_sensitive("access_token", &grant.access_token),
            expires_in = grant.expires_in,
            "Access token granted"
        );
        Ok(grant)
    }
}
