use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifetime assumed when the token endpoint reports `expires_in = 0`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 1200;

/// Credentials within this many seconds of expiry are treated as expired.
pub const EXPIRY_SKEW_SECS: i64 = 30;

/// Token endpoint response.
///
/// Field names follow the wire format of the `/v2/token` endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct AccessGrant {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub rest_instance_url: Option<String>,
    #[serde(default)]
    pub soap_instance_url: Option<String>,
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for AccessGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGrant")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("rest_instance_url", &self.rest_instance_url)
            .field("soap_instance_url", &self.soap_instance_url)
            .finish()
    }
}

/// A bearer credential with an absolute expiry.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    /// REST host announced by the token endpoint, if any
    pub rest_instance_url: Option<String>,
}

impl Credential {
    /// Build a credential from a grant received at `issued_at`.
    pub fn from_grant(grant: AccessGrant, issued_at: DateTime<Utc>) -> Self {
        let lifetime = if grant.expires_in > 0 {
            grant.expires_in
        } else {
            DEFAULT_EXPIRES_IN_SECS
        };

        Self {
            access_token: grant.access_token,
            token_type: grant.token_type,
            expires_at: issued_at + Duration::seconds(lifetime),
            rest_instance_url: grant.rest_instance_url,
        }
    }

    /// Usable at `now`, keeping the expiry safety margin.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) < self.expires_at
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("rest_instance_url", &self.rest_instance_url)
            .finish()
    }
}
