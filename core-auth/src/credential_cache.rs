//! # Credential Cache
//!
//! Holds one bearer credential for the lifetime of a sync process.
//!
//! The read path takes a shared lock. On a miss the cache authenticates with
//! no lock held and then takes the write lock only to store the result, so
//! two callers can refresh at the same time. Both get a valid credential and
//! the later write wins.

use async_trait::async_trait;
use bridge_traits::time::{Clock, SystemClock};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::types::{AccessGrant, Credential};

/// Source of fresh access grants.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<AccessGrant>;
}

/// Shared, self-refreshing bearer credential.
pub struct CredentialCache {
    authenticator: Arc<dyn Authenticator>,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Credential>>,
}

impl CredentialCache {
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self::with_clock(authenticator, Arc::new(SystemClock))
    }

    pub fn with_clock(authenticator: Arc<dyn Authenticator>, clock: Arc<dyn Clock>) -> Self {
        Self {
            authenticator,
            clock,
            current: RwLock::new(None),
        }
    }

    /// Return the cached credential, authenticating first if it is missing or
    /// about to expire.
    ///
    /// # Errors
    ///
    /// Authentication failures are returned as-is; nothing is retried here.
    #[instrument(skip(self))]
    pub async fn acquire(&self) -> Result<Credential> {
        if let Some(credential) = self.cached().await {
            return Ok(credential);
        }

        debug!("No fresh credential cached, authenticating");
        let grant = self.authenticator.authenticate().await?;
        let credential = Credential::from_grant(grant, self.clock.now());

        *self.current.write().await = Some(credential.clone());

        info!(expires_at = %credential.expires_at, "Credential refreshed");
        Ok(credential)
    }

    /// Drop the cached credential so the next `acquire` authenticates.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
        debug!("Credential invalidated");
    }

    async fn cached(&self) -> Option<Credential> {
        let now = self.clock.now();
        let guard = self.current.read().await;
        guard
            .as_ref()
            .filter(|credential| credential.is_fresh_at(now))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingAuthenticator {
        calls: AtomicUsize,
        expires_in: i64,
    }

    impl CountingAuthenticator {
        fn new(expires_in: i64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                expires_in,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authenticator for CountingAuthenticator {
        async fn authenticate(&self) -> Result<AccessGrant> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AccessGrant {
                access_token: format!("token-{}", n),
                token_type: "Bearer".to_string(),
                expires_in: self.expires_in,
                scope: String::new(),
                rest_instance_url: None,
                soap_instance_url: None,
            })
        }
    }

    struct FailingAuthenticator;

    #[async_trait]
    impl Authenticator for FailingAuthenticator {
        async fn authenticate(&self) -> Result<AccessGrant> {
            Err(AuthError::AuthenticationFailed {
                status: 401,
                reason: "invalid_client".to_string(),
            })
        }
    }

    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
            }
        }

        fn advance(&self, seconds: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::seconds(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn test_concurrent_acquire_shares_cached_credential() {
        let auth = Arc::new(CountingAuthenticator::new(1200));
        let cache = Arc::new(CredentialCache::with_clock(
            auth.clone(),
            Arc::new(ManualClock::new()),
        ));

        let first = cache.acquire().await.unwrap();
        assert_eq!(auth.calls(), 1);

        let (a, b) = tokio::join!(cache.acquire(), cache.acquire());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(a, first);
        assert_eq!(b, first);
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn test_expiry_triggers_single_refresh() {
        let auth = Arc::new(CountingAuthenticator::new(300));
        let clock = Arc::new(ManualClock::new());
        let cache = CredentialCache::with_clock(auth.clone(), clock.clone());

        let first = cache.acquire().await.unwrap();
        assert_eq!(first.access_token, "token-1");

        // Inside the 30s safety margin
        clock.advance(275);
        let second = cache.acquire().await.unwrap();
        assert_eq!(second.access_token, "token-2");
        assert_eq!(auth.calls(), 2);

        let third = cache.acquire().await.unwrap();
        assert_eq!(third, second);
        assert_eq!(auth.calls(), 2);
    }

    #[tokio::test]
    async fn test_zero_lifetime_defaults_to_twenty_minutes() {
        let auth = Arc::new(CountingAuthenticator::new(0));
        let clock = Arc::new(ManualClock::new());
        let cache = CredentialCache::with_clock(auth.clone(), clock.clone());

        cache.acquire().await.unwrap();
        clock.advance(1100);
        cache.acquire().await.unwrap();
        assert_eq!(auth.calls(), 1);

        clock.advance(100);
        cache.acquire().await.unwrap();
        assert_eq!(auth.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reauthentication() {
        let auth = Arc::new(CountingAuthenticator::new(1200));
        let cache = CredentialCache::with_clock(auth.clone(), Arc::new(ManualClock::new()));

        cache.acquire().await.unwrap();
        cache.invalidate().await;
        let refreshed = cache.acquire().await.unwrap();

        assert_eq!(refreshed.access_token, "token-2");
        assert_eq!(auth.calls(), 2);
    }

    #[tokio::test]
    async fn test_authentication_error_propagates() {
        let cache = CredentialCache::new(Arc::new(FailingAuthenticator));

        let result = cache.acquire().await;
        assert!(matches!(
            result,
            Err(AuthError::AuthenticationFailed { status: 401, .. })
        ));
    }
}
