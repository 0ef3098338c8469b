use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::exchange::DEFAULT_EXPIRES_IN_SECS;
use crate::error::AuthResult;
use crate::security::SecretString;
use crate::traits::clock::{Clock, SystemClock};
use crate::types::CredentialDomain;

/// Seconds subtracted from a token's declared lifetime.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

/// Cache key. The secret is held only as a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub domain: CredentialDomain,
    pub client_id: String,
    pub secret_fingerprint: String,
    pub base_url: String,
}

impl CacheKey {
    pub fn new(
        domain: CredentialDomain,
        client_id: &str,
        client_secret: &SecretString,
        base_url: &str,
    ) -> Self {
        Self {
            domain,
            client_id: client_id.to_string(),
            secret_fingerprint: client_secret.fingerprint(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Token obtained at `now` with a declared lifetime of `expires_in_secs`.
    ///
    /// A lifetime that cannot be represented falls back to the default.
    pub fn issued(access_token: SecretString, expires_in_secs: i64, now: DateTime<Utc>) -> Self {
        let expires_at = expiry(now, expires_in_secs)
            .or_else(|| expiry(now, DEFAULT_EXPIRES_IN_SECS))
            .unwrap_or(now);
        Self {
            access_token,
            expires_at,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

fn expiry(now: DateTime<Utc>, expires_in_secs: i64) -> Option<DateTime<Utc>> {
    let lifetime = TimeDelta::try_seconds(expires_in_secs.checked_sub(EXPIRY_MARGIN_SECS)?)?;
    now.checked_add_signed(lifetime)
}

type Slot = Arc<Mutex<Option<CachedToken>>>;

/// Token cache with a per-key lock around check, exchange and store.
///
/// Concurrent callers for the same key wait on the first exchange instead of
/// issuing their own. Entries are never evicted; an expired entry is replaced
/// by the next exchange.
pub struct TokenCache {
    entries: DashMap<CacheKey, Slot>,
    clock: Arc<dyn Clock>,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Return the cached token for `key`, or run `exchange` and cache its result.
    ///
    /// A failed exchange leaves the previous entry untouched.
    pub async fn get_or_exchange<F, Fut>(&self, key: CacheKey, exchange: F) -> AuthResult<SecretString>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AuthResult<CachedToken>>,
    {
        let slot: Slot = Arc::clone(
            self.entries
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .value(),
        );

        let mut guard = slot.lock().await;
        if let Some(cached) = guard.as_ref() {
            if cached.is_valid_at(self.clock.now()) {
                debug!(domain = %key.domain, client_id = %key.client_id, "Token cache hit");
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = exchange().await?;
        debug!(
            domain = %key.domain,
            client_id = %key.client_id,
            expires_at = %fresh.expires_at,
            "Token cached"
        );
        let token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(token)
    }

    /// Current entry for `key`, expired or not.
    pub async fn peek(&self, key: &CacheKey) -> Option<CachedToken> {
        let slot = self.entries.get(key).map(|e| Arc::clone(e.value()))?;
        let guard = slot.lock().await;
        guard.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::testing::ManualClock;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(base: &str) -> CacheKey {
        CacheKey::new(CredentialDomain::Emr, "cid", &SecretString::new("cs"), base)
    }

    #[test]
    fn test_issued_applies_margin() {
        let now = Utc::now();
        let token = CachedToken::issued("t".into(), 1800, now);
        assert_eq!(token.expires_at, now + Duration::seconds(1740));
        assert!(token.is_valid_at(now + Duration::seconds(1739)));
        assert!(!token.is_valid_at(now + Duration::seconds(1740)));
    }

    #[test]
    fn test_issued_survives_extreme_lifetimes() {
        let now = Utc::now();
        let fallback = now + Duration::seconds(DEFAULT_EXPIRES_IN_SECS - EXPIRY_MARGIN_SECS);

        assert_eq!(CachedToken::issued("t".into(), i64::MAX, now).expires_at, fallback);
        assert_eq!(CachedToken::issued("t".into(), i64::MIN, now).expires_at, fallback);

        let negative = CachedToken::issued("t".into(), -10, now);
        assert!(!negative.is_valid_at(now));
    }

    #[test]
    fn test_key_ignores_trailing_slash_and_hides_secret() {
        assert_eq!(key("https://a.example/"), key("https://a.example"));
        assert_ne!(key("https://a.example"), key("https://b.example"));
        assert!(!format!("{:?}", key("x")).contains("\"cs\""));
    }

    #[tokio::test]
    async fn test_second_call_within_window_hits_cache() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = TokenCache::with_clock(clock.clone());
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let token = cache
                .get_or_exchange(key("https://a"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(CachedToken::issued("tok".into(), 1800, clock.now()))
                })
                .await
                .unwrap();
            assert_eq!(token.expose(), "tok");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_exchanged_again() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = TokenCache::with_clock(clock.clone());
        let calls = AtomicUsize::new(0);

        let exchange = || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(CachedToken::issued(format!("tok-{n}").into(), 1800, clock.now()))
        };

        cache.get_or_exchange(key("https://a"), exchange).await.unwrap();
        clock.advance(Duration::seconds(1740));
        let token = cache.get_or_exchange(key("https://a"), exchange).await.unwrap();

        assert_eq!(token.expose(), "tok-1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_exchange_keeps_previous_entry() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = TokenCache::with_clock(clock.clone());

        cache
            .get_or_exchange(key("https://a"), || async {
                Ok(CachedToken::issued("old".into(), 1800, clock.now()))
            })
            .await
            .unwrap();
        clock.advance(Duration::seconds(3600));

        let result = cache
            .get_or_exchange(key("https://a"), || async { Err(AuthError::MissingAccessToken) })
            .await;

        assert!(result.is_err());
        let entry = cache.peek(&key("https://a")).await.unwrap();
        assert_eq!(entry.access_token.expose(), "old");
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_exchange() {
        let cache = Arc::new(TokenCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_exchange(key("https://a"), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(CachedToken::issued("shared".into(), 1800, Utc::now()))
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().expose(), "shared");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }
}
