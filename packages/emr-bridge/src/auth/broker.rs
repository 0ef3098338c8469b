use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::cache::{CacheKey, CachedToken, TokenCache};
use super::exchange::LoginExchange;
use crate::config::{BridgeConfig, DomainDefaults};
use crate::error::{AuthError, BridgeError, Result};
use crate::security::SecretString;
use crate::traits::transport::HttpTransport;
use crate::types::{CredentialDomain, CredentialParams, CredentialSource, ResolvedCredentials};

/// Resolves a bearer token and base URL for a vendor domain.
///
/// Per-call parameters are tried in order: static token, then client pair,
/// then the domain defaults. Defaults prefer their client pair over their
/// static token. Client pairs are exchanged through the shared [`TokenCache`].
pub struct CredentialBroker {
    scribe: DomainDefaults,
    emr: DomainDefaults,
    exchange: LoginExchange,
    cache: Arc<TokenCache>,
}

impl CredentialBroker {
    pub fn new(config: &BridgeConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            scribe: config.scribe.clone(),
            emr: config.emr.clone(),
            exchange: LoginExchange::new(transport),
            cache: Arc::new(TokenCache::new()),
        }
    }

    /// Share a cache across brokers, or inject one with a test clock.
    pub fn with_cache(mut self, cache: Arc<TokenCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_exchange(mut self, exchange: LoginExchange) -> Self {
        self.exchange = exchange;
        self
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    pub fn defaults(&self, domain: CredentialDomain) -> &DomainDefaults {
        match domain {
            CredentialDomain::Scribe => &self.scribe,
            CredentialDomain::Emr => &self.emr,
        }
    }

    /// Resolve credentials for `domain`, honoring per-call overrides.
    pub async fn resolve(
        &self,
        domain: CredentialDomain,
        params: Option<&CredentialParams>,
    ) -> Result<ResolvedCredentials> {
        let defaults = self.defaults(domain);
        let empty = CredentialParams::default();
        let params = params.unwrap_or(&empty);

        let base_url = params
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .unwrap_or(defaults.base_url.as_str())
            .trim_end_matches('/')
            .to_string();

        if let Some(token) = params.api_token.as_ref().filter(|t| !t.expose().is_empty()) {
            debug!(domain = %domain, "Using per-call static token");
            return Ok(ResolvedCredentials::new(
                SecretString::new(token.expose().trim()),
                base_url,
                CredentialSource::ParamToken,
            ));
        }

        let client_id = params.client_id.as_deref().filter(|c| !c.is_empty());
        let client_secret = params.client_secret.as_ref().filter(|s| !s.expose().is_empty());
        if let (Some(client_id), Some(client_secret)) = (client_id, client_secret) {
            let client_id = client_id.trim();
            let client_secret = SecretString::new(client_secret.expose().trim());
            if client_id.is_empty() || client_secret.is_blank() {
                return Err(AuthError::EmptyClientCredentials.into());
            }
            let token = self
                .exchange_cached(domain, client_id, &client_secret, &base_url)
                .await?;
            return Ok(
                ResolvedCredentials::new(token, base_url, CredentialSource::ParamClientCredentials)
                    .with_client_id(client_id),
            );
        }

        let (token, client_id, source) = self.resolve_defaults(defaults).await?;
        let resolved = ResolvedCredentials::new(token, base_url, source);
        Ok(match client_id {
            Some(id) => resolved.with_client_id(id),
            None => resolved,
        })
    }

    /// Headers and base URL for `domain`.
    pub async fn headers(
        &self,
        domain: CredentialDomain,
        params: Option<&CredentialParams>,
    ) -> Result<(BTreeMap<String, String>, String)> {
        let resolved = self.resolve(domain, params).await?;
        Ok((resolved.headers(), resolved.base_url))
    }

    async fn resolve_defaults(
        &self,
        defaults: &DomainDefaults,
    ) -> Result<(SecretString, Option<String>, CredentialSource)> {
        defaults.validate()?;

        if let Some((client_id, client_secret)) = defaults.client_credentials() {
            let token = self
                .exchange_cached(defaults.domain, client_id, client_secret, &defaults.base_url)
                .await?;
            return Ok((
                token,
                Some(client_id.to_string()),
                CredentialSource::DefaultClientCredentials,
            ));
        }

        let token = defaults.api_token.clone().ok_or_else(|| {
            BridgeError::Config(format!("no default credentials for {}", defaults.domain))
        })?;
        Ok((token, None, CredentialSource::DefaultToken))
    }

    async fn exchange_cached(
        &self,
        domain: CredentialDomain,
        client_id: &str,
        client_secret: &SecretString,
        base_url: &str,
    ) -> Result<SecretString> {
        let key = CacheKey::new(domain, client_id, client_secret, base_url);
        let token = self
            .cache
            .get_or_exchange(key, || async {
                info!(domain = %domain, client_id = %client_id, base_url = %base_url, "Exchanging client credentials");
                let login = self.exchange.login(base_url, client_id, client_secret).await?;
                Ok(CachedToken::issued(
                    login.access_token,
                    login.expires_in_secs,
                    self.cache.now(),
                ))
            })
            .await?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ManualClock, MockTransport};
    use crate::traits::transport::HttpResponse;
    use chrono::{Duration, Utc};

    fn login_ok(token: &str) -> HttpResponse {
        HttpResponse::new(200, format!(r#"{{"access_token": "{token}", "expires_in": 1800}}"#))
    }

    fn broker(config: BridgeConfig, transport: Arc<MockTransport>, clock: Arc<ManualClock>) -> CredentialBroker {
        CredentialBroker::new(&config, transport).with_cache(Arc::new(TokenCache::with_clock(clock)))
    }

    fn config_with(emr: DomainDefaults) -> BridgeConfig {
        let mut config = BridgeConfig::from_lookup(|_| None);
        config.emr = emr;
        config
    }

    #[tokio::test]
    async fn test_param_token_wins() {
        let transport = Arc::new(MockTransport::new());
        let broker = broker(
            config_with(DomainDefaults::empty(CredentialDomain::Emr).with_client("d-id", "d-cs")),
            transport.clone(),
            Arc::new(ManualClock::new(Utc::now())),
        );
        let params = CredentialParams {
            api_token: Some(" tok ".into()),
            client_id: Some("cid".into()),
            client_secret: Some("cs".into()),
            base_url: Some("https://emr.example/".into()),
        };

        let (headers, base) = broker.headers(CredentialDomain::Emr, Some(&params)).await.unwrap();

        assert_eq!(headers["Authorization"], "Bearer tok");
        assert_eq!(base, "https://emr.example");
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_client_pair_exchanged_once_within_window() {
        let transport = Arc::new(MockTransport::new().with_response(login_ok("t1")).with_response(login_ok("t2")));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let broker = broker(config_with(DomainDefaults::empty(CredentialDomain::Emr)), transport.clone(), clock.clone());
        let params = CredentialParams::client("cid", "cs").with_base_url("https://emr.example");

        let first = broker.resolve(CredentialDomain::Emr, Some(&params)).await.unwrap();
        let second = broker.resolve(CredentialDomain::Emr, Some(&params)).await.unwrap();

        assert_eq!(first.access_token.expose(), "t1");
        assert_eq!(second.access_token.expose(), "t1");
        assert_eq!(second.source, CredentialSource::ParamClientCredentials);
        assert_eq!(second.client_id.as_deref(), Some("cid"));
        assert_eq!(transport.requests().len(), 1);

        clock.advance(Duration::seconds(1740));
        let third = broker.resolve(CredentialDomain::Emr, Some(&params)).await.unwrap();
        assert_eq!(third.access_token.expose(), "t2");
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_cache_is_keyed_by_base_url_and_domain() {
        let transport = Arc::new(
            MockTransport::new()
                .with_response(login_ok("a"))
                .with_response(login_ok("b"))
                .with_response(login_ok("c")),
        );
        let broker = broker(
            config_with(DomainDefaults::empty(CredentialDomain::Emr)),
            transport.clone(),
            Arc::new(ManualClock::new(Utc::now())),
        );

        let a = CredentialParams::client("cid", "cs").with_base_url("https://one.example");
        let b = CredentialParams::client("cid", "cs").with_base_url("https://two.example");
        broker.resolve(CredentialDomain::Emr, Some(&a)).await.unwrap();
        broker.resolve(CredentialDomain::Emr, Some(&b)).await.unwrap();
        broker.resolve(CredentialDomain::Scribe, Some(&a)).await.unwrap();

        assert_eq!(transport.requests().len(), 3);
        assert_eq!(broker.cache().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_client_pair_is_rejected() {
        let broker = broker(
            config_with(DomainDefaults::empty(CredentialDomain::Emr)),
            Arc::new(MockTransport::new()),
            Arc::new(ManualClock::new(Utc::now())),
        );
        let params = CredentialParams::client("  ", "cs");

        let err = broker.resolve(CredentialDomain::Emr, Some(&params)).await.unwrap_err();
        assert!(matches!(err, BridgeError::Auth(AuthError::EmptyClientCredentials)));
    }

    #[tokio::test]
    async fn test_defaults_prefer_client_pair() {
        let transport = Arc::new(MockTransport::new().with_response(login_ok("from-login")));
        let defaults = DomainDefaults::empty(CredentialDomain::Emr)
            .with_token("static")
            .with_client("d-id", "d-cs")
            .with_base_url("https://default.example");
        let broker = broker(config_with(defaults), transport.clone(), Arc::new(ManualClock::new(Utc::now())));

        let resolved = broker.resolve(CredentialDomain::Emr, None).await.unwrap();

        assert_eq!(resolved.access_token.expose(), "from-login");
        assert_eq!(resolved.source, CredentialSource::DefaultClientCredentials);
        assert_eq!(resolved.base_url, "https://default.example");
        assert_eq!(
            transport.requests()[0].url,
            "https://default.example/connect-auth/v1/account/login"
        );
    }

    #[tokio::test]
    async fn test_defaults_token_with_param_base_url() {
        let defaults = DomainDefaults::empty(CredentialDomain::Emr).with_token("static");
        let broker = broker(
            config_with(defaults),
            Arc::new(MockTransport::new()),
            Arc::new(ManualClock::new(Utc::now())),
        );
        let params = CredentialParams::default().with_base_url("https://override.example");

        let resolved = broker.resolve(CredentialDomain::Emr, Some(&params)).await.unwrap();

        assert_eq!(resolved.access_token.expose(), "static");
        assert_eq!(resolved.source, CredentialSource::DefaultToken);
        assert_eq!(resolved.base_url, "https://override.example");
    }

    #[tokio::test]
    async fn test_unconfigured_domain_is_config_error() {
        let broker = broker(
            config_with(DomainDefaults::empty(CredentialDomain::Emr)),
            Arc::new(MockTransport::new()),
            Arc::new(ManualClock::new(Utc::now())),
        );
        let err = broker.resolve(CredentialDomain::Emr, None).await.unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_failed_login_surfaces_auth_error() {
        let transport = Arc::new(MockTransport::new().with_response(HttpResponse::new(403, "nope")));
        let broker = broker(
            config_with(DomainDefaults::empty(CredentialDomain::Emr)),
            transport,
            Arc::new(ManualClock::new(Utc::now())),
        );
        let params = CredentialParams::client("cid", "cs");

        let err = broker.resolve(CredentialDomain::Emr, Some(&params)).await.unwrap_err();
        assert!(matches!(err, BridgeError::Auth(AuthError::LoginRejected { status: 403, .. })));
        assert!(broker.cache().peek(&CacheKey::new(
            CredentialDomain::Emr,
            "cid",
            &"cs".into(),
            crate::config::DEFAULT_EKA_BASE_URL
        )).await.is_none());
    }
}
