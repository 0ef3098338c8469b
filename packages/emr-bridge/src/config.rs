//! Process configuration for the bridge.
//!
//! Values come from environment variables. Blank values count as unset, and
//! each credential domain falls back to the legacy shared `EKA_*` variables.

use crate::error::{BridgeError, Result};
use crate::security::SecretString;
use crate::types::CredentialDomain;

pub const DEFAULT_EKA_BASE_URL: &str = "https://api.eka.care";
pub const DEFAULT_GROQ_MODEL: &str = llm_client::DEFAULT_MODEL;
pub const DEFAULT_GROQ_BASE_URL: &str = llm_client::DEFAULT_BASE_URL;

/// Default credentials for one vendor domain.
#[derive(Debug, Clone)]
pub struct DomainDefaults {
    pub domain: CredentialDomain,
    pub api_token: Option<SecretString>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    /// Without a trailing slash.
    pub base_url: String,
}

impl DomainDefaults {
    /// A domain with no credentials against the default base URL.
    pub fn empty(domain: CredentialDomain) -> Self {
        Self {
            domain,
            api_token: None,
            client_id: None,
            client_secret: None,
            base_url: DEFAULT_EKA_BASE_URL.to_string(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(SecretString::new(token));
        self
    }

    pub fn with_client(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(SecretString::new(client_secret));
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The client-id/secret pair, when both are set.
    pub fn client_credentials(&self) -> Option<(&str, &SecretString)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret)),
            _ => None,
        }
    }

    /// Usable when a token or a complete client pair is configured.
    pub fn validate(&self) -> Result<()> {
        if self.api_token.is_some() || self.client_credentials().is_some() {
            return Ok(());
        }
        let message = match self.domain {
            CredentialDomain::Scribe => {
                "EkaScribe requires EKASCRIBE_API_TOKEN or (EKASCRIBE_CLIENT_ID + EKASCRIBE_CLIENT_SECRET), \
                 legacy EKA_*, or backup EKA_CLIENT_SCRIBE_SECRET / EKA_CLIENT_SCRIBE_CLIENT_ID"
            }
            CredentialDomain::Emr => {
                "Eka EMR requires EKAEMR_API_TOKEN or (EKAEMR_CLIENT_ID + EKAEMR_CLIENT_SECRET), or legacy EKA_*"
            }
        };
        Err(BridgeError::Config(message.to_string()))
    }
}

/// Everything the bridge reads from the process environment.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub scribe: DomainDefaults,
    pub emr: DomainDefaults,
    pub groq_api_key: Option<SecretString>,
    pub groq_model: String,
    pub groq_base_url: String,
    /// Primary search backend is disabled when unset.
    pub tavily_api_key: Option<SecretString>,
}

impl BridgeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let first = |keys: &[&str]| keys.iter().find_map(|k| get(k));

        let legacy_base = get("EKA_BASE_URL").unwrap_or_else(|| DEFAULT_EKA_BASE_URL.to_string());

        let scribe = DomainDefaults {
            domain: CredentialDomain::Scribe,
            api_token: first(&["EKASCRIBE_API_TOKEN", "EKA_API_TOKEN", "EKA_CLIENT_SCRIBE_SECRET"])
                .map(SecretString::new),
            client_id: first(&["EKASCRIBE_CLIENT_ID", "EKA_CLIENT_ID", "EKA_CLIENT_SCRIBE_CLIENT_ID"]),
            client_secret: first(&["EKASCRIBE_CLIENT_SECRET", "EKA_CLIENT_SECRET"]).map(SecretString::new),
            base_url: String::new(),
        }
        .with_base_url(get("EKASCRIBE_BASE_URL").unwrap_or_else(|| legacy_base.clone()));

        let emr = DomainDefaults {
            domain: CredentialDomain::Emr,
            api_token: first(&["EKAEMR_API_TOKEN", "EKA_API_TOKEN"]).map(SecretString::new),
            client_id: first(&["EKAEMR_CLIENT_ID", "EKA_CLIENT_ID"]),
            client_secret: first(&["EKAEMR_CLIENT_SECRET", "EKA_CLIENT_SECRET"]).map(SecretString::new),
            base_url: String::new(),
        }
        .with_base_url(get("EKAEMR_BASE_URL").unwrap_or_else(|| legacy_base.clone()));

        Self {
            scribe,
            emr,
            groq_api_key: get("GROQ_API_KEY").map(SecretString::new),
            groq_model: get("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
            groq_base_url: get("GROQ_BASE_URL").unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
            tavily_api_key: get("TAVILY_API_KEY").map(SecretString::new),
        }
    }

    pub fn domain(&self, domain: CredentialDomain) -> &DomainDefaults {
        match domain {
            CredentialDomain::Scribe => &self.scribe,
            CredentialDomain::Emr => &self.emr,
        }
    }
}
