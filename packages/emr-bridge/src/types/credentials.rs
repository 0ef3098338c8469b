//! Vendor credential shapes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::security::SecretString;

/// One of the two independently configured vendor integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialDomain {
    /// Transcription service
    Scribe,
    /// Records service
    Emr,
}

impl CredentialDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scribe => "scribe",
            Self::Emr => "emr",
        }
    }
}

impl fmt::Display for CredentialDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call credential overrides. Every field is optional; blank strings count as unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialParams {
    #[serde(default)]
    pub api_token: Option<SecretString>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<SecretString>,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl CredentialParams {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            api_token: Some(SecretString::new(token)),
            ..Default::default()
        }
    }

    pub fn client(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(SecretString::new(client_secret)),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// True when no field carries a usable value.
    pub fn is_empty(&self) -> bool {
        self.api_token.as_ref().map_or(true, SecretString::is_blank)
            && self.client_id.as_deref().map_or(true, |s| s.trim().is_empty())
            && self.client_secret.as_ref().map_or(true, SecretString::is_blank)
            && self.base_url.as_deref().map_or(true, |s| s.trim().is_empty())
    }
}

/// Which strategy produced a [`ResolvedCredentials`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    ParamToken,
    ParamClientCredentials,
    DefaultToken,
    DefaultClientCredentials,
}

/// A bearer token plus the base URL it is valid against.
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub access_token: SecretString,
    /// Sent as a `client-id` header when present.
    pub client_id: Option<String>,
    /// Without a trailing slash.
    pub base_url: String,
    pub source: CredentialSource,
}

impl ResolvedCredentials {
    pub fn new(access_token: SecretString, base_url: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            access_token,
            client_id: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            source,
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// `Authorization` (and `client-id` when known) headers.
    ///
    /// The returned map holds the raw token; do not log it.
    pub fn headers(&self) -> BTreeMap<String, String> {
        let mut headers = BTreeMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.access_token.expose()),
        );
        if let Some(client_id) = self.client_id.as_deref().filter(|c| !c.is_empty()) {
            headers.insert("client-id".to_string(), client_id.to_string());
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_blank_fields_are_empty() {
        let params = CredentialParams {
            api_token: Some(SecretString::new("  ")),
            client_id: Some(String::new()),
            ..Default::default()
        };
        assert!(params.is_empty());
        assert!(!CredentialParams::token("t").is_empty());
    }

    #[test]
    fn test_params_deserialize_partial() {
        let params: CredentialParams =
            serde_json::from_str(r#"{"client_id": "cid", "client_secret": "cs"}"#).unwrap();
        assert_eq!(params.client_id.as_deref(), Some("cid"));
        assert_eq!(params.client_secret.unwrap().expose(), "cs");
        assert!(params.api_token.is_none());
    }

    #[test]
    fn test_resolved_headers() {
        let creds = ResolvedCredentials::new("tok".into(), "https://emr.example/", CredentialSource::ParamToken)
            .with_client_id("cid");

        assert_eq!(creds.base_url, "https://emr.example");
        let headers = creds.headers();
        assert_eq!(headers["Authorization"], "Bearer tok");
        assert_eq!(headers["client-id"], "cid");
    }

    #[test]
    fn test_resolved_debug_hides_token() {
        let creds = ResolvedCredentials::new("tok-secret".into(), "https://x", CredentialSource::DefaultToken);
        assert!(!format!("{creds:?}").contains("tok-secret"));
    }
}
