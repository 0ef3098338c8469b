use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::{AuthError, AuthResult};
use crate::security::SecretString;
use crate::text::truncate_chars;
use crate::traits::transport::{HttpRequest, HttpTransport};
use crate::types::HttpMethod;

pub const LOGIN_PATH: &str = "/connect-auth/v1/account/login";
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(15);
/// Lifetime assumed when the login response omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 1800;
/// Longest lifetime accepted from a login response.
pub const MAX_EXPIRES_IN_SECS: i64 = 86_400 * 365;

/// A token returned by the login endpoint.
#[derive(Debug, Clone)]
pub struct LoginToken {
    pub access_token: SecretString,
    pub expires_in_secs: i64,
}

/// Exchanges a client-id/secret pair for a bearer token.
#[derive(Clone)]
pub struct LoginExchange {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl LoginExchange {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            timeout: LOGIN_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `POST {base_url}/connect-auth/v1/account/login` with the client pair.
    pub async fn login(
        &self,
        base_url: &str,
        client_id: &str,
        client_secret: &SecretString,
    ) -> AuthResult<LoginToken> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), LOGIN_PATH);
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        let request = HttpRequest::new(HttpMethod::Post, url.clone(), self.timeout)
            .with_headers(headers)
            .with_json(json!({
                "client_id": client_id,
                "client_secret": client_secret.expose(),
            }));

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            warn!(url = %url, status = response.status, "Login rejected");
            return Err(AuthError::LoginRejected {
                status: response.status,
                body: truncate_chars(&response.body, 500).to_string(),
            });
        }

        let data: Value = serde_json::from_str(&response.body).unwrap_or(Value::Null);
        let access_token = data
            .get("access_token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingAccessToken)?;
        let expires_in_secs = data
            .get("expires_in")
            .and_then(parse_seconds)
            .filter(|secs| (0..=MAX_EXPIRES_IN_SECS).contains(secs))
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        info!(url = %url, client_id = %client_id, expires_in_secs, "Login exchange OK");

        Ok(LoginToken {
            access_token: SecretString::new(access_token),
            expires_in_secs,
        })
    }
}

fn parse_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::traits::transport::HttpResponse;

    #[tokio::test]
    async fn test_login_posts_client_pair() {
        let transport = Arc::new(MockTransport::new().with_response(HttpResponse::new(
            200,
            r#"{"access_token": "tok-1", "expires_in": 600}"#,
        )));
        let exchange = LoginExchange::new(transport.clone());

        let token = exchange
            .login("https://emr.example/", "cid", &SecretString::new("cs"))
            .await
            .unwrap();

        assert_eq!(token.access_token.expose(), "tok-1");
        assert_eq!(token.expires_in_secs, 600);

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "https://emr.example/connect-auth/v1/account/login");
        assert_eq!(requests[0].method, HttpMethod::Post);
        assert_eq!(requests[0].timeout, LOGIN_TIMEOUT);
        assert_eq!(
            requests[0].body,
            Some(json!({"client_id": "cid", "client_secret": "cs"}))
        );
    }

    #[tokio::test]
    async fn test_missing_expires_in_uses_default() {
        let transport = Arc::new(
            MockTransport::new().with_response(HttpResponse::new(200, r#"{"access_token": "t"}"#)),
        );
        let token = LoginExchange::new(transport)
            .login("https://x", "cid", &"cs".into())
            .await
            .unwrap();
        assert_eq!(token.expires_in_secs, DEFAULT_EXPIRES_IN_SECS);
    }

    #[tokio::test]
    async fn test_out_of_range_expires_in_uses_default() {
        for raw in ["1e19", "-9223372036854775808", "-5", "99999999999"] {
            let body = format!(r#"{{"access_token": "t", "expires_in": {raw}}}"#);
            let transport = Arc::new(MockTransport::new().with_response(HttpResponse::new(200, body)));
            let token = LoginExchange::new(transport)
                .login("https://x", "cid", &"cs".into())
                .await
                .unwrap();
            assert_eq!(token.expires_in_secs, DEFAULT_EXPIRES_IN_SECS, "expires_in = {raw}");
        }
    }

    #[tokio::test]
    async fn test_missing_token_is_error() {
        let transport = Arc::new(
            MockTransport::new().with_response(HttpResponse::new(200, r#"{"expires_in": 10}"#)),
        );
        let err = LoginExchange::new(transport)
            .login("https://x", "cid", &"cs".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingAccessToken));
    }

    #[tokio::test]
    async fn test_rejected_login() {
        let transport = Arc::new(
            MockTransport::new().with_response(HttpResponse::new(401, "bad credentials")),
        );
        let err = LoginExchange::new(transport)
            .login("https://x", "cid", &"cs".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::LoginRejected { status: 401, .. }));
    }

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds(&json!(60)), Some(60));
        assert_eq!(parse_seconds(&json!("90")), Some(90));
        assert_eq!(parse_seconds(&json!(12.7)), Some(12));
        assert_eq!(parse_seconds(&json!(null)), None);
    }
}
