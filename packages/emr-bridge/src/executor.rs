//! Plan executor: replays one direction of a request plan against a live EMR.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::mapping;
use crate::text::truncate_chars;
use crate::traits::transport::{HttpRequest, HttpTransport};
use crate::types::{Direction, HttpMethod, RequestPlan, RequestSpec, ResolvedCredentials};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Characters of the last response body kept in an outcome.
pub const MAX_BODY_CHARS: usize = 2000;
/// Characters of the response body quoted in an error message.
pub const MAX_ERROR_BODY_CHARS: usize = 500;

pub const NO_SPECS_ERROR: &str = "No request specs in plan";

/// Result of executing one direction of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutcome {
    pub ok: bool,
    /// Status of the last request that got a response.
    pub status: Option<u16>,
    /// Body of that response, capped.
    pub body: String,
    pub error: Option<String>,
    /// Requests that got a response (including the failing one).
    pub requests_sent: usize,
}

impl ExecutionOutcome {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: None,
            body: String::new(),
            error: Some(error.into()),
            requests_sent: 0,
        }
    }
}

/// Runs request specs sequentially, stopping at the first failure.
pub struct PlanExecutor {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl PlanExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Execute the `direction` sequence of `plan` with bodies built from `bundle`.
    ///
    /// An empty sequence is a failure. A status of 400 or above, or a transport
    /// error, halts execution; later specs are never sent.
    pub async fn execute(
        &self,
        plan: &RequestPlan,
        bundle: &Value,
        credentials: &ResolvedCredentials,
        direction: Direction,
    ) -> ExecutionOutcome {
        let specs = plan.specs(direction);
        if specs.is_empty() {
            warn!(direction = direction.plan_key(), "Plan has no request specs");
            return ExecutionOutcome::failure(NO_SPECS_ERROR);
        }

        info!(direction = direction.plan_key(), count = specs.len(), "Executing plan");

        let mut outcome = ExecutionOutcome {
            ok: true,
            status: None,
            body: String::new(),
            error: None,
            requests_sent: 0,
        };

        for (index, spec) in specs.iter().enumerate() {
            let request = self.build_request(spec, bundle, credentials);
            debug!(index, method = %request.method, url = %request.url, "Executing spec");

            let response = match self.transport.send(request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!(index, error = %e, "Spec failed in transport");
                    return ExecutionOutcome {
                        requests_sent: outcome.requests_sent,
                        ..ExecutionOutcome::failure(e.to_string())
                    };
                }
            };

            outcome.requests_sent += 1;
            outcome.status = Some(response.status);
            outcome.body = truncate_chars(&response.body, MAX_BODY_CHARS).to_string();

            if response.status >= 400 {
                warn!(index, status = response.status, "Spec rejected by EMR");
                outcome.ok = false;
                outcome.error = Some(format!(
                    "HTTP {}: {}",
                    response.status,
                    truncate_chars(&outcome.body, MAX_ERROR_BODY_CHARS)
                ));
                return outcome;
            }
        }

        info!(
            direction = direction.plan_key(),
            status = ?outcome.status,
            "Plan executed"
        );
        outcome
    }

    fn build_request(
        &self,
        spec: &RequestSpec,
        bundle: &Value,
        credentials: &ResolvedCredentials,
    ) -> HttpRequest {
        let url = build_url(&spec.url, &credentials.base_url);
        let headers = build_headers(&spec.headers, credentials);

        let request = HttpRequest::new(spec.method.clone(), url, self.timeout).with_headers(headers);
        match (&spec.method, &spec.body_template) {
            (HttpMethod::Get, _) | (_, None) => request,
            (_, Some(template)) if spec.fhir_mapping.is_empty() => request.with_json(template.clone()),
            (_, Some(template)) => request.with_json(mapping::apply(template, bundle)),
        }
    }
}

/// Join a relative spec URL onto the base URL. Absolute URLs pass through.
pub fn build_url(spec_url: &str, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.is_empty() || spec_url.is_empty() || spec_url.starts_with("http") {
        return spec_url.to_string();
    }
    format!("{}/{}", base, spec_url.trim_start_matches('/'))
}

/// Spec headers, overridden by credential headers, with a default content type.
///
/// Header names are compared case-insensitively when overriding.
pub fn build_headers(
    spec_headers: &BTreeMap<String, String>,
    credentials: &ResolvedCredentials,
) -> BTreeMap<String, String> {
    let credential_headers = credentials.headers();
    let mut headers = spec_headers.clone();
    headers.retain(|name, _| {
        !credential_headers
            .keys()
            .any(|cred| cred.eq_ignore_ascii_case(name))
    });
    headers.extend(credential_headers);
    if !headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
        headers.insert("Content-Type".to_string(), "application/json".to_string());
    }
    headers
}
