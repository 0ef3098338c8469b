//! Testing utilities including mock implementations.
//!
//! These drive the pipeline, broker and executor without any network calls.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};

use crate::error::{BridgeError, FetchError, FetchResult, Result, TransportError, TransportResult};
use crate::traits::{
    clock::Clock,
    fetcher::DocFetcher,
    generator::{GeneratorFactory, TextGenerator},
    searcher::DocSearcher,
    store::{PlanStore, StoredMapping},
    transport::{HttpRequest, HttpResponse, HttpTransport},
};
use crate::types::{DocHit, ModelOverrides, RequestSpec};

/// Record of a call made to the mock generator.
#[derive(Debug, Clone)]
pub struct MockGeneratorCall {
    pub system: String,
    pub user: String,
}

enum Failure {
    Generation(String),
    Config(String),
}

/// A scripted text generator.
///
/// Rules match a needle against the system prompt, first rule wins. A rule
/// with several replies hands them out in order and then repeats the last.
#[derive(Default)]
pub struct MockGenerator {
    rules: Mutex<Vec<(String, VecDeque<String>)>>,
    default_reply: Option<String>,
    failure: Option<Failure>,
    calls: RwLock<Vec<MockGeneratorCall>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply used when no rule matches.
    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = Some(reply.into());
        self
    }

    pub fn with_reply(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.with_replies(needle, vec![reply.into()])
    }

    pub fn with_replies(self, needle: impl Into<String>, replies: Vec<String>) -> Self {
        self.rules
            .lock()
            .unwrap()
            .push((needle.into(), replies.into_iter().collect()));
        self
    }

    /// Every call fails with a generation error.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(Failure::Generation(message.into()));
        self
    }

    /// Every call fails with a configuration error.
    pub fn failing_config(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(Failure::Config(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<MockGeneratorCall> {
        self.calls.read().unwrap().clone()
    }

    fn scripted_reply(&self, system: &str) -> Option<String> {
        let mut rules = self.rules.lock().unwrap();
        let (_, replies) = rules.iter_mut().find(|(needle, _)| system.contains(needle.as_str()))?;
        if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        }
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.calls.write().unwrap().push(MockGeneratorCall {
            system: system_prompt.to_string(),
            user: user_prompt.to_string(),
        });

        match &self.failure {
            Some(Failure::Generation(msg)) => return Err(BridgeError::Generation(msg.clone())),
            Some(Failure::Config(msg)) => return Err(BridgeError::Config(msg.clone())),
            None => {}
        }

        self.scripted_reply(system_prompt)
            .or_else(|| self.default_reply.clone())
            .ok_or_else(|| BridgeError::Generation("no scripted reply".to_string()))
    }
}

/// Hands out one shared [`MockGenerator`], or fails as an unconfigured backend.
pub struct MockGeneratorFactory {
    generator: Option<Arc<MockGenerator>>,
    overrides: RwLock<Vec<ModelOverrides>>,
}

impl MockGeneratorFactory {
    pub fn new(generator: Arc<MockGenerator>) -> Self {
        Self {
            generator: Some(generator),
            overrides: RwLock::new(Vec::new()),
        }
    }

    /// Factory without an API key.
    pub fn unconfigured() -> Self {
        Self {
            generator: None,
            overrides: RwLock::new(Vec::new()),
        }
    }

    /// Overrides seen per `generator` call.
    pub fn overrides(&self) -> Vec<ModelOverrides> {
        self.overrides.read().unwrap().clone()
    }
}

impl GeneratorFactory for MockGeneratorFactory {
    fn generator(&self, overrides: &ModelOverrides) -> Result<Arc<dyn TextGenerator>> {
        self.overrides.write().unwrap().push(overrides.clone());
        match &self.generator {
            Some(generator) => Ok(generator.clone()),
            None => Err(BridgeError::Config("GROQ_API_KEY not set".to_string())),
        }
    }
}

/// A search backend with canned hits per query.
pub struct MockSearcher {
    name: String,
    configured: bool,
    hits: HashMap<String, Vec<DocHit>>,
    failing: HashSet<String>,
    calls: RwLock<Vec<(String, usize)>>,
}

impl MockSearcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configured: true,
            hits: HashMap::new(),
            failing: HashSet::new(),
            calls: RwLock::new(Vec::new()),
        }
    }

    pub fn with_hits(mut self, query: impl Into<String>, hits: Vec<DocHit>) -> Self {
        self.hits.insert(query.into(), hits);
        self
    }

    pub fn fail_query(mut self, query: impl Into<String>) -> Self {
        self.failing.insert(query.into());
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// `(query, limit)` per search call.
    pub fn calls(&self) -> Vec<(String, usize)> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl DocSearcher for MockSearcher {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<DocHit>> {
        self.calls.write().unwrap().push((query.to_string(), limit));
        if self.failing.contains(query) {
            return Err(BridgeError::Search(format!("{} failed for {query}", self.name)));
        }
        Ok(self
            .hits
            .get(query)
            .map(|hits| hits.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A fetcher serving canned pages. Unknown URLs answer 404.
#[derive(Default)]
pub struct MockFetcher {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    calls: RwLock<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.pages.insert(url.into(), content.into());
        self
    }

    /// Fetching this URL times out.
    pub fn fail_url(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl DocFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<String> {
        self.calls.write().unwrap().push(url.to_string());
        if self.failing.contains(url) {
            return Err(FetchError::Timeout { url: url.to_string() });
        }
        self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 404,
        })
    }
}

/// A transport replaying queued outcomes; answers `200 {}` once the queue is empty.
#[derive(Default)]
pub struct MockTransport {
    queue: Mutex<VecDeque<TransportResult<HttpResponse>>>,
    requests: RwLock<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: HttpResponse) -> Self {
        self.queue.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn with_error(self, error: TransportError) -> Self {
        self.queue.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.read().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        self.requests.write().unwrap().push(request);
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(HttpResponse::new(200, "{}")))
    }
}

/// A plan store whose writes always fail. Records the ids it was asked to save.
#[derive(Default)]
pub struct FailingPlanStore {
    attempts: RwLock<Vec<String>>,
}

impl FailingPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.read().unwrap().clone()
    }
}

#[async_trait]
impl PlanStore for FailingPlanStore {
    async fn upsert_mapping(
        &self,
        emr_id: &str,
        _push_fhir: &[RequestSpec],
        _get_fhir: &[RequestSpec],
        _api_doc_url: Option<&str>,
    ) -> Result<()> {
        self.attempts.write().unwrap().push(emr_id.to_string());
        Err(BridgeError::Storage("database unavailable".into()))
    }

    async fn get_mapping(&self, _emr_id: &str) -> Result<Option<StoredMapping>> {
        Err(BridgeError::Storage("database unavailable".into()))
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A small bundle: Patient `patient-1`, then Encounter `encounter-1`.
pub fn sample_bundle() -> Value {
    json!({
        "resourceType": "Bundle",
        "type": "collection",
        "entry": [
            {
                "resource": {
                    "resourceType": "Patient",
                    "id": "patient-1",
                    "name": [{"family": "Rao", "given": ["Asha"]}],
                    "gender": "female",
                    "birthDate": "1988-04-12"
                }
            },
            {
                "resource": {
                    "resourceType": "Encounter",
                    "id": "encounter-1",
                    "status": "finished",
                    "subject": {"reference": "Patient/patient-1"}
                }
            }
        ]
    })
}
