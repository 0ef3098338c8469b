//! The five stages of the mapping pipeline.
//!
//! Each stage reads what it needs from the shared state and returns only the
//! fields it produces.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use super::planner::PlanSynthesizer;
use super::queries::synthesize_queries;
use crate::error::Result;
use crate::fetch::{join_docs, DocumentFetch, NO_DOCS_FETCHED};
use crate::search::DocDiscovery;
use crate::traits::generator::GeneratorFactory;
use crate::traits::store::PlanStore;
use crate::types::{FetchedDocs, PipelineState, StateDelta};

/// Queries searched when the state carries none.
pub const DEFAULT_SEARCH_QUERIES: [&str; 2] = ["EMR API documentation", "REST API FHIR endpoints"];

pub const DEFAULT_EMR_ID: &str = "default";

/// One pipeline step: a function of state to state delta.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, state: &PipelineState) -> Result<StateDelta>;
}

/// Documentation URL to search queries.
pub struct SplitQueries {
    generators: Arc<dyn GeneratorFactory>,
}

impl SplitQueries {
    pub fn new(generators: Arc<dyn GeneratorFactory>) -> Self {
        Self { generators }
    }
}

#[async_trait]
impl Stage for SplitQueries {
    fn name(&self) -> &'static str {
        "split_queries"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateDelta> {
        let generator = self.generators.generator(&state.model)?;
        let queries = synthesize_queries(generator.as_ref(), &state.api_doc_url).await?;
        Ok(StateDelta {
            search_queries: Some(queries),
            ..Default::default()
        })
    }
}

/// Search queries to candidate documentation URLs.
pub struct SearchDocs {
    discovery: Arc<DocDiscovery>,
}

impl SearchDocs {
    pub fn new(discovery: Arc<DocDiscovery>) -> Self {
        Self { discovery }
    }
}

#[async_trait]
impl Stage for SearchDocs {
    fn name(&self) -> &'static str {
        "search_docs"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateDelta> {
        let mut queries = state
            .search_queries
            .as_ref()
            .map(|q| q.queries.clone())
            .unwrap_or_default();
        if queries.is_empty() {
            queries = DEFAULT_SEARCH_QUERIES.iter().map(|q| q.to_string()).collect();
        }

        let result = self.discovery.discover(&queries).await;
        info!(results = result.results.len(), "Doc search done");
        Ok(StateDelta {
            doc_search_result: Some(result),
            ..Default::default()
        })
    }
}

/// Candidate URLs to documentation text.
pub struct FetchDocs {
    fetch: Arc<DocumentFetch>,
}

impl FetchDocs {
    pub fn new(fetch: Arc<DocumentFetch>) -> Self {
        Self { fetch }
    }
}

#[async_trait]
impl Stage for FetchDocs {
    fn name(&self) -> &'static str {
        "fetch_docs"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateDelta> {
        let urls = state
            .doc_search_result
            .as_ref()
            .map(|r| r.urls())
            .unwrap_or_default();

        if urls.is_empty() {
            info!("No URLs to fetch");
            return Ok(StateDelta {
                fetched_docs: Some(FetchedDocs::default()),
                doc_content: Some(NO_DOCS_FETCHED.to_string()),
                ..Default::default()
            });
        }

        let fetched = self.fetch.fetch_all(&urls).await;
        let doc_content = join_docs(&fetched);
        info!(docs = fetched.docs.len(), chars = doc_content.len(), "Docs fetched");
        Ok(StateDelta {
            fetched_docs: Some(fetched),
            doc_content: Some(doc_content),
            ..Default::default()
        })
    }
}

/// Documentation text plus bundle summary to a request plan.
pub struct PlanEmr {
    generators: Arc<dyn GeneratorFactory>,
}

impl PlanEmr {
    pub fn new(generators: Arc<dyn GeneratorFactory>) -> Self {
        Self { generators }
    }
}

#[async_trait]
impl Stage for PlanEmr {
    fn name(&self) -> &'static str {
        "plan_emr"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateDelta> {
        let generator = self.generators.generator(&state.model)?;
        let draft = PlanSynthesizer::new(generator)
            .synthesize(state.doc_content.as_deref().unwrap_or_default(), &state.fhir_bundle)
            .await?;
        Ok(StateDelta {
            request_plan: Some(draft.plan),
            reasoning: Some(draft.reasoning),
            ..Default::default()
        })
    }
}

/// Saves the plan. A storage failure is logged and does not affect success.
pub struct PersistMapping {
    plans: Arc<dyn PlanStore>,
}

impl PersistMapping {
    pub fn new(plans: Arc<dyn PlanStore>) -> Self {
        Self { plans }
    }
}

#[async_trait]
impl Stage for PersistMapping {
    fn name(&self) -> &'static str {
        "persist_mapping"
    }

    async fn run(&self, state: &PipelineState) -> Result<StateDelta> {
        let plan = state.request_plan.clone().unwrap_or_default();
        let emr_id = match state.emr_id.trim() {
            "" => DEFAULT_EMR_ID,
            id => id,
        };
        let api_doc_url = Some(state.api_doc_url.as_str()).filter(|u| !u.is_empty());

        match self
            .plans
            .upsert_mapping(emr_id, &plan.push_fhir, &plan.get_fhir, api_doc_url)
            .await
        {
            Ok(()) => info!(emr_id = %emr_id, "Mapping saved"),
            Err(e) => warn!(emr_id = %emr_id, error = %e, "Saving mapping failed"),
        }

        Ok(StateDelta {
            final_mapping: Some(plan),
            success: Some(true),
            ..Default::default()
        })
    }
}
