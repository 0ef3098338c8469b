//! Shared state threaded through the mapping pipeline.
//!
//! Stages read from a [`PipelineState`] and return a [`StateDelta`] holding only
//! the fields they produce. Merging never touches fields the delta leaves unset.

use serde::Serialize;
use serde_json::Value;

use super::docs::{DocSearchResult, FetchedDocs, SearchQueries};
use super::plan::RequestPlan;
use crate::security::SecretString;

/// Per-run text-generation overrides.
#[derive(Debug, Clone, Default)]
pub struct ModelOverrides {
    pub api_key: Option<SecretString>,
    pub model: Option<String>,
}

impl ModelOverrides {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(key));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Inputs of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Documentation or EMR base URL; may be empty.
    pub api_doc_url: String,
    pub fhir_bundle: Value,
    /// Key under which the resulting plan is persisted.
    pub emr_id: String,
    pub model: ModelOverrides,
}

impl PipelineInput {
    pub fn new(api_doc_url: impl Into<String>, fhir_bundle: Value) -> Self {
        Self {
            api_doc_url: api_doc_url.into(),
            fhir_bundle,
            emr_id: "default".to_string(),
            model: ModelOverrides::default(),
        }
    }

    pub fn with_emr_id(mut self, emr_id: impl Into<String>) -> Self {
        self.emr_id = emr_id.into();
        self
    }

    pub fn with_model(mut self, model: ModelOverrides) -> Self {
        self.model = model;
        self
    }
}

/// Total-but-partial record: inputs are always set, outputs appear as stages run.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub api_doc_url: String,
    pub fhir_bundle: Value,
    pub emr_id: String,
    pub model: ModelOverrides,

    pub search_queries: Option<SearchQueries>,
    pub doc_search_result: Option<DocSearchResult>,
    pub fetched_docs: Option<FetchedDocs>,
    pub doc_content: Option<String>,
    pub request_plan: Option<RequestPlan>,
    pub reasoning: Option<String>,
    pub final_mapping: Option<RequestPlan>,
    pub success: Option<bool>,
}

impl From<PipelineInput> for PipelineState {
    fn from(input: PipelineInput) -> Self {
        Self {
            api_doc_url: input.api_doc_url,
            fhir_bundle: input.fhir_bundle,
            emr_id: input.emr_id,
            model: input.model,
            search_queries: None,
            doc_search_result: None,
            fetched_docs: None,
            doc_content: None,
            request_plan: None,
            reasoning: None,
            final_mapping: None,
            success: None,
        }
    }
}

impl PipelineState {
    /// Overwrite exactly the fields the delta sets.
    pub fn merge(&mut self, delta: StateDelta) {
        let StateDelta {
            search_queries,
            doc_search_result,
            fetched_docs,
            doc_content,
            request_plan,
            reasoning,
            final_mapping,
            success,
        } = delta;

        if search_queries.is_some() {
            self.search_queries = search_queries;
        }
        if doc_search_result.is_some() {
            self.doc_search_result = doc_search_result;
        }
        if fetched_docs.is_some() {
            self.fetched_docs = fetched_docs;
        }
        if doc_content.is_some() {
            self.doc_content = doc_content;
        }
        if request_plan.is_some() {
            self.request_plan = request_plan;
        }
        if reasoning.is_some() {
            self.reasoning = reasoning;
        }
        if final_mapping.is_some() {
            self.final_mapping = final_mapping;
        }
        if success.is_some() {
            self.success = success;
        }
    }

    pub fn into_outcome(self) -> PipelineOutcome {
        PipelineOutcome {
            request_plan: self.request_plan.unwrap_or_default(),
            final_mapping: self.final_mapping,
            success: self.success.unwrap_or(false),
            reasoning: self.reasoning.unwrap_or_default(),
            search_queries: self.search_queries.map(|q| q.queries).unwrap_or_default(),
            doc_urls: self
                .doc_search_result
                .map(|r| r.urls())
                .unwrap_or_default(),
        }
    }
}

/// Fields produced by one stage.
#[derive(Debug, Clone, Default)]
pub struct StateDelta {
    pub search_queries: Option<SearchQueries>,
    pub doc_search_result: Option<DocSearchResult>,
    pub fetched_docs: Option<FetchedDocs>,
    pub doc_content: Option<String>,
    pub request_plan: Option<RequestPlan>,
    pub reasoning: Option<String>,
    pub final_mapping: Option<RequestPlan>,
    pub success: Option<bool>,
}

impl StateDelta {
    /// Names of the fields this delta sets, for logging.
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.search_queries.is_some() {
            names.push("search_queries");
        }
        if self.doc_search_result.is_some() {
            names.push("doc_search_result");
        }
        if self.fetched_docs.is_some() {
            names.push("fetched_docs");
        }
        if self.doc_content.is_some() {
            names.push("doc_content");
        }
        if self.request_plan.is_some() {
            names.push("request_plan");
        }
        if self.reasoning.is_some() {
            names.push("reasoning");
        }
        if self.final_mapping.is_some() {
            names.push("final_mapping");
        }
        if self.success.is_some() {
            names.push("success");
        }
        names
    }
}

/// What a pipeline run returns to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub request_plan: RequestPlan,
    pub final_mapping: Option<RequestPlan>,
    pub success: bool,
    pub reasoning: String,
    pub search_queries: Vec<String>,
    pub doc_urls: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state() -> PipelineState {
        PipelineInput::new("https://docs.example", json!({"resourceType": "Bundle"})).into()
    }

    #[test]
    fn test_merge_only_overwrites_set_fields() {
        let mut state = state();
        state.merge(StateDelta {
            doc_content: Some("docs".into()),
            ..Default::default()
        });
        state.merge(StateDelta {
            reasoning: Some("because".into()),
            ..Default::default()
        });

        assert_eq!(state.doc_content.as_deref(), Some("docs"));
        assert_eq!(state.reasoning.as_deref(), Some("because"));
        assert_eq!(state.api_doc_url, "https://docs.example");
        assert!(state.request_plan.is_none());
    }

    #[test]
    fn test_field_names() {
        let delta = StateDelta {
            request_plan: Some(RequestPlan::empty()),
            success: Some(true),
            ..Default::default()
        };
        assert_eq!(delta.field_names(), vec!["request_plan", "success"]);
    }

    #[test]
    fn test_outcome_defaults_when_stages_did_not_run() {
        let outcome = state().into_outcome();
        assert!(!outcome.success);
        assert!(outcome.request_plan.is_empty());
        assert!(outcome.final_mapping.is_none());
        assert!(outcome.search_queries.is_empty());
    }
}
