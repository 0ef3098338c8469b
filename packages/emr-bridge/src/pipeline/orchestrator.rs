//! Runs the mapping stages in order over one shared state.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use super::stages::{FetchDocs, PersistMapping, PlanEmr, SearchDocs, SplitQueries, Stage};
use crate::error::{BridgeError, Result};
use crate::fetch::DocumentFetch;
use crate::search::DocDiscovery;
use crate::traits::generator::GeneratorFactory;
use crate::traits::store::PlanStore;
use crate::types::{PipelineInput, PipelineOutcome, PipelineState};

/// Fixed sequence: split_queries, search_docs, fetch_docs, plan_emr, persist_mapping.
///
/// Upstream failures inside stages degrade to fallbacks, so a run completes
/// unless the input is unusable or a configuration error occurs.
pub struct MappingPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl MappingPipeline {
    pub fn new(
        generators: Arc<dyn GeneratorFactory>,
        discovery: DocDiscovery,
        fetch: DocumentFetch,
        plans: Arc<dyn PlanStore>,
    ) -> Self {
        Self::from_stages(vec![
            Box::new(SplitQueries::new(generators.clone())),
            Box::new(SearchDocs::new(Arc::new(discovery))),
            Box::new(FetchDocs::new(Arc::new(fetch))),
            Box::new(PlanEmr::new(generators)),
            Box::new(PersistMapping::new(plans)),
        ])
    }

    /// A pipeline over arbitrary stages, run in the given order.
    pub fn from_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, input: PipelineInput) -> Result<PipelineOutcome> {
        Ok(self.run_state(input).await?.into_outcome())
    }

    /// Run every stage and return the final state.
    #[instrument(skip_all, fields(emr_id = %input.emr_id))]
    pub async fn run_state(&self, input: PipelineInput) -> Result<PipelineState> {
        if !input.fhir_bundle.is_object() {
            return Err(BridgeError::InvalidInput(
                "fhir_bundle must be a JSON object".to_string(),
            ));
        }

        let started = Instant::now();
        let mut state = PipelineState::from(input);

        for stage in &self.stages {
            info!(stage = stage.name(), "Stage starting");
            let delta = stage.run(&state).await?;
            info!(stage = stage.name(), fields = ?delta.field_names(), "Stage done");
            state.merge(delta);
        }

        info!(
            success = state.success.unwrap_or(false),
            duration_ms = started.elapsed().as_millis() as u64,
            "Mapping pipeline done"
        );
        Ok(state)
    }
}
