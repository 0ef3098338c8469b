//! Mapping runs and plan execution.

use axum::{extract::Extension, Json};
use emr_bridge::types::ModelOverrides;
use emr_bridge::{
    CredentialDomain, CredentialParams, Direction, ExecutionOutcome, PipelineInput, PipelineOutcome,
    RequestPlan,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct MappingRequest {
    #[serde(default)]
    pub api_doc_url: Option<String>,
    #[serde(default)]
    pub emr_id: Option<String>,
    /// Per-run model key, falls back to the server's key.
    #[serde(default)]
    pub groq_api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl MappingRequest {
    fn model_overrides(&self) -> ModelOverrides {
        let mut overrides = ModelOverrides::default();
        if let Some(key) = self.groq_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            overrides = overrides.with_api_key(key.trim());
        }
        if let Some(model) = self.model.as_deref().filter(|m| !m.trim().is_empty()) {
            overrides = overrides.with_model(model.trim());
        }
        overrides
    }
}

/// Run the mapping pipeline over the first stored bundle.
pub async fn mapping_handler(
    Extension(state): Extension<AppState>,
    body: Option<Json<MappingRequest>>,
) -> Result<Json<PipelineOutcome>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let bundle = state.bundles.get_first_bundle().await?.ok_or_else(|| {
        ApiError::BadRequest("No FHIR bundle in DB (fhir_bundles table empty)".to_string())
    })?;

    let mut input = PipelineInput::new(request.api_doc_url.clone().unwrap_or_default(), bundle.bundle)
        .with_model(request.model_overrides());
    if let Some(emr_id) = request.emr_id.as_deref().filter(|id| !id.trim().is_empty()) {
        input = input.with_emr_id(emr_id.trim());
    }

    info!(emr_id = %input.emr_id, bundle_id = %bundle.id, "Mapping run requested");
    let outcome = state.pipeline.run(input).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub emr_id: String,
    #[serde(default)]
    pub bundle_id: Option<Uuid>,
    #[serde(default = "default_direction")]
    pub direction: Direction,
    #[serde(default)]
    pub credentials: Option<CredentialParams>,
}

fn default_direction() -> Direction {
    Direction::Push
}

/// Replay a stored plan against the EMR.
pub async fn execute_handler(
    Extension(state): Extension<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> Result<Json<ExecutionOutcome>, ApiError> {
    let mapping = state
        .plans
        .get_mapping(&request.emr_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No mapping stored for emr_id {}", request.emr_id)))?;

    let bundle = match request.bundle_id {
        Some(id) => state.bundles.get_bundle_by_id(id).await?,
        None => state.bundles.get_first_bundle().await?,
    }
    .ok_or_else(|| ApiError::NotFound("FHIR bundle not found".to_string()))?;

    let credentials = state
        .broker
        .resolve(CredentialDomain::Emr, request.credentials.as_ref())
        .await?;

    let plan = RequestPlan {
        push_fhir: mapping.push_fhir,
        get_fhir: mapping.get_fhir,
    };
    let outcome = state
        .executor
        .execute(&plan, &bundle.bundle, &credentials, request.direction)
        .await;

    info!(
        emr_id = %request.emr_id,
        direction = request.direction.plan_key(),
        ok = outcome.ok,
        status = ?outcome.status,
        "Plan executed"
    );
    Ok(Json(outcome))
}
