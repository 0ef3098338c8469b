//! FHIR bundle intake.

use axum::{
    extract::{Extension, Path},
    Json,
};
use emr_bridge::types::bundle::is_bundle;
use emr_bridge::StoredBundle;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct BundleUpload {
    pub bundle: Value,
}

#[derive(Debug, Serialize)]
pub struct BundleCreated {
    pub id: Uuid,
}

pub async fn create_bundle_handler(
    Extension(state): Extension<AppState>,
    Json(upload): Json<BundleUpload>,
) -> Result<Json<BundleCreated>, ApiError> {
    if !is_bundle(&upload.bundle) {
        return Err(ApiError::BadRequest(
            "bundle must be a FHIR Bundle (resourceType \"Bundle\")".to_string(),
        ));
    }
    let id = state.bundles.insert_bundle(upload.bundle).await?;
    info!(%id, "Bundle stored");
    Ok(Json(BundleCreated { id }))
}

pub async fn get_bundle_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StoredBundle>, ApiError> {
    state
        .bundles
        .get_bundle_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Bundle {id} not found")))
}
