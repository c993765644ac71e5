//! Axum request handlers for the HTTP API.
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use crate::api::routes::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{AssetType, BatchGenerationResponse, GameStyle, GenerationRequest, GenerationResponse};
use crate::prompt::profiles::{asset_description, style_description};

pub async fn root() -> &'static str {
    "Game Asset Generation Service"
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let backend = state.gateway.backend();
    Json(json!({
        "status": "healthy",
        "device": backend.device().unwrap_or_else(|| state.device.clone()),
        "pipeline_loaded": backend.is_loaded(),
    }))
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> AppResult<Json<GenerationResponse>> {
    let Json(request) = payload?;
    request.validate()?;
    state.gateway.generate(&request).await.map(Json)
}

// Items are parsed one by one so a malformed entry only fails itself.
pub async fn batch_generate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Vec<Value>>, JsonRejection>,
) -> AppResult<Json<BatchGenerationResponse>> {
    let Json(items) = payload?;
    tracing::info!("Batch generation with {} items", items.len());
    let parsed = items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<GenerationRequest>(item)
                .map_err(|e| AppError::Validation(e.to_string()))
        })
        .collect();
    let results = state.gateway.generate_batch(parsed).await;
    Ok(Json(BatchGenerationResponse { results }))
}

pub async fn styles() -> Json<Value> {
    let ids: Vec<&str> = GameStyle::ALL.iter().map(|s| s.as_str()).collect();
    let descriptions: Map<String, Value> = GameStyle::ALL
        .iter()
        .filter_map(|s| style_description(*s).map(|d| (s.as_str().to_string(), json!(d))))
        .collect();
    Json(json!({ "styles": ids, "descriptions": descriptions }))
}

pub async fn asset_types() -> Json<Value> {
    let ids: Vec<&str> = AssetType::ALL.iter().map(|a| a.as_str()).collect();
    let descriptions: Map<String, Value> = AssetType::ALL
        .iter()
        .filter_map(|a| asset_description(*a).map(|d| (a.as_str().to_string(), json!(d))))
        .collect();
    Json(json!({ "asset_types": ids, "descriptions": descriptions }))
}
