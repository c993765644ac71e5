//! Router setup and shared state.
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers;
use crate::backend::BackendHandle;
use crate::gateway::GenerationGateway;

pub struct AppState {
    pub gateway: GenerationGateway,
    /// Device label reported by `/health`.
    pub device: String,
}

impl AppState {
    pub fn new(backend: BackendHandle, device: impl Into<String>) -> Self {
        Self::with_gateway(GenerationGateway::new(backend), device)
    }

    pub fn with_gateway(gateway: GenerationGateway, device: impl Into<String>) -> Self {
        AppState { gateway, device: device.into() }
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/generate", post(handlers::generate))
        .route("/batch-generate", post(handlers::batch_generate))
        .route("/styles", get(handlers::styles))
        .route("/asset-types", get(handlers::asset_types))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
