//! Game asset generation service library
//!
//! Modules:
//! - `api`: Axum HTTP handlers and router setup used by the binary.
//! - `backend`: Inference backend trait, write-once handle and HTTP sidecar client.
//! - `gateway`: Orchestrates one generation from composed prompts to encoded images.
//! - `models`: Request/response types and boundary validation.
//! - `postprocess`: Best-effort background removal.
//! - `prompt`: Style/asset profiles and prompt composition.
//! - `utils`: PNG/base64 codec helpers.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `DiffusionClient`,
//! `GenerationGateway`, `GenerationRequest` and `GenerationResponse`.
pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod postprocess;
pub mod prompt;
pub mod utils;

pub use backend::{BackendHandle, DiffusionClient, InferenceBackend};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use gateway::GenerationGateway;
pub use models::{GenerationRequest, GenerationResponse};
