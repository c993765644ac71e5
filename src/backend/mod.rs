//! Inference backend abstraction.
//!
//! The diffusion pipeline is an external collaborator. `InferenceBackend` is the
//! seam the gateway talks to; `BackendHandle` is the write-once slot the
//! server installs the loaded backend into at startup.
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use tokio::sync::OnceCell;

use crate::error::{AppError, AppResult};

pub mod client;

pub use client::DiffusionClient;

/// Deterministic generator state, bound to the device the backend runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeededGenerator {
    pub seed: i64,
    pub device: String,
}

impl SeededGenerator {
    pub fn new(seed: i64, device: impl Into<String>) -> Self {
        SeededGenerator { seed, device: device.into() }
    }
}

/// Everything the backend needs for one call.
#[derive(Debug, Clone)]
pub struct InferenceParams {
    pub positive_prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub guidance_scale: f32,
    /// Images to produce in this call.
    pub count: u32,
    /// `None` means non-deterministic sampling.
    pub generator: Option<SeededGenerator>,
}

#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Device label the pipeline runs on, e.g. `cuda` or `cpu`.
    fn device(&self) -> &str;

    /// Run one generation. Implementations return an error rather than an
    /// empty or malformed image list.
    async fn infer(&self, params: InferenceParams) -> AppResult<Vec<DynamicImage>>;
}

#[derive(Clone, Default)]
pub struct BackendHandle {
    slot: Arc<OnceCell<Arc<dyn InferenceBackend>>>,
}

impl BackendHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that is ready from the start.
    pub fn ready(backend: Arc<dyn InferenceBackend>) -> Self {
        let handle = Self::new();
        let installed = handle.slot.set(backend).is_ok();
        debug_assert!(installed, "fresh cell was already set");
        handle
    }

    /// Install the loaded backend. Only the first call wins.
    pub fn install(&self, backend: Arc<dyn InferenceBackend>) -> AppResult<()> {
        self.slot
            .set(backend)
            .map_err(|_| AppError::Config("inference backend already installed".to_string()))
    }

    pub fn get(&self) -> AppResult<Arc<dyn InferenceBackend>> {
        self.slot.get().cloned().ok_or(AppError::BackendNotReady)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.initialized()
    }

    pub fn device(&self) -> Option<String> {
        self.slot.get().map(|b| b.device().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBackend;

    #[async_trait]
    impl InferenceBackend for NullBackend {
        fn device(&self) -> &str {
            "cpu"
        }

        async fn infer(&self, _params: InferenceParams) -> AppResult<Vec<DynamicImage>> {
            Ok(vec![DynamicImage::new_rgb8(1, 1)])
        }
    }

    #[test]
    fn empty_handle_is_not_ready() {
        let handle = BackendHandle::new();
        assert!(!handle.is_loaded());
        assert!(handle.device().is_none());
        assert!(matches!(handle.get(), Err(AppError::BackendNotReady)));
    }

    #[test]
    fn install_only_once() {
        let handle = BackendHandle::new();
        handle.install(Arc::new(NullBackend)).unwrap();
        assert!(handle.is_loaded());
        assert_eq!(handle.device().as_deref(), Some("cpu"));
        assert!(handle.install(Arc::new(NullBackend)).is_err());
    }

    #[test]
    fn ready_handle_is_loaded_and_refuses_a_second_install() {
        let handle = BackendHandle::ready(Arc::new(NullBackend));
        assert!(handle.is_loaded());
        assert!(handle.get().is_ok());
        assert!(handle.install(Arc::new(NullBackend)).is_err());
    }

    #[test]
    fn clones_share_the_slot() {
        let handle = BackendHandle::new();
        let clone = handle.clone();
        handle.install(Arc::new(NullBackend)).unwrap();
        assert!(clone.get().is_ok());
    }
}
