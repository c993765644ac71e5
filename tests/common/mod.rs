//! Shared fixtures: a deterministic in-process backend and request builders.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use game_asset_api::backend::{BackendHandle, InferenceBackend, InferenceParams};
use game_asset_api::models::{AssetType, GameStyle, GenerationRequest};
use game_asset_api::{AppError, AppResult};
use image::{DynamicImage, Rgb, RgbImage};

/// Any prompt containing this marker makes `StubBackend` fail.
pub const FAIL_MARKER: &str = "FAIL";

/// Paints solid images whose colour depends only on the seed and image index.
#[derive(Default)]
pub struct StubBackend {
    pub calls: AtomicUsize,
}

impl StubBackend {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for StubBackend {
    fn device(&self) -> &str {
        "cpu"
    }

    async fn infer(&self, params: InferenceParams) -> AppResult<Vec<DynamicImage>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if params.positive_prompt.contains(FAIL_MARKER) {
            return Err(AppError::Backend("CUDA out of memory".to_string()));
        }
        let seed = params.generator.as_ref().map(|g| g.seed).unwrap_or(7);
        Ok((0..params.count)
            .map(|i| {
                let shade = (seed + i as i64).rem_euclid(256) as u8;
                DynamicImage::ImageRgb8(RgbImage::from_pixel(
                    params.width,
                    params.height,
                    Rgb([shade, 255 - shade, 64]),
                ))
            })
            .collect())
    }
}

pub fn ready_backend() -> (Arc<StubBackend>, BackendHandle) {
    let stub = Arc::new(StubBackend::default());
    let handle = BackendHandle::ready(stub.clone());
    (stub, handle)
}

pub fn request(prompt: &str) -> GenerationRequest {
    let mut req = GenerationRequest::new(prompt, AssetType::Weapon, GameStyle::Fantasy);
    req.width = 64;
    req.height = 64;
    req
}
