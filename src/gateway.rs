//! Generation gateway.
//!
//! Turns a validated `GenerationRequest` into a `GenerationResponse`: composes
//! prompts, delegates to the installed backend, optionally strips backgrounds,
//! and encodes the images. Backend and encoding failures come back as a
//! `failed` response; the only error `generate` returns is `BackendNotReady`.
use std::sync::Arc;

use image::DynamicImage;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::backend::{BackendHandle, InferenceBackend, InferenceParams, SeededGenerator};
use crate::error::{AppError, AppResult};
use crate::models::{GenerationRequest, GenerationResponse};
use crate::postprocess::{remove_background, GraphCutSegmenter, Segmenter};
use crate::prompt::{compose, ComposedPrompt};
use crate::utils::image_codec::encode_png_base64;

pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Encoded output of one successful generation.
struct GeneratedAssets {
    prompt: ComposedPrompt,
    images: Vec<String>,
}

#[derive(Clone)]
pub struct GenerationGateway {
    backend: BackendHandle,
    segmenter: Arc<dyn Segmenter>,
}

impl GenerationGateway {
    pub fn new(backend: BackendHandle) -> Self {
        Self::with_segmenter(backend, Arc::new(GraphCutSegmenter::default()))
    }

    pub fn with_segmenter(backend: BackendHandle, segmenter: Arc<dyn Segmenter>) -> Self {
        GenerationGateway { backend, segmenter }
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    /// Run one request. Assumes `request` already passed validation.
    pub async fn generate(&self, request: &GenerationRequest) -> AppResult<GenerationResponse> {
        let backend = self.backend.get()?;
        let request_id = new_request_id();

        match self.run(backend.as_ref(), request).await {
            Ok(assets) => {
                tracing::info!(
                    request_id = %request_id,
                    images = assets.images.len(),
                    "Generation completed"
                );
                let metadata = success_metadata(request, &assets.prompt);
                Ok(GenerationResponse::completed(request_id, assets.images, metadata))
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, "Generation failed: {}", e);
                Ok(GenerationResponse::failed(request_id, e))
            }
        }
    }

    /// Validate and run, folding every failure into a `failed` response.
    pub async fn generate_checked(&self, request: &GenerationRequest) -> GenerationResponse {
        let outcome = match request.validate() {
            Ok(()) => self.generate(request).await,
            Err(e) => Err(e),
        };
        outcome.unwrap_or_else(|e| {
            tracing::warn!("Rejected request: {}", e);
            GenerationResponse::failed(new_request_id(), e)
        })
    }

    /// Process items one at a time, in order. A bad item becomes a `failed`
    /// entry and does not stop the rest.
    pub async fn generate_batch(
        &self,
        items: Vec<AppResult<GenerationRequest>>,
    ) -> Vec<GenerationResponse> {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        for (index, item) in items.into_iter().enumerate() {
            tracing::debug!("Batch item {}/{}", index + 1, total);
            let response = match item {
                Ok(request) => self.generate_checked(&request).await,
                Err(e) => {
                    tracing::warn!("Batch item {} rejected: {}", index, e);
                    GenerationResponse::failed(new_request_id(), e)
                }
            };
            results.push(response);
        }
        results
    }

    async fn run(
        &self,
        backend: &dyn InferenceBackend,
        request: &GenerationRequest,
    ) -> AppResult<GeneratedAssets> {
        let prompt = compose(request);
        tracing::debug!(positive = %prompt.positive, negative = %prompt.negative, "Composed prompts");

        let generator = request
            .seed
            .map(|seed| SeededGenerator::new(seed, backend.device()));

        let params = InferenceParams {
            positive_prompt: prompt.positive.clone(),
            negative_prompt: prompt.negative.clone(),
            width: request.width,
            height: request.height,
            steps: request.num_inference_steps,
            guidance_scale: request.guidance_scale,
            count: request.batch_size,
            generator,
        };

        let images = backend.infer(params).await?;
        if images.is_empty() {
            return Err(AppError::Backend("backend returned no images".to_string()));
        }

        let transparent = request.transparent_background;
        let segmenter = Arc::clone(&self.segmenter);
        let encoded = tokio::task::spawn_blocking(move || {
            images
                .into_iter()
                .map(|img| {
                    let img = if transparent {
                        DynamicImage::ImageRgba8(remove_background(&img, segmenter.as_ref()))
                    } else {
                        img
                    };
                    encode_png_base64(&img)
                })
                .collect::<AppResult<Vec<String>>>()
        })
        .await??;

        Ok(GeneratedAssets { prompt, images: encoded })
    }
}

fn success_metadata(request: &GenerationRequest, prompt: &ComposedPrompt) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("positive_prompt".to_string(), json!(prompt.positive));
    metadata.insert("negative_prompt".to_string(), json!(prompt.negative));
    metadata.insert("asset_type".to_string(), json!(request.asset_type.as_str()));
    metadata.insert("style".to_string(), json!(request.game_style.as_str()));
    metadata.insert("dimensions".to_string(), json!(request.dimensions()));
    metadata.insert("seed".to_string(), json!(request.seed));
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetType, GameStyle, GenerationStatus};
    use crate::postprocess::{Label, Rect, SegmentationError};
    use async_trait::async_trait;
    use image::{RgbImage, Rgb};
    use std::sync::Mutex;

    /// Records every call and returns `count` solid images.
    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Vec<InferenceParams>>,
    }

    #[async_trait]
    impl InferenceBackend for RecordingBackend {
        fn device(&self) -> &str {
            "cpu"
        }

        async fn infer(&self, params: InferenceParams) -> AppResult<Vec<DynamicImage>> {
            let count = params.count;
            let (w, h) = (params.width, params.height);
            self.calls.lock().unwrap().push(params);
            Ok((0..count)
                .map(|i| DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([i as u8, 0, 0]))))
                .collect())
        }
    }

    struct EmptyBackend;

    #[async_trait]
    impl InferenceBackend for EmptyBackend {
        fn device(&self) -> &str {
            "cpu"
        }

        async fn infer(&self, _params: InferenceParams) -> AppResult<Vec<DynamicImage>> {
            Ok(Vec::new())
        }
    }

    struct FailingSegmenter;

    impl Segmenter for FailingSegmenter {
        fn segment(&self, _image: &RgbImage, _rect: Rect) -> Result<Vec<Label>, SegmentationError> {
            Err(SegmentationError::EmptyModel("foreground"))
        }
    }

    fn request() -> GenerationRequest {
        let mut req = GenerationRequest::new("a potion", AssetType::Item, GameStyle::Cartoon);
        req.width = 64;
        req.height = 96;
        req
    }

    #[tokio::test]
    async fn forwards_sampling_parameters_and_seed() {
        let backend = Arc::new(RecordingBackend::default());
        let gateway = GenerationGateway::new(BackendHandle::ready(backend.clone()));
        let mut req = request();
        req.seed = Some(1234);
        req.batch_size = 2;
        req.num_inference_steps = 30;

        let response = gateway.generate(&req).await.unwrap();
        assert_eq!(response.status, GenerationStatus::Completed);
        assert_eq!(response.images.len(), 2);
        assert_eq!(response.metadata["seed"], json!(1234));
        assert_eq!(response.metadata["dimensions"], json!("64x96"));
        assert_eq!(response.metadata["style"], json!("cartoon"));
        assert_eq!(response.metadata["asset_type"], json!("item"));

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].count, 2);
        assert_eq!(calls[0].steps, 30);
        assert_eq!(calls[0].generator, Some(SeededGenerator::new(1234, "cpu")));
        assert_eq!(calls[0].positive_prompt, response.metadata["positive_prompt"]);
    }

    #[tokio::test]
    async fn missing_seed_means_no_generator() {
        let backend = Arc::new(RecordingBackend::default());
        let gateway = GenerationGateway::new(BackendHandle::ready(backend.clone()));
        let response = gateway.generate(&request()).await.unwrap();
        assert_eq!(response.metadata["seed"], Value::Null);
        assert!(backend.calls.lock().unwrap()[0].generator.is_none());
    }

    #[tokio::test]
    async fn not_ready_backend_fails_fast() {
        let gateway = GenerationGateway::new(BackendHandle::new());
        let result = gateway.generate(&request()).await;
        assert!(matches!(result, Err(AppError::BackendNotReady)));
    }

    #[tokio::test]
    async fn empty_backend_output_is_a_failure() {
        let gateway = GenerationGateway::new(BackendHandle::ready(Arc::new(EmptyBackend)));
        let response = gateway.generate(&request()).await.unwrap();
        assert_eq!(response.status, GenerationStatus::Failed);
        assert!(response.images.is_empty());
        assert!(response.metadata["error"].as_str().unwrap().contains("no images"));
    }

    #[tokio::test]
    async fn transparent_output_is_rgba_even_when_segmentation_fails() {
        let gateway = GenerationGateway::with_segmenter(
            BackendHandle::ready(Arc::new(RecordingBackend::default())),
            Arc::new(FailingSegmenter),
        );
        let mut req = request();
        req.transparent_background = true;
        let response = gateway.generate(&req).await.unwrap();
        assert!(response.is_completed());

        let img = crate::utils::image_codec::decode_base64_image(&response.images[0]).unwrap();
        assert_eq!((img.width(), img.height()), (64, 96));
        assert!(img.color().has_alpha());
        assert!(img.to_rgba8().pixels().all(|p| p[3] == 255));
    }

    #[tokio::test]
    async fn checked_generation_folds_validation_errors() {
        let gateway = GenerationGateway::new(BackendHandle::ready(Arc::new(RecordingBackend::default())));
        let mut req = request();
        req.width = 32;
        let response = gateway.generate_checked(&req).await;
        assert_eq!(response.status, GenerationStatus::Failed);
        assert!(response.metadata["error"].as_str().unwrap().contains("width"));
    }
}
