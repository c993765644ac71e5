//! HTTP client for an OpenAI-compatible diffusion sidecar.
//!
//! - `load` probes `/v1/models` once and checks the configured model is served.
//! - `infer` posts to `/v1/images/generations` with `response_format=b64_json`
//!   and decodes every returned image.
use async_trait::async_trait;
use image::DynamicImage;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::backend::{InferenceBackend, InferenceParams};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::utils::image_codec::decode_base64_image;

#[derive(Debug, Serialize)]
pub struct SidecarImageRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<&'a str>,
    pub size: String,
    pub n: u32,
    pub response_format: &'static str,
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SidecarImageResponse {
    pub data: Vec<SidecarImageData>,
}

#[derive(Debug, Deserialize)]
pub struct SidecarImageData {
    pub b64_json: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SidecarModelList {
    data: Vec<SidecarModelEntry>,
}

#[derive(Debug, Deserialize)]
struct SidecarModelEntry {
    id: String,
}

#[derive(Clone)]
pub struct DiffusionClient {
    client: Client,
    base_url: String,
    model: String,
    device: String,
}

impl DiffusionClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(config.backend_timeout)
            .build()
            .map_err(AppError::HttpClient)?;
        Ok(DiffusionClient {
            client,
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            model: config.backend_model.clone(),
            device: config.backend_device.clone(),
        })
    }

    /// Build a client and confirm the sidecar serves the configured model.
    pub async fn load(config: &Config) -> AppResult<Self> {
        let client = Self::new(config)?;
        let models = client.list_models().await?;
        if !models.iter().any(|m| m == &client.model) {
            return Err(AppError::Backend(format!(
                "model '{}' is not served by {} (available: {})",
                client.model,
                client.base_url,
                models.join(", ")
            )));
        }
        tracing::info!("Inference backend ready: model={} device={}", client.model, client.device);
        Ok(client)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Model ids reported by the sidecar's `/v1/models`.
    pub async fn list_models(&self) -> AppResult<Vec<String>> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self.client.get(&url)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            let list: SidecarModelList = response.json().await.map_err(AppError::HttpClient)?;
            Ok(list.data.into_iter().map(|m| m.id).collect())
        } else {
            Err(AppError::Backend(format!("Failed to list models: {:?}", response.status())))
        }
    }

    pub fn build_request<'a>(&'a self, params: &'a InferenceParams) -> SidecarImageRequest<'a> {
        SidecarImageRequest {
            model: &self.model,
            prompt: &params.positive_prompt,
            negative_prompt: Some(params.negative_prompt.as_str()).filter(|s| !s.is_empty()),
            size: format!("{}x{}", params.width, params.height),
            n: params.count,
            response_format: "b64_json",
            guidance_scale: params.guidance_scale,
            num_inference_steps: params.steps,
            seed: params.generator.as_ref().map(|g| g.seed),
        }
    }
}

/// Decode the sidecar's payload into images, in order.
pub fn decode_images(response: SidecarImageResponse) -> AppResult<Vec<DynamicImage>> {
    let mut images = Vec::with_capacity(response.data.len());
    for (i, entry) in response.data.into_iter().enumerate() {
        let b64 = entry
            .b64_json
            .ok_or_else(|| AppError::Backend(format!("image {} has no b64_json payload", i)))?;
        images.push(decode_base64_image(&b64)?);
    }
    if images.is_empty() {
        return Err(AppError::Backend("backend returned no images".to_string()));
    }
    Ok(images)
}

#[async_trait]
impl InferenceBackend for DiffusionClient {
    fn device(&self) -> &str {
        &self.device
    }

    async fn infer(&self, params: InferenceParams) -> AppResult<Vec<DynamicImage>> {
        let url = format!("{}/v1/images/generations", self.base_url);
        let body = self.build_request(&params);
        tracing::debug!("Sending generation to {}: {:?}", url, body);

        let response = self.client.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            let payload: SidecarImageResponse = response.json().await.map_err(AppError::HttpClient)?;
            decode_images(payload)
        } else {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "Unable to read error body".to_string());
            let error_message = format!("Generation failed. Status: {}, Body: {}", status, error_body);
            tracing::error!("{}", error_message);
            Err(AppError::Backend(error_message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SeededGenerator;
    use crate::utils::image_codec::encode_png_base64;
    use std::time::Duration;

    fn config(url: &str) -> Config {
        Config {
            backend_url: url.to_string(),
            backend_model: "sd-test".to_string(),
            backend_device: "cpu".to_string(),
            backend_timeout: Duration::from_secs(2),
            api_host: "127.0.0.1".to_string(),
            api_port: "8000".to_string(),
        }
    }

    fn params(seed: Option<i64>, negative: &str) -> InferenceParams {
        InferenceParams {
            positive_prompt: "a shield".to_string(),
            negative_prompt: negative.to_string(),
            width: 256,
            height: 128,
            steps: 20,
            guidance_scale: 7.5,
            count: 2,
            generator: seed.map(|s| SeededGenerator::new(s, "cpu")),
        }
    }

    fn png_b64() -> String {
        encode_png_base64(&DynamicImage::new_rgb8(4, 3)).unwrap()
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = DiffusionClient::new(&config("http://localhost:8082/")).unwrap();
        assert_eq!(client.base_url, "http://localhost:8082");
        assert_eq!(client.model(), "sd-test");
        assert_eq!(client.device(), "cpu");
    }

    #[test]
    fn request_body_carries_sampling_parameters() {
        let client = DiffusionClient::new(&config("http://localhost:8082")).unwrap();
        let p = params(Some(42), "blurry");
        let body = serde_json::to_value(client.build_request(&p)).unwrap();
        assert_eq!(body["model"], "sd-test");
        assert_eq!(body["prompt"], "a shield");
        assert_eq!(body["negative_prompt"], "blurry");
        assert_eq!(body["size"], "256x128");
        assert_eq!(body["n"], 2);
        assert_eq!(body["response_format"], "b64_json");
        assert_eq!(body["num_inference_steps"], 20);
        assert_eq!(body["seed"], 42);
    }

    #[test]
    fn negative_seed_is_forwarded_as_is() {
        let client = DiffusionClient::new(&config("http://localhost:8082")).unwrap();
        let body = serde_json::to_value(client.build_request(&params(Some(-1), "blurry"))).unwrap();
        assert_eq!(body["seed"], -1);
    }

    #[test]
    fn unseeded_request_omits_seed_and_empty_negative() {
        let client = DiffusionClient::new(&config("http://localhost:8082")).unwrap();
        let p = params(None, "");
        let body = serde_json::to_value(client.build_request(&p)).unwrap();
        assert!(body.get("seed").is_none());
        assert!(body.get("negative_prompt").is_none());
    }

    #[test]
    fn decode_keeps_order_and_dimensions() {
        let response = SidecarImageResponse {
            data: vec![
                SidecarImageData { b64_json: Some(png_b64()) },
                SidecarImageData { b64_json: Some(png_b64()) },
            ],
        };
        let images = decode_images(response).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!((images[0].width(), images[0].height()), (4, 3));
    }

    #[test]
    fn decode_rejects_empty_and_missing_payloads() {
        assert!(decode_images(SidecarImageResponse { data: vec![] }).is_err());
        let missing = SidecarImageResponse { data: vec![SidecarImageData { b64_json: None }] };
        assert!(matches!(decode_images(missing), Err(AppError::Backend(_))));
        let garbage = SidecarImageResponse {
            data: vec![SidecarImageData { b64_json: Some("!!not base64!!".to_string()) }],
        };
        assert!(matches!(decode_images(garbage), Err(AppError::Decode(_))));
    }

    #[tokio::test]
    async fn load_fails_when_sidecar_unreachable() {
        let result = DiffusionClient::load(&config("http://127.0.0.1:59999")).await;
        assert!(matches!(result, Err(AppError::HttpClient(_))));
    }
}
