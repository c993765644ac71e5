//! Request and response types for the generation API.
//!
//! `GenerationRequest` carries serde defaults for every optional field and a
//! `validate` method that enforces the documented numeric bounds. Range checks
//! reject; nothing is clamped.
use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

pub const NUM_IMAGES_RANGE: RangeInclusive<u32> = 1..=5;
pub const DIMENSION_RANGE: RangeInclusive<u32> = 64..=1024;
pub const GUIDANCE_SCALE_RANGE: RangeInclusive<f32> = 1.0..=20.0;
pub const INFERENCE_STEPS_RANGE: RangeInclusive<u32> = 10..=100;
pub const BATCH_SIZE_RANGE: RangeInclusive<u32> = 1..=2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Character,
    Background,
    Weapon,
    Item,
    UiElement,
    Texture,
    Icon,
    Environment,
}

impl AssetType {
    pub const ALL: [AssetType; 8] = [
        AssetType::Character,
        AssetType::Background,
        AssetType::Weapon,
        AssetType::Item,
        AssetType::UiElement,
        AssetType::Texture,
        AssetType::Icon,
        AssetType::Environment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Character => "character",
            AssetType::Background => "background",
            AssetType::Weapon => "weapon",
            AssetType::Item => "item",
            AssetType::UiElement => "ui_element",
            AssetType::Texture => "texture",
            AssetType::Icon => "icon",
            AssetType::Environment => "environment",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStyle {
    PixelArt,
    LowPoly,
    Realistic,
    Cartoon,
    HandDrawn,
    Isometric,
    Anime,
    SciFi,
    Minimalist,
    Fantasy,
}

impl GameStyle {
    pub const ALL: [GameStyle; 10] = [
        GameStyle::PixelArt,
        GameStyle::LowPoly,
        GameStyle::Realistic,
        GameStyle::Cartoon,
        GameStyle::HandDrawn,
        GameStyle::Isometric,
        GameStyle::Anime,
        GameStyle::SciFi,
        GameStyle::Minimalist,
        GameStyle::Fantasy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameStyle::PixelArt => "pixel_art",
            GameStyle::LowPoly => "low_poly",
            GameStyle::Realistic => "realistic",
            GameStyle::Cartoon => "cartoon",
            GameStyle::HandDrawn => "hand_drawn",
            GameStyle::Isometric => "isometric",
            GameStyle::Anime => "anime",
            GameStyle::SciFi => "sci_fi",
            GameStyle::Minimalist => "minimalist",
            GameStyle::Fantasy => "fantasy",
        }
    }
}

impl fmt::Display for GameStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_num_images() -> u32 {
    1
}

fn default_dimension() -> u32 {
    512
}

fn default_guidance_scale() -> f32 {
    7.5
}

fn default_inference_steps() -> u32 {
    50
}

fn default_batch_size() -> u32 {
    1
}

/// One generation task as submitted by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub asset_type: AssetType,
    pub game_style: GameStyle,
    #[serde(default = "default_num_images")]
    pub num_images: u32,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    #[serde(default = "default_guidance_scale")]
    pub guidance_scale: f32,
    #[serde(default = "default_inference_steps")]
    pub num_inference_steps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    /// Accepted for compatibility; generation does not consult it.
    #[serde(default)]
    pub enhance_details: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default)]
    pub transparent_background: bool,
}

impl GenerationRequest {
    /// Minimal request with every optional field at its default.
    pub fn new(prompt: impl Into<String>, asset_type: AssetType, game_style: GameStyle) -> Self {
        GenerationRequest {
            prompt: prompt.into(),
            negative_prompt: None,
            asset_type,
            game_style,
            num_images: default_num_images(),
            width: default_dimension(),
            height: default_dimension(),
            guidance_scale: default_guidance_scale(),
            num_inference_steps: default_inference_steps(),
            seed: None,
            enhance_details: false,
            batch_size: default_batch_size(),
            transparent_background: false,
        }
    }

    /// Check every bounded field and report all violations at once.
    pub fn validate(&self) -> AppResult<()> {
        let mut problems = Vec::new();

        if self.prompt.trim().is_empty() {
            problems.push("prompt must not be empty".to_string());
        }
        check_range(&mut problems, "num_images", self.num_images, &NUM_IMAGES_RANGE);
        check_range(&mut problems, "width", self.width, &DIMENSION_RANGE);
        check_range(&mut problems, "height", self.height, &DIMENSION_RANGE);
        check_range(&mut problems, "guidance_scale", self.guidance_scale, &GUIDANCE_SCALE_RANGE);
        check_range(
            &mut problems,
            "num_inference_steps",
            self.num_inference_steps,
            &INFERENCE_STEPS_RANGE,
        );
        check_range(&mut problems, "batch_size", self.batch_size, &BATCH_SIZE_RANGE);

        if problems.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(problems.join("; ")))
        }
    }

    pub fn dimensions(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

fn check_range<T>(problems: &mut Vec<String>, field: &str, value: T, range: &RangeInclusive<T>)
where
    T: PartialOrd + fmt::Display,
{
    // NaN fails `contains`, so it is rejected along with out-of-range values
    if !range.contains(&value) {
        problems.push(format!(
            "{} must be between {} and {}, got {}",
            field,
            range.start(),
            range.end(),
            value
        ));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub request_id: String,
    pub status: GenerationStatus,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl GenerationResponse {
    pub fn completed(request_id: String, images: Vec<String>, metadata: Map<String, Value>) -> Self {
        GenerationResponse {
            request_id,
            status: GenerationStatus::Completed,
            images,
            metadata,
        }
    }

    pub fn failed(request_id: String, error: impl fmt::Display) -> Self {
        let mut metadata = Map::new();
        metadata.insert("error".to_string(), Value::String(error.to_string()));
        GenerationResponse {
            request_id,
            status: GenerationStatus::Failed,
            images: Vec::new(),
            metadata,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == GenerationStatus::Completed
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchGenerationResponse {
    pub results: Vec<GenerationResponse>,
}
