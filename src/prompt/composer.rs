//! Prompt composition.
//!
//! Wraps the user's literal prompt in style framing and appends asset and
//! style hints; builds the negative prompt by appending style and asset
//! exclusions after whatever the user supplied. Part order is fixed.
use crate::models::GenerationRequest;
use crate::prompt::profiles::{asset_profile, style_profile};

pub const TRANSPARENT_POSITIVE: &str = "transparent background, no background";
pub const TRANSPARENT_NEGATIVE: &str = "background, detailed background, complex background";

const SEPARATOR: &str = ", ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    pub positive: String,
    pub negative: String,
}

/// Build the positive and negative prompts for `request`.
pub fn compose(request: &GenerationRequest) -> ComposedPrompt {
    let style = style_profile(request.game_style);
    let asset = asset_profile(request.asset_type);

    let mut positive: Vec<&str> = Vec::with_capacity(5);
    if let Some(prefix) = style.map(|s| s.prefix).filter(|s| !s.is_empty()) {
        positive.push(prefix);
    }
    positive.push(&request.prompt);
    if let Some(suffix) = asset.map(|a| a.suffix).filter(|s| !s.is_empty()) {
        positive.push(suffix);
    }
    if let Some(suffix) = style.map(|s| s.suffix).filter(|s| !s.is_empty()) {
        positive.push(suffix);
    }
    if request.transparent_background {
        positive.push(TRANSPARENT_POSITIVE);
    }

    let mut negative: Vec<&str> = Vec::with_capacity(4);
    if let Some(user) = request.negative_prompt.as_deref().filter(|s| !s.is_empty()) {
        negative.push(user);
    }
    if let Some(neg) = style.map(|s| s.negative).filter(|s| !s.is_empty()) {
        negative.push(neg);
    }
    if let Some(neg) = asset.map(|a| a.negative).filter(|s| !s.is_empty()) {
        negative.push(neg);
    }
    if request.transparent_background {
        negative.push(TRANSPARENT_NEGATIVE);
    }

    ComposedPrompt {
        positive: positive.join(SEPARATOR),
        negative: negative.join(SEPARATOR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AssetType, GameStyle};

    fn request(asset: AssetType, style: GameStyle) -> GenerationRequest {
        GenerationRequest::new("a brave knight", asset, style)
    }

    #[test]
    fn style_framing_surrounds_user_prompt() {
        let composed = compose(&request(AssetType::Character, GameStyle::PixelArt));
        assert_eq!(
            composed.positive,
            "pixel art, 8-bit style, retro game graphics, a brave knight, \
             game character, standing pose, full body, character design, \
             pixelated, sharp edges, limited color palette"
        );
        assert_eq!(
            composed.negative,
            "blurry, smooth, realistic, photographic, anti-aliased, \
             multiple characters, crowd, background elements"
        );
    }

    #[test]
    fn unmapped_pair_degrades_to_raw_prompt() {
        let composed = compose(&request(AssetType::Background, GameStyle::LowPoly));
        assert_eq!(composed.positive, "a brave knight");
        assert_eq!(composed.negative, "");
    }

    #[test]
    fn user_negative_comes_first() {
        let mut req = request(AssetType::Weapon, GameStyle::Fantasy);
        req.negative_prompt = Some("text, watermark".to_string());
        let composed = compose(&req);
        assert!(composed.negative.starts_with("text, watermark, "));
        let user_at = composed.negative.find("text, watermark").unwrap();
        let style_at = composed.negative.find("modern, sci-fi").unwrap();
        let asset_at = composed.negative.find("character holding").unwrap();
        assert!(user_at < style_at && style_at < asset_at);
    }

    #[test]
    fn user_negative_alone_on_unmapped_pair() {
        let mut req = request(AssetType::Background, GameStyle::Isometric);
        req.negative_prompt = Some("people".to_string());
        assert_eq!(compose(&req).negative, "people");
    }

    #[test]
    fn transparency_fragments_are_appended_last() {
        let mut req = request(AssetType::Icon, GameStyle::Minimalist);
        req.transparent_background = true;
        let composed = compose(&req);
        assert!(composed.positive.ends_with(TRANSPARENT_POSITIVE));
        assert!(composed.negative.ends_with(TRANSPARENT_NEGATIVE));

        let mut bare = request(AssetType::Background, GameStyle::HandDrawn);
        bare.transparent_background = true;
        let composed = compose(&bare);
        assert_eq!(composed.positive, format!("a brave knight, {}", TRANSPARENT_POSITIVE));
        assert_eq!(composed.negative, TRANSPARENT_NEGATIVE);
    }

    #[test]
    fn user_prompt_survives_every_combination() {
        for style in GameStyle::ALL {
            for asset in AssetType::ALL {
                for transparent in [false, true] {
                    let mut req = GenerationRequest::new("glowing rune stone", asset, style);
                    req.negative_prompt = Some("USER-NEG".to_string());
                    req.transparent_background = transparent;
                    let composed = compose(&req);
                    assert!(composed.positive.contains("glowing rune stone"));
                    assert!(composed.negative.starts_with("USER-NEG"));
                    assert!(!composed.positive.contains(", , "));
                    assert!(!composed.negative.contains(", , "));
                }
            }
        }
    }
}
