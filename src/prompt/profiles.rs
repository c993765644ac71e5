//! Static prompt-shaping tables keyed by style and asset type.
//!
//! Both tables are partial: a style or asset type without an entry simply
//! contributes nothing when prompts are composed.
use crate::models::{AssetType, GameStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleProfile {
    pub prefix: &'static str,
    pub suffix: &'static str,
    pub negative: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetProfile {
    pub suffix: &'static str,
    pub negative: &'static str,
}

/// Fragments are stored without separators; the composer joins them with `", "`.
pub fn style_profile(style: GameStyle) -> Option<&'static StyleProfile> {
    let profile = match style {
        GameStyle::PixelArt => &StyleProfile {
            prefix: "pixel art, 8-bit style, retro game graphics",
            suffix: "pixelated, sharp edges, limited color palette",
            negative: "blurry, smooth, realistic, photographic, anti-aliased",
        },
        GameStyle::Cartoon => &StyleProfile {
            prefix: "cartoon style, animated, colorful",
            suffix: "simple shapes, bold outlines, vibrant colors",
            negative: "realistic, photographic, dark, gritty",
        },
        GameStyle::Realistic => &StyleProfile {
            prefix: "realistic, detailed, high quality",
            suffix: "photorealistic, detailed textures, professional game asset",
            negative: "cartoon, anime, simplified, low poly",
        },
        GameStyle::Fantasy => &StyleProfile {
            prefix: "fantasy art, magical, medieval",
            suffix: "enchanted, mystical, RPG game style",
            negative: "modern, sci-fi, realistic, contemporary",
        },
        GameStyle::SciFi => &StyleProfile {
            prefix: "sci-fi, futuristic, high-tech",
            suffix: "cyberpunk, space age, advanced technology",
            negative: "fantasy, medieval, primitive, organic",
        },
        GameStyle::Anime => &StyleProfile {
            prefix: "anime style, manga, Japanese animation",
            suffix: "cel-shaded, anime character design",
            negative: "realistic, western, photographic",
        },
        GameStyle::Minimalist => &StyleProfile {
            prefix: "minimalist, simple, clean design",
            suffix: "geometric, flat design, modern",
            negative: "complex, detailed, ornate, busy",
        },
        GameStyle::LowPoly | GameStyle::HandDrawn | GameStyle::Isometric => return None,
    };
    Some(profile)
}

/// Suffixes carry no leading `", "`, so composed prompts never contain `", , "`.
pub fn asset_profile(asset_type: AssetType) -> Option<&'static AssetProfile> {
    let profile = match asset_type {
        AssetType::Character => &AssetProfile {
            suffix: "game character, standing pose, full body, character design",
            negative: "multiple characters, crowd, background elements",
        },
        AssetType::Weapon => &AssetProfile {
            suffix: "game weapon, item design, clean white background",
            negative: "character holding, hands, person",
        },
        AssetType::Item => &AssetProfile {
            suffix: "game item, inventory icon, object design",
            negative: "character, background, environment",
        },
        AssetType::UiElement => &AssetProfile {
            suffix: "UI element, interface design, button, icon",
            negative: "3d, characters, landscape",
        },
        AssetType::Environment => &AssetProfile {
            suffix: "game environment, level design, background",
            negative: "characters, UI elements, items",
        },
        AssetType::Texture => &AssetProfile {
            suffix: "seamless texture, tileable, pattern",
            negative: "objects, characters, non-tileable",
        },
        AssetType::Icon => &AssetProfile {
            suffix: "game icon, simple, recognizable, centered",
            negative: "complex, detailed background, text",
        },
        AssetType::Background => return None,
    };
    Some(profile)
}

/// Human-readable blurb for the `/styles` listing.
pub fn style_description(style: GameStyle) -> Option<&'static str> {
    match style {
        GameStyle::PixelArt => Some("8-bit retro game style with pixelated graphics"),
        GameStyle::Cartoon => Some("Colorful animated cartoon style"),
        GameStyle::Realistic => Some("Photorealistic detailed artwork"),
        GameStyle::Fantasy => Some("Medieval fantasy RPG style"),
        GameStyle::SciFi => Some("Futuristic cyberpunk style"),
        GameStyle::Anime => Some("Japanese animation style"),
        GameStyle::Minimalist => Some("Clean, simple geometric design"),
        GameStyle::LowPoly | GameStyle::HandDrawn | GameStyle::Isometric => None,
    }
}

/// Human-readable blurb for the `/asset-types` listing.
pub fn asset_description(asset_type: AssetType) -> Option<&'static str> {
    match asset_type {
        AssetType::Character => Some("Game characters, NPCs, enemies"),
        AssetType::Weapon => Some("Swords, guns, magic items"),
        AssetType::Item => Some("Consumables, collectibles, inventory items"),
        AssetType::UiElement => Some("Buttons, icons, interface elements"),
        AssetType::Environment => Some("Backgrounds, levels, scenery"),
        AssetType::Texture => Some("Tileable patterns and surfaces"),
        AssetType::Icon => Some("Small symbols and indicators"),
        AssetType::Background => None,
    }
}
