//! Style and canvas presets offered to callers.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StylePreset {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt_suffix: &'static str,
}

pub const CUSTOM_STYLE: &str = "custom";
pub const DEFAULT_STYLE: &str = "ecommerce";

pub static STYLE_PRESETS: [StylePreset; 7] = [
    StylePreset {
        id: "ecommerce",
        name: "E-commerce Clean",
        prompt_suffix: "Professional e-commerce product photography, clean white background, studio lighting, high resolution, sharp details",
    },
    StylePreset {
        id: "lifestyle",
        name: "Lifestyle",
        prompt_suffix: "Lifestyle product photography, natural setting, warm lighting, authentic feel, high quality",
    },
    StylePreset {
        id: "minimalist",
        name: "Minimalist",
        prompt_suffix: "Minimalist product photography, simple composition, elegant, lots of negative space, clean aesthetic",
    },
    StylePreset {
        id: "bold",
        name: "Bold & Colorful",
        prompt_suffix: "Bold colorful product photography, vibrant colors, energetic, eye-catching, dynamic composition",
    },
    StylePreset {
        id: "premium",
        name: "Premium Luxury",
        prompt_suffix: "Premium luxury product photography, dark moody background, dramatic lighting, sophisticated, high-end aesthetic",
    },
    StylePreset {
        id: "natural",
        name: "Natural Organic",
        prompt_suffix: "Natural organic product photography, earth tones, natural textures, sustainable feel, authentic",
    },
    StylePreset {
        id: CUSTOM_STYLE,
        name: "Custom",
        prompt_suffix: "",
    },
];

/// Unknown ids fall back to the first preset.
pub fn style_preset(id: &str) -> &'static StylePreset {
    STYLE_PRESETS
        .iter()
        .find(|preset| preset.id == id)
        .unwrap_or(&STYLE_PRESETS[0])
}

/// Returns the preset id actually used and its prompt suffix. For `custom`
/// the caller's text is the suffix.
pub fn resolve_style(id: Option<&str>, custom_suffix: Option<&str>) -> (String, String) {
    let id = id.map(str::trim).filter(|value| !value.is_empty()).unwrap_or(DEFAULT_STYLE);
    if id == CUSTOM_STYLE {
        let suffix = custom_suffix.map(str::trim).unwrap_or_default();
        return (CUSTOM_STYLE.to_string(), suffix.to_string());
    }
    let preset = style_preset(id);
    (preset.id.to_string(), preset.prompt_suffix.to_string())
}

pub const ASPECT_PRESETS: [&str; 5] = ["1:1", "4:3", "3:4", "16:9", "9:16"];

/// Canvas size for an aspect-ratio id such as `16:9`.
pub fn aspect_size(id: &str) -> Option<(u32, u32)> {
    match id.trim() {
        "1:1" => Some((1024, 1024)),
        "4:3" => Some((1024, 768)),
        "3:4" => Some((768, 1024)),
        "16:9" => Some((1024, 576)),
        "9:16" => Some((576, 1024)),
        _ => None,
    }
}
