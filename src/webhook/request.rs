use serde::{Deserialize, Serialize};

use crate::error::GenerationError;
use crate::presets;
use crate::storage::HistoryKind;

/// The batch workflow always renders this many images.
pub const BATCH_IMAGE_COUNT: u32 = 6;
pub const MAX_REFERENCE_SLOTS: usize = 3;

const DEFAULT_DIMENSION: u32 = 1024;
const MAX_DIMENSION: u32 = 4096;
const DEFAULT_CREATIVITY: f32 = 0.7;
const MIN_CREATIVITY: f32 = 0.1;
const MAX_CREATIVITY: f32 = 1.0;
const DEFAULT_VARIATIONS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Prompt-driven job producing `variations` images, with up to three references.
    Single,
    /// Product image plus description, always producing [`BATCH_IMAGE_COUNT`] images.
    Batch,
}

impl JobKind {
    pub fn history_kind(self) -> HistoryKind {
        match self {
            JobKind::Single => HistoryKind::Single,
            JobKind::Batch => HistoryKind::MultiImage,
        }
    }
}

#[derive(Clone, PartialEq)]
pub enum ImageReference {
    Upload {
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    Url(String),
}

impl std::fmt::Debug for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageReference::Upload {
                file_name,
                content_type,
                bytes,
            } => f
                .debug_struct("Upload")
                .field("file_name", file_name)
                .field("content_type", content_type)
                .field("len", &bytes.len())
                .finish(),
            ImageReference::Url(url) => f.debug_tuple("Url").field(url).finish(),
        }
    }
}

/// A validated generation request. Immutable once built; a retry replays it as is.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub kind: JobKind,
    /// Prompt for single jobs, product description for batch jobs.
    pub prompt: String,
    pub extra_prompt: String,
    pub style_preset: String,
    pub style_suffix: String,
    pub width: u32,
    pub height: u32,
    pub creativity: f32,
    pub variation_count: u32,
    pub references: Vec<ImageReference>,
    /// Takes priority over the configured webhook target.
    pub webhook_override: Option<String>,
}

impl GenerationRequest {
    /// Prompt with the style suffix appended.
    pub fn full_prompt(&self) -> String {
        if self.style_suffix.is_empty() {
            self.prompt.clone()
        } else {
            format!("{}. {}", self.prompt, self.style_suffix)
        }
    }

    /// How many images the session should come back with.
    pub fn expected_images(&self) -> usize {
        match self.kind {
            JobKind::Single => self.variation_count as usize,
            JobKind::Batch => BATCH_IMAGE_COUNT as usize,
        }
    }
}

/// Loosely-typed request input, as collected from a form or a tool call.
#[derive(Debug, Clone, Default)]
pub struct RequestDraft {
    pub prompt: Option<String>,
    pub extra_prompt: Option<String>,
    pub style_preset: Option<String>,
    pub style_suffix: Option<String>,
    /// Aspect preset id such as `16:9`; explicit width/height win.
    pub size: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub creativity: Option<f32>,
    pub variations: Option<u32>,
    pub references: Vec<ImageReference>,
    pub webhook_url: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl RequestDraft {
    pub fn build(self, kind: JobKind) -> Result<GenerationRequest, GenerationError> {
        let prompt = non_empty(self.prompt).ok_or_else(|| {
            GenerationError::InvalidRequest(match kind {
                JobKind::Single => "Prompt is required".to_string(),
                JobKind::Batch => "Product description is required".to_string(),
            })
        })?;

        let references: Vec<ImageReference> = self
            .references
            .into_iter()
            .filter(|reference| match reference {
                ImageReference::Upload { bytes, .. } => !bytes.is_empty(),
                ImageReference::Url(url) => !url.trim().is_empty(),
            })
            .collect();
        match kind {
            JobKind::Single if references.len() > MAX_REFERENCE_SLOTS => {
                return Err(GenerationError::InvalidRequest(format!(
                    "At most {MAX_REFERENCE_SLOTS} reference images are supported"
                )));
            }
            JobKind::Batch if references.len() != 1 => {
                return Err(GenerationError::InvalidRequest(
                    "Batch generation needs exactly one product image".to_string(),
                ));
            }
            _ => {}
        }

        let (preset_width, preset_height) = self
            .size
            .as_deref()
            .and_then(presets::aspect_size)
            .unwrap_or((DEFAULT_DIMENSION, DEFAULT_DIMENSION));
        let width = self.width.unwrap_or(preset_width);
        let height = self.height.unwrap_or(preset_height);
        if !(1..=MAX_DIMENSION).contains(&width) || !(1..=MAX_DIMENSION).contains(&height) {
            return Err(GenerationError::InvalidRequest(format!(
                "Width and height must be between 1 and {MAX_DIMENSION}"
            )));
        }

        let creativity = self
            .creativity
            .filter(|value| value.is_finite())
            .unwrap_or(DEFAULT_CREATIVITY)
            .clamp(MIN_CREATIVITY, MAX_CREATIVITY);

        let style_suffix = non_empty(self.style_suffix);
        let (style_preset, preset_suffix) =
            presets::resolve_style(self.style_preset.as_deref(), style_suffix.as_deref());

        Ok(GenerationRequest {
            kind,
            prompt,
            extra_prompt: non_empty(self.extra_prompt).unwrap_or_default(),
            style_preset,
            style_suffix: style_suffix.unwrap_or(preset_suffix),
            width,
            height,
            creativity,
            variation_count: self.variations.unwrap_or(DEFAULT_VARIATIONS).max(1),
            references,
            webhook_override: non_empty(self.webhook_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(prompt: &str) -> RequestDraft {
        RequestDraft {
            prompt: Some(prompt.to_string()),
            ..RequestDraft::default()
        }
    }

    fn upload() -> ImageReference {
        ImageReference::Upload {
            file_name: "product.png".into(),
            content_type: Some("image/png".into()),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn single_defaults() {
        let request = draft("  a ceramic mug ").build(JobKind::Single).unwrap();
        assert_eq!(request.prompt, "a ceramic mug");
        assert_eq!((request.width, request.height), (1024, 1024));
        assert_eq!(request.creativity, 0.7);
        assert_eq!(request.variation_count, 2);
        assert_eq!(request.expected_images(), 2);
        assert_eq!(request.style_preset, "ecommerce");
        assert!(request.full_prompt().starts_with("a ceramic mug. Professional e-commerce"));
        assert!(request.webhook_override.is_none());
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let err = draft("   ").build(JobKind::Single).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidRequest(_)));
    }

    #[test]
    fn creativity_is_clamped() {
        let mut low = draft("x");
        low.creativity = Some(0.0);
        assert_eq!(low.build(JobKind::Single).unwrap().creativity, 0.1);
        let mut high = draft("x");
        high.creativity = Some(7.5);
        assert_eq!(high.build(JobKind::Single).unwrap().creativity, 1.0);
        let mut nan = draft("x");
        nan.creativity = Some(f32::NAN);
        assert_eq!(nan.build(JobKind::Single).unwrap().creativity, 0.7);
    }

    #[test]
    fn size_preset_and_explicit_dimensions() {
        let mut request = draft("x");
        request.size = Some("9:16".into());
        let built = request.clone().build(JobKind::Single).unwrap();
        assert_eq!((built.width, built.height), (576, 1024));
        request.width = Some(800);
        let built = request.build(JobKind::Single).unwrap();
        assert_eq!((built.width, built.height), (800, 1024));

        let mut zero = draft("x");
        zero.height = Some(0);
        assert!(zero.build(JobKind::Single).is_err());
    }

    #[test]
    fn single_allows_three_references_at_most() {
        let mut request = draft("x");
        request.references = vec![upload(), upload(), ImageReference::Url("https://a/b.png".into())];
        assert_eq!(request.clone().build(JobKind::Single).unwrap().references.len(), 3);
        request.references.push(upload());
        assert!(request.build(JobKind::Single).is_err());
    }

    #[test]
    fn empty_uploads_are_dropped() {
        let mut request = draft("x");
        request.references = vec![ImageReference::Upload {
            file_name: "empty.png".into(),
            content_type: None,
            bytes: vec![],
        }];
        assert!(request.build(JobKind::Single).unwrap().references.is_empty());
    }

    #[test]
    fn batch_requires_one_image_and_expects_six() {
        assert!(draft("organic granola").build(JobKind::Batch).is_err());
        let mut request = draft("organic granola");
        request.references = vec![upload()];
        request.variations = Some(2);
        let built = request.build(JobKind::Batch).unwrap();
        assert_eq!(built.expected_images(), 6);
        assert_eq!(built.kind.history_kind(), HistoryKind::MultiImage);
    }

    #[test]
    fn explicit_suffix_wins_over_preset() {
        let mut request = draft("x");
        request.style_preset = Some("premium".into());
        request.style_suffix = Some("on marble".into());
        let built = request.build(JobKind::Single).unwrap();
        assert_eq!(built.style_preset, "premium");
        assert_eq!(built.full_prompt(), "x. on marble");
    }

    #[test]
    fn debug_does_not_dump_image_bytes() {
        let rendered = format!("{:?}", upload());
        assert!(rendered.contains("len: 3"));
    }
}
