use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::tools::{ToolResponse, json_result, tool_error};
use crate::webhook::{ImageReference, JobKind, RequestDraft};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateImagesRequest {
    #[schemars(description = "What to render, e.g. the product and the scene")]
    pub prompt: String,
    #[schemars(
        description = "Style preset: ecommerce, lifestyle, minimalist, bold, premium, natural or custom. Default ecommerce"
    )]
    pub style_preset: Option<String>,
    #[schemars(description = "Style text used when style_preset is custom")]
    pub custom_style: Option<String>,
    #[schemars(description = "Aspect preset: 1:1, 4:3, 3:4, 16:9 or 9:16. Default 1:1")]
    pub size: Option<String>,
    #[schemars(description = "Creativity between 0.1 and 1.0. Default 0.7")]
    pub creativity: Option<f32>,
    #[schemars(description = "Number of images to keep. Default 2")]
    pub variations: Option<u32>,
    #[schemars(description = "Up to three reference image URLs")]
    pub reference_image_urls: Option<Vec<String>>,
    #[schemars(description = "Overrides the configured single-image webhook")]
    pub webhook_url: Option<String>,
}

impl GenerateImagesRequest {
    fn into_draft(self) -> RequestDraft {
        RequestDraft {
            prompt: Some(self.prompt),
            style_preset: self.style_preset,
            style_suffix: self.custom_style,
            size: self.size,
            creativity: self.creativity,
            variations: self.variations,
            references: self
                .reference_image_urls
                .unwrap_or_default()
                .into_iter()
                .map(ImageReference::Url)
                .collect(),
            webhook_url: self.webhook_url,
            ..RequestDraft::default()
        }
    }
}

pub async fn generate_images(
    state: &AppState,
    Parameters(request): Parameters<GenerateImagesRequest>,
) -> Result<CallToolResult, McpError> {
    let request = request.into_draft().build(JobKind::Single).map_err(tool_error)?;
    let (session_id, outcome) = state.run_session(request).await;
    let outcome = outcome.map_err(tool_error)?;
    json_result(&ToolResponse::from_outcome(session_id, &outcome))
}
