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
pub struct GenerateListingSetRequest {
    #[schemars(description = "URL of the product photo")]
    pub image_url: String,
    #[schemars(description = "Product description")]
    pub description: String,
    #[schemars(description = "Extra instructions for the listing images")]
    pub extra_prompt: Option<String>,
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
    #[schemars(description = "Overrides the configured batch webhook")]
    pub webhook_url: Option<String>,
}

pub async fn generate_listing_set(
    state: &AppState,
    Parameters(request): Parameters<GenerateListingSetRequest>,
) -> Result<CallToolResult, McpError> {
    let request = RequestDraft {
        prompt: Some(request.description),
        extra_prompt: request.extra_prompt,
        style_preset: request.style_preset,
        style_suffix: request.custom_style,
        size: request.size,
        creativity: request.creativity,
        references: vec![ImageReference::Url(request.image_url)],
        webhook_url: request.webhook_url,
        ..RequestDraft::default()
    }
    .build(JobKind::Batch)
    .map_err(tool_error)?;

    let (session_id, outcome) = state.run_session(request).await;
    let outcome = outcome.map_err(tool_error)?;
    json_result(&ToolResponse::from_outcome(session_id, &outcome))
}
