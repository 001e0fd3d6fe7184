pub mod generate_images;
pub mod generate_listing_set;
pub mod list_bucket_images;
pub mod list_generation_history;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::GenerationError;
use crate::object_store::StorageObject;
use crate::session::{Attribution, SessionOutcome};

#[derive(Serialize)]
pub struct ToolImage {
    pub url: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl From<&StorageObject> for ToolImage {
    fn from(object: &StorageObject) -> Self {
        ToolImage {
            url: object.retrieval_url.clone(),
            name: object.name.clone(),
            mime_type: crate::media::mime_from_file_name(&object.name)
                .unwrap_or(crate::media::DEFAULT_IMAGE_MIME)
                .to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct ToolResponse {
    pub session_id: String,
    pub images: Vec<ToolImage>,
    pub text: String,
}

impl ToolResponse {
    pub fn from_outcome(session_id: String, outcome: &SessionOutcome) -> Self {
        let mut text = match outcome.attribution {
            Attribution::Confirmed => format!("Generated {} images.", outcome.images.len()),
            Attribution::Uncertain => format!(
                "No new images appeared in the bucket; these are the {} most recent ones and may belong to another run.",
                outcome.images.len()
            ),
        };
        if let Some(notice) = &outcome.notice {
            text.push(' ');
            text.push_str(notice);
            text.push('.');
        }
        ToolResponse {
            session_id,
            images: outcome.images.iter().map(ToolImage::from).collect(),
            text,
        }
    }
}

pub use generate_images::{GenerateImagesRequest, generate_images};
pub use generate_listing_set::{GenerateListingSetRequest, generate_listing_set};
pub use list_bucket_images::{ListBucketImagesRequest, list_bucket_images};
pub use list_generation_history::{ListGenerationHistoryRequest, list_generation_history};

pub(crate) fn tool_error(err: GenerationError) -> McpError {
    let data = Some(serde_json::Value::String(err.to_string()));
    match err {
        GenerationError::Config(_) | GenerationError::InvalidRequest(_) => {
            McpError::invalid_params(err.to_string(), None)
        }
        GenerationError::Remote { .. } => McpError::internal_error("remote service failed", data),
        GenerationError::Parse(_) => McpError::internal_error("unreadable workflow response", data),
        GenerationError::EmptyBucket => McpError::internal_error("no images found in the bucket", data),
    }
}

pub(crate) fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string(value).map_err(|err| {
        McpError::internal_error(
            "serialize tool response failed",
            Some(serde_json::Value::String(err.to_string())),
        )
    })?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
