use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::object_store::{ListQuery, S3ObjectStore};
use crate::tools::{ToolImage, json_result, tool_error};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListBucketImagesRequest {
    #[schemars(description = "Only keys starting with this prefix")]
    pub prefix: Option<String>,
    #[schemars(description = "Maximum number of images, default 20")]
    pub limit: Option<u32>,
}

pub async fn list_bucket_images(
    state: &AppState,
    Parameters(request): Parameters<ListBucketImagesRequest>,
) -> Result<CallToolResult, McpError> {
    let limit = request.limit.unwrap_or(20).clamp(1, 1000) as i32;
    let config = state.session_config().await.map_err(tool_error)?;
    let store = S3ObjectStore::connect(&config).map_err(tool_error)?;

    let query = ListQuery::new(limit).with_prefix(request.prefix.unwrap_or_default());
    let objects = store.list_objects(&query).await.map_err(tool_error)?;
    let images: Vec<ToolImage> = objects.iter().map(ToolImage::from).collect();
    json_result(&images)
}
