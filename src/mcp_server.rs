use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};

use crate::app::AppState;
use crate::tools::{
    GenerateImagesRequest, GenerateListingSetRequest, ListBucketImagesRequest,
    ListGenerationHistoryRequest,
};

#[derive(Clone)]
pub struct ImageGenServer {
    tool_router: ToolRouter<Self>,
    state: AppState,
}

impl ImageGenServer {
    pub fn new(state: AppState) -> Self {
        Self {
            tool_router: Self::tool_router(),
            state,
        }
    }
}

#[tool_router]
impl ImageGenServer {
    #[tool(
        description = "Generate product images from a prompt through the configured workflow, then collect the new images from the bucket. Takes up to a few minutes. Show results with ![](url)"
    )]
    async fn generate_images(
        &self,
        Parameters(request): Parameters<GenerateImagesRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::generate_images(&self.state, Parameters(request)).await
    }

    #[tool(
        description = "Generate a six-image listing set from one product photo URL and a description. Takes up to a few minutes. Show results with ![](url)"
    )]
    async fn generate_listing_set(
        &self,
        Parameters(request): Parameters<GenerateListingSetRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::generate_listing_set(&self.state, Parameters(request)).await
    }

    #[tool(description = "List the newest images in the bucket. URLs expire after one hour")]
    async fn list_bucket_images(
        &self,
        Parameters(request): Parameters<ListBucketImagesRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::list_bucket_images(&self.state, Parameters(request)).await
    }

    #[tool(description = "List past generation results, newest first")]
    async fn list_generation_history(
        &self,
        Parameters(request): Parameters<ListGenerationHistoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        crate::tools::list_generation_history(&self.state, Parameters(request)).await
    }
}

#[tool_handler]
impl ServerHandler for ImageGenServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
