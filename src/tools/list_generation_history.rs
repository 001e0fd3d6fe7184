use rmcp::{
    ErrorData as McpError,
    handler::server::wrapper::Parameters,
    model::CallToolResult,
    schemars::JsonSchema,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::storage::HistoryKind;
use crate::tools::json_result;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListGenerationHistoryRequest {
    #[schemars(description = "Number of entries to return, default 10")]
    pub limit: Option<u32>,
    #[schemars(description = "Filter: single, multi-image or all (default)")]
    pub kind: Option<String>,
}

pub async fn list_generation_history(
    state: &AppState,
    Parameters(request): Parameters<ListGenerationHistoryRequest>,
) -> Result<CallToolResult, McpError> {
    let limit = request.limit.unwrap_or(10).max(1) as usize;
    let kind = match request.kind.as_deref().unwrap_or("all").trim() {
        "all" => None,
        "single" => Some(HistoryKind::Single),
        "multi-image" => Some(HistoryKind::MultiImage),
        _ => {
            return Err(McpError::invalid_params(
                "kind must be single, multi-image or all",
                None,
            ));
        }
    };
    let entries = state.history.list(Some(limit), kind).await.map_err(|err| {
        McpError::internal_error(
            "list generation history failed",
            Some(serde_json::Value::String(err.to_string())),
        )
    })?;
    json_result(&entries)
}
