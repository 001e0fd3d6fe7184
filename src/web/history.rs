use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::storage::{HistoryEntry, HistoryKind, HistoryStats};

#[derive(Deserialize)]
pub struct HistoryParams {
    limit: Option<usize>,
    kind: Option<HistoryKind>,
}

#[derive(Serialize)]
pub struct Done {
    pub(crate) success: bool,
}

pub async fn list_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<HistoryEntry>>> {
    Ok(Json(state.history.list(params.limit, params.kind).await?))
}

pub async fn history_stats(State(state): State<AppState>) -> Result<Json<HistoryStats>> {
    Ok(Json(state.history.stats().await?))
}

pub async fn delete_entry(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Done>> {
    if !state.history.delete(&id).await? {
        return Err(AppError::NotFound(format!("history entry {id}")));
    }
    Ok(Json(Done { success: true }))
}

pub async fn clear_history(State(state): State<AppState>) -> Result<Json<Done>> {
    state.history.clear().await?;
    Ok(Json(Done { success: true }))
}
