use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::config::{DEFAULT_BUCKET, DEFAULT_REGION, StorageConfig};
use crate::error::{GenerationError, Result};
use crate::object_store::{ListQuery, S3ObjectStore, StorageObject};

/// Credentials travel in the body and are dropped when the call ends.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListWithCredentials {
    #[serde(default)]
    access_key_id: String,
    #[serde(default)]
    secret_access_key: String,
    region: Option<String>,
    bucket: Option<String>,
    max_keys: Option<i32>,
    prefix: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    prefix: Option<String>,
    max_keys: Option<i32>,
}

#[derive(Serialize)]
pub struct ListResponse {
    success: bool,
    count: usize,
    bucket: String,
    images: Vec<StorageObject>,
}

async fn list(store: S3ObjectStore, query: ListQuery) -> Result<Json<ListResponse>> {
    let images = store.list_objects(&query).await?;
    Ok(Json(ListResponse {
        success: true,
        count: images.len(),
        bucket: store.bucket().to_string(),
        images,
    }))
}

fn query(state: &AppState, prefix: Option<String>, max_keys: Option<i32>) -> ListQuery {
    let query = ListQuery::new(
        max_keys
            .filter(|value| *value > 0)
            .unwrap_or(state.config.snapshot_max_keys),
    );
    match prefix {
        Some(prefix) => query.with_prefix(prefix),
        None => query,
    }
}

pub async fn list_with_credentials(
    State(state): State<AppState>,
    Json(body): Json<ListWithCredentials>,
) -> Result<Json<ListResponse>> {
    let storage = StorageConfig {
        access_key_id: body.access_key_id,
        secret_access_key: body.secret_access_key,
        region: body.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
        bucket: body.bucket.unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        endpoint: state.config.storage.endpoint.clone(),
    };
    if !storage.has_credentials() {
        return Err(GenerationError::Config("AWS credentials are required".to_string()).into());
    }
    let store = S3ObjectStore::from_storage(&storage, state.config.listing_filter)?;
    list(store, query(&state, body.prefix, body.max_keys)).await
}

pub async fn list_configured(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let config = state.session_config().await?;
    let store = S3ObjectStore::connect(&config)?;
    list(store, query(&state, params.prefix, params.max_keys)).await
}
