use axum::{Json, extract::State};

use crate::app::AppState;
use crate::error::{GenerationError, Result};
use crate::storage::Settings;
use crate::url_validation::validate_http_url;

use super::history::Done;

/// Settings as stored, with the secret key masked.
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>> {
    Ok(Json(state.settings.load().await?.redacted()))
}

pub async fn save_settings(
    State(state): State<AppState>,
    Json(patch): Json<Settings>,
) -> Result<Json<Settings>> {
    for (field, value) in [
        ("single_webhook_url", &patch.single_webhook_url),
        ("batch_webhook_url", &patch.batch_webhook_url),
    ] {
        if let Some(value) = value.as_deref().filter(|value| !value.trim().is_empty()) {
            validate_http_url(value)
                .map_err(|err| GenerationError::InvalidRequest(format!("{field} {err}")))?;
        }
    }
    let saved = state.settings.save(patch).await?;
    tracing::info!("Settings updated: {:?}", saved);
    Ok(Json(saved.redacted()))
}

pub async fn clear_settings(State(state): State<AppState>) -> Result<Json<Done>> {
    state.settings.clear().await?;
    Ok(Json(Done { success: true }))
}
