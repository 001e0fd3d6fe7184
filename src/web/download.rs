//! Same-origin download proxy for bucket objects.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::{GenerationError, Result};
use crate::media;
use crate::url_validation::validate_http_url;

const DEFAULT_FILE_NAME: &str = "image.png";

#[derive(Deserialize)]
pub struct DownloadParams {
    url: Option<String>,
    filename: Option<String>,
}

/// Keeps the name usable inside a quoted `Content-Disposition` value.
fn sanitize_file_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|ch| !ch.is_control())
        .map(|ch| match ch {
            '"' | '\\' | '/' | ':' | ';' => '_',
            other => other,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        DEFAULT_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

fn ascii_fallback(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_ascii() { ch } else { '_' })
        .collect()
}

pub async fn download(
    State(state): State<AppState>,
    Query(params): Query<DownloadParams>,
) -> Result<Response> {
    let raw = params
        .url
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| GenerationError::InvalidRequest("URL is required".to_string()))?;
    let url = validate_http_url(&raw)
        .map_err(|err| GenerationError::InvalidRequest(format!("url {err}")))?;
    let upstream = state.http.get(url).send().await.map_err(GenerationError::from)?;
    let status = upstream.status();
    if !status.is_success() {
        return Err(GenerationError::remote(Some(status.as_u16()), "Failed to fetch image").into());
    }

    let upstream_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let file_name = match params.filename.as_deref() {
        Some(name) => sanitize_file_name(name),
        None => upstream_type
            .as_ref()
            .and_then(|value| value.to_str().ok())
            .map(media::extension_from_mime_type)
            .filter(|ext| *ext != "bin")
            .map(|ext| format!("image.{ext}"))
            .unwrap_or_else(|| DEFAULT_FILE_NAME.to_string()),
    };
    let content_type = upstream_type
        .or_else(|| media::mime_from_file_name(&file_name).map(HeaderValue::from_static))
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"));

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Some(length) = upstream.content_length() {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    let disposition = format!("attachment; filename=\"{}\"", ascii_fallback(&file_name));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    tracing::info!("Proxying download of {} as {}", raw, file_name);
    Ok((headers, Body::from_stream(upstream.bytes_stream())).into_response())
}
