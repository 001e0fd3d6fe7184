//! Error types shared by the generation pipeline and the HTTP surface.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Upper bound on remote error bodies carried inside [`GenerationError::Remote`].
pub const REMOTE_BODY_LIMIT: usize = 200;

/// Failures of the generation-and-retrieval sequence.
///
/// Cloneable so a failed session can keep its originating error while the
/// same value is reported to callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    /// Missing credentials or webhook target. Fixable from the settings page.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Non-success answer (or transport failure) from the object store or the workflow.
    #[error("remote error{}: {body}", .status.map(|code| format!(" (HTTP {code})")).unwrap_or_default())]
    Remote { status: Option<u16>, body: String },

    /// The workflow answered with something that is not structured data.
    /// Images may still have landed in the bucket.
    #[error("could not parse workflow response: {0}")]
    Parse(String),

    #[error("no images found in the bucket")]
    EmptyBucket,
}

impl GenerationError {
    pub fn remote(status: Option<u16>, body: impl AsRef<str>) -> Self {
        GenerationError::Remote {
            status,
            body: truncate_chars(body.as_ref(), REMOTE_BODY_LIMIT),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Config(_) => "config_error",
            GenerationError::InvalidRequest(_) => "invalid_request",
            GenerationError::Remote { .. } => "remote_error",
            GenerationError::Parse(_) => "parse_error",
            GenerationError::EmptyBucket => "empty_bucket",
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        GenerationError::remote(err.status().map(|status| status.as_u16()), err.to_string())
    }
}

/// Truncates on a character boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

/// Errors surfaced by the HTTP handlers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Local storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Generation(err) => {
                let (status, remote_status, settings) = match err {
                    GenerationError::Config(_) => (StatusCode::BAD_REQUEST, None, Some("/api/settings")),
                    GenerationError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, None, None),
                    GenerationError::Remote { status, .. } => {
                        tracing::warn!("Remote error: {}", err);
                        (StatusCode::BAD_GATEWAY, *status, None)
                    }
                    GenerationError::Parse(_) => (StatusCode::OK, None, None),
                    GenerationError::EmptyBucket => (StatusCode::NOT_FOUND, None, None),
                };
                (
                    status,
                    ErrorResponse {
                        error: err.kind().to_string(),
                        message: err.to_string(),
                        status: remote_status,
                        settings,
                    },
                )
            }
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    error: "not_found".to_string(),
                    message: msg.clone(),
                    status: None,
                    settings: None,
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse {
                    error: "conflict".to_string(),
                    message: msg.clone(),
                    status: None,
                    settings: None,
                },
            ),
            AppError::Storage(err) => {
                tracing::error!("Local storage error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "storage_error".to_string(),
                        message: "Local storage error".to_string(),
                        status: None,
                        settings: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
