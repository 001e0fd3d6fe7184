//! Background generation sessions with pollable progress.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use serde::Serialize;

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::session::{SessionOutcome, SessionState};
use crate::webhook::{GenerationRequest, JobKind};

use super::form;

#[derive(Serialize)]
pub struct Started {
    id: String,
}

#[derive(Serialize)]
struct FailureView {
    error: &'static str,
    message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    id: String,
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<usize>,
    steps: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<SessionOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<FailureView>,
}

impl SessionView {
    fn new(id: String, state: SessionState) -> Self {
        let mut view = SessionView {
            id,
            state: state.name(),
            step: state.step(),
            steps: SessionState::STEPS,
            result: None,
            failure: None,
        };
        match state {
            SessionState::Complete(outcome) => view.result = Some(outcome),
            SessionState::Failed(err) => {
                view.failure = Some(FailureView {
                    error: err.kind(),
                    message: err.to_string(),
                })
            }
            _ => {}
        }
        view
    }
}

fn start(state: &AppState, request: GenerationRequest) -> (StatusCode, Json<Started>) {
    let id = state.start_session(request);
    (StatusCode::ACCEPTED, Json(Started { id }))
}

pub async fn start_single(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Started>)> {
    let request = form::read_draft(multipart).await?.build(JobKind::Single)?;
    Ok(start(&state, request))
}

pub async fn start_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Started>)> {
    let request = form::read_draft(multipart).await?.build(JobKind::Batch)?;
    Ok(start(&state, request))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>> {
    let current = state
        .sessions
        .state(&id)
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
    Ok(Json(SessionView::new(id, current)))
}

/// Starts a new session from the stored request of a finished one.
pub async fn retry_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Started>)> {
    let current = state
        .sessions
        .state(&id)
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
    if !current.is_terminal() {
        return Err(AppError::Conflict(format!(
            "session {id} is still {}",
            current.name()
        )));
    }
    let request = state
        .sessions
        .request(&id)
        .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
    tracing::info!("Retrying session {}", id);
    Ok(start(&state, request))
}
