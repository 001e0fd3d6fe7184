use serde::Serialize;
use tokio::sync::watch;

use crate::error::GenerationError;
use crate::object_store::StorageObject;
use crate::webhook::WebhookImage;

/// Shown when the workflow's reply could not be parsed but the run carried on.
pub const CHECK_STORAGE_NOTICE: &str = "Workflow triggered, check storage for images";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribution {
    /// Images appeared between the two snapshots.
    Confirmed,
    /// Most recent objects used because nothing new appeared.
    Uncertain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOutcome {
    pub images: Vec<StorageObject>,
    pub attribution: Attribution,
    /// What the workflow said it produced, for diagnostics only.
    pub reported: Vec<WebhookImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_id: Option<String>,
}

/// Session state machine. Phases advance strictly in declaration order;
/// `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Snapshotting,
    Triggering,
    AwaitingRemote,
    ReSnapshotting,
    Resolving,
    Complete(SessionOutcome),
    Failed(GenerationError),
}

impl SessionState {
    pub const STEPS: usize = 5;

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Snapshotting => "snapshotting",
            SessionState::Triggering => "triggering",
            SessionState::AwaitingRemote => "awaiting_remote",
            SessionState::ReSnapshotting => "re_snapshotting",
            SessionState::Resolving => "resolving",
            SessionState::Complete(_) => "complete",
            SessionState::Failed(_) => "failed",
        }
    }

    /// 1-based progress step for the in-flight phases.
    pub fn step(&self) -> Option<usize> {
        match self {
            SessionState::Snapshotting => Some(1),
            SessionState::Triggering => Some(2),
            SessionState::AwaitingRemote => Some(3),
            SessionState::ReSnapshotting => Some(4),
            SessionState::Resolving => Some(5),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete(_) | SessionState::Failed(_))
    }
}

/// Receives every state the controller enters.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, state: &SessionState);
}

impl ProgressSink for watch::Sender<SessionState> {
    fn publish(&self, state: &SessionState) {
        self.send_replace(state.clone());
    }
}

pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn publish(&self, _state: &SessionState) {}
}
