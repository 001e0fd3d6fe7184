use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use uuid::Uuid;

use crate::webhook::GenerationRequest;

use super::state::SessionState;

/// Finished sessions beyond this count are forgotten, oldest first.
pub const MAX_TRACKED_SESSIONS: usize = 200;

struct SessionRecord {
    request: GenerationRequest,
    progress: watch::Receiver<SessionState>,
    created_at: DateTime<Utc>,
}

/// In-memory index of sessions started over HTTP or MCP.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, SessionRecord>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionRecord>> {
        // a panic while holding the lock cannot leave the map half-updated
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a session in `Idle` and hands back the sender its controller
    /// publishes to.
    pub fn register(&self, request: GenerationRequest) -> (String, Arc<watch::Sender<SessionState>>) {
        let id = Uuid::new_v4().to_string();
        let (sender, receiver) = watch::channel(SessionState::Idle);

        let mut sessions = self.lock();
        prune(&mut sessions);
        sessions.insert(
            id.clone(),
            SessionRecord {
                request,
                progress: receiver,
                created_at: Utc::now(),
            },
        );
        (id, Arc::new(sender))
    }

    pub fn state(&self, id: &str) -> Option<SessionState> {
        self.lock().get(id).map(|record| record.progress.borrow().clone())
    }

    pub fn request(&self, id: &str) -> Option<GenerationRequest> {
        self.lock().get(id).map(|record| record.request.clone())
    }

    /// Receiver that observes every later state change of the session.
    pub fn subscribe(&self, id: &str) -> Option<watch::Receiver<SessionState>> {
        self.lock().get(id).map(|record| record.progress.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn prune(sessions: &mut HashMap<String, SessionRecord>) {
    if sessions.len() < MAX_TRACKED_SESSIONS {
        return;
    }
    let mut finished: Vec<(DateTime<Utc>, String)> = sessions
        .iter()
        .filter(|(_, record)| record.progress.borrow().is_terminal())
        .map(|(id, record)| (record.created_at, id.clone()))
        .collect();
    finished.sort();

    let excess = sessions.len() + 1 - MAX_TRACKED_SESSIONS;
    for (_, id) in finished.into_iter().take(excess) {
        sessions.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::session::ProgressSink;
    use crate::webhook::{JobKind, RequestDraft};

    fn request() -> GenerationRequest {
        RequestDraft {
            prompt: Some("ceramic vase".into()),
            ..RequestDraft::default()
        }
        .build(JobKind::Single)
        .unwrap()
    }

    #[test]
    fn registered_session_tracks_published_states() {
        let registry = SessionRegistry::new();
        let (id, sender) = registry.register(request());
        assert_eq!(registry.state(&id), Some(SessionState::Idle));

        sender.publish(&SessionState::AwaitingRemote);
        assert_eq!(registry.state(&id), Some(SessionState::AwaitingRemote));
        assert_eq!(registry.request(&id), Some(request()));
        assert!(registry.state("missing").is_none());
    }

    #[tokio::test]
    async fn subscribers_see_later_changes() {
        let registry = SessionRegistry::new();
        let (id, sender) = registry.register(request());
        let mut receiver = registry.subscribe(&id).unwrap();

        sender.publish(&SessionState::Failed(GenerationError::EmptyBucket));
        receiver.changed().await.unwrap();
        assert!(receiver.borrow().is_terminal());
    }

    #[test]
    fn only_finished_sessions_are_pruned() {
        let registry = SessionRegistry::new();
        let mut running = Vec::new();
        let mut senders = Vec::new();
        for n in 0..MAX_TRACKED_SESSIONS {
            let (id, sender) = registry.register(request());
            if n % 2 == 0 {
                sender.publish(&SessionState::Failed(GenerationError::EmptyBucket));
            } else {
                running.push(id);
            }
            senders.push(sender);
        }
        assert_eq!(registry.len(), MAX_TRACKED_SESSIONS);

        registry.register(request());
        assert_eq!(registry.len(), MAX_TRACKED_SESSIONS);
        assert!(running.iter().all(|id| registry.state(id).is_some()));
    }
}
