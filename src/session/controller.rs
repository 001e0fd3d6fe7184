use std::sync::Arc;

use crate::config::SessionConfig;
use crate::error::GenerationError;
use crate::object_store::{ListQuery, ObjectLister};
use crate::reconcile::{SnapshotSet, diff, resolve};
use crate::storage::HistoryStore;
use crate::webhook::{GenerationRequest, JobTrigger};

use super::state::{
    Attribution, CHECK_STORAGE_NOTICE, NoProgress, ProgressSink, SessionOutcome, SessionState,
};

/// Drives one request through snapshot, trigger, re-snapshot and resolve.
///
/// Phases run strictly one after the other: the diff is only meaningful when
/// the first listing happens before the job is sent and the second after it
/// answered. Any error ends the run in [`SessionState::Failed`]; nothing is
/// retried automatically.
pub struct GenerationController<L, T> {
    lister: L,
    trigger: T,
    query: ListQuery,
    history: Option<HistoryStore>,
    progress: Arc<dyn ProgressSink>,
    state: SessionState,
    last_request: Option<GenerationRequest>,
}

impl<L, T> GenerationController<L, T>
where
    L: ObjectLister,
    T: JobTrigger,
{
    pub fn new(config: &SessionConfig, lister: L, trigger: T) -> Self {
        Self {
            lister,
            trigger,
            query: ListQuery::new(config.snapshot_max_keys),
            history: None,
            progress: Arc::new(NoProgress),
            state: SessionState::Idle,
            last_request: None,
        }
    }

    /// Confirmed results get recorded here.
    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn last_request(&self) -> Option<&GenerationRequest> {
        self.last_request.as_ref()
    }

    /// Runs a new request. It is kept for [`retry`](Self::retry).
    pub async fn run(&mut self, request: GenerationRequest) -> Result<SessionOutcome, GenerationError> {
        self.last_request = Some(request.clone());
        self.run_to_end(&request).await
    }

    /// Replays the last request exactly as it was submitted. The remote job
    /// carries no idempotency key, so this enqueues a second job.
    pub async fn retry(&mut self) -> Result<SessionOutcome, GenerationError> {
        let request = self.last_request.clone().ok_or_else(|| {
            GenerationError::InvalidRequest("Nothing to retry yet".to_string())
        })?;
        tracing::info!("Retrying last {:?} request", request.kind);
        self.run_to_end(&request).await
    }

    async fn run_to_end(&mut self, request: &GenerationRequest) -> Result<SessionOutcome, GenerationError> {
        match self.execute(request).await {
            Ok(outcome) => {
                self.enter(SessionState::Complete(outcome.clone()));
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!("Generation failed during {}: {}", self.state.name(), err);
                self.enter(SessionState::Failed(err.clone()));
                Err(err)
            }
        }
    }

    fn enter(&mut self, state: SessionState) {
        match state.step() {
            Some(step) => tracing::info!("[{}/{}] {}", step, SessionState::STEPS, state.name()),
            None => tracing::info!("Session {}", state.name()),
        }
        self.progress.publish(&state);
        self.state = state;
    }

    async fn execute(&mut self, request: &GenerationRequest) -> Result<SessionOutcome, GenerationError> {
        self.enter(SessionState::Snapshotting);
        let before = SnapshotSet::capture(&self.lister.list(&self.query).await?);
        tracing::info!("Captured {} keys before triggering", before.len());

        self.enter(SessionState::Triggering);
        let job = self.trigger.prepare(request).await?;

        self.enter(SessionState::AwaitingRemote);
        let (reported, notice) = match self.trigger.dispatch(job).await {
            Ok(images) => (images, None),
            Err(GenerationError::Parse(detail)) => {
                // images may still have landed, so keep going with the listing
                tracing::warn!("Unreadable workflow response, relying on the bucket: {}", detail);
                (Vec::new(), Some(CHECK_STORAGE_NOTICE.to_string()))
            }
            Err(err) => return Err(err),
        };

        self.enter(SessionState::ReSnapshotting);
        let after = self.lister.list(&self.query).await?;

        self.enter(SessionState::Resolving);
        let fresh = diff(&before, &after);
        tracing::info!("{} new objects since the first snapshot", fresh.len());

        let (images, attribution) = match resolve(fresh, &after, request.expected_images())?.into_result() {
            Ok(images) => (images, Attribution::Confirmed),
            Err(uncertain) => {
                tracing::warn!("{}", uncertain);
                (uncertain.fallback, Attribution::Uncertain)
            }
        };

        let history_id = match (&self.history, attribution) {
            (Some(history), Attribution::Confirmed) => {
                match history
                    .append(request.kind.history_kind(), &request.prompt, images.clone())
                    .await
                {
                    Ok(entry) => Some(entry.id),
                    Err(err) => {
                        tracing::warn!("Could not record history entry: {:#}", err);
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(SessionOutcome {
            images,
            attribution,
            reported,
            notice,
            history_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::config::{StorageConfig, WebhookTargets};
    use crate::object_store::{KeyFilter, StorageObject};
    use crate::storage::{HistoryKind, LocalFileStorage};
    use crate::webhook::{JobKind, RequestDraft, WebhookImage};

    fn object(key: &str, minute: u32) -> StorageObject {
        StorageObject {
            key: key.to_string(),
            name: key.to_string(),
            retrieval_url: format!("https://signed/{key}"),
            public_url: format!("https://public/{key}"),
            size_bytes: 1,
            last_modified: Some(Utc.with_ymd_and_hms(2024, 6, 1, 9, minute, 0).unwrap()),
        }
    }

    fn session_config() -> SessionConfig {
        SessionConfig {
            storage: StorageConfig::default(),
            webhooks: WebhookTargets::default(),
            listing_filter: KeyFilter::Images,
            snapshot_max_keys: 100,
        }
    }

    fn request(variations: u32) -> GenerationRequest {
        RequestDraft {
            prompt: Some("white sneaker on concrete".into()),
            variations: Some(variations),
            ..RequestDraft::default()
        }
        .build(JobKind::Single)
        .unwrap()
    }

    #[derive(Clone, Default)]
    struct FakeLister {
        listings: Arc<Mutex<VecDeque<Result<Vec<StorageObject>, GenerationError>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeLister {
        fn with(listings: Vec<Result<Vec<StorageObject>, GenerationError>>) -> Self {
            Self {
                listings: Arc::new(Mutex::new(listings.into())),
                calls: Arc::default(),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ObjectLister for FakeLister {
        async fn list(&self, query: &ListQuery) -> Result<Vec<StorageObject>, GenerationError> {
            assert_eq!(query.max_keys, 100);
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.listings.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Clone, Default)]
    struct FakeTrigger {
        prepare_error: Option<GenerationError>,
        responses: Arc<Mutex<VecDeque<Result<Vec<WebhookImage>, GenerationError>>>>,
        dispatched: Arc<Mutex<Vec<GenerationRequest>>>,
    }

    impl FakeTrigger {
        fn answering(responses: Vec<Result<Vec<WebhookImage>, GenerationError>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into())),
                ..Self::default()
            }
        }

        fn dispatched(&self) -> Vec<GenerationRequest> {
            self.dispatched.lock().unwrap().clone()
        }
    }

    impl JobTrigger for FakeTrigger {
        type Job = GenerationRequest;

        async fn prepare(&self, request: &GenerationRequest) -> Result<GenerationRequest, GenerationError> {
            match &self.prepare_error {
                Some(err) => Err(err.clone()),
                None => Ok(request.clone()),
            }
        }

        async fn dispatch(&self, job: GenerationRequest) -> Result<Vec<WebhookImage>, GenerationError> {
            self.dispatched.lock().unwrap().push(job);
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<&'static str>>);

    impl Recorder {
        fn names(&self) -> Vec<&'static str> {
            self.0.lock().unwrap().clone()
        }
    }

    impl ProgressSink for Recorder {
        fn publish(&self, state: &SessionState) {
            self.0.lock().unwrap().push(state.name());
        }
    }

    fn history() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(LocalFileStorage::new(dir.path().to_path_buf()));
        (dir, store)
    }

    fn keys(images: &[StorageObject]) -> Vec<&str> {
        images.iter().map(|image| image.key.as_str()).collect()
    }

    #[tokio::test]
    async fn new_objects_are_attributed_and_recorded() {
        let lister = FakeLister::with(vec![
            Ok(vec![object("b.png", 2), object("a.png", 1)]),
            Ok(vec![
                object("d.png", 4),
                object("c.png", 3),
                object("b.png", 2),
                object("a.png", 1),
            ]),
        ]);
        let trigger = FakeTrigger::answering(vec![Ok(vec![WebhookImage {
            url: "https://x/c.png".into(),
            key: "c.png".into(),
            name: "c.png".into(),
        }])]);
        let recorder = Arc::new(Recorder::default());
        let (_dir, history) = history();

        let mut controller = GenerationController::new(&session_config(), lister, trigger)
            .with_history(history.clone())
            .with_progress(recorder.clone());
        let outcome = controller.run(request(2)).await.unwrap();

        assert_eq!(keys(&outcome.images), vec!["d.png", "c.png"]);
        assert_eq!(outcome.attribution, Attribution::Confirmed);
        assert_eq!(outcome.reported.len(), 1);
        assert!(outcome.notice.is_none());
        assert_eq!(
            recorder.names(),
            vec![
                "snapshotting",
                "triggering",
                "awaiting_remote",
                "re_snapshotting",
                "resolving",
                "complete"
            ]
        );
        assert!(matches!(controller.state(), SessionState::Complete(_)));

        let entries = history.list(None, None).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(Some(entries[0].id.clone()), outcome.history_id);
        assert_eq!(entries[0].kind, HistoryKind::Single);
        assert_eq!(entries[0].images, outcome.images);
    }

    #[tokio::test]
    async fn unchanged_bucket_falls_back_without_recording() {
        let listing = vec![object("old-1.png", 1), object("old-3.png", 3), object("old-2.png", 2)];
        let lister = FakeLister::with(vec![Ok(listing.clone()), Ok(listing)]);
        let (_dir, history) = history();

        let mut controller =
            GenerationController::new(&session_config(), lister, FakeTrigger::default())
                .with_history(history.clone());
        let outcome = controller.run(request(2)).await.unwrap();

        assert_eq!(keys(&outcome.images), vec!["old-3.png", "old-2.png"]);
        assert_eq!(outcome.attribution, Attribution::Uncertain);
        assert!(outcome.history_id.is_none());
        assert!(history.list(None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_bucket_fails() {
        let lister = FakeLister::with(vec![Ok(vec![]), Ok(vec![])]);
        let mut controller =
            GenerationController::new(&session_config(), lister, FakeTrigger::default());

        let err = controller.run(request(2)).await.unwrap_err();
        assert_eq!(err, GenerationError::EmptyBucket);
        assert_eq!(
            controller.state(),
            &SessionState::Failed(GenerationError::EmptyBucket)
        );
    }

    #[tokio::test]
    async fn unparseable_response_continues_with_notice() {
        let lister = FakeLister::with(vec![
            Ok(vec![object("a.png", 1)]),
            Ok(vec![object("n.png", 5), object("a.png", 1)]),
        ]);
        let trigger = FakeTrigger::answering(vec![Err(GenerationError::Parse("not json".into()))]);

        let mut controller = GenerationController::new(&session_config(), lister, trigger);
        let outcome = controller.run(request(2)).await.unwrap();

        assert_eq!(keys(&outcome.images), vec!["n.png"]);
        assert_eq!(outcome.notice.as_deref(), Some(CHECK_STORAGE_NOTICE));
        assert!(outcome.reported.is_empty());
    }

    #[tokio::test]
    async fn remote_error_stops_before_second_snapshot() {
        let lister = FakeLister::with(vec![Ok(vec![object("a.png", 1)])]);
        let trigger = FakeTrigger::answering(vec![Err(GenerationError::remote(Some(500), "boom"))]);
        let recorder = Arc::new(Recorder::default());

        let mut controller = GenerationController::new(&session_config(), lister.clone(), trigger)
            .with_progress(recorder.clone());
        let err = controller.run(request(2)).await.unwrap_err();

        assert!(matches!(err, GenerationError::Remote { status: Some(500), .. }));
        assert_eq!(lister.calls(), 1);
        assert_eq!(recorder.names().last(), Some(&"failed"));
        assert!(!recorder.names().contains(&"re_snapshotting"));
    }

    #[tokio::test]
    async fn snapshot_failure_never_triggers() {
        let lister = FakeLister::with(vec![Err(GenerationError::Config("no credentials".into()))]);
        let trigger = FakeTrigger::default();

        let mut controller =
            GenerationController::new(&session_config(), lister, trigger.clone());
        let err = controller.run(request(2)).await.unwrap_err();

        assert!(matches!(err, GenerationError::Config(_)));
        assert!(trigger.dispatched().is_empty());
    }

    #[tokio::test]
    async fn missing_target_fails_in_triggering() {
        let lister = FakeLister::with(vec![Ok(vec![object("a.png", 1)])]);
        let trigger = FakeTrigger {
            prepare_error: Some(GenerationError::Config("Webhook URL not configured".into())),
            ..FakeTrigger::default()
        };
        let recorder = Arc::new(Recorder::default());

        let mut controller = GenerationController::new(&session_config(), lister, trigger.clone())
            .with_progress(recorder.clone());
        controller.run(request(2)).await.unwrap_err();

        assert_eq!(recorder.names(), vec!["snapshotting", "triggering", "failed"]);
        assert!(trigger.dispatched().is_empty());
    }

    #[tokio::test]
    async fn retry_replays_the_same_request() {
        let lister = FakeLister::with(vec![
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![]),
            Ok(vec![object("late.png", 9)]),
        ]);
        let trigger = FakeTrigger::default();
        let original = request(3);

        let mut controller =
            GenerationController::new(&session_config(), lister, trigger.clone());
        controller.run(original.clone()).await.unwrap_err();
        let outcome = controller.retry().await.unwrap();

        assert_eq!(keys(&outcome.images), vec!["late.png"]);
        assert_eq!(trigger.dispatched(), vec![original.clone(), original.clone()]);
        assert_eq!(controller.last_request(), Some(&original));
    }

    #[tokio::test]
    async fn retry_without_a_previous_run_is_rejected() {
        let mut controller = GenerationController::new(
            &session_config(),
            FakeLister::default(),
            FakeTrigger::default(),
        );
        assert!(matches!(
            controller.retry().await,
            Err(GenerationError::InvalidRequest(_))
        ));
        assert_eq!(controller.state(), &SessionState::Idle);
    }
}
