//! Shared application state for the HTTP and MCP surfaces.

use std::sync::Arc;

use anyhow::Result;
use tracing::Instrument;

use crate::config::{AppConfig, SessionConfig};
use crate::error::GenerationError;
use crate::object_store::S3ObjectStore;
use crate::session::{GenerationController, ProgressSink, SessionOutcome, SessionRegistry, SessionState};
use crate::storage::{HistoryStore, LocalFileStorage, SettingsStore};
use crate::webhook::{GenerationRequest, WebhookClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub http: reqwest::Client,
    pub settings: SettingsStore,
    pub history: HistoryStore,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self> {
        // the workflow holds the connection open until the job finishes
        let http = reqwest::Client::builder()
            .timeout(config.webhook_timeout)
            .build()?;
        let storage = LocalFileStorage::new(config.data_dir.clone());
        Ok(Self {
            config: Arc::new(config),
            http,
            settings: SettingsStore::new(storage.clone()),
            history: HistoryStore::new(storage),
            sessions: SessionRegistry::new(),
        })
    }

    /// Environment defaults overlaid with the stored settings.
    pub async fn session_config(&self) -> Result<SessionConfig, GenerationError> {
        let settings = self.settings.load().await.map_err(|err| {
            GenerationError::Config(format!("could not read stored settings: {err:#}"))
        })?;
        Ok(SessionConfig::resolve(&self.config, &settings))
    }

    pub fn webhook_client(&self, config: &SessionConfig) -> WebhookClient {
        WebhookClient::new(self.http.clone(), config.webhooks.clone())
    }

    /// Runs one generation session to completion, publishing every state.
    pub async fn run_generation(
        &self,
        request: GenerationRequest,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<SessionOutcome, GenerationError> {
        let prepared = self
            .session_config()
            .await
            .and_then(|config| S3ObjectStore::connect(&config).map(|store| (config, store)));
        let (config, store) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                tracing::warn!("Session could not start: {}", err);
                progress.publish(&SessionState::Failed(err.clone()));
                return Err(err);
            }
        };

        let mut controller = GenerationController::new(&config, store, self.webhook_client(&config))
            .with_history(self.history.clone())
            .with_progress(progress);
        controller.run(request).await
    }

    /// Registers a session and runs it in the background. Returns its id.
    pub fn start_session(&self, request: GenerationRequest) -> String {
        let (id, progress) = self.sessions.register(request.clone());
        let span = tracing::info_span!("session", id = %id, kind = ?request.kind);
        let state = self.clone();
        tokio::spawn(
            async move {
                let _ = state.run_generation(request, progress).await;
            }
            .instrument(span),
        );
        id
    }

    #[cfg(test)]
    pub(crate) fn for_tests(data_dir: &std::path::Path) -> Self {
        let data_dir = data_dir.display().to_string();
        let config = AppConfig::from_lookup(|key| (key == "DATA_DIR").then(|| data_dir.clone()));
        Self::new(config).expect("test state")
    }

    /// Registers a session and waits for it, for callers that block anyway.
    pub async fn run_session(
        &self,
        request: GenerationRequest,
    ) -> (String, Result<SessionOutcome, GenerationError>) {
        let (id, progress) = self.sessions.register(request.clone());
        let span = tracing::info_span!("session", id = %id, kind = ?request.kind);
        let result = self.run_generation(request, progress).instrument(span).await;
        (id, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Settings;
    use crate::webhook::{JobKind, RequestDraft};

    fn test_state(dir: &tempfile::TempDir) -> AppState {
        AppState::for_tests(dir.path())
    }

    fn request() -> GenerationRequest {
        RequestDraft {
            prompt: Some("linen shirt".into()),
            ..RequestDraft::default()
        }
        .build(JobKind::Single)
        .unwrap()
    }

    #[tokio::test]
    async fn stored_settings_override_environment() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state
            .settings
            .save(Settings {
                aws_bucket: Some("from-settings".into()),
                ..Settings::default()
            })
            .await
            .unwrap();

        let config = state.session_config().await.unwrap();
        assert_eq!(config.storage.bucket, "from-settings");
    }

    #[tokio::test]
    async fn missing_credentials_fail_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let (id, result) = state.run_session(request()).await;
        assert!(matches!(result, Err(GenerationError::Config(_))));
        assert!(matches!(
            state.sessions.state(&id),
            Some(SessionState::Failed(GenerationError::Config(_)))
        ));
    }

    #[tokio::test]
    async fn background_session_reaches_a_terminal_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let id = state.start_session(request());
        let mut receiver = state.sessions.subscribe(&id).unwrap();
        let finished = receiver.wait_for(SessionState::is_terminal).await.unwrap().clone();
        assert!(matches!(finished, SessionState::Failed(GenerationError::Config(_))));
    }
}
