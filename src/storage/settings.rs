use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::LocalFileStorage;

const SETTINGS_KEY: &str = "settings.json";
/// Stands in for the secret key whenever settings leave the process.
pub const REDACTED_SECRET: &str = "********";

/// Flat, user-editable settings blob. Every field is optional and unset
/// fields fall back to the environment.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_access_key_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_secret_access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_webhook_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_webhook_url: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field(
                "aws_secret_access_key",
                &self.aws_secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("aws_region", &self.aws_region)
            .field("aws_bucket", &self.aws_bucket)
            .field("single_webhook_url", &self.single_webhook_url)
            .field("batch_webhook_url", &self.batch_webhook_url)
            .finish()
    }
}

impl Settings {
    /// Fields set in `patch` replace the current ones; unset fields are kept.
    /// A secret equal to [`REDACTED_SECRET`] is an echo of a redacted copy and is ignored.
    pub fn merge(&mut self, mut patch: Settings) {
        if patch.aws_secret_access_key.as_deref() == Some(REDACTED_SECRET) {
            patch.aws_secret_access_key = None;
        }
        fn take(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        take(&mut self.aws_access_key_id, patch.aws_access_key_id);
        take(&mut self.aws_secret_access_key, patch.aws_secret_access_key);
        take(&mut self.aws_region, patch.aws_region);
        take(&mut self.aws_bucket, patch.aws_bucket);
        take(&mut self.single_webhook_url, patch.single_webhook_url);
        take(&mut self.batch_webhook_url, patch.batch_webhook_url);
    }

    /// Copy safe to hand back to clients.
    pub fn redacted(&self) -> Settings {
        let mut copy = self.clone();
        if copy.aws_secret_access_key.as_deref().is_some_and(|value| !value.is_empty()) {
            copy.aws_secret_access_key = Some(REDACTED_SECRET.to_string());
        }
        copy
    }
}

#[derive(Clone, Debug)]
pub struct SettingsStore {
    storage: LocalFileStorage,
    write_lock: Arc<Mutex<()>>,
}

impl SettingsStore {
    pub fn new(storage: LocalFileStorage) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Missing or unreadable settings load as empty.
    pub async fn load(&self) -> Result<Settings> {
        Ok(self.storage.get_json(SETTINGS_KEY).await?.unwrap_or_default())
    }

    pub async fn save(&self, patch: Settings) -> Result<Settings> {
        let _guard = self.write_lock.lock().await;
        let mut current = self.load().await?;
        current.merge(patch);
        self.storage.put_json(SETTINGS_KEY, &current).await?;
        Ok(current)
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.storage.remove(SETTINGS_KEY).await
    }
}
