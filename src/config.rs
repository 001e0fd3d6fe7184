//! Process configuration and per-session configuration resolution.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::GenerationError;
use crate::object_store::KeyFilter;
use crate::storage::Settings;
use crate::webhook::JobKind;

pub const DEFAULT_REGION: &str = "ap-south-1";
pub const DEFAULT_BUCKET: &str = "amazon-image-data";
const DEFAULT_SNAPSHOT_MAX_KEYS: i32 = 100;
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 300;

/// Configuration read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data_dir: PathBuf,
    pub storage: StorageConfig,
    pub webhooks: WebhookTargets,
    pub listing_filter: KeyFilter,
    pub snapshot_max_keys: i32,
    pub webhook_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub secret_key: Option<String>,
}

/// Object store connection parameters.
#[derive(Clone, Default, PartialEq)]
pub struct StorageConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    pub endpoint: Option<String>,
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl StorageConfig {
    pub fn has_credentials(&self) -> bool {
        !self.access_key_id.trim().is_empty() && !self.secret_access_key.trim().is_empty()
    }
}

/// Process-wide default webhook targets, one per job kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookTargets {
    pub single: Option<String>,
    pub batch: Option<String>,
}

impl WebhookTargets {
    pub fn for_kind(&self, kind: JobKind) -> Option<&str> {
        match kind {
            JobKind::Single => self.single.as_deref(),
            JobKind::Batch => self.batch.as_deref(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        AppConfig {
            server: ServerConfig {
                host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: var("SERVER_PORT")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(3000),
                secret_key: var("SECRET_KEY"),
            },
            data_dir: var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            storage: StorageConfig {
                access_key_id: var("AWS_ACCESS_KEY_ID").unwrap_or_default(),
                secret_access_key: var("AWS_SECRET_ACCESS_KEY").unwrap_or_default(),
                region: var("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
                bucket: var("AWS_S3_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
                endpoint: var("S3_ENDPOINT"),
            },
            webhooks: WebhookTargets {
                single: var("WEBHOOK_SINGLE_URL"),
                batch: var("WEBHOOK_BATCH_URL"),
            },
            listing_filter: var("LISTING_FILTER")
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
            snapshot_max_keys: var("SNAPSHOT_MAX_KEYS")
                .and_then(|value| value.parse().ok())
                .filter(|value: &i32| *value > 0)
                .unwrap_or(DEFAULT_SNAPSHOT_MAX_KEYS),
            webhook_timeout: Duration::from_secs(
                var("WEBHOOK_TIMEOUT_SECS")
                    .and_then(|value| value.parse().ok())
                    .unwrap_or(DEFAULT_WEBHOOK_TIMEOUT_SECS),
            ),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn default_data_dir() -> PathBuf {
    let mut base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.push("product-imagegen");
    base
}

/// Everything one generation session needs, resolved once up front.
///
/// Stored settings win over the environment defaults field by field.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub storage: StorageConfig,
    pub webhooks: WebhookTargets,
    pub listing_filter: KeyFilter,
    pub snapshot_max_keys: i32,
}

impl SessionConfig {
    pub fn resolve(app: &AppConfig, settings: &Settings) -> Self {
        let pick = |stored: &Option<String>, fallback: &str| {
            stored
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string())
        };
        let pick_opt = |stored: &Option<String>, fallback: &Option<String>| {
            stored
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .or_else(|| fallback.clone())
        };

        SessionConfig {
            storage: StorageConfig {
                access_key_id: pick(&settings.aws_access_key_id, &app.storage.access_key_id),
                secret_access_key: pick(
                    &settings.aws_secret_access_key,
                    &app.storage.secret_access_key,
                ),
                region: pick(&settings.aws_region, &app.storage.region),
                bucket: pick(&settings.aws_bucket, &app.storage.bucket),
                endpoint: app.storage.endpoint.clone(),
            },
            webhooks: WebhookTargets {
                single: pick_opt(&settings.single_webhook_url, &app.webhooks.single),
                batch: pick_opt(&settings.batch_webhook_url, &app.webhooks.batch),
            },
            listing_filter: app.listing_filter,
            snapshot_max_keys: app.snapshot_max_keys,
        }
    }

    pub fn require_credentials(&self) -> Result<&StorageConfig, GenerationError> {
        if self.storage.has_credentials() {
            Ok(&self.storage)
        } else {
            Err(GenerationError::Config(
                "Object store credentials are not configured. Add them in Settings.".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = config_from(&[]);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.storage.region, DEFAULT_REGION);
        assert_eq!(config.storage.bucket, DEFAULT_BUCKET);
        assert_eq!(config.snapshot_max_keys, 100);
        assert_eq!(config.listing_filter, KeyFilter::Images);
        assert_eq!(config.webhook_timeout, Duration::from_secs(300));
        assert!(config.webhooks.single.is_none());
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = config_from(&[("SERVER_PORT", "8080"), ("AWS_REGION", "  "), ("SECRET_KEY", "")]);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.region, DEFAULT_REGION);
        assert!(config.server.secret_key.is_none());
    }

    #[test]
    fn stored_settings_override_environment() {
        let app = config_from(&[
            ("AWS_ACCESS_KEY_ID", "env-key"),
            ("AWS_SECRET_ACCESS_KEY", "env-secret"),
            ("WEBHOOK_SINGLE_URL", "https://env.example/single"),
            ("WEBHOOK_BATCH_URL", "https://env.example/batch"),
        ]);
        let settings = Settings {
            aws_access_key_id: Some("stored-key".into()),
            aws_bucket: Some("stored-bucket".into()),
            single_webhook_url: Some("https://stored.example/single".into()),
            batch_webhook_url: Some(" ".into()),
            ..Settings::default()
        };
        let session = SessionConfig::resolve(&app, &settings);
        assert_eq!(session.storage.access_key_id, "stored-key");
        assert_eq!(session.storage.secret_access_key, "env-secret");
        assert_eq!(session.storage.bucket, "stored-bucket");
        assert_eq!(session.webhooks.for_kind(JobKind::Single), Some("https://stored.example/single"));
        assert_eq!(session.webhooks.for_kind(JobKind::Batch), Some("https://env.example/batch"));
    }

    #[test]
    fn missing_credentials_are_a_config_error() {
        let session = SessionConfig::resolve(&config_from(&[]), &Settings::default());
        assert!(matches!(session.require_credentials(), Err(GenerationError::Config(_))));
    }

    #[test]
    fn debug_output_hides_secret() {
        let storage = StorageConfig {
            secret_access_key: "top-secret".into(),
            ..StorageConfig::default()
        };
        assert!(!format!("{storage:?}").contains("top-secret"));
    }
}
