//! Normalization of the workflow's reply.
//!
//! The workflow has been seen answering with a bare list of upload records,
//! an `{images: [...]}` wrapper, a single upload record, or a
//! `{success, count}` summary. Each shape is one variant of
//! [`WebhookResponse`]; [`WebhookResponse::into_images`] folds them into
//! [`WebhookImage`]s.

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::{Map, Value};

use crate::error::{GenerationError, truncate_chars};

const RAW_EXCERPT_CHARS: usize = 100;

/// Uniform view of one image reported by the workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookImage {
    pub url: String,
    pub key: String,
    pub name: String,
}

/// One upload record as emitted by the workflow's storage step.
///
/// Only a JSON object deserializes into a record. Fields holding anything but
/// a string are treated as absent rather than failing the whole reply.
#[derive(Debug, Default)]
pub struct RawImage {
    location: Option<String>,
    url: Option<String>,
    s3_url: Option<String>,
    public_url: Option<String>,
    key_upper: Option<String>,
    key: Option<String>,
    file_name: Option<String>,
    name: Option<String>,
}

impl<'de> Deserialize<'de> for RawImage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let mut take = |name: &str| match fields.remove(name) {
            Some(Value::String(value)) => Some(value),
            _ => None,
        };
        Ok(RawImage {
            location: take("Location"),
            url: take("url"),
            s3_url: take("s3Url"),
            public_url: take("publicUrl"),
            key_upper: take("Key"),
            key: take("key"),
            file_name: take("fileName"),
            name: take("name"),
        })
    }
}

/// A record that names a URL; anything else is left to the other shapes.
#[derive(Debug)]
pub struct LocatedImage(RawImage);

impl<'de> Deserialize<'de> for LocatedImage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawImage::deserialize(deserializer)?;
        if raw.url().is_none() {
            return Err(D::Error::custom("upload record without a URL"));
        }
        Ok(LocatedImage(raw))
    }
}

fn first_present(candidates: [&Option<String>; 4]) -> Option<&str> {
    candidates
        .into_iter()
        .filter_map(|value| value.as_deref())
        .map(str::trim)
        .find(|value| !value.is_empty())
}

impl RawImage {
    fn url(&self) -> Option<&str> {
        first_present([&self.location, &self.url, &self.s3_url, &self.public_url])
    }

    fn key(&self) -> Option<&str> {
        first_present([&self.key_upper, &self.key, &self.file_name, &self.name])
    }

    /// `None` when the record carries no usable URL.
    fn normalize(&self, fallback_name: impl FnOnce() -> String) -> Option<WebhookImage> {
        let url = self.url()?;
        let key = self.key().unwrap_or_default();
        Some(WebhookImage {
            url: url.to_string(),
            key: key.to_string(),
            name: if key.is_empty() {
                fallback_name()
            } else {
                key.to_string()
            },
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum WebhookResponse {
    List(Vec<RawImage>),
    Wrapped { images: Vec<RawImage> },
    Single(LocatedImage),
    Summary { success: bool, count: u64 },
    Unrecognized(Value),
}

impl WebhookResponse {
    /// Fails with [`GenerationError::Parse`] when the body is not JSON at all.
    /// The error carries the first characters of the raw body.
    pub fn parse(body: &str) -> Result<Self, GenerationError> {
        serde_json::from_str(body).map_err(|err| {
            tracing::debug!("Workflow response is not JSON: {err}");
            GenerationError::Parse(truncate_chars(body, RAW_EXCERPT_CHARS))
        })
    }

    pub fn into_images(self) -> Vec<WebhookImage> {
        match self {
            WebhookResponse::List(items) | WebhookResponse::Wrapped { images: items } => items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| item.normalize(|| format!("variant_{}.png", index + 1)))
                .collect(),
            WebhookResponse::Single(LocatedImage(item)) => item
                .normalize(|| "generated_image.png".to_string())
                .into_iter()
                .collect(),
            WebhookResponse::Summary { success, count } => {
                tracing::debug!("Workflow summary without images: success={success} count={count}");
                Vec::new()
            }
            WebhookResponse::Unrecognized(value) => {
                tracing::debug!("Unrecognized workflow response: {}", value);
                Vec::new()
            }
        }
    }
}
