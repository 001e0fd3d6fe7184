//! Read-only view of the bucket the workflow writes its images into.

pub mod filter;
pub mod s3;

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

pub use filter::KeyFilter;
pub use s3::S3ObjectStore;

/// Lifetime of a retrieval URL minted by a listing call.
pub const RETRIEVAL_URL_TTL_SECS: u64 = 3600;

/// One object in the bucket, as returned by a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageObject {
    pub key: String,
    pub name: String,
    /// Presigned, valid for [`RETRIEVAL_URL_TTL_SECS`] from the listing call.
    #[serde(rename = "url")]
    pub retrieval_url: String,
    #[serde(default)]
    pub public_url: String,
    #[serde(rename = "size", default)]
    pub size_bytes: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl StorageObject {
    /// Last path segment of a key.
    pub fn name_from_key(key: &str) -> &str {
        key.rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or(key)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub prefix: Option<String>,
    pub max_keys: i32,
}

impl ListQuery {
    pub fn new(max_keys: i32) -> Self {
        Self {
            prefix: None,
            max_keys,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }
}

/// Source of bucket snapshots.
pub trait ObjectLister: Send + Sync {
    /// Lists objects newest first, each with a freshly minted retrieval URL.
    fn list(
        &self,
        query: &ListQuery,
    ) -> impl Future<Output = Result<Vec<StorageObject>, GenerationError>> + Send;
}

/// Sorts newest first; objects without a timestamp go last.
pub fn sort_newest_first(objects: &mut [StorageObject]) {
    objects.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
}
