//! S3-compatible object store client.

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
    error::{DisplayErrorContext, SdkError},
    presigning::PresigningConfig,
};
use chrono::{DateTime, Utc};

use crate::config::{SessionConfig, StorageConfig};
use crate::error::GenerationError;

use super::{
    KeyFilter, ListQuery, ObjectLister, RETRIEVAL_URL_TTL_SECS, StorageObject, sort_newest_first,
};

/// Largest page S3 hands back per ListObjectsV2 call.
const MAX_PAGE_SIZE: i32 = 1000;

#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
    region: String,
    endpoint: Option<String>,
    filter: KeyFilter,
}

struct ListedObject {
    key: String,
    size: i64,
    last_modified: Option<DateTime<Utc>>,
}

impl S3ObjectStore {
    /// Builds a client from the session's resolved storage settings.
    pub fn connect(config: &SessionConfig) -> Result<Self, GenerationError> {
        Self::from_storage(config.require_credentials()?, config.listing_filter)
    }

    pub fn from_storage(storage: &StorageConfig, filter: KeyFilter) -> Result<Self, GenerationError> {
        if !storage.has_credentials() {
            return Err(GenerationError::Config(
                "Object store credentials are required".to_string(),
            ));
        }

        let credentials = Credentials::new(
            &storage.access_key_id,
            &storage.secret_access_key,
            None,
            None,
            "product-imagegen",
        );
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(storage.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &storage.endpoint {
            // MinIO and most S3-compatible stores need path-style addressing
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: storage.bucket.clone(),
            region: storage.region.clone(),
            endpoint: storage.endpoint.clone(),
            filter,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Unsigned URL of an object, usable only when the bucket is public.
    pub fn public_url(&self, key: &str) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", self.bucket, self.region, key),
        }
    }

    /// Lists up to `query.max_keys` keys, following continuation tokens.
    pub async fn list_objects(&self, query: &ListQuery) -> Result<Vec<StorageObject>, GenerationError> {
        let listed = self.list_keys(query).await?;

        let presigning = PresigningConfig::expires_in(Duration::from_secs(RETRIEVAL_URL_TTL_SECS))
            .map_err(|err| GenerationError::Config(format!("invalid presigning window: {err}")))?;

        let mut objects = Vec::with_capacity(listed.len());
        for entry in listed {
            let presigned = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&entry.key)
                .presigned(presigning.clone())
                .await
                .map_err(|err| sdk_error(&format!("presign {}", entry.key), err))?;

            objects.push(StorageObject {
                name: StorageObject::name_from_key(&entry.key).to_string(),
                retrieval_url: presigned.uri().to_string(),
                public_url: self.public_url(&entry.key),
                size_bytes: entry.size,
                last_modified: entry.last_modified,
                key: entry.key,
            });
        }

        sort_newest_first(&mut objects);
        tracing::debug!(
            "Listed {} objects from bucket {} (prefix {:?})",
            objects.len(),
            self.bucket,
            query.prefix
        );
        Ok(objects)
    }

    async fn list_keys(&self, query: &ListQuery) -> Result<Vec<ListedObject>, GenerationError> {
        let max_keys = query.max_keys.max(1);
        let mut seen = 0;
        let mut listed = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let page_size = (max_keys - seen).min(MAX_PAGE_SIZE);
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .max_keys(page_size);
            if let Some(prefix) = &query.prefix {
                request = request.prefix(prefix);
            }
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|err| sdk_error("list objects", err))?;

            for object in response.contents() {
                seen += 1;
                let Some(key) = object.key() else {
                    continue;
                };
                if !self.filter.accepts(key) {
                    continue;
                }
                listed.push(ListedObject {
                    key: key.to_string(),
                    size: object.size().unwrap_or(0),
                    last_modified: object
                        .last_modified()
                        .and_then(|dt| DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())),
                });
            }

            if seen >= max_keys || !response.is_truncated().unwrap_or(false) {
                break;
            }
            match response.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(listed)
    }
}

impl ObjectLister for S3ObjectStore {
    async fn list(&self, query: &ListQuery) -> Result<Vec<StorageObject>, GenerationError> {
        self.list_objects(query).await
    }
}

fn sdk_error<E>(action: &str, err: SdkError<E>) -> GenerationError
where
    E: std::error::Error + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());
    GenerationError::remote(status, format!("{action}: {}", DisplayErrorContext(&err)))
}
