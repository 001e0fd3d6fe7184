use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use tokio::fs;

/// Key-addressed files below a base directory.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
}

impl LocalFileStorage {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.resolve_path(key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err).with_context(|| format!("read {}", path.display())),
        }
    }

    /// Writes through a sibling temp file so readers never see a torn blob.
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("rename into {}", path.display()))?;
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        let path = self.resolve_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).with_context(|| format!("remove {}", path.display())),
        }
    }

    /// Reads a JSON blob. Unreadable content is reported as `None` with a warning.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(bytes) = self.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!("Ignoring unreadable {}: {}", key, err);
                Ok(None)
            }
        }
    }

    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let payload = serde_json::to_vec_pretty(value)?;
        self.put(key, &payload).await
    }

    pub fn resolve_path(&self, key: &str) -> PathBuf {
        let normalized = key.trim_start_matches('/');
        self.base_dir.join(Path::new(normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf());
        assert!(storage.get("nothing.json").await.unwrap().is_none());
        storage.remove("nothing.json").await.unwrap();
    }

    #[tokio::test]
    async fn put_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf());
        storage.put("/nested/blob.bin", b"abc").await.unwrap();
        assert_eq!(storage.get("nested/blob.bin").await.unwrap(), Some(b"abc".to_vec()));
        assert!(!storage.resolve_path("nested/blob.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_json_is_treated_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf());
        storage.put("broken.json", b"{not json").await.unwrap();
        let value: Option<Vec<String>> = storage.get_json("broken.json").await.unwrap();
        assert!(value.is_none());
    }
}
