//! Local log of confirmed generation results.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::truncate_chars;
use crate::object_store::StorageObject;

use super::LocalFileStorage;

const HISTORY_KEY: &str = "history.json";
pub const MAX_HISTORY_ENTRIES: usize = 50;
pub const MAX_LABEL_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryKind {
    Single,
    MultiImage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Creation time in milliseconds. Entries written in the same millisecond share it.
    pub id: String,
    pub kind: HistoryKind,
    pub label: String,
    pub images: Vec<StorageObject>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_sets: usize,
    pub single_sets: usize,
    pub multi_image_sets: usize,
    pub total_images: usize,
}

/// Newest-first history capped at [`MAX_HISTORY_ENTRIES`]; the oldest entry is
/// evicted on overflow.
#[derive(Clone, Debug)]
pub struct HistoryStore {
    storage: LocalFileStorage,
    write_lock: Arc<Mutex<()>>,
}

impl HistoryStore {
    pub fn new(storage: LocalFileStorage) -> Self {
        Self {
            storage,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn read_all(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.storage.get_json(HISTORY_KEY).await?.unwrap_or_default())
    }

    pub async fn append(
        &self,
        kind: HistoryKind,
        label: &str,
        images: Vec<StorageObject>,
    ) -> Result<HistoryEntry> {
        let _guard = self.write_lock.lock().await;
        let created_at = Utc::now();
        let entry = HistoryEntry {
            id: created_at.timestamp_millis().to_string(),
            kind,
            label: truncate_chars(label, MAX_LABEL_CHARS),
            images,
            created_at,
        };

        let mut entries = self.read_all().await?;
        entries.insert(0, entry.clone());
        entries.truncate(MAX_HISTORY_ENTRIES);
        self.storage.put_json(HISTORY_KEY, &entries).await?;

        tracing::info!("Saved history entry {} ({} images)", entry.id, entry.images.len());
        Ok(entry)
    }

    pub async fn list(
        &self,
        limit: Option<usize>,
        kind: Option<HistoryKind>,
    ) -> Result<Vec<HistoryEntry>> {
        let entries = self.read_all().await?;
        Ok(entries
            .into_iter()
            .filter(|entry| kind.is_none_or(|kind| entry.kind == kind))
            .take(limit.unwrap_or(MAX_HISTORY_ENTRIES))
            .collect())
    }

    /// Removes every entry carrying `id`. Returns whether anything was removed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.read_all().await?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.storage.put_json(HISTORY_KEY, &entries).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.storage.remove(HISTORY_KEY).await
    }

    pub async fn stats(&self) -> Result<HistoryStats> {
        let entries = self.read_all().await?;
        Ok(entries.iter().fold(HistoryStats::default(), |mut stats, entry| {
            stats.total_sets += 1;
            match entry.kind {
                HistoryKind::Single => stats.single_sets += 1,
                HistoryKind::MultiImage => stats.multi_image_sets += 1,
            }
            stats.total_images += entry.images.len();
            stats
        }))
    }
}
