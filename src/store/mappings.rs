//! Tag-to-task mappings, backed by `{data_dir}/nfc_mappings.json`.
//!
//! A mapping is just `tag id → task title`. The title is the join key into
//! the task store; the scan engine re-resolves it on every scan so a deleted
//! task can be recreated from the mapping alone.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[async_trait]
pub trait TagMappingStore: Send + Sync {
    async fn get(&self, tag_id: &str) -> Result<Option<String>>;
    /// Insert or replace the mapping for `tag_id`.
    async fn upsert(&self, tag_id: &str, title: &str) -> Result<()>;
    /// Returns `false` when no mapping existed.
    async fn remove(&self, tag_id: &str) -> Result<bool>;
    async fn list(&self) -> Result<BTreeMap<String, String>>;
}

/// Mapping store backed by a single JSON object on disk.
pub struct JsonMappingStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonMappingStore {
    pub fn new(data_dir: &Path) -> Self {
        JsonMappingStore {
            path: data_dir.join("nfc_mappings.json"),
            lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>> {
        super::read_json_or(&self.path, BTreeMap::new()).await
    }
}

#[async_trait]
impl TagMappingStore for JsonMappingStore {
    async fn get(&self, tag_id: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.get(tag_id).cloned())
    }

    async fn upsert(&self, tag_id: &str, title: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut mappings = self.load().await?;
        let old = mappings.insert(tag_id.to_string(), title.to_string());
        super::write_json(&self.path, &mappings).await?;
        match old {
            Some(previous) if previous != title => {
                tracing::info!(tag_id, from = %previous, to = %title, "tag remapped");
            }
            Some(_) => {}
            None => tracing::info!(tag_id, title, "tag mapped"),
        }
        Ok(())
    }

    async fn remove(&self, tag_id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut mappings = self.load().await?;
        if mappings.remove(tag_id).is_none() {
            return Ok(false);
        }
        super::write_json(&self.path, &mappings).await?;
        tracing::info!(tag_id, "tag mapping removed");
        Ok(true)
    }

    async fn list(&self) -> Result<BTreeMap<String, String>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_then_get_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonMappingStore::new(dir.path());

        store.upsert("04:AA:BB:CC", "Water Plants").await.unwrap();
        assert_eq!(
            store.get("04:AA:BB:CC").await.unwrap().as_deref(),
            Some("Water Plants")
        );

        // Re-mapping replaces in place.
        store.upsert("04:AA:BB:CC", "Feed Cat").await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);

        assert!(store.remove("04:AA:BB:CC").await.unwrap());
        assert!(!store.remove("04:AA:BB:CC").await.unwrap());
        assert_eq!(store.get("04:AA:BB:CC").await.unwrap(), None);
    }

    #[tokio::test]
    async fn mappings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        JsonMappingStore::new(dir.path())
            .upsert("t1", "A")
            .await
            .unwrap();
        let reopened = JsonMappingStore::new(dir.path());
        assert_eq!(reopened.get("t1").await.unwrap().as_deref(), Some("A"));
    }
}
