//! In-memory video store.
//!
//! Useful for testing and for running without a database.

use super::{Registration, StoreConnector, VideoRecord, VideoStore};
use crate::error::{AudiubeError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory video store.
pub struct MemoryVideoStore {
    records: RwLock<HashMap<String, VideoRecord>>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace a record directly, bypassing create-only rules.
    pub fn insert(&self, record: VideoRecord) -> Result<()> {
        self.write()?.insert(record.video_id.clone(), record);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, VideoRecord>>> {
        self.records
            .read()
            .map_err(|e| AudiubeError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, VideoRecord>>> {
        self.records
            .write()
            .map_err(|e| AudiubeError::Store(format!("Failed to acquire lock: {}", e)))
    }
}

impl Default for MemoryVideoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn get(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        Ok(self.read()?.get(video_id).cloned())
    }

    async fn create_if_absent(&self, video_id: &str, playlist_url: &str) -> Result<bool> {
        let mut records = self.write()?;
        if records.contains_key(video_id) {
            return Ok(false);
        }
        records.insert(
            video_id.to_string(),
            VideoRecord::new(video_id, Some(playlist_url.to_string())),
        );
        Ok(true)
    }

    async fn register_playlist(&self, video_id: &str, playlist_url: &str) -> Result<Registration> {
        let mut records = self.write()?;
        if let Some(record) = records.get_mut(video_id) {
            if record.playlist().is_some() {
                return Ok(Registration::Kept);
            }
            record.playlist_url = Some(playlist_url.to_string());
            record.updated_at = Utc::now();
            return Ok(Registration::Filled);
        }

        records.insert(
            video_id.to_string(),
            VideoRecord::new(video_id, Some(playlist_url.to_string())),
        );
        Ok(Registration::Created)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

/// Hands out sessions onto one shared in-memory store.
#[derive(Clone)]
pub struct MemoryConnector {
    store: Arc<MemoryVideoStore>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryVideoStore::new()))
    }

    pub fn with_store(store: Arc<MemoryVideoStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<MemoryVideoStore> {
        self.store.clone()
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self) -> Result<Arc<dyn VideoStore>> {
        Ok(self.store.clone() as Arc<dyn VideoStore>)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
