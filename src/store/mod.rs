//! Persistent store for video records.
//!
//! A record remembers where the playlist of a video lives once a transcode
//! has produced one. Records are created once and their playlist URL never
//! changes after it has been set.

mod memory;
mod sqlite;

pub use memory::{MemoryConnector, MemoryVideoStore};
pub use sqlite::{SqliteConnector, SqliteVideoStore};

use crate::config::{Settings, StoreProvider};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cached playlist location for one video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub playlist_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    pub fn new(video_id: impl Into<String>, playlist_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            video_id: video_id.into(),
            playlist_url,
            created_at: now,
            updated_at: now,
        }
    }

    /// Playlist URL, if set and non-empty.
    pub fn playlist(&self) -> Option<&str> {
        self.playlist_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// Outcome of [`VideoStore::register_playlist`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// No record existed; one was created with the URL.
    Created,
    /// A record without URL existed; the URL was filled in.
    Filled,
    /// A record with a URL existed and was left untouched.
    Kept,
}

/// Trait for video record stores.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Fetch the record for a video.
    async fn get(&self, video_id: &str) -> Result<Option<VideoRecord>>;

    /// Create a record with the URL unless one already exists.
    ///
    /// Returns whether a record was created.
    async fn create_if_absent(&self, video_id: &str, playlist_url: &str) -> Result<bool>;

    /// Create the record, or set its URL if it has none. Never overwrites a URL.
    async fn register_playlist(&self, video_id: &str, playlist_url: &str) -> Result<Registration>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;
}

/// Opens store sessions.
///
/// A session is opened for each request and dropped when the request ends.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn VideoStore>>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Build the connector selected by the settings.
pub fn connector_from_settings(settings: &Settings) -> Result<Arc<dyn StoreConnector>> {
    match settings.store.provider {
        StoreProvider::Sqlite => Ok(Arc::new(SqliteConnector::new(settings.store_path())?)),
        StoreProvider::Memory => Ok(Arc::new(MemoryConnector::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_playlist() {
        let record = VideoRecord::new("abc", Some("/a/b.m3u8".to_string()));
        assert_eq!(record.playlist(), Some("/a/b.m3u8"));

        let empty = VideoRecord::new("abc", Some(String::new()));
        assert_eq!(empty.playlist(), None);

        let unset = VideoRecord::new("abc", None);
        assert_eq!(unset.playlist(), None);
    }

    #[tokio::test]
    async fn test_memory_connector_from_settings() {
        let mut settings = Settings::default();
        settings.store.provider = StoreProvider::Memory;

        let connector = connector_from_settings(&settings).unwrap();
        let store = connector.connect().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
