//! SQLite-based video store.

use super::{Registration, StoreConnector, VideoRecord, VideoStore};
use crate::error::{AudiubeError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS videos (
        video_id TEXT PRIMARY KEY,
        playlist_url TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
"#;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// One SQLite connection onto the `videos` table.
pub struct SqliteVideoStore {
    conn: Mutex<Connection>,
}

impl SqliteVideoStore {
    /// Open the database at `path`, creating the schema if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AudiubeError::Store(format!("Failed to acquire lock: {}", e)))
    }

    fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| AudiubeError::Store(format!("Invalid timestamp {:?}: {}", value, e)))
    }
}

#[async_trait]
impl VideoStore for SqliteVideoStore {
    #[instrument(skip(self))]
    async fn get(&self, video_id: &str) -> Result<Option<VideoRecord>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT video_id, playlist_url, created_at, updated_at FROM videos WHERE video_id = ?1",
                params![video_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((video_id, playlist_url, created_at, updated_at)) => Ok(Some(VideoRecord {
                video_id,
                playlist_url,
                created_at: Self::parse_timestamp(&created_at)?,
                updated_at: Self::parse_timestamp(&updated_at)?,
            })),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn create_if_absent(&self, video_id: &str, playlist_url: &str) -> Result<bool> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();

        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO videos (video_id, playlist_url, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            "#,
            params![video_id, playlist_url, now],
        )?;

        debug!("create_if_absent inserted {} row(s)", inserted);
        Ok(inserted > 0)
    }

    #[instrument(skip(self))]
    async fn register_playlist(&self, video_id: &str, playlist_url: &str) -> Result<Registration> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        let existing: Option<Option<String>> = tx
            .query_row(
                "SELECT playlist_url FROM videos WHERE video_id = ?1",
                params![video_id],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            None => {
                tx.execute(
                    r#"
                    INSERT INTO videos (video_id, playlist_url, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?3)
                    "#,
                    params![video_id, playlist_url, now],
                )?;
                Registration::Created
            }
            Some(url) if url.as_deref().map_or(true, str::is_empty) => {
                tx.execute(
                    "UPDATE videos SET playlist_url = ?2, updated_at = ?3 WHERE video_id = ?1",
                    params![video_id, playlist_url, now],
                )?;
                Registration::Filled
            }
            Some(_) => Registration::Kept,
        };

        tx.commit()?;
        Ok(outcome)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM videos", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Opens a fresh SQLite connection per session.
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    /// Prepare the database file and schema at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        // WAL lets concurrent request sessions read while one writes.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite video store at {:?}", path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StoreConnector for SqliteConnector {
    async fn connect(&self) -> Result<Arc<dyn VideoStore>> {
        let store = SqliteVideoStore::open(&self.path)?;
        Ok(Arc::new(store) as Arc<dyn VideoStore>)
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_missing() {
        let store = SqliteVideoStore::in_memory().unwrap();
        assert!(store.get("nope").await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_if_absent_is_create_only() {
        let store = SqliteVideoStore::in_memory().unwrap();

        assert!(store.create_if_absent("y", "static/streams/y/audio.m3u8").await.unwrap());
        assert!(!store.create_if_absent("y", "/other/path.m3u8").await.unwrap());

        let record = store.get("y").await.unwrap().unwrap();
        assert_eq!(record.video_id, "y");
        assert_eq!(record.playlist(), Some("static/streams/y/audio.m3u8"));
        assert!(record.created_at <= record.updated_at);
    }

    #[tokio::test]
    async fn test_register_playlist_outcomes() {
        let store = SqliteVideoStore::in_memory().unwrap();
        {
            let conn = store.lock().unwrap();
            conn.execute(
                "INSERT INTO videos (video_id, playlist_url, created_at, updated_at) VALUES ('blank', NULL, ?1, ?1)",
                params![Utc::now().to_rfc3339()],
            )
            .unwrap();
        }

        assert_eq!(
            store.register_playlist("fresh", "/fresh.m3u8").await.unwrap(),
            Registration::Created
        );
        assert_eq!(
            store.register_playlist("blank", "/blank.m3u8").await.unwrap(),
            Registration::Filled
        );
        assert_eq!(
            store.register_playlist("blank", "/again.m3u8").await.unwrap(),
            Registration::Kept
        );

        let record = store.get("blank").await.unwrap().unwrap();
        assert_eq!(record.playlist(), Some("/blank.m3u8"));
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_connector_sessions_share_file() {
        let tmp = tempfile::tempdir().unwrap();
        let connector = SqliteConnector::new(tmp.path().join("nested").join("audiube.db")).unwrap();

        let first = connector.connect().await.unwrap();
        assert!(first.create_if_absent("x", "/x.m3u8").await.unwrap());
        drop(first);

        let second = connector.connect().await.unwrap();
        let record = second.get("x").await.unwrap().unwrap();
        assert_eq!(record.playlist(), Some("/x.m3u8"));
        assert!(connector.describe().starts_with("sqlite:"));
    }
}
