//! Per-video serialization of cold-path acquisitions.
//!
//! Acquisitions for one video id run one at a time under a keyed async lock.
//! A launched transcode stays registered as in flight until its process
//! exits, so a later request can reuse it instead of starting another.

use crate::audio::TranscodeJob;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{watch, OwnedMutexGuard};
use tracing::{debug, info};

struct InFlight {
    location: String,
    done: watch::Receiver<bool>,
}

/// Keyed lock plus in-flight transcode registry.
#[derive(Default)]
pub struct ColdPath {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    in_flight: Mutex<HashMap<String, InFlight>>,
}

/// Exclusive hold on one video id's cold path.
pub struct KeyGuard {
    owner: Arc<ColdPath>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = lock_map(&self.owner.locks);
        let idle = locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.key);
        }
    }
}

impl ColdPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `video_id`'s cold path.
    pub async fn lock(self: &Arc<Self>, video_id: &str) -> KeyGuard {
        let lock = lock_map(&self.locks)
            .entry(video_id.to_string())
            .or_default()
            .clone();

        let guard = lock.lock_owned().await;
        KeyGuard {
            owner: Arc::clone(self),
            key: video_id.to_string(),
            guard: Some(guard),
        }
    }

    /// Playlist location of a running transcode for `video_id`.
    pub fn in_flight(&self, video_id: &str) -> Option<String> {
        lock_map(&self.in_flight)
            .get(video_id)
            .map(|entry| entry.location.clone())
    }

    /// Number of transcodes currently running.
    pub fn in_flight_count(&self) -> usize {
        lock_map(&self.in_flight).len()
    }

    /// Register a launched job until its process exits.
    pub fn track(self: &Arc<Self>, video_id: &str, job: TranscodeJob) {
        let (done_tx, done_rx) = watch::channel(false);
        lock_map(&self.in_flight).insert(
            video_id.to_string(),
            InFlight {
                location: job.playlist_location(),
                done: done_rx,
            },
        );

        let owner = Arc::clone(self);
        let key = video_id.to_string();
        tokio::spawn(async move {
            let status = job.wait().await;
            info!("Transcode for {} finished: {:?}", key, status);
            // Unregister before signalling so a waiter never sees a stale entry.
            lock_map(&owner.in_flight).remove(&key);
            let _ = done_tx.send(true);
        });
    }

    /// Wait until the running transcode for `video_id`, if any, exits.
    pub async fn wait(&self, video_id: &str) {
        let done = lock_map(&self.in_flight)
            .get(video_id)
            .map(|entry| entry.done.clone());

        if let Some(mut done) = done {
            debug!("Waiting for transcode of {}", video_id);
            let _ = done.wait_for(|finished| *finished).await;
        }
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

// Map updates are single inserts or removes, so a poisoned lock is still usable.
fn lock_map<T>(map: &Mutex<T>) -> MutexGuard<'_, T> {
    map.lock().unwrap_or_else(|e| e.into_inner())
}
