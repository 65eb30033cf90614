//! Playlist resolution for Audiube.
//!
//! Finds or produces the HLS playlist of a video: the persistent store is
//! asked first, then the artifact directory, and only if both miss is the
//! source downloaded and handed to the transcoder.

mod cold_path;

pub use cold_path::{ColdPath, KeyGuard};

use crate::audio::{ArtifactLayout, Downloader, FfmpegTranscoder, HttpDownloader, Transcoder};
use crate::config::Settings;
use crate::error::Result;
use crate::source::{select_stream, StreamResolver, YtDlpResolver};
use crate::store::{Registration, VideoStore};
use serde::Serialize;
use std::io::ErrorKind;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Which lookup tier produced a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistSource {
    Store,
    Filesystem,
    /// A transcode for the video was already running.
    InFlight,
    /// A transcode was started by this request.
    Launched,
}

impl std::fmt::Display for PlaylistSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaylistSource::Store => write!(f, "store"),
            PlaylistSource::Filesystem => write!(f, "filesystem"),
            PlaylistSource::InFlight => write!(f, "in flight"),
            PlaylistSource::Launched => write!(f, "launched"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPlaylist {
    pub video_id: String,
    pub location: String,
    pub source: PlaylistSource,
}

impl ResolvedPlaylist {
    fn new(video_id: &str, location: impl Into<String>, source: PlaylistSource) -> Self {
        Self {
            video_id: video_id.to_string(),
            location: location.into(),
            source,
        }
    }
}

/// The main orchestrator for the Audiube pipeline.
pub struct Orchestrator {
    resolver: Arc<dyn StreamResolver>,
    downloader: Arc<dyn Downloader>,
    transcoder: Arc<dyn Transcoder>,
    layout: ArtifactLayout,
    cold_path: Arc<ColdPath>,
}

impl Orchestrator {
    /// Create an orchestrator with custom components.
    pub fn new(
        resolver: Arc<dyn StreamResolver>,
        downloader: Arc<dyn Downloader>,
        transcoder: Arc<dyn Transcoder>,
        layout: ArtifactLayout,
    ) -> Self {
        Self {
            resolver,
            downloader,
            transcoder,
            layout,
            cold_path: Arc::new(ColdPath::new()),
        }
    }

    /// Create an orchestrator backed by yt-dlp, reqwest and ffmpeg.
    pub fn from_settings(settings: &Settings) -> Self {
        let layout = ArtifactLayout::new(settings.static_dir());
        info!(
            "Serving artifacts from {:?} (ffmpeg: {}, yt-dlp: {})",
            layout.static_root(),
            settings.tools.ffmpeg,
            settings.tools.ytdlp
        );

        Self::new(
            Arc::new(YtDlpResolver::new(settings.tools.ytdlp.clone())),
            Arc::new(HttpDownloader::new()),
            Arc::new(FfmpegTranscoder::new(settings.tools.ffmpeg.clone(), layout.clone())),
            layout,
        )
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Number of transcodes still running.
    pub fn active_transcodes(&self) -> usize {
        self.cold_path.in_flight_count()
    }

    /// Find or produce the playlist of `video_id`.
    ///
    /// Store and filesystem failures count as misses. Without a store session
    /// only the filesystem and the cold path are consulted.
    #[instrument(skip(self, store))]
    pub async fn resolve_playlist(
        &self,
        video_id: &str,
        store: Option<Arc<dyn VideoStore>>,
    ) -> Result<ResolvedPlaylist> {
        if let Some(store) = &store {
            match store.get(video_id).await {
                Ok(Some(record)) => {
                    if let Some(url) = record.playlist() {
                        debug!("Store hit for {}", video_id);
                        return Ok(ResolvedPlaylist::new(video_id, url, PlaylistSource::Store));
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Store lookup for {} failed: {}", video_id, e),
            }
        }

        if let Some(location) = self.cached_playlist(video_id).await {
            debug!("Filesystem hit for {}", video_id);
            if let Some(store) = store {
                spawn_write_back(store, video_id, &location);
            }
            return Ok(ResolvedPlaylist::new(video_id, location, PlaylistSource::Filesystem));
        }

        self.acquire(video_id).await
    }

    /// Wait for a running transcode of `video_id` to exit.
    pub async fn wait_for_transcode(&self, video_id: &str) {
        self.cold_path.wait(video_id).await;
    }

    async fn acquire(&self, video_id: &str) -> Result<ResolvedPlaylist> {
        let _guard = self.cold_path.lock(video_id).await;

        // An earlier holder of the lock may have produced or started it.
        if let Some(location) = self.cached_playlist(video_id).await {
            return Ok(ResolvedPlaylist::new(video_id, location, PlaylistSource::Filesystem));
        }
        if let Some(location) = self.cold_path.in_flight(video_id) {
            debug!("Transcode for {} already running", video_id);
            return Ok(ResolvedPlaylist::new(video_id, location, PlaylistSource::InFlight));
        }

        let stream = select_stream(self.resolver.as_ref(), video_id).await?;
        let chunks = self.downloader.download(&stream).await?;
        let job = self
            .transcoder
            .build_hls(video_id, chunks, stream.duration)
            .await?;

        let location = job.playlist_location();
        self.cold_path.track(video_id, job);

        info!("Started transcode for {} into {}", video_id, location);
        Ok(ResolvedPlaylist::new(video_id, location, PlaylistSource::Launched))
    }

    async fn cached_playlist(&self, video_id: &str) -> Option<String> {
        let path = self.layout.playlist_path(video_id);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(self.layout.playlist_location(video_id)),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Could not stat {:?}: {}", path, e);
                None
            }
        }
    }
}

/// Record a playlist found on disk, filling a record without URL but never
/// overwriting one that has it.
fn spawn_write_back(
    store: Arc<dyn VideoStore>,
    video_id: &str,
    location: &str,
) -> tokio::task::JoinHandle<()> {
    let video_id = video_id.to_string();
    let location = location.to_string();
    tokio::spawn(async move {
        match store.register_playlist(&video_id, &location).await {
            Ok(Registration::Created) => info!("Registered playlist of {} in store", video_id),
            Ok(Registration::Filled) => info!("Filled playlist of {} in store", video_id),
            Ok(Registration::Kept) => debug!("Store already has a playlist for {}", video_id),
            Err(e) => warn!("Failed to register playlist of {}: {}", video_id, e),
        }
    })
}
