//! Source stream discovery and selection.
//!
//! A video is available in several encodings. A [`StreamResolver`] enumerates
//! them and [`select_stream`] picks the one to download.

mod selector;
mod youtube;

pub use selector::{choose_stream, parse_resolution, PREFERRED_FORMAT};
pub use youtube::YtDlpResolver;

use crate::error::{AudiubeError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Tracks carried by a source stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Audio track only.
    Audio,
    /// Video track only.
    Video,
    /// Combined audio and video.
    AudioVideo,
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Audio => write!(f, "audio"),
            MediaType::Video => write!(f, "video"),
            MediaType::AudioVideo => write!(f, "audio+video"),
        }
    }
}

/// One encoding variant of a source video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStream {
    /// Container format, e.g. `mp4`.
    pub format: String,
    pub media_type: MediaType,
    /// Nominal resolution label, e.g. `480p`. Empty for audio-only streams.
    pub resolution: String,
    pub duration: Duration,
    /// Direct media URL.
    pub url: String,
}

impl SourceStream {
    pub fn is_audio_only(&self) -> bool {
        self.media_type == MediaType::Audio
    }
}

/// Enumerates the source streams available for a video.
#[async_trait]
pub trait StreamResolver: Send + Sync {
    /// List streams in the order the platform reports them.
    async fn resolve(&self, video_id: &str) -> Result<Vec<SourceStream>>;
}

/// Resolve the streams of `video_id` and pick one according to [`choose_stream`].
#[instrument(skip(resolver))]
pub async fn select_stream(resolver: &dyn StreamResolver, video_id: &str) -> Result<SourceStream> {
    let streams = resolver.resolve(video_id).await?;
    let chosen = choose_stream(&streams).cloned().ok_or_else(|| {
        AudiubeError::Resolution(format!("no streams available for video {}", video_id))
    })?;

    debug!(
        "Selected {} {} stream ({}) out of {}",
        chosen.format,
        chosen.media_type,
        chosen.resolution,
        streams.len()
    );
    Ok(chosen)
}
