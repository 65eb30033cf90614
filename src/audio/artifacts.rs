//! On-disk layout of transcoded artifacts.

use std::path::{Path, PathBuf};

/// Playlist file written by the transcoder.
pub const PLAYLIST_FILENAME: &str = "audio.m3u8";

/// Segment file pattern handed to ffmpeg.
pub const SEGMENT_FILENAME: &str = "segment%04d.ts";

/// Directory under the static root holding one sub-directory per video.
pub const STREAMS_DIR: &str = "streams";

/// Deterministic artifact paths rooted at the static directory.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    static_root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(static_root: impl Into<PathBuf>) -> Self {
        Self {
            static_root: static_root.into(),
        }
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    /// `<static_root>/streams/<video_id>`
    pub fn video_dir(&self, video_id: &str) -> PathBuf {
        self.static_root.join(STREAMS_DIR).join(video_id)
    }

    pub fn playlist_path(&self, video_id: &str) -> PathBuf {
        self.video_dir(video_id).join(PLAYLIST_FILENAME)
    }

    pub fn segment_pattern(&self, video_id: &str) -> PathBuf {
        self.video_dir(video_id).join(SEGMENT_FILENAME)
    }

    /// Playlist location as reported to clients.
    pub fn playlist_location(&self, video_id: &str) -> String {
        location_of(&self.playlist_path(video_id))
    }
}

/// Render a path the way it is handed out in API responses.
pub fn location_of(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = ArtifactLayout::new("static");
        assert_eq!(
            layout.video_dir("abc"),
            PathBuf::from("static/streams/abc")
        );
        assert_eq!(
            layout.playlist_path("abc"),
            PathBuf::from("static/streams/abc/audio.m3u8")
        );
        assert_eq!(
            layout.segment_pattern("abc"),
            PathBuf::from("static/streams/abc/segment%04d.ts")
        );
        assert_eq!(layout.playlist_location("abc"), "static/streams/abc/audio.m3u8");
    }
}
