//! YouTube stream resolver backed by yt-dlp.

use super::{MediaType, SourceStream, StreamResolver};
use crate::error::{AudiubeError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Upper bound for one yt-dlp run.
pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(60);

/// Resolves YouTube formats by asking yt-dlp for the video's JSON description.
pub struct YtDlpResolver {
    program: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct VideoInfo {
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    formats: Vec<FormatInfo>,
}

#[derive(Debug, Deserialize)]
struct FormatInfo {
    #[serde(default)]
    ext: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    vcodec: Option<String>,
    #[serde(default)]
    acodec: Option<String>,
    #[serde(default)]
    height: Option<u32>,
}

impl YtDlpResolver {
    pub fn new(program: impl Into<String>) -> Self {
        Self::with_timeout(program, RESOLVE_TIMEOUT)
    }

    pub fn with_timeout(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn watch_url(video_id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", video_id)
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl StreamResolver for YtDlpResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, video_id: &str) -> Result<Vec<SourceStream>> {
        let url = Self::watch_url(video_id);

        let run = tokio::process::Command::new(&self.program)
            .args([
                "--dump-json",
                "--no-download",
                "--no-warnings",
                "--no-playlist",
                &url,
            ])
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                AudiubeError::Resolution(format!(
                    "{} did not answer within {:?}",
                    self.program, self.timeout
                ))
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AudiubeError::ToolNotFound(self.program.clone())
                } else {
                    AudiubeError::Resolution(format!("Failed to run {}: {}", self.program, e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AudiubeError::Resolution(format!(
                "Video {} not found or unavailable: {}",
                video_id,
                stderr.trim()
            )));
        }

        let streams = parse_formats(&String::from_utf8_lossy(&output.stdout))?;
        debug!("yt-dlp reported {} downloadable streams", streams.len());
        Ok(streams)
    }
}

/// Map yt-dlp's JSON description to progressive, directly downloadable streams.
fn parse_formats(json: &str) -> Result<Vec<SourceStream>> {
    let info: VideoInfo = serde_json::from_str(json)
        .map_err(|e| AudiubeError::Resolution(format!("Failed to parse yt-dlp output: {}", e)))?;

    // ffmpeg is told how long to read; without a length it would produce an empty playlist.
    let duration = match info.duration {
        Some(secs) if secs >= 1.0 => Duration::from_secs(secs as u64),
        _ => {
            return Err(AudiubeError::Resolution(
                "yt-dlp reported no duration".to_string(),
            ))
        }
    };

    let streams = info
        .formats
        .into_iter()
        .filter(|f| {
            f.protocol
                .as_deref()
                .is_some_and(|p| p == "http" || p == "https")
        })
        .filter_map(|f| {
            let url = f.url?;
            let has_video = f.vcodec.as_deref().is_some_and(|c| c != "none");
            let has_audio = f.acodec.as_deref().is_some_and(|c| c != "none");

            let media_type = match (has_audio, has_video) {
                (true, false) => MediaType::Audio,
                (false, true) => MediaType::Video,
                (true, true) => MediaType::AudioVideo,
                (false, false) => return None,
            };

            Some(SourceStream {
                format: container_of(f.ext.as_deref().unwrap_or_default()),
                media_type,
                resolution: f.height.map(|h| format!("{}p", h)).unwrap_or_default(),
                duration,
                url,
            })
        })
        .collect();

    Ok(streams)
}

/// yt-dlp reports MP4 audio as `m4a`; the container is still MP4.
fn container_of(ext: &str) -> String {
    match ext {
        "m4a" => "mp4".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "dQw4w9WgXcQ",
        "duration": 212.0,
        "formats": [
            {"format_id": "sb0", "ext": "mhtml", "protocol": "mhtml", "vcodec": "none", "acodec": "none", "url": "https://i.ytimg.com/sb"},
            {"format_id": "140", "ext": "m4a", "protocol": "https", "vcodec": "none", "acodec": "mp4a.40.2", "url": "https://rr.example/140"},
            {"format_id": "18", "ext": "mp4", "protocol": "https", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2", "height": 360, "url": "https://rr.example/18"},
            {"format_id": "136", "ext": "mp4", "protocol": "https", "vcodec": "avc1.4d401f", "acodec": "none", "height": 720, "url": "https://rr.example/136"},
            {"format_id": "hls-1", "ext": "mp4", "protocol": "m3u8_native", "vcodec": "avc1", "acodec": "mp4a", "height": 240, "url": "https://manifest.example/hls"}
        ]
    }"#;

    #[test]
    fn test_parse_formats_keeps_progressive_streams() {
        let streams = parse_formats(SAMPLE).unwrap();
        assert_eq!(streams.len(), 3);

        assert_eq!(streams[0].format, "mp4");
        assert_eq!(streams[0].media_type, MediaType::Audio);
        assert_eq!(streams[0].resolution, "");

        assert_eq!(streams[1].format, "mp4");
        assert_eq!(streams[1].media_type, MediaType::AudioVideo);
        assert_eq!(streams[1].resolution, "360p");
        assert_eq!(streams[1].duration, Duration::from_secs(212));

        assert_eq!(streams[2].media_type, MediaType::Video);
        assert_eq!(streams[2].url, "https://rr.example/136");
    }

    #[test]
    fn test_parse_formats_invalid_json() {
        let err = parse_formats("not json").unwrap_err();
        assert!(matches!(err, AudiubeError::Resolution(_)));
    }

    #[test]
    fn test_parse_formats_without_formats() {
        let streams = parse_formats(r#"{"id": "x", "duration": 30}"#).unwrap();
        assert!(streams.is_empty());
    }

    #[test]
    fn test_missing_duration_is_resolution_error() {
        let formats = r#"[{"ext": "m4a", "protocol": "https", "vcodec": "none", "acodec": "mp4a.40.2", "url": "https://rr.example/140"}]"#;

        let err = parse_formats(&format!(r#"{{"id": "live", "formats": {}}}"#, formats)).unwrap_err();
        assert!(matches!(err, AudiubeError::Resolution(_)));

        let err = parse_formats(&format!(r#"{{"id": "z", "duration": 0.0, "formats": {}}}"#, formats)).unwrap_err();
        assert!(matches!(err, AudiubeError::Resolution(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_ytdlp_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let script = tmp.path().join("slow-ytdlp");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let resolver = YtDlpResolver::with_timeout(
            script.to_string_lossy().into_owned(),
            Duration::from_millis(200),
        );
        let result = tokio::time::timeout(Duration::from_secs(5), resolver.resolve("dQw4w9WgXcQ"))
            .await
            .expect("resolver should give up after its timeout");

        assert!(matches!(result, Err(AudiubeError::Resolution(_))));
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(
            YtDlpResolver::watch_url("dQw4w9WgXcQ"),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_tool_not_found() {
        let resolver = YtDlpResolver::new("audiube-test-no-such-ytdlp");
        let err = resolver.resolve("dQw4w9WgXcQ").await.unwrap_err();
        assert!(matches!(err, AudiubeError::ToolNotFound(_)));
    }
}
