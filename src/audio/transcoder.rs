//! HLS transcoding through an external ffmpeg process.
//!
//! Downloaded chunks are written to ffmpeg's stdin by a dedicated task while
//! ffmpeg writes the playlist and segments into the artifact directory. The
//! caller gets control back as soon as the process is running.

use super::artifacts::{ArtifactLayout, location_of};
use super::downloader::ChunkStream;
use super::playlist::format_hms;
use crate::error::{AudiubeError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Target segment length in seconds.
pub const SEGMENT_SECONDS: u32 = 10;

/// A launched transcode.
///
/// Files under [`TranscodeJob::playlist_path`] appear while the job runs.
pub struct TranscodeJob {
    playlist_path: PathBuf,
    completion: JoinHandle<Option<ExitStatus>>,
}

impl TranscodeJob {
    pub fn new(playlist_path: PathBuf, completion: JoinHandle<Option<ExitStatus>>) -> Self {
        Self {
            playlist_path,
            completion,
        }
    }

    pub fn playlist_path(&self) -> &Path {
        &self.playlist_path
    }

    pub fn playlist_location(&self) -> String {
        location_of(&self.playlist_path)
    }

    pub fn is_finished(&self) -> bool {
        self.completion.is_finished()
    }

    /// Wait for the transcoder to exit.
    ///
    /// Returns `None` if the exit status could not be collected.
    pub async fn wait(self) -> Option<ExitStatus> {
        self.completion.await.ok().flatten()
    }
}

/// Turns a chunk sequence into an HLS playlist on disk.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn build_hls(
        &self,
        video_id: &str,
        chunks: ChunkStream,
        duration: Duration,
    ) -> Result<TranscodeJob>;
}

/// Runs ffmpeg with stream copy into the HLS muxer.
pub struct FfmpegTranscoder {
    program: String,
    layout: ArtifactLayout,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<String>, layout: ArtifactLayout) -> Self {
        Self {
            program: program.into(),
            layout,
        }
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// ffmpeg arguments for one transcode.
    pub fn ffmpeg_args(duration: Duration, segment_pattern: &Path, playlist: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            "pipe:0".to_string(),
            "-codec:a".to_string(),
            "copy".to_string(),
            "-vn".to_string(),
            "-ss".to_string(),
            "0".to_string(),
            "-t".to_string(),
            format_hms(duration),
            "-start_number".to_string(),
            "0".to_string(),
            "-hls_time".to_string(),
            SEGMENT_SECONDS.to_string(),
            "-hls_list_size".to_string(),
            "0".to_string(),
            "-hls_segment_filename".to_string(),
            location_of(segment_pattern),
            "-f".to_string(),
            "hls".to_string(),
            location_of(playlist),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    #[instrument(skip(self, chunks))]
    async fn build_hls(
        &self,
        video_id: &str,
        chunks: ChunkStream,
        duration: Duration,
    ) -> Result<TranscodeJob> {
        let dir = self.layout.video_dir(video_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| AudiubeError::Directory {
                path: dir.clone(),
                source,
            })?;

        let playlist_path = self.layout.playlist_path(video_id);
        let args = Self::ffmpeg_args(
            duration,
            &self.layout.segment_pattern(video_id),
            &playlist_path,
        );

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AudiubeError::TranscodeStart(format!("{} not found", self.program))
                } else {
                    AudiubeError::TranscodeStart(format!("{}: {}", self.program, e))
                }
            })?;

        let Some(stdin) = child.stdin.take() else {
            let _ = child.start_kill();
            return Err(AudiubeError::TranscodeStart(
                "transcoder stdin is not available".to_string(),
            ));
        };

        info!("Transcoder started (pid {:?})", child.id());

        let writer = tokio::spawn(feed_stdin(chunks, stdin));

        let video = video_id.to_string();
        let completion = tokio::spawn(async move {
            match writer.await {
                Ok(written) => debug!("Fed {} bytes to transcoder for {}", written, video),
                Err(e) => warn!("Transcoder input task for {} failed: {}", video, e),
            }

            match child.wait().await {
                Ok(status) if status.success() => {
                    info!("Transcode of {} finished", video);
                    Some(status)
                }
                Ok(status) => {
                    warn!("Transcode of {} exited with {}", video, status);
                    Some(status)
                }
                Err(e) => {
                    warn!("Could not collect transcoder exit status for {}: {}", video, e);
                    None
                }
            }
        });

        Ok(TranscodeJob::new(playlist_path, completion))
    }
}

/// Write every chunk to the transcoder in order, then close its stdin.
async fn feed_stdin(mut chunks: ChunkStream, mut stdin: ChildStdin) -> usize {
    let mut written = 0usize;

    while let Some(chunk) = chunks.next_chunk().await {
        if let Err(e) = stdin.write_all(&chunk).await {
            warn!("Transcoder stopped accepting input: {}", e);
            break;
        }
        written += chunk.len();
    }

    if let Err(e) = stdin.shutdown().await {
        debug!("Closing transcoder stdin failed: {}", e);
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_ffmpeg_args() {
        let layout = ArtifactLayout::new("static");
        let args = FfmpegTranscoder::ffmpeg_args(
            Duration::from_secs(3931),
            &layout.segment_pattern("abc"),
            &layout.playlist_path("abc"),
        );

        let joined = args.join(" ");
        assert!(joined.starts_with("-y "));
        assert!(joined.contains("-i pipe:0"));
        assert!(joined.contains("-codec:a copy -vn"));
        assert!(joined.contains("-ss 0 -t 01:05:31"));
        assert!(joined.contains("-hls_time 10 -hls_list_size 0"));
        assert!(joined.contains("-hls_segment_filename static/streams/abc/segment%04d.ts"));
        assert!(joined.ends_with("-f hls static/streams/abc/audio.m3u8"));
    }

    #[tokio::test]
    async fn test_directory_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let transcoder = FfmpegTranscoder::new("ffmpeg", ArtifactLayout::new(&blocker));
        let err = transcoder
            .build_hls("abc", ChunkStream::from_chunks(Vec::new()), Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AudiubeError::Directory { .. }));
    }

    #[tokio::test]
    async fn test_missing_program_is_start_error() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = ArtifactLayout::new(tmp.path());
        let transcoder = FfmpegTranscoder::new("audiube-test-no-such-ffmpeg", layout.clone());

        let err = transcoder
            .build_hls("abc", ChunkStream::from_chunks(Vec::new()), Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AudiubeError::TranscodeStart(_)));

        // Directory creation precedes the launch and is not rolled back.
        assert!(layout.video_dir("abc").is_dir());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_chunks_are_piped_to_transcoder() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();

        // Stand-in transcoder: copy stdin into the last argument (the playlist path).
        let script = tmp.path().join("fake-ffmpeg");
        std::fs::write(&script, "#!/bin/sh\nfor arg; do out=\"$arg\"; done\ncat > \"$out\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let layout = ArtifactLayout::new(tmp.path().join("static"));
        let transcoder = FfmpegTranscoder::new(location_of(&script), layout.clone());

        let chunks = ChunkStream::from_chunks(vec![
            Bytes::from_static(b"#EXTM3U\n"),
            Bytes::from_static(b"#EXTINF:10.0,\n"),
            Bytes::from_static(b"segment0000.ts\n"),
        ]);

        let job = transcoder
            .build_hls("abc", chunks, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(job.playlist_path(), layout.playlist_path("abc"));

        let status = job.wait().await.expect("exit status");
        assert!(status.success());

        let written = std::fs::read_to_string(layout.playlist_path("abc")).unwrap();
        assert_eq!(written, "#EXTM3U\n#EXTINF:10.0,\nsegment0000.ts\n");
    }
}
