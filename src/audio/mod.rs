//! Audio acquisition and HLS transcoding.
//!
//! - `downloader`: chunked download of a source stream
//! - `transcoder`: ffmpeg HLS pipe fed from the downloaded chunks
//! - `artifacts`: deterministic on-disk layout of playlists and segments
//! - `playlist`: playlist text helpers

pub mod artifacts;
pub mod downloader;
pub mod playlist;
pub mod transcoder;

pub use artifacts::{ArtifactLayout, PLAYLIST_FILENAME, SEGMENT_FILENAME};
pub use downloader::{ChunkStream, Downloader, HttpDownloader, CHUNK_TIMEOUT};
pub use playlist::{format_hms, insert_start_directive};
pub use transcoder::{FfmpegTranscoder, TranscodeJob, Transcoder};
