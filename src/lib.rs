//! Audiube - YouTube audio as HLS
//!
//! Turns YouTube videos into HLS audio playlists on demand and serves them
//! over HTTP.
//!
//! # Overview
//!
//! A playback request for a video id is answered from the first tier that
//! knows the playlist:
//! - the persistent store of video records
//! - the artifact directory on disk
//! - a fresh acquisition: pick a source stream, download it in chunks and
//!   pipe the chunks through ffmpeg's HLS muxer
//!
//! A fresh acquisition returns as soon as ffmpeg is running; the playlist
//! grows while the client plays it.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `source` - Stream enumeration (yt-dlp) and selection
//! - `audio` - Chunked download, ffmpeg transcoding and artifact layout
//! - `store` - Persistent video records (SQLite, memory)
//! - `context` - Request-scoped value sharing
//! - `orchestrator` - Tiered playlist lookup
//! - `server` - axum HTTP front end
//!
//! # Example
//!
//! ```rust,no_run
//! use audiube::config::Settings;
//! use audiube::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::from_settings(&settings);
//!
//!     let resolved = orchestrator.resolve_playlist("dQw4w9WgXcQ", None).await?;
//!     println!("Playlist at {}", resolved.location);
//!     orchestrator.wait_for_transcode("dQw4w9WgXcQ").await;
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod server;
pub mod source;
pub mod store;

pub use error::{AudiubeError, Result};
