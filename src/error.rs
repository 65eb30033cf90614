//! Error types for Audiube.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Library-level error type for Audiube operations.
#[derive(Error, Debug)]
pub enum AudiubeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No usable source stream: {0}")]
    Resolution(String),

    #[error("Chunk not received within {0:?}")]
    ChunkTimeout(Duration),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Failed to create artifact directory {path:?}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start transcoder: {0}")]
    TranscodeStart(String),

    #[error("Persistent store error: {0}")]
    Store(String),

    #[error("Request {0} is already registered")]
    DuplicateRegistration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Result type alias for Audiube operations.
pub type Result<T> = std::result::Result<T, AudiubeError>;
