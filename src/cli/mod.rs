//! CLI module for Audiube.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Audiube - YouTube audio as HLS
///
/// Downloads the audio of YouTube videos, repackages it as HLS playlists and
/// serves them over HTTP.
#[derive(Parser, Debug)]
#[command(name = "audiube")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Resolve the playlist of one video and wait for its transcode
    Fetch {
        /// YouTube video ID
        video_id: String,
    },

    /// Write the default configuration and create the static directory
    Init,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["audiube", "-vv", "serve", "--port", "9000"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, None);
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_fetch_with_config() {
        let cli = Cli::parse_from(["audiube", "fetch", "dQw4w9WgXcQ", "-c", "/tmp/a.toml"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/a.toml"));
        assert!(matches!(cli.command, Commands::Fetch { ref video_id } if video_id == "dQw4w9WgXcQ"));
    }
}
