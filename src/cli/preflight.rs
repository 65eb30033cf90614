//! Pre-flight checks before starting the pipeline.
//!
//! Validates that the external tools are available before the server accepts
//! requests that would otherwise fail on the first cold path.

use crate::config::Settings;
use crate::error::{AudiubeError, Result};
use std::process::Command;

/// Operations with external requirements.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Serving needs ffmpeg and yt-dlp for cold paths.
    Serve,
    /// Fetching runs the same pipeline once.
    Fetch,
}

/// Run pre-flight checks for the given operation.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Serve | Operation::Fetch => {
            check_tool(&settings.tools.ytdlp)?;
            check_tool(&settings.tools.ffmpeg)?;
        }
    }
    Ok(())
}

/// Flag spelling for printing a tool's version.
pub fn version_arg(program: &str) -> &'static str {
    // ffmpeg uses -version (single dash), others use --version
    let name = std::path::Path::new(program)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(program);
    match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    }
}

/// Check if an external tool is available.
pub fn check_tool(program: &str) -> Result<()> {
    match Command::new(program).arg(version_arg(program)).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(AudiubeError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            program
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AudiubeError::ToolNotFound(program.to_string()))
        }
        Err(e) => Err(AudiubeError::ToolNotFound(format!("{}: {}", program, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_arg() {
        assert_eq!(version_arg("ffmpeg"), "-version");
        assert_eq!(version_arg("/usr/local/bin/ffmpeg"), "-version");
        assert_eq!(version_arg("yt-dlp"), "--version");
    }

    #[test]
    fn test_missing_tool_fails_preflight() {
        let mut settings = Settings::default();
        settings.tools.ytdlp = "/nonexistent/yt-dlp-audiube".to_string();

        let err = check(Operation::Fetch, &settings).unwrap_err();
        assert!(matches!(err, AudiubeError::ToolNotFound(_)));
    }
}
