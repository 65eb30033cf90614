//! Init command - first-run setup.

use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::path::Path;

/// Run the init command for first-time setup.
pub fn run_init(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Audiube Setup");
    println!();

    println!("{}", style("Step 1: Checking prerequisites").bold().cyan());
    println!();

    let missing = missing_tools(settings);
    if missing.is_empty() {
        Output::success("All required tools are installed!");
    } else {
        Output::warning("Some tools are missing. Please install them:");
        println!();
        for tool in &missing {
            println!("  {} {} - not found", style("✗").red(), style(tool).bold());
            println!("    {} {}", style("→").dim(), style(install_hint(tool)).dim());
        }
    }

    println!();

    println!("{}", style("Step 2: Setting up directories").bold().cyan());
    println!();

    let static_dir = settings.static_dir();
    if static_dir.exists() {
        Output::info(&format!("Static directory exists: {}", static_dir.display()));
    } else {
        std::fs::create_dir_all(&static_dir)?;
        Output::success(&format!("Created static directory: {}", static_dir.display()));
    }

    println!();

    println!("{}", style("Step 3: Configuration file").bold().cyan());
    println!();

    if config_path.exists() {
        Output::info(&format!("Config file exists: {}", config_path.display()));
    } else {
        // Only file-level values belong in the file; env overrides stay in the env.
        Settings::default().save_to(&config_path.to_path_buf())?;
        Output::success(&format!("Created config file: {}", config_path.display()));
    }

    if !settings.has_api_key() {
        println!();
        Output::warning("No YouTube API key configured (set YOUTUBE_API_KEY or youtube.api_key).");
    }

    println!();
    println!("{}", style("Setup Complete!").bold().green());
    println!();
    println!("Next steps:");
    println!("  {} Check system status", style("audiube doctor").cyan());
    println!("  {} Transcode a video", style("audiube fetch <video_id>").cyan());
    println!("  {} Start the server", style("audiube serve").cyan());

    Ok(())
}

fn missing_tools(settings: &Settings) -> Vec<String> {
    use std::process::Command;

    [&settings.tools.ytdlp, &settings.tools.ffmpeg]
        .into_iter()
        .filter(|tool| {
            Command::new(tool.as_str())
                .arg(crate::cli::preflight::version_arg(tool))
                .output()
                .is_err()
        })
        .cloned()
        .collect()
}

/// Get platform-specific install hint.
fn install_hint(tool: &str) -> &'static str {
    if tool.contains("yt-dlp") {
        if cfg!(target_os = "macos") {
            "Install with: brew install yt-dlp"
        } else if cfg!(target_os = "linux") {
            "Install with: pip install yt-dlp"
        } else {
            "Install from: https://github.com/yt-dlp/yt-dlp"
        }
    } else if tool.contains("ffmpeg") {
        if cfg!(target_os = "macos") {
            "Install with: brew install ffmpeg"
        } else if cfg!(target_os = "linux") {
            "Install with: sudo apt install ffmpeg"
        } else {
            "Install from: https://ffmpeg.org/download.html"
        }
    } else {
        "Check the documentation for installation instructions"
    }
}
