//! Doctor command - verify system requirements and configuration.

use crate::cli::Output;
use crate::config::{Settings, StoreProvider};
use crate::store::connector_from_settings;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Audiube Doctor");
    println!();
    println!("Checking system requirements and configuration...\n");

    let mut checks = Vec::new();

    println!("{}", style("External Tools").bold());
    let tool_checks = vec![
        check_tool("yt-dlp", &settings.tools.ytdlp, install_hint_ytdlp()),
        check_tool("ffmpeg", &settings.tools.ffmpeg, install_hint_ffmpeg()),
    ];
    for check in &tool_checks {
        check.print();
    }
    checks.extend(tool_checks);

    println!();

    println!("{}", style("API Configuration").bold());
    let api_check = check_api_key(settings);
    api_check.print();
    checks.push(api_check);

    println!();

    println!("{}", style("Storage").bold());
    let storage_checks = vec![check_static_dir(settings), check_store(settings).await];
    for check in &storage_checks {
        check.print();
    }
    checks.extend(storage_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file(config_path);
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Audiube.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Audiube is ready to use.");
    }

    Ok(())
}

/// Check if an external tool is available.
fn check_tool(name: &str, program: &str, hint: &str) -> CheckResult {
    let version_arg = crate::cli::preflight::version_arg(program);

    match Command::new(program).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            let version_display = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            CheckResult::error(name, &format!("{} not found", program), hint)
        }
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

/// The API key only matters to the metadata front end, so its absence is a warning.
fn check_api_key(settings: &Settings) -> CheckResult {
    match settings.youtube.api_key.as_deref() {
        Some(key) if !key.is_empty() => {
            let masked = if key.len() > 8 && key.is_ascii() {
                format!("{}...{}", &key[..4], &key[key.len() - 4..])
            } else {
                "set".to_string()
            };
            CheckResult::ok("YOUTUBE_API_KEY", &format!("configured ({})", masked))
        }
        _ => CheckResult::warning(
            "YOUTUBE_API_KEY",
            "not set",
            "Set with: export YOUTUBE_API_KEY='...' (or youtube.api_key in the config)",
        ),
    }
}

fn check_static_dir(settings: &Settings) -> CheckResult {
    let static_dir = settings.static_dir();
    if static_dir.is_dir() {
        CheckResult::ok("Static directory", &static_dir.display().to_string())
    } else if static_dir.exists() {
        CheckResult::error(
            "Static directory",
            &format!("{} is not a directory", static_dir.display()),
            "Point general.static_dir at a directory",
        )
    } else {
        CheckResult::warning(
            "Static directory",
            &format!("{} (will be created)", static_dir.display()),
            "Directory will be created on first use",
        )
    }
}

async fn check_store(settings: &Settings) -> CheckResult {
    if settings.store.provider == StoreProvider::Memory {
        return CheckResult::warning(
            "Store",
            "memory (records are lost on restart)",
            "Set store.provider = \"sqlite\" to persist records",
        );
    }

    let connector = match connector_from_settings(settings) {
        Ok(connector) => connector,
        Err(e) => {
            return CheckResult::error(
                "Store",
                &format!("{}: {}", settings.store_path().display(), e),
                "Check store.url or STORE_URL",
            )
        }
    };

    match connector.connect().await {
        Ok(store) => match store.count().await {
            Ok(count) => CheckResult::ok(
                "Store",
                &format!("{} ({} records)", connector.describe(), count),
            ),
            Err(e) => CheckResult::error("Store", &e.to_string(), "Check store.url or STORE_URL"),
        },
        Err(e) => CheckResult::error("Store", &e.to_string(), "Check store.url or STORE_URL"),
    }
}

fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &config_path.display().to_string())
    } else {
        CheckResult::warning("Config file", "using defaults", "Create with: audiube init")
    }
}

/// Platform-specific install hint for yt-dlp.
fn install_hint_ytdlp() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install yt-dlp"
    } else if cfg!(target_os = "linux") {
        "Install with: pip install yt-dlp (or your package manager)"
    } else {
        "Install from: https://github.com/yt-dlp/yt-dlp"
    }
}

/// Platform-specific install hint for ffmpeg.
fn install_hint_ffmpeg() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install ffmpeg"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install ffmpeg (or your package manager)"
    } else {
        "Install from: https://ffmpeg.org/download.html"
    }
}
