//! HTTP server for HLS playback clients.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::server::{self, AppState};
use crate::store::connector_from_settings;
use std::sync::Arc;
use tracing::info;

/// Run the HTTP server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    preflight::check(Operation::Serve, &settings)?;

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let static_dir = settings.static_dir();
    std::fs::create_dir_all(&static_dir)?;

    let connector = connector_from_settings(&settings)?;
    info!("Using store {}", connector.describe());

    let orchestrator = Arc::new(Orchestrator::from_settings(&settings));
    let state = Arc::new(AppState::new(orchestrator, connector.clone()));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Audiube Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    Output::kv("Static dir", &static_dir.display().to_string());
    Output::kv("Store", &connector.describe());
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Stream", "GET  /streams/{video_id}");
    Output::kv("Static", "GET  /static/{path}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    server::serve(listener, state).await?;

    Ok(())
}
