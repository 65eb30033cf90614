//! Fetch command - resolve one playlist from the command line.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, PlaylistSource, ResolvedPlaylist};
use crate::server::is_valid_video_id;
use crate::store::{connector_from_settings, Registration, StoreConnector, VideoStore};
use std::sync::Arc;
use tracing::warn;

/// Resolve the playlist of `video_id`, waiting for a transcode if one runs.
pub async fn run_fetch(video_id: &str, settings: Settings) -> anyhow::Result<()> {
    if !is_valid_video_id(video_id) {
        anyhow::bail!("Invalid video id: {:?}", video_id);
    }
    preflight::check(Operation::Fetch, &settings)?;
    std::fs::create_dir_all(settings.static_dir())?;

    let orchestrator = Orchestrator::from_settings(&settings);
    let store = match connector_from_settings(&settings) {
        Ok(connector) => open_session(connector.as_ref()).await,
        Err(e) => {
            warn!("Store unavailable, continuing without it: {}", e);
            None
        }
    };

    Output::info(&format!("Resolving playlist for {}...", video_id));
    let resolved = orchestrator.resolve_playlist(video_id, store.clone()).await?;
    report(&resolved);

    if matches!(resolved.source, PlaylistSource::Launched | PlaylistSource::InFlight) {
        Output::info("Waiting for transcode to finish...");
        orchestrator.wait_for_transcode(video_id).await;

        let playlist = orchestrator.layout().playlist_path(video_id);
        if !playlist.is_file() {
            anyhow::bail!("Transcode of {} produced no playlist at {}", video_id, playlist.display());
        }
        Output::success("Transcode finished.");

        if let Some(store) = store {
            remember(store.as_ref(), video_id, &resolved.location).await;
        }
    }

    println!("{}", resolved.location);
    Ok(())
}

async fn open_session(connector: &dyn StoreConnector) -> Option<Arc<dyn VideoStore>> {
    match connector.connect().await {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("Could not open store session on {}: {}", connector.describe(), e);
            None
        }
    }
}

async fn remember(store: &dyn VideoStore, video_id: &str, location: &str) {
    match store.register_playlist(video_id, location).await {
        Ok(Registration::Created) | Ok(Registration::Filled) => {
            Output::kv("Store", "registered");
        }
        Ok(Registration::Kept) => Output::kv("Store", "already registered"),
        Err(e) => Output::warning(&format!("Failed to register playlist: {}", e)),
    }
}

fn report(resolved: &ResolvedPlaylist) {
    Output::kv("Video", &resolved.video_id);
    Output::kv("Playlist", &resolved.location);
    Output::kv("Source", &resolved.source.to_string());
}
