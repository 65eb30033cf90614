//! HTTP front end.
//!
//! Every request passes the context middleware, which registers a
//! [`RequestId`](crate::context::RequestId) for the lifetime of the request.
//! Stream requests additionally get a store session placed into that context.

mod handlers;
mod middleware;

pub use handlers::{content_type_for, is_valid_video_id, ApiError, StreamResponse};

use crate::context::RequestContextStore;
use crate::orchestrator::Orchestrator;
use crate::store::StoreConnector;
use axum::{middleware::from_fn_with_state, routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub connector: Arc<dyn StoreConnector>,
    pub contexts: Arc<RequestContextStore>,
    pub static_root: PathBuf,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>, connector: Arc<dyn StoreConnector>) -> Self {
        let static_root = orchestrator.layout().static_root().to_path_buf();
        Self {
            orchestrator,
            connector,
            contexts: Arc::new(RequestContextStore::new()),
            static_root,
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let streams = Router::new()
        // Catch-all so ids with extra segments are rejected as bad requests.
        .route("/streams/{*video_id}", get(handlers::stream))
        .route_layer(from_fn_with_state(state.clone(), middleware::store_session));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/streams", get(handlers::missing_id))
        .route("/streams/", get(handlers::missing_id))
        .route("/static/{*path}", get(handlers::static_file))
        .merge(streams)
        .layer(from_fn_with_state(state.clone(), middleware::request_context))
        .layer(cors)
        .with_state(state)
}

/// Serve the router on an already bound listener until the process stops.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }
    axum::serve(listener, router(state)).await
}
