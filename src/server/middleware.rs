use super::handlers::ApiError;
use super::AppState;
use crate::context::{RequestId, STORE_HANDLE_KEY};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Register a context for the request and drop it once the response is ready.
pub async fn request_context(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let id = RequestId::new();
    info!(request_id = %id, "{} {}", req.method(), req.uri());

    let scope = match state.contexts.scope(id) {
        Ok(scope) => scope,
        Err(e) => return ApiError::from(e).into_response(),
    };
    req.extensions_mut().insert(id);

    let response = next.run(req).await;
    drop(scope);
    debug!(request_id = %id, status = %response.status(), "request finished");
    response
}

/// Open a store session for the request.
///
/// A failed connect is logged and the request continues without one.
pub async fn store_session(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(id) = req.extensions().get::<RequestId>().copied() {
        match state.connector.connect().await {
            Ok(store) => state.contexts.set(id, STORE_HANDLE_KEY, store),
            Err(e) => warn!(
                request_id = %id,
                "Could not open store session on {}: {}",
                state.connector.describe(),
                e
            ),
        }
    }

    next.run(req).await
}
