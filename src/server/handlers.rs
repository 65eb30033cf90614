use super::AppState;
use crate::audio::insert_start_directive;
use crate::context::{RequestId, STORE_HANDLE_KEY};
use crate::error::AudiubeError;
use crate::store::VideoStore;
use axum::{
    extract::{Extension, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path as FsPath};
use std::sync::{Arc, OnceLock};
use tracing::{error, warn};

#[derive(Debug, Serialize, Deserialize)]
pub struct StreamResponse {
    pub id: String,
    pub segment_list_file_url: String,
}

/// Error body returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<AudiubeError> for ApiError {
    fn from(err: AudiubeError) -> Self {
        let status = match err {
            AudiubeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid regex"))
}

/// Video ids are non-empty and made of URL-safe base64 characters.
pub fn is_valid_video_id(video_id: &str) -> bool {
    video_id_pattern().is_match(video_id)
}

/// GET /streams/{video_id}
pub async fn stream(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(video_id): Path<String>,
) -> Result<Json<StreamResponse>, ApiError> {
    if !is_valid_video_id(&video_id) {
        return Err(AudiubeError::InvalidInput(format!("invalid video id {:?}", video_id)).into());
    }

    let store = state
        .contexts
        .get::<Arc<dyn VideoStore>>(request_id, STORE_HANDLE_KEY);

    let resolved = state
        .orchestrator
        .resolve_playlist(&video_id, store)
        .await
        .map_err(|e| {
            error!(request_id = %request_id, "Failed to resolve playlist of {}: {}", video_id, e);
            ApiError::from(e)
        })?;

    Ok(Json(StreamResponse {
        id: resolved.video_id,
        segment_list_file_url: resolved.location,
    }))
}

/// GET /streams without an id.
pub async fn missing_id() -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "id empty")
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /static/{*path}
pub async fn static_file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let relative = FsPath::new(&path);
    if !path_is_valid(relative) {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "invalid path"));
    }

    let full_path = state.static_root.join(relative);
    let body = match tokio::fs::read(&full_path).await {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::new(StatusCode::NOT_FOUND, format!("{} not found", path)));
        }
        Err(e) => {
            warn!("Failed to read {:?}: {}", full_path, e);
            return Err(AudiubeError::Io(e).into());
        }
    };

    if is_playlist(relative) {
        let playlist = insert_start_directive(&String::from_utf8_lossy(&body));
        return Ok(([(header::CONTENT_TYPE, "application/x-mpegurl")], playlist).into_response());
    }

    Ok(([(header::CONTENT_TYPE, content_type_for(relative))], body).into_response())
}

fn path_is_valid(path: &FsPath) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn is_playlist(path: &FsPath) -> bool {
    path.extension().is_some_and(|ext| ext == "m3u8")
}

/// Content type for a static file, by extension.
pub fn content_type_for(path: &FsPath) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("m3u8") => "application/x-mpegurl",
        Some("ts") => "video/mp2t",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        _ => "text/plain; charset=utf-8",
    }
}
