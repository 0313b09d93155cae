//! Static serving of stored images.

use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::error::AppError;
use crate::state::AppState;
use crate::storage::PUBLIC_PREFIX;

/// Create the static files router.
pub fn router() -> Router<AppState> {
    Router::new().route(&format!("/{PUBLIC_PREFIX}/{{*path}}"), get(serve_upload))
}

/// Serve a stored file.
async fn serve_upload(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    let path = path.trim_start_matches('/');

    match state.uploads().storage().read(path).await {
        Ok(Some(content)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, mime_from_path(path)),
                // Re-uploads overwrite the same path.
                (header::CACHE_CONTROL, "no-cache"),
            ],
            content,
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => AppError::Internal(e).into_response(),
    }
}

fn mime_from_path(path: &str) -> &'static str {
    match std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}
