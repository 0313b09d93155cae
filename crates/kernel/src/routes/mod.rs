//! HTTP route handlers.

use axum::Router;
use axum::extract::DefaultBodyLimit;

use crate::state::AppState;

pub mod delete;
pub mod front;
pub mod health;
pub mod helpers;
pub mod permission;
pub mod static_files;
pub mod upload;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the full application router (must be the one `main` serves).
pub fn router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes().saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .merge(front::router())
        .merge(health::router())
        .merge(permission::router(state.clone()))
        .merge(upload::router())
        .merge(delete::router(state.clone()))
        .merge(static_files::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
