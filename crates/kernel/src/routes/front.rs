//! Front page.

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create the front page router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(greeting))
}

async fn greeting() -> &'static str {
    "Hello! Use /upload to upload an image."
}
