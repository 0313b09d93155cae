//! Upload permission grants.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    routing::get,
};

use crate::auth::require_shared_secret;
use crate::error::AppResult;
use crate::routes::helpers::ImageParams;
use crate::state::AppState;

/// Create the grant router. Every route requires the shared secret.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/allowFileName", get(allow_file_name))
        .route_layer(middleware::from_fn_with_state(state, require_shared_secret))
}

/// Grant a single upload of `imageName` into category `type`.
///
/// GET /allowFileName?imageName=<name>&type=<category>
///
/// Re-granting a name replaces the earlier permission and restarts its timer.
async fn allow_file_name(
    State(state): State<AppState>,
    Query(params): Query<ImageParams>,
) -> AppResult<StatusCode> {
    let key = params.into_key()?;
    state.permissions().grant(key.name(), key.category());
    Ok(StatusCode::OK)
}
