//! Stored image deletion.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    routing::get,
};

use crate::auth::require_shared_secret;
use crate::error::{AppError, AppResult};
use crate::routes::helpers::ImageParams;
use crate::state::AppState;

/// Create the delete router. Every route requires the shared secret.
pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/deleteImage", get(delete_image))
        .route_layer(middleware::from_fn_with_state(state, require_shared_secret))
}

/// Delete a stored image.
///
/// GET /deleteImage?imageName=<name>&type=<category>
///
/// Does not touch upload permissions.
async fn delete_image(
    State(state): State<AppState>,
    Query(params): Query<ImageParams>,
) -> AppResult<StatusCode> {
    let key = params.into_key()?;
    state
        .uploads()
        .remove(&key)
        .await
        .map_err(AppError::Removal)?;
    Ok(StatusCode::OK)
}
