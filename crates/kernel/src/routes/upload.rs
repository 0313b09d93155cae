//! Gated image upload.

use axum::{
    Json, Router,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::routes::helpers::require;
use crate::state::AppState;
use crate::storage::AssetKey;
use crate::upload::validate_upload;

/// Multipart field holding the image.
const IMAGE_FIELD: &str = "image";

/// Create the upload router.
pub fn router() -> Router<AppState> {
    Router::new().route("/upload", post(upload_image))
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    #[serde(rename = "imageName")]
    image_name: Option<String>,
}

/// Upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub file: String,
}

/// The file part of an upload.
struct ImagePart {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// Upload an image under a previously granted name.
///
/// POST /upload?imageName=<name>
/// Content-Type: multipart/form-data
///
/// Form fields:
/// - image: The file to upload
///
/// The permission is consumed only after the file part has been read and
/// its type accepted, so a rejected type leaves the grant usable. Once
/// consumed it stays consumed; a conversion or write failure needs a fresh
/// grant.
async fn upload_image(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let name = require(params.image_name, "imageName")?;

    // Cheap early reject; try_consume below is the real check.
    if !state.permissions().is_live(&name) {
        debug!(name = %name, "upload without live permission");
        return Err(no_permission());
    }

    let part = read_image_part(&mut multipart, state.max_upload_bytes()).await?;

    validate_upload(&part.filename, part.content_type.as_deref()).map_err(|e| {
        debug!(name = %name, filename = %part.filename, error = %e, "upload type rejected");
        AppError::bad_request(e.to_string())
    })?;

    let Some(category) = state.permissions().try_consume(&name) else {
        debug!(name = %name, "permission gone before consume");
        return Err(no_permission());
    };

    // Grants are validated as path segments, so this only fails if the
    // registry was fed directly.
    let key = AssetKey::new(&category, &name)
        .map_err(|e| AppError::bad_request(format!("Error: {e}")))?;

    let stored = state
        .uploads()
        .store(&key, part.data)
        .await
        .map_err(AppError::Processing)?;

    Ok(Json(UploadResponse {
        message: "File uploaded and converted successfully!",
        file: stored.path,
    }))
}

/// Read the first `image` file part, enforcing the size ceiling.
async fn read_image_part(multipart: &mut Multipart, max_bytes: usize) -> AppResult<ImagePart> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(AppError::bad_request("Error: No File Selected!")),
            Err(e) => return Err(multipart_error(e)),
        };

        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        // Browsers send `filename=""` when the form's file input is empty.
        let Some(filename) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            return Err(AppError::bad_request("Error: No File Selected!"));
        };
        let content_type = field.content_type().map(str::to_string);

        let data = field.bytes().await.map_err(multipart_error)?;
        if data.len() > max_bytes {
            return Err(too_large(max_bytes));
        }

        return Ok(ImagePart {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::bad_request("Error: File too large")
    } else {
        warn!(error = %e, "failed to read multipart body");
        AppError::bad_request("Error: Failed to read file data")
    }
}

fn too_large(max_bytes: usize) -> AppError {
    AppError::bad_request(format!("Error: File too large (max {max_bytes} bytes)"))
}

fn no_permission() -> AppError {
    AppError::bad_request("Error: No permission to upload this file")
}
