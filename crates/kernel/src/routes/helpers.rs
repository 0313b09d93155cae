//! Shared helpers for route handlers.

use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::storage::AssetKey;

/// Query string carrying an image name and its category.
#[derive(Debug, Default, Deserialize)]
pub struct ImageParams {
    #[serde(rename = "imageName")]
    pub image_name: Option<String>,
    #[serde(rename = "type")]
    pub category: Option<String>,
}

impl ImageParams {
    /// Both parameters, present and non-empty, as a storage key.
    pub fn into_key(self) -> AppResult<AssetKey> {
        let name = require(self.image_name, "imageName")?;
        let category = require(self.category, "type")?;
        AssetKey::new(&category, &name).map_err(|e| AppError::bad_request(format!("Error: {e}")))
    }
}

/// A present, non-empty query parameter.
pub fn require(value: Option<String>, field: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::bad_request(format!("Error: {field} is required"))),
    }
}
