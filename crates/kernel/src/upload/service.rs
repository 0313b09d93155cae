//! Conversion pipeline: decode, re-encode, write.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use super::convert::ImageConverter;
use crate::storage::{AssetKey, AssetStorage};

/// A successfully stored upload.
#[derive(Debug, Clone)]
pub struct StoredAsset {
    /// Public path, e.g. `uploads/avatars/cat.jpg`.
    pub path: String,
    /// Size of the encoded file in bytes.
    pub size: usize,
}

/// Stores and removes converted images.
#[derive(Clone)]
pub struct UploadService {
    storage: Arc<dyn AssetStorage>,
    converter: ImageConverter,
}

impl UploadService {
    /// Create a new upload service.
    pub fn new(storage: Arc<dyn AssetStorage>, converter: ImageConverter) -> Self {
        Self { storage, converter }
    }

    /// Convert `data` to the canonical format and write it under `key`.
    pub async fn store(&self, key: &AssetKey, data: Vec<u8>) -> Result<StoredAsset> {
        let encoded = self
            .converter
            .convert(data)
            .await
            .context("failed to convert image")?;

        self.storage
            .write(key, &encoded)
            .await
            .context("failed to write image to storage")?;

        let stored = StoredAsset {
            path: key.public_path(),
            size: encoded.len(),
        };
        info!(
            category = %key.category(),
            name = %key.name(),
            size = stored.size,
            "image stored"
        );
        Ok(stored)
    }

    /// Remove a stored image.
    pub async fn remove(&self, key: &AssetKey) -> Result<()> {
        self.storage
            .delete(key)
            .await
            .context("failed to remove image from storage")?;
        info!(category = %key.category(), name = %key.name(), "image removed");
        Ok(())
    }

    /// Get the storage backend.
    pub fn storage(&self) -> &Arc<dyn AssetStorage> {
        &self.storage
    }
}

impl std::fmt::Debug for UploadService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadService")
            .field("converter", &self.converter)
            .finish_non_exhaustive()
    }
}
