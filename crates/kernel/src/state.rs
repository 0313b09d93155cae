//! Application state shared across all handlers.

use std::sync::Arc;

use crate::auth::SharedSecretGate;
use crate::config::Config;
use crate::permission::PermissionRegistry;
use crate::storage::LocalAssetStorage;
use crate::upload::{ImageConverter, UploadService};

/// Shared application state.
///
/// Wrapped in Arc internally so Clone is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Gate for grant and delete routes.
    gate: SharedSecretGate,

    /// Live upload permissions.
    permissions: PermissionRegistry,

    /// Conversion pipeline and storage.
    uploads: UploadService,

    /// Multipart file ceiling in bytes.
    max_upload_bytes: usize,
}

impl AppState {
    /// Build state from configuration with a system-clock registry.
    pub fn new(config: &Config) -> Self {
        Self::with_registry(config, PermissionRegistry::new())
    }

    /// Build state around an existing registry.
    pub fn with_registry(config: &Config, permissions: PermissionRegistry) -> Self {
        let storage = Arc::new(LocalAssetStorage::new(&config.uploads_dir));
        let uploads = UploadService::new(storage, ImageConverter::new());

        Self {
            inner: Arc::new(AppStateInner {
                gate: SharedSecretGate::new(&config.shared_secret),
                permissions,
                uploads,
                max_upload_bytes: config.max_upload_bytes,
            }),
        }
    }

    pub fn gate(&self) -> &SharedSecretGate {
        &self.inner.gate
    }

    pub fn permissions(&self) -> &PermissionRegistry {
        &self.inner.permissions
    }

    pub fn uploads(&self) -> &UploadService {
        &self.inner.uploads
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.inner.max_upload_bytes
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("permissions", &self.inner.permissions)
            .field("uploads", &self.inner.uploads)
            .field("max_upload_bytes", &self.inner.max_upload_bytes)
            .finish_non_exhaustive()
    }
}
