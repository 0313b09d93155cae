#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Builds the REAL kernel router over a temporary storage root and a
//! manually driven permission clock.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use imagegate_kernel::config::DEFAULT_MAX_UPLOAD_BYTES;
use imagegate_kernel::{AppState, Config, GRANT_TTL, ManualClock, PermissionRegistry};
use imagegate_test_utils::MultipartBody;

pub const SECRET: &str = "test-shared-secret";

/// Test application wrapper using the real routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub clock: ManualClock,
    storage: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_max_upload_bytes(DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn with_max_upload_bytes(max_upload_bytes: usize) -> Self {
        let storage = tempfile::tempdir().expect("Failed to create storage dir");
        let config = Config {
            port: 0,
            shared_secret: SECRET.to_string(),
            allowed_origin: "*".to_string(),
            uploads_dir: storage.path().join("uploads"),
            max_upload_bytes,
        };

        let clock = ManualClock::new();
        let registry = PermissionRegistry::with_clock(Arc::new(clock.clone()), GRANT_TTL);
        let state = AppState::with_registry(&config, registry);
        let router = imagegate_kernel::routes::router(state.clone());

        Self {
            router,
            state,
            clock,
            storage,
        }
    }

    /// Storage root used by this app.
    pub fn uploads_dir(&self) -> PathBuf {
        self.storage.path().join("uploads")
    }

    /// Send a request through the router.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// GET with an optional `Authorization` header.
    pub async fn get(&self, uri: &str, auth: Option<&str>) -> Response {
        let mut builder = Request::get(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    /// Grant a permission through the HTTP API.
    pub async fn allow(&self, name: &str, category: &str) -> Response {
        self.get(
            &format!("/allowFileName?imageName={name}&type={category}"),
            Some(SECRET),
        )
        .await
    }

    /// Delete an image through the HTTP API.
    pub async fn delete(&self, name: &str, category: &str) -> Response {
        self.get(
            &format!("/deleteImage?imageName={name}&type={category}"),
            Some(SECRET),
        )
        .await
    }

    /// POST a multipart body to `/upload`.
    pub async fn upload(&self, name: Option<&str>, body: MultipartBody) -> Response {
        let uri = match name {
            Some(name) => format!("/upload?imageName={name}"),
            None => "/upload".to_string(),
        };
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, MultipartBody::content_type())
            .body(Body::from(body.finish()))
            .unwrap();
        self.request(request).await
    }

    /// Advance the permission clock.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Number of regular files under the storage root.
    pub fn stored_file_count(&self) -> usize {
        fn walk(dir: &std::path::Path) -> usize {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return 0;
            };
            entries
                .flatten()
                .map(|e| {
                    let path = e.path();
                    if path.is_dir() { walk(&path) } else { 1 }
                })
                .sum()
        }
        walk(&self.uploads_dir())
    }
}

/// Collect a response body as bytes.
pub async fn response_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

/// Collect a response body as text.
pub async fn response_text(response: Response) -> String {
    String::from_utf8(response_bytes(response).await).unwrap()
}

/// Collect a response body as JSON.
pub async fn response_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&response_bytes(response).await).unwrap()
}
