//! Shared-secret gate for privileged routes.
//!
//! The `Authorization` header value must equal the configured secret
//! exactly. No scheme prefix is stripped.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::error::AppError;
use crate::state::AppState;

/// Compares caller credentials against one configured secret.
#[derive(Clone)]
pub struct SharedSecretGate {
    secret: Arc<[u8]>,
}

impl SharedSecretGate {
    /// Create a gate for the given secret.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    /// Check a presented credential. `None` (header missing) never passes.
    pub fn allows(&self, presented: Option<&[u8]>) -> bool {
        match presented {
            // ct_eq on slices of different length returns false without
            // comparing contents.
            Some(value) => value.ct_eq(&self.secret[..]).into(),
            None => false,
        }
    }
}

impl std::fmt::Debug for SharedSecretGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSecretGate").finish_non_exhaustive()
    }
}

/// Middleware rejecting requests whose `Authorization` header does not
/// match the shared secret.
pub async fn require_shared_secret(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.as_bytes());

    if !state.gate().allows(presented) {
        debug!(
            path = %request.uri().path(),
            header_present = presented.is_some(),
            "shared secret rejected"
        );
        return AppError::Unauthorized.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_secret_passes() {
        let gate = SharedSecretGate::new("s3cret");
        assert!(gate.allows(Some(b"s3cret")));
    }

    #[test]
    fn missing_or_wrong_secret_fails() {
        let gate = SharedSecretGate::new("s3cret");
        assert!(!gate.allows(None));
        assert!(!gate.allows(Some(b"")));
        assert!(!gate.allows(Some(b"s3cre")));
        assert!(!gate.allows(Some(b"s3cret ")));
        assert!(!gate.allows(Some(b"Bearer s3cret")));
        assert!(!gate.allows(Some(b"S3CRET")));
    }
}
