//! Configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

/// Default multipart file ceiling in bytes.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 3_000_000;

/// Application configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port (default: 3000).
    pub port: u16,

    /// Secret compared against the `Authorization` header on privileged routes.
    pub shared_secret: String,

    /// Origin allowed for browser callers (default: "*").
    pub allowed_origin: String,

    /// Storage root for converted images (default: ./uploads).
    pub uploads_dir: PathBuf,

    /// Maximum accepted size of the uploaded file part (default: 3000000).
    pub max_upload_bytes: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("PORT must be a valid u16")?;

        let shared_secret =
            env::var("SHARED_SECRET").context("SHARED_SECRET environment variable is required")?;
        if shared_secret.is_empty() {
            bail!("SHARED_SECRET must not be empty");
        }

        let allowed_origin = env::var("ALLOWED_ORIGIN")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|_| "*".to_string());

        let uploads_dir = env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(v) => v
                .parse()
                .context("MAX_UPLOAD_BYTES must be a valid usize")?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            port,
            shared_secret,
            allowed_origin,
            uploads_dir,
            max_upload_bytes,
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("shared_secret", &"<redacted>")
            .field("allowed_origin", &self.allowed_origin)
            .field("uploads_dir", &self.uploads_dir)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_secret() {
        let config = Config {
            port: 3000,
            shared_secret: "hunter2".to_string(),
            allowed_origin: "*".to_string(),
            uploads_dir: PathBuf::from("./uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
