//! Upload type checks.
//!
//! Both the filename extension and the declared content type come from the
//! client and are only compared against allow-lists. Nothing here looks at
//! the bytes; a mislabeled file is caught later when decoding fails.

use std::path::Path;

use thiserror::Error;

/// Image kinds accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageKind {
    Jpeg,
    Png,
    Heic,
}

impl ImageKind {
    /// Kind for a lowercase filename extension.
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "jpg" | "jpeg" => Some(ImageKind::Jpeg),
            "png" => Some(ImageKind::Png),
            "heic" => Some(ImageKind::Heic),
            _ => None,
        }
    }

    /// Kind for a declared content type. Parameters such as `; charset=` are ignored.
    fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Some(ImageKind::Jpeg),
            "image/png" => Some(ImageKind::Png),
            "image/heic" => Some(ImageKind::Heic),
            _ => None,
        }
    }
}

/// Reason an upload was refused before processing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RejectedUpload {
    #[error("Error: Images Only! (extension {0:?} not allowed)")]
    Extension(String),

    #[error("Error: Images Only! (content type {0:?} not allowed)")]
    ContentType(String),
}

/// Accept an upload only if both its extension and its content type are
/// in the allow-set. The two need not name the same kind.
pub fn validate_upload(
    filename: &str,
    content_type: Option<&str>,
) -> Result<(), RejectedUpload> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    ImageKind::from_extension(&ext).ok_or(RejectedUpload::Extension(ext))?;

    let content_type = content_type.unwrap_or_default();
    ImageKind::from_content_type(content_type)
        .ok_or_else(|| RejectedUpload::ContentType(content_type.to_string()))?;

    Ok(())
}
