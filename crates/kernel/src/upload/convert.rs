//! Re-encoding of uploads into the canonical JPEG format.

use std::io::Cursor;
use std::sync::Arc;

use image::DynamicImage;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

/// Maximum concurrent conversions.
/// Decoding is CPU heavy; the rest of the service keeps running while
/// uploads queue here.
const MAX_CONCURRENT_CONVERSIONS: usize = 4;

/// JPEG quality of stored assets.
const JPEG_QUALITY: u8 = 80;

/// Conversion failures.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to decode image")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode image")]
    Encode(#[source] image::ImageError),

    #[error("conversion task failed")]
    Task(#[from] tokio::task::JoinError),

    #[error("conversion pool closed")]
    Closed,
}

/// Converts uploads to JPEG off the async executor.
#[derive(Clone)]
pub struct ImageConverter {
    permits: Arc<Semaphore>,
}

impl ImageConverter {
    /// Create a converter with the default concurrency bound.
    pub fn new() -> Self {
        Self::with_concurrency(MAX_CONCURRENT_CONVERSIONS)
    }

    /// Create a converter that runs at most `limit` conversions at once.
    pub fn with_concurrency(limit: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    /// Decode `data` and re-encode it as JPEG on the blocking pool.
    pub async fn convert(&self, data: Vec<u8>) -> Result<Vec<u8>, ConvertError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ConvertError::Closed)?;

        tokio::task::spawn_blocking(move || encode_canonical(&data)).await?
    }
}

impl Default for ImageConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ImageConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageConverter")
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

/// Decode any supported image and encode it as JPEG.
///
/// JPEG has no alpha channel, so the decoded image is flattened to RGB8
/// before encoding.
pub fn encode_canonical(data: &[u8]) -> Result<Vec<u8>, ConvertError> {
    let img = image::load_from_memory(data).map_err(ConvertError::Decode)?;
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
    rgb.write_with_encoder(encoder).map_err(ConvertError::Encode)?;

    let out = buf.into_inner();
    debug!(
        width = rgb.width(),
        height = rgb.height(),
        input = data.len(),
        output = out.len(),
        "image converted"
    );
    Ok(out)
}
