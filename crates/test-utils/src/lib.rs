//! Imagegate test utilities.
//!
//! Fixture images and a small `multipart/form-data` builder for driving
//! the upload route without a real HTTP client.

use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, Rgba};

/// Boundary used by [`MultipartBody`].
pub const BOUNDARY: &str = "----imagegate-test-boundary";

/// A small RGBA PNG with a gradient, so the re-encoded JPEG differs.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// A small JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, 64, (y % 256) as u8])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

/// A small GIF.
pub fn gif_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgba([200u8, 10, 10, 255]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Gif)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    if let Err(e) = img.write_to(&mut buf, format) {
        panic!("failed to encode {format:?} fixture: {e}");
    }
    buf.into_inner()
}

/// Builder for a `multipart/form-data` request body.
#[derive(Debug, Default, Clone)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file part.
    pub fn file(mut self, field: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Add a plain text part.
    pub fn text(mut self, field: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    /// Close the body.
    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}
