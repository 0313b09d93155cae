//! Upload validation, conversion and storage.

pub mod convert;
pub mod service;
pub mod validate;

pub use convert::{ConvertError, ImageConverter};
pub use service::{StoredAsset, UploadService};
pub use validate::{RejectedUpload, validate_upload};
