//! Upload permissions.
//!
//! A permission ties an image name to a storage category for a short,
//! fixed window. It is granted behind the shared-secret gate and consumed
//! at most once by the upload handler.

pub mod clock;
pub mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use registry::{GRANT_TTL, Grant, PermissionRegistry};
