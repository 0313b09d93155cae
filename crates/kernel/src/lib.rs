//! Imagegate kernel library.
//!
//! Exposes the kernel for the `imagegate` binary and integration tests.

pub mod auth;
pub mod config;
pub mod error;
pub mod permission;
pub mod routes;
pub mod state;
pub mod storage;
pub mod upload;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use permission::{GRANT_TTL, ManualClock, PermissionRegistry};
pub use state::AppState;
