//! HTTP request handlers.

pub mod health;
pub mod rescan;
pub mod status;

pub use health::*;
pub use rescan::*;
pub use status::*;

use crate::error::ApiError;
use axum::http::Uri;

/// Fallback for unknown routes.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}
