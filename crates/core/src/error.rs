//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("not a tag pointer: {0}")]
    InvalidTagPointer(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
