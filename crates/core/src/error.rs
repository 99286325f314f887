//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid slug: {0}")]
    InvalidSlug(String),

    #[error("message cannot be empty")]
    EmptyMessage,

    #[error("{field} too long: {len} chars (max {max})")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("max_views must be between 1 and {max}, got {value}")]
    InvalidMaxViews { value: i64, max: i64 },

    #[error("a wish needs an expiry time or a view limit")]
    MissingExpiry,
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
