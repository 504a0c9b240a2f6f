//! Error types for the permissions module.

use thiserror::Error;

/// Errors that can occur during permission operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// Grant serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A stored origin tag is not one we know.
    #[error("unknown grant origin: {0}")]
    UnknownOrigin(u8),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
