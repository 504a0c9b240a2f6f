//! Error types for the core primitives.

use thiserror::Error;

/// Errors raised by core primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A plaintext score fell outside the accepted domain.
    #[error("score {value} is out of range (expected {min}..={max})")]
    OutOfRange { value: u32, min: u32, max: u32 },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
