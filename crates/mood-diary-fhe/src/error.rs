//! Error types for the encryption engine.

use mood_diary_core::{CiphertextHandle, CoreError};
use thiserror::Error;

/// Errors raised by the homomorphic encryption capability.
#[derive(Debug, Error)]
pub enum FheError {
    /// An input proof did not verify or is bound to another submitter/resource.
    #[error("input proof invalid: {0}")]
    ProofInvalid(String),

    /// The engine holds no ciphertext under this handle.
    #[error("unknown ciphertext handle: {0:?}")]
    UnknownHandle(CiphertextHandle),

    /// A decryption request was refused (signature, window, resource or ACL).
    #[error("decryption not authorized: {0}")]
    Unauthorized(String),

    /// Operands or requests belong to different resources.
    #[error("resource mismatch: {0}")]
    ResourceMismatch(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("decryption error: {0}")]
    Decryption(String),

    #[error("homomorphic division by zero")]
    DivisionByZero,

    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, FheError>;
