//! Error types for diary operations.

use mood_diary_core::ResourceId;
use mood_diary_fhe::FheError;
use mood_diary_store::StoreError;
use thiserror::Error;

/// Errors that can occur during diary operations.
#[derive(Debug, Error)]
pub enum DiaryError {
    /// The submitted input's proof did not verify or is bound elsewhere.
    #[error("input proof invalid: {0}")]
    ProofInvalid(String),

    /// The diary has not been initialized.
    #[error("diary unavailable: {0:?}")]
    ResourceUnavailable(ResourceId),

    /// Engine error.
    #[error("engine error: {0}")]
    Engine(#[from] FheError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Configuration could not be loaded.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

impl DiaryError {
    /// Lift engine errors, keeping proof failures distinct.
    pub(crate) fn from_engine(err: FheError) -> Self {
        match err {
            FheError::ProofInvalid(reason) => DiaryError::ProofInvalid(reason),
            other => DiaryError::Engine(other),
        }
    }
}

/// Result type for diary operations.
pub type Result<T> = std::result::Result<T, DiaryError>;
