//! Error types for client operations.

use mood_diary_core::CoreError;
use mood_diary_fhe::FheError;
use thiserror::Error;

/// Errors raised on the client side.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A score outside the accepted range.
    #[error("value {value} out of range [{min}, {max}]")]
    OutOfRange { value: u32, min: u32, max: u32 },

    /// The user declined to sign a decryption authorization.
    #[error("authorization declined by user")]
    AuthorizationDeclined,

    /// The signer failed for a reason other than a user decline.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// The artifact does not authorize this decryption, or the engine refused it.
    #[error("decryption unauthorized: {0}")]
    DecryptionUnauthorized(String),

    /// The handle is the empty sentinel; there is nothing to decrypt.
    #[error("handle is empty")]
    HandleEmpty,

    /// A request the protocol refuses to build.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("engine error: {0}")]
    Engine(#[from] FheError),

    /// Artifact storage failed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("core error: {0}")]
    Core(CoreError),
}

impl From<CoreError> for ClientError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::OutOfRange { value, min, max } => ClientError::OutOfRange { value, min, max },
            other => ClientError::Core(other),
        }
    }
}

impl ClientError {
    /// Whether the user chose to stop, as opposed to something breaking.
    pub fn is_user_cancellation(&self) -> bool {
        matches!(self, ClientError::AuthorizationDeclined)
    }

    /// Whether retrying the same call may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ClientError::AuthorizationDeclined
                | ClientError::SigningFailed(_)
                | ClientError::DecryptionUnauthorized(_)
                | ClientError::Storage(_)
        )
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_is_lifted() {
        let err = ClientError::from(CoreError::OutOfRange { value: 6, min: 1, max: 5 });
        assert!(matches!(err, ClientError::OutOfRange { value: 6, .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_decline_is_cancellation() {
        assert!(ClientError::AuthorizationDeclined.is_user_cancellation());
        assert!(!ClientError::SigningFailed("offline".into()).is_user_cancellation());
        assert!(ClientError::SigningFailed("offline".into()).is_recoverable());
    }
}
