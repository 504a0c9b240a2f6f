//! The signing seam.
//!
//! Key custody belongs to the caller. The protocol hands a canonical message
//! to a [`MessageSigner`] (a wallet, a hardware key, a prompt) and gets back
//! one of three outcomes.

use async_trait::async_trait;
use std::sync::Arc;

use mood_diary_core::{Identity, Signature, SigningKeypair};

/// What came back from a signing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningOutcome {
    Signed(Signature),
    /// The user refused.
    Declined,
    /// The signer broke; the reason is for diagnostics only.
    Failed(String),
}

/// Something that signs messages on behalf of one identity.
#[async_trait]
pub trait MessageSigner: Send + Sync {
    /// The identity whose key this signer uses.
    fn identity(&self) -> Identity;

    /// Sign `message`. May suspend while a user decides.
    async fn sign_message(&self, message: &[u8]) -> SigningOutcome;
}

#[async_trait]
impl<S: MessageSigner + ?Sized> MessageSigner for Arc<S> {
    fn identity(&self) -> Identity {
        (**self).identity()
    }

    async fn sign_message(&self, message: &[u8]) -> SigningOutcome {
        (**self).sign_message(message).await
    }
}

/// Signs unconditionally with an in-process keypair.
#[derive(Debug, Clone)]
pub struct KeypairSigner {
    keypair: SigningKeypair,
}

impl KeypairSigner {
    pub fn new(keypair: SigningKeypair) -> Self {
        Self { keypair }
    }
}

#[async_trait]
impl MessageSigner for KeypairSigner {
    fn identity(&self) -> Identity {
        self.keypair.identity()
    }

    async fn sign_message(&self, message: &[u8]) -> SigningOutcome {
        SigningOutcome::Signed(self.keypair.sign(message))
    }
}
