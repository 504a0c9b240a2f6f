//! Values re-encrypted to a recipient's transport key.
//!
//! When an authorized user decrypts a handle, the engine never returns the
//! plaintext in the clear. It seals it to the X25519 transport key named in
//! the user's authorization, so only the holder of the matching secret can
//! open it. The handle is mixed into the key derivation: a sealed value
//! cannot be replayed as the answer for a different handle.

use serde::{Deserialize, Serialize};

use mood_diary_core::CiphertextHandle;

use crate::crypto::{
    decode_value, encode_value, random_nonce, TransportPublicKey, TransportSecret,
};
use crate::error::Result;

const SEALED_VALUE_CONTEXT: &str = "mood-diary 2025 sealed value";

/// An integer sealed to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedValue {
    /// The handle this value is the decryption of.
    pub handle: CiphertextHandle,
    /// Sender's ephemeral public key.
    pub ephemeral_public: TransportPublicKey,
    pub nonce: [u8; 12],
    /// Sealed value bytes (includes authentication tag).
    pub body: Vec<u8>,
}

impl SealedValue {
    /// Seal `value` for `recipient`.
    pub fn seal(
        value: u64,
        handle: CiphertextHandle,
        recipient: &TransportPublicKey,
    ) -> Result<Self> {
        let ephemeral = TransportSecret::generate();
        let wrap_key = ephemeral
            .diffie_hellman(recipient)
            .derive_key(SEALED_VALUE_CONTEXT, handle.as_bytes());

        let nonce = random_nonce();
        let body = wrap_key.seal(&encode_value(value), &nonce)?;

        Ok(Self {
            handle,
            ephemeral_public: ephemeral.public_key(),
            nonce,
            body,
        })
    }

    /// Open with the recipient's secret.
    pub fn open(&self, recipient: &TransportSecret) -> Result<u64> {
        let wrap_key = recipient
            .diffie_hellman(&self.ephemeral_public)
            .derive_key(SEALED_VALUE_CONTEXT, self.handle.as_bytes());

        decode_value(&wrap_key.open(&self.body, &self.nonce)?)
    }
}
