//! Client-side ciphertexts and input proofs.
//!
//! A client encrypts a bounded integer under the engine's public
//! [`EncryptionContext`]: an ephemeral X25519 key agreement with the network
//! key seals the value, and a keyed Blake3 tag over the canonical input
//! binding forms the [`InputProof`]. Only the engine can open the ciphertext
//! or recompute the tag, and the tag commits to the submitter, the diary and
//! the exact ciphertext bytes.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use mood_diary_core::{input_binding_message, Identity, ResourceId};

use crate::crypto::{encode_value, random_nonce, TransportPublicKey, TransportSecret};
use crate::error::{FheError, Result};

pub(crate) const INPUT_SEAL_CONTEXT: &str = "mood-diary 2025 input ciphertext seal";
pub(crate) const INPUT_PROOF_CONTEXT: &str = "mood-diary 2025 input proof tag";

/// Declared bit width of an encrypted integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitWidth {
    U8,
    U16,
    U32,
}

impl BitWidth {
    pub fn bits(self) -> u8 {
        match self {
            BitWidth::U8 => 8,
            BitWidth::U16 => 16,
            BitWidth::U32 => 32,
        }
    }

    pub fn max_value(self) -> u64 {
        (1u64 << self.bits()) - 1
    }

    pub fn fits(self, value: u64) -> bool {
        value <= self.max_value()
    }

    /// Reduce a value modulo 2^bits, the wrap-around semantics of encrypted
    /// unsigned integers.
    pub fn wrap(self, value: u64) -> u64 {
        value & self.max_value()
    }
}

impl Default for BitWidth {
    fn default() -> Self {
        BitWidth::U32
    }
}

/// Opaque encryption of a bounded integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    /// Declared width of the encrypted integer.
    pub bit_width: BitWidth,
    /// Client's ephemeral X25519 public key.
    pub ephemeral_public: TransportPublicKey,
    /// Nonce used for sealing.
    pub nonce: [u8; 12],
    /// Sealed value (includes authentication tag).
    pub body: Bytes,
}

impl Ciphertext {
    /// Digest of every ciphertext field; what an input proof commits to.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"mood-diary-ciphertext-v1:");
        hasher.update(&[self.bit_width.bits()]);
        hasher.update(self.ephemeral_public.as_bytes());
        hasher.update(&self.nonce);
        hasher.update(&self.body);
        *hasher.finalize().as_bytes()
    }
}

/// Attestation that a fresh ciphertext is well formed and bound to one
/// submitter and one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProof {
    pub resource: ResourceId,
    pub submitter: Identity,
    pub bit_width: BitWidth,
    #[serde(with = "mood_diary_core::serde_fixed")]
    pub tag: [u8; 32],
}

/// A ciphertext and its proof, ready for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedInput {
    pub ciphertext: Ciphertext,
    pub proof: InputProof,
}

/// The public half of the engine's encryption key, handed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionContext {
    pub network_public: TransportPublicKey,
}

impl EncryptionContext {
    pub fn new(network_public: TransportPublicKey) -> Self {
        Self { network_public }
    }

    /// Encrypt `value` as a `bit_width` integer bound to `(resource, submitter)`.
    ///
    /// Performs no domain validation beyond the bit width; callers enforce
    /// application ranges before reaching this point.
    pub fn encrypt(
        &self,
        value: u64,
        bit_width: BitWidth,
        resource: &ResourceId,
        submitter: &Identity,
    ) -> Result<EncryptedInput> {
        if !bit_width.fits(value) {
            return Err(FheError::Encryption(format!(
                "value does not fit in {} bits",
                bit_width.bits()
            )));
        }

        let ephemeral = TransportSecret::generate();
        let shared = ephemeral.diffie_hellman(&self.network_public);

        let nonce = random_nonce();
        let body = shared
            .derive_key(INPUT_SEAL_CONTEXT, &[])
            .seal(&encode_value(value), &nonce)?;

        let ciphertext = Ciphertext {
            bit_width,
            ephemeral_public: ephemeral.public_key(),
            nonce,
            body: Bytes::from(body),
        };

        let binding =
            input_binding_message(resource, submitter, bit_width.bits(), &ciphertext.digest())?;
        let proof_key = shared.derive_key(INPUT_PROOF_CONTEXT, &[]);
        let tag = *blake3::keyed_hash(proof_key.as_bytes(), &binding).as_bytes();

        Ok(EncryptedInput {
            ciphertext,
            proof: InputProof {
                resource: *resource,
                submitter: *submitter,
                bit_width,
                tag,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mood_diary_core::SigningKeypair;

    #[test]
    fn test_bit_width_bounds() {
        assert_eq!(BitWidth::U8.max_value(), 255);
        assert!(BitWidth::U32.fits(u64::from(u32::MAX)));
        assert!(!BitWidth::U32.fits(u64::from(u32::MAX) + 1));
        assert_eq!(BitWidth::U8.wrap(257), 1);
    }

    #[test]
    fn test_encrypt_hides_value_and_binds_parties() {
        let network = TransportSecret::generate();
        let context = EncryptionContext::new(network.public_key());
        let submitter = SigningKeypair::from_seed(&[1u8; 32]).identity();
        let resource = ResourceId::from_bytes([9u8; 32]);

        let a = context.encrypt(3, BitWidth::U32, &resource, &submitter).unwrap();
        let b = context.encrypt(3, BitWidth::U32, &resource, &submitter).unwrap();

        // Fresh randomness per encryption.
        assert_ne!(a.ciphertext.body, b.ciphertext.body);
        assert_ne!(a.proof.tag, b.proof.tag);
        assert_eq!(a.proof.submitter, submitter);
        assert_eq!(a.proof.resource, resource);
    }

    #[test]
    fn test_encrypt_rejects_overflowing_value() {
        let context = EncryptionContext::new(TransportSecret::generate().public_key());
        let submitter = SigningKeypair::from_seed(&[1u8; 32]).identity();

        let result = context.encrypt(256, BitWidth::U8, &ResourceId::from_bytes([0u8; 32]), &submitter);
        assert!(matches!(result, Err(FheError::Encryption(_))));
    }
}
