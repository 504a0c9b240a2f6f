//! The homomorphic engine capability.
//!
//! The diary never touches plaintext. Every arithmetic step and every
//! decryption goes through an [`FheEngine`], which owns the key material and
//! the ciphertexts addressed by [`CiphertextHandle`]s.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use mood_diary_core::{authorization_message, CiphertextHandle, Identity, ResourceId, Signature};

use crate::ciphertext::{EncryptedInput, EncryptionContext};
use crate::crypto::TransportPublicKey;
use crate::error::Result;
use crate::sealed::SealedValue;

/// The public fields of a decryption authorization, plus the handle to open.
///
/// Only these fields ever leave the client; the transport secret stays with
/// the artifact that produced the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDecryptRequest {
    /// Ciphertext to decrypt.
    pub handle: CiphertextHandle,
    /// Diary the handle belongs to.
    pub resource: ResourceId,
    /// Identity that signed the authorization.
    pub grantee: Identity,
    /// Every resource the authorization covers, sorted and deduplicated.
    pub resources: Vec<ResourceId>,
    /// Key the result is sealed to.
    pub transport_public: TransportPublicKey,
    /// Validity start, unix seconds.
    pub start_secs: u64,
    /// Validity duration in days.
    pub duration_days: u32,
    /// Grantee's signature over [`UserDecryptRequest::signed_message`].
    pub signature: Signature,
}

impl UserDecryptRequest {
    /// The canonical message the grantee's signature must cover.
    pub fn signed_message(&self) -> Result<Vec<u8>> {
        Ok(authorization_message(
            &self.grantee,
            &self.resources,
            self.start_secs,
            self.duration_days,
            self.transport_public.as_bytes(),
        )?)
    }

    /// First second after the validity window.
    pub fn expires_at(&self) -> u64 {
        self.start_secs
            .saturating_add(u64::from(self.duration_days).saturating_mul(86_400))
    }
}

/// Black-box homomorphic encryption capability.
///
/// # Contract
///
/// - `verify_input` admits a fresh ciphertext only if its proof verifies and
///   is bound to the given `(resource, submitter)`.
/// - `add` and `div_scalar` produce new handles; existing handles are never
///   mutated.
/// - `user_decrypt` re-encrypts to the request's transport key only when the
///   signature, validity window, resource scope and ACL all check out.
#[async_trait]
pub trait FheEngine: Send + Sync {
    /// Public context clients encrypt under.
    fn encryption_context(&self) -> EncryptionContext;

    /// Admit a client input, returning the handle of its ciphertext.
    async fn verify_input(
        &self,
        input: &EncryptedInput,
        resource: &ResourceId,
        submitter: &Identity,
    ) -> Result<CiphertextHandle>;

    /// Homomorphic addition, wrapping modulo 2^bits.
    async fn add(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> Result<CiphertextHandle>;

    /// Homomorphic truncating division by a public scalar.
    async fn div_scalar(&self, value: &CiphertextHandle, divisor: u64) -> Result<CiphertextHandle>;

    /// Allow `identity` to user-decrypt `handle`.
    async fn allow(&self, handle: &CiphertextHandle, identity: &Identity) -> Result<()>;

    /// Whether `identity` may user-decrypt `handle`.
    async fn is_allowed(&self, handle: &CiphertextHandle, identity: &Identity) -> Result<bool>;

    /// Decrypt a handle for an authorized user, sealed to their transport key.
    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<SealedValue>;
}

#[async_trait]
impl<E: FheEngine + ?Sized> FheEngine for Arc<E> {
    fn encryption_context(&self) -> EncryptionContext {
        (**self).encryption_context()
    }

    async fn verify_input(
        &self,
        input: &EncryptedInput,
        resource: &ResourceId,
        submitter: &Identity,
    ) -> Result<CiphertextHandle> {
        (**self).verify_input(input, resource, submitter).await
    }

    async fn add(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> Result<CiphertextHandle> {
        (**self).add(lhs, rhs).await
    }

    async fn div_scalar(&self, value: &CiphertextHandle, divisor: u64) -> Result<CiphertextHandle> {
        (**self).div_scalar(value, divisor).await
    }

    async fn allow(&self, handle: &CiphertextHandle, identity: &Identity) -> Result<()> {
        (**self).allow(handle, identity).await
    }

    async fn is_allowed(&self, handle: &CiphertextHandle, identity: &Identity) -> Result<bool> {
        (**self).is_allowed(handle, identity).await
    }

    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<SealedValue> {
        (**self).user_decrypt(request).await
    }
}
