//! In-process reference engine.
//!
//! [`MockEngine`] honours the [`FheEngine`] contract without real
//! homomorphic encryption: every stored value is sealed to the engine's
//! network key and only opened inside the engine to evaluate an operation or
//! to re-seal it for an authorized user. Nothing outside this module ever
//! sees a plaintext.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use mood_diary_core::{
    input_binding_message, CiphertextHandle, Clock, Identity, ResourceId, SystemClock,
};

use crate::ciphertext::{
    BitWidth, EncryptedInput, EncryptionContext, INPUT_PROOF_CONTEXT, INPUT_SEAL_CONTEXT,
};
use crate::crypto::{decode_value, TransportSecret};
use crate::engine::{FheEngine, UserDecryptRequest};
use crate::error::{FheError, Result};
use crate::sealed::SealedValue;

const HANDLE_CONTEXT: &str = "mood-diary 2025 ciphertext handle";

/// Operation tags mixed into handle derivation.
mod op {
    pub const INPUT: u8 = 0x01;
    pub const ADD: u8 = 0x02;
    pub const DIV: u8 = 0x03;
}

struct StoredValue {
    resource: ResourceId,
    bit_width: BitWidth,
    sealed: SealedValue,
}

#[derive(Default)]
struct EngineState {
    values: HashMap<CiphertextHandle, StoredValue>,
    acl: HashSet<(CiphertextHandle, Identity)>,
    counter: u64,
}

impl EngineState {
    fn next_handle(&mut self, resource: &ResourceId, op: u8) -> CiphertextHandle {
        self.counter += 1;
        let mut hasher = blake3::Hasher::new_derive_key(HANDLE_CONTEXT);
        hasher.update(resource.as_bytes());
        hasher.update(&self.counter.to_le_bytes());
        hasher.update(&[op]);
        CiphertextHandle::from_bytes(*hasher.finalize().as_bytes())
    }

    fn get(&self, handle: &CiphertextHandle) -> Result<&StoredValue> {
        self.values
            .get(handle)
            .ok_or(FheError::UnknownHandle(*handle))
    }
}

/// Reference implementation of [`FheEngine`].
pub struct MockEngine {
    network: TransportSecret,
    clock: Arc<dyn Clock>,
    state: RwLock<EngineState>,
}

impl MockEngine {
    /// An engine with a fresh network key, reading wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// An engine with a fresh network key and the given time source.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            network: TransportSecret::generate(),
            clock,
            state: RwLock::new(EngineState::default()),
        }
    }

    /// Number of ciphertexts held.
    pub async fn len(&self) -> usize {
        self.state.read().await.values.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn open(&self, handle: &CiphertextHandle, stored: &StoredValue) -> Result<u64> {
        if stored.sealed.handle != *handle {
            return Err(FheError::Decryption("stored value bound to another handle".into()));
        }
        stored.sealed.open(&self.network)
    }

    fn store(
        &self,
        state: &mut EngineState,
        resource: ResourceId,
        bit_width: BitWidth,
        value: u64,
        op: u8,
    ) -> Result<CiphertextHandle> {
        let handle = state.next_handle(&resource, op);
        let sealed = SealedValue::seal(value, handle, &self.network.public_key())?;
        state.values.insert(
            handle,
            StoredValue {
                resource,
                bit_width,
                sealed,
            },
        );
        Ok(handle)
    }

    fn open_input(
        &self,
        input: &EncryptedInput,
        resource: &ResourceId,
        submitter: &Identity,
    ) -> Result<u64> {
        let proof = &input.proof;
        let ciphertext = &input.ciphertext;

        if proof.resource != *resource {
            return Err(FheError::ProofInvalid("proof bound to another resource".into()));
        }
        if proof.submitter != *submitter {
            return Err(FheError::ProofInvalid("proof bound to another submitter".into()));
        }
        if proof.bit_width != ciphertext.bit_width {
            return Err(FheError::ProofInvalid("bit width does not match ciphertext".into()));
        }

        let shared = self.network.diffie_hellman(&ciphertext.ephemeral_public);

        let binding = input_binding_message(
            resource,
            submitter,
            ciphertext.bit_width.bits(),
            &ciphertext.digest(),
        )?;
        let proof_key = shared.derive_key(INPUT_PROOF_CONTEXT, &[]);
        let expected = blake3::keyed_hash(proof_key.as_bytes(), &binding);
        // blake3::Hash equality is constant-time.
        if expected != blake3::Hash::from(proof.tag) {
            return Err(FheError::ProofInvalid("tag mismatch".into()));
        }

        let value = shared
            .derive_key(INPUT_SEAL_CONTEXT, &[])
            .open(&ciphertext.body, &ciphertext.nonce)
            .and_then(|bytes| decode_value(&bytes))
            .map_err(|_| FheError::ProofInvalid("ciphertext malformed".into()))?;

        if !ciphertext.bit_width.fits(value) {
            return Err(FheError::ProofInvalid(format!(
                "value exceeds {} bits",
                ciphertext.bit_width.bits()
            )));
        }

        Ok(value)
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEngine")
            .field("network", &self.network.public_key())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FheEngine for MockEngine {
    fn encryption_context(&self) -> EncryptionContext {
        EncryptionContext::new(self.network.public_key())
    }

    async fn verify_input(
        &self,
        input: &EncryptedInput,
        resource: &ResourceId,
        submitter: &Identity,
    ) -> Result<CiphertextHandle> {
        let value = self.open_input(input, resource, submitter)?;

        let mut state = self.state.write().await;
        let handle = self.store(&mut state, *resource, input.ciphertext.bit_width, value, op::INPUT)?;
        debug!(resource = ?resource, handle = ?handle, "input admitted");
        Ok(handle)
    }

    async fn add(&self, lhs: &CiphertextHandle, rhs: &CiphertextHandle) -> Result<CiphertextHandle> {
        let mut state = self.state.write().await;

        let left = state.get(lhs)?;
        let right = state.get(rhs)?;
        if left.resource != right.resource {
            return Err(FheError::ResourceMismatch("operands belong to different resources".into()));
        }
        if left.bit_width != right.bit_width {
            return Err(FheError::ResourceMismatch("operand bit widths differ".into()));
        }

        let resource = left.resource;
        let bit_width = left.bit_width;
        let sum = bit_width.wrap(self.open(lhs, left)?.wrapping_add(self.open(rhs, right)?));

        self.store(&mut state, resource, bit_width, sum, op::ADD)
    }

    async fn div_scalar(&self, value: &CiphertextHandle, divisor: u64) -> Result<CiphertextHandle> {
        if divisor == 0 {
            return Err(FheError::DivisionByZero);
        }

        let mut state = self.state.write().await;
        let stored = state.get(value)?;
        let resource = stored.resource;
        let bit_width = stored.bit_width;
        let quotient = self.open(value, stored)? / divisor;

        self.store(&mut state, resource, bit_width, quotient, op::DIV)
    }

    async fn allow(&self, handle: &CiphertextHandle, identity: &Identity) -> Result<()> {
        let mut state = self.state.write().await;
        state.get(handle)?;
        state.acl.insert((*handle, *identity));
        Ok(())
    }

    async fn is_allowed(&self, handle: &CiphertextHandle, identity: &Identity) -> Result<bool> {
        Ok(self.state.read().await.acl.contains(&(*handle, *identity)))
    }

    async fn user_decrypt(&self, request: &UserDecryptRequest) -> Result<SealedValue> {
        if !request.resources.contains(&request.resource) {
            return Err(FheError::Unauthorized("resource not covered by authorization".into()));
        }

        let now = self.clock.now_secs();
        if now < request.start_secs || now >= request.expires_at() {
            return Err(FheError::Unauthorized("outside validity window".into()));
        }

        let message = request.signed_message()?;
        request
            .grantee
            .verify(&message, &request.signature)
            .map_err(|_| FheError::Unauthorized("signature does not verify".into()))?;

        let state = self.state.read().await;
        let stored = state.get(&request.handle)?;
        if stored.resource != request.resource {
            return Err(FheError::ResourceMismatch("handle belongs to another resource".into()));
        }
        if !state.acl.contains(&(request.handle, request.grantee)) {
            return Err(FheError::Unauthorized("grantee not allowed for handle".into()));
        }

        let value = self.open(&request.handle, stored)?;
        debug!(handle = ?request.handle, grantee = ?request.grantee, "user decrypt served");
        SealedValue::seal(value, request.handle, &request.transport_public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mood_diary_core::{ManualClock, SigningKeypair};

    const NOW: u64 = 1_700_000_000;

    struct Setup {
        engine: MockEngine,
        clock: Arc<ManualClock>,
        alice: SigningKeypair,
        resource: ResourceId,
    }

    fn setup() -> Setup {
        let clock = Arc::new(ManualClock::new(NOW));
        let alice = SigningKeypair::from_seed(&[1u8; 32]);
        let resource = ResourceId::derive(&alice.identity(), "diary");
        Setup {
            engine: MockEngine::with_clock(clock.clone()),
            clock,
            alice,
            resource,
        }
    }

    async fn admit(setup: &Setup, value: u64) -> CiphertextHandle {
        let submitter = setup.alice.identity();
        let input = setup
            .engine
            .encryption_context()
            .encrypt(value, BitWidth::U32, &setup.resource, &submitter)
            .unwrap();
        setup
            .engine
            .verify_input(&input, &setup.resource, &submitter)
            .await
            .unwrap()
    }

    fn request(
        keypair: &SigningKeypair,
        handle: CiphertextHandle,
        resource: ResourceId,
        transport: &TransportSecret,
    ) -> UserDecryptRequest {
        let mut request = UserDecryptRequest {
            handle,
            resource,
            grantee: keypair.identity(),
            resources: vec![resource],
            transport_public: transport.public_key(),
            start_secs: NOW,
            duration_days: 1,
            signature: mood_diary_core::Signature::from_bytes([0u8; 64]),
        };
        request.signature = keypair.sign(&request.signed_message().unwrap());
        request
    }

    async fn decrypt_as(setup: &Setup, keypair: &SigningKeypair, handle: CiphertextHandle) -> Result<u64> {
        let transport = TransportSecret::generate();
        let sealed = setup
            .engine
            .user_decrypt(&request(keypair, handle, setup.resource, &transport))
            .await?;
        sealed.open(&transport)
    }

    #[tokio::test]
    async fn test_add_then_divide_truncates() {
        let s = setup();
        let a = admit(&s, 5).await;
        let b = admit(&s, 2).await;

        let total = s.engine.add(&a, &b).await.unwrap();
        let mean = s.engine.div_scalar(&total, 2).await.unwrap();
        s.engine.allow(&mean, &s.alice.identity()).await.unwrap();

        assert_eq!(decrypt_as(&s, &s.alice, mean).await.unwrap(), 3);
        assert_eq!(s.engine.len().await, 4);
    }

    #[tokio::test]
    async fn test_add_wraps_at_bit_width() {
        let s = setup();
        let a = admit(&s, u64::from(u32::MAX)).await;
        let b = admit(&s, 2).await;

        let sum = s.engine.add(&a, &b).await.unwrap();
        s.engine.allow(&sum, &s.alice.identity()).await.unwrap();

        assert_eq!(decrypt_as(&s, &s.alice, sum).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_divide_by_zero_rejected() {
        let s = setup();
        let a = admit(&s, 5).await;

        assert!(matches!(
            s.engine.div_scalar(&a, 0).await,
            Err(FheError::DivisionByZero)
        ));
    }

    #[tokio::test]
    async fn test_input_bound_to_other_submitter_rejected() {
        let s = setup();
        let mallory = SigningKeypair::from_seed(&[9u8; 32]).identity();
        let input = s
            .engine
            .encryption_context()
            .encrypt(3, BitWidth::U32, &s.resource, &s.alice.identity())
            .unwrap();

        let result = s.engine.verify_input(&input, &s.resource, &mallory).await;
        assert!(matches!(result, Err(FheError::ProofInvalid(_))));
    }

    #[tokio::test]
    async fn test_forged_proof_fields_rejected() {
        let s = setup();
        let mallory = SigningKeypair::from_seed(&[9u8; 32]).identity();
        let mut input = s
            .engine
            .encryption_context()
            .encrypt(3, BitWidth::U32, &s.resource, &s.alice.identity())
            .unwrap();

        // Rewriting the claimed submitter does not move the tag.
        input.proof.submitter = mallory;
        let result = s.engine.verify_input(&input, &s.resource, &mallory).await;
        assert!(matches!(result, Err(FheError::ProofInvalid(_))));
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_rejected() {
        let s = setup();
        let submitter = s.alice.identity();
        let mut input = s
            .engine
            .encryption_context()
            .encrypt(3, BitWidth::U32, &s.resource, &submitter)
            .unwrap();

        let mut body = input.ciphertext.body.to_vec();
        body[0] ^= 0xff;
        input.ciphertext.body = body.into();

        let result = s.engine.verify_input(&input, &s.resource, &submitter).await;
        assert!(matches!(result, Err(FheError::ProofInvalid(_))));
    }

    #[tokio::test]
    async fn test_user_decrypt_requires_acl() {
        let s = setup();
        let bob = SigningKeypair::from_seed(&[2u8; 32]);
        let handle = admit(&s, 4).await;

        let result = decrypt_as(&s, &bob, handle).await;
        assert!(matches!(result, Err(FheError::Unauthorized(_))));

        s.engine.allow(&handle, &bob.identity()).await.unwrap();
        assert!(s.engine.is_allowed(&handle, &bob.identity()).await.unwrap());
        assert_eq!(decrypt_as(&s, &bob, handle).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_user_decrypt_checks_window() {
        let s = setup();
        let handle = admit(&s, 4).await;
        s.engine.allow(&handle, &s.alice.identity()).await.unwrap();

        s.clock.set(NOW - 1);
        assert!(matches!(
            decrypt_as(&s, &s.alice, handle).await,
            Err(FheError::Unauthorized(_))
        ));

        s.clock.set(NOW + 86_400);
        assert!(matches!(
            decrypt_as(&s, &s.alice, handle).await,
            Err(FheError::Unauthorized(_))
        ));

        s.clock.set(NOW + 86_399);
        assert_eq!(decrypt_as(&s, &s.alice, handle).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_user_decrypt_rejects_bad_signature_and_scope() {
        let s = setup();
        let handle = admit(&s, 4).await;
        s.engine.allow(&handle, &s.alice.identity()).await.unwrap();
        let transport = TransportSecret::generate();

        let mut widened = request(&s.alice, handle, s.resource, &transport);
        widened.duration_days = 30;
        assert!(matches!(
            s.engine.user_decrypt(&widened).await,
            Err(FheError::Unauthorized(_))
        ));

        let other = ResourceId::from_bytes([7u8; 32]);
        let mut unscoped = request(&s.alice, handle, other, &transport);
        unscoped.resource = s.resource;
        assert!(matches!(
            s.engine.user_decrypt(&unscoped).await,
            Err(FheError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_handle() {
        let s = setup();
        let missing = CiphertextHandle::from_bytes([3u8; 32]);

        assert!(matches!(
            s.engine.allow(&missing, &s.alice.identity()).await,
            Err(FheError::UnknownHandle(_))
        ));
        assert!(matches!(
            s.engine.div_scalar(&missing, 2).await,
            Err(FheError::UnknownHandle(_))
        ));
    }
}
