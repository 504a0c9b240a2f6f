//! Resolving handles to plaintext.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use mood_diary_core::{CiphertextHandle, Clock, Identity, ResourceId, SystemClock};
use mood_diary_fhe::{FheEngine, FheError};

use crate::authorization::DecryptionAuthorization;
use crate::error::{ClientError, Result};

/// A value the engine already released to one grantee.
#[derive(Debug, Clone, Copy)]
struct ClearValue {
    handle: CiphertextHandle,
    value: u32,
}

/// Decrypts handles through an engine with a caller's authorization.
///
/// The last value released per `(resource, grantee)` is remembered. A hit
/// requires the same grantee the engine answered, so one grantee's plaintext
/// is never served to another. A newer handle for the same pair replaces the
/// older entry.
pub struct Decryptor<E> {
    engine: E,
    clock: Arc<dyn Clock>,
    clear_values: Mutex<HashMap<(ResourceId, Identity), ClearValue>>,
}

impl<E: FheEngine> Decryptor<E> {
    pub fn new(engine: E) -> Self {
        Self::with_clock(engine, Arc::new(SystemClock))
    }

    pub fn with_clock(engine: E, clock: Arc<dyn Clock>) -> Self {
        Self {
            engine,
            clock,
            clear_values: Mutex::new(HashMap::new()),
        }
    }

    /// Decrypt `handle`, which belongs to `resource`.
    ///
    /// # Errors
    ///
    /// - `HandleEmpty` for the sentinel, without contacting the engine
    /// - `DecryptionUnauthorized` if the artifact does not cover `resource`,
    ///   has expired, or the engine refuses it
    pub async fn decrypt(
        &self,
        handle: &CiphertextHandle,
        resource: &ResourceId,
        artifact: &DecryptionAuthorization,
    ) -> Result<u32> {
        if handle.is_empty() {
            return Err(ClientError::HandleEmpty);
        }
        if !artifact.covers(resource) {
            return Err(ClientError::DecryptionUnauthorized(
                "resource not covered by authorization".into(),
            ));
        }
        if !artifact.is_valid_at(self.clock.now_secs()) {
            return Err(ClientError::DecryptionUnauthorized("authorization expired".into()));
        }

        let key = (*resource, *artifact.grantee());
        let cached = self
            .clear_values
            .lock()
            .await
            .get(&key)
            .filter(|clear| clear.handle == *handle)
            .copied();
        if let Some(clear) = cached {
            // A hit skips the engine, so the signature is checked here.
            artifact
                .verify()
                .map_err(|e| ClientError::DecryptionUnauthorized(e.to_string()))?;
            debug!(handle = ?handle, "clear value cache hit");
            return Ok(clear.value);
        }

        let sealed = self
            .engine
            .user_decrypt(&artifact.to_request(*handle, *resource))
            .await
            .map_err(|e| match e {
                FheError::Unauthorized(reason) | FheError::ResourceMismatch(reason) => {
                    ClientError::DecryptionUnauthorized(reason)
                }
                other => ClientError::Engine(other),
            })?;

        if sealed.handle != *handle {
            return Err(ClientError::Engine(FheError::Decryption(
                "engine answered for another handle".into(),
            )));
        }

        let value = sealed.open(artifact.transport_secret())?;
        let value = u32::try_from(value)
            .map_err(|_| ClientError::Engine(FheError::Decryption("value exceeds 32 bits".into())))?;

        self.clear_values.lock().await.insert(
            key,
            ClearValue {
                handle: *handle,
                value,
            },
        );
        debug!(handle = ?handle, "handle decrypted");
        Ok(value)
    }

    /// Forget every remembered value of one handle.
    pub async fn forget(&self, handle: &CiphertextHandle) {
        self.clear_values
            .lock()
            .await
            .retain(|_, clear| clear.handle != *handle);
    }

    /// Forget every remembered value.
    pub async fn clear(&self) {
        self.clear_values.lock().await.clear();
    }

    /// Number of remembered values.
    pub async fn cached_len(&self) -> usize {
        self.clear_values.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mood_diary_core::{ManualClock, SigningKeypair};
    use mood_diary_fhe::{BitWidth, MockEngine, TransportSecret};

    const NOW: u64 = 1_700_000_000;

    struct Setup {
        engine: Arc<MockEngine>,
        clock: Arc<ManualClock>,
        keypair: SigningKeypair,
        resource: ResourceId,
    }

    fn setup() -> Setup {
        let clock = Arc::new(ManualClock::new(NOW));
        let keypair = SigningKeypair::from_seed(&[1u8; 32]);
        let resource = ResourceId::derive(&keypair.identity(), "diary");
        Setup {
            engine: Arc::new(MockEngine::with_clock(clock.clone())),
            clock,
            keypair,
            resource,
        }
    }

    fn artifact(s: &Setup, resources: &[ResourceId]) -> DecryptionAuthorization {
        signed_by(&s.keypair, resources)
    }

    fn signed_by(keypair: &SigningKeypair, resources: &[ResourceId]) -> DecryptionAuthorization {
        let transport = TransportSecret::generate();
        let message = DecryptionAuthorization::message_for(
            &keypair.identity(),
            resources,
            &transport.public_key(),
            NOW,
            1,
        )
        .unwrap();
        DecryptionAuthorization::new(
            keypair.identity(),
            resources,
            transport,
            NOW,
            1,
            keypair.sign(&message),
        )
        .unwrap()
    }

    async fn admit(s: &Setup, value: u64, allow: bool) -> CiphertextHandle {
        let identity = s.keypair.identity();
        let input = s
            .engine
            .encryption_context()
            .encrypt(value, BitWidth::U32, &s.resource, &identity)
            .unwrap();
        let handle = s.engine.verify_input(&input, &s.resource, &identity).await.unwrap();
        if allow {
            s.engine.allow(&handle, &identity).await.unwrap();
        }
        handle
    }

    #[tokio::test]
    async fn test_decrypts_allowed_handle() {
        let s = setup();
        let decryptor = Decryptor::with_clock(s.engine.clone(), s.clock.clone());
        let handle = admit(&s, 4, true).await;

        let value = decryptor
            .decrypt(&handle, &s.resource, &artifact(&s, &[s.resource]))
            .await
            .unwrap();
        assert_eq!(value, 4);
    }

    #[tokio::test]
    async fn test_empty_handle_fails_fast() {
        let s = setup();
        let decryptor = Decryptor::with_clock(s.engine.clone(), s.clock.clone());

        let result = decryptor
            .decrypt(&CiphertextHandle::EMPTY, &s.resource, &artifact(&s, &[s.resource]))
            .await;
        assert!(matches!(result, Err(ClientError::HandleEmpty)));
    }

    #[tokio::test]
    async fn test_uncovered_resource_rejected_locally() {
        let s = setup();
        let decryptor = Decryptor::with_clock(s.engine.clone(), s.clock.clone());
        let handle = admit(&s, 4, true).await;
        let other = ResourceId::from_bytes([7u8; 32]);

        let result = decryptor.decrypt(&handle, &s.resource, &artifact(&s, &[other])).await;
        assert!(matches!(result, Err(ClientError::DecryptionUnauthorized(_))));
    }

    #[tokio::test]
    async fn test_expired_artifact_rejected() {
        let s = setup();
        let decryptor = Decryptor::with_clock(s.engine.clone(), s.clock.clone());
        let handle = admit(&s, 4, true).await;
        let artifact = artifact(&s, &[s.resource]);

        s.clock.advance(86_400);
        let result = decryptor.decrypt(&handle, &s.resource, &artifact).await;
        assert!(matches!(result, Err(ClientError::DecryptionUnauthorized(_))));
    }

    #[tokio::test]
    async fn test_engine_refusal_maps_to_unauthorized() {
        let s = setup();
        let decryptor = Decryptor::with_clock(s.engine.clone(), s.clock.clone());
        let handle = admit(&s, 4, false).await;

        let result = decryptor
            .decrypt(&handle, &s.resource, &artifact(&s, &[s.resource]))
            .await;
        assert!(matches!(result, Err(ClientError::DecryptionUnauthorized(_))));
    }

    #[tokio::test]
    async fn test_clear_value_cache() {
        let s = setup();
        let decryptor = Decryptor::with_clock(s.engine.clone(), s.clock.clone());
        let handle = admit(&s, 2, true).await;
        let artifact = artifact(&s, &[s.resource]);

        assert_eq!(decryptor.decrypt(&handle, &s.resource, &artifact).await.unwrap(), 2);
        assert_eq!(decryptor.decrypt(&handle, &s.resource, &artifact).await.unwrap(), 2);

        decryptor.forget(&handle).await;
        decryptor.clear().await;
        assert_eq!(decryptor.decrypt(&handle, &s.resource, &artifact).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cached_value_not_served_to_other_grantee() {
        let s = setup();
        let decryptor = Decryptor::with_clock(s.engine.clone(), s.clock.clone());
        let handle = admit(&s, 5, true).await;
        let bob = SigningKeypair::from_seed(&[2u8; 32]);

        let alice_value = decryptor
            .decrypt(&handle, &s.resource, &artifact(&s, &[s.resource]))
            .await
            .unwrap();
        assert_eq!(alice_value, 5);

        let result = decryptor
            .decrypt(&handle, &s.resource, &signed_by(&bob, &[s.resource]))
            .await;
        assert!(matches!(result, Err(ClientError::DecryptionUnauthorized(_))));
    }

    #[tokio::test]
    async fn test_cache_keeps_latest_handle_per_grantee() {
        let s = setup();
        let decryptor = Decryptor::with_clock(s.engine.clone(), s.clock.clone());
        let artifact = artifact(&s, &[s.resource]);

        for value in 1..=4 {
            let handle = admit(&s, value, true).await;
            assert_eq!(
                decryptor.decrypt(&handle, &s.resource, &artifact).await.unwrap(),
                value as u32
            );
        }
        assert_eq!(decryptor.cached_len().await, 1);

        let latest = admit(&s, 9, true).await;
        decryptor.decrypt(&latest, &s.resource, &artifact).await.unwrap();
        decryptor.forget(&latest).await;
        assert_eq!(decryptor.cached_len().await, 0);
    }
}
