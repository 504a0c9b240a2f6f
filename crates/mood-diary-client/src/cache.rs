//! Artifact persistence.
//!
//! Artifacts are stored as CBOR bytes under a string key through the
//! [`ArtifactStorage`] seam, so a client can back them with whatever
//! key-value storage it has. [`AuthorizationCache`] adds expiry and
//! integrity checks on top.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::authorization::{AuthorizationKey, DecryptionAuthorization};
use crate::error::Result;

/// String-keyed byte storage for artifacts.
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<S: ArtifactStorage + ?Sized> ArtifactStorage for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key).await
    }
}

/// Process-local artifact storage.
#[derive(Debug, Default)]
pub struct MemoryArtifactStorage {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryArtifactStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactStorage for MemoryArtifactStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Artifacts by [`AuthorizationKey`], valid ones only.
#[derive(Debug)]
pub struct AuthorizationCache<St> {
    storage: St,
}

impl<St: ArtifactStorage> AuthorizationCache<St> {
    pub fn new(storage: St) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &St {
        &self.storage
    }

    /// The cached artifact for `key` if it is intact and valid at `now`.
    ///
    /// An entry that fails to decode, fails its signature check or was
    /// stored for another key counts as a miss.
    pub async fn lookup(
        &self,
        key: &AuthorizationKey,
        now: u64,
    ) -> Result<Option<DecryptionAuthorization>> {
        let Some(bytes) = self.storage.get(&key.storage_key()).await? else {
            return Ok(None);
        };

        let artifact = match DecryptionAuthorization::from_bytes(&bytes) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(error = %e, "discarding unreadable cached authorization");
                return Ok(None);
            }
        };

        if artifact.key() != *key {
            warn!("discarding cached authorization stored under the wrong key");
            return Ok(None);
        }

        Ok(artifact.is_valid_at(now).then_some(artifact))
    }

    pub async fn store(&self, artifact: &DecryptionAuthorization) -> Result<()> {
        self.storage
            .set(&artifact.key().storage_key(), artifact.to_bytes()?)
            .await
    }

    pub async fn evict(&self, key: &AuthorizationKey) -> Result<()> {
        self.storage.remove(&key.storage_key()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mood_diary_core::{ResourceId, SigningKeypair};
    use mood_diary_fhe::TransportSecret;

    fn artifact(keypair: &SigningKeypair, resources: &[ResourceId], start: u64) -> DecryptionAuthorization {
        let transport = TransportSecret::generate();
        let message = DecryptionAuthorization::message_for(
            &keypair.identity(),
            resources,
            &transport.public_key(),
            start,
            1,
        )
        .unwrap();
        DecryptionAuthorization::new(
            keypair.identity(),
            resources,
            transport,
            start,
            1,
            keypair.sign(&message),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let cache = AuthorizationCache::new(MemoryArtifactStorage::new());
        let keypair = SigningKeypair::from_seed(&[1u8; 32]);
        let resources = [ResourceId::from_bytes([1u8; 32])];
        let artifact = artifact(&keypair, &resources, 100);

        cache.store(&artifact).await.unwrap();

        let hit = cache.lookup(&artifact.key(), 100).await.unwrap().unwrap();
        assert_eq!(hit.transport_public(), artifact.transport_public());
    }

    #[tokio::test]
    async fn test_expired_is_miss() {
        let cache = AuthorizationCache::new(MemoryArtifactStorage::new());
        let keypair = SigningKeypair::from_seed(&[1u8; 32]);
        let artifact = artifact(&keypair, &[ResourceId::from_bytes([1u8; 32])], 100);

        cache.store(&artifact).await.unwrap();

        assert!(cache.lookup(&artifact.key(), 100 + 86_400).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_miss() {
        let storage = Arc::new(MemoryArtifactStorage::new());
        let cache = AuthorizationCache::new(storage.clone());
        let keypair = SigningKeypair::from_seed(&[1u8; 32]);
        let key = AuthorizationKey::new(keypair.identity(), &[ResourceId::from_bytes([1u8; 32])]);

        storage.set(&key.storage_key(), vec![0xde, 0xad]).await.unwrap();

        assert!(cache.lookup(&key, 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_under_foreign_key_is_miss() {
        let storage = Arc::new(MemoryArtifactStorage::new());
        let cache = AuthorizationCache::new(storage.clone());
        let keypair = SigningKeypair::from_seed(&[1u8; 32]);
        let narrow = artifact(&keypair, &[ResourceId::from_bytes([1u8; 32])], 100);
        let wide_key = AuthorizationKey::new(
            keypair.identity(),
            &[ResourceId::from_bytes([1u8; 32]), ResourceId::from_bytes([2u8; 32])],
        );

        storage
            .set(&wide_key.storage_key(), narrow.to_bytes().unwrap())
            .await
            .unwrap();

        assert!(cache.lookup(&wide_key, 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evict() {
        let storage = Arc::new(MemoryArtifactStorage::new());
        let cache = AuthorizationCache::new(storage.clone());
        let keypair = SigningKeypair::from_seed(&[1u8; 32]);
        let artifact = artifact(&keypair, &[ResourceId::from_bytes([1u8; 32])], 100);

        cache.store(&artifact).await.unwrap();
        cache.evict(&artifact.key()).await.unwrap();

        assert!(storage.is_empty().await);
    }
}
