//! Decryption authorization artifacts.
//!
//! An artifact binds a fresh X25519 transport keypair to a grantee, a set of
//! diaries and a validity window, under the grantee's signature. The engine
//! checks the public half of it on every user decryption and seals results to
//! the transport key; the transport secret never leaves the client.

use serde::{Deserialize, Serialize};
use std::fmt;

use mood_diary_core::{authorization_message, CiphertextHandle, Identity, ResourceId, Signature};
use mood_diary_fhe::{TransportPublicKey, TransportSecret, UserDecryptRequest};

use crate::error::{ClientError, Result};

const SECS_PER_DAY: u64 = 86_400;

/// Cache key: a grantee and a normalized resource set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorizationKey {
    grantee: Identity,
    resources: Vec<ResourceId>,
}

impl AuthorizationKey {
    /// Sorts and deduplicates `resources`.
    pub fn new(grantee: Identity, resources: &[ResourceId]) -> Self {
        Self {
            grantee,
            resources: normalize(resources),
        }
    }

    pub fn grantee(&self) -> &Identity {
        &self.grantee
    }

    pub fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    /// String key for [`ArtifactStorage`](crate::cache::ArtifactStorage).
    pub fn storage_key(&self) -> String {
        let resources: Vec<String> = self.resources.iter().map(ResourceId::to_hex).collect();
        format!(
            "mood-diary/authorization/v1/{}/{}",
            self.grantee.to_hex(),
            resources.join(",")
        )
    }
}

fn normalize(resources: &[ResourceId]) -> Vec<ResourceId> {
    let mut resources = resources.to_vec();
    resources.sort();
    resources.dedup();
    resources
}

/// A signed, time-bounded, resource-scoped decryption authorization.
#[derive(Clone)]
pub struct DecryptionAuthorization {
    grantee: Identity,
    resources: Vec<ResourceId>,
    transport: TransportSecret,
    start_secs: u64,
    duration_days: u32,
    signature: Signature,
}

/// On-disk form, including the transport secret.
#[derive(Serialize, Deserialize)]
struct StoredAuthorization {
    version: u8,
    grantee: Identity,
    resources: Vec<ResourceId>,
    #[serde(with = "mood_diary_core::serde_fixed")]
    transport_secret: [u8; 32],
    start_secs: u64,
    duration_days: u32,
    signature: Signature,
}

const STORED_VERSION: u8 = 1;

impl DecryptionAuthorization {
    /// Assemble an artifact from a signature the caller already obtained.
    ///
    /// The signature is checked against the canonical message before the
    /// artifact is returned.
    pub fn new(
        grantee: Identity,
        resources: &[ResourceId],
        transport: TransportSecret,
        start_secs: u64,
        duration_days: u32,
        signature: Signature,
    ) -> Result<Self> {
        let artifact = Self {
            grantee,
            resources: normalize(resources),
            transport,
            start_secs,
            duration_days,
            signature,
        };
        artifact.verify()?;
        Ok(artifact)
    }

    /// The canonical message a grantee signs for these parameters.
    pub fn message_for(
        grantee: &Identity,
        resources: &[ResourceId],
        transport_public: &TransportPublicKey,
        start_secs: u64,
        duration_days: u32,
    ) -> Result<Vec<u8>> {
        Ok(authorization_message(
            grantee,
            resources,
            start_secs,
            duration_days,
            transport_public.as_bytes(),
        )?)
    }

    pub fn grantee(&self) -> &Identity {
        &self.grantee
    }

    /// Covered resources, sorted and deduplicated.
    pub fn resources(&self) -> &[ResourceId] {
        &self.resources
    }

    pub fn transport_public(&self) -> TransportPublicKey {
        self.transport.public_key()
    }

    pub(crate) fn transport_secret(&self) -> &TransportSecret {
        &self.transport
    }

    pub fn start_secs(&self) -> u64 {
        self.start_secs
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn key(&self) -> AuthorizationKey {
        AuthorizationKey {
            grantee: self.grantee,
            resources: self.resources.clone(),
        }
    }

    /// First second the artifact is no longer valid.
    pub fn expires_at(&self) -> u64 {
        self.start_secs
            .saturating_add(u64::from(self.duration_days).saturating_mul(SECS_PER_DAY))
    }

    /// `start <= now < start + duration`.
    pub fn is_valid_at(&self, now: u64) -> bool {
        now >= self.start_secs && now < self.expires_at()
    }

    pub fn covers(&self, resource: &ResourceId) -> bool {
        self.resources.binary_search(resource).is_ok()
    }

    /// Check the grantee's signature over the canonical message.
    pub fn verify(&self) -> Result<()> {
        let message = Self::message_for(
            &self.grantee,
            &self.resources,
            &self.transport_public(),
            self.start_secs,
            self.duration_days,
        )?;
        self.grantee
            .verify(&message, &self.signature)
            .map_err(|_| ClientError::SigningFailed("signature does not verify".into()))
    }

    /// The public request sent to the engine for one handle.
    pub fn to_request(&self, handle: CiphertextHandle, resource: ResourceId) -> UserDecryptRequest {
        UserDecryptRequest {
            handle,
            resource,
            grantee: self.grantee,
            resources: self.resources.clone(),
            transport_public: self.transport_public(),
            start_secs: self.start_secs,
            duration_days: self.duration_days,
            signature: self.signature,
        }
    }

    /// Serialize to CBOR bytes, transport secret included.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let stored = StoredAuthorization {
            version: STORED_VERSION,
            grantee: self.grantee,
            resources: self.resources.clone(),
            transport_secret: self.transport.to_bytes(),
            start_secs: self.start_secs,
            duration_days: self.duration_days,
            signature: self.signature,
        };

        let mut buf = Vec::new();
        ciborium::into_writer(&stored, &mut buf)
            .map_err(|e| ClientError::Storage(format!("encode artifact: {}", e)))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes, re-verifying the signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let stored: StoredAuthorization = ciborium::from_reader(bytes)
            .map_err(|e| ClientError::Storage(format!("decode artifact: {}", e)))?;

        if stored.version != STORED_VERSION {
            return Err(ClientError::Storage(format!(
                "unsupported artifact version {}",
                stored.version
            )));
        }

        Self::new(
            stored.grantee,
            &stored.resources,
            TransportSecret::from_bytes(stored.transport_secret),
            stored.start_secs,
            stored.duration_days,
            stored.signature,
        )
    }
}

impl fmt::Debug for DecryptionAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptionAuthorization")
            .field("grantee", &self.grantee)
            .field("resources", &self.resources)
            .field("transport", &self.transport_public())
            .field("start_secs", &self.start_secs)
            .field("duration_days", &self.duration_days)
            .finish_non_exhaustive()
    }
}
