//! Obtaining decryption authorizations.
//!
//! [`DecryptionAuthorizationProtocol::load_or_create`] returns a cached
//! artifact while it is valid and otherwise asks the signer for a new one.
//! A decline or a signer failure leaves the cache exactly as it was, so the
//! next call prompts again.

use std::sync::Arc;
use tracing::{debug, info};

use mood_diary_core::{Clock, Identity, ResourceId, SystemClock};
use mood_diary_fhe::TransportSecret;

use crate::authorization::{AuthorizationKey, DecryptionAuthorization};
use crate::cache::{ArtifactStorage, AuthorizationCache};
use crate::config::AuthorizationConfig;
use crate::error::{ClientError, Result};
use crate::signer::{MessageSigner, SigningOutcome};

/// Produces and caches authorizations for one signer.
pub struct DecryptionAuthorizationProtocol<Sg, St> {
    signer: Sg,
    cache: AuthorizationCache<St>,
    clock: Arc<dyn Clock>,
    config: AuthorizationConfig,
}

impl<Sg: MessageSigner, St: ArtifactStorage> DecryptionAuthorizationProtocol<Sg, St> {
    pub fn new(signer: Sg, storage: St) -> Self {
        Self::with_clock(signer, storage, Arc::new(SystemClock))
    }

    /// Default settings with an explicit clock.
    pub fn with_clock(signer: Sg, storage: St, clock: Arc<dyn Clock>) -> Self {
        Self {
            signer,
            cache: AuthorizationCache::new(storage),
            clock,
            config: AuthorizationConfig::default(),
        }
    }

    /// # Errors
    ///
    /// `InvalidRequest` if `config` fails [`AuthorizationConfig::validate`].
    pub fn with_config(
        signer: Sg,
        storage: St,
        clock: Arc<dyn Clock>,
        config: AuthorizationConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            signer,
            cache: AuthorizationCache::new(storage),
            clock,
            config,
        })
    }

    pub fn signer(&self) -> &Sg {
        &self.signer
    }

    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    /// A valid authorization for `grantee` over exactly `resources`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for an empty or oversized resource set
    /// - `SigningFailed` if the signer holds another identity, fails, or
    ///   returns a signature that does not verify
    /// - `AuthorizationDeclined` if the user refuses
    pub async fn load_or_create(
        &self,
        resources: &[ResourceId],
        grantee: &Identity,
    ) -> Result<DecryptionAuthorization> {
        let key = AuthorizationKey::new(*grantee, resources);
        self.check_request(&key)?;

        let now = self.clock.now_secs();
        if let Some(artifact) = self.cache.lookup(&key, now).await? {
            debug!(grantee = ?grantee, resources = key.resources().len(), "authorization cache hit");
            return Ok(artifact);
        }
        debug!(grantee = ?grantee, resources = key.resources().len(), "authorization cache miss");

        let transport = TransportSecret::generate();
        let message = DecryptionAuthorization::message_for(
            grantee,
            key.resources(),
            &transport.public_key(),
            now,
            self.config.duration_days,
        )?;

        let signature = match self.signer.sign_message(&message).await {
            SigningOutcome::Signed(signature) => signature,
            SigningOutcome::Declined => {
                info!(grantee = ?grantee, "authorization declined by signer");
                return Err(ClientError::AuthorizationDeclined);
            }
            SigningOutcome::Failed(reason) => return Err(ClientError::SigningFailed(reason)),
        };

        let artifact = DecryptionAuthorization::new(
            *grantee,
            key.resources(),
            transport,
            now,
            self.config.duration_days,
            signature,
        )?;

        self.cache.store(&artifact).await?;
        info!(grantee = ?grantee, expires_at = artifact.expires_at(), "authorization created");
        Ok(artifact)
    }

    /// Drop the cached authorization for `grantee` over `resources`.
    pub async fn invalidate(&self, resources: &[ResourceId], grantee: &Identity) -> Result<()> {
        self.cache.evict(&AuthorizationKey::new(*grantee, resources)).await
    }

    fn check_request(&self, key: &AuthorizationKey) -> Result<()> {
        if key.resources().is_empty() {
            return Err(ClientError::InvalidRequest("no resources requested".into()));
        }
        if key.resources().len() > self.config.max_resources {
            return Err(ClientError::InvalidRequest(format!(
                "{} resources requested, at most {} allowed",
                key.resources().len(),
                self.config.max_resources
            )));
        }
        if self.signer.identity() != *key.grantee() {
            return Err(ClientError::SigningFailed(
                "signer identity does not match grantee".into(),
            ));
        }
        Ok(())
    }
}
