//! The diary: an encrypted aggregate state machine.
//!
//! Each accepted submission adds an encrypted score into the encrypted
//! total, bumps the public entry count and recomputes the encrypted trend
//! (`total / count`, truncating). Grants decide who may decrypt the trend.

use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use mood_diary_core::{CiphertextHandle, Clock, Identity, ResourceId, SystemClock};
use mood_diary_fhe::{EncryptedInput, FheEngine};
use mood_diary_perms::{AccessGrant, AccessGrantRegistry, GrantOrigin, GrantOutcome};
use mood_diary_store::{DiaryRecord, DiaryStore, InsertResult, SubmissionCommit};

use crate::config::DiaryConfig;
use crate::error::{DiaryError, Result};

/// Lifecycle of a diary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiaryPhase {
    /// No entries; total and trend are `EMPTY`.
    Empty,
    /// At least one entry.
    Populated,
}

/// What an accepted submission produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub entry_count: u64,
    pub trend_handle: CiphertextHandle,
}

struct DiaryState {
    record: DiaryRecord,
    grants: AccessGrantRegistry,
}

/// One diary, addressed by its [`ResourceId`].
///
/// Submissions and access requests are serialized by an internal lock and
/// each submission is persisted as one guarded commit, so two submissions
/// never interleave. Several handles may share one store: every operation
/// reloads the record and grants from the store before acting.
pub struct MoodDiary<S, E> {
    resource: ResourceId,
    store: S,
    engine: E,
    clock: Arc<dyn Clock>,
    config: DiaryConfig,
    state: RwLock<DiaryState>,
}

impl<S: DiaryStore, E: FheEngine> MoodDiary<S, E> {
    /// Initialize the diary if needed, then open it.
    pub async fn create(resource: ResourceId, store: S, engine: E, config: DiaryConfig) -> Result<Self> {
        Self::create_with_clock(resource, store, engine, config, Arc::new(SystemClock)).await
    }

    pub async fn create_with_clock(
        resource: ResourceId,
        store: S,
        engine: E,
        config: DiaryConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let record = DiaryRecord::empty(resource, clock.now_secs());
        match store.create_diary(&record).await? {
            InsertResult::Inserted => info!(resource = ?resource, "diary created"),
            InsertResult::AlreadyExists => debug!(resource = ?resource, "diary already initialized"),
        }

        Self::open_with_clock(resource, store, engine, config, clock).await
    }

    /// Attach to an initialized diary.
    ///
    /// Fails with `ResourceUnavailable` if the diary was never created.
    pub async fn open(resource: ResourceId, store: S, engine: E, config: DiaryConfig) -> Result<Self> {
        Self::open_with_clock(resource, store, engine, config, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(
        resource: ResourceId,
        store: S,
        engine: E,
        config: DiaryConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let state = load_state(&store, &resource).await?;
        debug!(
            resource = ?resource,
            entry_count = state.record.entry_count,
            grants = state.grants.len(),
            "diary opened"
        );

        Ok(Self {
            resource,
            store,
            engine,
            clock,
            config,
            state: RwLock::new(state),
        })
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn config(&self) -> &DiaryConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Submission
    // ─────────────────────────────────────────────────────────────────────────

    /// Accept an encrypted score from `caller`.
    ///
    /// Verifies the input proof against `(this diary, caller)`, adds the
    /// ciphertext into the total, increments the count, recomputes the
    /// trend, grants `caller` access and authorizes the new trend handle.
    /// There is no plaintext range check here; range is the client's job.
    ///
    /// # Errors
    ///
    /// - `ProofInvalid` if the proof fails or is bound to another submitter,
    ///   diary or bit width
    /// - `Store(Conflict)` if another writer committed between the reload
    ///   and the commit; the cached state is reloaded before returning
    pub async fn submit(&self, caller: &Identity, input: &EncryptedInput) -> Result<SubmitReceipt> {
        let mut state = self.state.write().await;
        *state = load_state(&self.store, &self.resource).await?;

        if input.ciphertext.bit_width != self.config.input_bit_width {
            return Err(DiaryError::ProofInvalid(format!(
                "expected a {}-bit input, got {} bits",
                self.config.input_bit_width.bits(),
                input.ciphertext.bit_width.bits()
            )));
        }

        let entry = self
            .engine
            .verify_input(input, &self.resource, caller)
            .await
            .map_err(DiaryError::from_engine)?;

        let expected_count = state.record.entry_count;
        let entry_count = expected_count + 1;

        let total = if state.record.total.is_empty() {
            entry
        } else {
            self.engine.add(&state.record.total, &entry).await?
        };
        let trend = self.engine.div_scalar(&total, entry_count).await?;

        let grant = (!state.grants.is_granted(&self.resource, caller))
            .then(|| AccessGrant::new(self.resource, *caller, GrantOrigin::Submission, entry_count));

        self.engine.allow(&trend, caller).await?;
        if self.config.authorize_all_grantees_on_submit {
            for grantee in state.grants.grantees(&self.resource) {
                if grantee != *caller {
                    self.engine.allow(&trend, &grantee).await?;
                }
            }
        }

        let commit = SubmissionCommit {
            resource: self.resource,
            expected_count,
            entry_count,
            total,
            trend,
            grant: grant.clone(),
            updated_at: self.clock.now_secs(),
        };

        if let Err(err) = self.store.commit_submission(&commit).await {
            *state = load_state(&self.store, &self.resource).await?;
            return Err(err.into());
        }

        state.record.entry_count = entry_count;
        state.record.total = total;
        state.record.trend = trend;
        state.record.updated_at = commit.updated_at;
        if let Some(grant) = grant {
            state.grants.apply(grant);
            info!(resource = ?self.resource, grantee = ?caller, "grant created on submission");
        }

        info!(resource = ?self.resource, entry_count, "submission accepted");
        Ok(SubmitReceipt {
            entry_count,
            trend_handle: trend,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Grant `caller` access and authorize the current trend handle for them.
    ///
    /// Idempotent. Returns `true` if the grant was newly created.
    pub async fn request_access(&self, caller: &Identity) -> Result<bool> {
        let mut state = self.state.write().await;
        *state = load_state(&self.store, &self.resource).await?;

        let outcome = if state.grants.is_granted(&self.resource, caller) {
            GrantOutcome::Confirmed
        } else {
            let grant = AccessGrant::new(
                self.resource,
                *caller,
                GrantOrigin::Request,
                state.record.entry_count,
            );
            self.store.insert_grant(&grant).await?;
            state.grants.apply(grant)
        };

        if !state.record.trend.is_empty() {
            self.engine.allow(&state.record.trend, caller).await?;
        }

        match outcome {
            GrantOutcome::Created => {
                info!(resource = ?self.resource, grantee = ?caller, "grant created on request")
            }
            GrantOutcome::Confirmed => {
                debug!(resource = ?self.resource, grantee = ?caller, "grant confirmed")
            }
        }

        Ok(outcome.is_created())
    }

    /// The current trend handle if `caller` holds a grant, else `EMPTY`.
    ///
    /// A returned handle refers to the aggregate as of this call; later
    /// submissions produce new handles and do not update it.
    pub async fn get_personal_handle(&self, caller: &Identity) -> CiphertextHandle {
        let state = self.synced().await;
        if state.grants.is_granted(&self.resource, caller) {
            state.record.trend
        } else {
            CiphertextHandle::EMPTY
        }
    }

    /// Whether `caller` holds a grant for this diary.
    pub async fn can_decrypt(&self, caller: &Identity) -> bool {
        self.synced().await.grants.is_granted(&self.resource, caller)
    }

    /// The grant `caller` holds, if any.
    pub async fn grant_of(&self, caller: &Identity) -> Option<AccessGrant> {
        self.synced().await.grants.get(&self.resource, caller).cloned()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Public State
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn get_entry_count(&self) -> u64 {
        self.synced().await.record.entry_count
    }

    pub async fn get_encrypted_trend(&self) -> CiphertextHandle {
        self.synced().await.record.trend
    }

    pub async fn get_encrypted_total(&self) -> CiphertextHandle {
        self.synced().await.record.total
    }

    pub async fn phase(&self) -> DiaryPhase {
        if self.synced().await.record.entry_count == 0 {
            DiaryPhase::Empty
        } else {
            DiaryPhase::Populated
        }
    }

    /// The state as currently stored. Falls back to the cached state if the
    /// store cannot be read.
    async fn synced(&self) -> RwLockReadGuard<'_, DiaryState> {
        let mut state = self.state.write().await;
        match load_state(&self.store, &self.resource).await {
            Ok(fresh) => *state = fresh,
            Err(err) => {
                warn!(resource = ?self.resource, error = %err, "diary reload failed, serving cached state")
            }
        }
        state.downgrade()
    }
}

async fn load_state<S: DiaryStore>(store: &S, resource: &ResourceId) -> Result<DiaryState> {
    let record = store
        .get_diary(resource)
        .await?
        .ok_or(DiaryError::ResourceUnavailable(*resource))?;
    let grants = AccessGrantRegistry::from_grants(store.list_grants(resource).await?);
    Ok(DiaryState { record, grants })
}
