//! Store trait: the abstract interface for diary persistence.
//!
//! The diary state machine is storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use std::sync::Arc;

use mood_diary_core::{CiphertextHandle, Identity, ResourceId};
use mood_diary_perms::AccessGrant;

use crate::error::Result;

/// Persisted aggregate state of one diary.
///
/// Holds only public data: the entry count and opaque handles. Ciphertexts
/// themselves live in the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiaryRecord {
    pub resource: ResourceId,

    /// Number of accepted submissions.
    pub entry_count: u64,

    /// Handle of the encrypted total, `EMPTY` before the first submission.
    pub total: CiphertextHandle,

    /// Handle of the encrypted trend, `EMPTY` before the first submission.
    pub trend: CiphertextHandle,

    /// Unix seconds.
    pub created_at: u64,

    /// Unix seconds of the last accepted submission (or creation).
    pub updated_at: u64,
}

impl DiaryRecord {
    /// A freshly initialized, empty diary.
    pub fn empty(resource: ResourceId, now: u64) -> Self {
        Self {
            resource,
            entry_count: 0,
            total: CiphertextHandle::EMPTY,
            trend: CiphertextHandle::EMPTY,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The new state produced by one accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionCommit {
    pub resource: ResourceId,

    /// Entry count the new state was computed from.
    pub expected_count: u64,

    pub entry_count: u64,
    pub total: CiphertextHandle,
    pub trend: CiphertextHandle,

    /// Grant for the submitter, inserted if absent.
    pub grant: Option<AccessGrant>,

    pub updated_at: u64,
}

/// Result of an idempotent insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Record was inserted.
    Inserted,
    /// Record already exists (idempotent - not an error).
    AlreadyExists,
}

/// Async interface for diary persistence.
///
/// For SQLite, `spawn_blocking` keeps the runtime free.
///
/// # Design Notes
///
/// - **Idempotent inserts**: creating a diary or a grant twice returns `AlreadyExists`.
/// - **Guarded commits**: `commit_submission` applies the new aggregate and the
///   submitter's grant together, or not at all, and fails with
///   `StoreError::Conflict` if the stored entry count differs from
///   `expected_count`.
#[async_trait]
pub trait DiaryStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Diary Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a diary record if none exists for its resource.
    async fn create_diary(&self, record: &DiaryRecord) -> Result<InsertResult>;

    /// Get a diary record.
    async fn get_diary(&self, resource: &ResourceId) -> Result<Option<DiaryRecord>>;

    /// Atomically apply a submission.
    async fn commit_submission(&self, commit: &SubmissionCommit) -> Result<()>;

    /// List every known diary.
    async fn list_diaries(&self) -> Result<Vec<ResourceId>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Grant Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a grant if the pair has none.
    async fn insert_grant(&self, grant: &AccessGrant) -> Result<InsertResult>;

    /// Get the grant for a (resource, grantee) pair.
    async fn get_grant(
        &self,
        resource: &ResourceId,
        grantee: &Identity,
    ) -> Result<Option<AccessGrant>>;

    /// All grants of a diary.
    async fn list_grants(&self, resource: &ResourceId) -> Result<Vec<AccessGrant>>;
}

#[async_trait]
impl<S: DiaryStore + ?Sized> DiaryStore for Arc<S> {
    async fn create_diary(&self, record: &DiaryRecord) -> Result<InsertResult> {
        (**self).create_diary(record).await
    }

    async fn get_diary(&self, resource: &ResourceId) -> Result<Option<DiaryRecord>> {
        (**self).get_diary(resource).await
    }

    async fn commit_submission(&self, commit: &SubmissionCommit) -> Result<()> {
        (**self).commit_submission(commit).await
    }

    async fn list_diaries(&self) -> Result<Vec<ResourceId>> {
        (**self).list_diaries().await
    }

    async fn insert_grant(&self, grant: &AccessGrant) -> Result<InsertResult> {
        (**self).insert_grant(grant).await
    }

    async fn get_grant(
        &self,
        resource: &ResourceId,
        grantee: &Identity,
    ) -> Result<Option<AccessGrant>> {
        (**self).get_grant(resource, grantee).await
    }

    async fn list_grants(&self, resource: &ResourceId) -> Result<Vec<AccessGrant>> {
        (**self).list_grants(resource).await
    }
}
