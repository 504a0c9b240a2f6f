//! In-memory implementation of the DiaryStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use mood_diary_core::{Identity, ResourceId};
use mood_diary_perms::AccessGrant;

use crate::error::{Result, StoreError};
use crate::traits::{DiaryRecord, DiaryStore, InsertResult, SubmissionCommit};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Diaries in resource order.
    diaries: BTreeMap<ResourceId, DiaryRecord>,

    /// Grants per diary, keyed by grantee.
    grants: HashMap<ResourceId, BTreeMap<Identity, AccessGrant>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    // Nothing here can leave the maps half-written, so a poisoned lock is
    // still safe to read through.
    fn read(&self) -> RwLockReadGuard<'_, MemoryStoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryStoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryStoreInner {
    fn insert_grant(&mut self, grant: &AccessGrant) -> InsertResult {
        let grants = self.grants.entry(grant.resource).or_default();
        if grants.contains_key(&grant.grantee) {
            return InsertResult::AlreadyExists;
        }
        grants.insert(grant.grantee, grant.clone());
        InsertResult::Inserted
    }
}

#[async_trait]
impl DiaryStore for MemoryStore {
    async fn create_diary(&self, record: &DiaryRecord) -> Result<InsertResult> {
        let mut inner = self.write();
        if inner.diaries.contains_key(&record.resource) {
            return Ok(InsertResult::AlreadyExists);
        }
        inner.diaries.insert(record.resource, record.clone());
        Ok(InsertResult::Inserted)
    }

    async fn get_diary(&self, resource: &ResourceId) -> Result<Option<DiaryRecord>> {
        Ok(self.read().diaries.get(resource).cloned())
    }

    async fn commit_submission(&self, commit: &SubmissionCommit) -> Result<()> {
        let mut inner = self.write();

        let record = inner
            .diaries
            .get_mut(&commit.resource)
            .ok_or_else(|| StoreError::NotFound(commit.resource.to_hex()))?;

        if record.entry_count != commit.expected_count {
            return Err(StoreError::Conflict {
                resource: commit.resource.to_hex(),
                expected: commit.expected_count,
                actual: record.entry_count,
            });
        }

        record.entry_count = commit.entry_count;
        record.total = commit.total;
        record.trend = commit.trend;
        record.updated_at = commit.updated_at;

        if let Some(grant) = &commit.grant {
            inner.insert_grant(grant);
        }

        Ok(())
    }

    async fn list_diaries(&self) -> Result<Vec<ResourceId>> {
        Ok(self.read().diaries.keys().copied().collect())
    }

    async fn insert_grant(&self, grant: &AccessGrant) -> Result<InsertResult> {
        Ok(self.write().insert_grant(grant))
    }

    async fn get_grant(
        &self,
        resource: &ResourceId,
        grantee: &Identity,
    ) -> Result<Option<AccessGrant>> {
        Ok(self
            .read()
            .grants
            .get(resource)
            .and_then(|grants| grants.get(grantee))
            .cloned())
    }

    async fn list_grants(&self, resource: &ResourceId) -> Result<Vec<AccessGrant>> {
        Ok(self
            .read()
            .grants
            .get(resource)
            .map(|grants| grants.values().cloned().collect())
            .unwrap_or_default())
    }
}
