//! SQLite implementation of the DiaryStore trait.
//!
//! The primary storage backend. Uses rusqlite with bundled SQLite, wrapped
//! in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use mood_diary_core::{CiphertextHandle, Identity, ResourceId};
use mood_diary_perms::{AccessGrant, GrantOrigin};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{DiaryRecord, DiaryStore, InsertResult, SubmissionCommit};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| {
            StoreError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_ERROR),
                Some(format!("spawn_blocking failed: {}", e)),
            ))
        })?
    }
}

fn blob32(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<[u8; 32]> {
    let bytes: Vec<u8> = row.get(idx)?;
    bytes.try_into().map_err(|_| {
        rusqlite::Error::InvalidColumnType(idx, "expected 32-byte blob".into(), Type::Blob)
    })
}

fn row_to_diary(row: &rusqlite::Row<'_>) -> rusqlite::Result<DiaryRecord> {
    Ok(DiaryRecord {
        resource: ResourceId::from_bytes(blob32(row, 0)?),
        entry_count: row.get::<_, i64>(1)? as u64,
        total: CiphertextHandle::from_bytes(blob32(row, 2)?),
        trend: CiphertextHandle::from_bytes(blob32(row, 3)?),
        created_at: row.get::<_, i64>(4)? as u64,
        updated_at: row.get::<_, i64>(5)? as u64,
    })
}

fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccessGrant> {
    let origin = GrantOrigin::from_u8(row.get(2)?)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Integer, Box::new(e)))?;

    Ok(AccessGrant {
        resource: ResourceId::from_bytes(blob32(row, 0)?),
        grantee: Identity::from_bytes(blob32(row, 1)?),
        origin,
        granted_at_entry: row.get::<_, i64>(3)? as u64,
    })
}

const INSERT_GRANT: &str = "INSERT INTO access_grants (resource, grantee, origin, granted_at_entry)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(resource, grantee) DO NOTHING";

fn insert_grant(conn: &Connection, grant: &AccessGrant) -> Result<InsertResult> {
    let changed = conn.execute(
        INSERT_GRANT,
        params![
            grant.resource.as_bytes().as_slice(),
            grant.grantee.as_bytes().as_slice(),
            grant.origin.to_u8(),
            grant.granted_at_entry as i64,
        ],
    )?;

    Ok(if changed == 0 {
        InsertResult::AlreadyExists
    } else {
        InsertResult::Inserted
    })
}

#[async_trait]
impl DiaryStore for SqliteStore {
    async fn create_diary(&self, record: &DiaryRecord) -> Result<InsertResult> {
        let record = record.clone();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "INSERT INTO diaries (
                    resource, entry_count, total_handle, trend_handle, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(resource) DO NOTHING",
                params![
                    record.resource.as_bytes().as_slice(),
                    record.entry_count as i64,
                    record.total.as_bytes().as_slice(),
                    record.trend.as_bytes().as_slice(),
                    record.created_at as i64,
                    record.updated_at as i64,
                ],
            )?;

            Ok(if changed == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn get_diary(&self, resource: &ResourceId) -> Result<Option<DiaryRecord>> {
        let resource = *resource;

        self.blocking(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT resource, entry_count, total_handle, trend_handle, created_at, updated_at
                     FROM diaries WHERE resource = ?1",
                    params![resource.as_bytes().as_slice()],
                    row_to_diary,
                )
                .optional()?)
        })
        .await
    }

    async fn commit_submission(&self, commit: &SubmissionCommit) -> Result<()> {
        let commit = commit.clone();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let resource = commit.resource.as_bytes().as_slice();

            let actual: Option<i64> = tx
                .query_row(
                    "SELECT entry_count FROM diaries WHERE resource = ?1",
                    params![resource],
                    |row| row.get(0),
                )
                .optional()?;

            match actual {
                None => return Err(StoreError::NotFound(commit.resource.to_hex())),
                Some(actual) if actual as u64 != commit.expected_count => {
                    return Err(StoreError::Conflict {
                        resource: commit.resource.to_hex(),
                        expected: commit.expected_count,
                        actual: actual as u64,
                    });
                }
                Some(_) => {}
            }

            tx.execute(
                "UPDATE diaries SET
                    entry_count = ?2,
                    total_handle = ?3,
                    trend_handle = ?4,
                    updated_at = ?5
                 WHERE resource = ?1",
                params![
                    resource,
                    commit.entry_count as i64,
                    commit.total.as_bytes().as_slice(),
                    commit.trend.as_bytes().as_slice(),
                    commit.updated_at as i64,
                ],
            )?;

            if let Some(grant) = &commit.grant {
                insert_grant(&tx, grant)?;
            }

            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn list_diaries(&self) -> Result<Vec<ResourceId>> {
        self.blocking(|conn| {
            let mut stmt = conn.prepare("SELECT resource FROM diaries ORDER BY resource")?;
            let rows = stmt.query_map([], |row| blob32(row, 0).map(ResourceId::from_bytes))?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn insert_grant(&self, grant: &AccessGrant) -> Result<InsertResult> {
        let grant = grant.clone();
        self.blocking(move |conn| insert_grant(conn, &grant)).await
    }

    async fn get_grant(
        &self,
        resource: &ResourceId,
        grantee: &Identity,
    ) -> Result<Option<AccessGrant>> {
        let resource = *resource;
        let grantee = *grantee;

        self.blocking(move |conn| {
            Ok(conn
                .query_row(
                    "SELECT resource, grantee, origin, granted_at_entry
                     FROM access_grants WHERE resource = ?1 AND grantee = ?2",
                    params![resource.as_bytes().as_slice(), grantee.as_bytes().as_slice()],
                    row_to_grant,
                )
                .optional()?)
        })
        .await
    }

    async fn list_grants(&self, resource: &ResourceId) -> Result<Vec<AccessGrant>> {
        let resource = *resource;

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT resource, grantee, origin, granted_at_entry
                 FROM access_grants WHERE resource = ?1 ORDER BY grantee",
            )?;
            let rows = stmt.query_map(params![resource.as_bytes().as_slice()], row_to_grant)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mood_diary_core::SigningKeypair;
    use tempfile::TempDir;

    fn resource() -> ResourceId {
        ResourceId::from_bytes([1u8; 32])
    }

    fn identity(seed: u8) -> Identity {
        SigningKeypair::from_seed(&[seed; 32]).identity()
    }

    fn commit(expected: u64, grantee: Identity) -> SubmissionCommit {
        SubmissionCommit {
            resource: resource(),
            expected_count: expected,
            entry_count: expected + 1,
            total: CiphertextHandle::from_bytes([0x10 + expected as u8; 32]),
            trend: CiphertextHandle::from_bytes([0x20 + expected as u8; 32]),
            grant: Some(AccessGrant::new(resource(), grantee, GrantOrigin::Submission, expected + 1)),
            updated_at: 100 + expected,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_diary() {
        let store = SqliteStore::open_memory().unwrap();
        let record = DiaryRecord::empty(resource(), 10);

        assert_eq!(store.create_diary(&record).await.unwrap(), InsertResult::Inserted);
        assert_eq!(store.create_diary(&record).await.unwrap(), InsertResult::AlreadyExists);

        let loaded = store.get_diary(&resource()).await.unwrap().unwrap();
        assert_eq!(loaded, record);
        assert!(loaded.trend.is_empty());
    }

    #[tokio::test]
    async fn test_commit_is_guarded_by_entry_count() {
        let store = SqliteStore::open_memory().unwrap();
        store.create_diary(&DiaryRecord::empty(resource(), 10)).await.unwrap();

        store.commit_submission(&commit(0, identity(1))).await.unwrap();
        let result = store.commit_submission(&commit(0, identity(2))).await;

        assert!(matches!(
            result,
            Err(StoreError::Conflict { expected: 0, actual: 1, .. })
        ));
        // The rejected commit rolled back entirely.
        assert!(store.get_grant(&resource(), &identity(2)).await.unwrap().is_none());
        assert_eq!(store.get_diary(&resource()).await.unwrap().unwrap().entry_count, 1);
    }

    #[tokio::test]
    async fn test_commit_to_missing_diary() {
        let store = SqliteStore::open_memory().unwrap();

        assert!(matches!(
            store.commit_submission(&commit(0, identity(1))).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_grants_are_idempotent() {
        let store = SqliteStore::open_memory().unwrap();
        let first = AccessGrant::new(resource(), identity(1), GrantOrigin::Request, 0);
        let second = AccessGrant::new(resource(), identity(1), GrantOrigin::Submission, 3);

        assert_eq!(store.insert_grant(&first).await.unwrap(), InsertResult::Inserted);
        assert_eq!(store.insert_grant(&second).await.unwrap(), InsertResult::AlreadyExists);

        let stored = store.get_grant(&resource(), &identity(1)).await.unwrap().unwrap();
        assert_eq!(stored, first);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diary.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.create_diary(&DiaryRecord::empty(resource(), 10)).await.unwrap();
            store.commit_submission(&commit(0, identity(1))).await.unwrap();
            store
                .insert_grant(&AccessGrant::new(resource(), identity(2), GrantOrigin::Request, 1))
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let record = store.get_diary(&resource()).await.unwrap().unwrap();
        assert_eq!(record.entry_count, 1);
        assert_eq!(record.trend, CiphertextHandle::from_bytes([0x20; 32]));
        assert_eq!(store.list_grants(&resource()).await.unwrap().len(), 2);
        assert_eq!(store.list_diaries().await.unwrap(), vec![resource()]);
    }
}
