//! Database schema migrations for SQLite.
//!
//! Versioned: each migration moves the schema from version N to N+1 and is
//! recorded in `schema_migrations`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_secs()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "schema migrated");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: diaries and their grants.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Aggregate state per diary; handles are opaque engine references
        CREATE TABLE diaries (
            resource BLOB PRIMARY KEY,         -- 32 bytes
            entry_count INTEGER NOT NULL DEFAULT 0,
            total_handle BLOB NOT NULL,        -- 32 bytes, all-zero when empty
            trend_handle BLOB NOT NULL,        -- 32 bytes, all-zero when empty
            created_at INTEGER NOT NULL,       -- unix seconds
            updated_at INTEGER NOT NULL
        );

        -- Monotone grant relation; rows are never deleted
        CREATE TABLE access_grants (
            resource BLOB NOT NULL,
            grantee BLOB NOT NULL,             -- 32 bytes, Ed25519 public key
            origin INTEGER NOT NULL,           -- 1=submission, 2=request
            granted_at_entry INTEGER NOT NULL,
            PRIMARY KEY (resource, grantee)
        );

        CREATE INDEX idx_access_grants_grantee ON access_grants(grantee);
        "#,
    )?;

    Ok(())
}

fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
