//! # Mood Diary Store
//!
//! Persistence for diary aggregates and access grants, behind the
//! [`DiaryStore`] trait.
//!
//! ## Key Types
//!
//! - [`DiaryStore`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`DiaryRecord`] - Persisted aggregate state of one diary
//! - [`SubmissionCommit`] - One accepted submission, applied atomically
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mood_diary_store::{DiaryRecord, DiaryStore, SqliteStore};
//! use mood_diary_core::ResourceId;
//!
//! async fn example() {
//!     let store = SqliteStore::open("diary.db").unwrap();
//!     let resource = ResourceId::from_bytes([1u8; 32]);
//!     store.create_diary(&DiaryRecord::empty(resource, 0)).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - Only public data is stored: entry counts, opaque handles and grants
//! - Submissions commit in one transaction guarded by the prior entry count

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{DiaryRecord, DiaryStore, InsertResult, SubmissionCommit};
