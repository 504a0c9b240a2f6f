//! # Mood Diary
//!
//! Private scores, shared statistics. Participants submit encrypted mood
//! scores (1 to 5) to a diary that keeps a running average over ciphertexts
//! it can never read. Only identities holding an access grant can decrypt
//! the average, and only locally, with their own key material.
//!
//! ## Overview
//!
//! - **Submit**: a client encrypts a score bound to itself and the diary;
//!   the diary verifies the proof, adds the ciphertext into the encrypted
//!   total, bumps the public count and recomputes the encrypted trend.
//! - **Grants**: submitting grants access implicitly; anyone else calls
//!   `request_access`. Grants are never revoked.
//! - **Decrypt**: a grantee signs a time-bounded authorization once, then
//!   decrypts trend handles through the engine until it expires.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mood_diary::{DiaryConfig, MoodDiary};
//! use mood_diary::client::{
//!     DecryptionAuthorizationProtocol, Decryptor, EncryptedInputBuilder, KeypairSigner,
//!     MemoryArtifactStorage,
//! };
//! use mood_diary::core::{ResourceId, SigningKeypair};
//! use mood_diary::fhe::{FheEngine, MockEngine};
//! use mood_diary::store::SqliteStore;
//!
//! async fn example() {
//!     let engine = Arc::new(MockEngine::new());
//!     let alice = SigningKeypair::generate();
//!     let me = alice.identity();
//!     let resource = ResourceId::derive(&me, "team-mood");
//!
//!     let store = SqliteStore::open("diary.db").unwrap();
//!     let diary = MoodDiary::create(resource, store, engine.clone(), DiaryConfig::default())
//!         .await
//!         .unwrap();
//!
//!     // Submit a score
//!     let input = EncryptedInputBuilder::new(engine.encryption_context())
//!         .build(&resource, &me, 4)
//!         .unwrap();
//!     diary.submit(&me, &input).await.unwrap();
//!
//!     // Decrypt the average
//!     let protocol =
//!         DecryptionAuthorizationProtocol::new(KeypairSigner::new(alice), MemoryArtifactStorage::new());
//!     let artifact = protocol.load_or_create(&[resource], &me).await.unwrap();
//!     let handle = diary.get_personal_handle(&me).await;
//!     let mean = Decryptor::new(engine).decrypt(&handle, &resource, &artifact).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `mood_diary::core` - Identifiers, identities, scores, canonical messages
//! - `mood_diary::fhe` - Engine capability and reference engine
//! - `mood_diary::perms` - Access grants
//! - `mood_diary::store` - Storage abstraction and SQLite
//! - `mood_diary::client` - Input encryption, authorizations, decryption

pub mod config;
pub mod diary;
pub mod error;

// Re-export component crates
pub use mood_diary_client as client;
pub use mood_diary_core as core;
pub use mood_diary_fhe as fhe;
pub use mood_diary_perms as perms;
pub use mood_diary_store as store;

// Re-export main types for convenience
pub use config::DiaryConfig;
pub use diary::{DiaryPhase, MoodDiary, SubmitReceipt};
pub use error::{DiaryError, Result};

// Re-export commonly used types
pub use mood_diary_core::{CiphertextHandle, Identity, ResourceId, Score, SigningKeypair};
