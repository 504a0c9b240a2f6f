//! # Mood Diary Testkit
//!
//! Testing utilities for the encrypted mood diary.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Canonical authorization and input-binding messages
//!   every client must reproduce byte for byte
//! - **Generators**: Proptest strategies for scores, identities and resources
//! - **Fixtures**: A diary wired to the mock engine, plus ready-made participants
//!
//! ## Golden Vectors
//!
//! ```rust
//! use mood_diary_testkit::vectors::verify_all_vectors;
//!
//! for (name, passed) in verify_all_vectors() {
//!     assert!(passed, "{}", name);
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use mood_diary_testkit::fixtures::DiaryFixture;
//!
//! let fixture = DiaryFixture::memory().await?;
//! let alice = fixture.participant(1);
//! alice.submit(&fixture.diary, 4).await?;
//! assert_eq!(alice.decrypt_personal(&fixture.diary).await?, 4);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{init_tracing, multi_party, DiaryFixture, Participant, TestDiary, FIXTURE_EPOCH};
pub use generators::truncated_mean;
pub use vectors::{
    authorization_vectors, input_binding_vectors, verify_all_vectors, AuthorizationVector,
    InputBindingVector,
};
