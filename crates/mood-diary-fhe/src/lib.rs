//! # Mood Diary FHE
//!
//! The homomorphic encryption capability the diary computes through.
//!
//! The engine is a black box behind the [`FheEngine`] trait: it admits client
//! inputs after checking their [`InputProof`], evaluates addition and
//! division by a public scalar on ciphertext handles, keeps a per-handle
//! access list, and serves user decryptions re-encrypted to a caller's
//! transport key.
//!
//! ## Key Types
//!
//! - [`FheEngine`] - Async engine capability
//! - [`EncryptionContext`] - Public context clients encrypt under
//! - [`EncryptedInput`] - Ciphertext plus input proof
//! - [`UserDecryptRequest`] - Signed, scoped, time-bounded decryption request
//! - [`SealedValue`] - Plaintext re-encrypted to a transport key
//! - [`MockEngine`] - In-process reference engine
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mood_diary_fhe::{BitWidth, FheEngine, MockEngine};
//! use mood_diary_core::{ResourceId, SigningKeypair};
//!
//! async fn example() {
//!     let engine = MockEngine::new();
//!     let alice = SigningKeypair::generate().identity();
//!     let diary = ResourceId::derive(&alice, "diary");
//!
//!     let input = engine
//!         .encryption_context()
//!         .encrypt(4, BitWidth::U32, &diary, &alice)
//!         .unwrap();
//!     let handle = engine.verify_input(&input, &diary, &alice).await.unwrap();
//!     engine.allow(&handle, &alice).await.unwrap();
//! }
//! ```

pub mod ciphertext;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod mock;
pub mod sealed;

pub use ciphertext::{BitWidth, Ciphertext, EncryptedInput, EncryptionContext, InputProof};
pub use crypto::{TransportPublicKey, TransportSecret};
pub use engine::{FheEngine, UserDecryptRequest};
pub use error::{FheError, Result};
pub use mock::MockEngine;
pub use sealed::SealedValue;
