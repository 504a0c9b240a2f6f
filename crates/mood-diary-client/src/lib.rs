//! # Mood Diary Client
//!
//! Everything a participant runs locally.
//!
//! - [`EncryptedInputBuilder`] validates a score and encrypts it bound to the
//!   submitter and the diary.
//! - [`DecryptionAuthorizationProtocol`] obtains a signed, time-bounded
//!   authorization from the participant's [`MessageSigner`] and caches it.
//! - [`Decryptor`] turns a ciphertext handle into a plaintext using such an
//!   authorization.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mood_diary_client::{
//!     DecryptionAuthorizationProtocol, Decryptor, KeypairSigner, MemoryArtifactStorage,
//! };
//! use mood_diary_core::{CiphertextHandle, ResourceId, SigningKeypair};
//! use mood_diary_fhe::MockEngine;
//!
//! async fn example(engine: Arc<MockEngine>, diary: ResourceId, handle: CiphertextHandle) {
//!     let keypair = SigningKeypair::generate();
//!     let me = keypair.identity();
//!     let protocol =
//!         DecryptionAuthorizationProtocol::new(KeypairSigner::new(keypair), MemoryArtifactStorage::new());
//!
//!     let artifact = protocol.load_or_create(&[diary], &me).await.unwrap();
//!     let mean = Decryptor::new(engine).decrypt(&handle, &diary, &artifact).await.unwrap();
//! }
//! ```

pub mod authorization;
pub mod cache;
pub mod config;
pub mod decryptor;
pub mod error;
pub mod input;
pub mod protocol;
pub mod signer;

pub use authorization::{AuthorizationKey, DecryptionAuthorization};
pub use cache::{ArtifactStorage, AuthorizationCache, MemoryArtifactStorage};
pub use config::AuthorizationConfig;
pub use decryptor::Decryptor;
pub use error::{ClientError, Result};
pub use input::EncryptedInputBuilder;
pub use protocol::DecryptionAuthorizationProtocol;
pub use signer::{KeypairSigner, MessageSigner, SigningOutcome};
