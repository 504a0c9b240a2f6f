//! # Mood Diary Core
//!
//! Pure primitives shared by every part of the encrypted mood diary.
//!
//! This crate contains no I/O, no storage and no homomorphic arithmetic. It
//! defines the identifiers that address a diary and its ciphertexts, the
//! long-term signing identities of participants, the bounded [`Score`] type,
//! and the canonical byte messages that input proofs and decryption
//! authorizations are computed over.
//!
//! ## Key Types
//!
//! - [`ResourceId`] - Identifier of one deployed diary
//! - [`CiphertextHandle`] - Opaque reference to a ciphertext, with [`CiphertextHandle::EMPTY`] as sentinel
//! - [`Identity`] - Ed25519 public key of a participant
//! - [`SigningKeypair`] - Long-term signing key held by a participant's signer
//! - [`Score`] - Plaintext mood score, 1 to 5 inclusive
//!
//! ## Canonicalization
//!
//! Signed and MACed messages use deterministic CBOR. See the [`canonical`] module.

pub mod canonical;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod serde_fixed;
pub mod types;

pub use canonical::{authorization_message, input_binding_message, AUTHORIZATION_DOMAIN};
pub use clock::{Clock, ManualClock, SystemClock};
pub use crypto::{Identity, Signature, SigningKeypair};
pub use error::{CoreError, Result};
pub use types::{CiphertextHandle, ResourceId, Score};
