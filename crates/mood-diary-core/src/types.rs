//! Strong type definitions for the mood diary.
//!
//! Identifiers are newtypes so that a diary id can never be passed where a
//! ciphertext handle is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Identity;
use crate::error::{CoreError, Result};

/// Identifier of a single deployed diary.
///
/// All aggregate state, grants and decryption authorizations are scoped to a
/// resource. Derived from Blake3(owner || diary name).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(#[serde(with = "crate::serde_fixed")] pub [u8; 32]);

impl ResourceId {
    /// Derive a resource id from the deploying identity and a diary name.
    pub fn derive(owner: &Identity, name: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"mood-diary-resource-v1:");
        hasher.update(owner.as_bytes());
        hasher.update(b":");
        hasher.update(name.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        Ok(Self(decode_hex32(s)?))
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for ResourceId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// An opaque reference to a ciphertext held by the encryption engine.
///
/// A handle never carries plaintext. [`CiphertextHandle::EMPTY`] is the
/// well-known "no value yet" sentinel returned by every interface that has
/// nothing to hand out; consumers must check [`is_empty`](Self::is_empty)
/// before attempting decryption.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CiphertextHandle(#[serde(with = "crate::serde_fixed")] pub [u8; 32]);

impl CiphertextHandle {
    /// The empty-handle sentinel (all zero).
    pub const EMPTY: Self = Self([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the empty sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        Ok(Self(decode_hex32(s)?))
    }
}

impl Default for CiphertextHandle {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "CiphertextHandle(EMPTY)")
        } else {
            write!(f, "CiphertextHandle({})", &self.to_hex()[..16])
        }
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl TryFrom<&[u8]> for CiphertextHandle {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> std::result::Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

fn decode_hex32(s: &str) -> std::result::Result<[u8; 32], hex::FromHexError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s)?;
    bytes
        .try_into()
        .map_err(|_| hex::FromHexError::InvalidStringLength)
}

/// A plaintext mood score.
///
/// Only ever constructed on the submitting client, right before encryption.
/// It is not serializable and its `Debug` output is redacted.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Score(u8);

impl Score {
    /// Lowest accepted score.
    pub const MIN: u32 = 1;
    /// Highest accepted score.
    pub const MAX: u32 = 5;

    /// Validate a raw value into a score.
    pub fn new(value: u32) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(CoreError::OutOfRange {
                value,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u32 {
        u32::from(self.0)
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Score(<redacted>)")
    }
}
