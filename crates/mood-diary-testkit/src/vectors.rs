//! Golden vectors for the canonical messages.
//!
//! Any client that signs authorizations or computes input proofs must
//! produce these exact bytes.

use mood_diary_core::{authorization_message, input_binding_message, Identity, ResourceId};

/// A golden authorization message.
#[derive(Debug, Clone)]
pub struct AuthorizationVector {
    pub name: &'static str,
    pub grantee: [u8; 32],
    /// Resources in the order given to the encoder.
    pub resources: &'static [[u8; 32]],
    pub start_secs: u64,
    pub duration_days: u32,
    pub transport_public: [u8; 32],
    /// Full message (domain prefix included), hex.
    pub expected: &'static str,
}

/// A golden input binding message.
#[derive(Debug, Clone)]
pub struct InputBindingVector {
    pub name: &'static str,
    pub resource: [u8; 32],
    pub submitter: [u8; 32],
    pub bit_width: u8,
    pub ciphertext_digest: [u8; 32],
    pub expected: &'static str,
}

pub fn authorization_vectors() -> Vec<AuthorizationVector> {
    vec![AuthorizationVector {
        name: "two resources given out of order, one year",
        grantee: [0x11; 32],
        resources: &[[0x33; 32], [0x22; 32]],
        start_secs: 1_700_000_000,
        duration_days: 365,
        transport_public: [0x44; 32],
        expected: concat!(
            "6d6f6f642d64696172792f757365722d646563727970742f763100",
            "a6",
            "00", "01",
            "01", "5820", "1111111111111111111111111111111111111111111111111111111111111111",
            "02", "82",
            "5820", "2222222222222222222222222222222222222222222222222222222222222222",
            "5820", "3333333333333333333333333333333333333333333333333333333333333333",
            "03", "1a6553f100",
            "04", "19016d",
            "05", "5820", "4444444444444444444444444444444444444444444444444444444444444444",
        ),
    }]
}

pub fn input_binding_vectors() -> Vec<InputBindingVector> {
    vec![InputBindingVector {
        name: "32-bit input",
        resource: [0x22; 32],
        submitter: [0x11; 32],
        bit_width: 32,
        ciphertext_digest: [0x55; 32],
        expected: concat!(
            "6d6f6f642d64696172792f696e7075742d62696e64696e672f763100",
            "a5",
            "00", "01",
            "01", "5820", "2222222222222222222222222222222222222222222222222222222222222222",
            "02", "5820", "1111111111111111111111111111111111111111111111111111111111111111",
            "03", "1820",
            "04", "5820", "5555555555555555555555555555555555555555555555555555555555555555",
        ),
    }]
}

/// Encode an authorization vector's inputs, hex.
pub fn encode_authorization(vector: &AuthorizationVector) -> String {
    let resources: Vec<ResourceId> = vector
        .resources
        .iter()
        .map(|bytes| ResourceId::from_bytes(*bytes))
        .collect();

    authorization_message(
        &Identity::from_bytes(vector.grantee),
        &resources,
        vector.start_secs,
        vector.duration_days,
        &vector.transport_public,
    )
    .map(hex::encode)
    .unwrap_or_default()
}

/// Encode an input binding vector's inputs, hex.
pub fn encode_input_binding(vector: &InputBindingVector) -> String {
    input_binding_message(
        &ResourceId::from_bytes(vector.resource),
        &Identity::from_bytes(vector.submitter),
        vector.bit_width,
        &vector.ciphertext_digest,
    )
    .map(hex::encode)
    .unwrap_or_default()
}

/// Check every vector. Returns `(name, passed)` pairs.
pub fn verify_all_vectors() -> Vec<(&'static str, bool)> {
    let auth = authorization_vectors()
        .into_iter()
        .map(|v| (v.name, encode_authorization(&v) == v.expected));
    let input = input_binding_vectors()
        .into_iter()
        .map(|v| (v.name, encode_input_binding(&v) == v.expected));
    auth.chain(input).collect()
}
