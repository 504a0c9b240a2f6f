//! Canonical CBOR messages.
//!
//! Two messages are signed or MACed in this system:
//!
//! - the **authorization message** a grantee signs to prove, off-chain, that
//!   it may decrypt handles of a set of resources for a validity window;
//! - the **input binding** an input proof is computed over, which ties a
//!   fresh ciphertext to one submitter and one diary.
//!
//! Both are a domain-separation prefix followed by a CBOR map with small
//! integer keys, encoded per RFC 8949 Core Deterministic Encoding:
//! keys sorted by encoded bytes, smallest integer encodings, definite lengths,
//! no floats. The same inputs always produce identical bytes.

use ciborium::value::{Integer, Value};

use crate::crypto::Identity;
use crate::error::{CoreError, Result};
use crate::types::ResourceId;

/// Domain prefix of the authorization message.
pub const AUTHORIZATION_DOMAIN: &[u8] = b"mood-diary/user-decrypt/v1\0";

/// Domain prefix of the input binding message.
pub const INPUT_BINDING_DOMAIN: &[u8] = b"mood-diary/input-binding/v1\0";

/// Current layout version of both messages.
pub const MESSAGE_VERSION: u64 = 1;

mod auth_keys {
    pub const VERSION: u64 = 0;
    pub const GRANTEE: u64 = 1;
    pub const RESOURCES: u64 = 2;
    pub const START: u64 = 3;
    pub const DURATION_DAYS: u64 = 4;
    pub const TRANSPORT_KEY: u64 = 5;
}

mod input_keys {
    pub const VERSION: u64 = 0;
    pub const RESOURCE: u64 = 1;
    pub const SUBMITTER: u64 = 2;
    pub const BIT_WIDTH: u64 = 3;
    pub const CIPHERTEXT_DIGEST: u64 = 4;
}

/// Build the message a grantee signs to authorize decryption.
///
/// The resource list is sorted and deduplicated before encoding, so any
/// ordering of the same set yields the same message.
pub fn authorization_message(
    grantee: &Identity,
    resources: &[ResourceId],
    start_secs: u64,
    duration_days: u32,
    transport_public: &[u8; 32],
) -> Result<Vec<u8>> {
    let mut sorted = resources.to_vec();
    sorted.sort();
    sorted.dedup();

    let resources_value = Value::Array(
        sorted
            .iter()
            .map(|r| Value::Bytes(r.as_bytes().to_vec()))
            .collect(),
    );

    let map = Value::Map(vec![
        (uint(auth_keys::VERSION), uint(MESSAGE_VERSION)),
        (uint(auth_keys::GRANTEE), Value::Bytes(grantee.as_bytes().to_vec())),
        (uint(auth_keys::RESOURCES), resources_value),
        (uint(auth_keys::START), uint(start_secs)),
        (uint(auth_keys::DURATION_DAYS), uint(u64::from(duration_days))),
        (uint(auth_keys::TRANSPORT_KEY), Value::Bytes(transport_public.to_vec())),
    ]);

    let mut buf = AUTHORIZATION_DOMAIN.to_vec();
    encode_value_to(&mut buf, &map)?;
    Ok(buf)
}

/// Build the message an input proof is bound to.
pub fn input_binding_message(
    resource: &ResourceId,
    submitter: &Identity,
    bit_width: u8,
    ciphertext_digest: &[u8; 32],
) -> Result<Vec<u8>> {
    let map = Value::Map(vec![
        (uint(input_keys::VERSION), uint(MESSAGE_VERSION)),
        (uint(input_keys::RESOURCE), Value::Bytes(resource.as_bytes().to_vec())),
        (uint(input_keys::SUBMITTER), Value::Bytes(submitter.as_bytes().to_vec())),
        (uint(input_keys::BIT_WIDTH), uint(u64::from(bit_width))),
        (
            uint(input_keys::CIPHERTEXT_DIGEST),
            Value::Bytes(ciphertext_digest.to_vec()),
        ),
    ]);

    let mut buf = INPUT_BINDING_DOMAIN.to_vec();
    encode_value_to(&mut buf, &map)?;
    Ok(buf)
}

fn uint(n: u64) -> Value {
    Value::Integer(Integer::from(n))
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_head(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Text(s) => {
            encode_head(buf, 3, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        Value::Array(items) => {
            encode_head(buf, 4, items.len() as u64);
            for item in items {
                encode_value_to(buf, item)?;
            }
        }
        Value::Map(entries) => encode_map_canonical(buf, entries)?,
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Null => buf.push(0xf6),
        other => {
            return Err(CoreError::Encoding(format!(
                "unsupported value in canonical encoding: {:?}",
                other
            )))
        }
    }
    Ok(())
}

fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_head(buf, 0, n as u64);
    } else {
        // -1 encodes as 0, -2 as 1, ...
        encode_head(buf, 1, (-1 - n) as u64);
    }
}

/// Write a major type with its argument in the shortest form.
fn encode_head(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | n as u8);
    } else if n <= u64::from(u8::MAX) {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= u64::from(u16::MAX) {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= u64::from(u32::MAX) {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_map_canonical(buf: &mut Vec<u8>, entries: &[(Value, Value)]) -> Result<()> {
    let mut encoded = Vec::with_capacity(entries.len());
    for (k, v) in entries {
        let mut key_buf = Vec::new();
        encode_value_to(&mut key_buf, k)?;
        encoded.push((key_buf, v));
    }
    encoded.sort_by(|a, b| a.0.cmp(&b.0));

    encode_head(buf, 5, encoded.len() as u64);
    for (key_bytes, value) in encoded {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value)?;
    }
    Ok(())
}
