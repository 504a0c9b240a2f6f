//! Proptest generators for property-based testing.

use proptest::prelude::*;

use mood_diary_core::{Identity, ResourceId, Score, SigningKeypair};

/// A valid score value.
pub fn score() -> impl Strategy<Value = u32> {
    Score::MIN..=Score::MAX
}

/// A non-empty list of valid scores.
pub fn scores(max_len: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(score(), 1..=max_len.max(1))
}

/// A value the input builder must reject.
pub fn out_of_range_score() -> impl Strategy<Value = u32> {
    prop_oneof![Just(0u32), (Score::MAX + 1)..=u32::MAX]
}

pub fn signing_keypair() -> impl Strategy<Value = SigningKeypair> {
    any::<[u8; 32]>().prop_map(|seed| SigningKeypair::from_seed(&seed))
}

pub fn identity() -> impl Strategy<Value = Identity> {
    signing_keypair().prop_map(|kp| kp.identity())
}

pub fn resource_id() -> impl Strategy<Value = ResourceId> {
    any::<[u8; 32]>().prop_map(ResourceId::from_bytes)
}

/// The mean the trend must decrypt to: sum divided by count, truncated.
pub fn truncated_mean(scores: &[u32]) -> u32 {
    if scores.is_empty() {
        return 0;
    }
    let sum: u64 = scores.iter().map(|&s| u64::from(s)).sum();
    (sum / scores.len() as u64) as u32
}
