//! Packaging plaintext scores into encrypted inputs.

use tracing::debug;

use mood_diary_core::{Identity, ResourceId, Score};
use mood_diary_fhe::{BitWidth, EncryptedInput, EncryptionContext};

use crate::error::Result;

/// Encrypts scores for one diary engine.
#[derive(Debug, Clone)]
pub struct EncryptedInputBuilder {
    context: EncryptionContext,
    bit_width: BitWidth,
}

impl EncryptedInputBuilder {
    pub fn new(context: EncryptionContext) -> Self {
        Self {
            context,
            bit_width: BitWidth::U32,
        }
    }

    pub fn with_bit_width(mut self, bit_width: BitWidth) -> Self {
        self.bit_width = bit_width;
        self
    }

    /// Validate `score` and encrypt it bound to `(resource, submitter)`.
    ///
    /// Fails with `OutOfRange` outside `1..=5`. The plaintext is never logged.
    pub fn build(&self, resource: &ResourceId, submitter: &Identity, score: u32) -> Result<EncryptedInput> {
        let score = Score::new(score)?;
        let input = self
            .context
            .encrypt(u64::from(score.value()), self.bit_width, resource, submitter)?;

        debug!(resource = ?resource, submitter = ?submitter, "input encrypted");
        Ok(input)
    }
}
