//! Diary configuration.

use serde::{Deserialize, Serialize};

use mood_diary_fhe::BitWidth;

use crate::error::{DiaryError, Result};

/// Configuration for a diary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiaryConfig {
    /// Bit width every submitted ciphertext must declare.
    pub input_bit_width: BitWidth,

    /// Whether a submission re-authorizes every grantee for the new trend
    /// handle. When off, only the submitter is authorized and other grantees
    /// refresh through `request_access`.
    pub authorize_all_grantees_on_submit: bool,
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            input_bit_width: BitWidth::U32,
            authorize_all_grantees_on_submit: true,
        }
    }
}

impl DiaryConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DiaryError::InvalidConfig(e.to_string()))
    }
}
