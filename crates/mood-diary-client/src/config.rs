//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Settings for issuing decryption authorizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizationConfig {
    /// Validity window of a new authorization, in days.
    pub duration_days: u32,

    /// Most resources one authorization may cover.
    pub max_resources: usize,
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            duration_days: 365,
            max_resources: 10,
        }
    }
}

impl AuthorizationConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ClientError::InvalidRequest(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.duration_days == 0 {
            return Err(ClientError::InvalidRequest("duration_days must be positive".into()));
        }
        if self.max_resources == 0 {
            return Err(ClientError::InvalidRequest("max_resources must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AuthorizationConfig::default();
        assert_eq!(config.duration_days, 365);
        assert_eq!(config.max_resources, 10);
    }

    #[test]
    fn test_partial_json() {
        let config = AuthorizationConfig::from_json(r#"{"duration_days": 7}"#).unwrap();
        assert_eq!(config.duration_days, 7);
        assert_eq!(config.max_resources, 10);
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(AuthorizationConfig::from_json(r#"{"duration_days": 0}"#).is_err());
    }
}
