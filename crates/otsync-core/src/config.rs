//! Transform configuration.

use crate::transform::{Side, TransformError};
use serde::{Deserialize, Serialize};

/// Limits and preprocessing applied by [`crate::transform::transform_with`].
///
/// Hosts usually embed this in their own settings; every field has a default
/// so partial documents deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransformConfig {
    /// Reject input sequences longer than this
    pub max_sequence_len: Option<usize>,

    /// Upper bound on single-diff rule invocations per transform
    pub max_pair_steps: usize,

    /// Squash both inputs before transforming
    pub squash_inputs: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            max_sequence_len: None,
            max_pair_steps: 1_000_000,
            squash_inputs: false,
        }
    }
}

impl TransformConfig {
    /// Load configuration from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns error if the document is not valid JSON or has wrong types.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns error if a limit is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_pair_steps == 0 {
            return Err(ConfigError::Invalid("maxPairSteps must be positive".to_string()));
        }
        if self.max_sequence_len == Some(0) {
            return Err(ConfigError::Invalid(
                "maxSequenceLen must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn check_len(&self, side: Side, len: usize) -> Result<(), TransformError> {
        match self.max_sequence_len {
            Some(limit) if len > limit => Err(TransformError::SequenceTooLong { side, len, limit }),
            _ => Ok(()),
        }
    }
}

/// Errors for loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Document could not be parsed
    #[error("invalid transform config: {0}")]
    Parse(String),
    /// Document parsed but a value is out of range
    #[error("invalid transform config: {0}")]
    Invalid(String),
}
