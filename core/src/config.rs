//! Settings for the validation and codec layers
//!
//! Every section has `#[serde(default)]`, so a settings document only needs
//! the keys it changes.

use crate::descriptor::CodecKind;
use crate::error::{Result, RuleError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Validation settings
    pub validation: ValidationSettings,

    /// Codec settings
    pub codec: CodecSettings,
}

/// Validation settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Longest rendered value echoed in a violation before it is truncated
    pub max_value_len: usize,
}

/// Codec settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecSettings {
    /// Codec for messages without a codec annotation
    pub default: CodecKind,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self { max_value_len: 256 }
    }
}

impl Settings {
    /// Parse settings from YAML
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or the values are out
    /// of range.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidSettings`] for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        // room for at least one character plus the ellipsis
        if self.validation.max_value_len < 4 {
            return Err(RuleError::InvalidSettings(
                "validation.max_value_len must be at least 4".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings for tests: short echoed values, pretty JSON
    #[must_use]
    pub fn testing() -> Self {
        let mut settings = Self::default();
        settings.validation.max_value_len = 32;
        settings.codec.pretty = true;
        settings
    }
}
