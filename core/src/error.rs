//! Error types for rule table construction, loading and encoding
//!
//! Constraint violations found while validating a record are not errors of
//! this kind; they are reported through the validator's own outcome type.
//! Everything here is a build-time or I/O problem.

use thiserror::Error;

/// Main error type for rule table operations
#[derive(Error, Debug)]
pub enum RuleError {
    /// A constraint is not applicable to the field it is attached to
    #[error("invalid rule on {message}.{field}: {reason}")]
    InvalidRule {
        /// Message that declares the field
        message: String,
        /// Field carrying the rule
        field: String,
        /// Why the rule is rejected
        reason: String,
    },

    /// A default value does not match the field it is attached to
    #[error("invalid default on {message}.{field}: {reason}")]
    InvalidDefault {
        /// Message that declares the field
        message: String,
        /// Field carrying the default
        field: String,
        /// Why the default is rejected
        reason: String,
    },

    /// A gate refers to something that does not exist or cannot be tested
    #[error("invalid gate on {message}.{field}: {reason}")]
    InvalidGate {
        /// Message that declares the field
        message: String,
        /// Field carrying the gate
        field: String,
        /// Why the gate is rejected
        reason: String,
    },

    /// A field shape is malformed (bad map key kind, bad union member, ...)
    #[error("invalid field {message}.{field}: {reason}")]
    InvalidField {
        /// Message that declares the field
        message: String,
        /// Offending field
        field: String,
        /// Why the field is rejected
        reason: String,
    },

    /// Two fields of one message share a name
    #[error("duplicate field '{field}' in message '{message}'")]
    DuplicateField {
        /// Message that declares the fields
        message: String,
        /// Repeated name
        field: String,
    },

    /// Two messages share a name
    #[error("duplicate message '{0}'")]
    DuplicateMessage(String),

    /// A referenced message type is not part of the descriptor set
    #[error("unknown message type '{0}'")]
    UnknownMessage(String),

    /// A regular expression failed to compile
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// Pattern source text
        pattern: String,
        /// Compilation error
        #[source]
        source: regex::Error,
    },

    /// Descriptor or settings document could not be parsed
    #[error("failed to parse {format} document: {message}")]
    ParseError {
        /// Document format (yaml, json)
        format: &'static str,
        /// Parser message
        message: String,
    },

    /// Encoding or decoding a record failed
    #[error("{codec} codec error: {message}")]
    CodecError {
        /// Codec name
        codec: &'static str,
        /// Error message
        message: String,
    },

    /// Settings failed validation
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for rule table operations
pub type Result<T> = std::result::Result<T, RuleError>;

impl RuleError {
    /// Create an invalid rule error
    #[must_use]
    pub fn invalid_rule(
        message: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRule {
            message: message.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid default error
    #[must_use]
    pub fn invalid_default(
        message: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidDefault {
            message: message.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid gate error
    #[must_use]
    pub fn invalid_gate(
        message: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidGate {
            message: message.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid field error
    #[must_use]
    pub fn invalid_field(
        message: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            message: message.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a codec error
    #[must_use]
    pub fn codec(codec: &'static str, message: impl Into<String>) -> Self {
        Self::CodecError {
            codec,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for RuleError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            format: "json",
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for RuleError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ParseError {
            format: "yaml",
            message: err.to_string(),
        }
    }
}
