//! Storage codecs for record instances
//!
//! Each message type is stored with the codec named by its descriptor's
//! `codec` annotation, or the configured default when it has none:
//!
//! - [`JsonCodec`]: serde JSON of the record structure itself
//! - [`SchemaJsonCodec`]: a JSON object keyed by field names, decoded against
//!   the descriptor
//! - [`BinaryCodec`]: compact `bincode` encoding

pub mod binary;
pub mod json;
pub mod schema_json;

pub use binary::BinaryCodec;
pub use json::JsonCodec;
pub use schema_json::SchemaJsonCodec;

use protorules_core::config::CodecSettings;
use protorules_core::descriptor::{CodecKind, DescriptorSet};
use protorules_core::error::{Result, RuleError};
use protorules_core::types::Record;
use tracing::debug;

/// Encode and decode records to and from bytes
///
/// Codecs are pure: no I/O and no shared state, so one instance can be used
/// from several threads.
pub trait Codec: Send + Sync {
    /// Codec name, used in error messages
    fn name(&self) -> &'static str;

    /// Encode a record
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::CodecError`] if the record cannot be represented.
    fn encode(&self, record: &Record) -> Result<Vec<u8>>;

    /// Decode a record
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::CodecError`] for malformed input.
    fn decode(&self, bytes: &[u8]) -> Result<Record>;
}

/// Codec for `message` under default codec settings
///
/// # Errors
///
/// Returns [`RuleError::UnknownMessage`] if `message` is not in `set`.
pub fn codec_for<'a>(set: &'a DescriptorSet, message: &str) -> Result<Box<dyn Codec + 'a>> {
    codec_with_settings(set, message, &CodecSettings::default())
}

/// Codec for `message`, falling back to `settings.default` when the message
/// carries no codec annotation
///
/// # Errors
///
/// Returns [`RuleError::UnknownMessage`] if `message` is not in `set`.
pub fn codec_with_settings<'a>(
    set: &'a DescriptorSet,
    message: &str,
    settings: &CodecSettings,
) -> Result<Box<dyn Codec + 'a>> {
    let descriptor = set
        .message(message)
        .ok_or_else(|| RuleError::UnknownMessage(message.to_string()))?;
    let kind = descriptor.codec.unwrap_or(settings.default);
    debug!(message_type = message, codec = ?kind, "codec selected");

    let codec: Box<dyn Codec + 'a> = match kind {
        CodecKind::Json => Box::new(JsonCodec::new().with_pretty(settings.pretty)),
        CodecKind::SchemaJson => Box::new(
            SchemaJsonCodec::new(set, &descriptor.name)?.with_pretty(settings.pretty),
        ),
        CodecKind::Binary => Box::new(BinaryCodec::new()),
    };
    Ok(codec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protorules_core::descriptor::{FieldDescriptor, MessageDescriptor};
    use protorules_core::types::ScalarKind;
    use pretty_assertions::assert_eq;

    fn set() -> anyhow::Result<DescriptorSet> {
        Ok(DescriptorSet::new([
            MessageDescriptor::new(
                "Plain",
                vec![FieldDescriptor::literal("id", ScalarKind::Int64)],
            ),
            MessageDescriptor::new(
                "Packed",
                vec![FieldDescriptor::literal("id", ScalarKind::Int64)],
            )
            .with_codec(CodecKind::Binary),
        ])?)
    }

    #[test]
    fn test_annotation_selects_codec() -> anyhow::Result<()> {
        let set = set()?;
        assert_eq!(codec_for(&set, "Packed")?.name(), "binary");
        assert_eq!(codec_for(&set, "Plain")?.name(), "schema_json");

        let settings = CodecSettings {
            default: CodecKind::Json,
            pretty: false,
        };
        assert_eq!(codec_with_settings(&set, "Plain", &settings)?.name(), "json");
        // annotations win over the configured default
        assert_eq!(codec_with_settings(&set, "Packed", &settings)?.name(), "binary");
        Ok(())
    }

    #[test]
    fn test_unknown_message() -> anyhow::Result<()> {
        let set = set()?;
        let err = codec_for(&set, "Missing").err();
        assert!(matches!(err, Some(RuleError::UnknownMessage(name)) if name == "Missing"));
        Ok(())
    }
}
