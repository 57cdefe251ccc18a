//! Compact binary codec

use super::Codec;
use protorules_core::error::{Result, RuleError};
use protorules_core::types::Record;

const NAME: &str = "binary";

/// `bincode` encoding of the record structure
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

impl BinaryCodec {
    /// Create a binary codec
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Codec for BinaryCodec {
    fn name(&self) -> &'static str {
        NAME
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        bincode::serialize(record)
            .map_err(|e| RuleError::codec(NAME, format!("serialization failed: {e}")))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        bincode::deserialize(bytes)
            .map_err(|e| RuleError::codec(NAME, format!("deserialization failed: {e}")))
    }
}
