//! Plain JSON codec

use super::Codec;
use protorules_core::error::{Result, RuleError};
use protorules_core::types::Record;

const NAME: &str = "json";

/// Serde JSON of the record structure
///
/// The output names every representation explicitly (`literal`, `nullable`,
/// `list`, ...), so it round-trips without a descriptor.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    pretty: bool,
}

impl JsonCodec {
    /// Create a compact JSON codec
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable pretty printing
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        NAME
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(record)
        } else {
            serde_json::to_vec(record)
        };
        encoded.map_err(|e| RuleError::codec(NAME, e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        serde_json::from_slice(bytes).map_err(|e| RuleError::codec(NAME, e.to_string()))
    }
}
