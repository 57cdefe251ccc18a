//! Prelude module for protorules
//!
//! This module re-exports commonly used types and functions for convenient import.

// Re-export core types
pub use protorules_core::prelude::*;

// Re-export validation and defaulting
pub use crate::validator::{
    DefaultApplier, FieldDescription, ValidationResult, Validator, Violation, apply_defaults,
    validate,
};

// Re-export codecs
pub use crate::codec::{BinaryCodec, Codec, JsonCodec, SchemaJsonCodec, codec_for};
