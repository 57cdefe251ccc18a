//! # protorules
//!
//! Constraint validation, default injection and storage codecs for records
//! of schema-defined protobuf messages.
//!
//! ## Overview
//!
//! A checked [`DescriptorSet`](protorules_core::descriptor::DescriptorSet)
//! describes every message: its fields, their presence model, their rules,
//! defaults and gates. This crate interprets that table:
//!
//! - **Validation**: first-violation-wins evaluation of comparison,
//!   membership, length, pattern, format, uniqueness and presence rules
//! - **Defaults**: presence-aware default injection; literal scalars are
//!   treated as unset when zero, everything else only while absent
//! - **Codecs**: plain JSON, schema-aware JSON and compact binary encodings,
//!   selected per message type
//!
//! ## Quick Start
//!
//! ```rust
//! use protorules_service::prelude::*;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let set = DescriptorSet::new([MessageDescriptor::new(
//!     "Config",
//!     vec![
//!         FieldDescriptor::literal("retries", ScalarKind::Int32)
//!             .with_default_scalar(3)
//!             .with_rule(Constraint::lte(10)),
//!         FieldDescriptor::nullable("timeout", ScalarKind::Int32).with_default_scalar(0),
//!     ],
//! )])?;
//!
//! let mut record = Record::new("Config");
//! apply_defaults(&set, Some(&mut record));
//! assert_eq!(record.get("retries"), Some(&FieldValue::Literal(Scalar::Int(3))));
//! assert!(validate(&set, Some(&record)).is_ok());
//!
//! let record = record.with_literal("retries", 11);
//! let violation = validate(&set, Some(&record)).unwrap_err();
//! assert_eq!(
//!     violation.to_string(),
//!     "Config: field 'retries' must be less than or equal to 10 with 11"
//! );
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::unused_self)]
#![allow(clippy::only_used_in_recursion)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::missing_errors_doc)]

/// Record validation and default injection
pub mod validator;

/// Storage codecs
pub mod codec;

/// Commonly used types
pub mod prelude;

pub use codec::{BinaryCodec, Codec, JsonCodec, SchemaJsonCodec, codec_for, codec_with_settings};
pub use validator::{
    DefaultApplier, FieldDescription, ValidationResult, Validator, Violation, apply_defaults,
    validate,
};

pub use protorules_core;
