//! # protorules core
//!
//! Field presence model for protobuf-style records: scalar kinds and values,
//! record instances, the closed constraint set, field descriptors with their
//! defaults and gates, and the checked descriptor registry.
//!
//! Descriptors are data. They are built once, from Rust builders or from a
//! YAML/JSON document, checked by [`DescriptorSet::new`] and then shared
//! read-only by the validation and defaulting engines.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)]

/// Error types for building and loading rule tables
pub mod error;

/// Scalar kinds, values and record instances
pub mod types;

/// Constraint operators
pub mod constraint;

/// Field and message descriptors
pub mod descriptor;

/// Settings for validation and codecs
pub mod config;

mod check;

pub use config::Settings;
pub use constraint::{Comparison, Constraint, Pattern, StringFormat};
pub use descriptor::{
    CodecKind, Condition, DefaultValue, DescriptorSet, ElementType, FieldCategory,
    FieldDescriptor, FieldShape, MessageDescriptor,
};
pub use error::{Result, RuleError};
pub use types::{Element, FieldValue, MapKey, Record, Scalar, ScalarFamily, ScalarKind, Variant};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::constraint::{Comparison, Constraint, StringFormat};
    pub use crate::descriptor::{
        CodecKind, Condition, DefaultValue, DescriptorSet, ElementType, FieldDescriptor,
        MessageDescriptor,
    };
    pub use crate::error::{Result, RuleError};
    pub use crate::types::{Element, FieldValue, MapKey, Record, Scalar, ScalarKind, Variant};
}
