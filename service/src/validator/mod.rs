//! Validation and defaulting engines for protobuf-style records
//!
//! Both engines interpret the rule tables of a checked
//! [`DescriptorSet`](protorules_core::descriptor::DescriptorSet):
//!
//! - [`Validator`] walks a record and returns the first broken constraint
//! - [`DefaultApplier`] fills in configured defaults under a presence-aware
//!   overwrite policy
//!
//! Neither depends on the other; callers usually apply defaults first and
//! validate afterwards.

pub mod default_applier;
pub mod engine;
pub mod report;
pub mod validators;

pub use default_applier::{DefaultApplier, apply_defaults};
pub use engine::{ValidationResult, Validator, validate};
pub use report::{FieldDescription, Violation, requirement};
pub use validators::{ScalarValidator, ValidatorRegistry};
