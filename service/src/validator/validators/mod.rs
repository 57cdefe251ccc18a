//! Validators for scalar constraint families
//!
//! Each validator owns a group of constraint operators. The engine hands a
//! scalar and one rule to the [`ValidatorRegistry`], which dispatches to the
//! validator that owns the operator.

use protorules_core::constraint::Constraint;
use protorules_core::types::Scalar;

pub mod format_validators;
pub mod range_validator;
pub mod string_constraints;
pub mod unique_key_validator;

pub use format_validators::FormatValidator;
pub use range_validator::RangeValidator;
pub use string_constraints::StringConstraintValidator;
pub use unique_key_validator::UniqueValueTracker;

/// Trait for all scalar validators
pub trait ScalarValidator: Send + Sync {
    /// Whether this validator evaluates `rule`
    fn handles(&self, rule: &Constraint) -> bool;

    /// Whether `value` satisfies `rule`
    fn check(&self, rule: &Constraint, value: &Scalar) -> bool;

    /// Get the validator name
    fn name(&self) -> &str;
}

/// Registry of scalar validators
pub struct ValidatorRegistry {
    validators: Vec<Box<dyn ScalarValidator>>,
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorRegistry {
    /// Create a registry with the built-in validators
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: vec![
                Box::new(RangeValidator::new()),
                Box::new(StringConstraintValidator::new()),
                Box::new(FormatValidator::new()),
            ],
        }
    }

    /// Validator that owns `rule`
    #[must_use]
    pub fn validator_for(&self, rule: &Constraint) -> Option<&dyn ScalarValidator> {
        self.validators
            .iter()
            .find(|v| v.handles(rule))
            .map(AsRef::as_ref)
    }

    /// Whether `value` satisfies `rule`
    ///
    /// Rules no validator owns (presence and collection rules) hold trivially
    /// here; the engine evaluates those itself.
    #[must_use]
    pub fn check(&self, rule: &Constraint, value: &Scalar) -> bool {
        match self.validator_for(rule) {
            Some(validator) => validator.check(rule, value),
            None => true,
        }
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.validators.iter().map(|v| v.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protorules_core::constraint::{Comparison, StringFormat};

    #[test]
    fn test_dispatch() {
        let registry = ValidatorRegistry::new();
        let name = |rule: &Constraint| registry.validator_for(rule).map(|v| v.name());

        assert_eq!(name(&Constraint::gt(1)), Some("range_validator"));
        assert_eq!(
            name(&Constraint::ByteLen(Comparison::Eq, 1)),
            Some("string_constraint_validator")
        );
        assert_eq!(
            name(&Constraint::Format(StringFormat::Hex)),
            Some("format_validator")
        );
        assert_eq!(name(&Constraint::NotNull), None);
        assert!(registry.check(&Constraint::Unique, &Scalar::Int(1)));
    }
}
