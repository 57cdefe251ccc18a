//! Equality, ordering and set membership for scalar values

use super::ScalarValidator;
use protorules_core::constraint::Constraint;
use protorules_core::types::Scalar;
use std::cmp::Ordering;

/// Validator for `compare`, `in` and `not_in`
pub struct RangeValidator {
    name: String,
}

impl Default for RangeValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeValidator {
    /// Create a new range validator
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "range_validator".to_string(),
        }
    }
}

/// Order two scalars of the same family in its native representation
///
/// Returns `None` across families and whenever a NaN is involved.
#[must_use]
pub fn compare(actual: &Scalar, expected: &Scalar) -> Option<Ordering> {
    match (actual, expected) {
        (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
        (Scalar::Uint(a), Scalar::Uint(b)) => Some(a.cmp(b)),
        (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b),
        (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
        (Scalar::Str(a), Scalar::Str(b)) => Some(a.cmp(b)),
        (Scalar::Bytes(a), Scalar::Bytes(b)) => Some(a.cmp(b)),
        (Scalar::Enum(a), Scalar::Enum(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn is_member(value: &Scalar, set: &[Scalar]) -> bool {
    set.iter()
        .any(|candidate| compare(value, candidate) == Some(Ordering::Equal))
}

impl ScalarValidator for RangeValidator {
    fn handles(&self, rule: &Constraint) -> bool {
        matches!(
            rule,
            Constraint::Compare(..) | Constraint::In(_) | Constraint::NotIn(_)
        )
    }

    fn check(&self, rule: &Constraint, value: &Scalar) -> bool {
        match rule {
            Constraint::Compare(op, expected) => op.holds(compare(value, expected)),
            Constraint::In(set) => is_member(value, set),
            Constraint::NotIn(set) => !is_member(value, set),
            _ => true,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
