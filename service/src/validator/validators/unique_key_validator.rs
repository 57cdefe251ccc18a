//! Duplicate detection for sequences with a `unique` rule

use protorules_core::types::{Element, Record, Scalar};
use std::collections::HashSet;
use std::sync::Arc;

/// Hashable view of a non-float scalar
#[derive(Debug, PartialEq, Eq, Hash)]
enum ScalarKey<'a> {
    Int(i64),
    Uint(u64),
    Bool(bool),
    Str(&'a str),
    Bytes(&'a [u8]),
    Enum(i32),
}

/// Tracks the elements of one sequence seen so far
///
/// Scalars compare by value with IEEE float equality, so NaN never
/// duplicates. Records compare by identity: two distinct records with equal
/// content are different elements.
#[derive(Debug, Default)]
pub struct UniqueValueTracker<'a> {
    scalars: HashSet<ScalarKey<'a>>,
    floats: Vec<f64>,
    records: HashSet<*const Record>,
}

impl<'a> UniqueValueTracker<'a> {
    /// Create a new unique value tracker
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an element; returns true if it was seen before
    pub fn check_and_record(&mut self, element: &'a Element) -> bool {
        let key = match element {
            Element::Record(record) => return !self.records.insert(Arc::as_ptr(record)),
            Element::Scalar(Scalar::Float(value)) => {
                // floats are not hashable; `==` keeps NaN distinct
                if self.floats.iter().any(|seen| seen == value) {
                    return true;
                }
                self.floats.push(*value);
                return false;
            }
            Element::Scalar(Scalar::Int(v)) => ScalarKey::Int(*v),
            Element::Scalar(Scalar::Uint(v)) => ScalarKey::Uint(*v),
            Element::Scalar(Scalar::Bool(v)) => ScalarKey::Bool(*v),
            Element::Scalar(Scalar::Str(v)) => ScalarKey::Str(v),
            Element::Scalar(Scalar::Bytes(v)) => ScalarKey::Bytes(v),
            Element::Scalar(Scalar::Enum(v)) => ScalarKey::Enum(*v),
        };
        !self.scalars.insert(key)
    }

    /// First element that repeats an earlier one
    #[must_use]
    pub fn first_duplicate(items: &'a [Element]) -> Option<&'a Element> {
        let mut tracker = Self::new();
        items.iter().find(|&item| tracker.check_and_record(item))
    }
}
