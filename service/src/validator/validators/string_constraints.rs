//! Length and string-shape constraints
//!
//! String values are checked as text. Bytes values are checked against their
//! raw bytes, except for the character-based rules, which decode them.

use super::ScalarValidator;
use protorules_core::constraint::Constraint;
use protorules_core::types::Scalar;
use std::borrow::Cow;

/// Validator for byte and character lengths, regex, affixes and containment
pub struct StringConstraintValidator {
    name: String,
}

impl Default for StringConstraintValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl StringConstraintValidator {
    /// Create a new string constraint validator
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "string_constraint_validator".to_string(),
        }
    }
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

/// Decoded text of a string or bytes value
fn text(value: &Scalar) -> Option<Cow<'_, str>> {
    match value {
        Scalar::Str(s) => Some(Cow::Borrowed(s)),
        Scalar::Bytes(b) => Some(String::from_utf8_lossy(b)),
        _ => None,
    }
}

impl ScalarValidator for StringConstraintValidator {
    fn handles(&self, rule: &Constraint) -> bool {
        matches!(
            rule,
            Constraint::ByteLen(..)
                | Constraint::CharLen(..)
                | Constraint::Regex(_)
                | Constraint::Prefix(_)
                | Constraint::NoPrefix(_)
                | Constraint::Suffix(_)
                | Constraint::NoSuffix(_)
                | Constraint::Contains(_)
                | Constraint::NotContains(_)
                | Constraint::ContainsAny(_)
                | Constraint::NotContainsAny(_)
        )
    }

    fn check(&self, rule: &Constraint, value: &Scalar) -> bool {
        let Some(bytes) = value.as_bytes() else {
            return false;
        };

        match rule {
            Constraint::ByteLen(op, n) => op.holds(Some(bytes.len().cmp(n))),
            Constraint::CharLen(op, n) => {
                text(value).is_some_and(|t| op.holds(Some(t.chars().count().cmp(n))))
            }
            Constraint::Regex(pattern) => match value {
                Scalar::Str(s) => pattern.is_match(s),
                _ => pattern.is_match_bytes(bytes),
            },
            Constraint::Prefix(p) => bytes.starts_with(p.as_bytes()),
            Constraint::NoPrefix(p) => !bytes.starts_with(p.as_bytes()),
            Constraint::Suffix(s) => bytes.ends_with(s.as_bytes()),
            Constraint::NoSuffix(s) => !bytes.ends_with(s.as_bytes()),
            Constraint::Contains(s) => contains_bytes(bytes, s.as_bytes()),
            Constraint::NotContains(s) => !contains_bytes(bytes, s.as_bytes()),
            Constraint::ContainsAny(chars) => {
                text(value).is_some_and(|t| t.chars().any(|c| chars.contains(c)))
            }
            Constraint::NotContainsAny(chars) => {
                text(value).is_some_and(|t| !t.chars().any(|c| chars.contains(c)))
            }
            _ => true,
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
