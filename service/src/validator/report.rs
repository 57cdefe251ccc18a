//! Violation reporting
//!
//! A [`Violation`] renders in one of two shapes:
//!
//! - `"<message>: <reason> with <value>"` when a value broke a rule
//! - `"<message>: <reason>"` for presence violations, where nothing exists to
//!   print
//!
//! `<reason>` joins the field description and the requirement, e.g.
//! `field 'qty' must be greater than 4`.

use protorules_core::constraint::{Comparison, Constraint, StringFormat};
use protorules_core::types::Scalar;
use std::fmt;

/// Which position of a field a violation refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDescription {
    /// The field itself
    Field(String),
    /// An element of a sequence field
    Item(String),
    /// A key of a mapping field
    MapKey(String),
    /// A value of a mapping field
    MapValue(String),
}

impl FieldDescription {
    /// Name of the field
    #[must_use]
    pub fn field_name(&self) -> &str {
        match self {
            Self::Field(name) | Self::Item(name) | Self::MapKey(name) | Self::MapValue(name) => {
                name
            }
        }
    }
}

impl fmt::Display for FieldDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "field '{name}'"),
            Self::Item(name) => write!(f, "array item where in field '{name}'"),
            Self::MapKey(name) => write!(f, "map key where in field '{name}'"),
            Self::MapValue(name) => write!(f, "map value where in field '{name}'"),
        }
    }
}

/// The first constraint a record broke
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// Message type of the record that holds the field
    pub message: String,
    /// Field position
    pub field: FieldDescription,
    /// The broken constraint
    pub constraint: Constraint,
    /// Rendered offending value; `None` for presence violations
    pub value: Option<String>,
}

impl Violation {
    /// A value broke `constraint`
    ///
    /// The rendered value is cut to `max_value_len` characters.
    pub fn with_value(
        message: impl Into<String>,
        field: FieldDescription,
        constraint: Constraint,
        value: &dyn fmt::Display,
        max_value_len: usize,
    ) -> Self {
        Self {
            message: message.into(),
            field,
            constraint,
            value: Some(truncate(value.to_string(), max_value_len)),
        }
    }

    /// Something required is absent
    pub fn absent(message: impl Into<String>, field: FieldDescription, constraint: Constraint) -> Self {
        Self {
            message: message.into(),
            field,
            constraint,
            value: None,
        }
    }

    /// Whether this is a presence violation
    #[must_use]
    pub fn is_presence(&self) -> bool {
        self.value.is_none()
    }

    /// Reason text, e.g. `field 'qty' must be greater than 4`
    #[must_use]
    pub fn reason(&self) -> String {
        format!("{} {}", self.field, requirement(&self.constraint))
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message, self.reason())?;
        if let Some(value) = &self.value {
            write!(f, " with {value}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Violation {}

fn truncate(rendered: String, max_len: usize) -> String {
    if rendered.chars().count() <= max_len {
        return rendered;
    }
    let keep = max_len.saturating_sub(3);
    let mut cut: String = rendered.chars().take(keep).collect();
    cut.push_str("...");
    cut
}

fn list(values: &[Scalar]) -> String {
    let items: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("[{}]", items.join(", "))
}

fn length(op: Comparison, n: usize, unit: &str) -> String {
    format!("must have {unit} {} {n}", op.phrase())
}

/// Requirement phrase of a constraint, e.g. `must be greater than 4`
#[must_use]
pub fn requirement(constraint: &Constraint) -> String {
    match constraint {
        Constraint::Compare(Comparison::Ne, v) => format!("must not be equal to {v}"),
        Constraint::Compare(op, v) => format!("must be {} {v}", op.phrase()),
        Constraint::In(values) => format!("must be in {}", list(values)),
        Constraint::NotIn(values) => format!("must not be in {}", list(values)),
        Constraint::ByteLen(op, n) => length(*op, *n, "length in bytes"),
        Constraint::CharLen(op, n) => length(*op, *n, "length in characters"),
        Constraint::Len(op, n) => length(*op, *n, "element count"),
        Constraint::Regex(p) => format!("must match pattern '{p}'"),
        Constraint::Prefix(s) => format!("must have prefix {s:?}"),
        Constraint::NoPrefix(s) => format!("must not have prefix {s:?}"),
        Constraint::Suffix(s) => format!("must have suffix {s:?}"),
        Constraint::NoSuffix(s) => format!("must not have suffix {s:?}"),
        Constraint::Contains(s) => format!("must contain {s:?}"),
        Constraint::NotContains(s) => format!("must not contain {s:?}"),
        Constraint::ContainsAny(s) => format!("must contain any of the characters {s:?}"),
        Constraint::NotContainsAny(s) => format!("must not contain any of the characters {s:?}"),
        Constraint::Format(format) => format!("must be {}", format_phrase(*format)),
        Constraint::DateTime(layout) => format!("must match datetime layout {layout:?}"),
        Constraint::NotNull => "must be set".to_string(),
        Constraint::Skip => "is skipped".to_string(),
        Constraint::Unique => "must contain unique elements".to_string(),
    }
}

fn format_phrase(format: StringFormat) -> &'static str {
    match format {
        StringFormat::Utf8 => "valid UTF-8",
        StringFormat::Ascii => "ASCII",
        StringFormat::PrintableAscii => "printable ASCII",
        StringFormat::Boolean => "a boolean literal",
        StringFormat::Lowercase => "lowercase",
        StringFormat::Uppercase => "uppercase",
        StringFormat::Alpha => "alphabetic",
        StringFormat::Numeric => "numeric",
        StringFormat::Alphanumeric => "alphanumeric",
        StringFormat::Ip => "an IP address",
        StringFormat::Ipv4 => "an IPv4 address",
        StringFormat::Ipv6 => "an IPv6 address",
        StringFormat::Cidr => "an IP network in CIDR notation",
        StringFormat::Mac => "a MAC address",
        StringFormat::HostPort => "a host and port pair",
        StringFormat::Hostname => "a valid hostname",
        StringFormat::Fqdn => "a fully qualified domain name",
        StringFormat::Uri => "an absolute URI",
        StringFormat::UriReference => "a URI reference",
        StringFormat::Url => "a URL",
        StringFormat::HttpUrl => "an HTTP or HTTPS URL",
        StringFormat::Base64 => "valid base64",
        StringFormat::Base64Url => "valid URL-safe base64",
        StringFormat::Hex => "valid hex",
        StringFormat::Json => "valid JSON",
        StringFormat::Timezone => "a valid time zone name",
        StringFormat::Uuid => "a UUID",
        StringFormat::Uuid3 => "a version 3 UUID",
        StringFormat::Uuid4 => "a version 4 UUID",
        StringFormat::Uuid5 => "a version 5 UUID",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_value_shape() {
        let violation = Violation::with_value(
            "Numbers",
            FieldDescription::Field("t_int32_gt1".to_string()),
            Constraint::gt(4),
            &Scalar::Int(3),
            256,
        );
        assert_eq!(
            violation.to_string(),
            "Numbers: field 't_int32_gt1' must be greater than 4 with 3"
        );
        assert!(!violation.is_presence());
    }

    #[test]
    fn test_presence_shape() {
        let violation = Violation::absent(
            "Order",
            FieldDescription::Field("payment".to_string()),
            Constraint::NotNull,
        );
        assert_eq!(violation.to_string(), "Order: field 'payment' must be set");
        assert!(violation.is_presence());
    }

    #[test]
    fn test_field_descriptions() {
        assert_eq!(
            FieldDescription::Item("tags".into()).to_string(),
            "array item where in field 'tags'"
        );
        assert_eq!(
            FieldDescription::MapKey("labels".into()).to_string(),
            "map key where in field 'labels'"
        );
        assert_eq!(
            FieldDescription::MapValue("labels".into()).to_string(),
            "map value where in field 'labels'"
        );
        assert_eq!(FieldDescription::MapValue("labels".into()).field_name(), "labels");
    }

    #[test]
    fn test_strings_are_quoted_and_truncated() {
        let violation = Violation::with_value(
            "Doc",
            FieldDescription::Field("body".to_string()),
            Constraint::ByteLen(Comparison::Lte, 4),
            &Scalar::from("say \"hi\""),
            256,
        );
        assert_eq!(
            violation.to_string(),
            r#"Doc: field 'body' must have length in bytes less than or equal to 4 with "say \"hi\"""#
        );

        let long = "x".repeat(40);
        let violation = Violation::with_value(
            "Doc",
            FieldDescription::Field("body".to_string()),
            Constraint::ByteLen(Comparison::Lte, 4),
            &long,
            10,
        );
        assert_eq!(violation.value.as_deref(), Some("xxxxxxx..."));
    }

    #[test]
    fn test_requirement_phrases() {
        assert_eq!(requirement(&Constraint::not_equals(0)), "must not be equal to 0");
        assert_eq!(
            requirement(&Constraint::In(vec![Scalar::Int(1), Scalar::Int(2)])),
            "must be in [1, 2]"
        );
        assert_eq!(
            requirement(&Constraint::Format(StringFormat::Uuid4)),
            "must be a version 4 UUID"
        );
        assert_eq!(
            requirement(&Constraint::Len(Comparison::Gte, 2)),
            "must have element count greater than or equal to 2"
        );
    }
}
