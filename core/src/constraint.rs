//! The closed set of field constraints
//!
//! Constraints are data. Both engines interpret them; nothing here evaluates
//! a record.

use crate::error::{Result, RuleError};
use crate::types::Scalar;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operator shared by the equality, ordering and length families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl Comparison {
    /// Whether `actual <op> expected` holds given their ordering
    ///
    /// `None` means the values are unordered (a NaN is involved); only `Ne`
    /// holds in that case.
    #[must_use]
    pub fn holds(self, ordering: Option<Ordering>) -> bool {
        match self {
            Self::Eq => ordering == Some(Ordering::Equal),
            Self::Ne => ordering != Some(Ordering::Equal),
            Self::Lt => ordering == Some(Ordering::Less),
            Self::Gt => ordering == Some(Ordering::Greater),
            Self::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            Self::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        }
    }

    /// Whether this operator needs an ordered kind
    #[must_use]
    pub fn is_ordering(self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }

    /// English phrase for messages, e.g. "greater than"
    #[must_use]
    pub fn phrase(self) -> &'static str {
        match self {
            Self::Eq => "equal to",
            Self::Ne => "not equal to",
            Self::Lt => "less than",
            Self::Gt => "greater than",
            Self::Lte => "less than or equal to",
            Self::Gte => "greater than or equal to",
        }
    }
}

/// Named string format predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringFormat {
    Utf8,
    Ascii,
    PrintableAscii,
    /// A boolean literal such as `true`, `F` or `1`
    Boolean,
    Lowercase,
    Uppercase,
    Alpha,
    Numeric,
    Alphanumeric,
    Ip,
    Ipv4,
    Ipv6,
    /// IP network in CIDR notation
    Cidr,
    Mac,
    /// `host:port` where host is an IP address or hostname
    HostPort,
    /// RFC 1123 hostname
    Hostname,
    /// Fully qualified domain name
    Fqdn,
    /// Absolute URI
    Uri,
    /// Absolute or relative URI reference
    UriReference,
    /// Absolute URI with a host
    Url,
    HttpUrl,
    Base64,
    Base64Url,
    Hex,
    Json,
    /// IANA time zone name
    Timezone,
    /// Any hyphenated UUID
    Uuid,
    Uuid3,
    Uuid4,
    Uuid5,
}

impl StringFormat {
    /// Formats that can be checked on raw bytes without decoding them
    #[must_use]
    pub fn is_byte_level(self) -> bool {
        matches!(self, Self::Utf8 | Self::Ascii | Self::PrintableAscii)
    }
}

/// A compiled regular expression that remembers its source
///
/// Compilation happens when the rule table is built or deserialized, so a bad
/// pattern is a build-time error rather than a validation-time one.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    text: Regex,
    bytes: regex::bytes::Regex,
}

impl Pattern {
    /// Compile a pattern
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::InvalidPattern`] if the pattern does not compile.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let text = Regex::new(&source).map_err(|e| RuleError::InvalidPattern {
            pattern: source.clone(),
            source: e,
        })?;
        let bytes =
            regex::bytes::Regex::new(&source).map_err(|e| RuleError::InvalidPattern {
                pattern: source.clone(),
                source: e,
            })?;
        Ok(Self {
            source,
            text,
            bytes,
        })
    }

    /// Pattern source text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match against a string
    #[must_use]
    pub fn is_match(&self, value: &str) -> bool {
        self.text.is_match(value)
    }

    /// Match against raw bytes
    #[must_use]
    pub fn is_match_bytes(&self, value: &[u8]) -> bool {
        self.bytes.is_match(value)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(source).map_err(serde::de::Error::custom)
    }
}

/// One field constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Equality and ordering against an operand of the field's family
    Compare(Comparison, Scalar),
    In(Vec<Scalar>),
    NotIn(Vec<Scalar>),
    /// Length in encoded bytes
    ByteLen(Comparison, usize),
    /// Length in Unicode scalar values
    CharLen(Comparison, usize),
    /// Number of elements of a sequence or mapping
    Len(Comparison, usize),
    Regex(Pattern),
    Prefix(String),
    NoPrefix(String),
    Suffix(String),
    NoSuffix(String),
    Contains(String),
    NotContains(String),
    /// Contains at least one of the given characters
    ContainsAny(String),
    /// Contains none of the given characters
    NotContainsAny(String),
    Format(StringFormat),
    /// Parses as a date, time or datetime under a chrono `strftime` layout
    DateTime(String),
    NotNull,
    /// Do not recurse into the nested record
    Skip,
    Unique,
}

impl Constraint {
    /// `Compare(Eq, value)`
    pub fn equals(value: impl Into<Scalar>) -> Self {
        Self::Compare(Comparison::Eq, value.into())
    }

    /// `Compare(Ne, value)`
    pub fn not_equals(value: impl Into<Scalar>) -> Self {
        Self::Compare(Comparison::Ne, value.into())
    }

    /// `Compare(Lt, value)`
    pub fn lt(value: impl Into<Scalar>) -> Self {
        Self::Compare(Comparison::Lt, value.into())
    }

    /// `Compare(Gt, value)`
    pub fn gt(value: impl Into<Scalar>) -> Self {
        Self::Compare(Comparison::Gt, value.into())
    }

    /// `Compare(Lte, value)`
    pub fn lte(value: impl Into<Scalar>) -> Self {
        Self::Compare(Comparison::Lte, value.into())
    }

    /// `Compare(Gte, value)`
    pub fn gte(value: impl Into<Scalar>) -> Self {
        Self::Compare(Comparison::Gte, value.into())
    }

    /// Regex constraint
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern does not compile.
    pub fn regex(pattern: &str) -> Result<Self> {
        Pattern::new(pattern).map(Self::Regex)
    }

    /// Whether a violation of this constraint means "absent"
    #[must_use]
    pub fn is_presence(&self) -> bool {
        matches!(self, Self::NotNull | Self::Skip)
    }

    /// Short operator name, for diagnostics
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Compare(..) => "compare",
            Self::In(_) => "in",
            Self::NotIn(_) => "not_in",
            Self::ByteLen(..) => "byte_len",
            Self::CharLen(..) => "char_len",
            Self::Len(..) => "len",
            Self::Regex(_) => "regex",
            Self::Prefix(_) => "prefix",
            Self::NoPrefix(_) => "no_prefix",
            Self::Suffix(_) => "suffix",
            Self::NoSuffix(_) => "no_suffix",
            Self::Contains(_) => "contains",
            Self::NotContains(_) => "not_contains",
            Self::ContainsAny(_) => "contains_any",
            Self::NotContainsAny(_) => "not_contains_any",
            Self::Format(_) => "format",
            Self::DateTime(_) => "datetime",
            Self::NotNull => "not_null",
            Self::Skip => "skip",
            Self::Unique => "unique",
        }
    }
}

/// Whether a rule list contains `rule`
#[must_use]
pub fn has_rule(rules: &[Constraint], rule: &Constraint) -> bool {
    rules.iter().any(|r| r == rule)
}
