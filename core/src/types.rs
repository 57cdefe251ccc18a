//! Value model for record instances
//!
//! Literal scalars and presence-tracked values use two distinct
//! representations: [`FieldValue::Literal`] carries no presence bit, while
//! [`FieldValue::Nullable`], [`FieldValue::Bytes`], collections, nested
//! records and unions wrap their payload in an `Option`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Protobuf scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    Int32,
    Int64,
    Sint32,
    Sint64,
    Sfixed32,
    Sfixed64,
    Uint32,
    Uint64,
    Fixed32,
    Fixed64,
    Float,
    Double,
    Bool,
    String,
    Bytes,
    Enum,
}

/// Comparison family shared by several scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFamily {
    /// Signed integers, compared as `i64`
    Signed,
    /// Unsigned integers, compared as `u64`
    Unsigned,
    /// Floating point, compared as `f64`
    Float,
    Bool,
    String,
    Bytes,
    Enum,
}

impl ScalarKind {
    /// Comparison family of this kind
    #[must_use]
    pub fn family(self) -> ScalarFamily {
        match self {
            Self::Int32 | Self::Int64 | Self::Sint32 | Self::Sint64 | Self::Sfixed32
            | Self::Sfixed64 => ScalarFamily::Signed,
            Self::Uint32 | Self::Uint64 | Self::Fixed32 | Self::Fixed64 => {
                ScalarFamily::Unsigned
            }
            Self::Float | Self::Double => ScalarFamily::Float,
            Self::Bool => ScalarFamily::Bool,
            Self::String => ScalarFamily::String,
            Self::Bytes => ScalarFamily::Bytes,
            Self::Enum => ScalarFamily::Enum,
        }
    }

    /// Whether ordering comparisons are meaningful for this kind
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self.family(),
            ScalarFamily::Signed | ScalarFamily::Unsigned | ScalarFamily::Float
        )
    }

    /// Whether string-shape rules apply to this kind
    #[must_use]
    pub fn is_textual(self) -> bool {
        matches!(self, Self::String | Self::Bytes)
    }

    /// Whether this kind is a legal mapping key
    #[must_use]
    pub fn is_map_key(self) -> bool {
        matches!(
            self.family(),
            ScalarFamily::Signed | ScalarFamily::Unsigned | ScalarFamily::Bool
        ) || self == Self::String
    }

    /// Zero value of this kind
    #[must_use]
    pub fn zero(self) -> Scalar {
        match self.family() {
            ScalarFamily::Signed => Scalar::Int(0),
            ScalarFamily::Unsigned => Scalar::Uint(0),
            ScalarFamily::Float => Scalar::Float(0.0),
            ScalarFamily::Bool => Scalar::Bool(false),
            ScalarFamily::String => Scalar::Str(String::new()),
            ScalarFamily::Bytes => Scalar::Bytes(Vec::new()),
            ScalarFamily::Enum => Scalar::Enum(0),
        }
    }

    /// Whether `value` belongs to this kind's family and fits its width
    #[must_use]
    pub fn accepts(self, value: &Scalar) -> bool {
        match (self, value) {
            (Self::Int32 | Self::Sint32 | Self::Sfixed32, Scalar::Int(v)) => {
                i32::try_from(*v).is_ok()
            }
            (Self::Uint32 | Self::Fixed32, Scalar::Uint(v)) => u32::try_from(*v).is_ok(),
            (kind, value) => kind.family() == value.family(),
        }
    }

    /// Protobuf type name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Sint32 => "sint32",
            Self::Sint64 => "sint64",
            Self::Sfixed32 => "sfixed32",
            Self::Sfixed64 => "sfixed64",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Fixed32 => "fixed32",
            Self::Fixed64 => "fixed64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Enum => "enum",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scalar value in its family's native representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Str(String),
    Bytes(Vec<u8>),
    Enum(i32),
}

impl Scalar {
    /// Family this value belongs to
    #[must_use]
    pub fn family(&self) -> ScalarFamily {
        match self {
            Self::Int(_) => ScalarFamily::Signed,
            Self::Uint(_) => ScalarFamily::Unsigned,
            Self::Float(_) => ScalarFamily::Float,
            Self::Bool(_) => ScalarFamily::Bool,
            Self::Str(_) => ScalarFamily::String,
            Self::Bytes(_) => ScalarFamily::Bytes,
            Self::Enum(_) => ScalarFamily::Enum,
        }
    }

    /// Whether this is the zero value of its kind
    ///
    /// Literal scalars cannot tell "unset" from "explicitly zero", so this is
    /// the only unset signal they have.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Int(v) => *v == 0,
            Self::Uint(v) => *v == 0,
            Self::Float(v) => *v == 0.0,
            Self::Bool(v) => !*v,
            Self::Str(v) => v.is_empty(),
            Self::Bytes(v) => v.is_empty(),
            Self::Enum(v) => *v == 0,
        }
    }

    /// String payload, if this is a string
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of a string or bytes value
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Str(s) => Some(s.as_bytes()),
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Self::Uint(u64::from(value))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::Bytes(v) => write!(f, "{v:?}"),
            Self::Enum(v) => write!(f, "{v}"),
        }
    }
}

/// Mapping key; protobuf restricts keys to integers, bools and strings
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapKey {
    Int(i64),
    Uint(u64),
    Bool(bool),
    Str(String),
}

impl MapKey {
    /// The key as a scalar, for key rule evaluation
    #[must_use]
    pub fn to_scalar(&self) -> Scalar {
        match self {
            Self::Int(v) => Scalar::Int(*v),
            Self::Uint(v) => Scalar::Uint(*v),
            Self::Bool(v) => Scalar::Bool(*v),
            Self::Str(v) => Scalar::Str(v.clone()),
        }
    }

    /// Convert a scalar into a key, if its family can key a map
    #[must_use]
    pub fn from_scalar(value: &Scalar) -> Option<Self> {
        match value {
            Scalar::Int(v) => Some(Self::Int(*v)),
            Scalar::Uint(v) => Some(Self::Uint(*v)),
            Scalar::Bool(v) => Some(Self::Bool(*v)),
            Scalar::Str(v) => Some(Self::Str(v.clone())),
            _ => None,
        }
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<i64> for MapKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.to_scalar().fmt(f)
    }
}

/// Sequence item or mapping value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Scalar(Scalar),
    /// Shared reference to a record; uniqueness compares the reference
    Record(Arc<Record>),
}

impl Element {
    /// Duplicate test used by uniqueness rules
    ///
    /// Scalars compare by value, records by identity: two distinct records
    /// with equal content are not the same element.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Scalar payload, if any
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            Self::Record(_) => None,
        }
    }
}

macro_rules! scalar_element_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Element {
                fn from(value: $ty) -> Self {
                    Self::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

scalar_element_from!(i32, i64, u32, u64, f64, bool, &str, String, Vec<u8>);

impl From<Scalar> for Element {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

impl From<Record> for Element {
    fn from(value: Record) -> Self {
        Self::Record(Arc::new(value))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => s.fmt(f),
            Self::Record(r) => r.fmt(f),
        }
    }
}

/// Selected member of a tagged union
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    /// Name of the selected member
    pub member: String,
    /// Member payload, shaped like a field of the member's kind
    pub value: Box<FieldValue>,
}

impl Variant {
    /// Select `member` with `value`
    pub fn new(member: impl Into<String>, value: FieldValue) -> Self {
        Self {
            member: member.into(),
            value: Box::new(value),
        }
    }
}

/// Current value of one field of a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    /// Literal scalar, no presence bit
    Literal(Scalar),
    /// Nullable scalar
    Nullable(Option<Scalar>),
    /// Byte sequence; absent and present-empty are distinct
    Bytes(Option<Vec<u8>>),
    /// Sequence; absent and present-empty are distinct
    List(Option<Vec<Element>>),
    /// Mapping; absent and present-empty are distinct
    Map(#[serde(with = "map_entries")] Option<BTreeMap<MapKey, Element>>),
    /// Nested record
    Message(Option<Box<Record>>),
    /// Tagged union, `None` when no member is selected
    OneOf(Option<Variant>),
}

impl FieldValue {
    /// Whether the value is present and not a zero/empty value
    #[must_use]
    pub fn is_set(&self) -> bool {
        match self {
            Self::Literal(s) => !s.is_zero(),
            Self::Nullable(v) => v.is_some(),
            Self::Bytes(v) => v.as_ref().is_some_and(|b| !b.is_empty()),
            Self::List(v) => v.as_ref().is_some_and(|l| !l.is_empty()),
            Self::Map(v) => v.as_ref().is_some_and(|m| !m.is_empty()),
            Self::Message(v) => v.is_some(),
            Self::OneOf(v) => v.is_some(),
        }
    }

    /// Short name of the representation, for diagnostics
    #[must_use]
    pub fn shape_name(&self) -> &'static str {
        match self {
            Self::Literal(_) => "literal",
            Self::Nullable(_) => "nullable",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Message(_) => "message",
            Self::OneOf(_) => "oneof",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) | Self::Nullable(Some(s)) => s.fmt(f),
            Self::Bytes(Some(b)) => write!(f, "{b:?}"),
            Self::List(Some(items)) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str("]")
            }
            Self::Map(Some(entries)) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
            Self::Message(Some(r)) => r.fmt(f),
            Self::OneOf(Some(v)) => write!(f, "{}({})", v.member, v.value),
            Self::Nullable(None)
            | Self::Bytes(None)
            | Self::List(None)
            | Self::Map(None)
            | Self::Message(None)
            | Self::OneOf(None) => f.write_str("null"),
        }
    }
}

/// A record instance: message name plus field values in declaration order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    message: String,
    fields: IndexMap<String, FieldValue>,
}

impl Record {
    /// Create an empty record of the given message type
    ///
    /// Fields without an entry read as their zero value.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: IndexMap::new(),
        }
    }

    /// Message type name
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Current value of a field, if it has an entry
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }

    /// Mutable access to a field's value
    pub fn get_mut(&mut self, field: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(field)
    }

    /// Set a field's value, returning the previous one
    pub fn set(&mut self, field: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.fields.insert(field.into(), value)
    }

    /// Builder-style [`Record::set`]
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.set(field, value);
        self
    }

    /// Set a literal scalar field
    #[must_use]
    pub fn with_literal(self, field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.with(field, FieldValue::Literal(value.into()))
    }

    /// Set a nullable scalar field to a present value
    #[must_use]
    pub fn with_nullable(self, field: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.with(field, FieldValue::Nullable(Some(value.into())))
    }

    /// Iterate over fields that have an entry
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fields.is_empty() {
            return write!(f, "{} {{}}", self.message);
        }
        write!(f, "{} {{ ", self.message)?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str(" }")
    }
}

/// Serialize maps as entry lists; JSON object keys must be strings
mod map_entries {
    use super::{Element, MapKey};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S>(
        value: &Option<BTreeMap<MapKey, Element>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value
            .as_ref()
            .map(|m| m.iter().collect::<Vec<_>>())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<Option<BTreeMap<MapKey, Element>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Option::<Vec<(MapKey, Element)>>::deserialize(deserializer)?;
        Ok(entries.map(|e| e.into_iter().collect()))
    }
}
