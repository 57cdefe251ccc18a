//! Field presence model
//!
//! A [`FieldDescriptor`] classifies one declared field, carries its rule
//! groups, its default and its gate. Descriptors are built once, checked by
//! [`DescriptorSet::new`], and never change afterwards.

use crate::check;
use crate::constraint::Constraint;
use crate::error::{Result, RuleError};
use crate::types::{FieldValue, MapKey, Record, Scalar, ScalarKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Field category, derived from the field shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCategory {
    ScalarLiteral,
    ScalarNullable,
    Sequence,
    Mapping,
    UnionMember,
    NestedRecord,
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ScalarLiteral => "literal scalar",
            Self::ScalarNullable => "nullable scalar",
            Self::Sequence => "sequence",
            Self::Mapping => "mapping",
            Self::UnionMember => "oneof",
            Self::NestedRecord => "nested record",
        };
        f.write_str(name)
    }
}

/// Type of sequence items and mapping values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    Scalar(ScalarKind),
    Message(String),
}

impl ElementType {
    /// Record elements of the named message type
    pub fn message(name: impl Into<String>) -> Self {
        Self::Message(name.into())
    }
}

/// Category and kind of a field, fixed together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldShape {
    Literal(ScalarKind),
    Nullable(ScalarKind),
    Sequence(ElementType),
    Mapping {
        key: ScalarKind,
        value: ElementType,
    },
    /// Nested record of the named message type
    Message(String),
    /// Tagged union over the member fields
    OneOf(Vec<FieldDescriptor>),
}

impl FieldShape {
    /// Category of this shape
    #[must_use]
    pub fn category(&self) -> FieldCategory {
        match self {
            Self::Literal(_) => FieldCategory::ScalarLiteral,
            Self::Nullable(_) => FieldCategory::ScalarNullable,
            Self::Sequence(_) => FieldCategory::Sequence,
            Self::Mapping { .. } => FieldCategory::Mapping,
            Self::Message(_) => FieldCategory::NestedRecord,
            Self::OneOf(_) => FieldCategory::UnionMember,
        }
    }

    /// Scalar kind, for scalar-like shapes
    #[must_use]
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Self::Literal(kind) | Self::Nullable(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Configured default of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    /// Scalar default for literal, nullable and bytes fields and scalar members
    Scalar(Scalar),
    List(Vec<Scalar>),
    Map(Vec<(MapKey, Scalar)>),
    /// Instantiate an absent nested record and apply its own defaults
    Construct,
    /// Select this union member with its default payload
    Member(String),
}

/// Gate on a sibling field's current state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// The sibling union has `member` selected
    MemberSelected { field: String, member: String },
    /// The sibling holds a non-default value
    IsSet { field: String },
    /// The sibling scalar currently equals `value`
    Equals { field: String, value: Scalar },
}

impl Condition {
    /// Name of the sibling field this condition reads
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::MemberSelected { field, .. }
            | Self::IsSet { field }
            | Self::Equals { field, .. } => field,
        }
    }

    /// Evaluate against the current state of `record`
    #[must_use]
    pub fn is_satisfied(&self, record: &Record, message: &MessageDescriptor) -> bool {
        let current = record.get(self.field());
        match self {
            Self::MemberSelected { member, .. } => matches!(
                current,
                Some(FieldValue::OneOf(Some(variant))) if &variant.member == member
            ),
            Self::IsSet { .. } => current.is_some_and(FieldValue::is_set),
            Self::Equals { field, value } => match current {
                Some(FieldValue::Literal(s) | FieldValue::Nullable(Some(s))) => s == value,
                Some(FieldValue::Bytes(Some(b))) => value.as_bytes() == Some(b.as_slice()),
                Some(_) => false,
                None => message.field(field).is_some_and(|f| match f.shape {
                    FieldShape::Literal(kind) if kind != ScalarKind::Bytes => {
                        kind.zero() == *value
                    }
                    _ => false,
                }),
            },
        }
    }
}

/// One declared field of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name
    pub name: String,

    /// Category and kind
    pub shape: FieldShape,

    /// Rules on the field itself, evaluated in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<Constraint>,

    /// Rules applied to each sequence item
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_rules: Vec<Constraint>,

    /// Rules applied to each mapping key
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_rules: Vec<Constraint>,

    /// Rules applied to each mapping value
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_rules: Vec<Constraint>,

    /// Configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,

    /// Enforcement gate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<Condition>,
}

impl FieldDescriptor {
    /// Create a field with no rules, default or gate
    pub fn new(name: impl Into<String>, shape: FieldShape) -> Self {
        Self {
            name: name.into(),
            shape,
            rules: Vec::new(),
            item_rules: Vec::new(),
            key_rules: Vec::new(),
            value_rules: Vec::new(),
            default: None,
            gate: None,
        }
    }

    /// Literal scalar field
    pub fn literal(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(name, FieldShape::Literal(kind))
    }

    /// Nullable scalar field
    pub fn nullable(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self::new(name, FieldShape::Nullable(kind))
    }

    /// Sequence field
    pub fn sequence(name: impl Into<String>, items: ElementType) -> Self {
        Self::new(name, FieldShape::Sequence(items))
    }

    /// Mapping field
    pub fn mapping(name: impl Into<String>, key: ScalarKind, value: ElementType) -> Self {
        Self::new(name, FieldShape::Mapping { key, value })
    }

    /// Nested record field
    pub fn message(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, FieldShape::Message(message.into()))
    }

    /// Tagged union field
    pub fn one_of(name: impl Into<String>, members: Vec<FieldDescriptor>) -> Self {
        Self::new(name, FieldShape::OneOf(members))
    }

    /// Category of this field
    #[must_use]
    pub fn category(&self) -> FieldCategory {
        self.shape.category()
    }

    /// Append a field rule
    #[must_use]
    pub fn with_rule(mut self, rule: Constraint) -> Self {
        self.rules.push(rule);
        self
    }

    /// Append several field rules
    #[must_use]
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = Constraint>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Append a sequence item rule
    #[must_use]
    pub fn with_item_rule(mut self, rule: Constraint) -> Self {
        self.item_rules.push(rule);
        self
    }

    /// Append a mapping key rule
    #[must_use]
    pub fn with_key_rule(mut self, rule: Constraint) -> Self {
        self.key_rules.push(rule);
        self
    }

    /// Append a mapping value rule
    #[must_use]
    pub fn with_value_rule(mut self, rule: Constraint) -> Self {
        self.value_rules.push(rule);
        self
    }

    /// Set the default
    #[must_use]
    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Set a scalar default
    #[must_use]
    pub fn with_default_scalar(self, value: impl Into<Scalar>) -> Self {
        self.with_default(DefaultValue::Scalar(value.into()))
    }

    /// Set the gate
    #[must_use]
    pub fn with_gate(mut self, gate: Condition) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Value of this field when nothing has been set
    #[must_use]
    pub fn zero_value(&self) -> FieldValue {
        match &self.shape {
            FieldShape::Literal(ScalarKind::Bytes) | FieldShape::Nullable(ScalarKind::Bytes) => {
                FieldValue::Bytes(None)
            }
            FieldShape::Literal(kind) => FieldValue::Literal(kind.zero()),
            FieldShape::Nullable(_) => FieldValue::Nullable(None),
            FieldShape::Sequence(_) => FieldValue::List(None),
            FieldShape::Mapping { .. } => FieldValue::Map(None),
            FieldShape::Message(_) => FieldValue::Message(None),
            FieldShape::OneOf(_) => FieldValue::OneOf(None),
        }
    }

    /// Union member by name
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&FieldDescriptor> {
        match &self.shape {
            FieldShape::OneOf(members) => members.iter().find(|m| m.name == name),
            _ => None,
        }
    }
}

/// Storage codec selected for a message type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    /// Plain JSON of the record structure
    Json,
    /// JSON object keyed by field names, decoded against the descriptor
    #[default]
    SchemaJson,
    /// Compact binary encoding
    Binary,
}

/// Descriptor of one message (record type)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDescriptor {
    /// Message name
    pub name: String,

    /// Fields in declaration order
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    /// Codec annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<CodecKind>,
}

impl MessageDescriptor {
    /// Create a message descriptor
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
            codec: None,
        }
    }

    /// Annotate the codec used for this message
    #[must_use]
    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Field by name
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Serialized form of a descriptor set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptorDocument {
    /// Message descriptors
    #[serde(default)]
    pub messages: Vec<MessageDescriptor>,
}

/// Immutable, checked registry of message descriptors
#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    messages: IndexMap<String, MessageDescriptor>,
}

impl DescriptorSet {
    /// Build and check a descriptor set
    ///
    /// # Errors
    ///
    /// Returns an error for duplicate messages or any malformed rule, default,
    /// gate or field shape.
    pub fn new(messages: impl IntoIterator<Item = MessageDescriptor>) -> Result<Self> {
        let mut map = IndexMap::new();
        for message in messages {
            if map.contains_key(&message.name) {
                return Err(RuleError::DuplicateMessage(message.name));
            }
            map.insert(message.name.clone(), message);
        }

        let set = Self { messages: map };
        for message in set.messages.values() {
            check::check_message(&set, message)?;
        }
        check::check_construct_cycles(&set)?;
        tracing::debug!(messages = set.messages.len(), "descriptor set checked");
        Ok(set)
    }

    /// Load from a YAML document
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or fails checking.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let doc: DescriptorDocument = serde_yaml::from_str(yaml)?;
        Self::new(doc.messages)
    }

    /// Load from a JSON document
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or fails checking.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let doc: DescriptorDocument = serde_json::from_str(json)?;
        Self::new(doc.messages)
    }

    /// Load from a YAML or JSON file, chosen by extension
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or checked.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Serializable document form
    #[must_use]
    pub fn to_document(&self) -> DescriptorDocument {
        DescriptorDocument {
            messages: self.messages.values().cloned().collect(),
        }
    }

    /// Message descriptor by name
    #[must_use]
    pub fn message(&self, name: &str) -> Option<&MessageDescriptor> {
        self.messages.get(name)
    }

    /// Whether a message is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.messages.contains_key(name)
    }

    /// Iterate over message descriptors in registration order
    pub fn messages(&self) -> impl Iterator<Item = &MessageDescriptor> {
        self.messages.values()
    }

    /// A record of `message` with every declared field at its zero value
    #[must_use]
    pub fn instantiate(&self, message: &str) -> Option<Record> {
        let descriptor = self.messages.get(message)?;
        let record = descriptor
            .fields
            .iter()
            .fold(Record::new(message), |record, field| {
                record.with(field.name.clone(), field.zero_value())
            });
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Variant;
    use pretty_assertions::assert_eq;

    fn order() -> MessageDescriptor {
        MessageDescriptor::new(
            "Order",
            vec![
                FieldDescriptor::literal("id", ScalarKind::String),
                FieldDescriptor::nullable("note", ScalarKind::String),
                FieldDescriptor::literal("blob", ScalarKind::Bytes),
                FieldDescriptor::sequence("tags", ElementType::Scalar(ScalarKind::String)),
                FieldDescriptor::one_of(
                    "payment",
                    vec![
                        FieldDescriptor::literal("card", ScalarKind::String),
                        FieldDescriptor::literal("cash", ScalarKind::Bool),
                    ],
                ),
                FieldDescriptor::literal("qty", ScalarKind::Int32),
            ],
        )
    }

    #[test]
    fn test_instantiate_uses_zero_values() -> anyhow::Result<()> {
        let set = DescriptorSet::new([order()])?;
        let record = set.instantiate("Order").ok_or_else(|| anyhow::anyhow!("missing"))?;

        assert_eq!(record.get("id"), Some(&FieldValue::Literal(Scalar::from(""))));
        assert_eq!(record.get("note"), Some(&FieldValue::Nullable(None)));
        assert_eq!(record.get("blob"), Some(&FieldValue::Bytes(None)));
        assert_eq!(record.get("tags"), Some(&FieldValue::List(None)));
        assert_eq!(record.get("payment"), Some(&FieldValue::OneOf(None)));
        assert!(set.instantiate("Nope").is_none());
        Ok(())
    }

    #[test]
    fn test_conditions() {
        let message = order();
        let record = Record::new("Order")
            .with(
                "payment",
                FieldValue::OneOf(Some(Variant::new(
                    "card",
                    FieldValue::Literal(Scalar::from("4111")),
                ))),
            )
            .with_literal("id", "A-1");

        let card = Condition::MemberSelected {
            field: "payment".to_string(),
            member: "card".to_string(),
        };
        let cash = Condition::MemberSelected {
            field: "payment".to_string(),
            member: "cash".to_string(),
        };
        assert!(card.is_satisfied(&record, &message));
        assert!(!cash.is_satisfied(&record, &message));

        let id_set = Condition::IsSet {
            field: "id".to_string(),
        };
        let note_set = Condition::IsSet {
            field: "note".to_string(),
        };
        assert!(id_set.is_satisfied(&record, &message));
        assert!(!note_set.is_satisfied(&record, &message));

        let id_is = Condition::Equals {
            field: "id".to_string(),
            value: Scalar::from("A-1"),
        };
        assert!(id_is.is_satisfied(&record, &message));

        // a missing literal entry reads as its zero value
        let qty_zero = Condition::Equals {
            field: "qty".to_string(),
            value: Scalar::Int(0),
        };
        assert!(qty_zero.is_satisfied(&record, &message));
    }

    #[test]
    fn test_duplicate_message_rejected() {
        let err = DescriptorSet::new([order(), order()]).unwrap_err();
        assert!(matches!(err, RuleError::DuplicateMessage(name) if name == "Order"));
    }

    #[test]
    fn test_yaml_document() -> anyhow::Result<()> {
        let yaml = r#"
messages:
  - name: Item
    codec: binary
    fields:
      - name: sku
        shape: {literal: string}
        rules:
          - byte_len: [gte, 3]
          - prefix: "SKU-"
      - name: count
        shape: {nullable: uint32}
        default: {scalar: {uint: 1}}
      - name: labels
        shape: {mapping: {key: string, value: {scalar: int64}}}
        key_rules:
          - char_len: [lte, 8]
"#;
        let set = DescriptorSet::from_yaml_str(yaml)?;
        let item = set.message("Item").ok_or_else(|| anyhow::anyhow!("missing"))?;
        assert_eq!(item.codec, Some(CodecKind::Binary));
        assert_eq!(item.fields.len(), 3);
        assert_eq!(
            item.field("count").and_then(|f| f.default.clone()),
            Some(DefaultValue::Scalar(Scalar::Uint(1)))
        );

        let round_trip = serde_json::to_string(&set.to_document())?;
        let again = DescriptorSet::from_json_str(&round_trip)?;
        assert_eq!(again.message("Item"), Some(item));
        Ok(())
    }
}
