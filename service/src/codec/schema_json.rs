//! Schema-aware JSON codec
//!
//! Records are written as plain JSON objects keyed by field name, the way a
//! person would write them by hand. The descriptor supplies everything the
//! JSON text cannot carry:
//!
//! - literal scalars are always written; absent presence-tracked fields are
//!   omitted and decode back to their absent representation
//! - bytes are base64 (standard alphabet, padded)
//! - a selected union member is a single-key object `{"member": value}`
//! - map keys are strings and are parsed back per the declared key kind
//! - non-finite floats are the strings `"NaN"`, `"Infinity"`, `"-Infinity"`
//! - 64-bit integers are accepted either as numbers or as decimal strings

use super::Codec;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use protorules_core::descriptor::{
    DescriptorSet, ElementType, FieldDescriptor, FieldShape, MessageDescriptor,
};
use protorules_core::error::{Result, RuleError};
use protorules_core::types::{
    Element, FieldValue, MapKey, Record, Scalar, ScalarFamily, ScalarKind, Variant,
};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::trace;

const NAME: &str = "schema_json";

/// JSON codec driven by one message descriptor
#[derive(Debug, Clone, Copy)]
pub struct SchemaJsonCodec<'a> {
    set: &'a DescriptorSet,
    message: &'a MessageDescriptor,
    pretty: bool,
}

impl<'a> SchemaJsonCodec<'a> {
    /// Create a codec for records of `message`
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::UnknownMessage`] if `message` is not in `set`.
    pub fn new(set: &'a DescriptorSet, message: &str) -> Result<Self> {
        let message = set
            .message(message)
            .ok_or_else(|| RuleError::UnknownMessage(message.to_string()))?;
        Ok(Self {
            set,
            message,
            pretty: false,
        })
    }

    /// Enable or disable pretty printing
    #[must_use]
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Encode a record into a JSON value
    ///
    /// # Errors
    ///
    /// Returns a codec error if the record is of another message type or a
    /// field value does not match its descriptor.
    pub fn to_value(&self, record: &Record) -> Result<Value> {
        if record.message() != self.message.name {
            return Err(codec_error(format!(
                "expected a '{}' record, got '{}'",
                self.message.name,
                record.message()
            )));
        }
        let encoder = Encoder { set: self.set };
        encoder.record(self.message, record).map(Value::Object)
    }

    /// Decode a record from a JSON value
    ///
    /// Every declared field is present in the result; fields missing from
    /// the object get their zero value.
    ///
    /// # Errors
    ///
    /// Returns a codec error for unknown keys, wrongly typed values or
    /// integers out of range for their kind.
    pub fn from_value(&self, value: &Value) -> Result<Record> {
        let decoder = Decoder { set: self.set };
        decoder.record(self.message, value)
    }
}

impl Codec for SchemaJsonCodec<'_> {
    fn name(&self) -> &'static str {
        NAME
    }

    fn encode(&self, record: &Record) -> Result<Vec<u8>> {
        let value = self.to_value(record)?;
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(&value)
        } else {
            serde_json::to_vec(&value)
        };
        let bytes = encoded.map_err(|e| codec_error(e.to_string()))?;
        trace!(message_type = %self.message.name, len = bytes.len(), "record encoded");
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Record> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| codec_error(e.to_string()))?;
        self.from_value(&value)
    }
}

fn codec_error(message: impl Into<String>) -> RuleError {
    RuleError::codec(NAME, message)
}

fn field_error(message: &str, field: &str, reason: impl std::fmt::Display) -> RuleError {
    codec_error(format!("{message}.{field}: {reason}"))
}

struct Encoder<'a> {
    set: &'a DescriptorSet,
}

impl Encoder<'_> {
    fn record(&self, message: &MessageDescriptor, record: &Record) -> Result<Map<String, Value>> {
        let mut object = Map::new();
        for field in &message.fields {
            let zero;
            let value = match record.get(&field.name) {
                Some(value) => value,
                None => {
                    zero = field.zero_value();
                    &zero
                }
            };
            if let Some(json) = self.field(message, field, value)? {
                object.insert(field.name.clone(), json);
            }
        }
        Ok(object)
    }

    /// JSON for one field, `None` when the field is absent
    fn field(
        &self,
        message: &MessageDescriptor,
        field: &FieldDescriptor,
        value: &FieldValue,
    ) -> Result<Option<Value>> {
        let json = match (&field.shape, value) {
            (FieldShape::Literal(_), FieldValue::Literal(scalar)) => Some(scalar_to_json(scalar)),
            (FieldShape::Nullable(_), FieldValue::Nullable(scalar)) => {
                scalar.as_ref().map(scalar_to_json)
            }
            (_, FieldValue::Bytes(bytes)) if field.shape.scalar_kind() == Some(ScalarKind::Bytes) => {
                bytes.as_ref().map(|b| Value::String(STANDARD.encode(b)))
            }
            (FieldShape::Sequence(items), FieldValue::List(list)) => match list {
                Some(list) => Some(Value::Array(
                    list.iter()
                        .map(|element| self.element(message, field, items, element))
                        .collect::<Result<_>>()?,
                )),
                None => None,
            },
            (FieldShape::Mapping { value: values, .. }, FieldValue::Map(map)) => match map {
                Some(entries) => {
                    let mut object = Map::new();
                    for (key, element) in entries {
                        object.insert(
                            key_to_string(key),
                            self.element(message, field, values, element)?,
                        );
                    }
                    Some(Value::Object(object))
                }
                None => None,
            },
            (FieldShape::Message(nested), FieldValue::Message(record)) => match record {
                Some(record) => Some(Value::Object(self.nested(nested, record)?)),
                None => None,
            },
            (FieldShape::OneOf(_), FieldValue::OneOf(selected)) => match selected {
                Some(variant) => {
                    let member = field.member(&variant.member).ok_or_else(|| {
                        field_error(
                            &message.name,
                            &field.name,
                            format!("unknown member '{}'", variant.member),
                        )
                    })?;
                    let payload = self.field(message, member, &variant.value)?;
                    let mut object = Map::new();
                    object.insert(variant.member.clone(), payload.unwrap_or(Value::Null));
                    Some(Value::Object(object))
                }
                None => None,
            },
            (shape, value) => {
                return Err(field_error(
                    &message.name,
                    &field.name,
                    format!(
                        "{} value for a {} field",
                        value.shape_name(),
                        shape.category()
                    ),
                ));
            }
        };
        Ok(json)
    }

    fn element(
        &self,
        message: &MessageDescriptor,
        field: &FieldDescriptor,
        element_type: &ElementType,
        element: &Element,
    ) -> Result<Value> {
        match (element_type, element) {
            (ElementType::Scalar(_), Element::Scalar(scalar)) => Ok(scalar_to_json(scalar)),
            (ElementType::Message(nested), Element::Record(record)) => {
                self.nested(nested, record).map(Value::Object)
            }
            _ => Err(field_error(
                &message.name,
                &field.name,
                "element does not match the declared element type",
            )),
        }
    }

    fn nested(&self, message: &str, record: &Record) -> Result<Map<String, Value>> {
        let descriptor = self
            .set
            .message(message)
            .ok_or_else(|| RuleError::UnknownMessage(message.to_string()))?;
        self.record(descriptor, record)
    }
}

struct Decoder<'a> {
    set: &'a DescriptorSet,
}

impl Decoder<'_> {
    fn record(&self, message: &MessageDescriptor, value: &Value) -> Result<Record> {
        let object = value.as_object().ok_or_else(|| {
            codec_error(format!("{}: expected an object, got {value}", message.name))
        })?;
        if let Some(unknown) = object.keys().find(|key| message.field(key).is_none()) {
            return Err(field_error(&message.name, unknown, "no such field"));
        }

        let mut record = Record::new(message.name.clone());
        for field in &message.fields {
            let value = match object.get(&field.name) {
                None | Some(Value::Null) => field.zero_value(),
                Some(json) => self.field(message, field, json)?,
            };
            record.set(field.name.clone(), value);
        }
        Ok(record)
    }

    fn field(
        &self,
        message: &MessageDescriptor,
        field: &FieldDescriptor,
        json: &Value,
    ) -> Result<FieldValue> {
        let fail = |reason: String| field_error(&message.name, &field.name, reason);

        let value = match &field.shape {
            FieldShape::Literal(ScalarKind::Bytes) | FieldShape::Nullable(ScalarKind::Bytes) => {
                FieldValue::Bytes(Some(decode_base64(json).map_err(fail)?))
            }
            FieldShape::Literal(kind) => {
                FieldValue::Literal(json_to_scalar(*kind, json).map_err(fail)?)
            }
            FieldShape::Nullable(kind) => {
                FieldValue::Nullable(Some(json_to_scalar(*kind, json).map_err(fail)?))
            }
            FieldShape::Sequence(items) => {
                let array = json
                    .as_array()
                    .ok_or_else(|| fail(format!("expected an array, got {json}")))?;
                let list = array
                    .iter()
                    .map(|item| self.element(message, field, items, item))
                    .collect::<Result<Vec<_>>>()?;
                FieldValue::List(Some(list))
            }
            FieldShape::Mapping { key, value: values } => {
                let object = json
                    .as_object()
                    .ok_or_else(|| fail(format!("expected an object, got {json}")))?;
                let mut map = BTreeMap::new();
                for (raw, item) in object {
                    let key = parse_key(*key, raw).map_err(fail)?;
                    map.insert(key, self.element(message, field, values, item)?);
                }
                FieldValue::Map(Some(map))
            }
            FieldShape::Message(nested) => {
                FieldValue::Message(Some(Box::new(self.nested(nested, json)?)))
            }
            FieldShape::OneOf(_) => {
                let object = json
                    .as_object()
                    .filter(|o| o.len() == 1)
                    .ok_or_else(|| fail(format!("expected a single-member object, got {json}")))?;
                let Some((name, payload)) = object.iter().next() else {
                    return Err(fail("empty oneof object".to_string()));
                };
                let member = field
                    .member(name)
                    .ok_or_else(|| fail(format!("unknown member '{name}'")))?;
                let value = match payload {
                    Value::Null => member.zero_value(),
                    payload => self.field(message, member, payload)?,
                };
                FieldValue::OneOf(Some(Variant::new(name.clone(), value)))
            }
        };
        Ok(value)
    }

    fn element(
        &self,
        message: &MessageDescriptor,
        field: &FieldDescriptor,
        element_type: &ElementType,
        json: &Value,
    ) -> Result<Element> {
        match element_type {
            ElementType::Scalar(ScalarKind::Bytes) => decode_base64(json)
                .map(|b| Element::Scalar(Scalar::Bytes(b)))
                .map_err(|reason| field_error(&message.name, &field.name, reason)),
            ElementType::Scalar(kind) => json_to_scalar(*kind, json)
                .map(Element::Scalar)
                .map_err(|reason| field_error(&message.name, &field.name, reason)),
            ElementType::Message(nested) => {
                Ok(Element::Record(Arc::new(self.nested(nested, json)?)))
            }
        }
    }

    fn nested(&self, message: &str, json: &Value) -> Result<Record> {
        let descriptor = self
            .set
            .message(message)
            .ok_or_else(|| RuleError::UnknownMessage(message.to_string()))?;
        self.record(descriptor, json)
    }
}

fn scalar_to_json(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Int(v) => Value::from(*v),
        Scalar::Uint(v) => Value::from(*v),
        Scalar::Float(v) => match Number::from_f64(*v) {
            Some(n) => Value::Number(n),
            None if v.is_nan() => Value::from("NaN"),
            None if *v > 0.0 => Value::from("Infinity"),
            None => Value::from("-Infinity"),
        },
        Scalar::Bool(v) => Value::Bool(*v),
        Scalar::Str(v) => Value::String(v.clone()),
        Scalar::Bytes(v) => Value::String(STANDARD.encode(v)),
        Scalar::Enum(v) => Value::from(*v),
    }
}

fn json_to_scalar(kind: ScalarKind, json: &Value) -> std::result::Result<Scalar, String> {
    let mismatch = || format!("expected {kind}, got {json}");
    let scalar = match kind.family() {
        ScalarFamily::Signed => match json {
            Value::Number(n) => n.as_i64().map(Scalar::Int),
            Value::String(s) => s.parse().ok().map(Scalar::Int),
            _ => None,
        },
        ScalarFamily::Unsigned => match json {
            Value::Number(n) => n.as_u64().map(Scalar::Uint),
            Value::String(s) => s.parse().ok().map(Scalar::Uint),
            _ => None,
        },
        ScalarFamily::Float => match json {
            Value::Number(n) => n.as_f64().map(Scalar::Float),
            Value::String(s) => match s.as_str() {
                "NaN" => Some(Scalar::Float(f64::NAN)),
                "Infinity" => Some(Scalar::Float(f64::INFINITY)),
                "-Infinity" => Some(Scalar::Float(f64::NEG_INFINITY)),
                other => other.parse().ok().map(Scalar::Float),
            },
            _ => None,
        },
        ScalarFamily::Bool => json.as_bool().map(Scalar::Bool),
        ScalarFamily::String => json.as_str().map(Scalar::from),
        ScalarFamily::Bytes => return decode_base64(json).map(Scalar::Bytes),
        ScalarFamily::Enum => json
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Scalar::Enum),
    }
    .ok_or_else(mismatch)?;

    if kind.accepts(&scalar) {
        Ok(scalar)
    } else {
        Err(format!("{scalar} is out of range for {kind}"))
    }
}

fn decode_base64(json: &Value) -> std::result::Result<Vec<u8>, String> {
    let text = json
        .as_str()
        .ok_or_else(|| format!("expected a base64 string, got {json}"))?;
    STANDARD
        .decode(text)
        .map_err(|e| format!("invalid base64: {e}"))
}

fn key_to_string(key: &MapKey) -> String {
    match key {
        MapKey::Int(v) => v.to_string(),
        MapKey::Uint(v) => v.to_string(),
        MapKey::Bool(v) => v.to_string(),
        MapKey::Str(v) => v.clone(),
    }
}

fn parse_key(kind: ScalarKind, raw: &str) -> std::result::Result<MapKey, String> {
    let key = match kind.family() {
        ScalarFamily::Signed => raw.parse().ok().map(MapKey::Int),
        ScalarFamily::Unsigned => raw.parse().ok().map(MapKey::Uint),
        ScalarFamily::Bool => raw.parse().ok().map(MapKey::Bool),
        _ => Some(MapKey::Str(raw.to_string())),
    }
    .ok_or_else(|| format!("map key '{raw}' is not a valid {kind}"))?;

    if kind.accepts(&key.to_scalar()) {
        Ok(key)
    } else {
        Err(format!("map key '{raw}' is out of range for {kind}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn set() -> anyhow::Result<DescriptorSet> {
        Ok(DescriptorSet::new([
            MessageDescriptor::new(
                "Profile",
                vec![
                    FieldDescriptor::literal("name", ScalarKind::String),
                    FieldDescriptor::literal("age", ScalarKind::Int32),
                    FieldDescriptor::nullable("nickname", ScalarKind::String),
                    FieldDescriptor::literal("avatar", ScalarKind::Bytes),
                    FieldDescriptor::mapping(
                        "scores",
                        ScalarKind::Uint32,
                        ElementType::Scalar(ScalarKind::Double),
                    ),
                    FieldDescriptor::message("home", "Address"),
                    FieldDescriptor::one_of(
                        "contact",
                        vec![
                            FieldDescriptor::literal("email", ScalarKind::String),
                            FieldDescriptor::message("postal", "Address"),
                        ],
                    ),
                ],
            ),
            MessageDescriptor::new(
                "Address",
                vec![FieldDescriptor::literal("city", ScalarKind::String)],
            ),
        ])?)
    }

    #[test]
    fn test_encode_omits_absent_fields() -> anyhow::Result<()> {
        let set = set()?;
        let codec = SchemaJsonCodec::new(&set, "Profile")?;

        let mut scores = BTreeMap::new();
        scores.insert(MapKey::Uint(7), Element::from(f64::INFINITY));
        let record = Record::new("Profile")
            .with_literal("name", "ann")
            .with("avatar", FieldValue::Bytes(Some(b"hi".to_vec())))
            .with("scores", FieldValue::Map(Some(scores)))
            .with(
                "contact",
                FieldValue::OneOf(Some(Variant::new(
                    "email",
                    FieldValue::Literal(Scalar::from("ann@example.org")),
                ))),
            );

        assert_eq!(
            codec.to_value(&record)?,
            json!({
                "name": "ann",
                "age": 0,
                "avatar": "aGk=",
                "scores": {"7": "Infinity"},
                "contact": {"email": "ann@example.org"},
            })
        );
        Ok(())
    }

    #[test]
    fn test_decode_restores_representations() -> anyhow::Result<()> {
        let set = set()?;
        let codec = SchemaJsonCodec::new(&set, "Profile")?;

        let record = codec.decode(
            br#"{"name": "bo", "nickname": "", "home": {}, "contact": {"postal": {"city": "Oslo"}}}"#,
        )?;
        assert_eq!(record.get("age"), Some(&FieldValue::Literal(Scalar::Int(0))));
        // present but empty stays present
        assert_eq!(
            record.get("nickname"),
            Some(&FieldValue::Nullable(Some(Scalar::from(""))))
        );
        assert_eq!(record.get("avatar"), Some(&FieldValue::Bytes(None)));
        assert_eq!(record.get("scores"), Some(&FieldValue::Map(None)));
        assert!(matches!(record.get("home"), Some(FieldValue::Message(Some(_)))));

        let Some(FieldValue::OneOf(Some(variant))) = record.get("contact") else {
            anyhow::bail!("contact not decoded");
        };
        assert_eq!(variant.member, "postal");

        let again = codec.decode(&codec.encode(&record)?)?;
        assert_eq!(again, record);
        Ok(())
    }

    #[test]
    fn test_decode_errors() -> anyhow::Result<()> {
        let set = set()?;
        let codec = SchemaJsonCodec::new(&set, "Profile")?;

        for input in [
            r#"{"unknown": 1}"#,
            r#"{"age": 3000000000}"#,
            r#"{"age": "x"}"#,
            r#"{"avatar": "***"}"#,
            r#"{"scores": {"-1": 1.0}}"#,
            r#"{"contact": {"email": "a", "postal": {}}}"#,
            r#"{"contact": {"fax": "1"}}"#,
            r#"[]"#,
        ] {
            let err = codec.decode(input.as_bytes()).unwrap_err();
            assert!(
                matches!(err, RuleError::CodecError { codec: "schema_json", .. }),
                "{input}: {err}"
            );
        }
        Ok(())
    }

    #[test]
    fn test_int64_accepts_strings() -> anyhow::Result<()> {
        assert_eq!(
            json_to_scalar(ScalarKind::Int64, &json!("-9007199254740993")),
            Ok(Scalar::Int(-9_007_199_254_740_993))
        );
        assert_eq!(
            json_to_scalar(ScalarKind::Double, &json!("NaN")).map(|s| s.to_string()),
            Ok("NaN".to_string())
        );
        assert!(json_to_scalar(ScalarKind::Uint64, &json!(-1)).is_err());
        Ok(())
    }

    #[test]
    fn test_wrong_message_type() -> anyhow::Result<()> {
        let set = set()?;
        let codec = SchemaJsonCodec::new(&set, "Profile")?;
        assert!(codec.encode(&Record::new("Address")).is_err());
        assert!(SchemaJsonCodec::new(&set, "Nope").is_err());
        Ok(())
    }
}
