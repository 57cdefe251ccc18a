//! Default value injection
//!
//! Literal scalars have no "was set" bit, so the only unset signal is the zero
//! value: a literal equal to zero is overwritten when a default exists, even
//! if the caller set that zero on purpose. Nullable scalars, bytes and
//! collections are only filled while absent.

use protorules_core::descriptor::{
    DefaultValue, DescriptorSet, FieldDescriptor, FieldShape, MessageDescriptor,
};
use protorules_core::types::{Element, FieldValue, MapKey, Record, ScalarKind, Variant};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// Apply configured defaults to records
#[derive(Debug, Clone, Copy)]
pub struct DefaultApplier<'a> {
    set: &'a DescriptorSet,
}

impl<'a> DefaultApplier<'a> {
    /// Create a new default applier
    #[must_use]
    pub fn new(set: &'a DescriptorSet) -> Self {
        Self { set }
    }

    /// Apply defaults to a possibly absent record
    ///
    /// An absent record is left alone. This never fails; fields without a
    /// configured default are left unmodified.
    pub fn apply(&self, record: Option<&mut Record>) {
        let Some(record) = record else {
            return;
        };
        let Some(message) = self.set.message(record.message()) else {
            warn!(
                message_type = record.message(),
                "no descriptor for message type, no defaults applied"
            );
            return;
        };
        debug!(message_type = %message.name, "applying defaults");
        self.apply_record(message, record);
    }

    /// A new record of `message` with every default applied
    #[must_use]
    pub fn instantiate(&self, message: &str) -> Option<Record> {
        let descriptor = self.set.message(message)?;
        let mut record = self.set.instantiate(message)?;
        self.apply_record(descriptor, &mut record);
        Some(record)
    }

    fn apply_record(&self, message: &MessageDescriptor, record: &mut Record) {
        for field in &message.fields {
            // gates read the record as it is right now, including defaults
            // injected into earlier fields
            if let Some(gate) = &field.gate
                && !gate.is_satisfied(record, message)
            {
                trace!(
                    message_type = %message.name,
                    field = %field.name,
                    "gate closed, no default"
                );
                continue;
            }

            match record.get_mut(&field.name) {
                Some(value) => {
                    self.apply_field(&message.name, field, value);
                }
                None => {
                    let mut value = field.zero_value();
                    if self.apply_field(&message.name, field, &mut value) {
                        record.set(field.name.clone(), value);
                    }
                }
            }
        }
    }

    /// Apply the policy for one field
    ///
    /// Returns whether a default was injected into the field itself; filling
    /// in a present nested record does not count.
    fn apply_field(
        &self,
        message: &str,
        field: &FieldDescriptor,
        value: &mut FieldValue,
    ) -> bool {
        let changed = match (&field.shape, value) {
            (FieldShape::Literal(_), FieldValue::Literal(current)) => {
                match &field.default {
                    Some(DefaultValue::Scalar(default)) if current.is_zero() => {
                        *current = default.clone();
                        true
                    }
                    _ => false,
                }
            }
            (FieldShape::Nullable(_), FieldValue::Nullable(current @ None)) => {
                match &field.default {
                    Some(DefaultValue::Scalar(default)) => {
                        *current = Some(default.clone());
                        true
                    }
                    _ => false,
                }
            }
            (_, FieldValue::Bytes(current @ None)) => match &field.default {
                Some(DefaultValue::Scalar(default)) => match default.as_bytes() {
                    Some(bytes) => {
                        *current = Some(bytes.to_vec());
                        true
                    }
                    None => false,
                },
                _ => false,
            },
            (FieldShape::Sequence(_), FieldValue::List(current @ None)) => match &field.default {
                Some(DefaultValue::List(items)) => {
                    *current = Some(items.iter().cloned().map(Element::Scalar).collect());
                    true
                }
                _ => false,
            },
            (FieldShape::Mapping { .. }, FieldValue::Map(current @ None)) => match &field.default {
                Some(DefaultValue::Map(entries)) => {
                    let map: BTreeMap<MapKey, Element> = entries
                        .iter()
                        .map(|(k, v)| (k.clone(), Element::Scalar(v.clone())))
                        .collect();
                    *current = Some(map);
                    true
                }
                _ => false,
            },
            (FieldShape::Message(nested), FieldValue::Message(current)) => match current {
                Some(record) => {
                    self.apply_nested(nested, record);
                    false
                }
                None if matches!(field.default, Some(DefaultValue::Construct)) => {
                    match self.instantiate(nested) {
                        Some(record) => {
                            *current = Some(Box::new(record));
                            true
                        }
                        None => false,
                    }
                }
                None => false,
            },
            (FieldShape::OneOf(_), FieldValue::OneOf(current)) => match current {
                Some(variant) => self.apply_member(message, field, variant),
                None => match &field.default {
                    Some(DefaultValue::Member(name)) => match self.member_default(field, name) {
                        Some(variant) => {
                            *current = Some(variant);
                            true
                        }
                        None => false,
                    },
                    _ => false,
                },
            },
            _ => false,
        };

        if changed {
            trace!(message_type = message, field = %field.name, "default applied");
        }
        changed
    }

    /// Recurse into a present nested record
    fn apply_nested(&self, message: &str, record: &mut Record) {
        match self.set.message(message) {
            Some(descriptor) => self.apply_record(descriptor, record),
            None => warn!(message_type = message, "no descriptor for nested message type"),
        }
    }

    /// Selected member: literal policy for scalars, construct-or-recurse for
    /// records. The selection itself never changes.
    fn apply_member(
        &self,
        message: &str,
        field: &FieldDescriptor,
        variant: &mut Variant,
    ) -> bool {
        let Some(member) = field.member(&variant.member) else {
            return false;
        };
        // selected bytes follow the literal policy: empty is zero
        if let (FieldShape::Literal(ScalarKind::Bytes), FieldValue::Bytes(Some(current))) =
            (&member.shape, variant.value.as_mut())
            && current.is_empty()
            && let Some(DefaultValue::Scalar(default)) = &member.default
            && let Some(bytes) = default.as_bytes()
        {
            *current = bytes.to_vec();
            trace!(message_type = message, field = %field.name, member = %member.name, "default applied");
            return true;
        }
        self.apply_field(message, member, &mut variant.value)
    }

    /// Payload for an unselected union defaulting to `name`
    fn member_default(&self, field: &FieldDescriptor, name: &str) -> Option<Variant> {
        let member = field.member(name)?;
        let value = match &member.shape {
            FieldShape::Literal(ScalarKind::Bytes) => {
                let bytes = match &member.default {
                    Some(DefaultValue::Scalar(default)) => default.as_bytes().map(<[u8]>::to_vec),
                    _ => None,
                };
                FieldValue::Bytes(Some(bytes.unwrap_or_default()))
            }
            FieldShape::Literal(kind) => FieldValue::Literal(match &member.default {
                Some(DefaultValue::Scalar(default)) => default.clone(),
                _ => kind.zero(),
            }),
            FieldShape::Message(nested) => {
                FieldValue::Message(Some(Box::new(self.instantiate(nested)?)))
            }
            _ => return None,
        };
        Some(Variant::new(name, value))
    }
}

/// Apply defaults to a possibly absent record
pub fn apply_defaults(set: &DescriptorSet, record: Option<&mut Record>) {
    DefaultApplier::new(set).apply(record);
}
