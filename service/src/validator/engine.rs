//! Constraint evaluation over record instances
//!
//! The walk is depth-first over fields in declaration order and stops at the
//! first broken constraint anywhere in the instance.

use super::report::{FieldDescription, Violation};
use super::validators::{UniqueValueTracker, ValidatorRegistry};
use protorules_core::config::ValidationSettings;
use protorules_core::constraint::{Constraint, has_rule};
use protorules_core::descriptor::{
    DescriptorSet, ElementType, FieldDescriptor, FieldShape, MessageDescriptor,
};
use protorules_core::types::{Element, FieldValue, Record, Scalar, ScalarKind};
use std::borrow::Cow;
use std::fmt;
use tracing::{debug, trace, warn};

/// Outcome of validating one record
pub type ValidationResult = std::result::Result<(), Violation>;

/// Validates records against a descriptor set
#[derive(Debug)]
pub struct Validator<'a> {
    set: &'a DescriptorSet,
    settings: ValidationSettings,
    registry: ValidatorRegistry,
}

impl<'a> Validator<'a> {
    /// Create a validator with default settings
    #[must_use]
    pub fn new(set: &'a DescriptorSet) -> Self {
        Self::with_settings(set, ValidationSettings::default())
    }

    /// Create a validator with explicit settings
    #[must_use]
    pub fn with_settings(set: &'a DescriptorSet, settings: ValidationSettings) -> Self {
        Self {
            set,
            settings,
            registry: ValidatorRegistry::new(),
        }
    }

    /// Validate a record, returning the first violation
    ///
    /// A record whose message type is not in the descriptor set has no rules
    /// and is valid.
    ///
    /// # Errors
    ///
    /// Returns the first [`Violation`] found.
    pub fn validate(&self, record: &Record) -> ValidationResult {
        let Some(message) = self.set.message(record.message()) else {
            warn!(
                message_type = record.message(),
                "no descriptor for message type, nothing to validate"
            );
            return Ok(());
        };
        debug!(message_type = %message.name, "validating record");
        self.validate_record(message, record)
            .inspect_err(|violation| debug!(%violation, "validation failed"))
    }

    /// Validate a possibly absent record; an absent record is valid
    ///
    /// # Errors
    ///
    /// Returns the first [`Violation`] found.
    pub fn validate_optional(&self, record: Option<&Record>) -> ValidationResult {
        match record {
            Some(record) => self.validate(record),
            None => Ok(()),
        }
    }

    fn validate_record(&self, message: &MessageDescriptor, record: &Record) -> ValidationResult {
        for field in &message.fields {
            if let Some(gate) = &field.gate
                && !gate.is_satisfied(record, message)
            {
                trace!(
                    message_type = %message.name,
                    field = %field.name,
                    "gate closed, field skipped"
                );
                continue;
            }

            let zero;
            let value = match record.get(&field.name) {
                Some(value) => value,
                None => {
                    zero = field.zero_value();
                    &zero
                }
            };
            self.validate_field(&message.name, field, value)?;
        }
        Ok(())
    }

    /// Validate a nested record against the named message type
    fn validate_nested(&self, message: &str, record: &Record) -> ValidationResult {
        match self.set.message(message) {
            Some(descriptor) => self.validate_record(descriptor, record),
            None => {
                warn!(message_type = message, "no descriptor for nested message type");
                Ok(())
            }
        }
    }

    fn validate_field(
        &self,
        message: &str,
        field: &FieldDescriptor,
        value: &FieldValue,
    ) -> ValidationResult {
        let name = || FieldDescription::Field(field.name.clone());
        let absent = |rule: Constraint| Err(Violation::absent(message, name(), rule));

        let coerced = coerce(&field.shape, value);
        let value = coerced.as_ref();
        match (&field.shape, value) {
            (FieldShape::Literal(_), FieldValue::Literal(scalar)) => {
                self.check_scalar(message, &name(), &field.rules, scalar)
            }
            (FieldShape::Nullable(_), FieldValue::Nullable(scalar)) => match scalar {
                Some(scalar) => self.check_scalar(message, &name(), &field.rules, scalar),
                None if has_rule(&field.rules, &Constraint::NotNull) => absent(Constraint::NotNull),
                None => Ok(()),
            },
            (
                FieldShape::Literal(ScalarKind::Bytes) | FieldShape::Nullable(ScalarKind::Bytes),
                FieldValue::Bytes(bytes),
            ) => {
                match bytes {
                    Some(bytes) => {
                        let scalar = Scalar::Bytes(bytes.clone());
                        self.check_scalar(message, &name(), &field.rules, &scalar)
                    }
                    None if has_rule(&field.rules, &Constraint::NotNull) => {
                        absent(Constraint::NotNull)
                    }
                    // an absent literal bytes field reads as empty
                    None if matches!(field.shape, FieldShape::Literal(_)) => self.check_scalar(
                        message,
                        &name(),
                        &field.rules,
                        &Scalar::Bytes(Vec::new()),
                    ),
                    None => Ok(()),
                }
            }
            (FieldShape::Sequence(items), FieldValue::List(list)) => {
                self.check_collection(message, field, list.as_ref().map(Vec::len), value)?;
                match list {
                    Some(list) => self.validate_sequence(message, field, items, list),
                    None => Ok(()),
                }
            }
            (FieldShape::Mapping { value: values, .. }, FieldValue::Map(map)) => {
                let Some(entries) = map else {
                    return self.check_collection(message, field, None, value);
                };
                self.check_collection(message, field, Some(entries.len()), value)?;
                for (key, element) in entries {
                    self.check_scalar(
                        message,
                        &FieldDescription::MapKey(field.name.clone()),
                        &field.key_rules,
                        &key.to_scalar(),
                    )?;
                    self.validate_element(
                        message,
                        &FieldDescription::MapValue(field.name.clone()),
                        values,
                        &field.value_rules,
                        element,
                    )?;
                }
                Ok(())
            }
            (FieldShape::Message(nested), FieldValue::Message(record)) => match record {
                None if has_rule(&field.rules, &Constraint::NotNull) => absent(Constraint::NotNull),
                None => Ok(()),
                Some(_) if has_rule(&field.rules, &Constraint::Skip) => Ok(()),
                Some(record) => self.validate_nested(nested, record),
            },
            (FieldShape::OneOf(_), FieldValue::OneOf(selected)) => {
                let Some(variant) = selected else {
                    if has_rule(&field.rules, &Constraint::NotNull) {
                        return absent(Constraint::NotNull);
                    }
                    return Ok(());
                };
                let Some(member) = field.member(&variant.member) else {
                    warn!(
                        message_type = message,
                        field = %field.name,
                        member = %variant.member,
                        "unknown oneof member selected"
                    );
                    return self.unreadable(message, name(), &field.rules, value);
                };
                if has_rule(&field.rules, &Constraint::Skip)
                    && matches!(*variant.value, FieldValue::Message(None))
                {
                    return Ok(());
                }
                self.validate_field(message, member, &variant.value)
            }
            (shape, value) => {
                warn!(
                    message_type = message,
                    field = %field.name,
                    expected = %shape.category(),
                    found = value.shape_name(),
                    "field value does not match its descriptor"
                );
                self.unreadable(message, name(), &field.rules, value)
            }
        }
    }

    fn validate_sequence(
        &self,
        message: &str,
        field: &FieldDescriptor,
        items: &ElementType,
        list: &[Element],
    ) -> ValidationResult {
        if has_rule(&field.rules, &Constraint::Unique)
            && let Some(duplicate) = UniqueValueTracker::first_duplicate(list)
        {
            return Err(self.broken(
                message,
                FieldDescription::Field(field.name.clone()),
                Constraint::Unique,
                duplicate,
            ));
        }

        let description = FieldDescription::Item(field.name.clone());
        for element in list {
            self.validate_element(message, &description, items, &field.item_rules, element)?;
        }
        Ok(())
    }

    /// Collection-level rules: `not_null` and `len`, in declared order
    fn check_collection(
        &self,
        message: &str,
        field: &FieldDescriptor,
        len: Option<usize>,
        value: &FieldValue,
    ) -> ValidationResult {
        for rule in &field.rules {
            match rule {
                Constraint::NotNull if len.is_none() => {
                    return Err(Violation::absent(
                        message,
                        FieldDescription::Field(field.name.clone()),
                        Constraint::NotNull,
                    ));
                }
                Constraint::Len(op, n) if !op.holds(Some(len.unwrap_or(0).cmp(n))) => {
                    // an absent collection has no elements
                    let shown: &dyn fmt::Display = match (len, value) {
                        (Some(_), _) => value,
                        (None, FieldValue::Map(_)) => &"{}",
                        (None, _) => &"[]",
                    };
                    return Err(self.broken(
                        message,
                        FieldDescription::Field(field.name.clone()),
                        rule.clone(),
                        shown,
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Validate one sequence item or mapping value
    fn validate_element(
        &self,
        message: &str,
        description: &FieldDescription,
        element_type: &ElementType,
        rules: &[Constraint],
        element: &Element,
    ) -> ValidationResult {
        match (element_type, element) {
            (ElementType::Scalar(_), Element::Scalar(scalar)) => {
                self.check_scalar(message, description, rules, scalar)
            }
            (ElementType::Message(_), Element::Record(_)) if has_rule(rules, &Constraint::Skip) => {
                Ok(())
            }
            (ElementType::Message(name), Element::Record(record)) => {
                self.validate_nested(name, record)
            }
            (_, element) => {
                warn!(
                    message_type = message,
                    field = description.field_name(),
                    "element does not match its descriptor"
                );
                self.unreadable(message, description.clone(), rules, element)
            }
        }
    }

    /// Evaluate value rules against one scalar, in order
    fn check_scalar(
        &self,
        message: &str,
        description: &FieldDescription,
        rules: &[Constraint],
        value: &Scalar,
    ) -> ValidationResult {
        for rule in rules {
            if rule.is_presence() {
                continue;
            }
            if !self.registry.check(rule, value) {
                return Err(self.broken(message, description.clone(), rule.clone(), value));
            }
        }
        Ok(())
    }

    /// A value that cannot be read as its declared shape breaks the first
    /// rule it carries; `skip` alone leaves nothing to break
    fn unreadable(
        &self,
        message: &str,
        description: FieldDescription,
        rules: &[Constraint],
        value: &dyn fmt::Display,
    ) -> ValidationResult {
        match rules.iter().find(|rule| **rule != Constraint::Skip) {
            Some(rule) => Err(self.broken(message, description, rule.clone(), value)),
            None => Ok(()),
        }
    }

    fn broken(
        &self,
        message: &str,
        description: FieldDescription,
        rule: Constraint,
        value: &dyn fmt::Display,
    ) -> Violation {
        Violation::with_value(
            message,
            description,
            rule,
            value,
            self.settings.max_value_len,
        )
    }
}

/// Read a literal value on a nullable field as present, and a nullable value
/// on a literal field as the literal it holds (zero when absent)
fn coerce<'v>(shape: &FieldShape, value: &'v FieldValue) -> Cow<'v, FieldValue> {
    match (shape, value) {
        (
            FieldShape::Literal(ScalarKind::Bytes) | FieldShape::Nullable(ScalarKind::Bytes),
            FieldValue::Literal(Scalar::Bytes(bytes)) | FieldValue::Nullable(Some(Scalar::Bytes(bytes))),
        ) => Cow::Owned(FieldValue::Bytes(Some(bytes.clone()))),
        (
            FieldShape::Literal(ScalarKind::Bytes) | FieldShape::Nullable(ScalarKind::Bytes),
            FieldValue::Nullable(None),
        ) => Cow::Owned(FieldValue::Bytes(None)),
        (FieldShape::Nullable(_), FieldValue::Literal(scalar)) => {
            Cow::Owned(FieldValue::Nullable(Some(scalar.clone())))
        }
        (FieldShape::Literal(_), FieldValue::Nullable(Some(scalar))) => {
            Cow::Owned(FieldValue::Literal(scalar.clone()))
        }
        (FieldShape::Literal(kind), FieldValue::Nullable(None)) => {
            Cow::Owned(FieldValue::Literal(kind.zero()))
        }
        _ => Cow::Borrowed(value),
    }
}

/// Validate a possibly absent record with default settings
///
/// # Errors
///
/// Returns the first [`Violation`] found.
pub fn validate(set: &DescriptorSet, record: Option<&Record>) -> ValidationResult {
    Validator::new(set).validate_optional(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protorules_core::descriptor::MessageDescriptor;
    use pretty_assertions::assert_eq;

    fn numbers() -> anyhow::Result<DescriptorSet> {
        Ok(DescriptorSet::new([MessageDescriptor::new(
            "Numbers",
            vec![
                FieldDescriptor::literal("t_int32_gt1", ScalarKind::Int32).with_rule(Constraint::gt(4)),
                FieldDescriptor::nullable("t_opt", ScalarKind::Int64).with_rule(Constraint::lte(10_i64)),
            ],
        )])?)
    }

    #[test]
    fn test_first_violation_is_reported() -> anyhow::Result<()> {
        let set = numbers()?;
        let validator = Validator::new(&set);

        let record = Record::new("Numbers").with_literal("t_int32_gt1", 3);
        let violation = validator.validate(&record).unwrap_err();
        assert_eq!(
            violation.to_string(),
            "Numbers: field 't_int32_gt1' must be greater than 4 with 3"
        );

        let record = Record::new("Numbers").with_literal("t_int32_gt1", 5);
        assert_eq!(validator.validate(&record), Ok(()));
        Ok(())
    }

    #[test]
    fn test_absent_nullable_is_skipped() -> anyhow::Result<()> {
        let set = numbers()?;
        let record = Record::new("Numbers")
            .with_literal("t_int32_gt1", 5)
            .with("t_opt", FieldValue::Nullable(None));
        assert_eq!(Validator::new(&set).validate(&record), Ok(()));

        let record = record.with_nullable("t_opt", 11_i64);
        assert!(Validator::new(&set).validate(&record).is_err());
        Ok(())
    }

    #[test]
    fn test_unknown_message_and_absent_instance() -> anyhow::Result<()> {
        let set = numbers()?;
        let validator = Validator::new(&set);
        assert_eq!(validator.validate(&Record::new("Other")), Ok(()));
        assert_eq!(validator.validate_optional(None), Ok(()));
        assert_eq!(validate(&set, None), Ok(()));
        Ok(())
    }
}
