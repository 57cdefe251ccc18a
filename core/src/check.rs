//! Build-time checking of rule tables
//!
//! Every operator is applicable to a fixed set of field kinds. A rule table
//! that breaks this is rejected here, when the descriptor set is built, so
//! that validation never has to deal with it.

use crate::constraint::Constraint;
use crate::descriptor::{
    Condition, DefaultValue, DescriptorSet, ElementType, FieldCategory, FieldDescriptor,
    FieldShape, MessageDescriptor,
};
use crate::error::{Result, RuleError};
use crate::types::{Scalar, ScalarKind};
use std::collections::HashSet;

/// Check one message of `set`
pub(crate) fn check_message(set: &DescriptorSet, message: &MessageDescriptor) -> Result<()> {
    let mut seen = HashSet::new();
    for field in &message.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(RuleError::DuplicateField {
                message: message.name.clone(),
                field: field.name.clone(),
            });
        }
        check_field(set, message, field)?;
        if let Some(gate) = &field.gate {
            check_gate(message, field, gate)?;
        }
    }
    Ok(())
}

/// Reject defaults that would construct records forever
///
/// `construct` defaults and union defaults selecting a record member
/// instantiate another message, whose own defaults are applied in turn.
pub(crate) fn check_construct_cycles(set: &DescriptorSet) -> Result<()> {
    let mut done = HashSet::new();
    for message in set.messages() {
        let mut stack = Vec::new();
        visit(set, message, &mut stack, &mut done)?;
    }
    Ok(())
}

fn constructed(message: &MessageDescriptor) -> impl Iterator<Item = (&FieldDescriptor, &str)> {
    message
        .fields
        .iter()
        .filter_map(|field| match (&field.shape, &field.default) {
            (FieldShape::Message(target), Some(DefaultValue::Construct)) => {
                Some((field, target.as_str()))
            }
            (FieldShape::OneOf(_), Some(DefaultValue::Member(name))) => {
                match field.member(name).map(|m| &m.shape) {
                    Some(FieldShape::Message(target)) => Some((field, target.as_str())),
                    _ => None,
                }
            }
            _ => None,
        })
}

fn visit<'a>(
    set: &'a DescriptorSet,
    message: &'a MessageDescriptor,
    stack: &mut Vec<&'a str>,
    done: &mut HashSet<&'a str>,
) -> Result<()> {
    if done.contains(message.name.as_str()) {
        return Ok(());
    }
    stack.push(&message.name);
    for (field, target) in constructed(message) {
        if stack.contains(&target) {
            return Err(RuleError::invalid_default(
                &message.name,
                &field.name,
                format!("constructing '{target}' never terminates"),
            ));
        }
        if let Some(next) = set.message(target) {
            visit(set, next, stack, done)?;
        }
    }
    stack.pop();
    done.insert(&message.name);
    Ok(())
}

fn check_field(set: &DescriptorSet, message: &MessageDescriptor, field: &FieldDescriptor) -> Result<()> {
    let ctx = Ctx {
        message: &message.name,
        field: &field.name,
    };

    if field.category() != FieldCategory::Sequence && !field.item_rules.is_empty() {
        return Err(ctx.rule("item rules are only allowed on sequences"));
    }
    if field.category() != FieldCategory::Mapping
        && !(field.key_rules.is_empty() && field.value_rules.is_empty())
    {
        return Err(ctx.rule("key and value rules are only allowed on mappings"));
    }

    match &field.shape {
        FieldShape::Literal(kind) => {
            for rule in &field.rules {
                match rule {
                    Constraint::NotNull if *kind == ScalarKind::Bytes => {}
                    Constraint::NotNull => {
                        return Err(ctx.rule("not_null needs a presence-tracked field"));
                    }
                    rule => check_scalar_rule(&ctx, *kind, rule)?,
                }
            }
        }
        FieldShape::Nullable(kind) => {
            for rule in &field.rules {
                if *rule != Constraint::NotNull {
                    check_scalar_rule(&ctx, *kind, rule)?;
                }
            }
        }
        FieldShape::Sequence(items) => {
            check_element_type(set, items)?;
            for rule in &field.rules {
                match rule {
                    Constraint::NotNull | Constraint::Len(..) | Constraint::Unique => {}
                    other => {
                        return Err(ctx.rule(format!("{} is not a sequence rule", other.name())));
                    }
                }
            }
            check_element_rules(&ctx, items, &field.item_rules)?;
        }
        FieldShape::Mapping { key, value } => {
            if !key.is_map_key() {
                return Err(RuleError::invalid_field(
                    ctx.message,
                    ctx.field,
                    format!("{key} cannot key a map"),
                ));
            }
            check_element_type(set, value)?;
            for rule in &field.rules {
                match rule {
                    Constraint::NotNull | Constraint::Len(..) => {}
                    other => {
                        return Err(ctx.rule(format!("{} is not a mapping rule", other.name())));
                    }
                }
            }
            for rule in &field.key_rules {
                check_scalar_rule(&ctx, *key, rule)?;
            }
            check_element_rules(&ctx, value, &field.value_rules)?;
        }
        FieldShape::Message(name) => {
            if !set.contains(name) {
                return Err(RuleError::UnknownMessage(name.clone()));
            }
            check_presence_rules(&ctx, &field.rules)?;
        }
        FieldShape::OneOf(members) => {
            check_presence_rules(&ctx, &field.rules)?;
            let mut names = HashSet::new();
            for member in members {
                if !names.insert(member.name.as_str()) {
                    return Err(RuleError::DuplicateField {
                        message: message.name.clone(),
                        field: member.name.clone(),
                    });
                }
                if !matches!(member.shape, FieldShape::Literal(_) | FieldShape::Message(_)) {
                    return Err(RuleError::invalid_field(
                        ctx.message,
                        &member.name,
                        format!("a oneof member cannot be a {}", member.category()),
                    ));
                }
                if member.gate.is_some() {
                    return Err(RuleError::invalid_gate(
                        ctx.message,
                        &member.name,
                        "oneof members cannot be gated",
                    ));
                }
                check_field(set, message, member)?;
            }
        }
    }

    if let Some(default) = &field.default {
        check_default(&ctx, field, default)?;
    }
    Ok(())
}

struct Ctx<'a> {
    message: &'a str,
    field: &'a str,
}

impl Ctx<'_> {
    fn rule(&self, reason: impl Into<String>) -> RuleError {
        RuleError::invalid_rule(self.message, self.field, reason)
    }

    fn default(&self, reason: impl Into<String>) -> RuleError {
        RuleError::invalid_default(self.message, self.field, reason)
    }
}

fn check_scalar_rule(ctx: &Ctx<'_>, kind: ScalarKind, rule: &Constraint) -> Result<()> {
    let textual_only = |name: &str| -> Result<()> {
        if kind.is_textual() {
            Ok(())
        } else {
            Err(ctx.rule(format!("{name} does not apply to {kind}")))
        }
    };

    match rule {
        Constraint::Compare(op, operand) => {
            if !kind.accepts(operand) {
                return Err(ctx.rule(format!("operand {operand} does not fit {kind}")));
            }
            if op.is_ordering() && !kind.is_numeric() {
                return Err(ctx.rule(format!("{kind} values are not ordered")));
            }
            Ok(())
        }
        Constraint::In(values) | Constraint::NotIn(values) => {
            match values.iter().find(|v| !kind.accepts(v)) {
                Some(v) => Err(ctx.rule(format!("set member {v} does not fit {kind}"))),
                None => Ok(()),
            }
        }
        Constraint::CharLen(..) | Constraint::DateTime(_) if kind != ScalarKind::String => {
            Err(ctx.rule(format!("{} only applies to strings", rule.name())))
        }
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
        | Constraint::Format(_)
        | Constraint::DateTime(_) => textual_only(rule.name()),
        Constraint::Len(..) | Constraint::Unique | Constraint::NotNull | Constraint::Skip => {
            Err(ctx.rule(format!("{} does not apply to a scalar", rule.name())))
        }
    }
}

fn check_presence_rules(ctx: &Ctx<'_>, rules: &[Constraint]) -> Result<()> {
    match rules.iter().find(|r| !r.is_presence()) {
        Some(rule) => Err(ctx.rule(format!(
            "only not_null and skip apply here, found {}",
            rule.name()
        ))),
        None => Ok(()),
    }
}

fn check_element_type(set: &DescriptorSet, element: &ElementType) -> Result<()> {
    match element {
        ElementType::Message(name) if !set.contains(name) => {
            Err(RuleError::UnknownMessage(name.clone()))
        }
        _ => Ok(()),
    }
}

fn check_element_rules(ctx: &Ctx<'_>, element: &ElementType, rules: &[Constraint]) -> Result<()> {
    match element {
        ElementType::Scalar(kind) => rules
            .iter()
            .try_for_each(|rule| check_scalar_rule(ctx, *kind, rule)),
        ElementType::Message(_) => match rules.iter().find(|r| **r != Constraint::Skip) {
            Some(rule) => Err(ctx.rule(format!(
                "only skip applies to record elements, found {}",
                rule.name()
            ))),
            None => Ok(()),
        },
    }
}

fn check_default(ctx: &Ctx<'_>, field: &FieldDescriptor, default: &DefaultValue) -> Result<()> {
    let fits = |kind: ScalarKind, value: &Scalar| -> Result<()> {
        if kind.accepts(value) {
            Ok(())
        } else {
            Err(ctx.default(format!("{value} does not fit {kind}")))
        }
    };

    match (&field.shape, default) {
        (FieldShape::Literal(kind) | FieldShape::Nullable(kind), DefaultValue::Scalar(value)) => {
            fits(*kind, value)
        }
        (FieldShape::Sequence(ElementType::Scalar(kind)), DefaultValue::List(items)) => {
            items.iter().try_for_each(|item| fits(*kind, item))
        }
        (
            FieldShape::Mapping {
                key,
                value: ElementType::Scalar(kind),
            },
            DefaultValue::Map(entries),
        ) => entries.iter().try_for_each(|(k, v)| {
            fits(*key, &k.to_scalar())?;
            fits(*kind, v)
        }),
        (FieldShape::Message(_), DefaultValue::Construct) => Ok(()),
        (FieldShape::OneOf(_), DefaultValue::Member(name)) => {
            if field.member(name).is_some() {
                Ok(())
            } else {
                Err(ctx.default(format!("'{name}' is not a member")))
            }
        }
        (shape, _) => Err(ctx.default(format!(
            "this default does not apply to a {}",
            shape.category()
        ))),
    }
}

fn check_gate(message: &MessageDescriptor, field: &FieldDescriptor, gate: &Condition) -> Result<()> {
    let err = |reason: String| RuleError::invalid_gate(&message.name, &field.name, reason);

    if gate.field() == field.name {
        return Err(err("a field cannot gate itself".to_string()));
    }
    let Some(sibling) = message.field(gate.field()) else {
        return Err(err(format!("no sibling field '{}'", gate.field())));
    };

    match gate {
        Condition::MemberSelected { member, .. } => {
            if sibling.member(member).is_some() {
                Ok(())
            } else {
                Err(err(format!("'{member}' is not a member of '{}'", sibling.name)))
            }
        }
        Condition::IsSet { .. } => Ok(()),
        Condition::Equals { value, .. } => match sibling.shape.scalar_kind() {
            Some(kind) if kind.accepts(value) => Ok(()),
            _ => Err(err(format!(
                "'{}' cannot be compared with {value}",
                sibling.name
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use crate::constraint::{Comparison, Constraint, StringFormat};
    use crate::descriptor::{
        Condition, DefaultValue, DescriptorSet, ElementType, FieldDescriptor, MessageDescriptor,
    };
    use crate::error::RuleError;
    use crate::types::{MapKey, Scalar, ScalarKind};

    fn single(field: FieldDescriptor) -> Result<DescriptorSet, RuleError> {
        DescriptorSet::new([
            MessageDescriptor::new("Msg", vec![field]),
            MessageDescriptor::new("Child", vec![]),
        ])
    }

    #[test]
    fn test_valid_rules_accepted() {
        let fields = [
            FieldDescriptor::literal("a", ScalarKind::Int32)
                .with_rule(Constraint::gt(4))
                .with_rule(Constraint::In(vec![Scalar::Int(5), Scalar::Int(6)])),
            FieldDescriptor::literal("b", ScalarKind::String)
                .with_rule(Constraint::CharLen(Comparison::Lte, 3))
                .with_rule(Constraint::Format(StringFormat::Ipv4)),
            FieldDescriptor::literal("c", ScalarKind::Bytes)
                .with_rule(Constraint::ByteLen(Comparison::Gt, 1))
                .with_rule(Constraint::NotNull),
            FieldDescriptor::nullable("d", ScalarKind::Double)
                .with_rule(Constraint::NotNull)
                .with_rule(Constraint::lt(1.5)),
            FieldDescriptor::sequence("e", ElementType::message("Child"))
                .with_rule(Constraint::Unique)
                .with_item_rule(Constraint::Skip),
            FieldDescriptor::mapping("f", ScalarKind::String, ElementType::Scalar(ScalarKind::Uint64))
                .with_key_rule(Constraint::Prefix("k".to_string()))
                .with_value_rule(Constraint::gte(1_u64))
                .with_default(DefaultValue::Map(vec![(MapKey::from("k1"), Scalar::Uint(1))])),
            FieldDescriptor::message("g", "Child")
                .with_rule(Constraint::NotNull)
                .with_default(DefaultValue::Construct),
        ];
        for field in fields {
            let name = field.name.clone();
            assert!(single(field).is_ok(), "field {name} should be accepted");
        }
    }

    #[test]
    fn test_operand_family_must_match() {
        let field = FieldDescriptor::literal("a", ScalarKind::Uint32).with_rule(Constraint::gt(4));
        assert!(matches!(single(field), Err(RuleError::InvalidRule { .. })));

        let field =
            FieldDescriptor::literal("a", ScalarKind::Int32).with_rule(Constraint::gt(i64::MAX));
        assert!(matches!(single(field), Err(RuleError::InvalidRule { .. })));
    }

    #[test]
    fn test_incompatible_operators_rejected() {
        let cases = [
            FieldDescriptor::literal("a", ScalarKind::Int64).with_rule(Constraint::Prefix("x".into())),
            FieldDescriptor::literal("a", ScalarKind::String).with_rule(Constraint::gt("x")),
            FieldDescriptor::literal("a", ScalarKind::Bytes)
                .with_rule(Constraint::CharLen(Comparison::Eq, 1)),
            FieldDescriptor::literal("a", ScalarKind::Int32).with_rule(Constraint::NotNull),
            FieldDescriptor::literal("a", ScalarKind::Int32).with_rule(Constraint::Unique),
            FieldDescriptor::message("a", "Child").with_rule(Constraint::Len(Comparison::Eq, 1)),
            FieldDescriptor::sequence("a", ElementType::Scalar(ScalarKind::Int32))
                .with_rule(Constraint::gt(1)),
            FieldDescriptor::sequence("a", ElementType::message("Child"))
                .with_item_rule(Constraint::NotNull),
            FieldDescriptor::literal("a", ScalarKind::Int32).with_item_rule(Constraint::gt(1)),
        ];
        for field in cases {
            assert!(
                matches!(single(field.clone()), Err(RuleError::InvalidRule { .. })),
                "{field:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_shapes_and_references() {
        let field = FieldDescriptor::mapping("m", ScalarKind::Double, ElementType::Scalar(ScalarKind::Int32));
        assert!(matches!(single(field), Err(RuleError::InvalidField { .. })));

        let field = FieldDescriptor::message("m", "Ghost");
        assert!(matches!(single(field), Err(RuleError::UnknownMessage(name)) if name == "Ghost"));

        let field = FieldDescriptor::one_of(
            "u",
            vec![FieldDescriptor::sequence("items", ElementType::Scalar(ScalarKind::Int32))],
        );
        assert!(matches!(single(field), Err(RuleError::InvalidField { .. })));

        let err = DescriptorSet::new([MessageDescriptor::new(
            "Msg",
            vec![
                FieldDescriptor::literal("a", ScalarKind::Int32),
                FieldDescriptor::literal("a", ScalarKind::Int64),
            ],
        )]);
        assert!(matches!(err, Err(RuleError::DuplicateField { .. })));
    }

    #[test]
    fn test_defaults_must_fit() {
        let field = FieldDescriptor::literal("a", ScalarKind::Int32).with_default_scalar("one");
        assert!(matches!(single(field), Err(RuleError::InvalidDefault { .. })));

        let field = FieldDescriptor::message("a", "Child").with_default_scalar(1);
        assert!(matches!(single(field), Err(RuleError::InvalidDefault { .. })));

        let field = FieldDescriptor::one_of(
            "u",
            vec![FieldDescriptor::literal("x", ScalarKind::Int32)],
        )
        .with_default(DefaultValue::Member("y".to_string()));
        assert!(matches!(single(field), Err(RuleError::InvalidDefault { .. })));
    }

    #[test]
    fn test_construct_cycles_rejected() {
        let node = |default: Option<DefaultValue>| {
            let child = FieldDescriptor::message("child", "Node");
            let child = match default {
                Some(default) => child.with_default(default),
                None => child,
            };
            DescriptorSet::new([MessageDescriptor::new("Node", vec![child])])
        };
        assert!(node(None).is_ok());
        assert!(matches!(
            node(Some(DefaultValue::Construct)),
            Err(RuleError::InvalidDefault { .. })
        ));

        let ping_pong = DescriptorSet::new([
            MessageDescriptor::new(
                "Ping",
                vec![FieldDescriptor::message("pong", "Pong").with_default(DefaultValue::Construct)],
            ),
            MessageDescriptor::new(
                "Pong",
                vec![
                    FieldDescriptor::one_of(
                        "next",
                        vec![FieldDescriptor::message("ping", "Ping")],
                    )
                    .with_default(DefaultValue::Member("ping".to_string())),
                ],
            ),
        ]);
        assert!(matches!(ping_pong, Err(RuleError::InvalidDefault { .. })));
    }

    #[test]
    fn test_gates_must_resolve() {
        let message = |gate: Condition| {
            DescriptorSet::new([MessageDescriptor::new(
                "Msg",
                vec![
                    FieldDescriptor::one_of(
                        "kind",
                        vec![FieldDescriptor::literal("text", ScalarKind::String)],
                    ),
                    FieldDescriptor::literal("flag", ScalarKind::Bool),
                    FieldDescriptor::literal("body", ScalarKind::String).with_gate(gate),
                ],
            )])
        };

        assert!(message(Condition::MemberSelected {
            field: "kind".into(),
            member: "text".into(),
        })
        .is_ok());
        assert!(message(Condition::Equals {
            field: "flag".into(),
            value: Scalar::Bool(true),
        })
        .is_ok());
        assert!(matches!(
            message(Condition::MemberSelected {
                field: "kind".into(),
                member: "image".into(),
            }),
            Err(RuleError::InvalidGate { .. })
        ));
        assert!(matches!(
            message(Condition::IsSet {
                field: "ghost".into()
            }),
            Err(RuleError::InvalidGate { .. })
        ));
        assert!(matches!(
            message(Condition::Equals {
                field: "flag".into(),
                value: Scalar::Int(1),
            }),
            Err(RuleError::InvalidGate { .. })
        ));
    }
}
