//! Shared descriptor tables and record builders for the integration tests

#![allow(dead_code)]

use protorules_core::prelude::*;
use std::collections::BTreeMap;

/// Single-message set; extra messages can be referenced by nested fields
pub fn single(name: &str, fields: Vec<FieldDescriptor>) -> anyhow::Result<DescriptorSet> {
    Ok(DescriptorSet::new([MessageDescriptor::new(name, fields)])?)
}

/// Scalar rule coverage: one field per operator family
pub fn scalars() -> anyhow::Result<DescriptorSet> {
    single(
        "Scalars",
        vec![
            FieldDescriptor::literal("t_int32_gt1", ScalarKind::Int32).with_rule(Constraint::gt(4)),
            FieldDescriptor::literal("t_uint64_range", ScalarKind::Uint64)
                .with_rule(Constraint::gte(10_u64))
                .with_rule(Constraint::lte(20_u64)),
            FieldDescriptor::literal("t_double_lt", ScalarKind::Double)
                .with_rule(Constraint::lt(1.5)),
            FieldDescriptor::literal("t_string_byte_len", ScalarKind::String)
                .with_rule(Constraint::ByteLen(Comparison::Gt, 5)),
            FieldDescriptor::literal("t_string_in", ScalarKind::String).with_rule(
                Constraint::In(vec![Scalar::from(""), Scalar::from("red"), Scalar::from("blue")]),
            ),
            FieldDescriptor::literal("t_bool_eq", ScalarKind::Bool)
                .with_rule(Constraint::not_equals(true)),
            FieldDescriptor::nullable("t_opt_string", ScalarKind::String)
                .with_rule(Constraint::NotNull)
                .with_rule(Constraint::Prefix("id-".to_string())),
        ],
    )
}

/// A valid record of [`scalars`]
pub fn valid_scalars() -> Record {
    Record::new("Scalars")
        .with_literal("t_int32_gt1", 5)
        .with_literal("t_uint64_range", 15_u64)
        .with_literal("t_double_lt", 1.0)
        .with_literal("t_string_byte_len", "abcdefg")
        .with_literal("t_string_in", "red")
        .with_nullable("t_opt_string", "id-7")
}

/// Default coverage: every field category with a configured default
pub fn defaults() -> anyhow::Result<DescriptorSet> {
    Ok(DescriptorSet::new([
        MessageDescriptor::new(
            "Config",
            vec![
                FieldDescriptor::literal("retries", ScalarKind::Int32).with_default_scalar(1),
                FieldDescriptor::nullable("timeout", ScalarKind::Int32).with_default_scalar(0),
                FieldDescriptor::literal("mode", ScalarKind::String).with_default_scalar("fast"),
                FieldDescriptor::literal("salt", ScalarKind::Bytes)
                    .with_default_scalar(b"xyz".to_vec()),
                FieldDescriptor::sequence("hosts", ElementType::Scalar(ScalarKind::String))
                    .with_default(DefaultValue::List(vec![Scalar::from("localhost")])),
                FieldDescriptor::mapping(
                    "labels",
                    ScalarKind::String,
                    ElementType::Scalar(ScalarKind::String),
                )
                .with_default(DefaultValue::Map(vec![(MapKey::from("env"), Scalar::from("dev"))])),
                FieldDescriptor::message("limits", "Limits").with_default(DefaultValue::Construct),
                FieldDescriptor::one_of(
                    "backend",
                    vec![
                        FieldDescriptor::literal("path", ScalarKind::String)
                            .with_default_scalar("/var/data"),
                        FieldDescriptor::message("remote", "Limits"),
                    ],
                )
                .with_default(DefaultValue::Member("path".to_string())),
            ],
        ),
        MessageDescriptor::new(
            "Limits",
            vec![
                FieldDescriptor::literal("max_conn", ScalarKind::Uint32).with_default_scalar(64_u32),
                FieldDescriptor::nullable("burst", ScalarKind::Uint32),
            ],
        ),
    ])?)
}

/// Collections: sequences of scalars and records, and a mapping
pub fn collections() -> anyhow::Result<DescriptorSet> {
    Ok(DescriptorSet::new([
        MessageDescriptor::new(
            "Bag",
            vec![
                FieldDescriptor::sequence("ids", ElementType::Scalar(ScalarKind::Int64))
                    .with_rule(Constraint::Unique)
                    .with_rule(Constraint::Len(Comparison::Lte, 3))
                    .with_item_rule(Constraint::gt(0_i64)),
                FieldDescriptor::sequence("items", ElementType::message("Item"))
                    .with_rule(Constraint::Unique),
                FieldDescriptor::mapping(
                    "counts",
                    ScalarKind::String,
                    ElementType::Scalar(ScalarKind::Uint32),
                )
                .with_rule(Constraint::NotNull)
                .with_key_rule(Constraint::CharLen(Comparison::Lte, 3))
                .with_value_rule(Constraint::lte(10_u32)),
            ],
        ),
        MessageDescriptor::new(
            "Item",
            vec![FieldDescriptor::literal("sku", ScalarKind::String)
                .with_rule(Constraint::Prefix("SKU-".to_string()))],
        ),
    ])?)
}

/// A valid record of [`collections`]
pub fn valid_bag() -> Record {
    Record::new("Bag")
        .with("ids", list([1_i64, 2, 3]))
        .with("counts", map([("a", 1_u32)]))
}

/// Sequence field value from scalars
pub fn list<T: Into<Element>>(items: impl IntoIterator<Item = T>) -> FieldValue {
    FieldValue::List(Some(items.into_iter().map(Into::into).collect()))
}

/// Mapping field value with string keys
pub fn map<T: Into<Element>>(entries: impl IntoIterator<Item = (&'static str, T)>) -> FieldValue {
    let map: BTreeMap<MapKey, Element> = entries
        .into_iter()
        .map(|(k, v)| (MapKey::from(k), v.into()))
        .collect();
    FieldValue::Map(Some(map))
}

/// Union field value with `member` selected
pub fn selected(member: &str, value: FieldValue) -> FieldValue {
    FieldValue::OneOf(Some(Variant::new(member, value)))
}

/// Nested record field value
pub fn nested(record: Record) -> FieldValue {
    FieldValue::Message(Some(Box::new(record)))
}
