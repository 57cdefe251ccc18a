//! Codec selection and round trips through every storage codec

mod helpers;

use helpers::{defaults, list, map, nested, selected};
use pretty_assertions::assert_eq;
use protorules_core::config::CodecSettings;
use protorules_core::prelude::*;
use protorules_service::codec::{Codec, SchemaJsonCodec, codec_for, codec_with_settings};
use protorules_service::validator::DefaultApplier;
use serde_json::json;

fn sample(set: &DescriptorSet) -> anyhow::Result<Record> {
    let mut record = Record::new("Config")
        .with_literal("retries", 7)
        .with_nullable("timeout", 0)
        .with("hosts", list(["a.example", "b.example"]))
        .with("labels", map([("team", "core")]))
        .with(
            "backend",
            selected(
                "remote",
                nested(Record::new("Limits").with_nullable("burst", 2_u32)),
            ),
        );
    DefaultApplier::new(set).apply(Some(&mut record));
    Ok(record)
}

#[test]
fn test_every_codec_round_trips() -> anyhow::Result<()> {
    let set = defaults()?;
    let record = sample(&set)?;

    for kind in [CodecKind::Json, CodecKind::SchemaJson, CodecKind::Binary] {
        let settings = CodecSettings {
            default: kind,
            pretty: true,
        };
        let codec = codec_with_settings(&set, "Config", &settings)?;
        let bytes = codec.encode(&record)?;
        assert_eq!(codec.decode(&bytes)?, record, "{}", codec.name());
    }
    Ok(())
}

#[test]
fn test_schema_json_is_plain_json() -> anyhow::Result<()> {
    let set = defaults()?;
    let record = sample(&set)?;
    let codec = SchemaJsonCodec::new(&set, "Config")?;

    assert_eq!(
        codec.to_value(&record)?,
        json!({
            "retries": 7,
            "timeout": 0,
            "mode": "fast",
            "salt": "eHl6",
            "hosts": ["a.example", "b.example"],
            "labels": {"team": "core"},
            "limits": {"max_conn": 64},
            "backend": {"remote": {"max_conn": 64, "burst": 2}},
        })
    );
    Ok(())
}

#[test]
fn test_schema_json_keeps_presence() -> anyhow::Result<()> {
    let set = defaults()?;
    let codec = codec_for(&set, "Config")?;

    // absent and present-zero nullable scalars decode differently
    let absent = codec.decode(br#"{}"#)?;
    assert_eq!(absent.get("timeout"), Some(&FieldValue::Nullable(None)));
    assert_eq!(absent.get("hosts"), Some(&FieldValue::List(None)));

    let zero = codec.decode(br#"{"timeout": 0, "hosts": []}"#)?;
    assert_eq!(
        zero.get("timeout"),
        Some(&FieldValue::Nullable(Some(Scalar::Int(0))))
    );
    assert_eq!(zero.get("hosts"), Some(&FieldValue::List(Some(Vec::new()))));
    Ok(())
}

#[test]
fn test_decoded_records_take_defaults() -> anyhow::Result<()> {
    let set = defaults()?;
    let codec = codec_for(&set, "Config")?;

    let mut record = codec.decode(br#"{"retries": 0, "timeout": 5}"#)?;
    DefaultApplier::new(&set).apply(Some(&mut record));
    assert_eq!(record.get("retries"), Some(&FieldValue::Literal(Scalar::Int(1))));
    assert_eq!(
        record.get("timeout"),
        Some(&FieldValue::Nullable(Some(Scalar::Int(5))))
    );
    Ok(())
}

#[test]
fn test_annotations_from_yaml() -> anyhow::Result<()> {
    let set = DescriptorSet::from_yaml_str(
        r#"
messages:
  - name: Event
    codec: binary
    fields:
      - name: id
        shape: {literal: uint64}
  - name: Note
    codec: json
    fields:
      - name: text
        shape: {literal: string}
"#,
    )?;
    assert_eq!(codec_for(&set, "Event")?.name(), "binary");
    assert_eq!(codec_for(&set, "Note")?.name(), "json");

    let codec = codec_for(&set, "Event")?;
    let record = Record::new("Event").with_literal("id", u64::MAX);
    assert_eq!(codec.decode(&codec.encode(&record)?)?, record);
    Ok(())
}
