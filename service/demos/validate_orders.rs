//! Example: load a rule table, apply defaults, validate and store records
//!
//! This example shows how to:
//! 1. Load a descriptor set from YAML
//! 2. Fill in configured defaults
//! 3. Validate records and print the first violation
//! 4. Encode a record with the codec selected for its message type
//!
//! Run with `RUST_LOG=debug` to see the engines' tracing events.

use protorules_service::prelude::*;
use tracing_subscriber::EnvFilter;

const RULES: &str = r#"
messages:
  - name: Order
    codec: schema_json
    fields:
      - name: id
        shape: {literal: string}
        rules:
          - regex: "^ORD-[0-9]+$"
      - name: quantity
        shape: {literal: uint32}
        default: {scalar: {uint: 1}}
        rules:
          - compare: [lte, {uint: 100}]
      - name: email
        shape: {nullable: string}
        rules:
          - not_null
          - format: ascii
          - contains: "@"
      - name: tags
        shape: {sequence: {scalar: string}}
        default: {list: [{str: new}]}
        rules:
          - unique
"#;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    println!("=== protorules: orders ===\n");

    let set = DescriptorSet::from_yaml_str(RULES)?;
    let validator = Validator::new(&set);

    let orders = [
        Record::new("Order")
            .with_literal("id", "ORD-1")
            .with_nullable("email", "ann@example.org"),
        Record::new("Order").with_literal("id", "ORD-2"),
        Record::new("Order")
            .with_literal("id", "ORD-3")
            .with_literal("quantity", 500_u32)
            .with_nullable("email", "bo@example.org"),
        Record::new("Order")
            .with_literal("id", "4")
            .with_nullable("email", "cy@example.org"),
    ];

    let codec = codec_for(&set, "Order")?;
    for mut order in orders {
        apply_defaults(&set, Some(&mut order));
        match validator.validate(&order) {
            Ok(()) => {
                let bytes = codec.encode(&order)?;
                println!("✓ {}", String::from_utf8_lossy(&bytes));
            }
            Err(violation) => println!("✗ {violation}"),
        }
    }

    Ok(())
}
