//! Shared fixtures for tests and benches.

use crate::schema::{
    long, optional_group, optional_string, repeated_group, repeated_long, repeated_string, string, Schema,
    SchemaBuilder,
};
use crate::value::{Value, ValueBuilder};
use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a `tracing` subscriber filtered by `RUST_LOG`, defaulting to
/// `info`. Safe to call from every test.
pub fn init_tracing() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt().with_env_filter(filter).with_target(false).with_test_writer().try_init();
    });
}

/// The `Document` schema of the Dremel paper.
///
/// ```text
/// message Document {
///   required int64 DocId;
///   optional group Links {
///     repeated int64 Backward;
///     repeated int64 Forward;
///   }
///   repeated group Name {
///     repeated group Language {
///       required string Code;
///       optional string Country;
///     }
///     optional string Url;
///   }
/// }
/// ```
///
/// Repeated fields become optional lists.
pub fn document_schema() -> Schema {
    SchemaBuilder::new("Document", vec![])
        .field(long("DocId"))
        .field(optional_group(
            "Links",
            vec![repeated_long("Backward"), repeated_long("Forward")],
        ))
        .field(repeated_group(
            "Name",
            vec![
                repeated_group("Language", vec![string("Code"), optional_string("Country")]),
                optional_string("Url"),
            ],
        ))
        .build()
}

fn language(code: &str, country: Option<&str>) -> Value {
    ValueBuilder::default()
        .field("Code", code)
        .string("Country", country)
        .build()
}

fn name(languages: Option<Vec<Value>>, url: Option<&str>) -> Value {
    ValueBuilder::default()
        .field("Language", languages)
        .string("Url", url)
        .build()
}

/// The two sample records of the Dremel paper, with every absent field
/// spelled out as null so they compare equal after assembly.
pub fn document_records() -> Vec<Value> {
    let r1 = ValueBuilder::default()
        .field("DocId", 10i64)
        .field(
            "Links",
            ValueBuilder::default()
                .field("Backward", Value::Null)
                .repeated("Forward", vec![20i64, 40, 60])
                .build(),
        )
        .repeated(
            "Name",
            vec![
                name(
                    Some(vec![language("en-us", Some("us")), language("en", None)]),
                    Some("http://A"),
                ),
                name(None, Some("http://B")),
                name(Some(vec![language("en-gb", Some("gb"))]), None),
            ],
        )
        .build();

    let r2 = ValueBuilder::default()
        .field("DocId", 20i64)
        .field(
            "Links",
            ValueBuilder::default()
                .repeated("Backward", vec![10i64, 30])
                .repeated("Forward", vec![80i64])
                .build(),
        )
        .repeated("Name", vec![name(None, Some("http://C"))])
        .build();

    vec![r1, r2]
}

/// `{id: required int64, name: optional string, tags: list of strings}`.
pub fn contact_schema() -> Schema {
    Schema::new(
        "contact",
        vec![long("id"), optional_string("name"), repeated_string("tags")],
    )
}

/// Generates `n` records for [`contact_schema`] with nulls, empty lists and
/// lists of varying length.
pub fn contact_records(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| {
            let name = (i % 5 != 0).then(|| format!("contact-{i}"));
            let tags = match i % 4 {
                0 => Value::Null,
                1 => Value::List(vec![]),
                k => Value::List((0..k).map(|t| Value::String(format!("tag-{}", (i + t) % 7))).collect()),
            };
            ValueBuilder::default()
                .field("id", i as i64)
                .field("name", name)
                .field("tags", tags)
                .build()
        })
        .collect()
}
