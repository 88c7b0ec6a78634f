//! Integration coverage for bidirectional value conversion.

use std::collections::BTreeMap;
use std::time::{Duration, UNIX_EPOCH};

use typewire_core::convert::{Converter, EncodeOptions, SerializerStrategy};
use typewire_core::error::{DecodeError, EncodeError, ValidationError};
use typewire_core::schema::{
    EnumSchema, FieldDescriptor, MessageSchema, SchemaRegistry, TypeRef,
};
use typewire_core::value::{MapKey, Record, Value, WireValue};
use typewire_core::{decode_message, encode_message};

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn upper_hook(value: Value) -> Result<Value, typewire_core::schema::BoxError> {
    match value {
        Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
        other => Ok(other),
    }
}

/// Address/Person schemas with casing serializers on both levels.
fn person_registry() -> SchemaRegistry {
    SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Address")
                .field(FieldDescriptor::new("street", TypeRef::String))
                .field(FieldDescriptor::new("city", TypeRef::String))
                .field(FieldDescriptor::new("country", TypeRef::String))
                .serializer("city", upper_hook)
                .serializer("country", upper_hook)
                .build(),
        )
        .register(
            MessageSchema::builder("Person")
                .field(FieldDescriptor::new("name", TypeRef::String))
                .field(FieldDescriptor::new("age", TypeRef::Int32))
                .field(FieldDescriptor::new("address", TypeRef::message("Address")))
                .serializer("name", |value| match value {
                    Value::Str(s) => Ok(Value::Str(title_case(&s))),
                    other => Ok(other),
                })
                .build(),
        )
        .register(
            MessageSchema::builder("Company")
                .field(FieldDescriptor::new("name", TypeRef::String))
                .field(FieldDescriptor::new(
                    "employees",
                    TypeRef::list(TypeRef::message("Person")),
                ))
                .field(FieldDescriptor::new(
                    "offices",
                    TypeRef::map(TypeRef::String, TypeRef::message("Address")),
                ))
                .serializer("name", upper_hook)
                .build(),
        )
        .build()
        .unwrap()
}

fn john_doe() -> Record {
    Record::new("Person")
        .with("name", "john doe")
        .with("age", 30)
        .with(
            "address",
            Record::new("Address")
                .with("street", "123 main st")
                .with("city", "new york")
                .with("country", "usa"),
        )
}

#[test]
fn deep_strategy_applies_hooks_through_nested_records() {
    let registry = person_registry();
    let converter = Converter::new(&registry, "Person").unwrap();

    let wire = converter.encode(&john_doe()).unwrap();
    assert_eq!(wire.field("name"), Some(&WireValue::Str("John Doe".into())));
    let address = wire.field("address").unwrap();
    assert_eq!(address.field("city"), Some(&WireValue::Str("NEW YORK".into())));
    assert_eq!(address.field("country"), Some(&WireValue::Str("USA".into())));
    assert_eq!(
        address.field("street"),
        Some(&WireValue::Str("123 main st".into()))
    );
}

#[test]
fn shallow_strategy_stops_at_the_top_level() {
    let registry = person_registry();
    let converter = Converter::new(&registry, "Person")
        .unwrap()
        .with_options(EncodeOptions::new(SerializerStrategy::Shallow));

    let wire = converter.encode(&john_doe()).unwrap();
    assert_eq!(wire.field("name"), Some(&WireValue::Str("John Doe".into())));
    let address = wire.field("address").unwrap();
    assert_eq!(address.field("city"), Some(&WireValue::Str("new york".into())));
    assert_eq!(address.field("country"), Some(&WireValue::Str("usa".into())));
}

#[test]
fn none_strategy_disables_all_hooks() {
    let registry = person_registry();
    let converter = Converter::new(&registry, "Person")
        .unwrap()
        .with_options(EncodeOptions::new(SerializerStrategy::None));

    let wire = converter.encode(&john_doe()).unwrap();
    assert_eq!(wire.field("name"), Some(&WireValue::Str("john doe".into())));
    let address = wire.field("address").unwrap();
    assert_eq!(address.field("city"), Some(&WireValue::Str("new york".into())));
}

#[test]
fn deep_strategy_reaches_list_elements_and_map_values() {
    let registry = person_registry();
    let company = Record::new("Company")
        .with("name", "acme")
        .with(
            "employees",
            vec![Value::Record(john_doe()), Value::Record(
                Record::new("Person").with("name", "jane roe").with("age", 41).with(
                    "address",
                    Record::new("Address")
                        .with("street", "9 elm")
                        .with("city", "boston")
                        .with("country", "usa"),
                ),
            )],
        )
        .with("offices", {
            let mut offices = BTreeMap::new();
            offices.insert(
                MapKey::from("hq"),
                Value::Record(
                    Record::new("Address")
                        .with("street", "1 square")
                        .with("city", "lisbon")
                        .with("country", "pt"),
                ),
            );
            Value::Map(offices)
        });

    let wire = encode_message(&registry, "Company", &company, EncodeOptions::default()).unwrap();
    assert_eq!(wire.field("name"), Some(&WireValue::Str("ACME".into())));

    let WireValue::List(employees) = wire.field("employees").unwrap() else {
        panic!("employees should be a list");
    };
    assert_eq!(employees.len(), 2);
    assert_eq!(
        employees[1].field("name"),
        Some(&WireValue::Str("Jane Roe".into()))
    );
    assert_eq!(
        employees[0].field("address").unwrap().field("city"),
        Some(&WireValue::Str("NEW YORK".into()))
    );

    let WireValue::Map(offices) = wire.field("offices").unwrap() else {
        panic!("offices should be a map");
    };
    assert_eq!(
        offices[&MapKey::from("hq")].field("city"),
        Some(&WireValue::Str("LISBON".into()))
    );
}

#[test]
fn round_trip_preserves_hook_free_fields() {
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Everything")
                .field(FieldDescriptor::new("text", TypeRef::String))
                .field(FieldDescriptor::new("number", TypeRef::Int32))
                .field(FieldDescriptor::new("flag", TypeRef::Bool))
                .field(FieldDescriptor::new("ratio", TypeRef::Float))
                .field(FieldDescriptor::new("at", TypeRef::Timestamp))
                .field(FieldDescriptor::new("took", TypeRef::Duration))
                .field(FieldDescriptor::new("tags", TypeRef::list(TypeRef::String)))
                .field(FieldDescriptor::new(
                    "scores",
                    TypeRef::map(TypeRef::String, TypeRef::Int32),
                ))
                .field(FieldDescriptor::new("note", TypeRef::String).optional())
                .build(),
        )
        .build()
        .unwrap();

    let mut scores = BTreeMap::new();
    scores.insert(MapKey::from("a"), Value::Int(1));
    scores.insert(MapKey::from("b"), Value::Int(2));

    let original = Record::new("Everything")
        .with("text", "hello")
        .with("number", 42)
        .with("flag", true)
        .with("ratio", 2.5)
        .with("at", Value::Timestamp(UNIX_EPOCH + Duration::from_secs(1_700_000_000)))
        .with("took", Value::Duration(Duration::from_millis(1500)))
        .with("tags", vec![Value::Str("x".into()), Value::Str("y".into())])
        .with("scores", Value::Map(scores));

    let wire = encode_message(&registry, "Everything", &original, EncodeOptions::default()).unwrap();
    let back = decode_message(&registry, "Everything", &wire).unwrap();
    assert_eq!(back, original);

    // The absent optional stayed absent through the round trip.
    assert_eq!(wire.field("note"), None);
    assert_eq!(back.get("note"), None);
}

#[test]
fn failed_hook_logs_and_falls_back_to_raw_value() {
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Fragile")
                .field(FieldDescriptor::new("name", TypeRef::String))
                .serializer("name", |_| Err("hook exploded".into()))
                .build(),
        )
        .build()
        .unwrap();

    let record = Record::new("Fragile").with("name", "raw");
    let wire = encode_message(&registry, "Fragile", &record, EncodeOptions::default()).unwrap();
    assert_eq!(wire.field("name"), Some(&WireValue::Str("raw".into())));
}

#[test]
fn message_level_hook_runs_before_field_hooks() {
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Greeting")
                .field(FieldDescriptor::new("text", TypeRef::String))
                .message_serializer(|record| {
                    let text = match record.get("text") {
                        Some(Value::Str(s)) => format!("{s}!"),
                        _ => String::new(),
                    };
                    Ok(Record::new("Greeting").with("text", text))
                })
                .serializer("text", upper_hook)
                .build(),
        )
        .build()
        .unwrap();

    let record = Record::new("Greeting").with("text", "hi");
    let wire = encode_message(&registry, "Greeting", &record, EncodeOptions::default()).unwrap();
    assert_eq!(wire.field("text"), Some(&WireValue::Str("HI!".into())));
}

#[test]
fn union_field_encodes_under_synthetic_name() {
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Holder")
                .field(FieldDescriptor::new(
                    "value",
                    TypeRef::union([TypeRef::String, TypeRef::Int32]),
                ))
                .build(),
        )
        .build()
        .unwrap();

    let wire = encode_message(
        &registry,
        "Holder",
        &Record::new("Holder").with("value", 7),
        EncodeOptions::default(),
    )
    .unwrap();
    assert_eq!(wire.field("value_int32"), Some(&WireValue::Int(7)));
    assert_eq!(wire.field("value_string"), None);

    let back = decode_message(&registry, "Holder", &wire).unwrap();
    assert_eq!(back.get("value"), Some(&Value::Int(7)));
}

#[test]
fn union_resolution_takes_first_matching_alternative() {
    // Both enums declare number 1, so an Enum(1) value satisfies both
    // alternatives. Declaration order decides.
    let first = EnumSchema::build("First", [("A", 0), ("B", 1)]).unwrap();
    let second = EnumSchema::build("Second", [("X", 1), ("Y", 2)]).unwrap();
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Pick")
                .field(FieldDescriptor::new(
                    "choice",
                    TypeRef::union([TypeRef::Enum(first), TypeRef::Enum(second)]),
                ))
                .build(),
        )
        .build()
        .unwrap();

    let wire = encode_message(
        &registry,
        "Pick",
        &Record::new("Pick").with("choice", Value::Enum(1)),
        EncodeOptions::default(),
    )
    .unwrap();
    assert_eq!(wire.field("choice_First"), Some(&WireValue::Enum(1)));
    assert_eq!(wire.field("choice_Second"), None);
}

#[test]
fn union_decoding_takes_first_declared_alternative() {
    // A wire message may carry several populated synthetic aliases; the
    // first declared alternative that is present wins, the rest are ignored.
    let first = EnumSchema::build("First", [("A", 0), ("B", 1)]).unwrap();
    let second = EnumSchema::build("Second", [("X", 1), ("Y", 2)]).unwrap();
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Pick")
                .field(FieldDescriptor::new(
                    "choice",
                    TypeRef::union([TypeRef::Enum(first), TypeRef::Enum(second)]),
                ))
                .build(),
        )
        .build()
        .unwrap();

    let wire = WireValue::message([
        ("choice_First", WireValue::Enum(1)),
        ("choice_Second", WireValue::Enum(2)),
    ]);
    let record = decode_message(&registry, "Pick", &wire).unwrap();
    assert_eq!(record.get("choice"), Some(&Value::Enum(1)));

    // With the first alias absent, resolution falls through to the second.
    let wire = WireValue::message([("choice_Second", WireValue::Enum(2))]);
    let record = decode_message(&registry, "Pick", &wire).unwrap();
    assert_eq!(record.get("choice"), Some(&Value::Enum(2)));
}

#[test]
fn union_mismatch_is_a_hard_encode_error() {
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Holder")
                .field(FieldDescriptor::new(
                    "value",
                    TypeRef::union([TypeRef::String, TypeRef::Int32]),
                ))
                .build(),
        )
        .build()
        .unwrap();

    let err = encode_message(
        &registry,
        "Holder",
        &Record::new("Holder").with("value", true),
        EncodeOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        EncodeError::UnionMismatch {
            field: "value".into(),
            kind: "bool".into(),
        }
    );
}

#[test]
fn optional_union_decodes_absent_as_skip() {
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Maybe")
                .field(FieldDescriptor::new(
                    "value",
                    TypeRef::union([TypeRef::String, TypeRef::Int32, TypeRef::Null]),
                ))
                .build(),
        )
        .build()
        .unwrap();

    let record = decode_message(&registry, "Maybe", &WireValue::message::<String>([])).unwrap();
    assert_eq!(record.get("value"), None);
}

#[test]
fn validator_hook_rejects_inbound_records() {
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Range")
                .field(FieldDescriptor::new("low", TypeRef::Int32))
                .field(FieldDescriptor::new("high", TypeRef::Int32))
                .validator(|record| {
                    match (record.get("low"), record.get("high")) {
                        (Some(Value::Int(low)), Some(Value::Int(high))) if low > high => {
                            Err("low must not exceed high".into())
                        }
                        _ => Ok(()),
                    }
                })
                .build(),
        )
        .build()
        .unwrap();

    let good = WireValue::message([("low", WireValue::Int(1)), ("high", WireValue::Int(2))]);
    decode_message(&registry, "Range", &good).unwrap();

    let bad = WireValue::message([("low", WireValue::Int(5)), ("high", WireValue::Int(2))]);
    let err = decode_message(&registry, "Range", &bad).unwrap_err();
    assert_eq!(
        err,
        DecodeError::Validation(ValidationError::Invalid("low must not exceed high".into()))
    );
}

#[test]
fn negative_wire_duration_fails_validation() {
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Timer")
                .field(FieldDescriptor::new("elapsed", TypeRef::Duration))
                .build(),
        )
        .build()
        .unwrap();

    let wire = WireValue::message([(
        "elapsed",
        WireValue::Duration(prost_types::Duration {
            seconds: -1,
            nanos: 0,
        }),
    )]);
    let err = decode_message(&registry, "Timer", &wire).unwrap_err();
    assert!(matches!(
        err,
        DecodeError::Validation(ValidationError::InvalidValue { .. })
    ));
}

#[test]
fn constraints_are_enforced_inbound() {
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Signup")
                .field(
                    FieldDescriptor::new("name", TypeRef::String)
                        .constraint(typewire_core::Constraint::MinLen(2)),
                )
                .field(
                    FieldDescriptor::new("age", TypeRef::Int32)
                        .constraint(typewire_core::Constraint::Ge(18.0)),
                )
                .build(),
        )
        .build()
        .unwrap();

    let good = WireValue::message([
        ("name", WireValue::Str("bo".into())),
        ("age", WireValue::Int(21)),
    ]);
    decode_message(&registry, "Signup", &good).unwrap();

    let bad = WireValue::message([
        ("name", WireValue::Str("bo".into())),
        ("age", WireValue::Int(12)),
    ]);
    let err = decode_message(&registry, "Signup", &bad).unwrap_err();
    assert_eq!(
        err,
        DecodeError::Validation(ValidationError::Constraint {
            field: "age".into(),
            requirement: "greater than or equal to 18".into(),
        })
    );
}

#[test]
fn empty_schema_encodes_as_empty_marker() {
    let registry = SchemaRegistry::builder()
        .register(MessageSchema::empty("Void"))
        .build()
        .unwrap();

    let wire = encode_message(
        &registry,
        "Void",
        &Record::new("Void"),
        EncodeOptions::default(),
    )
    .unwrap();
    assert_eq!(wire, WireValue::Empty);

    let back = decode_message(&registry, "Void", &WireValue::Empty).unwrap();
    assert!(back.is_empty());
}

#[test]
fn deeply_nested_records_convert_three_levels_down() {
    let registry = SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Leaf")
                .field(FieldDescriptor::new("tag", TypeRef::String))
                .serializer("tag", upper_hook)
                .build(),
        )
        .register(
            MessageSchema::builder("Branch")
                .field(FieldDescriptor::new("leaf", TypeRef::message("Leaf")))
                .build(),
        )
        .register(
            MessageSchema::builder("Trunk")
                .field(FieldDescriptor::new("branch", TypeRef::message("Branch")))
                .build(),
        )
        .build()
        .unwrap();

    let trunk = Record::new("Trunk").with(
        "branch",
        Record::new("Branch").with("leaf", Record::new("Leaf").with("tag", "deep")),
    );

    let wire = encode_message(&registry, "Trunk", &trunk, EncodeOptions::default()).unwrap();
    assert_eq!(
        wire.field("branch").unwrap().field("leaf").unwrap().field("tag"),
        Some(&WireValue::Str("DEEP".into()))
    );

    let shallow = encode_message(
        &registry,
        "Trunk",
        &trunk,
        EncodeOptions::new(SerializerStrategy::Shallow),
    )
    .unwrap();
    assert_eq!(
        shallow.field("branch").unwrap().field("leaf").unwrap().field("tag"),
        Some(&WireValue::Str("deep".into()))
    );
}
