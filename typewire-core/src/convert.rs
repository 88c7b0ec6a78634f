//! Bidirectional conversion between native records and wire values.
//!
//! Inbound conversion ([`decode_message`]) is strict: every declared
//! invariant is re-checked, and any violation is a per-call
//! [`ValidationError`]. Outbound conversion ([`encode_message`]) is
//! forgiving where the declaration allows it: serializer hooks that fail
//! are logged and fall back to the raw value, and absent optional fields
//! are simply omitted.
//!
//! Records own their children, so every value graph is a finite tree and
//! conversion needs no visited-set to terminate.

use std::str::FromStr;

use tracing::warn;

use crate::classify::{describe, flatten_union, normalize, oneof_field_name, proto_type_name};
use crate::error::{DecodeError, EncodeError, SchemaError, ValidationError};
use crate::schema::{Constraint, FieldDescriptor, MessageSchema, SchemaRegistry, TypeRef};
use crate::value::{MapKey, Record, Value, WireValue};
use crate::well_known;

/// How far outbound conversion carries serializer hooks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SerializerStrategy {
    /// Hooks fire at every nesting level: nested records, list elements,
    /// and map values included.
    #[default]
    Deep,
    /// Hooks fire only on the outermost record.
    Shallow,
    /// Hooks never fire.
    None,
}

impl SerializerStrategy {
    /// The strategy nested records inherit.
    fn child(self) -> Self {
        match self {
            SerializerStrategy::Deep => SerializerStrategy::Deep,
            SerializerStrategy::Shallow | SerializerStrategy::None => SerializerStrategy::None,
        }
    }

    fn hooks_enabled(self) -> bool {
        !matches!(self, SerializerStrategy::None)
    }
}

impl FromStr for SerializerStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deep" => Ok(SerializerStrategy::Deep),
            "shallow" => Ok(SerializerStrategy::Shallow),
            "none" => Ok(SerializerStrategy::None),
            other => Err(format!("unknown serializer strategy `{other}`")),
        }
    }
}

/// Outbound conversion options, passed to the converter rather than read
/// from ambient state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    pub strategy: SerializerStrategy,
}

impl EncodeOptions {
    pub fn new(strategy: SerializerStrategy) -> Self {
        Self { strategy }
    }
}

/// A converter bound to one message schema.
///
/// Holds a registry handle so nested message references resolve; cheap to
/// clone and share.
#[derive(Clone, Debug)]
pub struct Converter {
    registry: SchemaRegistry,
    message: String,
    options: EncodeOptions,
}

impl Converter {
    /// Bind a converter to a registered message. Unknown names fail here,
    /// not at the first call.
    pub fn new(registry: &SchemaRegistry, message: &str) -> Result<Self, SchemaError> {
        registry.expect(message)?;
        Ok(Self {
            registry: registry.clone(),
            message: message.to_owned(),
            options: EncodeOptions::default(),
        })
    }

    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn message_name(&self) -> &str {
        &self.message
    }

    /// Wire value to native record.
    pub fn decode(&self, wire: &WireValue) -> Result<Record, DecodeError> {
        decode_message(&self.registry, &self.message, wire)
    }

    /// Native record to wire value, honoring the configured strategy.
    pub fn encode(&self, record: &Record) -> Result<WireValue, EncodeError> {
        encode_message(&self.registry, &self.message, record, self.options)
    }
}

// ============================================================================
// Inbound: WireValue -> Record
// ============================================================================

/// Convert a wire value into a native record of the named message.
pub fn decode_message(
    registry: &SchemaRegistry,
    message: &str,
    wire: &WireValue,
) -> Result<Record, DecodeError> {
    let schema = registry.expect(message)?;

    if schema.is_empty() {
        return match wire {
            WireValue::Empty | WireValue::Message(_) => Ok(Record::new(message)),
            other => Err(ValidationError::TypeMismatch {
                field: message.to_owned(),
                expected: "empty".into(),
                actual: other.kind().into(),
            }
            .into()),
        };
    }

    let WireValue::Message(_) = wire else {
        return Err(ValidationError::TypeMismatch {
            field: message.to_owned(),
            expected: "message".into(),
            actual: wire.kind().into(),
        }
        .into());
    };

    let mut record = Record::new(message);
    for field in schema.fields() {
        if let Some(value) = decode_field(registry, schema, field, wire)? {
            record.set(field.name(), value);
        }
    }

    if let Some(validator) = schema.validator() {
        validator(&record).map_err(ValidationError::Invalid)?;
    }

    Ok(record)
}

fn decode_field(
    registry: &SchemaRegistry,
    schema: &MessageSchema,
    field: &FieldDescriptor,
    wire: &WireValue,
) -> Result<Option<Value>, DecodeError> {
    let (effective, mut optional) = normalize(field.type_ref());
    optional |= field.is_optional();

    let decoded = if let TypeRef::Union(alternatives) = &effective {
        let alts = flatten_union(alternatives);
        if alts.is_empty() {
            return Err(SchemaError::EmptyUnion {
                message: schema.name().to_owned(),
                field: field.name().to_owned(),
            }
            .into());
        }
        // Oneof alternatives arrive flattened under synthetic names; the
        // first populated alternative (declaration order) wins.
        let mut found = None;
        for alt in &alts {
            let type_name = proto_type_name(alt, registry)?;
            let alias = oneof_field_name(field.name(), &type_name);
            if let Some(value) = wire.field(&alias) {
                found = Some(decode_value(registry, field.name(), alt, value)?);
                break;
            }
        }
        found
    } else {
        match wire.field(field.name()) {
            Some(value) => Some(decode_value(registry, field.name(), &effective, value)?),
            None => None,
        }
    };

    let Some(decoded) = decoded else {
        if optional {
            return Ok(None);
        }
        return Err(ValidationError::MissingField(field.name().to_owned()).into());
    };

    for constraint in field.constraints() {
        check_constraint(field.name(), *constraint, &decoded)?;
    }

    Ok(Some(decoded))
}

fn decode_value(
    registry: &SchemaRegistry,
    field: &str,
    ty: &TypeRef,
    wire: &WireValue,
) -> Result<Value, DecodeError> {
    let mismatch = |expected: &str| {
        DecodeError::from(ValidationError::TypeMismatch {
            field: field.to_owned(),
            expected: expected.into(),
            actual: wire.kind().into(),
        })
    };

    match ty {
        TypeRef::String => match wire {
            WireValue::Str(s) => Ok(Value::Str(s.clone())),
            _ => Err(mismatch("string")),
        },
        TypeRef::Int32 => match wire {
            WireValue::Int(n) => Ok(Value::Int(*n)),
            _ => Err(mismatch("int32")),
        },
        TypeRef::Bool => match wire {
            WireValue::Bool(b) => Ok(Value::Bool(*b)),
            _ => Err(mismatch("bool")),
        },
        TypeRef::Bytes => match wire {
            WireValue::Bytes(b) => Ok(Value::Bytes(b.clone())),
            _ => Err(mismatch("bytes")),
        },
        TypeRef::Float => match wire {
            WireValue::Float(f) => Ok(Value::Float(*f)),
            _ => Err(mismatch("float")),
        },
        TypeRef::Timestamp => match wire {
            WireValue::Timestamp(ts) => {
                Ok(Value::Timestamp(well_known::timestamp_from_wire(field, ts)?))
            }
            _ => Err(mismatch("timestamp")),
        },
        TypeRef::Duration => match wire {
            WireValue::Duration(d) => {
                Ok(Value::Duration(well_known::duration_from_wire(field, d)?))
            }
            _ => Err(mismatch("duration")),
        },
        TypeRef::Enum(schema) => {
            // Proto3 enums travel as bare integers; re-validate membership.
            let number = match wire {
                WireValue::Enum(n) | WireValue::Int(n) => *n,
                _ => return Err(mismatch("enum")),
            };
            if !schema.contains(number) {
                return Err(ValidationError::UnknownEnumMember {
                    field: field.to_owned(),
                    name: schema.name().to_owned(),
                    number,
                }
                .into());
            }
            Ok(Value::Enum(number))
        }
        TypeRef::Empty => Ok(Value::Record(Record::new("Empty"))),
        TypeRef::Message(name) => Ok(Value::Record(decode_message(registry, name, wire)?)),
        TypeRef::List(item) => {
            let WireValue::List(items) = wire else {
                return Err(mismatch("list"));
            };
            let mut out = Vec::with_capacity(items.len());
            for element in items {
                out.push(decode_value(registry, field, item, element)?);
            }
            Ok(Value::List(out))
        }
        TypeRef::Map(key_ty, value_ty) => {
            let WireValue::Map(entries) = wire else {
                return Err(mismatch("map"));
            };
            let mut out = std::collections::BTreeMap::new();
            for (key, value) in entries {
                check_map_key(field, key_ty, key)?;
                out.insert(key.clone(), decode_value(registry, field, value_ty, value)?);
            }
            Ok(Value::Map(out))
        }
        TypeRef::Union(_) | TypeRef::Null => Err(SchemaError::Unsupported(describe(ty)).into()),
        TypeRef::Wire(name) => Err(SchemaError::WireTypeReference(name.clone()).into()),
    }
}

fn check_map_key(field: &str, declared: &TypeRef, key: &MapKey) -> Result<(), DecodeError> {
    let ok = matches!(
        (declared, key),
        (TypeRef::String, MapKey::Str(_))
            | (TypeRef::Int32, MapKey::Int(_))
            | (TypeRef::Bool, MapKey::Bool(_))
    );
    if ok {
        Ok(())
    } else {
        Err(ValidationError::TypeMismatch {
            field: field.to_owned(),
            expected: format!("map key {}", describe(declared)),
            actual: match key {
                MapKey::Str(_) => "string".into(),
                MapKey::Int(_) => "int32".into(),
                MapKey::Bool(_) => "bool".into(),
            },
        }
        .into())
    }
}

fn check_constraint(
    field: &str,
    constraint: Constraint,
    value: &Value,
) -> Result<(), ValidationError> {
    let violation = || ValidationError::Constraint {
        field: field.to_owned(),
        requirement: constraint.describe(),
    };

    let numeric = match value {
        Value::Int(n) => Some(f64::from(*n)),
        Value::Float(f) => Some(*f),
        _ => None,
    };
    let length = match value {
        Value::Str(s) => Some(s.chars().count()),
        Value::Bytes(b) => Some(b.len()),
        Value::List(items) => Some(items.len()),
        Value::Map(entries) => Some(entries.len()),
        _ => None,
    };

    let holds = match constraint {
        Constraint::Ge(bound) => numeric.map(|n| n >= bound),
        Constraint::Le(bound) => numeric.map(|n| n <= bound),
        Constraint::Gt(bound) => numeric.map(|n| n > bound),
        Constraint::Lt(bound) => numeric.map(|n| n < bound),
        Constraint::MultipleOf(bound) => numeric.map(|n| (n % bound).abs() < f64::EPSILON),
        Constraint::Len(n) => length.map(|l| l == n),
        Constraint::MinLen(n) => length.map(|l| l >= n),
        Constraint::MaxLen(n) => length.map(|l| l <= n),
    };

    match holds {
        Some(true) => Ok(()),
        // A constraint on a value it cannot measure is a violation, not a
        // silent pass.
        Some(false) | None => Err(violation()),
    }
}

// ============================================================================
// Outbound: Record -> WireValue
// ============================================================================

/// Convert a native record into the wire value of the named message.
pub fn encode_message(
    registry: &SchemaRegistry,
    message: &str,
    record: &Record,
    options: EncodeOptions,
) -> Result<WireValue, EncodeError> {
    let schema = registry.expect(message)?;

    if schema.is_empty() {
        return Ok(WireValue::Empty);
    }

    let strategy = options.strategy;
    let record = apply_message_hook(schema, record, strategy);

    let mut fields = std::collections::BTreeMap::new();
    for field in schema.fields() {
        // Absent fields are omitted; requiredness is an inbound concern.
        let Some(raw) = record.get(field.name()) else {
            continue;
        };
        let value = apply_field_hook(schema, field.name(), raw, strategy);

        let (effective, _) = normalize(field.type_ref());
        if let TypeRef::Union(alternatives) = &effective {
            let alts = flatten_union(alternatives);
            let Some(alt) = alts.iter().find(|alt| value_matches(alt, &value, registry)) else {
                return Err(EncodeError::UnionMismatch {
                    field: field.name().to_owned(),
                    kind: value.kind().into(),
                });
            };
            let type_name = proto_type_name(alt, registry)?;
            let alias = oneof_field_name(field.name(), &type_name);
            let encoded = encode_value(registry, field.name(), alt, &value, options)?;
            fields.insert(alias, encoded);
        } else {
            let encoded = encode_value(registry, field.name(), &effective, &value, options)?;
            fields.insert(field.name().to_owned(), encoded);
        }
    }

    Ok(WireValue::Message(fields))
}

fn apply_message_hook(schema: &MessageSchema, record: &Record, strategy: SerializerStrategy) -> Record {
    if !strategy.hooks_enabled() {
        return record.clone();
    }
    let Some(hook) = schema.message_serializer() else {
        return record.clone();
    };
    match hook(record.clone()) {
        Ok(transformed) => transformed,
        Err(error) => {
            warn!(
                message = schema.name(),
                %error,
                "message serializer failed, falling back to raw record"
            );
            record.clone()
        }
    }
}

fn apply_field_hook(
    schema: &MessageSchema,
    field: &str,
    raw: &Value,
    strategy: SerializerStrategy,
) -> Value {
    if !strategy.hooks_enabled() {
        return raw.clone();
    }
    let Some(hook) = schema.serializer(field) else {
        return raw.clone();
    };
    match hook(raw.clone()) {
        Ok(transformed) => transformed,
        Err(error) => {
            warn!(
                message = schema.name(),
                field,
                %error,
                "field serializer failed, falling back to raw value"
            );
            raw.clone()
        }
    }
}

fn encode_value(
    registry: &SchemaRegistry,
    field: &str,
    ty: &TypeRef,
    value: &Value,
    options: EncodeOptions,
) -> Result<WireValue, EncodeError> {
    let mismatch = |expected: &str| EncodeError::InvalidValue {
        field: field.to_owned(),
        reason: format!("expected {expected}, got {}", value.kind()),
    };

    match ty {
        TypeRef::String => match value {
            Value::Str(s) => Ok(WireValue::Str(s.clone())),
            _ => Err(mismatch("string")),
        },
        TypeRef::Int32 => match value {
            Value::Int(n) => Ok(WireValue::Int(*n)),
            _ => Err(mismatch("int32")),
        },
        TypeRef::Bool => match value {
            Value::Bool(b) => Ok(WireValue::Bool(*b)),
            _ => Err(mismatch("bool")),
        },
        TypeRef::Bytes => match value {
            Value::Bytes(b) => Ok(WireValue::Bytes(b.clone())),
            _ => Err(mismatch("bytes")),
        },
        TypeRef::Float => match value {
            Value::Float(f) => Ok(WireValue::Float(*f)),
            _ => Err(mismatch("float")),
        },
        TypeRef::Timestamp => match value {
            Value::Timestamp(time) => Ok(WireValue::Timestamp(well_known::timestamp_to_wire(*time))),
            _ => Err(mismatch("timestamp")),
        },
        TypeRef::Duration => match value {
            Value::Duration(duration) => well_known::duration_to_wire(field, *duration)
                .map(WireValue::Duration)
                .map_err(|e| EncodeError::InvalidValue {
                    field: field.to_owned(),
                    reason: e.to_string(),
                }),
            _ => Err(mismatch("duration")),
        },
        TypeRef::Enum(schema) => {
            let number = match value {
                Value::Enum(n) | Value::Int(n) => *n,
                _ => return Err(mismatch("enum")),
            };
            if !schema.contains(number) {
                return Err(EncodeError::InvalidValue {
                    field: field.to_owned(),
                    reason: format!("{number} is not a member of enum `{}`", schema.name()),
                });
            }
            Ok(WireValue::Enum(number))
        }
        TypeRef::Empty => Ok(WireValue::Empty),
        TypeRef::Message(name) => match value {
            Value::Record(record) => {
                encode_message(registry, name, record, EncodeOptions::new(options.strategy.child()))
            }
            _ => Err(mismatch("message")),
        },
        TypeRef::List(item) => match value {
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for element in items {
                    out.push(encode_value(registry, field, item, element, options)?);
                }
                Ok(WireValue::List(out))
            }
            _ => Err(mismatch("list")),
        },
        TypeRef::Map(_, value_ty) => match value {
            Value::Map(entries) => {
                let mut out = std::collections::BTreeMap::new();
                for (key, element) in entries {
                    out.insert(
                        key.clone(),
                        encode_value(registry, field, value_ty, element, options)?,
                    );
                }
                Ok(WireValue::Map(out))
            }
            _ => Err(mismatch("map")),
        },
        TypeRef::Union(_) | TypeRef::Null => Err(EncodeError::Schema(SchemaError::Unsupported(
            describe(ty),
        ))),
        TypeRef::Wire(name) => Err(EncodeError::Schema(SchemaError::WireTypeReference(
            name.clone(),
        ))),
    }
}

/// Whether a runtime value satisfies one union alternative. Records match
/// nominally by schema name; enums by member number.
fn value_matches(alt: &TypeRef, value: &Value, registry: &SchemaRegistry) -> bool {
    match (alt, value) {
        (TypeRef::String, Value::Str(_))
        | (TypeRef::Int32, Value::Int(_))
        | (TypeRef::Bool, Value::Bool(_))
        | (TypeRef::Bytes, Value::Bytes(_))
        | (TypeRef::Float, Value::Float(_))
        | (TypeRef::Timestamp, Value::Timestamp(_))
        | (TypeRef::Duration, Value::Duration(_)) => true,
        (TypeRef::Enum(schema), Value::Enum(number)) => schema.contains(*number),
        (TypeRef::Message(name), Value::Record(record)) => {
            record.schema_name() == name && registry.get(name).is_some()
        }
        (TypeRef::Empty, Value::Record(record)) => record.is_empty(),
        _ => false,
    }
}
