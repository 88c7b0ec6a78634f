//! Dynamic value trees for both sides of a conversion.
//!
//! [`Value`] is the native side: what user business logic reads and writes.
//! [`WireValue`] is the wire side: the shape handed to (and received from)
//! the transport binding, with well-known temporal types in their Protobuf
//! representation, oneof alternatives flattened to synthetic field names,
//! and absent optionals omitted entirely.
//!
//! Both trees own their children, so a value graph is always a finite tree:
//! unbounded cycles cannot be expressed and conversion always terminates.

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use bytes::Bytes;

/// A map key. Protobuf map keys are limited to strings, integers, and bools.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum MapKey {
    Str(String),
    Int(i32),
    Bool(bool),
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::Str(s.to_owned())
    }
}

impl From<String> for MapKey {
    fn from(s: String) -> Self {
        MapKey::Str(s)
    }
}

impl From<i32> for MapKey {
    fn from(n: i32) -> Self {
        MapKey::Int(n)
    }
}

/// A native value as seen by user code.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Int(i32),
    Bool(bool),
    Bytes(Bytes),
    Float(f64),
    /// A point in time; converts to `google.protobuf.Timestamp` on the wire.
    Timestamp(SystemTime),
    /// An elapsed span; converts to `google.protobuf.Duration` on the wire.
    Duration(Duration),
    /// A declared enum member, by number.
    Enum(i32),
    /// A nested message instance.
    Record(Record),
    List(Vec<Value>),
    Map(BTreeMap<MapKey, Value>),
}

impl Value {
    /// Short human-readable kind tag used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int32",
            Value::Bool(_) => "bool",
            Value::Bytes(_) => "bytes",
            Value::Float(_) => "float",
            Value::Timestamp(_) => "timestamp",
            Value::Duration(_) => "duration",
            Value::Enum(_) => "enum",
            Value::Record(_) => "message",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// A native message instance: the schema it was declared against plus its
/// populated fields. An absent optional field is simply an absent entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    schema: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record for the named message schema.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Name of the message schema this record was built for. Union
    /// alternatives resolve nominally against this name.
    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A wire-format value, mirroring what the compiled wire bindings carry.
#[derive(Clone, Debug, PartialEq)]
pub enum WireValue {
    Str(String),
    Int(i32),
    Bool(bool),
    Bytes(Bytes),
    Float(f64),
    Timestamp(prost_types::Timestamp),
    Duration(prost_types::Duration),
    /// Proto3 enums travel as bare integers.
    Enum(i32),
    /// A message value. Oneof alternatives appear under their synthetic
    /// `{field}_{wiretype}` names; absent optional fields are omitted.
    Message(BTreeMap<String, WireValue>),
    List(Vec<WireValue>),
    Map(BTreeMap<MapKey, WireValue>),
    /// The shared `google.protobuf.Empty` marker.
    Empty,
}

impl WireValue {
    /// Short human-readable kind tag used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            WireValue::Str(_) => "string",
            WireValue::Int(_) => "int32",
            WireValue::Bool(_) => "bool",
            WireValue::Bytes(_) => "bytes",
            WireValue::Float(_) => "float",
            WireValue::Timestamp(_) => "timestamp",
            WireValue::Duration(_) => "duration",
            WireValue::Enum(_) => "enum",
            WireValue::Message(_) => "message",
            WireValue::List(_) => "list",
            WireValue::Map(_) => "map",
            WireValue::Empty => "empty",
        }
    }

    /// Convenience constructor for a message value.
    pub fn message<K: Into<String>>(entries: impl IntoIterator<Item = (K, WireValue)>) -> Self {
        WireValue::Message(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// Look up a field of a message value.
    pub fn field(&self, name: &str) -> Option<&WireValue> {
        match self {
            WireValue::Message(fields) => fields.get(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_builder_round_trip() {
        let rec = Record::new("Person")
            .with("name", "ada")
            .with("age", 36)
            .with("active", true);

        assert_eq!(rec.schema_name(), "Person");
        assert_eq!(rec.get("name"), Some(&Value::Str("ada".into())));
        assert_eq!(rec.get("age"), Some(&Value::Int(36)));
        assert_eq!(rec.get("missing"), None);
        assert_eq!(rec.len(), 3);
    }

    #[test]
    fn wire_message_field_lookup() {
        let wire = WireValue::message([("name", WireValue::Str("ada".into()))]);
        assert_eq!(wire.field("name"), Some(&WireValue::Str("ada".into())));
        assert_eq!(wire.field("other"), None);
        assert_eq!(WireValue::Empty.field("name"), None);
    }

    #[test]
    fn map_keys_order() {
        let mut map = BTreeMap::new();
        map.insert(MapKey::from("b"), Value::Int(2));
        map.insert(MapKey::from("a"), Value::Int(1));
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, [&MapKey::from("a"), &MapKey::from("b")]);
    }
}
