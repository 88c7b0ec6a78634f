//! Core engine: typed message declarations in, schema text and converters
//! out.
//!
//! This crate is pure and synchronous. It owns the schema data model
//! ([`schema`]), the dynamic value trees ([`value`]), the type classifier
//! ([`classify`]), the transitive type walker ([`walk`]), the proto3 text
//! emitter ([`emit`]), and the bidirectional converters ([`convert`]).
//! Transport adaptation, file I/O, and configuration live in the `typewire`
//! crate.

pub mod classify;
pub mod convert;
pub mod emit;
pub mod error;
pub mod schema;
pub mod value;
pub mod walk;
pub mod well_known;

pub use classify::{Primitive, WireCategory, classify, proto_type_name};
pub use convert::{
    Converter, EncodeOptions, SerializerStrategy, decode_message, encode_message,
};
pub use emit::emit_schema;
pub use error::{DecodeError, EncodeError, SchemaError, ValidationError};
pub use schema::{
    Constraint, EnumSchema, FieldDescriptor, HttpMethod, HttpRule, MessageSchema,
    MethodDescriptor, OptionValue, SchemaRegistry, ServiceSchema, TypeRef,
};
pub use value::{MapKey, Record, Value, WireValue};
pub use walk::TypeClosure;
