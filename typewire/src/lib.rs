//! Transport-ready RPC plumbing on top of `typewire-core`.
//!
//! This crate turns a declared [`ServiceSchema`](typewire_core::schema::ServiceSchema)
//! plus user closures into a dispatch table of [`adapter::RpcHandler`]s, and
//! carries everything a transport binding needs around them: status codes,
//! declarative error mapping, per-call context, TLS pass-through, the
//! environment configuration surface, and schema file emission.

pub mod adapter;
pub mod config;
pub mod context;
pub mod errmap;
pub mod genfile;
pub mod status;
pub mod tls;

pub use futures;
pub use typewire_core as core;

pub mod prelude {
    //! The most commonly used types, in one import.
    pub use crate::adapter::{AdapterError, RpcHandler, ServiceAdapter};
    pub use crate::context::CallContext;
    pub use crate::errmap::ErrorMapping;
    pub use crate::genfile::{GenerateOptions, write_schema};
    pub use crate::status::{Code, Status};
    pub use crate::tls::TlsConfig;
    pub use typewire_core::convert::{Converter, EncodeOptions, SerializerStrategy};
    pub use typewire_core::emit_schema;
    pub use typewire_core::schema::{
        Constraint, EnumSchema, FieldDescriptor, HttpMethod, HttpRule, MessageSchema,
        MethodDescriptor, OptionValue, SchemaRegistry, ServiceSchema, TypeRef,
    };
    pub use typewire_core::value::{MapKey, Record, Value, WireValue};
}
