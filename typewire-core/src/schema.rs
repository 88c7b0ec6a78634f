//! Schema data model: the typed message declarations the engine consumes.
//!
//! Everything here is a derived, immutable, value-like artifact. Schemas are
//! built once through the builder APIs, registered in a [`SchemaRegistry`],
//! and then shared by the walker, the emitter, and the converters. Message
//! references are resolved by name through the registry, which is what makes
//! recursive message graphs representable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use convert_case::{Case, Casing};

use crate::error::SchemaError;
use crate::value::{Record, Value};

/// Boxed error returned by user-supplied hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Per-field serializer hook: receives the raw field value, returns the
/// transformed value to put on the wire.
pub type FieldSerializer = Arc<dyn Fn(Value) -> Result<Value, BoxError> + Send + Sync>;

/// Whole-message serializer hook: receives the raw record, returns the
/// transformed record the encoder should read fields from.
pub type MessageSerializer = Arc<dyn Fn(Record) -> Result<Record, BoxError> + Send + Sync>;

/// Message-level validator, run after inbound field assembly.
pub type Validator = Arc<dyn Fn(&Record) -> Result<(), String> + Send + Sync>;

/// A reference to a native type, as written in a field or method declaration.
///
/// This is the input alphabet of the type classifier. Messages are referred
/// to by name and resolved through the [`SchemaRegistry`]; enums are small
/// and acyclic, so they are carried inline.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeRef {
    String,
    Int32,
    Bool,
    Bytes,
    Float,
    /// A point in time; emits as `google.protobuf.Timestamp`.
    Timestamp,
    /// An elapsed span; emits as `google.protobuf.Duration`.
    Duration,
    /// The shared well-known empty type.
    Empty,
    Enum(Arc<EnumSchema>),
    /// A message schema, by registered name.
    Message(String),
    List(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    /// A sum of alternatives. May contain [`TypeRef::Null`]; a union whose
    /// only non-null alternative is `T` is reclassified as optional `T`.
    Union(Vec<TypeRef>),
    /// The absence alternative inside a union. Not a standalone type.
    Null,
    /// A compiler-generated wire-binding type referenced directly.
    /// Always rejected by the classifier.
    Wire(String),
}

impl TypeRef {
    pub fn message(name: impl Into<String>) -> Self {
        TypeRef::Message(name.into())
    }

    pub fn list(item: TypeRef) -> Self {
        TypeRef::List(Box::new(item))
    }

    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        TypeRef::Map(Box::new(key), Box::new(value))
    }

    pub fn union(alternatives: impl IntoIterator<Item = TypeRef>) -> Self {
        TypeRef::Union(alternatives.into_iter().collect())
    }

    /// Shorthand for `Union([inner, Null])`.
    pub fn optional(inner: TypeRef) -> Self {
        TypeRef::Union(vec![inner, TypeRef::Null])
    }
}

/// A declared numeric or length constraint.
///
/// Constraints render as documentation in the emitted schema and are
/// enforced when a record is assembled from wire values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Constraint {
    Ge(f64),
    Le(f64),
    Gt(f64),
    Lt(f64),
    MultipleOf(f64),
    Len(usize),
    MinLen(usize),
    MaxLen(usize),
}

impl Constraint {
    /// Human-readable requirement, shared by schema comments and
    /// validation errors.
    pub fn describe(&self) -> String {
        match self {
            Constraint::Ge(n) => format!("greater than or equal to {n}"),
            Constraint::Le(n) => format!("less than or equal to {n}"),
            Constraint::Gt(n) => format!("greater than {n}"),
            Constraint::Lt(n) => format!("less than {n}"),
            Constraint::MultipleOf(n) => format!("multiple of {n}"),
            Constraint::Len(n) => format!("length of {n}"),
            Constraint::MinLen(n) => format!("minimum length of {n}"),
            Constraint::MaxLen(n) => format!("maximum length of {n}"),
        }
    }
}

/// A single message field declaration.
///
/// Field numbers are not stored here; the emitter assigns them from
/// declaration order, starting at 1, one per field or oneof alternative.
#[derive(Clone, Debug)]
pub struct FieldDescriptor {
    name: String,
    type_ref: TypeRef,
    optional: bool,
    doc: Option<String>,
    constraints: Vec<Constraint>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            optional: false,
            doc: None,
            constraints: Vec::new(),
        }
    }

    /// Mark the field optional. Declaring the type as a union with a null
    /// alternative has the same effect.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.type_ref
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn doc_text(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }
}

/// An enum declaration: ordered `(name, number)` members.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumSchema {
    name: String,
    members: Vec<(String, i32)>,
    doc: Option<String>,
}

impl EnumSchema {
    /// Build an enum schema, rejecting duplicate member names or numbers.
    pub fn build<N: Into<String>>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = (N, i32)>,
    ) -> Result<Arc<Self>, SchemaError> {
        let name = name.into();
        let members: Vec<(String, i32)> = members
            .into_iter()
            .map(|(n, v)| (n.into(), v))
            .collect();

        for (i, (member, number)) in members.iter().enumerate() {
            for (other, other_number) in &members[i + 1..] {
                if member == other {
                    return Err(SchemaError::DuplicateEnumName {
                        name,
                        member: member.clone(),
                    });
                }
                if number == other_number {
                    return Err(SchemaError::DuplicateEnumMember {
                        name,
                        number: *number,
                    });
                }
            }
        }

        Ok(Arc::new(Self {
            name,
            members,
            doc: None,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[(String, i32)] {
        &self.members
    }

    /// Whether `number` is a declared member.
    pub fn contains(&self, number: i32) -> bool {
        self.members.iter().any(|(_, n)| *n == number)
    }

    pub fn doc_text(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

/// A message declaration: ordered fields plus optional serializer and
/// validator hooks.
///
/// A message with zero fields is the well-known empty marker; it never gets
/// a declaration of its own in the emitted schema.
#[derive(Clone)]
pub struct MessageSchema {
    name: String,
    doc: Option<String>,
    fields: Vec<FieldDescriptor>,
    serializers: HashMap<String, FieldSerializer>,
    message_serializer: Option<MessageSerializer>,
    validator: Option<Validator>,
}

impl fmt::Debug for MessageSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSchema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("serializers", &self.serializers.keys())
            .finish_non_exhaustive()
    }
}

impl MessageSchema {
    pub fn builder(name: impl Into<String>) -> MessageSchemaBuilder {
        MessageSchemaBuilder {
            schema: MessageSchema {
                name: name.into(),
                doc: None,
                fields: Vec::new(),
                serializers: HashMap::new(),
                message_serializer: None,
                validator: None,
            },
        }
    }

    /// A message with no declared fields (the well-known empty marker).
    pub fn empty(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc_text(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Zero declared fields: classifies as the well-known empty type.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn serializer(&self, field: &str) -> Option<&FieldSerializer> {
        self.serializers.get(field)
    }

    pub fn message_serializer(&self) -> Option<&MessageSerializer> {
        self.message_serializer.as_ref()
    }

    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }
}

/// Builder for [`MessageSchema`]. Serializer hooks and validators are
/// attached here, at declaration time, rather than discovered at call time.
pub struct MessageSchemaBuilder {
    schema: MessageSchema,
}

impl MessageSchemaBuilder {
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.schema.doc = Some(doc.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.schema.fields.push(field);
        self
    }

    /// Attach a serializer hook to the named field. The hook runs during
    /// outbound conversion, subject to the active serializer strategy.
    pub fn serializer(
        mut self,
        field: impl Into<String>,
        hook: impl Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.schema.serializers.insert(field.into(), Arc::new(hook));
        self
    }

    /// Attach a whole-message serializer hook, applied before per-field
    /// hooks at the same nesting level.
    pub fn message_serializer(
        mut self,
        hook: impl Fn(Record) -> Result<Record, BoxError> + Send + Sync + 'static,
    ) -> Self {
        self.schema.message_serializer = Some(Arc::new(hook));
        self
    }

    /// Attach a validator, run after inbound field assembly. A returned
    /// error string surfaces as a validation error.
    pub fn validator(
        mut self,
        validator: impl Fn(&Record) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        self.schema.validator = Some(Arc::new(validator));
        self
    }

    pub fn build(self) -> MessageSchema {
        self.schema
    }
}

/// Immutable set of message schemas, keyed by name.
///
/// Built once per service and shared (cheaply cloned) by the walker, the
/// emitter, and every converter. Each generation pass keeps its own visited
/// sets; the registry itself is never mutated after `build`.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    messages: Arc<HashMap<String, MessageSchema>>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder {
            schemas: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MessageSchema> {
        self.messages.get(name)
    }

    /// Like [`get`](Self::get), but an unknown name is a schema error.
    pub fn expect(&self, name: &str) -> Result<&MessageSchema, SchemaError> {
        self.get(name)
            .ok_or_else(|| SchemaError::UnknownMessage(name.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Builder for [`SchemaRegistry`]. Duplicate names are rejected at `build`.
pub struct SchemaRegistryBuilder {
    schemas: Vec<MessageSchema>,
}

impl SchemaRegistryBuilder {
    pub fn register(mut self, schema: MessageSchema) -> Self {
        self.schemas.push(schema);
        self
    }

    pub fn build(self) -> Result<SchemaRegistry, SchemaError> {
        let mut messages = HashMap::with_capacity(self.schemas.len());
        for schema in self.schemas {
            let name = schema.name().to_owned();
            if messages.insert(name.clone(), schema).is_some() {
                return Err(SchemaError::DuplicateMessage(name));
            }
        }
        Ok(SchemaRegistry {
            messages: Arc::new(messages),
        })
    }
}

/// A raw schema option value attached to a method.
#[derive(Clone, Debug, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    /// An identifier rendered bare, e.g. `IDEMPOTENT`.
    Ident(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{b}"),
            OptionValue::Ident(s) => f.write_str(s),
        }
    }
}

/// HTTP verb of an [`HttpRule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    /// Lower-case form used inside `google.api.http` option blocks.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
        }
    }
}

/// HTTP-binding metadata for a method, carried through to the emitted
/// schema as a `google.api.http` option block.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpRule {
    method: HttpMethod,
    path: String,
    body: Option<String>,
    additional_bindings: Vec<(HttpMethod, String)>,
}

impl HttpRule {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            additional_bindings: Vec::new(),
        }
    }

    /// Request body selector, usually `"*"`.
    pub fn body(mut self, selector: impl Into<String>) -> Self {
        self.body = Some(selector.into());
        self
    }

    pub fn additional_binding(mut self, method: HttpMethod, path: impl Into<String>) -> Self {
        self.additional_bindings.push((method, path.into()));
        self
    }

    pub fn http_method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body_selector(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub fn bindings(&self) -> &[(HttpMethod, String)] {
        &self.additional_bindings
    }
}

/// A single RPC method declaration.
#[derive(Clone, Debug)]
pub struct MethodDescriptor {
    name: String,
    request: TypeRef,
    response: TypeRef,
    client_streaming: bool,
    server_streaming: bool,
    doc: Option<String>,
    http: Option<HttpRule>,
    options: Vec<(String, OptionValue)>,
}

impl MethodDescriptor {
    /// Declare a method. The name is normalized to PascalCase for the
    /// schema, so `get_book` and `GetBook` are the same method.
    pub fn new(name: impl AsRef<str>, request: TypeRef, response: TypeRef) -> Self {
        Self {
            name: name.as_ref().to_case(Case::Pascal),
            request,
            response,
            client_streaming: false,
            server_streaming: false,
            doc: None,
            http: None,
            options: Vec::new(),
        }
    }

    pub fn client_streaming(mut self) -> Self {
        self.client_streaming = true;
        self
    }

    pub fn server_streaming(mut self) -> Self {
        self.server_streaming = true;
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn http(mut self, rule: HttpRule) -> Self {
        self.http = Some(rule);
        self
    }

    /// Attach a raw schema option, e.g. `("deprecated", Bool(true))`.
    pub fn option(mut self, key: impl Into<String>, value: OptionValue) -> Self {
        self.options.push((key.into(), value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn request(&self) -> &TypeRef {
        &self.request
    }

    pub fn response(&self) -> &TypeRef {
        &self.response
    }

    pub fn is_client_streaming(&self) -> bool {
        self.client_streaming
    }

    pub fn is_server_streaming(&self) -> bool {
        self.server_streaming
    }

    pub fn doc_text(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn http_rule(&self) -> Option<&HttpRule> {
        self.http.as_ref()
    }

    pub fn options(&self) -> &[(String, OptionValue)] {
        &self.options
    }
}

/// A service declaration: name, optional package override, ordered methods.
#[derive(Clone, Debug)]
pub struct ServiceSchema {
    name: String,
    package: Option<String>,
    doc: Option<String>,
    methods: Vec<MethodDescriptor>,
}

impl ServiceSchema {
    pub fn builder(name: impl Into<String>) -> ServiceSchemaBuilder {
        ServiceSchemaBuilder {
            schema: ServiceSchema {
                name: name.into(),
                package: None,
                doc: None,
                methods: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc_text(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        let pascal = name.to_case(Case::Pascal);
        self.methods.iter().find(|m| m.name() == pascal)
    }

    /// Effective package name: the explicit override, or the service name
    /// with a trailing `Service` stripped, lower-cased, with `.v1` appended.
    pub fn package_name(&self) -> String {
        if let Some(package) = &self.package {
            return package.clone();
        }
        let base = self.name.strip_suffix("Service").unwrap_or(&self.name);
        format!("{}.v1", base.to_lowercase())
    }
}

/// Builder for [`ServiceSchema`].
pub struct ServiceSchemaBuilder {
    schema: ServiceSchema,
}

impl ServiceSchemaBuilder {
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.schema.package = Some(package.into());
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.schema.doc = Some(doc.into());
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.schema.methods.push(method);
        self
    }

    pub fn build(self) -> ServiceSchema {
        self.schema
    }
}
