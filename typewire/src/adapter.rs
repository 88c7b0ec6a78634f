//! Transport adapter generation.
//!
//! [`ServiceAdapter::builder`] registers user closures against a service's
//! declared methods and produces a dispatch table of transport-ready
//! [`RpcHandler`]s. Each handler owns its conversion pipeline: decode the
//! wire request, run the user closure, map its error through the method's
//! declared [`ErrorMapping`]s, and encode the response.
//!
//! User closures take the decoded [`Record`] either alone or together with
//! a [`CallContext`]; the two arities are dispatched through the method
//! traits below, the same overloading pattern transport frameworks use for
//! their extractor tuples.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures::Stream;
use futures::stream::{BoxStream, StreamExt};
use thiserror::Error;
use tracing::debug;
use typewire_core::convert::{EncodeOptions, decode_message, encode_message};
use typewire_core::error::SchemaError;
use typewire_core::schema::{MethodDescriptor, SchemaRegistry, ServiceSchema, TypeRef};
use typewire_core::value::{Record, WireValue};

use crate::context::CallContext;
use crate::errmap::{ErrorMapping, map_error};
use crate::status::Status;
use crate::tls::TlsConfig;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Inbound wire values of a client-streaming or duplex call.
pub type WireStream = BoxStream<'static, WireValue>;

/// Outbound items of a streaming handler. A mid-stream `Err` is terminal.
pub type WireResultStream = BoxStream<'static, Result<WireValue, Status>>;

/// Decoded inbound stream handed to client-streaming and duplex closures.
/// Each item carries its own decode outcome.
pub type RecordStream = BoxStream<'static, Result<Record, Status>>;

type UnaryFn =
    Arc<dyn Fn(WireValue, CallContext) -> BoxFuture<Result<WireValue, Status>> + Send + Sync>;
type ServerStreamFn = Arc<dyn Fn(WireValue, CallContext) -> WireResultStream + Send + Sync>;
type ClientStreamFn =
    Arc<dyn Fn(WireStream, CallContext) -> BoxFuture<Result<WireValue, Status>> + Send + Sync>;
type DuplexFn = Arc<dyn Fn(WireStream, CallContext) -> WireResultStream + Send + Sync>;

/// A transport-ready handler for one method.
///
/// The variant fixes the call shape; the transport binding picks the
/// matching transport surface for each.
#[derive(Clone)]
pub enum RpcHandler {
    Unary(UnaryFn),
    ServerStream(ServerStreamFn),
    ClientStream(ClientStreamFn),
    Duplex(DuplexFn),
}

impl RpcHandler {
    pub fn shape(&self) -> &'static str {
        match self {
            RpcHandler::Unary(_) => "unary",
            RpcHandler::ServerStream(_) => "server streaming",
            RpcHandler::ClientStream(_) => "client streaming",
            RpcHandler::Duplex(_) => "bidirectional streaming",
        }
    }
}

impl std::fmt::Debug for RpcHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("RpcHandler").field(&self.shape()).finish()
    }
}

// ============================================================================
// Method traits: {1,2}-parameter arity dispatch
// ============================================================================

/// Marker for closures that take only the request.
pub struct WithoutContext;
/// Marker for closures that also take the call context.
pub struct WithContext;

/// A unary method body. Implemented for `Fn(Record)` and
/// `Fn(Record, CallContext)` closures returning a record future.
pub trait UnaryMethod<M>: Send + Sync + 'static {
    fn invoke(&self, request: Record, ctx: CallContext) -> BoxFuture<anyhow::Result<Record>>;
}

impl<F, Fut> UnaryMethod<WithoutContext> for F
where
    F: Fn(Record) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Record>> + Send + 'static,
{
    fn invoke(&self, request: Record, _ctx: CallContext) -> BoxFuture<anyhow::Result<Record>> {
        Box::pin(self(request))
    }
}

impl<F, Fut> UnaryMethod<WithContext> for F
where
    F: Fn(Record, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Record>> + Send + 'static,
{
    fn invoke(&self, request: Record, ctx: CallContext) -> BoxFuture<anyhow::Result<Record>> {
        Box::pin(self(request, ctx))
    }
}

/// A server-streaming method body: one request in, a stream of records out.
pub trait ServerStreamMethod<M>: Send + Sync + 'static {
    fn invoke(
        &self,
        request: Record,
        ctx: CallContext,
    ) -> BoxStream<'static, anyhow::Result<Record>>;
}

impl<F, S> ServerStreamMethod<WithoutContext> for F
where
    F: Fn(Record) -> S + Send + Sync + 'static,
    S: Stream<Item = anyhow::Result<Record>> + Send + 'static,
{
    fn invoke(
        &self,
        request: Record,
        _ctx: CallContext,
    ) -> BoxStream<'static, anyhow::Result<Record>> {
        self(request).boxed()
    }
}

impl<F, S> ServerStreamMethod<WithContext> for F
where
    F: Fn(Record, CallContext) -> S + Send + Sync + 'static,
    S: Stream<Item = anyhow::Result<Record>> + Send + 'static,
{
    fn invoke(
        &self,
        request: Record,
        ctx: CallContext,
    ) -> BoxStream<'static, anyhow::Result<Record>> {
        self(request, ctx).boxed()
    }
}

/// A client-streaming method body: a stream of decoded records in, one
/// record out.
pub trait ClientStreamMethod<M>: Send + Sync + 'static {
    fn invoke(&self, requests: RecordStream, ctx: CallContext)
    -> BoxFuture<anyhow::Result<Record>>;
}

impl<F, Fut> ClientStreamMethod<WithoutContext> for F
where
    F: Fn(RecordStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Record>> + Send + 'static,
{
    fn invoke(
        &self,
        requests: RecordStream,
        _ctx: CallContext,
    ) -> BoxFuture<anyhow::Result<Record>> {
        Box::pin(self(requests))
    }
}

impl<F, Fut> ClientStreamMethod<WithContext> for F
where
    F: Fn(RecordStream, CallContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<Record>> + Send + 'static,
{
    fn invoke(
        &self,
        requests: RecordStream,
        ctx: CallContext,
    ) -> BoxFuture<anyhow::Result<Record>> {
        Box::pin(self(requests, ctx))
    }
}

/// A duplex method body: streams on both sides.
pub trait DuplexMethod<M>: Send + Sync + 'static {
    fn invoke(
        &self,
        requests: RecordStream,
        ctx: CallContext,
    ) -> BoxStream<'static, anyhow::Result<Record>>;
}

impl<F, S> DuplexMethod<WithoutContext> for F
where
    F: Fn(RecordStream) -> S + Send + Sync + 'static,
    S: Stream<Item = anyhow::Result<Record>> + Send + 'static,
{
    fn invoke(
        &self,
        requests: RecordStream,
        _ctx: CallContext,
    ) -> BoxStream<'static, anyhow::Result<Record>> {
        self(requests).boxed()
    }
}

impl<F, S> DuplexMethod<WithContext> for F
where
    F: Fn(RecordStream, CallContext) -> S + Send + Sync + 'static,
    S: Stream<Item = anyhow::Result<Record>> + Send + 'static,
{
    fn invoke(
        &self,
        requests: RecordStream,
        ctx: CallContext,
    ) -> BoxStream<'static, anyhow::Result<Record>> {
        self(requests, ctx).boxed()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Build-time adapter failure. All of these surface before any call is
/// served.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("no method named `{0}` is declared on the service")]
    UnknownMethod(String),

    #[error("method `{0}` has no registered handler")]
    MissingHandler(String),

    #[error("method `{method}` is declared {declared} but was registered as {registered}")]
    ShapeMismatch {
        method: String,
        declared: &'static str,
        registered: &'static str,
    },

    #[error("method `{method}`: {side} type `{type_name}` is not a message type")]
    InvalidMethodType {
        method: String,
        side: &'static str,
        type_name: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

type BoxedUnary =
    Arc<dyn Fn(Record, CallContext) -> BoxFuture<anyhow::Result<Record>> + Send + Sync>;
type BoxedServerStream =
    Arc<dyn Fn(Record, CallContext) -> BoxStream<'static, anyhow::Result<Record>> + Send + Sync>;
type BoxedClientStream =
    Arc<dyn Fn(RecordStream, CallContext) -> BoxFuture<anyhow::Result<Record>> + Send + Sync>;
type BoxedDuplex = Arc<
    dyn Fn(RecordStream, CallContext) -> BoxStream<'static, anyhow::Result<Record>> + Send + Sync,
>;

enum Pending {
    Unary(BoxedUnary),
    ServerStream(BoxedServerStream),
    ClientStream(BoxedClientStream),
    Duplex(BoxedDuplex),
}

impl Pending {
    fn shape(&self) -> &'static str {
        match self {
            Pending::Unary(_) => "unary",
            Pending::ServerStream(_) => "server streaming",
            Pending::ClientStream(_) => "client streaming",
            Pending::Duplex(_) => "bidirectional streaming",
        }
    }
}

/// Builder collecting handlers, error mappings, and TLS material for one
/// service.
pub struct ServiceAdapterBuilder {
    service: ServiceSchema,
    registry: SchemaRegistry,
    options: EncodeOptions,
    pending: HashMap<String, Pending>,
    mappings: HashMap<String, Vec<ErrorMapping>>,
    tls: Option<TlsConfig>,
}

impl ServiceAdapterBuilder {
    /// Register a unary handler for the named method.
    pub fn unary<M>(mut self, method: &str, handler: impl UnaryMethod<M>) -> Self {
        let handler = Arc::new(handler);
        let boxed: BoxedUnary = Arc::new(move |record, ctx| handler.invoke(record, ctx));
        self.pending.insert(method.to_owned(), Pending::Unary(boxed));
        self
    }

    /// Register a server-streaming handler for the named method.
    pub fn server_stream<M>(mut self, method: &str, handler: impl ServerStreamMethod<M>) -> Self {
        let handler = Arc::new(handler);
        let boxed: BoxedServerStream = Arc::new(move |record, ctx| handler.invoke(record, ctx));
        self.pending
            .insert(method.to_owned(), Pending::ServerStream(boxed));
        self
    }

    /// Register a client-streaming handler for the named method.
    pub fn client_stream<M>(mut self, method: &str, handler: impl ClientStreamMethod<M>) -> Self {
        let handler = Arc::new(handler);
        let boxed: BoxedClientStream = Arc::new(move |requests, ctx| handler.invoke(requests, ctx));
        self.pending
            .insert(method.to_owned(), Pending::ClientStream(boxed));
        self
    }

    /// Register a duplex handler for the named method.
    pub fn duplex<M>(mut self, method: &str, handler: impl DuplexMethod<M>) -> Self {
        let handler = Arc::new(handler);
        let boxed: BoxedDuplex = Arc::new(move |requests, ctx| handler.invoke(requests, ctx));
        self.pending.insert(method.to_owned(), Pending::Duplex(boxed));
        self
    }

    /// Declare an error mapping for the named method. Mappings are
    /// consulted in declaration order, first match wins.
    pub fn error_mapping(mut self, method: &str, mapping: ErrorMapping) -> Self {
        self.mappings.entry(method.to_owned()).or_default().push(mapping);
        self
    }

    /// Serializer strategy for outbound conversion in every handler.
    pub fn encode_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    /// TLS material to pass through to the transport binding.
    pub fn tls(mut self, config: TlsConfig) -> Self {
        self.tls = Some(config);
        self
    }

    /// Validate everything and produce the dispatch table.
    pub fn build(self) -> Result<ServiceAdapter, AdapterError> {
        let Self {
            service,
            registry,
            options,
            pending,
            mappings,
            tls,
        } = self;

        // Resolve registration names against the declared methods.
        let mut by_method: HashMap<String, Pending> = HashMap::new();
        for (name, handler) in pending {
            let descriptor = service
                .method(&name)
                .ok_or_else(|| AdapterError::UnknownMethod(name.clone()))?;
            by_method.insert(descriptor.name().to_owned(), handler);
        }
        let mut mappings_by_method: HashMap<String, Vec<ErrorMapping>> = HashMap::new();
        for (name, entries) in mappings {
            let descriptor = service
                .method(&name)
                .ok_or_else(|| AdapterError::UnknownMethod(name.clone()))?;
            mappings_by_method
                .entry(descriptor.name().to_owned())
                .or_default()
                .extend(entries);
        }

        let mut handlers = Vec::with_capacity(service.methods().len());
        for descriptor in service.methods() {
            let pending = by_method
                .remove(descriptor.name())
                .ok_or_else(|| AdapterError::MissingHandler(descriptor.name().to_owned()))?;

            let declared = shape_of(descriptor);
            if declared != pending.shape() {
                return Err(AdapterError::ShapeMismatch {
                    method: descriptor.name().to_owned(),
                    declared,
                    registered: pending.shape(),
                });
            }

            let codec = IoCodec::for_method(descriptor, &registry, options)?;
            let mappings = mappings_by_method
                .remove(descriptor.name())
                .unwrap_or_default();
            let handler = wrap(pending, codec, mappings);
            debug!(
                service = service.name(),
                method = descriptor.name(),
                shape = handler.shape(),
                "handler registered"
            );
            handlers.push((descriptor.name().to_owned(), handler));
        }

        Ok(ServiceAdapter {
            name: service.name().to_owned(),
            handlers,
            tls,
        })
    }
}

fn shape_of(descriptor: &MethodDescriptor) -> &'static str {
    match (descriptor.is_client_streaming(), descriptor.is_server_streaming()) {
        (false, false) => "unary",
        (false, true) => "server streaming",
        (true, false) => "client streaming",
        (true, true) => "bidirectional streaming",
    }
}

// ============================================================================
// Conversion pipeline shared by all handler shapes
// ============================================================================

#[derive(Clone)]
enum MessageKind {
    Named(String),
    Empty,
}

/// Decode/encode pipeline for one method, bound to its request and
/// response schemas.
#[derive(Clone)]
struct IoCodec {
    registry: SchemaRegistry,
    request: MessageKind,
    response: MessageKind,
    options: EncodeOptions,
}

impl IoCodec {
    fn for_method(
        descriptor: &MethodDescriptor,
        registry: &SchemaRegistry,
        options: EncodeOptions,
    ) -> Result<Self, AdapterError> {
        Ok(Self {
            registry: registry.clone(),
            request: message_kind(descriptor.request(), registry, descriptor, "request")?,
            response: message_kind(descriptor.response(), registry, descriptor, "response")?,
            options,
        })
    }

    /// Decode failures abort the call before the handler runs.
    fn decode_request(&self, wire: &WireValue) -> Result<Record, Status> {
        match &self.request {
            MessageKind::Named(name) => decode_message(&self.registry, name, wire)
                .map_err(|e| Status::invalid_argument(e.to_string())),
            MessageKind::Empty => Ok(Record::new("Empty")),
        }
    }

    /// Encode failures indicate a handler bug; they surface as internal.
    fn encode_response(&self, record: &Record) -> Result<WireValue, Status> {
        match &self.response {
            MessageKind::Named(name) => {
                encode_message(&self.registry, name, record, self.options)
                    .map_err(|e| Status::internal(e.to_string()))
            }
            MessageKind::Empty => Ok(WireValue::Empty),
        }
    }
}

fn message_kind(
    ty: &TypeRef,
    registry: &SchemaRegistry,
    descriptor: &MethodDescriptor,
    side: &'static str,
) -> Result<MessageKind, AdapterError> {
    match ty {
        TypeRef::Message(name) => {
            registry.expect(name)?;
            Ok(MessageKind::Named(name.clone()))
        }
        TypeRef::Empty => Ok(MessageKind::Empty),
        other => Err(AdapterError::InvalidMethodType {
            method: descriptor.name().to_owned(),
            side,
            type_name: typewire_core::classify::describe(other),
        }),
    }
}

fn wrap(pending: Pending, codec: IoCodec, mappings: Vec<ErrorMapping>) -> RpcHandler {
    match pending {
        Pending::Unary(handler) => {
            let call = move |wire: WireValue, ctx: CallContext| -> BoxFuture<Result<WireValue, Status>> {
                let codec = codec.clone();
                let handler = handler.clone();
                let mappings = mappings.clone();
                Box::pin(async move {
                    let record = codec.decode_request(&wire)?;
                    match handler(record, ctx).await {
                        Ok(response) => codec.encode_response(&response),
                        Err(error) => Err(map_error(&error, &mappings, &wire)),
                    }
                })
            };
            RpcHandler::Unary(Arc::new(call))
        }
        Pending::ServerStream(handler) => {
            let call = move |wire: WireValue, ctx: CallContext| -> WireResultStream {
                let codec = codec.clone();
                let handler = handler.clone();
                let mappings = mappings.clone();
                stream! {
                    let record = match codec.decode_request(&wire) {
                        Ok(record) => record,
                        Err(status) => {
                            yield Err(status);
                            return;
                        }
                    };
                    let mut items = handler(record, ctx);
                    while let Some(item) = items.next().await {
                        match item {
                            Ok(response) => match codec.encode_response(&response) {
                                Ok(wire) => yield Ok(wire),
                                Err(status) => {
                                    yield Err(status);
                                    return;
                                }
                            },
                            // A handler error terminates the stream; items
                            // already yielded stay yielded.
                            Err(error) => {
                                yield Err(map_error(&error, &mappings, &wire));
                                return;
                            }
                        }
                    }
                }
                .boxed()
            };
            RpcHandler::ServerStream(Arc::new(call))
        }
        Pending::ClientStream(handler) => {
            let call = move |inbound: WireStream, ctx: CallContext| -> BoxFuture<Result<WireValue, Status>> {
                let codec = codec.clone();
                let handler = handler.clone();
                let mappings = mappings.clone();
                Box::pin(async move {
                    let decoder = codec.clone();
                    let requests: RecordStream = inbound
                        .map(move |wire| decoder.decode_request(&wire))
                        .boxed();
                    match handler(requests, ctx).await {
                        Ok(response) => codec.encode_response(&response),
                        // No single raw request exists for a streaming
                        // inbound side; formatters see the empty marker.
                        Err(error) => Err(map_error(&error, &mappings, &WireValue::Empty)),
                    }
                })
            };
            RpcHandler::ClientStream(Arc::new(call))
        }
        Pending::Duplex(handler) => {
            let call = move |inbound: WireStream, ctx: CallContext| -> WireResultStream {
                let codec = codec.clone();
                let handler = handler.clone();
                let mappings = mappings.clone();
                let decoder = codec.clone();
                let requests: RecordStream = inbound
                    .map(move |wire| decoder.decode_request(&wire))
                    .boxed();
                let mut items = handler(requests, ctx);
                stream! {
                    while let Some(item) = items.next().await {
                        match item {
                            Ok(response) => match codec.encode_response(&response) {
                                Ok(wire) => yield Ok(wire),
                                Err(status) => {
                                    yield Err(status);
                                    return;
                                }
                            },
                            Err(error) => {
                                yield Err(map_error(&error, &mappings, &WireValue::Empty));
                                return;
                            }
                        }
                    }
                }
                .boxed()
            };
            RpcHandler::Duplex(Arc::new(call))
        }
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// The built dispatch table for one service: method names in declaration
/// order, each bound to a transport-ready handler.
#[derive(Clone, Debug)]
pub struct ServiceAdapter {
    name: String,
    handlers: Vec<(String, RpcHandler)>,
    tls: Option<TlsConfig>,
}

impl ServiceAdapter {
    /// Start building an adapter for a service.
    pub fn builder(service: &ServiceSchema, registry: &SchemaRegistry) -> ServiceAdapterBuilder {
        ServiceAdapterBuilder {
            service: service.clone(),
            registry: registry.clone(),
            options: EncodeOptions::default(),
            pending: HashMap::new(),
            mappings: HashMap::new(),
            tls: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a handler by its schema method name.
    pub fn handler(&self, method: &str) -> Option<&RpcHandler> {
        self.handlers
            .iter()
            .find(|(name, _)| name == method)
            .map(|(_, handler)| handler)
    }

    /// Method names in service declaration order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.handlers.iter().map(|(name, _)| name.as_str())
    }

    /// TLS material for the transport binding, uninterpreted.
    pub fn tls_config(&self) -> Option<&TlsConfig> {
        self.tls.as_ref()
    }

    /// Consume the adapter into its dispatch table.
    pub fn into_dispatch_table(self) -> Vec<(String, RpcHandler)> {
        self.handlers
    }
}
