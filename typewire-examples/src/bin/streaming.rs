//! Example: server-streaming dispatch.
//!
//! A countdown method declared `server_streaming`, driven through the
//! dispatch table; each item is converted independently and arrives in
//! production order.
//!
//! Run with: cargo run --bin streaming

use async_stream::stream;
use futures::StreamExt;
use typewire::adapter::RpcHandler;
use typewire::prelude::*;
use typewire_core::value::Value;

fn registry() -> SchemaRegistry {
    SchemaRegistry::builder()
        .register(
            MessageSchema::builder("CountdownRequest")
                .field(
                    FieldDescriptor::new("from", TypeRef::Int32)
                        .constraint(Constraint::Ge(1.0)),
                )
                .build(),
        )
        .register(
            MessageSchema::builder("Tick")
                .field(FieldDescriptor::new("value", TypeRef::Int32))
                .build(),
        )
        .build()
        .expect("countdown schemas are well-formed")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let registry = registry();
    let service = ServiceSchema::builder("CountdownService")
        .method(
            MethodDescriptor::new(
                "Countdown",
                TypeRef::message("CountdownRequest"),
                TypeRef::message("Tick"),
            )
            .server_streaming(),
        )
        .build();

    println!("{}", emit_schema(&service, &registry)?);

    let adapter = ServiceAdapter::builder(&service, &registry)
        .server_stream("Countdown", |req: Record| {
            stream! {
                let from = match req.get("from") {
                    Some(Value::Int(n)) => *n,
                    _ => 0,
                };
                for value in (1..=from).rev() {
                    yield Ok(Record::new("Tick").with("value", value));
                }
            }
        })
        .build()?;

    let Some(RpcHandler::ServerStream(handler)) = adapter.handler("Countdown") else {
        anyhow::bail!("Countdown should be server streaming");
    };

    let request = WireValue::message([("from", WireValue::Int(3))]);
    let mut ticks = handler(request, CallContext::new());
    while let Some(tick) = ticks.next().await {
        println!("tick: {:?}", tick?);
    }

    Ok(())
}
