//! Example: unary greeter.
//!
//! Declares the greeter service, writes its schema file, builds the
//! dispatch table, and drives one call through it by hand (standing in for
//! a transport binding).
//!
//! Run with: cargo run --bin greeter

use typewire::adapter::RpcHandler;
use typewire::prelude::*;
use typewire_core::value::Value;
use typewire_examples::{greeter_registry, greeter_service};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let registry = greeter_registry();
    let service = greeter_service();

    let path = write_schema(&service, &registry, &GenerateOptions::from_env())?;
    println!("schema written to {}", path.display());

    let adapter = ServiceAdapter::builder(&service, &registry)
        .unary("SayHello", |req: Record| async move {
            let name = match req.get("name") {
                Some(Value::Str(name)) => name.clone(),
                _ => "World".to_owned(),
            };
            Ok(Record::new("HelloReply").with("message", format!("Hello, {name}!")))
        })
        .build()?;

    let Some(RpcHandler::Unary(handler)) = adapter.handler("SayHello") else {
        anyhow::bail!("SayHello should be unary");
    };

    let request = WireValue::message([("name", WireValue::Str("typewire".into()))]);
    let reply = handler(request, CallContext::new()).await?;
    println!("reply: {reply:?}");

    Ok(())
}
