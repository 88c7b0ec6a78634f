//! Example: bookstore with HTTP bindings and error mapping.
//!
//! Shows the emitted schema with `google.api.http` option blocks, a
//! delete method returning the shared empty type, and a typed error
//! mapped to `not_found` while everything else stays `internal`.
//!
//! Run with: cargo run --bin bookstore

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use typewire::adapter::RpcHandler;
use typewire::prelude::*;
use typewire_core::value::Value;
use typewire_examples::{bookstore_registry, bookstore_service};

#[derive(Debug, Error)]
#[error("book `{0}` does not exist")]
struct BookNotFound(String);

fn book_record(id: &str, title: &str) -> Record {
    Record::new("Book")
        .with("id", id)
        .with("title", title)
        .with("author", "unknown")
        .with("price", 9.99)
}

fn request_id(req: &Record) -> String {
    match req.get("id") {
        Some(Value::Str(id)) => id.clone(),
        _ => String::new(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let registry = bookstore_registry();
    let service = bookstore_service();

    println!("{}", emit_schema(&service, &registry)?);

    let shelf: Arc<Mutex<HashMap<String, Record>>> = Arc::new(Mutex::new(HashMap::from([(
        "1".to_owned(),
        book_record("1", "The Schema Book"),
    )])));

    let get_shelf = shelf.clone();
    let list_shelf = shelf.clone();
    let delete_shelf = shelf.clone();

    let adapter = ServiceAdapter::builder(&service, &registry)
        .unary("GetBook", move |req: Record| {
            let shelf = get_shelf.clone();
            async move {
                let id = request_id(&req);
                let shelf = shelf.lock().expect("shelf lock");
                shelf
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| anyhow::Error::new(BookNotFound(id)))
            }
        })
        .unary("ListBooks", move |_req: Record| {
            let shelf = list_shelf.clone();
            async move {
                let shelf = shelf.lock().expect("shelf lock");
                let books: Vec<Value> = shelf.values().cloned().map(Value::Record).collect();
                let total = books.len() as i32;
                Ok(Record::new("ListBooksResponse")
                    .with("books", books)
                    .with("total_count", total))
            }
        })
        .unary("DeleteBook", move |req: Record| {
            let shelf = delete_shelf.clone();
            async move {
                let id = request_id(&req);
                let mut shelf = shelf.lock().expect("shelf lock");
                match shelf.remove(&id) {
                    Some(_) => Ok(Record::new("DeleteBookResponse")),
                    None => Err(anyhow::Error::new(BookNotFound(id))),
                }
            }
        })
        .error_mapping(
            "GetBook",
            ErrorMapping::for_error::<BookNotFound>(Code::NotFound),
        )
        .error_mapping(
            "DeleteBook",
            ErrorMapping::for_error::<BookNotFound>(Code::NotFound),
        )
        .build()?;

    let Some(RpcHandler::Unary(get_book)) = adapter.handler("GetBook") else {
        anyhow::bail!("GetBook should be unary");
    };

    let found = get_book(
        WireValue::message([("id", WireValue::Str("1".into()))]),
        CallContext::new(),
    )
    .await?;
    println!("found: {found:?}");

    let missing = get_book(
        WireValue::message([("id", WireValue::Str("7".into()))]),
        CallContext::new(),
    )
    .await
    .unwrap_err();
    println!("missing: {missing}");

    let Some(RpcHandler::Unary(delete_book)) = adapter.handler("DeleteBook") else {
        anyhow::bail!("DeleteBook should be unary");
    };
    let deleted = delete_book(
        WireValue::message([("id", WireValue::Str("1".into()))]),
        CallContext::new(),
    )
    .await?;
    println!("deleted: {deleted:?}");

    Ok(())
}
