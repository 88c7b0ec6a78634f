//! Shared schemas for the example binaries.

use typewire::prelude::*;
use typewire_core::value::Value;

/// Greeter: one unary method, string in, string out.
pub fn greeter_registry() -> SchemaRegistry {
    SchemaRegistry::builder()
        .register(
            MessageSchema::builder("HelloRequest")
                .field(
                    FieldDescriptor::new("name", TypeRef::String)
                        .constraint(Constraint::MinLen(1)),
                )
                .build(),
        )
        .register(
            MessageSchema::builder("HelloReply")
                .field(FieldDescriptor::new("message", TypeRef::String))
                .build(),
        )
        .build()
        .expect("greeter schemas are well-formed")
}

pub fn greeter_service() -> ServiceSchema {
    ServiceSchema::builder("GreeterService")
        .doc("Greets people by name.")
        .method(
            MethodDescriptor::new(
                "SayHello",
                TypeRef::message("HelloRequest"),
                TypeRef::message("HelloReply"),
            )
            .doc("Returns a greeting for the given name."),
        )
        .build()
}

/// Bookstore: CRUD-ish surface with HTTP bindings and an Empty delete.
pub fn bookstore_registry() -> SchemaRegistry {
    SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Book")
                .field(FieldDescriptor::new("id", TypeRef::String))
                .field(FieldDescriptor::new("title", TypeRef::String))
                .field(FieldDescriptor::new("author", TypeRef::String))
                .field(FieldDescriptor::new("isbn", TypeRef::String).optional())
                .field(FieldDescriptor::new("price", TypeRef::Float))
                .build(),
        )
        .register(
            MessageSchema::builder("GetBookRequest")
                .field(FieldDescriptor::new("id", TypeRef::String))
                .build(),
        )
        .register(
            MessageSchema::builder("ListBooksRequest")
                .field(FieldDescriptor::new("author", TypeRef::String).optional())
                .field(FieldDescriptor::new("limit", TypeRef::Int32))
                .build(),
        )
        .register(
            MessageSchema::builder("ListBooksResponse")
                .field(FieldDescriptor::new(
                    "books",
                    TypeRef::list(TypeRef::message("Book")),
                ))
                .field(FieldDescriptor::new("total_count", TypeRef::Int32))
                .build(),
        )
        .register(MessageSchema::empty("DeleteBookResponse"))
        .build()
        .expect("bookstore schemas are well-formed")
}

pub fn bookstore_service() -> ServiceSchema {
    ServiceSchema::builder("BookstoreService")
        .method(
            MethodDescriptor::new(
                "GetBook",
                TypeRef::message("GetBookRequest"),
                TypeRef::message("Book"),
            )
            .http(HttpRule::new(HttpMethod::Get, "/v1/books/{id}")),
        )
        .method(
            MethodDescriptor::new(
                "ListBooks",
                TypeRef::message("ListBooksRequest"),
                TypeRef::message("ListBooksResponse"),
            )
            .http(
                HttpRule::new(HttpMethod::Get, "/v1/books")
                    .additional_binding(HttpMethod::Get, "/v1/authors/{author}/books"),
            ),
        )
        .method(
            MethodDescriptor::new(
                "DeleteBook",
                TypeRef::message("GetBookRequest"),
                TypeRef::message("DeleteBookResponse"),
            )
            .http(HttpRule::new(HttpMethod::Delete, "/v1/books/{id}"))
            .option("idempotency_level", OptionValue::Ident("IDEMPOTENT".into())),
        )
        .build()
}

/// Person/Address pair with casing serializers on both levels.
pub fn person_registry() -> SchemaRegistry {
    let upper = |value: Value| match value {
        Value::Str(s) => Ok(Value::Str(s.to_uppercase())),
        other => Ok(other),
    };

    SchemaRegistry::builder()
        .register(
            MessageSchema::builder("Address")
                .field(FieldDescriptor::new("street", TypeRef::String))
                .field(FieldDescriptor::new("city", TypeRef::String))
                .field(FieldDescriptor::new("country", TypeRef::String))
                .serializer("city", upper)
                .serializer("country", upper)
                .build(),
        )
        .register(
            MessageSchema::builder("Person")
                .field(FieldDescriptor::new("name", TypeRef::String))
                .field(FieldDescriptor::new("age", TypeRef::Int32))
                .field(FieldDescriptor::new("address", TypeRef::message("Address")))
                .build(),
        )
        .build()
        .expect("person schemas are well-formed")
}
