//! Transitive type collection for a service.
//!
//! Starting from the request and response of every method, collect every
//! message and enum the schema must declare, plus flags for the well-known
//! imports. Visited-set bookkeeping makes the walk terminate on recursive
//! message graphs; visiting order is first-seen order, which is what fixes
//! the declaration order of the emitted schema.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::classify::flatten_union;
use crate::error::SchemaError;
use crate::schema::{EnumSchema, MessageSchema, SchemaRegistry, ServiceSchema, TypeRef};

/// Everything a service's schema must declare or import.
#[derive(Clone, Debug, Default)]
pub struct TypeClosure {
    /// Non-empty messages, in first-seen order.
    pub messages: Vec<MessageSchema>,
    /// Enums, in first-seen order.
    pub enums: Vec<Arc<EnumSchema>>,
    pub uses_timestamp: bool,
    pub uses_duration: bool,
    pub uses_empty: bool,
    pub uses_http: bool,
}

impl TypeClosure {
    /// Walk the service's methods and collect the full type closure.
    pub fn collect(
        service: &ServiceSchema,
        registry: &SchemaRegistry,
    ) -> Result<Self, SchemaError> {
        let mut closure = TypeClosure::default();
        let mut queue: VecDeque<TypeRef> = VecDeque::new();
        let mut seen_messages: HashSet<String> = HashSet::new();
        let mut seen_enums: HashSet<String> = HashSet::new();

        for method in service.methods() {
            if method.http_rule().is_some() {
                closure.uses_http = true;
            }
            queue.push_back(method.request().clone());
            queue.push_back(method.response().clone());
        }

        while let Some(ty) = queue.pop_front() {
            match ty {
                TypeRef::String
                | TypeRef::Int32
                | TypeRef::Bool
                | TypeRef::Bytes
                | TypeRef::Float => {}
                TypeRef::Timestamp => closure.uses_timestamp = true,
                TypeRef::Duration => closure.uses_duration = true,
                TypeRef::Empty => closure.uses_empty = true,
                TypeRef::Enum(schema) => {
                    if seen_enums.insert(schema.name().to_owned()) {
                        closure.enums.push(schema);
                    }
                }
                TypeRef::Message(name) => {
                    let schema = registry.expect(&name)?;
                    if schema.is_empty() {
                        // Zero-field messages collapse to the shared empty
                        // type and are never declared.
                        closure.uses_empty = true;
                        continue;
                    }
                    // Mark before descending so recursive references stop.
                    if seen_messages.insert(name) {
                        closure.messages.push(schema.clone());
                        for field in schema.fields() {
                            queue.push_back(field.type_ref().clone());
                        }
                    }
                }
                TypeRef::List(item) => queue.push_back(*item),
                TypeRef::Map(key, value) => {
                    queue.push_back(*key);
                    queue.push_back(*value);
                }
                TypeRef::Union(alternatives) => {
                    for alt in flatten_union(&alternatives) {
                        queue.push_back(alt);
                    }
                }
                TypeRef::Null => {}
                TypeRef::Wire(name) => return Err(SchemaError::WireTypeReference(name)),
            }
        }

        Ok(closure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, MethodDescriptor};

    fn registry() -> SchemaRegistry {
        let color = EnumSchema::build("Color", [("RED", 0), ("BLUE", 1)]).unwrap();
        SchemaRegistry::builder()
            .register(
                MessageSchema::builder("Node")
                    .field(FieldDescriptor::new("label", TypeRef::String))
                    .field(
                        FieldDescriptor::new(
                            "next",
                            TypeRef::optional(TypeRef::message("Node")),
                        ),
                    )
                    .build(),
            )
            .register(
                MessageSchema::builder("Paint")
                    .field(FieldDescriptor::new("color", TypeRef::Enum(color)))
                    .field(FieldDescriptor::new("applied_at", TypeRef::Timestamp))
                    .build(),
            )
            .register(MessageSchema::empty("Nothing"))
            .build()
            .unwrap()
    }

    #[test]
    fn recursive_messages_terminate() {
        let reg = registry();
        let service = ServiceSchema::builder("Graph")
            .method(MethodDescriptor::new(
                "Touch",
                TypeRef::message("Node"),
                TypeRef::message("Node"),
            ))
            .build();

        let closure = TypeClosure::collect(&service, &reg).unwrap();
        assert_eq!(closure.messages.len(), 1);
        assert_eq!(closure.messages[0].name(), "Node");
    }

    #[test]
    fn well_known_flags_and_enums() {
        let reg = registry();
        let service = ServiceSchema::builder("Painter")
            .method(MethodDescriptor::new(
                "Apply",
                TypeRef::message("Paint"),
                TypeRef::message("Nothing"),
            ))
            .build();

        let closure = TypeClosure::collect(&service, &reg).unwrap();
        assert_eq!(closure.enums.len(), 1);
        assert_eq!(closure.enums[0].name(), "Color");
        assert!(closure.uses_timestamp);
        assert!(closure.uses_empty);
        assert!(!closure.uses_duration);
        assert!(!closure.uses_http);
    }

    #[test]
    fn empty_messages_are_not_declared() {
        let reg = registry();
        let service = ServiceSchema::builder("Null")
            .method(MethodDescriptor::new(
                "Ping",
                TypeRef::message("Nothing"),
                TypeRef::message("Nothing"),
            ))
            .build();

        let closure = TypeClosure::collect(&service, &reg).unwrap();
        assert!(closure.messages.is_empty());
        assert!(closure.uses_empty);
    }

    #[test]
    fn wire_reference_aborts_the_walk() {
        let reg = registry();
        let service = ServiceSchema::builder("Bad")
            .method(MethodDescriptor::new(
                "Leak",
                TypeRef::Wire("pb.Node".into()),
                TypeRef::message("Nothing"),
            ))
            .build();

        let err = TypeClosure::collect(&service, &reg).unwrap_err();
        assert_eq!(err, SchemaError::WireTypeReference("pb.Node".into()));
    }
}
