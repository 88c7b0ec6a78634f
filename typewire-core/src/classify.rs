//! Type classification: mapping declared [`TypeRef`]s onto wire categories.
//!
//! The classifier is a total function over the declared type alphabet. Every
//! outcome is either a [`WireCategory`] or a [`SchemaError`]; nothing is
//! guessed at conversion time. The walker, the emitter, and both converters
//! all route through this module so the three stay in agreement about what a
//! given declaration means on the wire.

use crate::error::SchemaError;
use crate::schema::{FieldDescriptor, SchemaRegistry, TypeRef};

/// Scalar wire types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    String,
    Int32,
    Bool,
    Bytes,
    Float,
}

impl Primitive {
    /// The schema keyword for this scalar.
    pub fn proto_name(&self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Int32 => "int32",
            Primitive::Bool => "bool",
            Primitive::Bytes => "bytes",
            Primitive::Float => "float",
        }
    }
}

/// How a declared type is represented on the wire.
#[derive(Clone, Debug, PartialEq)]
pub enum WireCategory {
    Primitive(Primitive),
    Enum,
    /// `google.protobuf.Timestamp`.
    TemporalInstant,
    /// `google.protobuf.Duration`.
    TemporalDuration,
    /// `google.protobuf.Empty`, either declared directly or a message with
    /// zero fields.
    WellKnownEmpty,
    Sequence,
    Mapping,
    /// A oneof group with two or more non-null alternatives.
    Union,
    Message,
}

/// Classify a declared type against the registry.
///
/// Unions are flattened and stripped of null before classification: a union
/// with a single remaining alternative classifies as that alternative, and
/// one with none is an error (callers supply message/field context).
pub fn classify(ty: &TypeRef, registry: &SchemaRegistry) -> Result<WireCategory, SchemaError> {
    match ty {
        TypeRef::String => Ok(WireCategory::Primitive(Primitive::String)),
        TypeRef::Int32 => Ok(WireCategory::Primitive(Primitive::Int32)),
        TypeRef::Bool => Ok(WireCategory::Primitive(Primitive::Bool)),
        TypeRef::Bytes => Ok(WireCategory::Primitive(Primitive::Bytes)),
        TypeRef::Float => Ok(WireCategory::Primitive(Primitive::Float)),
        TypeRef::Timestamp => Ok(WireCategory::TemporalInstant),
        TypeRef::Duration => Ok(WireCategory::TemporalDuration),
        TypeRef::Empty => Ok(WireCategory::WellKnownEmpty),
        TypeRef::Enum(_) => Ok(WireCategory::Enum),
        TypeRef::Message(name) => {
            let schema = registry.expect(name)?;
            if schema.is_empty() {
                Ok(WireCategory::WellKnownEmpty)
            } else {
                Ok(WireCategory::Message)
            }
        }
        TypeRef::List(_) => Ok(WireCategory::Sequence),
        TypeRef::Map(key, _) => {
            map_key_name(key)?;
            Ok(WireCategory::Mapping)
        }
        TypeRef::Union(alternatives) => {
            let alts = flatten_union(alternatives);
            match alts.len() {
                0 => Err(SchemaError::Unsupported(
                    "union with no non-null alternative".into(),
                )),
                1 => classify(&alts[0], registry),
                _ => Ok(WireCategory::Union),
            }
        }
        TypeRef::Null => Err(SchemaError::Unsupported(
            "null outside of a union".into(),
        )),
        TypeRef::Wire(name) => Err(SchemaError::WireTypeReference(name.clone())),
    }
}

/// Flatten nested unions and drop null alternatives, preserving declaration
/// order of the first occurrence of each alternative.
pub fn flatten_union(alternatives: &[TypeRef]) -> Vec<TypeRef> {
    let mut out: Vec<TypeRef> = Vec::new();
    for alt in alternatives {
        match alt {
            TypeRef::Null => {}
            TypeRef::Union(inner) => {
                for alt in flatten_union(inner) {
                    if !out.contains(&alt) {
                        out.push(alt);
                    }
                }
            }
            other => {
                if !out.contains(other) {
                    out.push(other.clone());
                }
            }
        }
    }
    out
}

/// Reduce a declared type to its effective type plus derived optionality.
///
/// `Union([T, Null])` normalizes to `(T, true)`; a union with several
/// non-null alternatives keeps its union shape but still reports whether a
/// null alternative was present. Anything else is `(ty, false)`.
pub fn normalize(ty: &TypeRef) -> (TypeRef, bool) {
    if let TypeRef::Union(alternatives) = ty {
        let has_null = union_has_null(alternatives);
        let alts = flatten_union(alternatives);
        return match alts.len() {
            1 => (alts.into_iter().next().unwrap(), has_null),
            _ => (TypeRef::Union(alts), has_null),
        };
    }
    (ty.clone(), false)
}

fn union_has_null(alternatives: &[TypeRef]) -> bool {
    alternatives.iter().any(|alt| match alt {
        TypeRef::Null => true,
        TypeRef::Union(inner) => union_has_null(inner),
        _ => false,
    })
}

/// Whether a field is effectively optional: declared so, or typed as a
/// union containing null.
pub fn field_is_optional(field: &FieldDescriptor) -> bool {
    if field.is_optional() {
        return true;
    }
    matches!(field.type_ref(), TypeRef::Union(alts) if union_has_null(alts))
}

fn map_key_name(key: &TypeRef) -> Result<&'static str, SchemaError> {
    match key {
        TypeRef::String => Ok("string"),
        TypeRef::Int32 => Ok("int32"),
        TypeRef::Bool => Ok("bool"),
        other => Err(SchemaError::InvalidMapKey(describe(other))),
    }
}

/// The schema type name of a declared type, e.g. `string`, `repeated Book`,
/// `map<string, int32>`, or `google.protobuf.Timestamp`.
///
/// Unions have no single type name; resolve them through
/// [`oneof_field_name`] instead.
pub fn proto_type_name(ty: &TypeRef, registry: &SchemaRegistry) -> Result<String, SchemaError> {
    match ty {
        TypeRef::String => Ok("string".into()),
        TypeRef::Int32 => Ok("int32".into()),
        TypeRef::Bool => Ok("bool".into()),
        TypeRef::Bytes => Ok("bytes".into()),
        TypeRef::Float => Ok("float".into()),
        TypeRef::Timestamp => Ok("google.protobuf.Timestamp".into()),
        TypeRef::Duration => Ok("google.protobuf.Duration".into()),
        TypeRef::Empty => Ok("google.protobuf.Empty".into()),
        TypeRef::Enum(schema) => Ok(schema.name().to_owned()),
        TypeRef::Message(name) => {
            let schema = registry.expect(name)?;
            if schema.is_empty() {
                Ok("google.protobuf.Empty".into())
            } else {
                Ok(name.clone())
            }
        }
        TypeRef::List(item) => {
            let inner = proto_type_name(item, registry)?;
            Ok(format!("repeated {inner}"))
        }
        TypeRef::Map(key, value) => {
            let key = map_key_name(key)?;
            let value = proto_type_name(value, registry)?;
            Ok(format!("map<{key}, {value}>"))
        }
        TypeRef::Union(alternatives) => {
            let alts = flatten_union(alternatives);
            match alts.len() {
                1 => proto_type_name(&alts[0], registry),
                _ => Err(SchemaError::Unsupported(
                    "a multi-alternative union has no single type name".into(),
                )),
            }
        }
        TypeRef::Null => Err(SchemaError::Unsupported("null outside of a union".into())),
        TypeRef::Wire(name) => Err(SchemaError::WireTypeReference(name.clone())),
    }
}

/// The synthetic field name of one oneof alternative: the declared field
/// name joined to the alternative's schema type name, dots replaced with
/// underscores. `value: string | int32` yields `value_string` and
/// `value_int32`.
pub fn oneof_field_name(field: &str, type_name: &str) -> String {
    format!("{field}_{}", type_name.replace('.', "_"))
}

/// Debug rendering of a type for error messages.
pub fn describe(ty: &TypeRef) -> String {
    match ty {
        TypeRef::String => "string".into(),
        TypeRef::Int32 => "int32".into(),
        TypeRef::Bool => "bool".into(),
        TypeRef::Bytes => "bytes".into(),
        TypeRef::Float => "float".into(),
        TypeRef::Timestamp => "timestamp".into(),
        TypeRef::Duration => "duration".into(),
        TypeRef::Empty => "empty".into(),
        TypeRef::Enum(schema) => format!("enum {}", schema.name()),
        TypeRef::Message(name) => format!("message {name}"),
        TypeRef::List(item) => format!("list<{}>", describe(item)),
        TypeRef::Map(key, value) => format!("map<{}, {}>", describe(key), describe(value)),
        TypeRef::Union(alts) => {
            let parts: Vec<String> = alts.iter().map(describe).collect();
            format!("union<{}>", parts.join(" | "))
        }
        TypeRef::Null => "null".into(),
        TypeRef::Wire(name) => format!("wire {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumSchema, FieldDescriptor, MessageSchema};

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builder()
            .register(
                MessageSchema::builder("Book")
                    .field(FieldDescriptor::new("title", TypeRef::String))
                    .build(),
            )
            .register(MessageSchema::empty("Nothing"))
            .build()
            .unwrap()
    }

    #[test]
    fn scalars_classify_as_primitives() {
        let reg = registry();
        assert_eq!(
            classify(&TypeRef::String, &reg).unwrap(),
            WireCategory::Primitive(Primitive::String)
        );
        assert_eq!(
            classify(&TypeRef::Float, &reg).unwrap(),
            WireCategory::Primitive(Primitive::Float)
        );
    }

    #[test]
    fn empty_message_classifies_as_well_known_empty() {
        let reg = registry();
        assert_eq!(
            classify(&TypeRef::message("Nothing"), &reg).unwrap(),
            WireCategory::WellKnownEmpty
        );
        assert_eq!(
            classify(&TypeRef::message("Book"), &reg).unwrap(),
            WireCategory::Message
        );
    }

    #[test]
    fn optional_union_classifies_as_inner() {
        let reg = registry();
        let ty = TypeRef::optional(TypeRef::Int32);
        assert_eq!(
            classify(&ty, &reg).unwrap(),
            WireCategory::Primitive(Primitive::Int32)
        );
        let (effective, optional) = normalize(&ty);
        assert_eq!(effective, TypeRef::Int32);
        assert!(optional);
    }

    #[test]
    fn multi_alternative_union_classifies_as_union() {
        let reg = registry();
        let ty = TypeRef::union([TypeRef::String, TypeRef::Int32, TypeRef::Null]);
        assert_eq!(classify(&ty, &reg).unwrap(), WireCategory::Union);
        let (effective, optional) = normalize(&ty);
        assert_eq!(effective, TypeRef::union([TypeRef::String, TypeRef::Int32]));
        assert!(optional);
    }

    #[test]
    fn nested_unions_flatten_in_order() {
        let alts = [
            TypeRef::union([TypeRef::String, TypeRef::Null]),
            TypeRef::Int32,
            TypeRef::String,
        ];
        assert_eq!(flatten_union(&alts), vec![TypeRef::String, TypeRef::Int32]);
    }

    #[test]
    fn all_null_union_is_rejected() {
        let reg = registry();
        let err = classify(&TypeRef::union([TypeRef::Null]), &reg).unwrap_err();
        assert!(matches!(err, SchemaError::Unsupported(_)));
    }

    #[test]
    fn wire_type_reference_is_rejected() {
        let reg = registry();
        let err = classify(&TypeRef::Wire("pb.Book".into()), &reg).unwrap_err();
        assert_eq!(err, SchemaError::WireTypeReference("pb.Book".into()));
    }

    #[test]
    fn unknown_message_is_rejected() {
        let reg = registry();
        let err = classify(&TypeRef::message("Ghost"), &reg).unwrap_err();
        assert_eq!(err, SchemaError::UnknownMessage("Ghost".into()));
    }

    #[test]
    fn proto_type_names() {
        let reg = registry();
        assert_eq!(proto_type_name(&TypeRef::String, &reg).unwrap(), "string");
        assert_eq!(
            proto_type_name(&TypeRef::Timestamp, &reg).unwrap(),
            "google.protobuf.Timestamp"
        );
        assert_eq!(
            proto_type_name(&TypeRef::list(TypeRef::message("Book")), &reg).unwrap(),
            "repeated Book"
        );
        assert_eq!(
            proto_type_name(&TypeRef::map(TypeRef::String, TypeRef::Int32), &reg).unwrap(),
            "map<string, int32>"
        );
        assert_eq!(
            proto_type_name(&TypeRef::message("Nothing"), &reg).unwrap(),
            "google.protobuf.Empty"
        );
    }

    #[test]
    fn float_map_key_is_rejected() {
        let reg = registry();
        let err =
            proto_type_name(&TypeRef::map(TypeRef::Float, TypeRef::String), &reg).unwrap_err();
        assert_eq!(err, SchemaError::InvalidMapKey("float".into()));
    }

    #[test]
    fn oneof_names_replace_dots() {
        assert_eq!(oneof_field_name("value", "string"), "value_string");
        assert_eq!(
            oneof_field_name("when", "google.protobuf.Timestamp"),
            "when_google_protobuf_Timestamp"
        );
    }
}
