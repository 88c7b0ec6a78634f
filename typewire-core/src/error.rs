//! Error taxonomy for schema generation and value conversion.
//!
//! Two families with very different lifetimes:
//! - [`SchemaError`]: an unsupported or ambiguous type reference found while
//!   walking or emitting a schema. Always fatal to that generation pass and
//!   surfaced before any handler is registered.
//! - [`ValidationError`] / [`DecodeError`] / [`EncodeError`]: per-call
//!   conversion failures, contained to the call that produced them.

use thiserror::Error;

/// A schema cannot be derived from the declared types.
///
/// Schema errors abort the whole generation pass; they are never retried.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SchemaError {
    /// A field or method references a message name that was never registered.
    #[error("unknown message type `{0}`")]
    UnknownMessage(String),

    /// Two message schemas with the same name were registered.
    #[error("duplicate message type `{0}`")]
    DuplicateMessage(String),

    /// An enum declares the same member number twice.
    #[error("enum `{name}` declares member number {number} more than once")]
    DuplicateEnumMember { name: String, number: i32 },

    /// An enum declares the same member name twice.
    #[error("enum `{name}` declares member `{member}` more than once")]
    DuplicateEnumName { name: String, member: String },

    /// A union field has no alternative left once null is removed.
    #[error("field `{field}` of `{message}`: union has no resolvable alternative")]
    EmptyUnion { message: String, field: String },

    /// A union alternative cannot be represented as a oneof entry
    /// (repeated and map types are not permitted inside a oneof).
    #[error("field `{field}` of `{message}`: `{alternative}` is not a valid union alternative")]
    InvalidUnionAlternative {
        message: String,
        field: String,
        alternative: String,
    },

    /// A compiler-generated wire-binding type was referenced directly.
    ///
    /// Only native message declarations may appear in a schema; passing a
    /// wire type through would encode it twice.
    #[error("wire-binding type `{0}` referenced directly; declare a native message instead")]
    WireTypeReference(String),

    /// A map key type other than string, int32, or bool.
    #[error("map key type `{0}` is not supported (use string, int32, or bool)")]
    InvalidMapKey(String),

    /// Anything else the classifier refuses to guess about.
    #[error("type `{0}` is not supported in a schema")]
    Unsupported(String),
}

/// Inbound conversion produced values that violate the message's declared
/// invariants. Surfaced to callers as an invalid-argument signal.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required field is absent from the wire value.
    #[error("missing required field `{0}`")]
    MissingField(String),

    /// The wire value does not have the declared shape.
    #[error("field `{field}`: expected {expected}, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// A wire integer is not a declared member of the enum.
    #[error("field `{field}`: {number} is not a member of enum `{name}`")]
    UnknownEnumMember {
        field: String,
        name: String,
        number: i32,
    },

    /// A declared numeric or length constraint does not hold.
    #[error("field `{field}`: must be {requirement}")]
    Constraint { field: String, requirement: String },

    /// A wire value that cannot be represented natively, e.g. a negative
    /// duration or an out-of-range timestamp.
    #[error("field `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },

    /// The message-level validator hook rejected the assembled record.
    #[error("{0}")]
    Invalid(String),
}

/// Failure while converting a wire value into a native record.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failure while converting a native record into a wire value.
///
/// Serializer hook failures are deliberately *not* represented here: a hook
/// that fails is logged and its field falls back to the raw value.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EncodeError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A union-typed field holds a value that matches none of the declared
    /// alternatives.
    #[error("field `{field}`: value of kind {kind} matches no union alternative")]
    UnionMismatch { field: String, kind: String },

    /// The native value does not fit the declared field type.
    #[error("field `{field}`: {reason}")]
    InvalidValue { field: String, reason: String },
}
