//! Schema text emission.
//!
//! [`emit_schema`] renders a [`ServiceSchema`] plus its type closure into
//! proto3 source text. Output is fully deterministic: imports come in a
//! fixed order, messages and enums in first-seen walk order, and field
//! numbers from declaration order. Emitting the same schemas twice yields
//! byte-identical text.

use std::fmt::Write;

use crate::classify::{flatten_union, oneof_field_name, proto_type_name};
use crate::error::SchemaError;
use crate::schema::{
    FieldDescriptor, HttpRule, MessageSchema, MethodDescriptor, SchemaRegistry, ServiceSchema,
    TypeRef,
};
use crate::walk::TypeClosure;

const INDENT: &str = "  ";

/// Docs produced by tooling rather than the author are dropped.
const BOILERPLATE_DOC_PREFIX: &str = "Usage docs:";

/// Render the full schema text for a service.
pub fn emit_schema(
    service: &ServiceSchema,
    registry: &SchemaRegistry,
) -> Result<String, SchemaError> {
    let closure = TypeClosure::collect(service, registry)?;

    let mut out = String::new();
    out.push_str("syntax = \"proto3\";\n\n");
    writeln!(out, "package {};", service.package_name()).expect("write to string");
    out.push('\n');

    let mut imports = Vec::new();
    if closure.uses_timestamp {
        imports.push("import \"google/protobuf/timestamp.proto\";");
    }
    if closure.uses_duration {
        imports.push("import \"google/protobuf/duration.proto\";");
    }
    if closure.uses_empty {
        imports.push("import \"google/protobuf/empty.proto\";");
    }
    if closure.uses_http {
        imports.push("import \"google/api/annotations.proto\";");
    }
    if !imports.is_empty() {
        for import in imports {
            out.push_str(import);
            out.push('\n');
        }
        out.push('\n');
    }

    if let Some(doc) = service.doc_text() {
        push_doc_lines(&mut out, doc, "");
    }
    writeln!(out, "service {} {{", service.name()).expect("write to string");
    for method in service.methods() {
        emit_method(&mut out, method, registry)?;
    }
    out.push_str("}\n");

    for message in &closure.messages {
        out.push('\n');
        emit_message(&mut out, message, registry)?;
    }

    for enum_schema in &closure.enums {
        out.push('\n');
        if let Some(doc) = enum_schema.doc_text() {
            push_doc_lines(&mut out, doc, "");
        }
        writeln!(out, "enum {} {{", enum_schema.name()).expect("write to string");
        for (member, number) in enum_schema.members() {
            writeln!(out, "{INDENT}{member} = {number};").expect("write to string");
        }
        out.push_str("}\n");
    }

    Ok(out)
}

fn emit_method(
    out: &mut String,
    method: &MethodDescriptor,
    registry: &SchemaRegistry,
) -> Result<(), SchemaError> {
    if let Some(doc) = method.doc_text() {
        push_doc_lines(out, doc, INDENT);
    }

    let request = proto_type_name(method.request(), registry)?;
    let response = proto_type_name(method.response(), registry)?;
    let request = if method.is_client_streaming() {
        format!("stream {request}")
    } else {
        request
    };
    let response = if method.is_server_streaming() {
        format!("stream {response}")
    } else {
        response
    };

    let signature = format!("{INDENT}rpc {} ({request}) returns ({response})", method.name());

    if method.http_rule().is_none() && method.options().is_empty() {
        out.push_str(&signature);
        out.push_str(";\n");
        return Ok(());
    }

    out.push_str(&signature);
    out.push_str(" {\n");
    if let Some(rule) = method.http_rule() {
        emit_http_option(out, rule);
    }
    for (key, value) in method.options() {
        writeln!(out, "{INDENT}{INDENT}option {key} = {value};").expect("write to string");
    }
    writeln!(out, "{INDENT}}}").expect("write to string");
    Ok(())
}

fn emit_http_option(out: &mut String, rule: &HttpRule) {
    let base = format!("{INDENT}{INDENT}");
    writeln!(out, "{base}option (google.api.http) = {{").expect("write to string");
    writeln!(
        out,
        "{base}{INDENT}{}: \"{}\"",
        rule.http_method().as_str(),
        rule.path()
    )
    .expect("write to string");
    if let Some(body) = rule.body_selector() {
        writeln!(out, "{base}{INDENT}body: \"{body}\"").expect("write to string");
    }
    for (method, path) in rule.bindings() {
        writeln!(out, "{base}{INDENT}additional_bindings {{").expect("write to string");
        writeln!(out, "{base}{INDENT}{INDENT}{}: \"{path}\"", method.as_str())
            .expect("write to string");
        writeln!(out, "{base}{INDENT}}}").expect("write to string");
    }
    writeln!(out, "{base}}};").expect("write to string");
}

fn emit_message(
    out: &mut String,
    message: &MessageSchema,
    registry: &SchemaRegistry,
) -> Result<(), SchemaError> {
    if let Some(doc) = message.doc_text() {
        push_doc_lines(out, doc, "");
    }
    writeln!(out, "message {} {{", message.name()).expect("write to string");

    // Field numbers are assigned here, never stored: 1-based, one per
    // field or per oneof alternative, shared across the whole message.
    let mut number = 1u32;
    for field in message.fields() {
        number = emit_field(out, message, field, number, registry)?;
    }

    out.push_str("}\n");
    Ok(())
}

fn emit_field(
    out: &mut String,
    message: &MessageSchema,
    field: &FieldDescriptor,
    mut number: u32,
    registry: &SchemaRegistry,
) -> Result<u32, SchemaError> {
    let (effective, mut optional) = crate::classify::normalize(field.type_ref());
    optional |= field.is_optional();

    if let Some(doc) = field.doc_text() {
        push_doc_lines(out, doc, INDENT);
    }
    if !field.constraints().is_empty() {
        writeln!(out, "{INDENT}// Constraint:").expect("write to string");
        for constraint in field.constraints() {
            writeln!(out, "{INDENT}//   {}", constraint.describe()).expect("write to string");
        }
    }

    if let TypeRef::Union(alternatives) = &effective {
        let alts = flatten_union(alternatives);
        if alts.is_empty() {
            return Err(SchemaError::EmptyUnion {
                message: message.name().to_owned(),
                field: field.name().to_owned(),
            });
        }
        writeln!(out, "{INDENT}oneof {} {{", field.name()).expect("write to string");
        for alt in &alts {
            if matches!(alt, TypeRef::List(_) | TypeRef::Map(..)) {
                return Err(SchemaError::InvalidUnionAlternative {
                    message: message.name().to_owned(),
                    field: field.name().to_owned(),
                    alternative: crate::classify::describe(alt),
                });
            }
            let type_name = proto_type_name(alt, registry)?;
            let alias = oneof_field_name(field.name(), &type_name);
            writeln!(out, "{INDENT}{INDENT}{type_name} {alias} = {number};")
                .expect("write to string");
            number += 1;
        }
        writeln!(out, "{INDENT}}}").expect("write to string");
        return Ok(number);
    }

    // Repeated and map fields take no `optional` marker.
    if matches!(effective, TypeRef::List(_) | TypeRef::Map(..)) {
        optional = false;
    }

    let type_name = proto_type_name(&effective, registry)?;
    let marker = if optional { "optional " } else { "" };
    writeln!(out, "{INDENT}{marker}{type_name} {} = {number};", field.name())
        .expect("write to string");
    Ok(number + 1)
}

fn push_doc_lines(out: &mut String, doc: &str, indent: &str) {
    if doc.starts_with(BOILERPLATE_DOC_PREFIX) {
        return;
    }
    for line in doc.split('\n') {
        if line.is_empty() {
            writeln!(out, "{indent}//").expect("write to string");
        } else {
            writeln!(out, "{indent}// {line}").expect("write to string");
        }
    }
}
