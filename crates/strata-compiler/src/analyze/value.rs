//! Type-driven literal value compilation.
//!
//! Coerces a literal AST value into a typed [`Value`] for an expected type.
//! Every diagnostic lands at the literal's position. Struct literals resolve
//! field names through the struct's member map, union assignments pick one
//! variant, and duplicate or same-union assignments are diagnosed after all
//! pairs have been compiled.

use indexmap::IndexMap;

use crate::ast::{DeclKind, LiteralValue, Located};
use crate::compile::FileCompiler;
use crate::diagnostics::{Diagnostics, SourcePos};
use crate::outcome::Outcome;
use crate::schema::{DescBody, DescId, Type, Value};

pub(crate) fn compile_value(
    fc: &mut FileCompiler,
    ty: &Type,
    literal: &Located<LiteralValue>,
) -> Outcome<Value> {
    let pos = literal.pos.clone();
    match ty {
        Type::Void => match literal.value {
            LiteralValue::Void => Outcome::succeed(Value::Void),
            _ => Outcome::error(pos, "Void fields cannot have values."),
        },
        Type::Bool => match literal.value {
            LiteralValue::Bool(value) => Outcome::succeed(Value::Bool(value)),
            _ => Outcome::expected(pos, "boolean"),
        },
        Type::Int8 => int_value(literal, i8::MIN as i128, i8::MAX as i128, |i| {
            Value::Int8(i as i8)
        }),
        Type::Int16 => int_value(literal, i16::MIN as i128, i16::MAX as i128, |i| {
            Value::Int16(i as i16)
        }),
        Type::Int32 => int_value(literal, i32::MIN as i128, i32::MAX as i128, |i| {
            Value::Int32(i as i32)
        }),
        Type::Int64 => int_value(literal, i64::MIN as i128, i64::MAX as i128, |i| {
            Value::Int64(i as i64)
        }),
        Type::UInt8 => int_value(literal, 0, u8::MAX as i128, |i| Value::UInt8(i as u8)),
        Type::UInt16 => int_value(literal, 0, u16::MAX as i128, |i| Value::UInt16(i as u16)),
        Type::UInt32 => int_value(literal, 0, u32::MAX as i128, |i| Value::UInt32(i as u32)),
        Type::UInt64 => int_value(literal, 0, u64::MAX as i128, |i| Value::UInt64(i as u64)),
        Type::Float32 => float_value(literal).map(|f| Value::Float32(f as f32)),
        Type::Float64 => float_value(literal).map(Value::Float64),
        Type::Text => match &literal.value {
            LiteralValue::String(text) => Outcome::succeed(Value::Text(text.clone())),
            _ => Outcome::expected(pos, "string"),
        },
        Type::Data => match &literal.value {
            // Bytes are the string's code units, truncated to octets.
            LiteralValue::String(text) => {
                Outcome::succeed(Value::Data(text.chars().map(|c| c as u8).collect()))
            }
            _ => Outcome::expected(pos, "string"),
        },
        Type::Enum(enum_id) => match &literal.value {
            LiteralValue::Identifier(name) => enum_value(fc, *enum_id, name, pos),
            _ => Outcome::expected(pos, "enumerant name"),
        },
        Type::Struct(struct_id) | Type::InlineStruct(struct_id) => match &literal.value {
            LiteralValue::Record(pairs) => struct_value(fc, *struct_id, pairs, pos),
            _ => Outcome::expected(pos, "parenthesized list of field assignments"),
        },
        Type::List(element) => match &literal.value {
            LiteralValue::List(items) => list_value(fc, element, items),
            _ => Outcome::expected(pos, "list"),
        },
        Type::InlineList(element, count) => match &literal.value {
            LiteralValue::List(items) => {
                if items.len() as u64 != *count as u64 {
                    return Outcome::error(
                        pos,
                        format!(
                            "Wrong number of elements: inline list has a fixed size of {}.",
                            count
                        ),
                    );
                }
                list_value(fc, element, items)
            }
            _ => Outcome::expected(pos, "list"),
        },
        Type::Interface(_) => Outcome::error(pos, "Interfaces can't have default values."),
    }
}

fn int_value(
    literal: &Located<LiteralValue>,
    min: i128,
    max: i128,
    wrap: impl FnOnce(i128) -> Value,
) -> Outcome<Value> {
    match literal.value {
        LiteralValue::Int(value) => {
            if (min..=max).contains(&value) {
                Outcome::succeed(wrap(value))
            } else {
                Outcome::error(literal.pos.clone(), "Integer value out of range.")
            }
        }
        _ => Outcome::expected(literal.pos.clone(), "integer"),
    }
}

fn float_value(literal: &Located<LiteralValue>) -> Outcome<f64> {
    match &literal.value {
        LiteralValue::Int(value) => Outcome::succeed(*value as f64),
        LiteralValue::Float(value) => Outcome::succeed(*value),
        LiteralValue::Identifier(name) if name == "inf" => Outcome::succeed(f64::INFINITY),
        LiteralValue::Identifier(name) if name == "nan" => Outcome::succeed(f64::NAN),
        _ => Outcome::expected(literal.pos.clone(), "number"),
    }
}

fn list_value(
    fc: &mut FileCompiler,
    element: &Type,
    items: &[Located<LiteralValue>],
) -> Outcome<Value> {
    let compiled: Vec<Outcome<Value>> = items
        .iter()
        .map(|item| compile_value(fc, element, item))
        .collect();
    Outcome::do_all(compiled).map(Value::List)
}

fn enum_value(fc: &mut FileCompiler, enum_id: DescId, name: &str, pos: SourcePos) -> Outcome<Value> {
    fc.ensure_compiled(enum_id);
    match fc.pool.entry(enum_id).members.get(name).copied() {
        Some(id) if fc.pool.entry(id).kind == Some(DeclKind::Enumerant) => {
            Outcome::succeed(Value::Enum(id))
        }
        _ => {
            let enum_name = fc.pool.entry(enum_id).name.clone();
            Outcome::error(
                pos,
                format!("'{}' is not a member of enum '{}'.", name, enum_name),
            )
        }
    }
}

fn struct_value(
    fc: &mut FileCompiler,
    struct_id: DescId,
    pairs: &[(Located<String>, Located<LiteralValue>)],
    pos: SourcePos,
) -> Outcome<Value> {
    // A cycle here means the literal sits inside this struct's own
    // compilation; field types are filled before defaults compile, so the
    // member reads below stay valid.
    fc.ensure_compiled(struct_id);
    let struct_name = fc.pool.entry(struct_id).name.clone();

    let mut errors = Diagnostics::new();
    let mut assignments: Vec<(DescId, Value)> = Vec::new();
    // (field, display name, owning union) for the duplicate scans
    let mut assigned: Vec<(DescId, String, Option<DescId>)> = Vec::new();

    for (name, value) in pairs {
        let Some(member) = fc.pool.entry(struct_id).members.get(&name.value).copied() else {
            errors.report(
                name.pos.clone(),
                format!("'{}' is not a field of '{}'.", name.value, struct_name),
            );
            continue;
        };
        match fc.pool.entry(member).kind {
            Some(DeclKind::Field) => {
                compile_assignment(fc, member, &name.value, value, &mut errors, &mut assignments, &mut assigned);
            }
            Some(DeclKind::Union) => {
                let LiteralValue::Union(variant, inner) = &value.value else {
                    errors.expect(value.pos.clone(), "union value");
                    continue;
                };
                let union_name = fc.pool.entry(member).name.clone();
                let Some(field) = fc.pool.entry(member).members.get(&variant.value).copied()
                else {
                    errors.report(
                        variant.pos.clone(),
                        format!(
                            "'{}' is not a member of union '{}'.",
                            variant.value, union_name
                        ),
                    );
                    continue;
                };
                compile_assignment(fc, field, &variant.value, inner, &mut errors, &mut assignments, &mut assigned);
            }
            _ => errors.report(
                name.pos.clone(),
                format!("'{}' is not a field of '{}'.", name.value, struct_name),
            ),
        }
    }

    report_duplicates(&assigned, &pos, fc, &mut errors);
    Outcome::with_errors(Value::Struct(assignments), errors)
}

fn compile_assignment(
    fc: &mut FileCompiler,
    field: DescId,
    display: &str,
    value: &Located<LiteralValue>,
    errors: &mut Diagnostics,
    assignments: &mut Vec<(DescId, Value)>,
    assigned: &mut Vec<(DescId, String, Option<DescId>)>,
) {
    let field_info = match &fc.pool.entry(field).body {
        DescBody::Field(body) => Some((body.ty.clone(), body.union.map(|(union, _)| union))),
        _ => None,
    };
    let Some((ty, union)) = field_info else {
        errors.report(
            value.pos.clone(),
            format!("'{}' depends on itself.", display),
        );
        return;
    };
    assigned.push((field, display.to_string(), union));
    match compile_value(fc, &ty, value) {
        Outcome::Active(compiled, more) => {
            errors.extend(more);
            assignments.push((field, compiled));
        }
        Outcome::Failed(more) => errors.extend(more),
    }
}

/// Diagnose duplicate assignments and multiple assignments to fields of the
/// same union, both at the literal's position.
fn report_duplicates(
    assigned: &[(DescId, String, Option<DescId>)],
    pos: &SourcePos,
    fc: &FileCompiler,
    errors: &mut Diagnostics,
) {
    let mut per_field: IndexMap<DescId, (String, usize)> = IndexMap::new();
    for (field, name, _) in assigned {
        let slot = per_field.entry(*field).or_insert_with(|| (name.clone(), 0));
        slot.1 += 1;
    }
    let repeated: Vec<&str> = per_field
        .values()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.as_str())
        .collect();
    if !repeated.is_empty() {
        errors.report(
            pos.clone(),
            format!("Fields assigned multiple times: {}.", repeated.join(", ")),
        );
    }

    // distinct fields only; plain repeats are reported above
    let mut per_union: IndexMap<DescId, Vec<(DescId, &str)>> = IndexMap::new();
    for (field, name, union) in assigned {
        if let Some(union) = union {
            let members = per_union.entry(*union).or_default();
            if !members.iter().any(|(seen, _)| seen == field) {
                members.push((*field, name.as_str()));
            }
        }
    }
    for (union, members) in per_union {
        if members.len() > 1 {
            let union_name = fc.pool.entry(union).name.clone();
            let names: Vec<&str> = members.iter().map(|(_, name)| *name).collect();
            errors.report(
                pos.clone(),
                format!(
                    "Value assigns multiple fields belonging to the same union '{}': {}",
                    union_name,
                    names.join(", ")
                ),
            );
        }
    }
}
