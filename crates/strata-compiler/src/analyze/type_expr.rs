//! Type expression compilation.
//!
//! Resolves a type expression's name and applies the generic builtin rules:
//! `List` takes one element type, `Inline` takes one fixed-width struct, and
//! `InlineList` takes an element type plus a length. Everything else must
//! resolve to a parameterless type.

use crate::ast::{DeclKind, TypeArg, TypeExpression};
use crate::compile::{FileCompiler, Readiness};
use crate::outcome::Outcome;
use crate::schema::{DescBody, DescId, PrimitiveType, Type};

use super::resolve;

/// What a type expression's head resolved to.
#[derive(Clone, Copy)]
enum Head {
    List,
    Inline,
    InlineList,
    Primitive(PrimitiveType),
    Id,
    Decl(DeclKind),
}

pub(crate) fn compile_type(
    fc: &mut FileCompiler,
    scope: DescId,
    expr: &TypeExpression,
) -> Outcome<Type> {
    resolve::lookup(fc, scope, &expr.name).and_then(|id| apply_head(fc, scope, id, expr))
}

fn apply_head(
    fc: &mut FileCompiler,
    scope: DescId,
    id: DescId,
    expr: &TypeExpression,
) -> Outcome<Type> {
    let head = match &fc.pool.entry(id).body {
        DescBody::BuiltinList => Head::List,
        DescBody::BuiltinInline => Head::Inline,
        DescBody::BuiltinInlineList => Head::InlineList,
        DescBody::BuiltinType(primitive) => Head::Primitive(*primitive),
        DescBody::BuiltinId => Head::Id,
        _ => Head::Decl(fc.pool.entry(id).kind.expect("non-builtin entries carry a kind")),
    };
    let leaf = expr.name.leaf().to_string();
    let pos = expr.name.pos().clone();

    match head {
        Head::List => {
            let [TypeArg::Type(inner)] = expr.params.as_slice() else {
                return Outcome::error(
                    pos,
                    format!("'{}' requires exactly one type parameter.", leaf),
                );
            };
            compile_type(fc, scope, inner).and_then(|element| {
                if matches!(element, Type::InlineStruct(_)) {
                    Outcome::error(
                        pos,
                        "Don't declare list elements 'Inline'.  The list will inline \
                         its elements automatically.",
                    )
                } else {
                    Outcome::succeed(Type::List(Box::new(element)))
                }
            })
        }
        Head::Inline => {
            let [TypeArg::Type(inner)] = expr.params.as_slice() else {
                return Outcome::error(
                    pos,
                    format!("'{}' requires exactly one type parameter.", leaf),
                );
            };
            compile_type(fc, scope, inner).and_then(|element| match element {
                Type::Struct(target) => require_fixed(
                    fc,
                    target,
                    expr,
                    "'Inline' may only be applied to fixed-width structs.",
                )
                .map(|()| Type::InlineStruct(target)),
                _ => Outcome::error(pos, "'Inline' parameter must be a struct."),
            })
        }
        Head::InlineList => {
            let (inner, size) = match expr.params.as_slice() {
                [TypeArg::Type(inner), TypeArg::Size(size)] => (inner, size),
                _ => {
                    return Outcome::error(
                        pos,
                        format!(
                            "'{}' requires exactly two parameters: an element type and a size.",
                            leaf
                        ),
                    );
                }
            };
            if size.value > u32::MAX as u64 {
                return Outcome::error(size.pos.clone(), "Inline list size is too large.");
            }
            let count = size.value as u32;
            compile_type(fc, scope, inner).and_then(|element| match element {
                Type::InlineStruct(_) => Outcome::error(
                    pos,
                    "Don't declare list elements 'Inline'.  The list will inline \
                     its elements automatically.",
                ),
                Type::InlineList(..) => {
                    Outcome::error(pos, "Inline lists can't contain other inline lists.")
                }
                // Struct elements are stored inline, so they must be fixed.
                Type::Struct(target) => require_fixed(
                    fc,
                    target,
                    expr,
                    "Inline list elements must be fixed-width structs.",
                )
                .map(|()| Type::InlineList(Box::new(Type::InlineStruct(target)), count)),
                element => Outcome::succeed(Type::InlineList(Box::new(element), count)),
            })
        }
        Head::Primitive(primitive) => {
            no_params(expr, &leaf).map(|()| Type::from_primitive(primitive))
        }
        Head::Id => Outcome::error(pos, format!("'{}' is not a type.", leaf)),
        Head::Decl(kind) => no_params(expr, &leaf).and_then(|()| match kind {
            DeclKind::Enum => Outcome::succeed(Type::Enum(id)),
            DeclKind::Struct => Outcome::succeed(Type::Struct(id)),
            DeclKind::Interface => Outcome::succeed(Type::Interface(id)),
            _ => Outcome::error(pos, format!("'{}' is not a type.", leaf)),
        }),
    }
}

fn no_params(expr: &TypeExpression, leaf: &str) -> Outcome<()> {
    if expr.params.is_empty() {
        Outcome::succeed(())
    } else {
        Outcome::error(
            expr.name.pos().clone(),
            format!("'{}' doesn't take parameters.", leaf),
        )
    }
}

/// Inlined storage requires a struct declared fixed-width; compiling the
/// target first also makes its layout available to the packer.
fn require_fixed(
    fc: &mut FileCompiler,
    target: DescId,
    expr: &TypeExpression,
    not_fixed: &str,
) -> Outcome<()> {
    let pos = expr.name.pos().clone();
    match fc.ensure_compiled(target) {
        Readiness::Ready => match &fc.pool.entry(target).body {
            DescBody::Struct(body) if body.fixed.is_some() => Outcome::succeed(()),
            _ => Outcome::error(pos, not_fixed),
        },
        Readiness::Cycle => {
            let name = fc.pool.entry(target).name.clone();
            Outcome::error(pos, format!("'{}' depends on itself.", name))
        }
        Readiness::Failed => {
            let name = fc.pool.entry(target).name.clone();
            Outcome::error(pos, format!("'{}' is not defined.", name))
        }
    }
}
