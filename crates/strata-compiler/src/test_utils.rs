//! Helpers for building schema ASTs by hand in tests.

use crate::ast::{
    AnnotationApplication, AnnotationDecl, ConstantDecl, DeclKind, Declaration, EnumDecl,
    EnumerantDecl, FieldDecl, FixedSpec, InterfaceDecl, LiteralValue, Located, MethodDecl, Name,
    ParamDecl, ParsedFile, StructDecl, TypeArg, TypeExpression, UnionDecl, UsingDecl,
};
use crate::compile;
use crate::diagnostics::{Diagnostics, SourcePos};
use crate::outcome::Outcome;
use crate::schema::{DescId, SchemaPool};

pub fn pos(line: u32) -> SourcePos {
    SourcePos::new("test.strata", line, 1)
}

pub fn loc<T>(line: u32, value: T) -> Located<T> {
    Located::new(pos(line), value)
}

pub fn rel(line: u32, name: &str) -> Name {
    Name::Relative(loc(line, name.to_string()))
}

pub fn absolute(line: u32, name: &str) -> Name {
    Name::Absolute(loc(line, name.to_string()))
}

pub fn import(line: u32, name: &str) -> Name {
    Name::Import(loc(line, name.to_string()))
}

pub fn path(parent: Name, line: u32, leaf: &str) -> Name {
    Name::Member(Box::new(parent), loc(line, leaf.to_string()))
}

pub fn ty(line: u32, name: &str) -> TypeExpression {
    TypeExpression {
        name: rel(line, name),
        params: Vec::new(),
        pos: pos(line),
    }
}

pub fn ty_named(name: Name, line: u32) -> TypeExpression {
    TypeExpression {
        name,
        params: Vec::new(),
        pos: pos(line),
    }
}

pub fn generic(line: u32, name: &str, params: Vec<TypeArg>) -> TypeExpression {
    TypeExpression {
        name: rel(line, name),
        params,
        pos: pos(line),
    }
}

pub fn targ(expr: TypeExpression) -> TypeArg {
    TypeArg::Type(expr)
}

pub fn tsize(line: u32, size: u64) -> TypeArg {
    TypeArg::Size(loc(line, size))
}

pub fn vvoid(line: u32) -> Located<LiteralValue> {
    loc(line, LiteralValue::Void)
}

pub fn vbool(line: u32, value: bool) -> Located<LiteralValue> {
    loc(line, LiteralValue::Bool(value))
}

pub fn vint(line: u32, value: i128) -> Located<LiteralValue> {
    loc(line, LiteralValue::Int(value))
}

pub fn vfloat(line: u32, value: f64) -> Located<LiteralValue> {
    loc(line, LiteralValue::Float(value))
}

pub fn vstr(line: u32, value: &str) -> Located<LiteralValue> {
    loc(line, LiteralValue::String(value.to_string()))
}

pub fn vident(line: u32, value: &str) -> Located<LiteralValue> {
    loc(line, LiteralValue::Identifier(value.to_string()))
}

pub fn vlist(line: u32, items: Vec<Located<LiteralValue>>) -> Located<LiteralValue> {
    loc(line, LiteralValue::List(items))
}

pub fn vrecord(line: u32, pairs: Vec<(&str, Located<LiteralValue>)>) -> Located<LiteralValue> {
    loc(
        line,
        LiteralValue::Record(
            pairs
                .into_iter()
                .map(|(name, value)| (loc(line, name.to_string()), value))
                .collect(),
        ),
    )
}

pub fn vunion(line: u32, member: &str, inner: Located<LiteralValue>) -> Located<LiteralValue> {
    loc(
        line,
        LiteralValue::Union(loc(line, member.to_string()), Box::new(inner)),
    )
}

pub fn ann(line: u32, name: &str, value: Located<LiteralValue>) -> AnnotationApplication {
    AnnotationApplication {
        name: rel(line, name),
        value,
        pos: pos(line),
    }
}

pub fn field(line: u32, name: &str, number: u32, ty: TypeExpression) -> Declaration {
    Declaration::Field(FieldDecl {
        name: loc(line, name.to_string()),
        number: loc(line, number),
        ty,
        annotations: Vec::new(),
        default: None,
    })
}

pub fn field_with_default(
    line: u32,
    name: &str,
    number: u32,
    ty: TypeExpression,
    default: Located<LiteralValue>,
) -> Declaration {
    Declaration::Field(FieldDecl {
        name: loc(line, name.to_string()),
        number: loc(line, number),
        ty,
        annotations: Vec::new(),
        default: Some(default),
    })
}

pub fn strukt(line: u32, name: &str, body: Vec<Declaration>) -> Declaration {
    Declaration::Struct(StructDecl {
        name: loc(line, name.to_string()),
        fixed: None,
        annotations: Vec::new(),
        body,
    })
}

pub fn strukt_fixed(
    line: u32,
    name: &str,
    data_bits: u64,
    pointers: u32,
    body: Vec<Declaration>,
) -> Declaration {
    Declaration::Struct(StructDecl {
        name: loc(line, name.to_string()),
        fixed: Some(loc(line, FixedSpec { data_bits, pointers })),
        annotations: Vec::new(),
        body,
    })
}

pub fn union_decl(line: u32, name: &str, number: u32, body: Vec<Declaration>) -> Declaration {
    Declaration::Union(UnionDecl {
        name: loc(line, name.to_string()),
        number: loc(line, number),
        annotations: Vec::new(),
        body,
    })
}

pub fn enum_decl(line: u32, name: &str, body: Vec<Declaration>) -> Declaration {
    Declaration::Enum(EnumDecl {
        name: loc(line, name.to_string()),
        annotations: Vec::new(),
        body,
    })
}

pub fn enumerant(line: u32, name: &str, number: u32) -> Declaration {
    Declaration::Enumerant(EnumerantDecl {
        name: loc(line, name.to_string()),
        number: loc(line, number),
        annotations: Vec::new(),
    })
}

pub fn constant(
    line: u32,
    name: &str,
    ty: TypeExpression,
    value: Located<LiteralValue>,
) -> Declaration {
    Declaration::Constant(ConstantDecl {
        name: loc(line, name.to_string()),
        ty,
        value,
        annotations: Vec::new(),
    })
}

pub fn using(line: u32, name: &str, target: Name) -> Declaration {
    Declaration::Using(UsingDecl {
        name: loc(line, name.to_string()),
        target,
    })
}

pub fn iface(line: u32, name: &str, body: Vec<Declaration>) -> Declaration {
    Declaration::Interface(InterfaceDecl {
        name: loc(line, name.to_string()),
        annotations: Vec::new(),
        body,
    })
}

pub fn method(
    line: u32,
    name: &str,
    number: u32,
    params: Vec<ParamDecl>,
    return_type: TypeExpression,
) -> Declaration {
    Declaration::Method(MethodDecl {
        name: loc(line, name.to_string()),
        number: loc(line, number),
        params,
        return_type,
        annotations: Vec::new(),
    })
}

pub fn param(line: u32, name: &str, ty: TypeExpression) -> ParamDecl {
    ParamDecl {
        name: loc(line, name.to_string()),
        ty,
        annotations: Vec::new(),
        default: None,
    }
}

pub fn annotation_decl(
    line: u32,
    name: &str,
    ty: TypeExpression,
    targets: Vec<DeclKind>,
    annotations: Vec<AnnotationApplication>,
) -> Declaration {
    Declaration::Annotation(AnnotationDecl {
        name: loc(line, name.to_string()),
        ty,
        annotations,
        targets,
    })
}

pub fn parsed(declarations: Vec<Declaration>) -> ParsedFile {
    ParsedFile {
        declarations,
        annotations: Vec::new(),
        errors: Diagnostics::new(),
    }
}

/// Compile declarations as one file with no imports available.
pub fn compile(declarations: Vec<Declaration>) -> (SchemaPool, DescId, Diagnostics) {
    let mut pool = SchemaPool::new();
    let parsed = parsed(declarations);
    let outcome = compile::compile_file(&mut pool, "test.strata", &parsed, |name| {
        Err(format!("no such file: {name}"))
    });
    match outcome {
        Outcome::Active(file, errors) => (pool, file, errors),
        Outcome::Failed(_) => panic!("the file driver always returns an active outcome"),
    }
}

/// Compile declarations and demand a clean result.
pub fn compile_ok(declarations: Vec<Declaration>) -> (SchemaPool, DescId) {
    let (pool, file, errors) = compile(declarations);
    assert!(
        errors.is_empty(),
        "unexpected errors:\n{}",
        errors.to_strings().join("\n")
    );
    (pool, file)
}

/// Look a member up by dotted path from the file root.
pub fn member(pool: &SchemaPool, scope: DescId, path: &str) -> DescId {
    let mut current = scope;
    for segment in path.split('.') {
        current = *pool
            .entry(current)
            .members
            .get(segment)
            .unwrap_or_else(|| panic!("no member '{segment}' in '{}'", pool.entry(current).name));
    }
    current
}

/// All diagnostics rendered into one string for containment asserts.
pub fn rendered(errors: &Diagnostics) -> String {
    errors.to_strings().join("\n")
}
