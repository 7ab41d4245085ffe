//! The file driver.
//!
//! Orchestrates one file's compilation: resolve its imports through the host
//! callback (each distinct name exactly once), run the skeleton pass, compile
//! every top-level declaration, attach file-level annotations, and record the
//! transitive set of files its member types reach. Parse errors, then import
//! errors, then compilation errors, on an `Active` outcome whenever any
//! portion compiled.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use strata_wire::MAX_ORDINAL;

use crate::ast::{
    AnnotationApplication, DeclKind, Declaration, Located, Name, ParsedFile, TypeArg,
    TypeExpression,
};
use crate::diagnostics::{Diagnostics, SourcePos};
use crate::outcome::Outcome;
use crate::schema::{DescBody, DescId, FileBody, SchemaPool, Type};

use super::FileCompiler;
use crate::analyze::{annotation, numbering};

/// Configuration for a compilation session.
#[derive(Clone, Copy, Debug)]
pub struct CompileOptions {
    /// Largest legal declaration number.
    pub max_ordinal: u16,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_ordinal: MAX_ORDINAL,
        }
    }
}

/// Parse a file with the external parser, then compile it.
pub fn parse_and_compile_file(
    pool: &mut SchemaPool,
    filename: &str,
    text: &str,
    parser: impl FnOnce(&str, &str) -> ParsedFile,
    importer: impl FnMut(&str) -> Result<DescId, String>,
) -> Outcome<DescId> {
    let parsed = parser(filename, text);
    compile_file(pool, filename, &parsed, importer)
}

/// Compile one parsed file into the pool.
pub fn compile_file(
    pool: &mut SchemaPool,
    filename: &str,
    parsed: &ParsedFile,
    importer: impl FnMut(&str) -> Result<DescId, String>,
) -> Outcome<DescId> {
    compile_file_with(pool, &CompileOptions::default(), filename, parsed, importer)
}

pub fn compile_file_with(
    pool: &mut SchemaPool,
    options: &CompileOptions,
    filename: &str,
    parsed: &ParsedFile,
    mut importer: impl FnMut(&str) -> Result<DescId, String>,
) -> Outcome<DescId> {
    tracing::debug!(
        file = filename,
        declarations = parsed.declarations.len(),
        "compiling schema file"
    );
    let file = pool.alloc(
        filename.to_string(),
        Some(SourcePos::new(filename, 1, 1)),
        None,
        DeclKind::File,
    );

    // Each distinct import name is requested exactly once; a failed import
    // binds to an empty file so later lookups degrade gracefully.
    let mut import_errors = Diagnostics::new();
    for import in collect_imports(parsed) {
        tracing::trace!(import = %import.value, "resolving import");
        let target = match importer(&import.value) {
            Ok(target) => target,
            Err(reason) => {
                import_errors.report(
                    import.pos.clone(),
                    format!("Couldn't import \"{}\": {}", import.value, reason),
                );
                empty_file(pool, &import.value)
            }
        };
        pool.entry_mut(file).imports.insert(import.value, target);
    }

    let errors = {
        let mut fc = FileCompiler::new(pool, file, options.max_ordinal);
        fc.skeleton(file, &parsed.declarations);

        let names: Vec<(String, SourcePos)> = parsed
            .declarations
            .iter()
            .map(|decl| (decl.name().value.clone(), decl.name().pos.clone()))
            .collect();
        numbering::validate_unique_names(&names, &mut fc.errors);

        let members: Vec<DescId> = fc.pool.entry(file).members.values().copied().collect();
        for member in members {
            fc.ensure_compiled(member);
        }

        let file_annotations =
            annotation::compile_annotations(&mut fc, file, DeclKind::File, &parsed.annotations);
        if let Some((id, map)) = fc.merge(file_annotations) {
            let entry = fc.pool.entry_mut(file);
            entry.id = id;
            entry.annotations = map;
        }

        fc.errors
    };

    let runtime_imports = runtime_imports(pool, file);
    pool.fill(file, DescBody::File(FileBody { runtime_imports }));

    let mut all = parsed.errors.clone();
    all.extend(import_errors);
    all.extend(errors);
    tracing::debug!(file = filename, errors = all.len(), "schema file compiled");
    Outcome::with_errors(file, all)
}

fn empty_file(pool: &mut SchemaPool, name: &str) -> DescId {
    let id = pool.alloc(name.to_string(), None, None, DeclKind::File);
    pool.fill(
        id,
        DescBody::File(FileBody {
            runtime_imports: BTreeSet::new(),
        }),
    );
    id
}

/// The distinct import names a parsed file declares, in first-occurrence
/// order with first-occurrence positions.
fn collect_imports(parsed: &ParsedFile) -> Vec<Located<String>> {
    let mut seen: IndexMap<String, SourcePos> = IndexMap::new();
    collect_from_decls(&parsed.declarations, &mut seen);
    collect_from_annotations(&parsed.annotations, &mut seen);
    seen.into_iter()
        .map(|(name, pos)| Located::new(pos, name))
        .collect()
}

fn collect_from_name(name: &Name, seen: &mut IndexMap<String, SourcePos>) {
    match name {
        Name::Import(import) => {
            seen.entry(import.value.clone())
                .or_insert_with(|| import.pos.clone());
        }
        Name::Member(parent, _) => collect_from_name(parent, seen),
        _ => {}
    }
}

fn collect_from_type(expr: &TypeExpression, seen: &mut IndexMap<String, SourcePos>) {
    collect_from_name(&expr.name, seen);
    for param in &expr.params {
        if let TypeArg::Type(inner) = param {
            collect_from_type(inner, seen);
        }
    }
}

fn collect_from_annotations(
    annotations: &[AnnotationApplication],
    seen: &mut IndexMap<String, SourcePos>,
) {
    for application in annotations {
        collect_from_name(&application.name, seen);
    }
}

fn collect_from_decls(decls: &[Declaration], seen: &mut IndexMap<String, SourcePos>) {
    for decl in decls {
        match decl {
            Declaration::Using(d) => collect_from_name(&d.target, seen),
            Declaration::Constant(d) => {
                collect_from_type(&d.ty, seen);
                collect_from_annotations(&d.annotations, seen);
            }
            Declaration::Enum(d) => {
                collect_from_annotations(&d.annotations, seen);
                collect_from_decls(&d.body, seen);
            }
            Declaration::Enumerant(d) => collect_from_annotations(&d.annotations, seen),
            Declaration::Struct(d) => {
                collect_from_annotations(&d.annotations, seen);
                collect_from_decls(&d.body, seen);
            }
            Declaration::Union(d) => {
                collect_from_annotations(&d.annotations, seen);
                collect_from_decls(&d.body, seen);
            }
            Declaration::Field(d) => {
                collect_from_type(&d.ty, seen);
                collect_from_annotations(&d.annotations, seen);
            }
            Declaration::Interface(d) => {
                collect_from_annotations(&d.annotations, seen);
                collect_from_decls(&d.body, seen);
            }
            Declaration::Method(d) => {
                for param in &d.params {
                    collect_from_type(&param.ty, seen);
                    collect_from_annotations(&param.annotations, seen);
                }
                collect_from_type(&d.return_type, seen);
                collect_from_annotations(&d.annotations, seen);
            }
            Declaration::Annotation(d) => {
                collect_from_type(&d.ty, seen);
                collect_from_annotations(&d.annotations, seen);
            }
        }
    }
}

/// Files referenced by non-builtin types appearing in this file's members,
/// transitively through the referenced files' own runtime imports.
fn runtime_imports(pool: &SchemaPool, file: DescId) -> BTreeSet<DescId> {
    let mut result = BTreeSet::new();
    let mut visited = BTreeSet::new();
    let mut stack = vec![file];
    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        let entry = pool.entry(current);
        for &member in entry.members.values() {
            stack.push(member);
        }
        match &entry.body {
            DescBody::Field(body) => add_type(pool, file, &body.ty, &mut result),
            DescBody::Constant { ty, .. } => add_type(pool, file, ty, &mut result),
            DescBody::Annotation { ty, .. } => add_type(pool, file, ty, &mut result),
            DescBody::Method(body) => {
                add_type(pool, file, &body.return_type, &mut result);
                for param in &body.params {
                    add_type(pool, file, &param.ty, &mut result);
                }
            }
            _ => {}
        }
    }
    result
}

fn add_type(pool: &SchemaPool, file: DescId, ty: &Type, result: &mut BTreeSet<DescId>) {
    let Some(referenced) = ty.referenced_desc() else {
        return;
    };
    let Some(owner) = pool.file_of(referenced) else {
        return;
    };
    if owner == file {
        return;
    }
    result.insert(owner);
    if let DescBody::File(body) = &pool.entry(owner).body {
        result.extend(body.runtime_imports.iter().copied());
    }
}
