//! Annotation application compilation.
//!
//! The reserved builtin `id` attaches an identifier string to its
//! declaration; every other application must resolve to an annotation
//! declaration whose target set admits the annotated kind. The resulting map
//! is keyed by the annotation declaration's own id; applications of id-less
//! annotations still compile (and report their errors) but drop out of the
//! map.

use crate::ast::{AnnotationApplication, DeclKind};
use crate::compile::{FileCompiler, Readiness};
use crate::diagnostics::{Diagnostics, SourcePos};
use crate::outcome::Outcome;
use crate::schema::{AnnotationMap, DescBody, DescId, Type, Value};

use super::{resolve, value};

/// Compile every annotation applied to one declaration of kind `target`.
///
/// Returns the declaration's id (from the first `id` annotation) and its
/// annotation map. Never fails; all problems are carried as errors.
pub(crate) fn compile_annotations(
    fc: &mut FileCompiler,
    scope: DescId,
    target: DeclKind,
    applications: &[AnnotationApplication],
) -> Outcome<(Option<String>, AnnotationMap)> {
    let mut errors = Diagnostics::new();
    let mut id: Option<String> = None;
    // (key, annotation desc, value, position, display name)
    let mut compiled: Vec<(String, DescId, Value, SourcePos, String)> = Vec::new();

    for application in applications {
        let resolved = match resolve::lookup(fc, scope, &application.name) {
            Outcome::Active(resolved, more) => {
                errors.extend(more);
                resolved
            }
            Outcome::Failed(more) => {
                errors.extend(more);
                continue;
            }
        };

        if matches!(fc.pool.entry(resolved).body, DescBody::BuiltinId) {
            match value::compile_value(fc, &Type::Text, &application.value) {
                Outcome::Active(Value::Text(text), more) => {
                    errors.extend(more);
                    if id.is_some() {
                        errors.report(application.pos.clone(), "Duplicate 'id' annotation.");
                    } else {
                        id = Some(text);
                    }
                }
                Outcome::Active(_, more) | Outcome::Failed(more) => errors.extend(more),
            }
            continue;
        }

        if fc.pool.entry(resolved).kind != Some(DeclKind::Annotation) {
            errors.report(
                application.name.pos().clone(),
                format!("'{}' is not an annotation.", application.name.leaf()),
            );
            continue;
        }

        let declared = match fc.ensure_compiled(resolved) {
            Readiness::Ready => match &fc.pool.entry(resolved).body {
                DescBody::Annotation { ty, targets } => Some((ty.clone(), targets.clone())),
                _ => None,
            },
            _ => None,
        };
        let Some((ty, targets)) = declared else {
            errors.report(
                application.name.pos().clone(),
                format!("'{}' is not defined.", application.name.leaf()),
            );
            continue;
        };

        if !targets.contains(&target) {
            errors.report(
                application.pos.clone(),
                format!(
                    "'{}' can't be applied to {} declarations.",
                    application.name.leaf(),
                    target
                ),
            );
        }

        let compiled_value = match value::compile_value(fc, &ty, &application.value) {
            Outcome::Active(compiled_value, more) => {
                errors.extend(more);
                compiled_value
            }
            Outcome::Failed(more) => {
                errors.extend(more);
                continue;
            }
        };

        let entry = fc.pool.entry(resolved);
        if let Some(key) = entry.id.clone() {
            compiled.push((
                key,
                resolved,
                compiled_value,
                application.pos.clone(),
                entry.name.clone(),
            ));
        }
    }

    // one diagnostic per duplicate key beyond the first, sorted by key
    compiled.sort_by(|a, b| a.0.cmp(&b.0));
    let mut map = AnnotationMap::new();
    for (key, desc, compiled_value, pos, name) in compiled {
        if map.contains_key(&key) {
            errors.report(pos, format!("Duplicate annotation '{}'.", name));
        } else {
            map.insert(key, (desc, compiled_value));
        }
    }

    Outcome::with_errors((id, map), errors)
}
