//! Scope-chain name lookup.
//!
//! Resolution is structural: it reads member maps built by the skeleton pass
//! and never needs a compiled body, except to step through `using` aliases,
//! which are compiled on demand. Every successful result has aliases fully
//! dereferenced, so resolving a path through `using` declarations lands on
//! the same descriptor as naming the target directly.

use crate::ast::{DeclKind, Located, Name};
use crate::compile::{FileCompiler, Readiness};
use crate::diagnostics::SourcePos;
use crate::outcome::Outcome;
use crate::schema::{DescBody, DescId};

/// Resolve a possibly-qualified name from `scope` outward.
pub(crate) fn lookup(fc: &mut FileCompiler, scope: DescId, name: &Name) -> Outcome<DescId> {
    match name {
        Name::Member(parent, leaf) => {
            lookup(fc, scope, parent).and_then(|parent| member_lookup(fc, parent, leaf))
        }
        _ => lookup_simple(fc, scope, name),
    }
}

fn lookup_simple(fc: &mut FileCompiler, scope: DescId, name: &Name) -> Outcome<DescId> {
    let (kind, parent) = {
        let entry = fc.pool.entry(scope);
        (entry.kind, entry.parent)
    };
    if kind == Some(DeclKind::File) {
        return match name {
            Name::Absolute(n) => match fc.pool.entry(scope).members.get(&n.value).copied() {
                Some(id) => deref_using(fc, id, &n.pos),
                None => not_defined(&n.value, &n.pos),
            },
            Name::Relative(n) => {
                if let Some(id) = fc.pool.entry(scope).members.get(&n.value).copied() {
                    deref_using(fc, id, &n.pos)
                } else if let Some(id) = fc.pool.builtin(&n.value) {
                    Outcome::succeed(id)
                } else {
                    not_defined(&n.value, &n.pos)
                }
            }
            Name::Import(n) => match fc.pool.entry(scope).imports.get(&n.value).copied() {
                Some(id) => Outcome::succeed(id),
                None => Outcome::error(
                    n.pos.clone(),
                    format!("\"{}\" is not imported by this file.", n.value),
                ),
            },
            Name::Member(..) => unreachable!("member names are split in lookup"),
        };
    }
    if let Name::Relative(n) = name
        && let Some(id) = fc.pool.entry(scope).members.get(&n.value).copied()
    {
        return deref_using(fc, id, &n.pos);
    }
    let parent = parent.expect("non-file scopes have parents");
    lookup_simple(fc, parent, name)
}

/// Look `leaf` up as a direct member of a resolved descriptor.
pub(crate) fn member_lookup(
    fc: &mut FileCompiler,
    parent: DescId,
    leaf: &Located<String>,
) -> Outcome<DescId> {
    match fc.pool.entry(parent).members.get(&leaf.value).copied() {
        Some(id) => deref_using(fc, id, &leaf.pos),
        None => {
            let parent_name = fc.pool.entry(parent).name.clone();
            Outcome::error(
                leaf.pos.clone(),
                format!("'{}' is not a member of '{}'.", leaf.value, parent_name),
            )
        }
    }
}

/// Step through `using` aliases until a concrete descriptor is reached.
fn deref_using(fc: &mut FileCompiler, mut id: DescId, pos: &SourcePos) -> Outcome<DescId> {
    loop {
        if fc.pool.entry(id).kind != Some(DeclKind::Using) {
            return Outcome::succeed(id);
        }
        let name = fc.pool.entry(id).name.clone();
        match fc.ensure_compiled(id) {
            Readiness::Ready => match &fc.pool.entry(id).body {
                DescBody::Using { target } => id = *target,
                _ => return not_defined(&name, pos),
            },
            Readiness::Cycle => {
                return Outcome::error(pos.clone(), format!("'{}' depends on itself.", name));
            }
            Readiness::Failed => return not_defined(&name, pos),
        }
    }
}

fn not_defined(name: &str, pos: &SourcePos) -> Outcome<DescId> {
    Outcome::error(pos.clone(), format!("'{}' is not defined.", name))
}
