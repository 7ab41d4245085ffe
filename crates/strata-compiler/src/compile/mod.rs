//! The declaration compiler.
//!
//! A recursive tree walk producing a descriptor for each declaration. The
//! skeleton pass allocates shells and member maps for every named
//! declaration; bodies then compile in declaration order, with demand-driven
//! pulls for declarations needed early (alias targets, inline struct
//! layouts, annotation declarations). Diagnostics accumulate in one sink so
//! a single run reports as many problems as possible.

mod driver;

pub use driver::{CompileOptions, compile_file, compile_file_with, parse_and_compile_file};


use std::collections::HashMap;

use strata_wire::{FieldOffset, FieldSize};

use crate::analyze::{annotation, numbering, resolve, type_expr, value};
use crate::ast::{
    AnnotationApplication, DeclKind, Declaration, EnumDecl, FieldDecl, InterfaceDecl, StructDecl,
    UnionDecl, UsingDecl,
};
use crate::diagnostics::{Diagnostics, SourcePos};
use crate::layout::{Packable, pack_struct};
use crate::outcome::Outcome;
use crate::schema::{
    DescBody, DescId, FieldBody, MethodBody, ParamInfo, SchemaPool, StructBody, Type, UnionBody,
};

/// Whether a demanded declaration's body can be read.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Readiness {
    Ready,
    /// The declaration is on the compilation stack.
    Cycle,
    /// The declaration failed to compile and fell out of scope.
    Failed,
}

/// Compilation session for one file.
pub(crate) struct FileCompiler<'a> {
    pub(crate) pool: &'a mut SchemaPool,
    pub(crate) file: DescId,
    /// AST node for each shell allocated by the skeleton pass.
    pub(crate) decls: HashMap<DescId, &'a Declaration>,
    pub(crate) errors: Diagnostics,
    pub(crate) max_ordinal: u16,
}

impl<'a> FileCompiler<'a> {
    pub(crate) fn new(pool: &'a mut SchemaPool, file: DescId, max_ordinal: u16) -> Self {
        Self {
            pool,
            file,
            decls: HashMap::new(),
            errors: Diagnostics::new(),
            max_ordinal,
        }
    }

    /// Allocate shells and member maps for every declaration in `body`.
    ///
    /// Duplicate names get no shell: the first binding stays, and the
    /// uniqueness validator reports the clash from the AST. Fields declared
    /// inside a union also join the enclosing struct's member map.
    pub(crate) fn skeleton(&mut self, parent: DescId, body: &'a [Declaration]) {
        for decl in body {
            let kind = decl.kind();
            let parent_kind = self
                .pool
                .entry(parent)
                .kind
                .expect("scopes are declarations");
            if !allowed_in(kind, parent_kind) {
                self.errors
                    .report(decl.name().pos.clone(), scope_error(kind, parent_kind));
                continue;
            }
            let name = decl.name();
            if self.pool.entry(parent).members.contains_key(&name.value) {
                continue;
            }
            let id = self.pool.alloc(
                name.value.clone(),
                Some(name.pos.clone()),
                Some(parent),
                kind,
            );
            self.decls.insert(id, decl);
            self.pool.add_member(parent, &name.value, id);
            match decl {
                Declaration::Enum(d) => self.skeleton(id, &d.body),
                Declaration::Struct(d) => self.skeleton(id, &d.body),
                Declaration::Interface(d) => self.skeleton(id, &d.body),
                Declaration::Union(d) => {
                    self.skeleton(id, &d.body);
                    // union fields are addressable from the struct too
                    let fields: Vec<(String, DescId)> = self
                        .pool
                        .entry(id)
                        .members
                        .iter()
                        .map(|(field_name, &field)| (field_name.clone(), field))
                        .collect();
                    for (field_name, field) in fields {
                        self.pool.add_member(parent, &field_name, field);
                    }
                }
                _ => {}
            }
        }
    }

    /// Make sure a declaration's body is available, compiling it on demand.
    ///
    /// Leaf declarations (fields, unions, enumerants, methods) are filled by
    /// their enclosing scope's compilation, so the demand is routed there.
    pub(crate) fn ensure_compiled(&mut self, id: DescId) -> Readiness {
        let target = self.scope_decl_of(id);
        match self.pool.entry(target).body {
            DescBody::Pending => {
                if self.decls.contains_key(&target) {
                    self.compile_decl(target);
                } else {
                    // A shell from another session; nothing to compile.
                    self.pool.fill(target, DescBody::Failed);
                }
            }
            DescBody::InProgress => return Readiness::Cycle,
            _ => {}
        }
        match self.pool.entry(id).body {
            DescBody::Failed => Readiness::Failed,
            DescBody::Pending | DescBody::InProgress => Readiness::Cycle,
            _ => Readiness::Ready,
        }
    }

    fn scope_decl_of(&self, id: DescId) -> DescId {
        let mut current = id;
        loop {
            match self.pool.entry(current).kind {
                Some(
                    DeclKind::Field | DeclKind::Union | DeclKind::Enumerant | DeclKind::Method,
                ) => {
                    current = self
                        .pool
                        .entry(current)
                        .parent
                        .expect("leaf declarations have parents");
                }
                _ => return current,
            }
        }
    }

    fn scope_of(&self, id: DescId) -> DescId {
        self.pool.entry(id).parent.unwrap_or(self.file)
    }

    /// Merge an outcome's errors into the sink, keeping the value.
    fn merge<T>(&mut self, outcome: Outcome<T>) -> Option<T> {
        let (result, errors) = outcome.split();
        self.errors.extend(errors);
        result
    }

    /// Drop a failed declaration's binding so later lookups see an
    /// undefined name instead of a half-built descriptor.
    fn fail_decl(&mut self, id: DescId) {
        let (name, parent) = {
            let entry = self.pool.entry(id);
            (entry.name.clone(), entry.parent)
        };
        self.pool.fill(id, DescBody::Failed);
        if let Some(parent) = parent {
            self.pool.remove_member(parent, &name);
        }
    }

    fn apply_annotations(
        &mut self,
        id: DescId,
        target: DeclKind,
        applications: &[AnnotationApplication],
    ) {
        let scope = self.scope_of(id);
        let result = annotation::compile_annotations(self, scope, target, applications);
        if let Some((decl_id, map)) = self.merge(result) {
            let entry = self.pool.entry_mut(id);
            entry.id = decl_id;
            entry.annotations = map;
        }
    }

    fn compile_decl(&mut self, id: DescId) {
        let Some(decl) = self.decls.get(&id).copied() else {
            self.pool.fill(id, DescBody::Failed);
            return;
        };
        self.pool.begin(id);
        match decl {
            Declaration::Using(d) => self.compile_using(id, d),
            Declaration::Constant(d) => self.compile_constant(id, d),
            Declaration::Enum(d) => self.compile_enum(id, d),
            Declaration::Struct(d) => self.compile_struct(id, d),
            Declaration::Interface(d) => self.compile_interface(id, d),
            Declaration::Annotation(d) => self.compile_annotation_decl(id, d),
            // Leaves are filled by their enclosing scope's compilation and
            // never routed here.
            _ => self.pool.fill(id, DescBody::Failed),
        }
    }

    fn compile_using(&mut self, id: DescId, d: &UsingDecl) {
        let scope = self.scope_of(id);
        let target = resolve::lookup(self, scope, &d.target);
        match self.merge(target) {
            Some(target) => self.pool.fill(id, DescBody::Using { target }),
            None => self.fail_decl(id),
        }
    }

    fn compile_constant(&mut self, id: DescId, d: &crate::ast::ConstantDecl) {
        let scope = self.scope_of(id);
        let ty = type_expr::compile_type(self, scope, &d.ty);
        let Some(ty) = self.merge(ty) else {
            return self.fail_decl(id);
        };
        let compiled = value::compile_value(self, &ty, &d.value);
        let Some(compiled) = self.merge(compiled) else {
            return self.fail_decl(id);
        };
        self.apply_annotations(id, DeclKind::Constant, &d.annotations);
        self.pool.fill(
            id,
            DescBody::Constant {
                ty,
                value: compiled,
            },
        );
    }

    fn compile_enum(&mut self, id: DescId, d: &EnumDecl) {
        let mut numbered = Vec::new();
        let mut names = Vec::new();
        for child in &d.body {
            if let Declaration::Enumerant(e) = child {
                numbered.push((e.number.value, e.number.pos.clone()));
                names.push((e.name.value.clone(), e.name.pos.clone()));
            }
        }
        numbering::validate_numbering("Enumerants", &numbered, self.max_ordinal, &mut self.errors);
        numbering::validate_unique_names(&names, &mut self.errors);

        let member_ids: Vec<DescId> = self.pool.entry(id).members.values().copied().collect();
        let mut enumerants: Vec<(u32, DescId)> = Vec::new();
        for member in &member_ids {
            let Some(Declaration::Enumerant(e)) = self.decls.get(member).copied() else {
                continue;
            };
            self.pool.fill(
                *member,
                DescBody::Enumerant {
                    number: clamp_number(e.number.value),
                },
            );
            enumerants.push((e.number.value, *member));
        }
        // annotations second, so their values can already read the bodies
        for member in &member_ids {
            let Some(Declaration::Enumerant(e)) = self.decls.get(member).copied() else {
                continue;
            };
            self.apply_annotations(*member, DeclKind::Enumerant, &e.annotations);
        }
        enumerants.sort_by_key(|(number, _)| *number);

        self.apply_annotations(id, DeclKind::Enum, &d.annotations);
        self.pool.fill(
            id,
            DescBody::Enum {
                enumerants: enumerants.into_iter().map(|(_, e)| e).collect(),
            },
        );
    }

    fn compile_struct(&mut self, id: DescId, d: &StructDecl) {
        self.validate_struct_ast(d);

        // gather the shells bound in this scope
        let member_ids: Vec<DescId> = self.pool.entry(id).members.values().copied().collect();
        let mut fields: Vec<FieldPlan<'a>> = Vec::new();
        let mut unions: Vec<(DescId, &'a UnionDecl)> = Vec::new();
        let mut nested: Vec<DescId> = Vec::new();
        for member in member_ids {
            let Some(decl) = self.decls.get(&member).copied() else {
                continue;
            };
            match decl {
                Declaration::Field(f) => {
                    // unionized fields are gathered from their union below
                    if self.pool.entry(member).parent == Some(id) {
                        fields.push(FieldPlan {
                            field: member,
                            decl: f,
                            union: None,
                            ty: None,
                        });
                    }
                }
                Declaration::Union(u) => unions.push((member, u)),
                _ => nested.push(member),
            }
        }
        for &(union, u) in &unions {
            let union_fields: Vec<DescId> =
                self.pool.entry(union).members.values().copied().collect();
            for field in union_fields {
                let Some(Declaration::Field(f)) = self.decls.get(&field).copied() else {
                    continue;
                };
                fields.push(FieldPlan {
                    field,
                    decl: f,
                    union: Some((union, u.number.value)),
                    ty: None,
                });
            }
        }

        // field types first; they decide the packing sizes
        for index in 0..fields.len() {
            let scope = self.scope_of(fields[index].field);
            let decl = fields[index].decl;
            let ty = type_expr::compile_type(self, scope, &decl.ty);
            fields[index].ty = self.merge(ty);
        }

        // pack in number order
        let mut items: Vec<Packable> = Vec::new();
        for plan in &fields {
            let size = plan
                .ty
                .as_ref()
                .map(|ty| ty.field_size(self.pool))
                .unwrap_or(FieldSize::Void);
            items.push(match plan.union {
                None => Packable::Field {
                    number: plan.decl.number.value,
                    size,
                },
                Some((_, union_number)) => Packable::UnionMember {
                    union: union_number,
                    number: plan.decl.number.value,
                    size,
                },
            });
        }
        for &(_, u) in &unions {
            items.push(Packable::UnionTag {
                number: u.number.value,
            });
        }
        let layout = pack_struct(
            items,
            d.fixed.as_ref().map(|fixed| (&fixed.value, &fixed.pos)),
            &mut self.errors,
        );

        // discriminants: member fields sorted by number get 0, 1, 2, ...
        let mut discriminants: HashMap<DescId, u16> = HashMap::new();
        let mut union_members: HashMap<DescId, Vec<DescId>> = HashMap::new();
        for &(union, _) in &unions {
            let mut members: Vec<(u32, DescId)> = fields
                .iter()
                .filter(|plan| plan.union.map(|(u, _)| u) == Some(union))
                .map(|plan| (plan.decl.number.value, plan.field))
                .collect();
            members.sort_by_key(|(number, _)| *number);
            for (discriminant, (_, field)) in members.iter().enumerate() {
                discriminants.insert(*field, discriminant as u16);
            }
            union_members.insert(union, members.into_iter().map(|(_, field)| field).collect());
        }

        // field bodies, before defaults so literals can read sibling types
        for plan in &fields {
            let number = clamp_number(plan.decl.number.value);
            let offset = layout.offset_of(number).unwrap_or(FieldOffset::Void);
            let union = plan.union.map(|(union, _)| {
                (union, discriminants.get(&plan.field).copied().unwrap_or(0))
            });
            self.pool.fill(
                plan.field,
                DescBody::Field(FieldBody {
                    number,
                    ty: plan.ty.clone().unwrap_or(Type::Void),
                    default: None,
                    union,
                    offset,
                }),
            );
        }
        for &(union, u) in &unions {
            let number = clamp_number(u.number.value);
            let tag_offset = match layout.offset_of(number) {
                Some(FieldOffset::Data { offset, .. }) => offset,
                _ => 0,
            };
            self.pool.fill(
                union,
                DescBody::Union(UnionBody {
                    number,
                    tag_offset,
                    members: union_members.remove(&union).unwrap_or_default(),
                }),
            );
        }

        // defaults and annotations
        for plan in &fields {
            if let Some(default) = &plan.decl.default {
                match &plan.ty {
                    Some(Type::InlineStruct(_)) => self.errors.report(
                        default.pos.clone(),
                        "Inline fields can't have default values.",
                    ),
                    Some(ty) => {
                        let ty = ty.clone();
                        let compiled = value::compile_value(self, &ty, default);
                        if let Some(compiled) = self.merge(compiled)
                            && let DescBody::Field(body) = &mut self.pool.entry_mut(plan.field).body
                        {
                            body.default = Some(compiled);
                        }
                    }
                    // the type already failed; stay quiet
                    None => {}
                }
            }
            self.apply_annotations(plan.field, DeclKind::Field, &plan.decl.annotations);
        }
        for &(union, u) in &unions {
            self.apply_annotations(union, DeclKind::Union, &u.annotations);
        }

        for nested_id in nested {
            self.ensure_compiled(nested_id);
        }

        self.apply_annotations(id, DeclKind::Struct, &d.annotations);

        let mut field_ids: Vec<(u32, DescId)> = fields
            .iter()
            .map(|plan| (plan.decl.number.value, plan.field))
            .collect();
        field_ids.sort_by_key(|(number, _)| *number);
        let mut union_ids: Vec<(u32, DescId)> = unions
            .iter()
            .map(|&(union, u)| (u.number.value, union))
            .collect();
        union_ids.sort_by_key(|(number, _)| *number);

        self.pool.fill(
            id,
            DescBody::Struct(StructBody {
                fixed: d.fixed.as_ref().map(|fixed| fixed.value),
                layout,
                fields: field_ids.into_iter().map(|(_, field)| field).collect(),
                unions: union_ids.into_iter().map(|(_, union)| union).collect(),
            }),
        );
    }

    /// Numbering, name-uniqueness, and retrofit checks over the struct's AST
    /// (the member map only keeps one binding per name, so duplicates are
    /// only visible here).
    fn validate_struct_ast(&mut self, d: &StructDecl) {
        let mut numbered: Vec<(u32, SourcePos)> = Vec::new();
        let mut names: Vec<(String, SourcePos)> = Vec::new();
        for child in &d.body {
            match child {
                Declaration::Field(f) => {
                    numbered.push((f.number.value, f.number.pos.clone()));
                    names.push((f.name.value.clone(), f.name.pos.clone()));
                }
                Declaration::Union(u) => {
                    numbered.push((u.number.value, u.number.pos.clone()));
                    names.push((u.name.value.clone(), u.name.pos.clone()));
                    let mut member_numbers = Vec::new();
                    for union_child in &u.body {
                        if let Declaration::Field(f) = union_child {
                            numbered.push((f.number.value, f.number.pos.clone()));
                            names.push((f.name.value.clone(), f.name.pos.clone()));
                            member_numbers.push(f.number.value);
                        }
                    }
                    numbering::validate_union_retrofit(
                        &u.name.value,
                        u.number.value,
                        &u.name.pos,
                        &member_numbers,
                        &mut self.errors,
                    );
                }
                other => {
                    names.push((other.name().value.clone(), other.name().pos.clone()));
                }
            }
        }
        numbering::validate_numbering("Fields", &numbered, self.max_ordinal, &mut self.errors);
        numbering::validate_unique_names(&names, &mut self.errors);
    }

    fn compile_interface(&mut self, id: DescId, d: &InterfaceDecl) {
        let mut numbered = Vec::new();
        let mut names = Vec::new();
        for child in &d.body {
            if let Declaration::Method(m) = child {
                numbered.push((m.number.value, m.number.pos.clone()));
            }
            names.push((child.name().value.clone(), child.name().pos.clone()));
        }
        numbering::validate_numbering("Methods", &numbered, self.max_ordinal, &mut self.errors);
        numbering::validate_unique_names(&names, &mut self.errors);

        let member_ids: Vec<DescId> = self.pool.entry(id).members.values().copied().collect();
        let mut methods: Vec<(u32, DescId)> = Vec::new();
        let mut nested: Vec<DescId> = Vec::new();
        for member in member_ids {
            let Some(decl) = self.decls.get(&member).copied() else {
                continue;
            };
            let Declaration::Method(m) = decl else {
                nested.push(member);
                continue;
            };

            let scope = self.scope_of(member);
            let mut params = Vec::new();
            let mut param_names = Vec::new();
            for param in &m.params {
                param_names.push((param.name.value.clone(), param.name.pos.clone()));
                let ty = type_expr::compile_type(self, scope, &param.ty);
                let ty = self.merge(ty).unwrap_or(Type::Void);
                let default = param.default.as_ref().and_then(|default| {
                    let compiled = value::compile_value(self, &ty, default);
                    self.merge(compiled)
                });
                let annotations =
                    annotation::compile_annotations(self, scope, DeclKind::Param, &param.annotations);
                let (param_id, annotations) = self.merge(annotations).unwrap_or_default();
                params.push(ParamInfo {
                    name: param.name.value.clone(),
                    ty,
                    default,
                    id: param_id,
                    annotations,
                });
            }
            numbering::validate_unique_names(&param_names, &mut self.errors);

            let return_type = type_expr::compile_type(self, scope, &m.return_type);
            let return_type = self.merge(return_type).unwrap_or(Type::Void);

            self.pool.fill(
                member,
                DescBody::Method(MethodBody {
                    number: clamp_number(m.number.value),
                    params,
                    return_type,
                }),
            );
            self.apply_annotations(member, DeclKind::Method, &m.annotations);
            methods.push((m.number.value, member));
        }
        methods.sort_by_key(|(number, _)| *number);

        for nested_id in nested {
            self.ensure_compiled(nested_id);
        }

        self.apply_annotations(id, DeclKind::Interface, &d.annotations);
        self.pool.fill(
            id,
            DescBody::Interface {
                methods: methods.into_iter().map(|(_, method)| method).collect(),
            },
        );
    }

    fn compile_annotation_decl(&mut self, id: DescId, d: &crate::ast::AnnotationDecl) {
        let scope = self.scope_of(id);
        let ty = type_expr::compile_type(self, scope, &d.ty);
        let Some(ty) = self.merge(ty) else {
            return self.fail_decl(id);
        };
        self.apply_annotations(id, DeclKind::Annotation, &d.annotations);
        self.pool.fill(
            id,
            DescBody::Annotation {
                ty,
                targets: d.targets.clone(),
            },
        );
    }
}

/// One field being compiled, before its body is filled.
struct FieldPlan<'a> {
    field: DescId,
    decl: &'a FieldDecl,
    /// Owning union, with the union's declaration number.
    union: Option<(DescId, u32)>,
    ty: Option<Type>,
}

fn clamp_number(number: u32) -> u16 {
    number.min(u16::MAX as u32) as u16
}

fn allowed_in(child: DeclKind, parent: DeclKind) -> bool {
    match child {
        DeclKind::Enumerant => parent == DeclKind::Enum,
        DeclKind::Field => matches!(parent, DeclKind::Struct | DeclKind::Union),
        DeclKind::Union => parent == DeclKind::Struct,
        DeclKind::Method => parent == DeclKind::Interface,
        _ => matches!(
            parent,
            DeclKind::File | DeclKind::Struct | DeclKind::Interface
        ),
    }
}

fn scope_error(child: DeclKind, parent: DeclKind) -> String {
    match child {
        DeclKind::Enumerant => "Enumerants can only appear inside enums.".to_string(),
        DeclKind::Field => "Fields can only appear inside structs or unions.".to_string(),
        DeclKind::Union => "Unions can only appear inside structs.".to_string(),
        DeclKind::Method => "Methods can only appear inside interfaces.".to_string(),
        _ => format!("A {} can't be declared inside a {}.", child, parent),
    }
}
