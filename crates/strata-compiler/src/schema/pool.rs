//! The descriptor pool.
//!
//! Descriptors are built in two phases over an id-addressed pool: `alloc`
//! reserves a shell whose identity is stable (usable as a parent pointer and
//! as a member-map target), children compile against the shell, and `fill`
//! freezes the body exactly once. `InProgress` marks a body whose compilation
//! is on the stack so that demand-driven pulls can detect cycles instead of
//! diverging.

use std::collections::BTreeSet;

use indexmap::IndexMap;

use strata_wire::StructLayout;

use crate::ast::{DeclKind, FixedSpec};
use crate::diagnostics::SourcePos;

use super::primitive::PrimitiveType;
use super::types::{AnnotationMap, Type, Value};

/// Index of a descriptor within its pool.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct DescId(pub u32);

/// One descriptor: identity, scope contents, and kind-specific body.
#[derive(Clone, Debug)]
pub struct Entry {
    pub name: String,
    /// Position of the declaration; builtins have none.
    pub pos: Option<SourcePos>,
    /// Declaration kind; builtins have none.
    pub kind: Option<DeclKind>,
    pub parent: Option<DescId>,
    /// Scope contents, one binding per name (the first declaration wins).
    pub members: IndexMap<String, DescId>,
    /// Import table; only files carry entries here.
    pub imports: IndexMap<String, DescId>,
    /// Identifier attached via the reserved `id` annotation.
    pub id: Option<String>,
    pub annotations: AnnotationMap,
    pub body: DescBody,
}

/// Kind-specific descriptor contents.
#[derive(Clone, Debug)]
pub enum DescBody {
    /// Allocated shell, not yet compiled.
    Pending,
    /// Compilation is on the stack; re-entry means a cycle.
    InProgress,
    /// Compilation failed; the binding has been dropped from its scope.
    Failed,
    BuiltinType(PrimitiveType),
    BuiltinList,
    BuiltinInline,
    BuiltinInlineList,
    BuiltinId,
    File(FileBody),
    Using {
        target: DescId,
    },
    Constant {
        ty: Type,
        value: Value,
    },
    Enum {
        /// Enumerants in number order.
        enumerants: Vec<DescId>,
    },
    Enumerant {
        number: u16,
    },
    Struct(StructBody),
    Union(UnionBody),
    Field(FieldBody),
    Interface {
        /// Methods in number order.
        methods: Vec<DescId>,
    },
    Method(MethodBody),
    Annotation {
        ty: Type,
        targets: Vec<DeclKind>,
    },
}

#[derive(Clone, Debug)]
pub struct FileBody {
    /// Files whose descriptors are reachable from this file's member types,
    /// transitively.
    pub runtime_imports: BTreeSet<DescId>,
}

#[derive(Clone, Debug)]
pub struct StructBody {
    /// Fixed-width request, when declared.
    pub fixed: Option<FixedSpec>,
    pub layout: StructLayout,
    /// All fields, direct and unionized, in number order.
    pub fields: Vec<DescId>,
    /// Unions in number order.
    pub unions: Vec<DescId>,
}

#[derive(Clone, Debug)]
pub struct UnionBody {
    pub number: u16,
    /// Offset of the 16-bit discriminant within the parent struct's data
    /// section, in units of 16 bits.
    pub tag_offset: u32,
    /// Member fields in number order; discriminants follow this order.
    pub members: Vec<DescId>,
}

#[derive(Clone, Debug)]
pub struct FieldBody {
    pub number: u16,
    pub ty: Type,
    pub default: Option<Value>,
    /// The union this field belongs to, with its discriminant.
    pub union: Option<(DescId, u16)>,
    pub offset: strata_wire::FieldOffset,
}

#[derive(Clone, Debug)]
pub struct MethodBody {
    pub number: u16,
    pub params: Vec<ParamInfo>,
    pub return_type: Type,
}

/// One method parameter.
#[derive(Clone, Debug)]
pub struct ParamInfo {
    pub name: String,
    pub ty: Type,
    pub default: Option<Value>,
    pub id: Option<String>,
    pub annotations: AnnotationMap,
}

/// Owns every descriptor of a compilation session, across files.
///
/// Builtin descriptors occupy fixed low ids seeded at construction; user
/// declarations are allocated after them. Files are entries like any other
/// descriptor, and import references between files are plain ids.
#[derive(Clone, Debug)]
pub struct SchemaPool {
    entries: Vec<Entry>,
    builtins: IndexMap<&'static str, DescId>,
}

impl SchemaPool {
    pub fn new() -> Self {
        let mut pool = Self {
            entries: Vec::new(),
            builtins: IndexMap::new(),
        };
        for primitive in PrimitiveType::ALL {
            pool.seed_builtin(primitive.name(), DescBody::BuiltinType(primitive));
        }
        pool.seed_builtin("List", DescBody::BuiltinList);
        pool.seed_builtin("Inline", DescBody::BuiltinInline);
        pool.seed_builtin("InlineList", DescBody::BuiltinInlineList);
        pool.seed_builtin("id", DescBody::BuiltinId);
        pool
    }

    fn seed_builtin(&mut self, name: &'static str, body: DescBody) {
        let id = DescId(self.entries.len() as u32);
        self.entries.push(Entry {
            name: name.to_string(),
            pos: None,
            kind: None,
            parent: None,
            members: IndexMap::new(),
            imports: IndexMap::new(),
            id: None,
            annotations: AnnotationMap::new(),
            body,
        });
        self.builtins.insert(name, id);
    }

    /// Allocate a shell for a declaration. The returned id is stable and may
    /// be referenced before the body is filled.
    pub fn alloc(
        &mut self,
        name: String,
        pos: Option<SourcePos>,
        parent: Option<DescId>,
        kind: DeclKind,
    ) -> DescId {
        let id = DescId(self.entries.len() as u32);
        self.entries.push(Entry {
            name,
            pos,
            kind: Some(kind),
            parent,
            members: IndexMap::new(),
            imports: IndexMap::new(),
            id: None,
            annotations: AnnotationMap::new(),
            body: DescBody::Pending,
        });
        id
    }

    pub fn entry(&self, id: DescId) -> &Entry {
        &self.entries[id.0 as usize]
    }

    pub fn entry_mut(&mut self, id: DescId) -> &mut Entry {
        &mut self.entries[id.0 as usize]
    }

    /// Mark a shell as being compiled.
    pub fn begin(&mut self, id: DescId) {
        self.entry_mut(id).body = DescBody::InProgress;
    }

    /// Freeze a descriptor's body.
    pub fn fill(&mut self, id: DescId, body: DescBody) {
        self.entry_mut(id).body = body;
    }

    /// Bind `name` in `scope` unless it is already bound.
    ///
    /// Returns false when the name was taken; the first binding stays in
    /// place and the duplicate is left for the uniqueness validator.
    pub fn add_member(&mut self, scope: DescId, name: &str, child: DescId) -> bool {
        let members = &mut self.entry_mut(scope).members;
        if members.contains_key(name) {
            return false;
        }
        members.insert(name.to_string(), child);
        true
    }

    /// Drop a member binding (used when its declaration failed to compile).
    pub fn remove_member(&mut self, scope: DescId, name: &str) {
        self.entry_mut(scope).members.shift_remove(name);
    }

    pub fn builtin(&self, name: &str) -> Option<DescId> {
        self.builtins.get(name).copied()
    }

    pub fn is_builtin(&self, id: DescId) -> bool {
        (id.0 as usize) < self.builtins.len()
    }

    /// The file descriptor enclosing `id`, if any; builtins have none.
    pub fn file_of(&self, id: DescId) -> Option<DescId> {
        let mut current = id;
        loop {
            let entry = self.entry(current);
            if entry.kind == Some(DeclKind::File) {
                return Some(current);
            }
            current = entry.parent?;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SchemaPool {
    fn default() -> Self {
        Self::new()
    }
}
