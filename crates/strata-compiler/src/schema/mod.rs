//! The resolved, type-checked representation of schema declarations.
//!
//! - `pool` - the id-addressed descriptor pool and per-kind bodies
//! - `primitive` - the builtin scalar types
//! - `types` - compiled types and values

mod pool;
mod primitive;
mod types;

pub use pool::{
    DescBody, DescId, Entry, FieldBody, FileBody, MethodBody, ParamInfo, SchemaPool, StructBody,
    UnionBody,
};
pub use primitive::PrimitiveType;
pub use types::{AnnotationMap, Type, Value};
