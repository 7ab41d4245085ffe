//! Compiled types and values.

use std::collections::BTreeMap;

use strata_wire::{DataSectionSize, DataSize, FieldSize};

use super::pool::{DescBody, DescId, SchemaPool};
use super::primitive::PrimitiveType;

/// A fully resolved type.
#[derive(Clone, PartialEq, Debug)]
pub enum Type {
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Text,
    Data,
    List(Box<Type>),
    Enum(DescId),
    Struct(DescId),
    /// A struct whose storage merges into its parent.
    InlineStruct(DescId),
    /// A fixed-length list whose elements merge into the parent.
    InlineList(Box<Type>, u32),
    Interface(DescId),
}

impl Type {
    pub fn from_primitive(primitive: PrimitiveType) -> Self {
        match primitive {
            PrimitiveType::Void => Type::Void,
            PrimitiveType::Bool => Type::Bool,
            PrimitiveType::Int8 => Type::Int8,
            PrimitiveType::Int16 => Type::Int16,
            PrimitiveType::Int32 => Type::Int32,
            PrimitiveType::Int64 => Type::Int64,
            PrimitiveType::UInt8 => Type::UInt8,
            PrimitiveType::UInt16 => Type::UInt16,
            PrimitiveType::UInt32 => Type::UInt32,
            PrimitiveType::UInt64 => Type::UInt64,
            PrimitiveType::Float32 => Type::Float32,
            PrimitiveType::Float64 => Type::Float64,
            PrimitiveType::Text => Type::Text,
            PrimitiveType::Data => Type::Data,
        }
    }

    /// Storage demanded by a field of this type.
    ///
    /// Inline struct sizes read the target struct's packed layout, so the
    /// target must have been compiled first (the type compiler guarantees
    /// this for types it produced).
    pub fn field_size(&self, pool: &SchemaPool) -> FieldSize {
        match self {
            Type::Void => FieldSize::Void,
            Type::Bool => FieldSize::Data(DataSize::Size1),
            Type::Int8 | Type::UInt8 => FieldSize::Data(DataSize::Size8),
            Type::Int16 | Type::UInt16 | Type::Enum(_) => FieldSize::Data(DataSize::Size16),
            Type::Int32 | Type::UInt32 | Type::Float32 => FieldSize::Data(DataSize::Size32),
            Type::Int64 | Type::UInt64 | Type::Float64 => FieldSize::Data(DataSize::Size64),
            Type::Text | Type::Data | Type::List(_) | Type::Struct(_) | Type::Interface(_) => {
                FieldSize::Reference
            }
            Type::InlineStruct(id) => match &pool.entry(*id).body {
                DescBody::Struct(body) => FieldSize::InlineComposite {
                    data: body.layout.data_size,
                    pointers: body.layout.pointer_count,
                },
                _ => FieldSize::InlineComposite {
                    data: DataSectionSize::Words(0),
                    pointers: 0,
                },
            },
            Type::InlineList(element, count) => {
                inline_list_size(element.field_size(pool), *count)
            }
        }
    }

    /// The descriptor a non-builtin type refers to, if any.
    pub fn referenced_desc(&self) -> Option<DescId> {
        match self {
            Type::Enum(id) | Type::Struct(id) | Type::InlineStruct(id) | Type::Interface(id) => {
                Some(*id)
            }
            Type::List(element) | Type::InlineList(element, _) => element.referenced_desc(),
            _ => None,
        }
    }
}

/// Storage for a fixed-length inline list: element storage times the count,
/// rounded up to the smallest legal section.
fn inline_list_size(element: FieldSize, count: u32) -> FieldSize {
    match element {
        FieldSize::Void => FieldSize::InlineComposite {
            data: DataSectionSize::Words(0),
            pointers: 0,
        },
        FieldSize::Data(size) => FieldSize::InlineComposite {
            data: DataSectionSize::for_bits(size.bits() as u64 * count as u64),
            pointers: 0,
        },
        FieldSize::Reference => FieldSize::InlineComposite {
            data: DataSectionSize::Words(0),
            pointers: count,
        },
        FieldSize::InlineComposite { data, pointers } => FieldSize::InlineComposite {
            data: DataSectionSize::for_bits(data.bits() * count as u64),
            pointers: pointers * count,
        },
    }
}

/// A fully compiled value.
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Void,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Text(String),
    Data(Vec<u8>),
    /// An enumerant, by descriptor.
    Enum(DescId),
    /// Field assignments, in source order.
    Struct(Vec<(DescId, Value)>),
    List(Vec<Value>),
}

/// Annotation values keyed by the annotation declaration's own id.
pub type AnnotationMap = BTreeMap<String, (DescId, Value)>;
