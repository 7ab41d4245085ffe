//! Field placements within a struct instance.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::size::{DataSectionSize, DataSize};

/// Where one field lives within its struct.
///
/// Data offsets are in units of the field's own slot size. Pointer offsets
/// index the pointer section. Inline-composite data offsets are in words when
/// the composite's data section is word-granular, else in units of its
/// sub-word size.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize)]
pub enum FieldOffset {
    /// Void fields occupy no storage.
    Void,
    Data { size: DataSize, offset: u32 },
    Pointer { offset: u32 },
    InlineComposite {
        data_offset: u32,
        pointer_offset: u32,
        data_size: DataSectionSize,
        pointer_count: u32,
    },
}

/// Packed layout of one struct: section sizes plus per-number placements.
///
/// The offset map is keyed by declaration number. Fields, unions (whose entry
/// is the 16-bit tag slot), and unionized fields all appear under their own
/// numbers.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct StructLayout {
    pub data_size: DataSectionSize,
    pub pointer_count: u32,
    pub offsets: BTreeMap<u16, FieldOffset>,
}

impl StructLayout {
    /// Layout of a struct with no members.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn offset_of(&self, number: u16) -> Option<FieldOffset> {
        self.offsets.get(&number).copied()
    }
}
