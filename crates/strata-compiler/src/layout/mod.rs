//! Bit-packed struct layout.
//!
//! Assigns bit and word offsets to every numbered item of a struct. Sub-word
//! fields reuse "holes" left by previously packed fields, and all variants of
//! a discriminated union share storage slots. Items are packed in declaration
//! number order, never source order: numbers define backwards compatibility,
//! and packing by number keeps lower-numbered layouts stable when
//! higher-numbered items are added later.

use std::collections::BTreeMap;

use strata_wire::{DataSectionSize, DataSize, FieldOffset, FieldSize, StructLayout};

use crate::ast::FixedSpec;
use crate::diagnostics::{Diagnostics, SourcePos};


/// One numbered item to place.
#[derive(Clone, Copy, PartialEq, Debug)]
pub(crate) enum Packable {
    /// A field stored directly in the struct.
    Field { number: u32, size: FieldSize },
    /// A union's 16-bit discriminant, at the union's own number.
    UnionTag { number: u32 },
    /// A field sharing its union's slots, at the field's own number.
    UnionMember {
        union: u32,
        number: u32,
        size: FieldSize,
    },
}

impl Packable {
    fn number(self) -> u32 {
        match self {
            Packable::Field { number, .. }
            | Packable::UnionTag { number }
            | Packable::UnionMember { number, .. } => number,
        }
    }
}

/// Running allocation state for one struct's sections.
#[derive(Clone, Debug, Default, PartialEq)]
struct PackingState {
    /// At most one reusable hole per sub-word size, in units of that size.
    /// Each entry is the current rightmost bubble of its width.
    holes: BTreeMap<DataSize, u32>,
    data_words: u32,
    pointer_count: u32,
}

impl PackingState {
    /// Allocate one slot of `size`, reusing or splitting holes.
    ///
    /// Returns the offset in units of `size`.
    fn pack_data(&mut self, size: DataSize) -> u32 {
        if size == DataSize::Size64 {
            let offset = self.data_words;
            self.data_words += 1;
            return offset;
        }
        if let Some(&hole) = self.holes.get(&size) {
            if size == DataSize::Size1 {
                // A bit hole walks through its byte and dies at the boundary.
                let next = hole + 1;
                if next % 8 == 0 {
                    self.holes.remove(&size);
                } else {
                    self.holes.insert(size, next);
                }
            } else {
                self.holes.remove(&size);
            }
            return hole;
        }
        // No hole of this width: take a slot of the next width up and split
        // it, leaving the upper part as a new hole.
        let parent = size.next_larger().expect("Size64 is handled above");
        let parent_offset = self.pack_data(parent);
        let child_offset = parent_offset * parent.slots_per(size);
        self.holes.insert(size, child_offset + 1);
        child_offset
    }

    /// Place a non-unionized item.
    fn pack_value(&mut self, size: FieldSize) -> FieldOffset {
        match size {
            FieldSize::Void => FieldOffset::Void,
            FieldSize::Reference => {
                let offset = self.pointer_count;
                self.pointer_count += 1;
                FieldOffset::Pointer { offset }
            }
            FieldSize::Data(data) => FieldOffset::Data {
                size: data,
                offset: self.pack_data(data),
            },
            FieldSize::InlineComposite { data, pointers } => {
                let data_offset = match data.as_slot() {
                    Some(slot) => self.pack_data(slot),
                    None => {
                        let offset = self.data_words;
                        self.data_words += data.words();
                        offset
                    }
                };
                let pointer_offset = self.pointer_count;
                self.pointer_count += pointers;
                FieldOffset::InlineComposite {
                    data_offset,
                    pointer_offset,
                    data_size: data,
                    pointer_count: pointers,
                }
            }
        }
    }

    /// Shrink a single-word data section from the top for as long as the
    /// upper half of what remains is a hole.
    fn strip_holes_from_first_word(&self) -> DataSectionSize {
        let mut size = DataSize::Size64;
        while let Some(smaller) = size.next_smaller() {
            if self.holes.get(&smaller) == Some(&1) {
                size = smaller;
            } else {
                break;
            }
        }
        DataSectionSize::of_slot(size)
    }
}

/// Storage shared by all variants of one union, sized to fit the largest
/// variant seen so far.
#[derive(Clone, Debug, Default)]
struct UnionSlots {
    /// Shared data storage: section size plus offset in units of that
    /// section's granularity (words for word slots, the slot size otherwise).
    data: Option<(DataSectionSize, u32)>,
    /// Shared pointer run: count and first offset.
    pointers: Option<(u32, u32)>,
}

/// Try to widen a sub-word union slot to hold `desired` by coalescing the
/// adjacent hole at each step. Leaves `state` untouched on failure.
fn try_expand_sub_word_slot(
    state: &mut PackingState,
    slot_size: DataSize,
    slot_offset: u32,
    desired: DataSize,
) -> Option<(DataSize, u32)> {
    if slot_size >= desired {
        return Some((slot_size, slot_offset));
    }
    let parent = slot_size.next_larger()?;
    let ratio = parent.slots_per(slot_size);
    if slot_offset % ratio != 0 {
        return None;
    }
    if state.holes.get(&slot_size) != Some(&(slot_offset + 1)) {
        return None;
    }
    state.holes.remove(&slot_size);
    match try_expand_sub_word_slot(state, parent, slot_offset / ratio, desired) {
        Some(slot) => Some(slot),
        None => {
            state.holes.insert(slot_size, slot_offset + 1);
            None
        }
    }
}

/// Place one data slot of `size` within a union's shared storage.
///
/// Returns the offset in units of `size`.
fn pack_unionized_data(state: &mut PackingState, slots: &mut UnionSlots, size: DataSize) -> u32 {
    match slots.data {
        None | Some((DataSectionSize::Words(0), _)) => {
            let offset = state.pack_data(size);
            slots.data = Some((DataSectionSize::of_slot(size), offset));
            offset
        }
        // A word-sized slot fits any single request; re-index into it.
        Some((DataSectionSize::Words(_), word_offset)) => {
            word_offset * DataSize::Size64.slots_per(size)
        }
        Some((section, slot_offset)) => {
            let slot_size = section.as_slot().expect("word slots handled above");
            if slot_size >= size {
                return slot_offset * slot_size.slots_per(size);
            }
            match try_expand_sub_word_slot(state, slot_size, slot_offset, size) {
                Some((new_size, new_offset)) => {
                    slots.data = Some((DataSectionSize::of_slot(new_size), new_offset));
                    new_offset * new_size.slots_per(size)
                }
                None => {
                    let offset = state.pack_data(size);
                    slots.data = Some((DataSectionSize::of_slot(size), offset));
                    offset
                }
            }
        }
    }
}

/// Place a word-granular data request within a union's shared storage.
///
/// Grows the existing multi-word slot in place when it sits at the data
/// section's tail; otherwise allocates a fresh run at the end.
fn pack_unionized_words(state: &mut PackingState, slots: &mut UnionSlots, words: u32) -> u32 {
    if let Some((DataSectionSize::Words(have), offset)) = slots.data {
        if have >= words {
            return offset;
        }
        if offset + have == state.data_words {
            state.data_words += words - have;
            slots.data = Some((DataSectionSize::Words(words), offset));
            return offset;
        }
    }
    let offset = state.data_words;
    state.data_words += words;
    slots.data = Some((DataSectionSize::Words(words), offset));
    offset
}

/// Place a run of pointers within a union's shared storage.
///
/// Reuses the existing run when it is wide enough, grows it in place at the
/// pointer section's tail, or reallocates a fresh run at the tail.
fn pack_unionized_pointers(state: &mut PackingState, slots: &mut UnionSlots, count: u32) -> u32 {
    match slots.pointers {
        None => {
            let offset = state.pointer_count;
            state.pointer_count += count;
            slots.pointers = Some((count, offset));
            offset
        }
        Some((have, offset)) => {
            if have >= count {
                return offset;
            }
            if offset + have == state.pointer_count {
                state.pointer_count += count - have;
                slots.pointers = Some((count, offset));
                return offset;
            }
            let fresh = state.pointer_count;
            state.pointer_count += count;
            slots.pointers = Some((count, fresh));
            fresh
        }
    }
}

/// Place one union variant.
fn pack_unionized_value(
    state: &mut PackingState,
    slots: &mut UnionSlots,
    size: FieldSize,
) -> FieldOffset {
    match size {
        FieldSize::Void => FieldOffset::Void,
        FieldSize::Reference => FieldOffset::Pointer {
            offset: pack_unionized_pointers(state, slots, 1),
        },
        FieldSize::Data(data) => FieldOffset::Data {
            size: data,
            offset: pack_unionized_data(state, slots, data),
        },
        FieldSize::InlineComposite { data, pointers } => {
            let data_offset = match data.as_slot() {
                Some(slot) => pack_unionized_data(state, slots, slot),
                None => pack_unionized_words(state, slots, data.words()),
            };
            let pointer_offset = pack_unionized_pointers(state, slots, pointers);
            FieldOffset::InlineComposite {
                data_offset,
                pointer_offset,
                data_size: data,
                pointer_count: pointers,
            }
        }
    }
}

/// Check a fixed-width declaration against the packed layout.
///
/// Violations are reported but the actual layout stands, so downstream
/// compilation keeps going.
fn enforce_fixed(
    layout: &StructLayout,
    fixed: &FixedSpec,
    pos: &SourcePos,
    errors: &mut Diagnostics,
) {
    let legal = matches!(fixed.data_bits, 0 | 1 | 8 | 16 | 32) || fixed.data_bits % 64 == 0;
    if !legal {
        errors.report(
            pos.clone(),
            format!(
                "A fixed-width struct's data section must be 0, 1, 8, 16, or 32 bits, \
                 or a whole number of words; {} bits is not a legal size.",
                fixed.data_bits
            ),
        );
    }
    if layout.data_size.bits() > fixed.data_bits {
        errors.report(
            pos.clone(),
            format!(
                "Struct exceeds its fixed size: it needs {} data bits but is declared at {}.",
                layout.data_size.bits(),
                fixed.data_bits
            ),
        );
    }
    if layout.pointer_count > fixed.pointers {
        errors.report(
            pos.clone(),
            format!(
                "Struct exceeds its fixed size: it needs {} pointers but is declared with {}.",
                layout.pointer_count, fixed.pointers
            ),
        );
    }
}

/// Pack every numbered item of one struct.
pub(crate) fn pack_struct(
    mut items: Vec<Packable>,
    fixed: Option<(&FixedSpec, &SourcePos)>,
    errors: &mut Diagnostics,
) -> StructLayout {
    tracing::trace!(items = items.len(), "packing struct");
    items.sort_by_key(|item| item.number());

    let mut state = PackingState::default();
    let mut unions: BTreeMap<u32, UnionSlots> = BTreeMap::new();
    let mut offsets = BTreeMap::new();

    for item in items {
        let offset = match item {
            Packable::Field { size, .. } => state.pack_value(size),
            Packable::UnionTag { .. } => FieldOffset::Data {
                size: DataSize::Size16,
                offset: state.pack_data(DataSize::Size16),
            },
            Packable::UnionMember { union, size, .. } => {
                let slots = unions.entry(union).or_default();
                pack_unionized_value(&mut state, slots, size)
            }
        };
        offsets.insert(item.number().min(u16::MAX as u32) as u16, offset);
    }

    let data_size = if state.data_words == 1 {
        state.strip_holes_from_first_word()
    } else {
        DataSectionSize::Words(state.data_words)
    };
    let layout = StructLayout {
        data_size,
        pointer_count: state.pointer_count,
        offsets,
    };
    if let Some((request, pos)) = fixed {
        enforce_fixed(&layout, request, pos, errors);
    }
    layout
}
