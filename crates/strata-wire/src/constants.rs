//! Wire-format constants.

/// Maximum declaration number (field, enumerant, or method ordinal).
///
/// Ordinals are encoded as 16-bit values on the wire; 65535 is reserved.
pub const MAX_ORDINAL: u16 = 65534;

/// Bits per data-section word.
pub const WORD_BITS: u32 = 64;
