//! Bit-field operands for `sloadbf`, `uloadbf` and `storebf`.
//!
//! The operand byte packs the field's position: high nibble is the start
//! bit, low nibble is the width minus one. Fields that run past bit 15 are
//! truncated at the top of the word.

use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitField {
    /// Lowest bit of the field, 0-15.
    pub start: u8,
    /// Number of bits, 1-16.
    pub width: u8,
}

impl BitField {
    /// Unpack an operand byte.
    pub fn from_operand(byte: u8) -> Self {
        Self {
            start: byte >> 4,
            width: (byte & 0x0f) + 1,
        }
    }

    /// Pack back into an operand byte.
    #[cfg(test)]
    fn operand(self) -> u8 {
        (self.start << 4) | ((self.width - 1) & 0x0f)
    }

    /// Mask of `width` low bits.
    #[inline]
    pub fn mask(self) -> u16 {
        0xFFFF >> (16 - self.width as u32)
    }

    /// The field's bits from `word`, zero-extended.
    pub fn extract(self, word: u16) -> u16 {
        (word >> self.start) & self.mask()
    }

    /// The field's bits from `word`, sign-extended from the field's top bit.
    pub fn extract_signed(self, word: u16) -> u16 {
        let value = self.extract(word);
        let sign = 1u16 << (self.width - 1);
        if value & sign != 0 {
            value | !self.mask()
        } else {
            value
        }
    }

    /// `word` with the field replaced by the low bits of `value`.
    pub fn insert(self, word: u16, value: u16) -> u16 {
        let mask = self.mask();
        (word & !(mask << self.start)) | ((value & mask) << self.start)
    }
}
