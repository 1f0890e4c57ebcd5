//! Addressing modes and the operand stream.
//!
//! Every mode except `Fast` reads its displacement or address from the
//! bytes following the opcode, advancing PC as it goes.

use crate::cpu::Cpu;
use crate::cpu::io::IoPort;
use serde::{Serialize, Deserialize};

/// FP-relative offsets selected by a 4-bit fast index.
///
/// Indices 0-11 are local slots below the frame, 12-15 are parameter
/// slots above the saved PC/FP pair.
pub const FAST_OFFSETS: [i16; 16] = [
    -24, -22, -20, -18, -16, -14, -12, -10, -8, -6, -4, -2,
    4, 6, 8, 10,
];

/// Effective-address computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddrMode {
    /// FP + FAST_OFFSETS[index & 15]; no operand bytes.
    Fast(u8),
    /// FP + sign-extended 8-bit operand.
    Near,
    /// FP + 16-bit operand.
    Far,
    /// 16-bit operand used as-is.
    Absolute,
}

/// Address of fast slot `index` in the frame based at `fp`.
#[inline]
pub fn fast_address(fp: u16, index: u8) -> u16 {
    fp.wrapping_add(FAST_OFFSETS[(index & 0x0f) as usize] as u16)
}

impl<P: IoPort> Cpu<P> {
    /// Read the next byte of the instruction stream.
    #[inline]
    pub fn fetch_byte(&mut self) -> u8 {
        let pc = self.regs.advance_pc();
        self.mem.read_byte(pc)
    }

    /// Read the next little-endian word of the instruction stream.
    #[inline]
    pub fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte() as u16;
        let hi = self.fetch_byte() as u16;
        lo | (hi << 8)
    }

    /// Read the next byte and sign-extend it to 16 bits.
    #[inline]
    pub fn fetch_sext8(&mut self) -> u16 {
        self.fetch_byte() as i8 as i16 as u16
    }

    /// Resolve an effective address, consuming operand bytes as needed.
    pub fn effective_address(&mut self, mode: AddrMode) -> u16 {
        match mode {
            AddrMode::Fast(index) => fast_address(self.regs.fp, index),
            AddrMode::Near => {
                let disp = self.fetch_sext8();
                self.regs.fp.wrapping_add(disp)
            }
            AddrMode::Far => {
                let disp = self.fetch_word();
                self.regs.fp.wrapping_add(disp)
            }
            AddrMode::Absolute => self.fetch_word(),
        }
    }
}
