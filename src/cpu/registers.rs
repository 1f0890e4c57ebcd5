//! Sea16 CPU registers.
//!
//! Sea16 has five 16-bit registers:
//! - A: "left" operand register, receives most results
//! - B: "right" operand register
//! - SP: stack pointer, grows down and points at the next free byte
//! - FP: frame pointer, base of the active call frame
//! - PC: program counter

use serde::{Serialize, Deserialize};

/// Initial value of SP and FP: the very top of memory.
pub const STACK_TOP: u16 = 0xFFFF;

/// The Sea16 register file.
///
/// The struct is `Copy`, so a snapshot is just a copy of it. Its `Display`
/// form is the one-line trace format, trailing space included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub a: u16,
    pub b: u16,
    pub sp: u16,
    pub fp: u16,
    pub pc: u16,
}

impl Registers {
    /// Create a register file in the reset state.
    pub fn new() -> Self {
        Self {
            a: 0,
            b: 0,
            sp: STACK_TOP,
            fp: STACK_TOP,
            pc: 0,
        }
    }

    /// Return every register to its reset value.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Increment the program counter by 1, wrapping.
    /// Returns the old value.
    #[inline]
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an absolute address.
    #[inline]
    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Registers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "A:{:04x} B:{:04x} PC:{:04x} SP:{:04x} FP:{:04x} ",
            self.a, self.b, self.pc, self.sp, self.fp
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_state() {
        let regs = Registers::new();
        assert_eq!(regs.a, 0);
        assert_eq!(regs.b, 0);
        assert_eq!(regs.pc, 0);
        assert_eq!(regs.sp, 0xFFFF);
        assert_eq!(regs.fp, 0xFFFF);
    }

    #[test]
    fn test_advance_pc_wraps() {
        let mut regs = Registers::new();
        regs.pc = 0xFFFF;

        let old = regs.advance_pc();
        assert_eq!(old, 0xFFFF);
        assert_eq!(regs.pc, 0);
    }

    #[test]
    fn test_trace_format() {
        let regs = Registers { a: 0x12, b: 0xabcd, sp: 0xfffb, fp: 0xffff, pc: 0x100 };
        assert_eq!(
            regs.to_string(),
            "A:0012 B:abcd PC:0100 SP:fffb FP:ffff "
        );
    }

    #[test]
    fn test_reset_restores_everything() {
        let mut regs = Registers { a: 1, b: 2, sp: 3, fp: 4, pc: 5 };
        regs.reset();
        assert_eq!(regs, Registers::default());
    }
}
