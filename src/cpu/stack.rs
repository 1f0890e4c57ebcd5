//! Stack primitives and call frame linkage.
//!
//! A frame is nothing more than two words pushed onto the ordinary stack:
//!
//! ```text
//!   FP+3  saved PC (high)
//!   FP+2  saved PC (low)
//!   FP+1  saved FP (high)
//!   FP    saved FP (low)     <- FP
//!   FP-1  first free byte    <- SP right after the call
//! ```
//!
//! Programs are free to read and rewrite these words.

use crate::cpu::Cpu;
use crate::cpu::io::IoPort;

impl<P: IoPort> Cpu<P> {
    /// Push a word. High byte goes in first so the word reads back
    /// little-endian at SP+1.
    pub fn push_word(&mut self, value: u16) {
        self.mem.write_byte(self.regs.sp, (value >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.mem.write_byte(self.regs.sp, value as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
    }

    /// Pop a word pushed by [`Cpu::push_word`].
    pub fn pop_word(&mut self) -> u16 {
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let lo = self.mem.read_byte(self.regs.sp) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = self.mem.read_byte(self.regs.sp) as u16;
        lo | (hi << 8)
    }

    /// Save PC and FP, open a new frame and jump to `target`.
    pub fn call(&mut self, target: u16) {
        self.push_word(self.regs.pc);
        self.push_word(self.regs.fp);
        self.regs.fp = self.regs.sp.wrapping_add(1);
        self.regs.jump(target);
    }

    /// Drop the current frame's locals and restore the caller's FP and PC.
    pub fn ret(&mut self) {
        self.regs.sp = self.regs.fp.wrapping_sub(1);
        self.regs.fp = self.pop_word();
        let pc = self.pop_word();
        self.regs.jump(pc);
    }

    /// Reserve callee stack space. The byte count is the first byte at the
    /// callee's entry point, so this runs after [`Cpu::call`].
    pub(crate) fn reserve_frame(&mut self) {
        let size = self.fetch_byte() as u16;
        self.regs.sp = self.regs.sp.wrapping_sub(size);
    }
}
