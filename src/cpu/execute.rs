//! CPU execution engine for Sea16.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.
//! There is no halt instruction: the host decides how many steps to run.

use crate::cpu::{Memory, Registers};
use crate::cpu::addressing::{fast_address, AddrMode};
use crate::cpu::bitfield::BitField;
use crate::cpu::decode::{self, BlockOp, DecodeError, DirectCount, DirectMode, Op, Opcode};
use crate::cpu::io::{BufferedIo, IoPort};
use crate::cpu::memory::MemoryError;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The reset image: `jump -1` at address 0, a one-instruction loop.
pub const BOOT_LOOP: [u8; 2] = [0xd9, 0x01];

/// Behaviors kept for compatibility with existing Sea16 programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quirks {
    /// When `switchrange` misses its bounds it loads PC with the default
    /// address and then still indexes the jump table, using the default
    /// address as the table base. Clear this to make a miss land on the
    /// default address.
    pub switchrange_discards_default: bool,
    /// `jumpt -xx` and `jumpf -xx` land `xx - 1` bytes before the end of
    /// the operand, two bytes past where `jump -xx` lands. Clear this to
    /// give all three back branches the `jump -xx` displacement.
    pub short_conditional_back_branch: bool,
    /// `blda far` and `bldb far` load a whole word. Clear this to make
    /// them zero-extended byte loads like their absolute forms.
    pub far_byte_loads_read_word: bool,
    /// `swap` leaves both registers unchanged. Clear this to exchange
    /// A and B.
    pub swap_is_noop: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            switchrange_discards_default: true,
            short_conditional_back_branch: true,
            far_byte_loads_read_word: true,
            swap_is_noop: true,
        }
    }
}

/// Called with the registers before every step.
pub type TraceHook = Box<dyn FnMut(&Registers)>;

/// Counts reported by [`Cpu::run`] and [`Cpu::run_until`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Steps taken, illegal opcodes included.
    pub steps: u64,
    /// Steps that hit an illegal opcode.
    pub illegal: u64,
}

/// The Sea16 CPU.
pub struct Cpu<P: IoPort = BufferedIo> {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Device behind port 0.
    pub io: P,
    /// Compatibility switches.
    pub quirks: Quirks,
    /// Steps executed since reset.
    pub cycles: u64,
    trace: Option<TraceHook>,
}

impl Cpu<BufferedIo> {
    /// Create a CPU in the reset state with an empty in-memory port.
    pub fn new() -> Self {
        Self::with_io(BufferedIo::new())
    }
}

impl<P: IoPort> Cpu<P> {
    /// Create a CPU in the reset state wired to `io`.
    pub fn with_io(io: P) -> Self {
        let mut cpu = Self {
            regs: Registers::new(),
            mem: Memory::new(),
            io,
            quirks: Quirks::default(),
            cycles: 0,
            trace: None,
        };
        cpu.reset();
        cpu
    }

    /// Reset registers and memory. Memory is zeroed apart from the boot
    /// loop at address 0.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.mem.write_byte(0, BOOT_LOOP[0]);
        self.mem.write_byte(1, BOOT_LOOP[1]);
        self.cycles = 0;
    }

    /// Copy a raw image to address 0, on top of the current memory.
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_image(image)?;
        log::debug!("loaded {} byte image", image.len());
        Ok(())
    }

    /// Install a hook that sees the registers before every step.
    pub fn set_trace_hook(&mut self, hook: impl FnMut(&Registers) + 'static) {
        self.trace = Some(Box::new(hook));
    }

    /// Remove the trace hook.
    pub fn clear_trace_hook(&mut self) {
        self.trace = None;
    }

    /// Execute a single instruction.
    ///
    /// Returns the opcode that was executed. An illegal opcode is reported
    /// as an error, but the CPU is left in a consistent state: PC points
    /// just past the opcode byte and stepping can continue. Any operand
    /// bytes that were meant to follow it are decoded as opcodes next.
    pub fn step(&mut self) -> Result<Opcode, CpuError> {
        if let Some(hook) = self.trace.as_mut() {
            hook(&self.regs);
        }

        // Fetch
        let addr = self.regs.pc;
        let byte = self.fetch_byte();
        self.cycles += 1;

        // Decode
        let opcode = match decode::decode(byte) {
            Ok(opcode) => opcode,
            Err(DecodeError::Illegal(opcode)) => {
                log::warn!("illegal opcode {:#04x} at {:#06x}", opcode, addr);
                return Err(CpuError::IllegalOpcode { opcode, addr });
            }
        };
        log::trace!("{:04x}: {}", addr, opcode);

        // Execute
        self.execute(opcode);

        Ok(opcode)
    }

    /// Run exactly `steps` instructions. Illegal opcodes are counted and
    /// skipped over.
    pub fn run(&mut self, steps: u64) -> RunSummary {
        self.run_until(steps, |_| false)
    }

    /// Run until `stop` returns true (checked before each step) or
    /// `max_steps` instructions have executed.
    pub fn run_until<F>(&mut self, max_steps: u64, mut stop: F) -> RunSummary
    where
        F: FnMut(&Self) -> bool,
    {
        let mut summary = RunSummary::default();

        while summary.steps < max_steps && !stop(self) {
            if self.step().is_err() {
                summary.illegal += 1;
            }
            summary.steps += 1;
        }

        summary
    }

    /// Execute a decoded opcode. PC is already past the opcode byte.
    fn execute(&mut self, opcode: Opcode) {
        match opcode {
            Opcode::Block { op, nibble } => self.execute_block(op, nibble),
            Opcode::Exact(op) => self.execute_exact(op),
        }
    }

    fn execute_block(&mut self, op: BlockOp, nibble: u8) {
        let n = nibble as u16;
        match op {
            BlockOp::LoadA => self.regs.a = self.load_word(AddrMode::Fast(nibble)),
            BlockOp::LoadB => self.regs.b = self.load_word(AddrMode::Fast(nibble)),
            BlockOp::Push => {
                let value = self.load_word(AddrMode::Fast(nibble));
                self.push_word(value);
            }
            BlockOp::StoreA => self.store_word(AddrMode::Fast(nibble)),
            BlockOp::LoadImmA => self.regs.a = n,
            BlockOp::LoadImmB => self.regs.b = n,
            BlockOp::PushImm => self.push_word(n),
            BlockOp::AddImm => self.regs.a = self.regs.a.wrapping_add(n),
        }
    }

    fn execute_exact(&mut self, op: Op) {
        let a = self.regs.a;
        let b = self.regs.b;

        match op {
            // ==================== Frame-relative words ====================

            Op::LdaNear => self.regs.a = self.load_word(AddrMode::Near),
            Op::LdaFar => self.regs.a = self.load_word(AddrMode::Far),
            Op::LdbNear => self.regs.b = self.load_word(AddrMode::Near),
            Op::LdbFar => self.regs.b = self.load_word(AddrMode::Far),
            Op::PushNear => {
                let value = self.load_word(AddrMode::Near);
                self.push_word(value);
            }
            Op::PushFar => {
                let value = self.load_word(AddrMode::Far);
                self.push_word(value);
            }
            Op::StaNear => self.store_word(AddrMode::Near),
            Op::StaFar => self.store_word(AddrMode::Far),

            // ==================== Immediates ====================

            Op::LdaImm8 => self.regs.a = self.fetch_sext8(),
            Op::LdaImm16 => self.regs.a = self.fetch_word(),
            Op::LdbImm8 => self.regs.b = self.fetch_sext8(),
            Op::LdbImm16 => self.regs.b = self.fetch_word(),
            Op::PushImm8 => {
                let value = self.fetch_sext8();
                self.push_word(value);
            }
            Op::PushImm16 => {
                let value = self.fetch_word();
                self.push_word(value);
            }
            Op::AddImm8 => self.regs.a = a.wrapping_add(self.fetch_sext8()),
            Op::AddImm16 => self.regs.a = a.wrapping_add(self.fetch_word()),

            // ==================== Absolute and byte-wide ====================

            Op::LdaAbs => self.regs.a = self.load_word(AddrMode::Absolute),
            Op::LdbAbs => self.regs.b = self.load_word(AddrMode::Absolute),
            Op::PushAbs => {
                let value = self.load_word(AddrMode::Absolute);
                self.push_word(value);
            }
            Op::StaAbs => self.store_word(AddrMode::Absolute),

            Op::BldaAbs => self.regs.a = self.load_byte(AddrMode::Absolute),
            Op::BldbAbs => self.regs.b = self.load_byte(AddrMode::Absolute),
            Op::BpushAbs => {
                let value = self.load_byte(AddrMode::Absolute);
                self.push_word(value);
            }
            Op::BstaAbs => self.store_byte(AddrMode::Absolute),

            Op::BldaFar => self.regs.a = self.load_far_byte(),
            Op::BldbFar => self.regs.b = self.load_far_byte(),
            Op::BpushFar => {
                let value = self.load_byte(AddrMode::Far);
                self.push_word(value);
            }
            Op::BstaFar => self.store_byte(AddrMode::Far),

            Op::LeaaFar => self.regs.a = self.effective_address(AddrMode::Far),
            Op::LeabFar => self.regs.b = self.effective_address(AddrMode::Far),
            Op::PeaFar => {
                let addr = self.effective_address(AddrMode::Far);
                self.push_word(addr);
            }

            Op::Reserved9F | Op::ReservedAC | Op::ReservedAD => {}

            // ==================== Indirect and stack ====================

            Op::Deref => self.regs.a = self.mem.read_word(a),
            Op::PopStore => {
                self.regs.b = self.pop_word();
                self.mem.write_word(self.regs.b, a);
            }
            Op::Bderef => self.regs.a = self.mem.read_byte(a) as u16,
            Op::BpopStore => {
                self.regs.b = self.pop_word();
                self.mem.write_byte(self.regs.b, a as u8);
            }
            Op::Pha => self.push_word(a),
            Op::Plb => self.regs.b = self.pop_word(),
            Op::Unstack8 => {
                let size = self.fetch_byte() as u16;
                self.regs.sp = self.regs.sp.wrapping_add(size);
            }
            Op::Unstack16 => {
                let size = self.fetch_word();
                self.regs.sp = self.regs.sp.wrapping_add(size);
            }
            Op::LdaSp => self.regs.a = self.regs.sp,
            Op::StaSp => self.regs.sp = a,
            Op::Zalloc => {
                let size = self.fetch_byte() as u16;
                self.regs.sp = self.regs.sp.wrapping_sub(size);
                self.mem.fill_zero(self.regs.sp, size);
            }

            // ==================== Calls ====================

            Op::Call => {
                let target = self.fetch_word();
                self.call(target);
            }
            Op::CallPtr => self.call(a),
            Op::CallReserve => {
                let target = self.fetch_word();
                self.call(target);
                self.reserve_frame();
            }
            Op::CallPtrReserve => {
                self.call(a);
                self.reserve_frame();
            }
            Op::Return => self.ret(),

            // ==================== Comparison ====================

            Op::Ucmplt => self.regs.a = (a < b) as u16,
            Op::Ucmple => self.regs.a = (a <= b) as u16,
            Op::Ucmpgt => self.regs.a = (a > b) as u16,
            Op::Ucmpge => self.regs.a = (a >= b) as u16,
            Op::Scmplt => self.regs.a = ((a as i16) < (b as i16)) as u16,
            Op::Scmple => self.regs.a = ((a as i16) <= (b as i16)) as u16,
            Op::Scmpgt => self.regs.a = ((a as i16) > (b as i16)) as u16,
            Op::Scmpge => self.regs.a = ((a as i16) >= (b as i16)) as u16,
            Op::Cmpeq => self.regs.a = (a == b) as u16,
            Op::Cmpne => self.regs.a = (a != b) as u16,

            // ==================== Arithmetic and logic ====================

            Op::Swap => {
                if !self.quirks.swap_is_noop {
                    std::mem::swap(&mut self.regs.a, &mut self.regs.b);
                }
            }
            Op::Not => self.regs.a = (a == 0) as u16,
            Op::Neg => self.regs.a = a.wrapping_neg(),
            Op::Compl => self.regs.a = !a,
            Op::And => self.regs.a = a & b,
            Op::Or => self.regs.a = a | b,
            Op::Xor => self.regs.a = a ^ b,
            Op::Add => self.regs.a = a.wrapping_add(b),
            Op::Dec => self.regs.a = a.wrapping_sub(1),
            Op::Rsub => self.regs.a = b.wrapping_sub(a),
            Op::Sub => self.regs.a = a.wrapping_sub(b),
            Op::Mult => self.regs.a = a.wrapping_mul(b),
            Op::Lshift => self.regs.a = a.checked_shl(b as u32).unwrap_or(0),
            Op::Double => self.regs.a = a.wrapping_shl(1),
            Op::Rshift => self.regs.a = a.checked_shr(b as u32).unwrap_or(0),
            Op::Arshift => self.regs.a = ((a as i16) >> b.min(15)) as u16,
            Op::Divu => self.regs.a = divide_unsigned(a, b),
            Op::Divs => self.regs.a = divide_signed(a, b),
            Op::Modu => self.regs.a = modulo_unsigned(a, b),
            Op::Mods => self.regs.a = modulo_signed(a, b),
            Op::ExtendA => self.regs.a = a as u8 as i8 as i16 as u16,
            Op::ExtendB => self.regs.b = b as u8 as i8 as i16 as u16,

            // ==================== Bit fields ====================

            Op::Sloadbf => {
                let field = BitField::from_operand(self.fetch_byte());
                self.regs.a = field.extract_signed(b);
            }
            Op::Uloadbf => {
                let field = BitField::from_operand(self.fetch_byte());
                self.regs.a = field.extract(b);
            }
            Op::Storebf => {
                let field = BitField::from_operand(self.fetch_byte());
                self.regs.b = field.insert(b, a);
            }

            // ==================== Control flow ====================

            Op::JumptFwd => self.branch_forward(a != 0),
            Op::JumptBack => self.branch_back_conditional(a != 0),
            Op::JumptAbs => self.branch_absolute(a != 0),
            Op::JumpfFwd => self.branch_forward(a == 0),
            Op::JumpfBack => self.branch_back_conditional(a == 0),
            Op::JumpfAbs => self.branch_absolute(a == 0),
            Op::JumpFwd => self.branch_forward(true),
            Op::JumpBack => self.branch_back(true),
            Op::JumpAbs => self.branch_absolute(true),
            Op::SwitchRange => self.switch_range(),
            Op::SwitchList => self.switch_list(),

            // ==================== Port I/O ====================

            Op::In => {
                let port = self.fetch_byte();
                if port == 0 {
                    self.regs.a = self.io.input().map_or(0xFFFF, u16::from);
                } else {
                    log::debug!("in from unmapped port {}", port);
                }
            }
            Op::Out => {
                let port = self.fetch_byte();
                if port == 0 {
                    self.io.output(a as u8);
                } else {
                    log::debug!("out to unmapped port {}: {:#04x}", port, a as u8);
                }
            }

            // ==================== Block memory ====================

            Op::MemCopy => {
                let count = self.fetch_word();
                for _ in 0..count {
                    let value = self.mem.read_byte(self.regs.a);
                    self.mem.write_byte(self.regs.b, value);
                    self.regs.a = self.regs.a.wrapping_add(1);
                    self.regs.b = self.regs.b.wrapping_add(1);
                }
            }
            Op::MemFill => {
                let count = self.fetch_word();
                for _ in 0..count {
                    self.mem.write_byte(self.regs.b, a as u8);
                    self.regs.b = self.regs.b.wrapping_add(1);
                }
            }
            Op::MemCompare => self.mem_compare(),

            Op::DirectCount => {
                let operand = DirectCount::from_operand(self.fetch_byte());
                self.direct_count(operand);
            }
        }
    }

    /// Load a word through an addressing mode.
    fn load_word(&mut self, mode: AddrMode) -> u16 {
        let addr = self.effective_address(mode);
        self.mem.read_word(addr)
    }

    /// Load a byte through an addressing mode, zero-extended.
    fn load_byte(&mut self, mode: AddrMode) -> u16 {
        let addr = self.effective_address(mode);
        self.mem.read_byte(addr) as u16
    }

    /// Operand of `blda far` / `bldb far`.
    fn load_far_byte(&mut self) -> u16 {
        if self.quirks.far_byte_loads_read_word {
            self.load_word(AddrMode::Far)
        } else {
            self.load_byte(AddrMode::Far)
        }
    }

    fn store_word(&mut self, mode: AddrMode) {
        let addr = self.effective_address(mode);
        self.mem.write_word(addr, self.regs.a);
    }

    fn store_byte(&mut self, mode: AddrMode) {
        let addr = self.effective_address(mode);
        self.mem.write_byte(addr, self.regs.a as u8);
    }

    /// `+xx` form: lands `xx + 1` bytes past the operand.
    fn branch_forward(&mut self, taken: bool) {
        let disp = self.fetch_byte() as u16;
        if taken {
            self.regs.jump(self.regs.pc.wrapping_add(disp + 1));
        }
    }

    /// `-xx` form: lands `xx + 1` bytes before the end of the operand.
    fn branch_back(&mut self, taken: bool) {
        let disp = self.fetch_byte() as u16;
        if taken {
            self.regs.jump(self.regs.pc.wrapping_sub(disp + 1));
        }
    }

    /// `jumpt -xx` / `jumpf -xx`.
    fn branch_back_conditional(&mut self, taken: bool) {
        if !self.quirks.short_conditional_back_branch {
            return self.branch_back(taken);
        }
        let disp = self.fetch_byte() as u16;
        if taken {
            self.regs.jump(self.regs.pc.wrapping_sub(disp).wrapping_add(1));
        }
    }

    fn branch_absolute(&mut self, taken: bool) {
        let target = self.fetch_word();
        if taken {
            self.regs.jump(target);
        }
    }

    /// `switchrange low, high, default` followed by the jump table.
    fn switch_range(&mut self) {
        let low = self.fetch_word();
        let high = self.fetch_word();
        let default = self.fetch_word();
        let a = self.regs.a;

        if a < low || a > high {
            self.regs.jump(default);
            if !self.quirks.switchrange_discards_default {
                return;
            }
        }

        // Table base is the current PC, which is the default address on a miss.
        let offset = a.wrapping_sub(low).wrapping_mul(2);
        let entry = self.regs.pc.wrapping_add(offset);
        self.regs.jump(self.mem.read_word(entry));
    }

    /// `switchlist count, (value, target)*, default`.
    fn switch_list(&mut self) {
        let count = self.fetch_word();

        for _ in 0..count {
            let value = self.fetch_word();
            let target = self.fetch_word();
            if self.regs.a == value {
                self.regs.jump(target);
                return;
            }
        }

        let default = self.fetch_word();
        self.regs.jump(default);
    }

    /// Compare `count` bytes at A and B. A ends up 1 if A's range is
    /// greater at the first difference, 0xFFFF if smaller, 0 if equal.
    /// A and B are left pointing at the first differing byte.
    fn mem_compare(&mut self) {
        let count = self.fetch_word();
        let mut result = 0u16;

        for _ in 0..count {
            let left = self.mem.read_byte(self.regs.a);
            let right = self.mem.read_byte(self.regs.b);
            if left != right {
                result = if left > right { 1 } else { 0xFFFF };
                break;
            }
            self.regs.a = self.regs.a.wrapping_add(1);
            self.regs.b = self.regs.b.wrapping_add(1);
        }

        self.regs.a = result;
    }

    /// Walk the pointer held in a fast slot.
    fn direct_count(&mut self, operand: DirectCount) {
        let slot = fast_address(self.regs.fp, operand.slot);
        let ptr = self.mem.read_word(slot);

        match operand.mode {
            DirectMode::LoadAdvance => {
                self.regs.a = if operand.is_word() {
                    self.mem.read_word(ptr)
                } else {
                    self.mem.read_byte(ptr) as u16
                };
            }
            DirectMode::StoreAdvance => {
                if operand.is_word() {
                    self.mem.write_word(ptr, self.regs.a);
                } else {
                    self.mem.write_byte(ptr, self.regs.a as u8);
                }
            }
            DirectMode::Adjust | DirectMode::AdjustLoad => {}
        }

        let next = ptr.wrapping_add(operand.step as u16);
        self.mem.write_word(slot, next);

        if operand.mode == DirectMode::AdjustLoad {
            self.regs.a = next;
        }
    }
}

/// Unsigned division. Dividing by zero yields 0xFFFF.
fn divide_unsigned(a: u16, b: u16) -> u16 {
    a.checked_div(b).unwrap_or(0xFFFF)
}

/// Signed division, truncating toward zero. Dividing by zero yields
/// 0xFFFF; 0x8000 / -1 wraps to 0x8000.
fn divide_signed(a: u16, b: u16) -> u16 {
    if b == 0 {
        return 0xFFFF;
    }
    (a as i16).wrapping_div(b as i16) as u16
}

/// Unsigned remainder. A zero divisor leaves the dividend.
fn modulo_unsigned(a: u16, b: u16) -> u16 {
    a.checked_rem(b).unwrap_or(a)
}

/// Signed remainder, sign follows the dividend. A zero divisor leaves
/// the dividend.
fn modulo_signed(a: u16, b: u16) -> u16 {
    if b == 0 {
        return a;
    }
    (a as i16).wrapping_rem(b as i16) as u16
}

impl Default for Cpu<BufferedIo> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: IoPort> std::fmt::Debug for Cpu<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("quirks", &self.quirks)
            .field("trace", &self.trace.is_some())
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    /// The byte at `addr` is not an opcode. Execution can continue.
    #[error("illegal opcode {opcode:#04x} at {addr:#06x}")]
    IllegalOpcode { opcode: u8, addr: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// CPU with `program` loaded at 0x0100 and PC pointing at it.
    fn cpu_with(program: &[u8]) -> Cpu {
        let mut cpu = Cpu::new();
        for (i, &byte) in program.iter().enumerate() {
            cpu.mem.write_byte(0x0100 + i as u16, byte);
        }
        cpu.regs.pc = 0x0100;
        cpu
    }

    #[test]
    fn test_reset_image() {
        let cpu = Cpu::new();
        assert_eq!(cpu.mem.read_byte(0), 0xd9);
        assert_eq!(cpu.mem.read_byte(1), 0x01);
        assert_eq!(cpu.regs, Registers::new());
    }

    #[test]
    fn test_boot_loop_holds() {
        let mut cpu = Cpu::new();
        for _ in 0..10 {
            cpu.step().unwrap();
            assert_eq!(cpu.regs, Registers::new());
        }
        assert_eq!(cpu.cycles, 10);
    }

    #[test]
    fn test_add_imm_wraps() {
        let mut cpu = cpu_with(&[0x71]);
        cpu.regs.a = 0xFFFF;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.a, 0);
    }

    #[test]
    fn test_block_fast_load_store() {
        // lda #9; sta fast 11; ldb fast 11
        let mut cpu = cpu_with(&[0x49, 0x3b, 0x1b]);
        cpu.regs.fp = 0x8000;
        cpu.run(3);

        assert_eq!(cpu.mem.read_word(0x8000 - 2), 9);
        assert_eq!(cpu.regs.b, 9);
    }

    #[test]
    fn test_sign_extended_immediates() {
        // lda #-2; ldb #0x1234; push #-1
        let mut cpu = cpu_with(&[0x88, 0xFE, 0x8b, 0x34, 0x12, 0x8c, 0xFF]);
        cpu.run(3);

        assert_eq!(cpu.regs.a, 0xFFFE);
        assert_eq!(cpu.regs.b, 0x1234);
        assert_eq!(cpu.pop_word(), 0xFFFF);
    }

    #[test]
    fn test_byte_loads_zero_extend() {
        let mut cpu = cpu_with(&[0x94, 0x00, 0x20, 0x95, 0x01, 0x20]);
        cpu.mem.write_word(0x2000, 0xFF80);
        cpu.run(2);

        assert_eq!(cpu.regs.a, 0x0080);
        assert_eq!(cpu.regs.b, 0x00FF);
    }

    #[test]
    fn test_far_byte_loads() {
        // blda far 0; bldb far 0
        let program = [0x98, 0x00, 0x00, 0x99, 0x00, 0x00];

        let mut cpu = cpu_with(&program);
        cpu.regs.fp = 0x2000;
        cpu.mem.write_word(0x2000, 0xBBAA);
        cpu.run(2);
        assert_eq!((cpu.regs.a, cpu.regs.b), (0xBBAA, 0xBBAA));

        let mut cpu = cpu_with(&program);
        cpu.quirks.far_byte_loads_read_word = false;
        cpu.regs.fp = 0x2000;
        cpu.mem.write_word(0x2000, 0xBBAA);
        cpu.run(2);
        assert_eq!((cpu.regs.a, cpu.regs.b), (0x00AA, 0x00AA));
    }

    #[test]
    fn test_byte_store() {
        // bsta abs 0x3000
        let mut cpu = cpu_with(&[0x97, 0x00, 0x30]);
        cpu.mem.write_word(0x3000, 0xAAAA);
        cpu.regs.a = 0x1234;
        cpu.step().unwrap();

        assert_eq!(cpu.mem.read_word(0x3000), 0xAA34);
    }

    #[test]
    fn test_lea_and_pea() {
        // leaa far -4; pea far 6
        let mut cpu = cpu_with(&[0x9c, 0xFC, 0xFF, 0x9e, 0x06, 0x00]);
        cpu.regs.fp = 0x4000;
        cpu.run(2);

        assert_eq!(cpu.regs.a, 0x3FFC);
        assert_eq!(cpu.pop_word(), 0x4006);
    }

    #[test]
    fn test_reserved_is_noop() {
        for op in [0x9f, 0xac, 0xad] {
            let mut cpu = cpu_with(&[op]);
            cpu.regs.a = 1;
            cpu.regs.b = 2;
            let before = cpu.regs;

            cpu.step().unwrap();

            assert_eq!(cpu.regs.pc, before.pc + 1);
            assert_eq!(Registers { pc: before.pc, ..cpu.regs }, before);
        }
    }

    #[test]
    fn test_illegal_opcode_is_nonfatal() {
        // illegal 0xf0, then what looks like its operand: lda #5
        let mut cpu = cpu_with(&[0xf0, 0x45]);

        let err = cpu.step().unwrap_err();
        assert_eq!(err, CpuError::IllegalOpcode { opcode: 0xf0, addr: 0x0100 });
        assert_eq!(cpu.regs.pc, 0x0101);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.a, 5);
    }

    #[test]
    fn test_run_counts_illegal() {
        let mut cpu = cpu_with(&[0xff, 0xfe, 0x41]);
        let summary = cpu.run(3);
        assert_eq!(summary, RunSummary { steps: 3, illegal: 2 });
        assert_eq!(cpu.regs.a, 1);
    }

    #[test]
    fn test_run_until_stops_on_condition() {
        // add #1; jump -3
        let mut cpu = cpu_with(&[0x71, 0xd9, 0x02]);
        let summary = cpu.run_until(1000, |cpu| cpu.regs.a == 5);

        assert_eq!(cpu.regs.a, 5);
        assert_eq!(summary.steps, 9);
    }

    #[test]
    fn test_indirect_ops() {
        // push #0x3000; lda #7; popstore; lda #0; lda #xxxx 0x3000; deref
        let mut cpu = cpu_with(&[0x8d, 0x00, 0x30, 0x47, 0xa1, 0x89, 0x00, 0x30, 0xa0]);
        cpu.run(5);

        assert_eq!(cpu.regs.b, 0x3000);
        assert_eq!(cpu.regs.a, 7);
        assert_eq!(cpu.regs.sp, 0xFFFF);
    }

    #[test]
    fn test_byte_indirect_ops() {
        // push #0x3000; lda #xxxx 0x1234; bpopstore; lda #xxxx 0x3000; bderef
        let mut cpu = cpu_with(&[0x8d, 0x00, 0x30, 0x89, 0x34, 0x12, 0xa3, 0x89, 0x00, 0x30, 0xa2]);
        cpu.mem.write_byte(0x3001, 0x77);
        cpu.run(5);

        assert_eq!(cpu.mem.read_word(0x3000), 0x7734);
        assert_eq!(cpu.regs.a, 0x34);
    }

    #[test]
    fn test_swap() {
        let mut cpu = cpu_with(&[0xaf]);
        cpu.regs.a = 1;
        cpu.regs.b = 2;
        cpu.step().unwrap();
        assert_eq!((cpu.regs.a, cpu.regs.b), (1, 2));
        assert_eq!(cpu.regs.pc, 0x0101);

        let mut cpu = cpu_with(&[0xaf]);
        cpu.quirks.swap_is_noop = false;
        cpu.regs.a = 1;
        cpu.regs.b = 2;
        cpu.step().unwrap();
        assert_eq!((cpu.regs.a, cpu.regs.b), (2, 1));
    }

    #[test]
    fn test_comparisons() {
        let cases: [(u8, u16, u16, u16); 10] = [
            (0xb0, 1, 0xFFFF, 1),
            (0xb1, 5, 5, 1),
            (0xb2, 1, 0xFFFF, 0),
            (0xb3, 4, 5, 0),
            (0xb4, 1, 0xFFFF, 0),
            (0xb5, 0xFFFF, 0xFFFF, 1),
            (0xb6, 1, 0xFFFF, 1),
            (0xb7, 0x8000, 0x7FFF, 0),
            (0xb8, 3, 3, 1),
            (0xb9, 3, 3, 0),
        ];
        for (op, a, b, expected) in cases {
            let mut cpu = cpu_with(&[op]);
            cpu.regs.a = a;
            cpu.regs.b = b;
            cpu.step().unwrap();
            assert_eq!(cpu.regs.a, expected, "opcode {:#04x}", op);
        }
    }

    #[test]
    fn test_arithmetic() {
        let cases: [(u8, u16, u16, u16); 18] = [
            (0xba, 0, 0, 1),
            (0xba, 7, 0, 0),
            (0xbb, 1, 0, 0xFFFF),
            (0xbc, 0x00FF, 0, 0xFF00),
            (0xbd, 0x0FF0, 0x00FF, 0x00F0),
            (0xbe, 0x0F00, 0x00F0, 0x0FF0),
            (0xbf, 0xFFFF, 0x0F0F, 0xF0F0),
            (0xc0, 0xFFFF, 2, 1),
            (0xc1, 0, 0, 0xFFFF),
            (0xc2, 3, 10, 7),
            (0xc3, 3, 10, 0xFFF9),
            (0xc4, 1, 15, 0x8000),
            (0xc4, 1, 16, 0),
            (0xc5, 0x8001, 0, 0x0002),
            (0xc6, 0x8000, 15, 1),
            (0xc7, 0x8000, 15, 0xFFFF),
            (0xc7, 0x8000, 40, 0xFFFF),
            (0xcc, 0x0100, 0x0101, 0x0100),
        ];
        for (op, a, b, expected) in cases {
            let mut cpu = cpu_with(&[op]);
            cpu.regs.a = a;
            cpu.regs.b = b;
            cpu.step().unwrap();
            assert_eq!(cpu.regs.a, expected, "opcode {:#04x} a={:#x} b={:#x}", op, a, b);
        }
    }

    #[test]
    fn test_division() {
        assert_eq!(divide_unsigned(100, 7), 14);
        assert_eq!(modulo_unsigned(100, 7), 2);
        assert_eq!(divide_signed((-7i16) as u16, 2), (-3i16) as u16);
        assert_eq!(modulo_signed((-7i16) as u16, 2), (-1i16) as u16);
        assert_eq!(divide_signed(0x8000, 0xFFFF), 0x8000);
        assert_eq!(modulo_signed(0x8000, 0xFFFF), 0);
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(divide_unsigned(123, 0), 0xFFFF);
        assert_eq!(divide_signed(123, 0), 0xFFFF);
        assert_eq!(modulo_unsigned(123, 0), 123);
        assert_eq!(modulo_signed(0xFF85, 0), 0xFF85);

        let mut cpu = cpu_with(&[0xc8]);
        cpu.regs.a = 9;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.a, 0xFFFF);
    }

    #[test]
    fn test_extend() {
        let mut cpu = cpu_with(&[0xe0, 0xe1]);
        cpu.regs.a = 0x1280;
        cpu.regs.b = 0xFF7F;
        cpu.run(2);
        assert_eq!(cpu.regs.a, 0xFF80);
        assert_eq!(cpu.regs.b, 0x007F);
    }

    #[test]
    fn test_bitfield_ops() {
        // storebf start 4 width 8; uloadbf same; sloadbf same
        let mut cpu = cpu_with(&[0xcf, 0x47, 0xce, 0x47, 0xcd, 0x47]);
        cpu.regs.a = 0x00A5;
        cpu.regs.b = 0xF00F;

        cpu.step().unwrap();
        assert_eq!(cpu.regs.b, 0xFA5F);
        assert_eq!(cpu.regs.a, 0x00A5);

        cpu.regs.a = 0;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.a, 0x00A5);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.a, 0xFFA5);
    }

    #[test]
    fn test_relative_jumps() {
        // jump +2 skips two bytes
        let mut cpu = cpu_with(&[0xd8, 0x01]);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0104);

        // jumpt -xx not taken still consumes its operand
        let mut cpu = cpu_with(&[0xd1, 0x05]);
        cpu.regs.a = 0;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0102);

        // jumpt -xx taken lands two bytes past jump -xx
        let mut cpu = cpu_with(&[0xd1, 0x05]);
        cpu.regs.a = 1;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x00fe);

        // jumpf -xx taken
        let mut cpu = cpu_with(&[0xd5, 0x05]);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x00fe);

        // jump -xx
        let mut cpu = cpu_with(&[0xd9, 0x05]);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x00fc);

        // jumpf +xx taken
        let mut cpu = cpu_with(&[0xd4, 0x10]);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0113);
    }

    #[test]
    fn test_uniform_back_branches() {
        for (opcode, a) in [(0xd1, 1), (0xd5, 0)] {
            let mut cpu = cpu_with(&[opcode, 0x05]);
            cpu.quirks.short_conditional_back_branch = false;
            cpu.regs.a = a;
            cpu.step().unwrap();
            assert_eq!(cpu.regs.pc, 0x00fc);
        }
    }

    #[test]
    fn test_absolute_jumps() {
        let mut cpu = cpu_with(&[0xd6, 0x00, 0x20]);
        cpu.regs.a = 1;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0103);

        let mut cpu = cpu_with(&[0xd2, 0x00, 0x20]);
        cpu.regs.a = 1;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x2000);

        let mut cpu = cpu_with(&[0xda, 0x34, 0x12]);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x1234);
    }

    /// switchrange 10..=12, default 0x0500, table [0x1000, 0x1100, 0x1200]
    fn switch_range_cpu(a: u16) -> Cpu {
        let mut cpu = cpu_with(&[
            0xdc, 10, 0, 12, 0, 0x00, 0x05,
            0x00, 0x10, 0x00, 0x11, 0x00, 0x12,
        ]);
        cpu.regs.a = a;
        cpu
    }

    #[test]
    fn test_switch_range_in_bounds() {
        let mut cpu = switch_range_cpu(11);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x1100);
    }

    #[test]
    fn test_switch_range_miss_reads_past_default() {
        let mut cpu = switch_range_cpu(13);
        cpu.mem.write_word(0x0500 + 6, 0xBEEF);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0xBEEF);
    }

    #[test]
    fn test_switch_range_miss_below_wraps_offset() {
        let mut cpu = switch_range_cpu(9);
        cpu.mem.write_word(0x0500u16.wrapping_sub(2), 0x0CAB);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0CAB);
    }

    #[test]
    fn test_switch_range_miss_without_quirk() {
        let mut cpu = switch_range_cpu(13);
        cpu.quirks.switchrange_discards_default = false;
        cpu.mem.write_word(0x0500 + 6, 0xBEEF);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0500);
    }

    /// switchlist with (3 -> 0x3000), (5 -> 0x5000), default 0x0DEF
    fn switch_list_cpu(a: u16) -> Cpu {
        let mut cpu = cpu_with(&[
            0xdd, 2, 0,
            3, 0, 0x00, 0x30,
            5, 0, 0x00, 0x50,
            0xEF, 0x0D,
        ]);
        cpu.regs.a = a;
        cpu
    }

    #[test]
    fn test_switch_list_match() {
        let mut cpu = switch_list_cpu(5);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x5000);
    }

    #[test]
    fn test_switch_list_default() {
        let mut cpu = switch_list_cpu(4);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0DEF);
    }

    #[test]
    fn test_switch_list_empty() {
        let mut cpu = cpu_with(&[0xdd, 0, 0, 0x22, 0x11]);
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x1122);
    }

    #[test]
    fn test_port_io() {
        // in 0; add #1; out 0; in 0; in 3
        let mut cpu = cpu_with(&[0xde, 0x00, 0x71, 0xdf, 0x00, 0xde, 0x00, 0xde, 0x03]);
        cpu.io.push_input(b"A");

        cpu.run(3);
        assert_eq!(cpu.io.written(), b"B");

        cpu.step().unwrap();
        assert_eq!(cpu.regs.a, 0xFFFF);

        cpu.regs.a = 7;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.a, 7);
        assert_eq!(cpu.regs.pc, 0x0109);
    }

    #[test]
    fn test_out_other_port_discards() {
        let mut cpu = cpu_with(&[0xdf, 0x01]);
        cpu.regs.a = b'x' as u16;
        cpu.step().unwrap();
        assert!(cpu.io.written().is_empty());
    }

    #[test]
    fn test_mem_copy_and_fill() {
        let mut cpu = cpu_with(&[0xe2, 0x03, 0x00, 0xe3, 0x02, 0x00]);
        cpu.mem.write_byte(0x2000, 1);
        cpu.mem.write_byte(0x2001, 2);
        cpu.mem.write_byte(0x2002, 3);
        cpu.regs.a = 0x2000;
        cpu.regs.b = 0x3000;

        cpu.step().unwrap();
        assert_eq!(cpu.mem.dump(0x3000, 3), vec![(0x3000, 1), (0x3001, 2), (0x3002, 3)]);
        assert_eq!(cpu.regs.a, 0x2003);
        assert_eq!(cpu.regs.b, 0x3003);

        cpu.regs.a = 0x00EE;
        cpu.step().unwrap();
        assert_eq!(cpu.mem.read_word(0x3003), 0xEEEE);
        assert_eq!(cpu.regs.b, 0x3005);
    }

    #[test]
    fn test_mem_compare() {
        fn setup(left: &[u8], right: &[u8]) -> Cpu {
            let mut cpu = cpu_with(&[0xe4, left.len() as u8, 0x00]);
            for (i, (&l, &r)) in left.iter().zip(right).enumerate() {
                cpu.mem.write_byte(0x2000 + i as u16, l);
                cpu.mem.write_byte(0x3000 + i as u16, r);
            }
            cpu.regs.a = 0x2000;
            cpu.regs.b = 0x3000;
            cpu.step().unwrap();
            cpu
        }

        let cpu = setup(b"abc", b"abc");
        assert_eq!(cpu.regs.a, 0);
        assert_eq!(cpu.regs.b, 0x3003);

        let cpu = setup(b"abd", b"abc");
        assert_eq!(cpu.regs.a, 1);
        assert_eq!(cpu.regs.b, 0x3002);

        assert_eq!(setup(b"abb", b"abc").regs.a, 0xFFFF);
    }

    #[test]
    fn test_stack_pointer_ops() {
        // lda sp; unstack #4; zalloc #3; sta sp
        let mut cpu = cpu_with(&[0xec, 0xa6, 0x04, 0xee, 0x03, 0xed]);
        cpu.regs.sp = 0x8000;
        cpu.mem.write_byte(0x8001, 0x11);
        cpu.mem.write_byte(0x8002, 0x22);
        cpu.mem.write_byte(0x8003, 0x33);
        cpu.mem.write_byte(0x8004, 0x44);

        cpu.run(2);
        assert_eq!(cpu.regs.a, 0x8000);
        assert_eq!(cpu.regs.sp, 0x8004);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.sp, 0x8001);
        assert_eq!(cpu.mem.dump(0x8001, 4), vec![(0x8001, 0), (0x8002, 0), (0x8003, 0), (0x8004, 0x44)]);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.sp, 0x8000);
    }

    #[test]
    fn test_unstack_word() {
        let mut cpu = cpu_with(&[0xa7, 0x00, 0x01]);
        cpu.regs.sp = 0x7000;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.sp, 0x7100);
    }

    #[test]
    fn test_call_and_return() {
        // 0x0100: call 0x0200; 0x0103: lda #1
        // 0x0200: lda #2; return
        let mut cpu = cpu_with(&[0xa8, 0x00, 0x02, 0x41]);
        cpu.mem.write_byte(0x0200, 0x42);
        cpu.mem.write_byte(0x0201, 0xae);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0200);
        assert_eq!(cpu.regs.fp, 0xFFFC);

        cpu.run(2);
        assert_eq!(cpu.regs.a, 2);
        assert_eq!(cpu.regs.pc, 0x0103);
        assert_eq!(cpu.regs.fp, 0xFFFF);
        assert_eq!(cpu.regs.sp, 0xFFFF);
    }

    #[test]
    fn test_call_reserve_reads_callee_entry() {
        // call 0x0200 reserving the byte found at 0x0200
        let mut cpu = cpu_with(&[0xaa, 0x00, 0x02]);
        cpu.mem.write_byte(0x0200, 6);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0201);
        assert_eq!(cpu.regs.fp, 0xFFFC);
        assert_eq!(cpu.regs.sp, 0xFFFB - 6);
        assert_eq!(cpu.mem.read_word(0xFFFE), 0x0103);
    }

    #[test]
    fn test_callptr() {
        let mut cpu = cpu_with(&[0xa9, 0xab]);
        cpu.regs.a = 0x0400;
        cpu.mem.write_byte(0x0500, 2);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0400);
        assert_eq!(cpu.mem.read_word(0xFFFE), 0x0101);

        cpu.regs.pc = 0x0101;
        cpu.regs.a = 0x0500;
        let sp = cpu.regs.sp;
        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x0501);
        assert_eq!(cpu.regs.sp, sp - 4 - 2);
    }

    #[test]
    fn test_frame_slots_after_call() {
        // push #7 (parameter); call 0x0200
        // 0x0200: lda fast 12 (first parameter)
        let mut cpu = cpu_with(&[0x67, 0xa8, 0x00, 0x02]);
        cpu.mem.write_byte(0x0200, 0x0c);
        cpu.run(3);
        assert_eq!(cpu.regs.a, 7);
    }

    #[test]
    fn test_direct_count_modes() {
        // slot 0 of the frame holds a pointer to 0x2000
        let fp = 0x8000u16;
        let slot = fp - 24;
        let run = |operand: u8, a: u16| {
            let mut cpu = cpu_with(&[0xef, operand]);
            cpu.regs.fp = fp;
            cpu.regs.a = a;
            cpu.mem.write_word(slot, 0x2000);
            cpu.mem.write_word(0x2000, 0xBBAA);
            cpu.step().unwrap();
            cpu
        };

        // adjust by +1
        let cpu = run(0b00_00_0000, 0x55);
        assert_eq!(cpu.mem.read_word(slot), 0x2001);
        assert_eq!(cpu.regs.a, 0x55);

        // adjust by -2 and load the new pointer
        let cpu = run(0b01_11_0000, 0);
        assert_eq!(cpu.mem.read_word(slot), 0x1FFE);
        assert_eq!(cpu.regs.a, 0x1FFE);

        // byte load then advance
        let cpu = run(0b10_00_0000, 0);
        assert_eq!(cpu.regs.a, 0xAA);
        assert_eq!(cpu.mem.read_word(slot), 0x2001);

        // word load then advance
        let cpu = run(0b10_01_0000, 0);
        assert_eq!(cpu.regs.a, 0xBBAA);
        assert_eq!(cpu.mem.read_word(slot), 0x2002);

        // word store then step back
        let cpu = run(0b11_11_0000, 0x1234);
        assert_eq!(cpu.mem.read_word(0x2000), 0x1234);
        assert_eq!(cpu.mem.read_word(slot), 0x1FFE);

        // byte store then step back one
        let cpu = run(0b11_10_0000, 0x1234);
        assert_eq!(cpu.mem.read_word(0x2000), 0xBB34);
        assert_eq!(cpu.mem.read_word(slot), 0x1FFF);
    }

    #[test]
    fn test_self_modifying_code() {
        // lda #xxxx 0x0045 ("lda #5"); bsta abs 0x0107; then the patched byte runs
        let mut cpu = cpu_with(&[0x89, 0x45, 0x00, 0x97, 0x07, 0x01, 0x9f, 0x40]);
        cpu.run(4);
        assert_eq!(cpu.regs.a, 5);
    }

    #[test]
    fn test_trace_hook_sees_pre_step_registers() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut cpu = cpu_with(&[0x43, 0x44]);
        cpu.set_trace_hook(move |regs| sink.borrow_mut().push(regs.to_string()));
        cpu.run(2);

        let lines = seen.borrow();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "A:0000 B:0000 PC:0100 SP:ffff FP:ffff ");
        assert_eq!(lines[1], "A:0003 B:0000 PC:0101 SP:ffff FP:ffff ");
    }
}
