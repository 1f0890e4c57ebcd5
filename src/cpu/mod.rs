//! CPU emulation for Sea16.
//!
//! This module implements the whole machine:
//! - 64KB of flat, unprotected byte memory
//! - 5 registers: A, B (operands), SP, FP (stack and frame), PC
//! - a two-tier opcode space with fast/near/far/absolute addressing
//! - frame-based calls whose linkage lives in ordinary memory

pub mod memory;
pub mod registers;
pub mod decode;
pub mod addressing;
pub mod bitfield;
pub mod stack;
pub mod io;
pub mod execute;

pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::Registers;
pub use decode::{Opcode, BlockOp, Op, DecodeError};
pub use addressing::AddrMode;
pub use bitfield::BitField;
pub use io::{IoPort, StdIo, BufferedIo};
pub use execute::{Cpu, CpuError, Quirks, RunSummary, TraceHook};
