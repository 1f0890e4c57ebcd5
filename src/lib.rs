//! # Sea16 Emulator
//!
//! An interpreter for Sea16, a small 16-bit stack-frame virtual CPU.
//!
//! Sea16 has two operand registers, a stack that grows down from the top
//! of a flat 64KB memory, and a frame pointer that makes the sixteen words
//! around it reachable with one-byte instructions. Programs are raw binary
//! images loaded at address 0.
//!
//! ```
//! use sea16::Cpu;
//!
//! // lda #7; add #3; jump -1
//! let mut cpu = Cpu::new();
//! cpu.load_image(&[0x47, 0x73, 0xd9, 0x01]).unwrap();
//! cpu.run(3);
//! assert_eq!(cpu.regs.a, 10);
//! ```

pub mod cpu;
pub mod image;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuError, Memory, Registers, Opcode, Quirks, RunSummary};
pub use cpu::{IoPort, StdIo, BufferedIo};
pub use image::{load_image, save_image, ImageError};
pub use config::{RunConfig, ConfigError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
