//! TUI debugger for the Sea16 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and call-frame views
//! - A hex memory view that can follow PC or SP
//! - Step/run/breakpoint controls
//! - Port 0 output and keyboard input

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
