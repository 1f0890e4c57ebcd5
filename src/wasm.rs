//! WebAssembly bindings for the Sea16 emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.
//! Port 0 is buffered: JavaScript queues input with `push_input` and drains
//! output with `take_output`.

use wasm_bindgen::prelude::*;
use crate::cpu::decode::decode;
use crate::cpu::MemoryError;
use crate::{BufferedIo, Cpu};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WebAssembly-friendly CPU wrapper.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu<BufferedIo>,
    image: Vec<u8>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// Create a new CPU instance.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            image: Vec::new(),
        }
    }

    /// Reset and load a raw image at address 0.
    #[wasm_bindgen]
    pub fn load_image(&mut self, image: &[u8]) -> Result<usize, JsError> {
        self.cpu.reset();
        self.cpu.load_image(image)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.image = image.to_vec();
        Ok(image.len())
    }

    /// Step one instruction. Returns the executed opcode as text.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let opcode = self.cpu.step()
            .map_err(|e| JsError::new(&e.to_string()))?;
        Ok(opcode.to_string())
    }

    /// Run `steps` instructions. Returns how many hit an illegal opcode.
    #[wasm_bindgen]
    pub fn run(&mut self, steps: u32) -> u32 {
        self.cpu.run(steps as u64).illegal as u32
    }

    /// Reset the CPU and reload the last image.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        self.reload().map_err(|e| JsError::new(&e.to_string()))
    }

    /// Get step count since reset.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    #[wasm_bindgen]
    pub fn a(&self) -> u16 {
        self.cpu.regs.a
    }

    #[wasm_bindgen]
    pub fn b(&self) -> u16 {
        self.cpu.regs.b
    }

    #[wasm_bindgen]
    pub fn sp(&self) -> u16 {
        self.cpu.regs.sp
    }

    #[wasm_bindgen]
    pub fn fp(&self) -> u16 {
        self.cpu.regs.fp
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.regs.pc
    }

    /// Get one memory byte.
    #[wasm_bindgen]
    pub fn read_byte(&self, addr: u16) -> u8 {
        self.cpu.mem.read_byte(addr)
    }

    /// Get `len` bytes starting at `addr`, wrapping at the top of memory.
    #[wasm_bindgen]
    pub fn memory_range(&self, addr: u16, len: u16) -> Vec<u8> {
        self.cpu.mem.dump(addr, len as usize)
            .into_iter()
            .map(|(_, byte)| byte)
            .collect()
    }

    /// Decoding of the opcode at PC.
    #[wasm_bindgen]
    pub fn next_opcode(&self) -> String {
        match decode(self.cpu.mem.read_byte(self.cpu.regs.pc)) {
            Ok(opcode) => opcode.to_string(),
            Err(e) => e.to_string(),
        }
    }

    /// Queue bytes for `in 0`.
    #[wasm_bindgen]
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.cpu.io.push_input(bytes);
    }

    /// Drain everything written to port 0 so far.
    #[wasm_bindgen]
    pub fn take_output(&mut self) -> Vec<u8> {
        self.cpu.io.take_written()
    }

    /// The one-line register trace.
    #[wasm_bindgen]
    pub fn trace_line(&self) -> String {
        self.cpu.regs.to_string()
    }

    /// Get registers as JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.regs)
            .map_err(|e| JsError::new(&e.to_string()))
    }
}

impl WasmCpu {
    fn reload(&mut self) -> Result<(), MemoryError> {
        self.cpu.reset();
        self.cpu.io = BufferedIo::new();
        self.cpu.load_image(&self.image)
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a single opcode byte.
#[wasm_bindgen]
pub fn wasm_decode(byte: u8) -> String {
    match decode(byte) {
        Ok(opcode) => opcode.to_string(),
        Err(e) => e.to_string(),
    }
}
