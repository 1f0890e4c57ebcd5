//! Sea16 memory subsystem.
//!
//! A single flat 64KB address space. Code and data share it, and there is
//! no protection of any kind: every address is readable and writable, and
//! all address arithmetic wraps at 16 bits.

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The number of byte cells in the address space.
pub const MEMORY_SIZE: usize = 0x10000;

/// Sea16 memory: 65536 byte cells.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u8>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read one byte.
    #[inline]
    pub fn read_byte(&self, addr: u16) -> u8 {
        self.cells[addr as usize]
    }

    /// Write one byte.
    #[inline]
    pub fn write_byte(&mut self, addr: u16, value: u8) {
        self.cells[addr as usize] = value;
    }

    /// Read a little-endian word. The high byte comes from `addr + 1`,
    /// which wraps to 0 at the top of memory.
    #[inline]
    pub fn read_word(&self, addr: u16) -> u16 {
        let lo = self.read_byte(addr) as u16;
        let hi = self.read_byte(addr.wrapping_add(1)) as u16;
        lo | (hi << 8)
    }

    /// Write a little-endian word.
    #[inline]
    pub fn write_word(&mut self, addr: u16, value: u16) {
        self.write_byte(addr, value as u8);
        self.write_byte(addr.wrapping_add(1), (value >> 8) as u8);
    }

    /// Zero `len` bytes starting at `start`, wrapping past 0xFFFF.
    pub fn fill_zero(&mut self, start: u16, len: u16) {
        for i in 0..len {
            self.write_byte(start.wrapping_add(i), 0);
        }
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy a raw image into memory starting at address 0.
    ///
    /// Cells beyond the end of the image keep whatever they held before.
    pub fn load_image(&mut self, image: &[u8]) -> Result<(), MemoryError> {
        if image.len() > MEMORY_SIZE {
            return Err(MemoryError::ImageTooLarge { size: image.len() });
        }

        self.cells[..image.len()].copy_from_slice(image);
        Ok(())
    }

    /// The whole address space as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }

    /// Dump memory contents (for debugging). Wraps past 0xFFFF.
    pub fn dump(&self, start: u16, count: usize) -> Vec<(u16, u8)> {
        (0..count.min(MEMORY_SIZE))
            .map(|i| {
                let addr = start.wrapping_add(i as u16);
                (addr, self.read_byte(addr))
            })
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&b| b != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur while preparing memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Image does not fit in the address space.
    #[error("image of {size} bytes exceeds the {}-byte address space", MEMORY_SIZE)]
    ImageTooLarge { size: usize },
}
