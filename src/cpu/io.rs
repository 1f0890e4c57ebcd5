//! Port I/O for the `in` and `out` instructions.
//!
//! Only port 0 is wired up. The CPU asks its [`IoPort`] for one byte on
//! `in 0` and hands it one byte on `out 0`; everything else about the
//! outside world belongs to the host.

use std::collections::VecDeque;
use std::io::{Read, Write};

/// Byte source and sink behind port 0.
pub trait IoPort {
    /// Next input byte, or `None` at end of input.
    fn input(&mut self) -> Option<u8>;

    /// Emit one output byte.
    fn output(&mut self, byte: u8);
}

/// Port 0 wired to the process's stdin and stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdIo;

impl IoPort for StdIo {
    fn input(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match std::io::stdin().lock().read(&mut buf) {
            Ok(1) => Some(buf[0]),
            Ok(_) => None,
            Err(e) => {
                log::debug!("stdin read failed: {}", e);
                None
            }
        }
    }

    fn output(&mut self, byte: u8) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = out.write_all(&[byte]).and_then(|_| out.flush()) {
            log::warn!("stdout write failed: {}", e);
        }
    }
}

/// In-memory port: a queue of pending input and a buffer of everything
/// written so far.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BufferedIo {
    pending: VecDeque<u8>,
    written: Vec<u8>,
}

impl BufferedIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with input already queued.
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            pending: input.iter().copied().collect(),
            written: Vec::new(),
        }
    }

    /// Queue more input.
    pub fn push_input(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes.iter().copied());
    }

    /// Bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.written
    }

    /// Drain the output buffer.
    pub fn take_written(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.written)
    }

    /// Number of input bytes not yet consumed.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl IoPort for BufferedIo {
    fn input(&mut self) -> Option<u8> {
        self.pending.pop_front()
    }

    fn output(&mut self, byte: u8) {
        self.written.push(byte);
    }
}
