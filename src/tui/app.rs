//! Debugger application state and logic.

use crate::cpu::addressing::fast_address;
use crate::cpu::decode::decode;
use crate::{BufferedIo, Cpu};
use std::collections::HashSet;

/// Bytes per row of the memory view.
pub const ROW_BYTES: u16 = 16;

/// Debugger application state.
pub struct DebuggerApp {
    /// The CPU being debugged.
    pub cpu: Cpu<BufferedIo>,
    /// Original image, reloaded on reset.
    pub image: Vec<u8>,
    /// Breakpoints (by address).
    pub breakpoints: HashSet<u16>,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// First address shown in the memory view.
    pub mem_base: u16,
}

impl DebuggerApp {
    /// Create a new debugger with a loaded image.
    pub fn new(image: Vec<u8>) -> Self {
        let mut app = Self {
            cpu: Cpu::new(),
            image,
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status: String::new(),
            mem_base: 0,
        };
        app.reset();
        app.status = "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into();
        app
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        let pc = self.cpu.regs.pc;
        match self.cpu.step() {
            Ok(opcode) => {
                self.status = format!("{:04x}: {}", pc, opcode);
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
    }

    /// Start continuous execution.
    pub fn run(&mut self) {
        // Leave the breakpoint we are sitting on.
        if self.breakpoints.contains(&self.cpu.regs.pc) {
            self.step();
        }
        self.running = true;
        self.status = "Running...".into();
    }

    /// Run one iteration of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        let pc = self.cpu.regs.pc;
        if self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at {:04x} after {} steps", pc, self.cpu.cycles);
            return;
        }

        self.step();
    }

    /// Toggle breakpoint at current PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.remove(&pc) {
            self.status = format!("Removed breakpoint at {:04x}", pc);
        } else {
            self.breakpoints.insert(pc);
            self.status = format!("Set breakpoint at {:04x}", pc);
        }
    }

    /// Reset CPU and port, then reload the image.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.cpu.io = BufferedIo::new();
        if let Err(e) = self.cpu.load_image(&self.image) {
            self.status = format!("Error: {}", e);
        } else {
            self.status = "Reset. Ready.".into();
        }
        self.running = false;
    }

    /// Queue a byte for the next `in 0`.
    pub fn send_input(&mut self, byte: u8) {
        self.cpu.io.push_input(&[byte]);
        self.status = format!("Queued input {:#04x}", byte);
    }

    /// Move the memory view by `rows` rows.
    pub fn scroll(&mut self, rows: i16) {
        let delta = (rows as u16).wrapping_mul(ROW_BYTES);
        self.mem_base = self.mem_base.wrapping_add(delta);
    }

    /// Point the memory view at the row holding `addr`.
    pub fn show_address(&mut self, addr: u16) {
        self.mem_base = addr & !(ROW_BYTES - 1);
    }

    /// Bytes from PC onward, each with its decoding as an opcode.
    ///
    /// Instruction lengths depend on execution, so every byte is shown.
    /// Only the row at PC is guaranteed to be the next opcode.
    pub fn listing(&self, lines: usize) -> Vec<(u16, u8, String)> {
        let pc = self.cpu.regs.pc;
        (0..lines as u16)
            .map(|i| {
                let addr = pc.wrapping_add(i);
                let byte = self.cpu.mem.read_byte(addr);
                let text = match decode(byte) {
                    Ok(opcode) => opcode.to_string(),
                    Err(_) => "???".to_string(),
                };
                (addr, byte, text)
            })
            .collect()
    }

    /// The sixteen fast slots of the current frame: (index, address, word).
    pub fn frame_slots(&self) -> Vec<(u8, u16, u16)> {
        (0..16u8)
            .map(|i| {
                let addr = fast_address(self.cpu.regs.fp, i);
                (i, addr, self.cpu.mem.read_word(addr))
            })
            .collect()
    }

    /// Port output so far, with non-printable bytes escaped.
    pub fn output_text(&self) -> String {
        self.cpu
            .io
            .written()
            .iter()
            .flat_map(|&b| std::ascii::escape_default(b))
            .map(char::from)
            .collect()
    }
}

/// Run the debugger with an image.
pub fn run_debugger(image: Vec<u8>) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(image);

    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => app.should_quit = true,
                        KeyCode::Char('s') => {
                            app.running = false;
                            app.step();
                        }
                        KeyCode::Char('r') => app.run(),
                        KeyCode::Char('p') => {
                            app.running = false;
                            app.status = "Paused.".into();
                        }
                        KeyCode::Char('b') => app.toggle_breakpoint(),
                        KeyCode::Char('x') => app.reset(),
                        KeyCode::Char('c') => app.show_address(app.cpu.regs.pc),
                        KeyCode::Char('k') => app.show_address(app.cpu.regs.sp),
                        KeyCode::Char(c @ '0'..='9') => app.send_input(c as u8),
                        KeyCode::Enter => app.send_input(b'\n'),
                        KeyCode::Up => app.scroll(-1),
                        KeyCode::Down => app.scroll(1),
                        KeyCode::PageUp => app.scroll(-16),
                        KeyCode::PageDown => app.scroll(16),
                        _ => {}
                    }
                }
            }
        }

        // Continuous running takes a batch of steps per frame.
        for _ in 0..64 {
            if !app.running {
                break;
            }
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}
