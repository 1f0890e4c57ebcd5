//! UI rendering for the debugger.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    style::{Color, Style, Modifier},
};
use super::app::{DebuggerApp, ROW_BYTES};

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &DebuggerApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Percentage(55),
        ])
        .split(frame.area());

    // Left side: code, registers and status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(5),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_listing(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: memory, frame, output and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Length(4),
        ])
        .split(chunks[1]);

    draw_memory(frame, right_chunks[0], app);
    draw_frame(frame, right_chunks[1], app);
    draw_output(frame, right_chunks[2], app);
    draw_help(frame, right_chunks[3]);
}

/// Draw the bytes at PC with their opcode decodings.
fn draw_listing(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let listing = app.listing((area.height as usize).saturating_sub(2));

    let items: Vec<ListItem> = listing
        .iter()
        .enumerate()
        .map(|(i, (addr, byte, text))| {
            let is_current = i == 0;
            let prefix = if is_current { "▶ " } else { "  " };
            let bp = if app.breakpoints.contains(addr) { "●" } else { " " };
            let line = format!("{} {}{:04x}: {:02x}  {}", bp, prefix, addr, byte, text);

            let style = if is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else if app.breakpoints.contains(addr) {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::DarkGray)
            };

            ListItem::new(line).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default()
            .title(" Code ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)));

    frame.render_widget(list, area);
}

fn draw_registers(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let regs = &app.cpu.regs;
    let value = |v: u16| Span::styled(format!("{:04x}", v), Style::default().fg(Color::White));

    let content = vec![
        Line::from(vec![
            Span::raw("A: "), value(regs.a),
            Span::raw(format!(" ({:>6})   ", regs.a as i16)),
            Span::raw("B: "), value(regs.b),
            Span::raw(format!(" ({:>6})", regs.b as i16)),
        ]),
        Line::from(vec![
            Span::raw("PC: "),
            Span::styled(format!("{:04x}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("   SP: "), value(regs.sp),
            Span::raw("   FP: "), value(regs.fp),
        ]),
        Line::from(vec![
            Span::raw("Steps: "),
            Span::styled(format!("{}", app.cpu.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   "),
            if app.running {
                Span::styled("running", Style::default().fg(Color::Green))
            } else {
                Span::styled("stopped", Style::default().fg(Color::Red))
            },
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw a hex dump starting at the view base.
fn draw_memory(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let visible_rows = (area.height as usize).saturating_sub(2) as u16;
    let regs = &app.cpu.regs;

    let lines: Vec<Line> = (0..visible_rows)
        .map(|row| {
            let base = app.mem_base.wrapping_add(row.wrapping_mul(ROW_BYTES));
            let mut spans = vec![Span::styled(
                format!("{:04x}: ", base),
                Style::default().fg(Color::DarkGray),
            )];

            for i in 0..ROW_BYTES {
                let addr = base.wrapping_add(i);
                let byte = app.cpu.mem.read_byte(addr);
                let style = if addr == regs.pc {
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                } else if addr == regs.sp {
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)
                } else if byte != 0 {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                spans.push(Span::styled(format!("{:02x} ", byte), style));
            }

            Line::from(spans)
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(Block::default()
            .title(" Memory ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)));

    frame.render_widget(paragraph, area);
}

/// Draw the fast slots, four per line.
fn draw_frame(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let slots = app.frame_slots();

    let lines: Vec<Line> = slots
        .chunks(4)
        .map(|chunk| {
            let text = chunk
                .iter()
                .map(|(i, _, word)| format!("{:>2}: {:04x}", i, word))
                .collect::<Vec<_>>()
                .join("  ");
            Line::from(text)
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(Block::default()
            .title(format!(" Frame @ {:04x} ", app.cpu.regs.fp))
            .borders(Borders::ALL));

    frame.render_widget(paragraph, area);
}

fn draw_output(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let output = Paragraph::new(app.output_text())
        .wrap(Wrap { trim: false })
        .block(Block::default()
            .title(" Port 0 ")
            .borders(Borders::ALL));

    frame.render_widget(output, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &DebuggerApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Draw help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  r: Run  p: Pause  b: Breakpoint  x: Reset  q: Quit"),
        Line::from("↑↓/PgUp/PgDn: Scroll  c: Show PC  k: Show SP  0-9/Enter: Input"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Help ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}
