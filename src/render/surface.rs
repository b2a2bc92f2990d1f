//! Terminal output

use std::io::{self, Stdout, Write};

use crossterm::{cursor, execute, queue, style, terminal};

use super::frame::Frame;

/// Anything a frame can be flushed to
pub trait RenderSurface {
    fn clear(&mut self) -> io::Result<()>;
    fn move_to(&mut self, row: u16, col: u16) -> io::Result<()>;
    fn write_text(&mut self, text: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Write a frame top to bottom, one row per line
pub fn present<S: RenderSurface + ?Sized>(surface: &mut S, frame: &Frame) -> io::Result<()> {
    for row in 0..frame.height() {
        let row_u16 = u16::try_from(row).unwrap_or(u16::MAX);
        surface.move_to(row_u16, 0)?;
        surface.write_text(&frame.row_styled(row))?;
    }
    surface.flush()
}

/// Raw-mode alternate screen on stdout.
/// Dropping it puts the terminal back.
pub struct TerminalSurface {
    out: Stdout,
}

impl TerminalSurface {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = io::stdout();
        execute!(out, terminal::EnterAlternateScreen, cursor::Hide)?;
        Ok(Self { out })
    }
}

impl RenderSurface for TerminalSurface {
    fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, terminal::Clear(terminal::ClearType::All))
    }

    fn move_to(&mut self, row: u16, col: u16) -> io::Result<()> {
        queue!(self.out, cursor::MoveTo(col, row))
    }

    fn write_text(&mut self, text: &str) -> io::Result<()> {
        queue!(self.out, style::Print(text))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = restore_terminal();
    }
}

/// Leave raw mode and the alternate screen
pub fn restore_terminal() -> io::Result<()> {
    let mut out = io::stdout();
    execute!(out, cursor::Show, terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()
}
