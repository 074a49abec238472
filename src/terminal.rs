use std::io::Write;

use anyhow::{Context, Result};
use crossterm::style::{Print, ResetColor};
use crossterm::{cursor, queue, terminal};

use crate::geometry::TerminalSize;

pub const FALLBACK_TERMINAL_SIZE: TerminalSize = TerminalSize {
    columns: 80,
    rows: 24,
};

impl TerminalSize {
    /// Reserves the bottom row so a full-height frame does not scroll the screen.
    pub fn usable(columns: u16, rows: u16) -> Self {
        Self {
            columns: u32::from(columns).max(1),
            rows: u32::from(rows).saturating_sub(1).max(1),
        }
    }

    /// Queried once per session; resizing mid-playback is not tracked.
    pub fn query() -> Self {
        match terminal::size() {
            Ok((columns, rows)) if columns > 0 && rows > 0 => Self::usable(columns, rows),
            _ => {
                tracing::debug!("terminal size unavailable, assuming 80x24");
                Self::usable(
                    FALLBACK_TERMINAL_SIZE.columns as u16,
                    FALLBACK_TERMINAL_SIZE.rows as u16,
                )
            }
        }
    }
}

/// Clears the screen, homes the cursor and writes one frame.
pub fn write_frame<W: Write>(out: &mut W, text: &str) -> Result<()> {
    queue!(
        out,
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0),
        Print(text)
    )
    .context("failed to queue frame")?;
    out.flush().context("failed to flush frame")
}

/// Hides the cursor while alive; restores it and resets colors on every exit path.
pub struct TerminalGuard<'a, W: Write> {
    out: &'a mut W,
}

impl<'a, W: Write> TerminalGuard<'a, W> {
    pub fn new(out: &'a mut W) -> Result<Self> {
        queue!(out, cursor::Hide).context("failed to hide cursor")?;
        Ok(Self { out })
    }

    pub fn writer(&mut self) -> &mut W {
        self.out
    }
}

impl<W: Write> Drop for TerminalGuard<'_, W> {
    fn drop(&mut self) {
        let _ = queue!(self.out, ResetColor, Print("\n"), cursor::Show);
        let _ = self.out.flush();
    }
}
