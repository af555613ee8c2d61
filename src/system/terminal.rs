// src/system/terminal.rs

use std::collections::VecDeque;
use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::cursor::{self, MoveTo};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType, disable_raw_mode, enable_raw_mode};

/// The terminal device as seen by the editor and the session: discrete input
/// events with re-injection, byte output, cursor query/placement, and screen
/// clearing. The production implementation is [`Terminal`]; tests substitute
/// a recording fake.
pub trait Console {
    /// Takes the next available input event without blocking: re-injected
    /// events first, then whatever the OS input queue already holds.
    fn try_next_event(&mut self) -> io::Result<Option<Event>>;

    /// Puts an event back at the front of the input queue so the next read
    /// sees it again. This is what keeps the keystroke-draining pass
    /// consistent with the event that triggered it.
    fn unread_event(&mut self, event: Event);

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;

    /// Current cursor position as `(column, row)`.
    fn cursor_position(&mut self) -> io::Result<(u16, u16)>;

    fn move_cursor_to(&mut self, column: u16, row: u16) -> io::Result<()>;

    /// Clears the screen and homes the cursor.
    fn clear_screen(&mut self) -> io::Result<()>;
}

/// Crossterm-backed console. Owns a small unread queue layered in front of
/// the crossterm event stream; only the reactor thread ever reads from it.
pub struct Terminal {
    out: Stdout,
    unread: VecDeque<Event>,
}

impl Terminal {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            unread: VecDeque::new(),
        }
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for Terminal {
    fn try_next_event(&mut self) -> io::Result<Option<Event>> {
        if let Some(event) = self.unread.pop_front() {
            return Ok(Some(event));
        }
        if event::poll(Duration::ZERO)? {
            return Ok(Some(event::read()?));
        }
        Ok(None)
    }

    fn unread_event(&mut self, event: Event) {
        self.unread.push_front(event);
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn cursor_position(&mut self) -> io::Result<(u16, u16)> {
        cursor::position()
    }

    fn move_cursor_to(&mut self, column: u16, row: u16) -> io::Result<()> {
        execute!(self.out, MoveTo(column, row))
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        execute!(self.out, Clear(ClearType::All), MoveTo(0, 0))
    }
}

/// Switches the invoking terminal into the mode the wrapper needs: raw input
/// (so key and mouse events are delivered discretely and Ctrl+C arrives as a
/// key event instead of terminating us) plus mouse capture.
pub fn enter_interactive_mode() -> io::Result<()> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnableMouseCapture)
}

/// Restores the terminal to its original input mode. Safe to call on any
/// exit path; errors are reported but not propagated since we are leaving.
pub fn leave_interactive_mode() {
    if let Err(e) = execute!(io::stdout(), DisableMouseCapture) {
        log::warn!("failed to disable mouse capture: {e}");
    }
    if let Err(e) = disable_raw_mode() {
        log::warn!("failed to restore terminal mode: {e}");
    }
}
