// src/session.rs

use std::io::{self, Write};

use crossterm::event::Event;

use crate::core::editor::LineEditor;
use crate::system::supervisor::Breaker;
use crate::system::terminal::Console;

/// Raw mode turns off the terminal's own LF-to-CRLF output translation
/// (`OPOST` on Unix), so relayed child output must carry its own carriage
/// returns or multi-line chunks render stair-stepped. One instance per
/// relayed stream; the flag carries CRLF sequences split across chunks.
struct LineEndings {
    last_was_cr: bool,
}

impl LineEndings {
    fn new() -> Self {
        Self { last_was_cr: false }
    }

    /// Inserts a carriage return before every bare line feed. Existing CRLF
    /// sequences pass through untouched.
    fn normalize(&mut self, bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(bytes.len());
        for &byte in bytes {
            if byte == b'\n' && !self.last_was_cr {
                out.push(b'\r');
            }
            out.push(byte);
            self.last_was_cr = byte == b'\r';
        }
        out
    }
}

/// Everything the reactor's work items are allowed to mutate: the terminal,
/// the editor state machine, the shell's stdin write-end, and the break
/// handler. Constructed once at startup and owned by the reactor loop, so
/// every touch of it is serialized by construction.
pub struct Session {
    console: Box<dyn Console>,
    editor: LineEditor,
    shell_stdin: Box<dyn Write + Send>,
    breaker: Breaker,
    stdout_endings: LineEndings,
    stderr_endings: LineEndings,
}

impl Session {
    pub fn new(
        console: Box<dyn Console>,
        shell_stdin: Box<dyn Write + Send>,
        breaker: Breaker,
    ) -> Self {
        Self {
            console,
            editor: LineEditor::new(),
            shell_stdin,
            breaker,
            stdout_endings: LineEndings::new(),
            stderr_endings: LineEndings::new(),
        }
    }

    /// Body of the work item the input listener submits per detected event.
    ///
    /// Reads exactly one input record. Resize events carry no editing meaning
    /// and are dropped. Anything else is re-queued in front of the input
    /// stream and handled by the editor's draining pass, so the record that
    /// triggered the wake-up and whatever arrived behind it are consumed in
    /// one ordered sweep.
    pub fn handle_input(&mut self) -> io::Result<()> {
        let Some(event) = self.console.try_next_event()? else {
            return Ok(());
        };
        match event {
            Event::Resize(..) => return Ok(()),
            other => self.console.unread_event(other),
        }

        let break_requested = self
            .editor
            .drain_keystrokes(&mut *self.console, &mut *self.shell_stdin)?;
        if break_requested {
            log::debug!("interactive break requested");
            self.breaker.interrupt_children();
        }
        Ok(())
    }

    /// Relay delivery target for the shell's standard output.
    pub fn write_stdout(&mut self, bytes: &[u8]) {
        let bytes = self.stdout_endings.normalize(bytes);
        if let Err(e) = self
            .console
            .write_bytes(&bytes)
            .and_then(|()| self.console.flush())
        {
            log::debug!("stdout relay write failed: {e}");
        }
    }

    /// Relay delivery target for the shell's standard error. Written to the
    /// wrapper's own stderr, still from inside the reactor so it cannot
    /// interleave mid-chunk with stdout or keyboard echo.
    pub fn write_stderr(&mut self, bytes: &[u8]) {
        let bytes = self.stderr_endings.normalize(bytes);
        let mut err = io::stderr();
        if let Err(e) = err.write_all(&bytes).and_then(|()| err.flush()) {
            log::debug!("stderr relay write failed: {e}");
        }
    }
}
