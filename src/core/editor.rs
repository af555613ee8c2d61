// src/core/editor.rs

use std::io::{self, Write};

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

use crate::constants::CLEAR_COMMAND;
use crate::system::terminal::Console;

/// Editing states of the wrapper.
///
/// In `Command` mode typed characters accumulate into a pending line that is
/// sent to the wrapped shell on Enter. In `Edit` mode the cursor roams freely
/// over already-printed output for visual overwrite; nothing typed there
/// touches the pending line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Command,
    Edit,
}

/// Two-mode cursor/editing state machine. Mutated only inside reactor work
/// items, so it needs no synchronization of its own.
///
/// The anchor is the terminal position where Command-mode input resumes
/// (the end of output at the moment Edit mode was entered); returning to
/// Command mode restores the cursor there. The pending buffer survives mode
/// switches until Enter or Backspace consumes it.
pub struct LineEditor {
    mode: Mode,
    buffer: String,
    anchor_column: u16,
    anchor_row: u16,
}

impl LineEditor {
    pub fn new() -> Self {
        Self {
            mode: Mode::Command,
            buffer: String::new(),
            anchor_column: 0,
            anchor_row: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Handles a left-button press at `(column, row)`.
    ///
    /// Any click first enters Edit mode (recording the anchor when coming
    /// from Command mode). A click at or after the anchor then immediately
    /// returns to Command mode, restoring the cursor to the anchor; a click
    /// strictly before the anchor just places the cursor there.
    pub fn handle_click(
        &mut self,
        console: &mut dyn Console,
        column: u16,
        row: u16,
    ) -> io::Result<()> {
        self.enable_edit_mode(console)?;
        if self.is_at_or_past_anchor(column, row) {
            self.enable_command_mode(console)?;
        } else {
            console.move_cursor_to(column, row)?;
        }
        console.flush()
    }

    /// Drains every input event currently buffered, in one pass. Invoked once
    /// per detected key event; also consumes any mouse clicks that arrived in
    /// the meantime. Returns `true` if a break combination (Ctrl+C) was seen.
    pub fn drain_keystrokes(
        &mut self,
        console: &mut dyn Console,
        shell_stdin: &mut dyn Write,
    ) -> io::Result<bool> {
        let mut break_requested = false;
        while let Some(event) = console.try_next_event()? {
            match event {
                Event::Key(key) => {
                    if self.handle_key(console, shell_stdin, key)? {
                        break_requested = true;
                    }
                }
                Event::Mouse(mouse) => {
                    if mouse.kind == MouseEventKind::Down(MouseButton::Left) {
                        self.handle_click(console, mouse.column, mouse.row)?;
                    }
                }
                // Resize and focus changes carry no editing meaning here.
                _ => {}
            }
        }
        console.flush()?;
        Ok(break_requested)
    }

    /// Idempotent when already in Edit mode.
    fn enable_edit_mode(&mut self, console: &mut dyn Console) -> io::Result<()> {
        if self.mode == Mode::Command {
            let (column, row) = console.cursor_position()?;
            self.anchor_column = column;
            self.anchor_row = row;
            self.mode = Mode::Edit;
            log::debug!("edit mode entered, anchor at ({column}, {row})");
        }
        Ok(())
    }

    /// Idempotent when already in Command mode.
    fn enable_command_mode(&mut self, console: &mut dyn Console) -> io::Result<()> {
        if self.mode == Mode::Edit {
            console.move_cursor_to(self.anchor_column, self.anchor_row)?;
            self.mode = Mode::Command;
            log::debug!("command mode restored");
        }
        Ok(())
    }

    fn is_at_or_past_anchor(&self, column: u16, row: u16) -> bool {
        row > self.anchor_row || (row == self.anchor_row && column >= self.anchor_column)
    }

    /// Returns `true` when the key is the interactive break combination.
    fn handle_key(
        &mut self,
        console: &mut dyn Console,
        shell_stdin: &mut dyn Write,
        key: KeyEvent,
    ) -> io::Result<bool> {
        if key.kind == KeyEventKind::Release {
            return Ok(false);
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(true);
        }
        match key.code {
            KeyCode::Enter => self.carriage_return(console, shell_stdin)?,
            KeyCode::Backspace => self.backspace(console)?,
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.printable(console, c)?;
            }
            _ => {}
        }
        Ok(false)
    }

    fn carriage_return(
        &mut self,
        console: &mut dyn Console,
        shell_stdin: &mut dyn Write,
    ) -> io::Result<()> {
        match self.mode {
            Mode::Command => {
                console.write_bytes(b"\r\n")?;
                let line = std::mem::take(&mut self.buffer);
                self.submit_line(console, shell_stdin, &line)
            }
            // Enter while editing history only returns to the pending line.
            Mode::Edit => self.enable_command_mode(console),
        }
    }

    /// Sends a finished command line to the wrapped shell. A line matching
    /// the clear command is intercepted: the local screen is cleared and an
    /// empty line keeps the shell's prompt cycle in step.
    fn submit_line(
        &mut self,
        console: &mut dyn Console,
        shell_stdin: &mut dyn Write,
        line: &str,
    ) -> io::Result<()> {
        if line.eq_ignore_ascii_case(CLEAR_COMMAND) {
            console.clear_screen()?;
        } else {
            shell_stdin.write_all(line.as_bytes())?;
        }
        shell_stdin.write_all(b"\n")?;
        shell_stdin.flush()
    }

    fn backspace(&mut self, console: &mut dyn Console) -> io::Result<()> {
        match self.mode {
            Mode::Command => {
                if self.buffer.pop().is_some() {
                    console.write_bytes(b"\x08 \x08")?;
                }
            }
            // Pure overwrite cursor-move: history has no buffer to shrink.
            Mode::Edit => console.write_bytes(b"\x08 \x08")?,
        }
        Ok(())
    }

    fn printable(&mut self, console: &mut dyn Console, c: char) -> io::Result<()> {
        let mut utf8 = [0u8; 4];
        console.write_bytes(c.encode_utf8(&mut utf8).as_bytes())?;
        if self.mode == Mode::Command {
            self.buffer.push(c);
        }
        Ok(())
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::MouseEvent;
    use std::collections::VecDeque;

    /// Recording console: scripted input events in, observable effects out.
    struct TestConsole {
        events: VecDeque<Event>,
        written: Vec<u8>,
        cursor: (u16, u16),
        clears: usize,
    }

    impl TestConsole {
        fn at(column: u16, row: u16) -> Self {
            Self {
                events: VecDeque::new(),
                written: Vec::new(),
                cursor: (column, row),
                clears: 0,
            }
        }

        fn queue(&mut self, events: impl IntoIterator<Item = Event>) {
            self.events.extend(events);
        }
    }

    impl Console for TestConsole {
        fn try_next_event(&mut self) -> io::Result<Option<Event>> {
            Ok(self.events.pop_front())
        }

        fn unread_event(&mut self, event: Event) {
            self.events.push_front(event);
        }

        fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn cursor_position(&mut self) -> io::Result<(u16, u16)> {
            Ok(self.cursor)
        }

        fn move_cursor_to(&mut self, column: u16, row: u16) -> io::Result<()> {
            self.cursor = (column, row);
            Ok(())
        }

        fn clear_screen(&mut self) -> io::Result<()> {
            self.clears += 1;
            self.cursor = (0, 0);
            Ok(())
        }
    }

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    fn enter() -> Event {
        Event::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
    }

    fn backspace() -> Event {
        Event::Key(KeyEvent::new(KeyCode::Backspace, KeyModifiers::NONE))
    }

    fn ctrl_c() -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL))
    }

    fn click(column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn drain(editor: &mut LineEditor, console: &mut TestConsole, stdin: &mut Vec<u8>) -> bool {
        editor.drain_keystrokes(console, stdin).expect("drain failed")
    }

    #[test]
    fn test_click_before_anchor_enters_edit_and_places_cursor() {
        let mut console = TestConsole::at(10, 5);
        let mut editor = LineEditor::new();

        editor.handle_click(&mut console, 3, 5).unwrap();

        assert_eq!(editor.mode(), Mode::Edit);
        assert_eq!(console.cursor, (3, 5));

        // A second click above the anchor row stays in Edit mode.
        editor.handle_click(&mut console, 40, 2).unwrap();
        assert_eq!(editor.mode(), Mode::Edit);
        assert_eq!(console.cursor, (40, 2));
    }

    #[test]
    fn test_click_at_or_past_anchor_restores_command_mode() {
        let mut console = TestConsole::at(10, 5);
        let mut editor = LineEditor::new();

        editor.handle_click(&mut console, 3, 5).unwrap();
        assert_eq!(editor.mode(), Mode::Edit);

        // Anchor row, column == anchor column.
        editor.handle_click(&mut console, 10, 5).unwrap();
        assert_eq!(editor.mode(), Mode::Command);
        assert_eq!(console.cursor, (10, 5));
    }

    #[test]
    fn test_click_after_anchor_row_restores_command_mode() {
        let mut console = TestConsole::at(10, 5);
        let mut editor = LineEditor::new();

        editor.handle_click(&mut console, 0, 3).unwrap();
        assert_eq!(editor.mode(), Mode::Edit);

        editor.handle_click(&mut console, 0, 9).unwrap();
        assert_eq!(editor.mode(), Mode::Command);
        assert_eq!(console.cursor, (10, 5));
    }

    #[test]
    fn test_click_ahead_while_in_command_mode_is_a_round_trip() {
        // Entering Edit records the anchor at the current cursor; a click at
        // or past it immediately bounces back, leaving everything unchanged.
        let mut console = TestConsole::at(10, 5);
        let mut editor = LineEditor::new();

        editor.handle_click(&mut console, 25, 5).unwrap();

        assert_eq!(editor.mode(), Mode::Command);
        assert_eq!(console.cursor, (10, 5));
    }

    #[test]
    fn test_typed_line_is_submitted_with_newline_and_buffer_cleared() {
        let mut console = TestConsole::at(0, 0);
        let mut editor = LineEditor::new();
        let mut stdin = Vec::new();

        console.queue([key('d'), key('i'), key('r'), enter()]);
        drain(&mut editor, &mut console, &mut stdin);

        assert_eq!(stdin, b"dir\n");
        assert_eq!(editor.buffer(), "");
        // Characters echoed, then the newline echo.
        assert_eq!(console.written, b"dir\r\n");
    }

    #[test]
    fn test_cls_is_intercepted_case_insensitively() {
        let mut console = TestConsole::at(0, 0);
        let mut editor = LineEditor::new();
        let mut stdin = Vec::new();

        console.queue([key('c'), key('L'), key('s'), enter()]);
        drain(&mut editor, &mut console, &mut stdin);

        assert_eq!(console.clears, 1);
        // The shell receives an empty line, never the literal text.
        assert_eq!(stdin, b"\n");
        assert_eq!(editor.buffer(), "");
    }

    #[test]
    fn test_backspace_on_empty_command_buffer_is_a_no_op() {
        let mut console = TestConsole::at(0, 0);
        let mut editor = LineEditor::new();
        let mut stdin = Vec::new();

        console.queue([backspace()]);
        drain(&mut editor, &mut console, &mut stdin);

        assert_eq!(editor.buffer(), "");
        assert!(console.written.is_empty());
    }

    #[test]
    fn test_backspace_removes_one_trailing_character() {
        let mut console = TestConsole::at(0, 0);
        let mut editor = LineEditor::new();
        let mut stdin = Vec::new();

        console.queue([key('a'), key('b'), backspace()]);
        drain(&mut editor, &mut console, &mut stdin);

        assert_eq!(editor.buffer(), "a");
        assert_eq!(console.written, b"ab\x08 \x08");
    }

    #[test]
    fn test_edit_mode_backspace_never_mutates_the_buffer() {
        let mut console = TestConsole::at(10, 5);
        let mut editor = LineEditor::new();
        let mut stdin = Vec::new();

        console.queue([key('a'), key('b'), key('c')]);
        drain(&mut editor, &mut console, &mut stdin);
        assert_eq!(editor.buffer(), "abc");

        // Click before the anchor: Edit mode, free cursor.
        console.queue([click(2, 5), backspace(), backspace()]);
        drain(&mut editor, &mut console, &mut stdin);

        assert_eq!(editor.mode(), Mode::Edit);
        assert_eq!(editor.buffer(), "abc");
    }

    #[test]
    fn test_edit_mode_typing_overwrites_without_buffering() {
        let mut console = TestConsole::at(10, 5);
        let mut editor = LineEditor::new();
        let mut stdin = Vec::new();

        console.queue([key('a'), click(2, 5), key('X')]);
        drain(&mut editor, &mut console, &mut stdin);

        assert_eq!(editor.mode(), Mode::Edit);
        assert_eq!(editor.buffer(), "a");
        assert!(console.written.ends_with(b"X"));
    }

    #[test]
    fn test_enter_in_edit_mode_returns_to_command_without_submitting() {
        let mut console = TestConsole::at(10, 5);
        let mut editor = LineEditor::new();
        let mut stdin = Vec::new();

        console.queue([key('a'), click(2, 5), enter()]);
        drain(&mut editor, &mut console, &mut stdin);

        assert_eq!(editor.mode(), Mode::Command);
        assert_eq!(console.cursor, (10, 5));
        assert!(stdin.is_empty());
        // The pending text survives the mode switch.
        assert_eq!(editor.buffer(), "a");
    }

    #[test]
    fn test_pending_buffer_survives_edit_round_trip_and_submits() {
        let mut console = TestConsole::at(5, 2);
        let mut editor = LineEditor::new();
        let mut stdin = Vec::new();

        console.queue([key('d'), key('i'), click(1, 2), click(30, 2), key('r'), enter()]);
        drain(&mut editor, &mut console, &mut stdin);

        assert_eq!(stdin, b"dir\n");
    }

    #[test]
    fn test_ctrl_c_reports_a_break_request() {
        let mut console = TestConsole::at(0, 0);
        let mut editor = LineEditor::new();
        let mut stdin = Vec::new();

        console.queue([key('a'), ctrl_c()]);
        let break_requested = drain(&mut editor, &mut console, &mut stdin);

        assert!(break_requested);
        // The break never reaches the buffer or the shell.
        assert_eq!(editor.buffer(), "a");
        assert!(stdin.is_empty());
    }
}
