//! Raw-mode line editing.
//!
//! The terminal is switched out of canonical mode for the duration of one
//! [`LineReader::read_line`] call, so every keystroke arrives as soon as it is
//! typed and the shell echoes it itself. The saved mode is restored by
//! [`RawMode`]'s destructor on every exit path.

use nix::sys::termios::{self, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use std::io::{self, Read, Write};
use tracing::{debug, warn};

/// Maximum number of bytes in a line. Reaching `MAX_LINE - 1` ends the line.
pub const MAX_LINE: usize = 4096;

const EOT: u8 = 4;
const TAB: u8 = 9;
const ENTER: u8 = b'\n';
const ESC: u8 = 27;
const BACKSPACE: u8 = 127;

/// Cursor back, blank, cursor back.
const ERASE: &[u8] = b"\x08 \x08";

/// Outcome of reading one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineResult {
    /// A finished line without its trailing newline.
    Completed(String),
    /// Ctrl-D was pressed, or the input ended with nothing buffered.
    EndOfInput,
}

/// The single remembered previous line used by Up-arrow recall.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineHistory {
    previous: Option<String>,
}

impl LineHistory {
    /// Replace the remembered line.
    pub fn remember(&mut self, line: &str) {
        self.previous = Some(line.to_string());
    }

    pub fn previous(&self) -> Option<&str> {
        self.previous.as_deref()
    }
}

/// Scoped non-canonical, no-echo terminal mode on standard input.
pub struct RawMode {
    saved: Termios,
}

impl RawMode {
    /// Capture the current mode of standard input and switch to raw mode.
    ///
    /// Fails with `ENOTTY` when standard input is not a terminal.
    pub fn enable() -> nix::Result<Self> {
        let stdin = io::stdin();
        let saved = termios::tcgetattr(&stdin)?;
        let mut raw = saved.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(&stdin, SetArg::TCSANOW, &raw)?;
        Ok(Self { saved })
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = termios::tcsetattr(io::stdin(), SetArg::TCSANOW, &self.saved) {
            warn!(error = %e, "failed to restore terminal mode");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscapeState {
    Idle,
    SawEscape,
    SawBracket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    Pending,
    Line,
    EndOfInput,
}

/// Line buffer plus the escape-sequence state machine.
struct LineEditor {
    buf: Vec<u8>,
    escape: EscapeState,
}

impl LineEditor {
    fn new() -> Self {
        Self {
            buf: Vec::with_capacity(MAX_LINE),
            escape: EscapeState::Idle,
        }
    }

    fn feed(
        &mut self,
        byte: u8,
        history: &LineHistory,
        echo: &mut dyn Write,
    ) -> io::Result<KeyOutcome> {
        match (self.escape, byte) {
            (EscapeState::SawEscape, b'[') => {
                self.escape = EscapeState::SawBracket;
                return Ok(KeyOutcome::Pending);
            }
            (EscapeState::SawBracket, b'A') => {
                self.escape = EscapeState::Idle;
                self.recall(history, echo)?;
                return Ok(KeyOutcome::Pending);
            }
            (EscapeState::SawBracket, _) => {
                self.escape = EscapeState::Idle;
                return Ok(KeyOutcome::Pending);
            }
            (EscapeState::SawEscape, _) => self.escape = EscapeState::Idle,
            (EscapeState::Idle, _) => {}
        }

        match byte {
            ESC => {
                self.escape = EscapeState::SawEscape;
                Ok(KeyOutcome::Pending)
            }
            EOT => Ok(KeyOutcome::EndOfInput),
            ENTER => {
                echo.write_all(b"\n")?;
                Ok(KeyOutcome::Line)
            }
            TAB => {
                self.buf.push(b'?');
                echo.write_all(b"?\n")?;
                Ok(KeyOutcome::Line)
            }
            BACKSPACE => {
                if self.erase_char() {
                    echo.write_all(ERASE)?;
                }
                Ok(KeyOutcome::Pending)
            }
            b if b >= 0x20 => {
                self.buf.push(b);
                echo.write_all(&[b])?;
                if self.buf.len() >= MAX_LINE - 1 {
                    echo.write_all(b"\n")?;
                    return Ok(KeyOutcome::Line);
                }
                Ok(KeyOutcome::Pending)
            }
            _ => Ok(KeyOutcome::Pending),
        }
    }

    /// Drop the last character, including all bytes of a UTF-8 sequence.
    fn erase_char(&mut self) -> bool {
        if self.buf.is_empty() {
            return false;
        }
        while let Some(b) = self.buf.pop() {
            if b & 0xC0 != 0x80 {
                break;
            }
        }
        true
    }

    fn recall(&mut self, history: &LineHistory, echo: &mut dyn Write) -> io::Result<()> {
        let visible = String::from_utf8_lossy(&self.buf).chars().count();
        for _ in 0..visible {
            echo.write_all(ERASE)?;
        }
        self.buf.clear();
        if let Some(previous) = history.previous() {
            let bytes = previous.as_bytes();
            let bytes = &bytes[..bytes.len().min(MAX_LINE - 2)];
            self.buf.extend_from_slice(bytes);
            echo.write_all(bytes)?;
        }
        Ok(())
    }

    fn finish(self) -> String {
        let mut line = String::from_utf8_lossy(&self.buf).into_owned();
        if line.ends_with('\n') {
            line.pop();
        }
        line
    }
}

/// Reads keystrokes and assembles them into lines.
pub struct LineReader<R> {
    input: R,
    raw_mode: bool,
}

impl LineReader<io::Stdin> {
    /// A reader on the process's standard input that switches the terminal
    /// into raw mode while reading.
    pub fn stdin() -> Self {
        Self {
            input: io::stdin(),
            raw_mode: true,
        }
    }
}

impl<R: Read> LineReader<R> {
    /// A reader over an arbitrary byte stream. The terminal mode is left alone.
    pub fn new(input: R) -> Self {
        Self {
            input,
            raw_mode: false,
        }
    }

    /// Read one line, echoing edits to `echo`.
    pub fn read_line(
        &mut self,
        history: &LineHistory,
        echo: &mut dyn Write,
    ) -> io::Result<LineResult> {
        let _raw = if self.raw_mode {
            match RawMode::enable() {
                Ok(guard) => Some(guard),
                Err(e) => {
                    debug!(error = %e, "standard input is not a terminal, reading cooked");
                    None
                }
            }
        } else {
            None
        };

        let mut editor = LineEditor::new();
        let mut byte = [0u8; 1];
        loop {
            echo.flush()?;
            let n = match self.input.read(&mut byte) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                return Ok(if editor.buf.is_empty() {
                    LineResult::EndOfInput
                } else {
                    LineResult::Completed(editor.finish())
                });
            }
            match editor.feed(byte[0], history, echo)? {
                KeyOutcome::Pending => {}
                KeyOutcome::Line => return Ok(LineResult::Completed(editor.finish())),
                KeyOutcome::EndOfInput => return Ok(LineResult::EndOfInput),
            }
        }
    }
}
