//! Raw-mode terminal console built on crossterm.
//!
//! Raw mode turns off line buffering and echo so GETC sees every key as soon
//! as it is pressed. It also turns off output post-processing, so every
//! stream written while it is on goes through [`CrlfWriter`].

use super::Console;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::{self, Write};
use std::time::Duration;
use tracing::{debug, warn};

/// The process terminal, held in raw mode for as long as this value lives.
pub struct TerminalConsole {
    out: CrlfWriter<io::Stdout>,
    /// Key seen by `key_available` but not yet consumed by `read_char`.
    pending: Option<u8>,
    interrupted: bool,
}

impl TerminalConsole {
    /// Put the terminal into raw mode.
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        debug!("terminal switched to raw mode");
        Ok(Self {
            out: CrlfWriter::new(io::stdout()),
            pending: None,
            interrupted: false,
        })
    }

    /// Map a key event to the byte an LC-3 program expects.
    fn translate(&mut self, key: KeyEvent) -> Option<u8> {
        if key.kind == KeyEventKind::Release {
            return None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => {
                self.interrupted = true;
                None
            }
            KeyCode::Char(c) if ctrl && c.is_ascii_alphabetic() => {
                Some(c.to_ascii_lowercase() as u8 & 0x1F)
            }
            KeyCode::Char(c) if c.is_ascii() => Some(c as u8),
            KeyCode::Enter => Some(b'\n'),
            KeyCode::Tab => Some(b'\t'),
            KeyCode::Backspace => Some(0x7F),
            KeyCode::Esc => Some(0x1B),
            _ => None,
        }
    }

    fn poll_pending(&mut self) -> io::Result<bool> {
        while self.pending.is_none() && event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                self.pending = self.translate(key);
            }
        }
        Ok(self.pending.is_some())
    }
}

impl Console for TerminalConsole {
    fn key_available(&mut self) -> bool {
        match self.poll_pending() {
            Ok(ready) => ready,
            Err(e) => {
                warn!("keyboard poll failed: {}", e);
                false
            }
        }
    }

    fn read_char(&mut self) -> io::Result<u8> {
        if let Some(byte) = self.pending.take() {
            return Ok(byte);
        }

        self.out.flush()?;
        loop {
            if self.interrupted {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted by user"));
            }
            if let Event::Key(key) = event::read()? {
                if let Some(byte) = self.translate(key) {
                    return Ok(byte);
                }
            }
        }
    }

    fn write_char(&mut self, byte: u8) -> io::Result<()> {
        self.out.write_all(&[byte])
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn interrupted(&self) -> bool {
        self.interrupted
    }
}

impl Drop for TerminalConsole {
    fn drop(&mut self) {
        let _ = self.out.flush();
        if let Err(e) = terminal::disable_raw_mode() {
            warn!("failed to restore terminal: {}", e);
        }
    }
}

/// Writer that expands `\n` to `\r\n`, for output produced in raw mode.
pub struct CrlfWriter<W> {
    inner: W,
}

impl<W: Write> CrlfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

impl<W: Write> Write for CrlfWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut lines = buf.split(|&byte| byte == b'\n');
        if let Some(first) = lines.next() {
            self.inner.write_all(first)?;
        }
        for line in lines {
            self.inner.write_all(b"\r\n")?;
            self.inner.write_all(line)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
