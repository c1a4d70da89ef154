//! Console devices for the LC-3.
//!
//! The machine only sees the console through the [`Console`] trait:
//! - the keyboard status register polls [`Console::key_available`]
//! - the GETC/IN traps block on [`Console::read_char`]
//! - the output traps call [`Console::write_char`] and [`Console::flush`]

mod buffer;

#[cfg(feature = "term")]
mod terminal;

pub use buffer::BufferConsole;

#[cfg(feature = "term")]
pub use terminal::{CrlfWriter, TerminalConsole};

use std::io;

/// Character I/O capability used by memory-mapped keyboard registers and traps.
pub trait Console {
    /// Non-blocking: is a character ready to be read?
    fn key_available(&mut self) -> bool;

    /// Block until one character is available and return it.
    fn read_char(&mut self) -> io::Result<u8>;

    /// Write one character.
    fn write_char(&mut self, byte: u8) -> io::Result<()>;

    /// Push buffered output to the device.
    fn flush(&mut self) -> io::Result<()>;

    /// Whether the operator asked to stop the machine (e.g. Ctrl-C in raw mode).
    fn interrupted(&self) -> bool {
        false
    }

    /// Write every byte of `s`.
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        for byte in s.bytes() {
            self.write_char(byte)?;
        }
        Ok(())
    }
}
