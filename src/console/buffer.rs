//! In-memory console with scripted input and captured output.

use super::Console;
use std::collections::VecDeque;
use std::io;

/// A console backed by byte buffers.
///
/// Input is consumed from a queue; reading from an empty queue fails with
/// [`io::ErrorKind::UnexpectedEof`] instead of blocking forever.
#[derive(Debug, Clone, Default)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferConsole {
    /// Create a console with no pending input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a console whose keyboard will deliver `input` in order.
    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            output: Vec::new(),
        }
    }

    /// Queue more keystrokes.
    pub fn push_input(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref());
    }

    /// Everything written so far.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded lossily as text.
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Drain and return everything written so far.
    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }

    /// Number of keystrokes not yet consumed.
    pub fn pending_input(&self) -> usize {
        self.input.len()
    }
}

impl Console for BufferConsole {
    fn key_available(&mut self) -> bool {
        !self.input.is_empty()
    }

    fn read_char(&mut self) -> io::Result<u8> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "console input exhausted"))
    }

    fn write_char(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_input() {
        let mut console = BufferConsole::with_input("ab");
        assert!(console.key_available());
        assert_eq!(console.read_char().unwrap(), b'a');
        assert_eq!(console.read_char().unwrap(), b'b');
        assert!(!console.key_available());
    }

    #[test]
    fn test_exhausted_input_errors() {
        let mut console = BufferConsole::new();
        let err = console.read_char().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_output_capture() {
        let mut console = BufferConsole::new();
        console.write_str("HALT\n").unwrap();
        assert_eq!(console.output_string(), "HALT\n");
        assert_eq!(console.take_output(), b"HALT\n");
        assert!(console.output().is_empty());
    }
}
