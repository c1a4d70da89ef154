//! LC-3 memory subsystem.
//!
//! 65,536 sixteen-bit words. Two addresses are memory-mapped keyboard
//! registers: reading KBSR polls the console and refreshes KBSR and KBDR.

use crate::console::Console;
use tracing::warn;

/// The number of memory cells in the LC-3.
pub const MEMORY_SIZE: usize = 1 << 16;

/// Keyboard status register. Bit 15 is set when a key is ready.
pub const KBSR: u16 = 0xFE00;

/// Keyboard data register. Holds the last key sampled by a KBSR read.
pub const KBDR: u16 = 0xFE02;

/// LC-3 memory with its attached console device.
pub struct Memory<C> {
    cells: Box<[u16]>,
    console: C,
}

impl<C: Console> Memory<C> {
    /// Create a zero-filled memory wired to `console`.
    pub fn new(console: C) -> Self {
        Self {
            cells: vec![0u16; MEMORY_SIZE].into_boxed_slice(),
            console,
        }
    }

    /// Read a word.
    ///
    /// Reading [`KBSR`] is not a pure observation: it asks the console for a
    /// key and, if one is ready, sets bit 15 of KBSR and stores the key in
    /// [`KBDR`]; otherwise KBSR is cleared.
    pub fn read(&mut self, addr: u16) -> u16 {
        if addr == KBSR {
            self.poll_keyboard();
        }
        self.cells[addr as usize]
    }

    /// Write a word. There is no memory protection.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// Read a word without triggering device side effects.
    #[inline]
    pub fn peek(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    fn poll_keyboard(&mut self) {
        let status = if self.console.key_available() {
            match self.console.read_char() {
                Ok(key) => {
                    self.cells[KBDR as usize] = key as u16;
                    1 << 15
                }
                Err(e) => {
                    warn!("keyboard reported a key but read failed: {}", e);
                    0
                }
            }
        } else {
            0
        };
        self.cells[KBSR as usize] = status;
    }

    /// Copy `words` into memory starting at `origin`.
    ///
    /// Words that would run past the end of the address space are dropped.
    /// Returns the number of words stored.
    pub fn load(&mut self, origin: u16, words: &[u16]) -> usize {
        let start = origin as usize;
        let count = words.len().min(MEMORY_SIZE - start);
        self.cells[start..start + count].copy_from_slice(&words[..count]);
        count
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Borrow the attached console.
    pub fn console(&self) -> &C {
        &self.console
    }

    /// Mutably borrow the attached console.
    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }
}

impl<C> std::fmt::Debug for Memory<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}
