//! # LC-3 Emulator
//!
//! An emulator of the LC-3, a 16-bit educational computer.
//!
//! The machine has 65,536 words of memory, eight general purpose registers,
//! sixteen opcodes, and reaches the console only through trap routines and
//! a polled keyboard status register.

pub mod cpu;
pub mod console;
pub mod image;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Reg, Condition, Instruction};
pub use console::{Console, BufferConsole};
pub use image::{Image, ImageError, load_image};

#[cfg(feature = "term")]
pub use console::{CrlfWriter, TerminalConsole};
