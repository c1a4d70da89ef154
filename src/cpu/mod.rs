//! CPU emulation for the LC-3.
//!
//! This module implements the complete LC-3 user-level architecture:
//! - 65,536 sixteen-bit memory cells with memory-mapped keyboard registers
//! - 10 registers: R0-R7, PC and the N/Z/P condition code
//! - 16 opcodes (two of them reserved) and 6 console trap routines

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod trap;

pub use memory::{Memory, MEMORY_SIZE, KBSR, KBDR};
pub use registers::{Registers, Reg, Condition, PC_START};
pub use decode::{Instruction, Operand, JsrTarget, CondMask};
pub use execute::{Cpu, CpuError, CpuState};
pub use trap::{TrapVector, UnknownTrap};
