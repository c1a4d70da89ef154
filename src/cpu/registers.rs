//! LC-3 CPU registers.
//!
//! The LC-3 has 10 registers:
//! - R0-R7: 16-bit general purpose registers (R7 doubles as the link register)
//! - PC: 16-bit program counter
//! - COND: condition code, exactly one of N, Z or P

use serde::{Serialize, Deserialize};

/// Address the program counter starts at.
pub const PC_START: u16 = 0x3000;

/// A general purpose register name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reg {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Reg {
    pub const ALL: [Reg; 8] = [
        Reg::R0, Reg::R1, Reg::R2, Reg::R3,
        Reg::R4, Reg::R5, Reg::R6, Reg::R7,
    ];

    /// Register named by the low 3 bits of `bits`.
    pub fn from_bits(bits: u16) -> Self {
        Self::ALL[(bits & 0x7) as usize]
    }

    /// Register with index `index`, or `None` past R7.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Index of this register (0-7).
    pub fn index(self) -> usize {
        self as usize
    }
}

/// The condition code register.
///
/// Stored as an enum so that "exactly one flag set" holds by construction.
/// The discriminants are the architectural bit patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum Condition {
    Positive = 1 << 0,
    Zero = 1 << 1,
    Negative = 1 << 2,
}

impl Condition {
    /// Classify a word as a 16-bit two's complement value.
    pub fn of(value: u16) -> Self {
        if value == 0 {
            Condition::Zero
        } else if value >> 15 == 1 {
            Condition::Negative
        } else {
            Condition::Positive
        }
    }

    /// The 3-bit `nzp` pattern for this flag.
    pub fn bits(self) -> u16 {
        self as u16
    }
}

/// The LC-3 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R7
    gpr: [u16; 8],

    /// Program counter: address of the next instruction to fetch.
    pub pc: u16,

    /// Condition code, only changed through [`Registers::update_flags`].
    cond: Condition,
}

impl Registers {
    /// Create a register file in the power-on state:
    /// general registers zeroed, PC at [`PC_START`], COND = Z.
    pub fn new() -> Self {
        Self {
            gpr: [0; 8],
            pc: PC_START,
            cond: Condition::Zero,
        }
    }

    /// Reset to the power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn get(&self, reg: Reg) -> u16 {
        self.gpr[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: Reg, value: u16) {
        self.gpr[reg.index()] = value;
    }

    /// Recompute COND from the current value of `reg`.
    pub fn update_flags(&mut self, reg: Reg) {
        self.cond = Condition::of(self.get(reg));
    }

    /// Current condition code.
    pub fn cond(&self) -> Condition {
        self.cond
    }

    /// Increment the program counter by 1.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// Set the program counter to an absolute address.
    pub fn jump(&mut self, addr: u16) {
        self.pc = addr;
    }

    /// `PC + offset`, wrapping. `offset` is already sign-extended.
    pub fn pc_relative(&self, offset: u16) -> u16 {
        self.pc.wrapping_add(offset)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
