//! CPU execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::console::Console;
use crate::cpu::decode::{self, CondMask, Instruction, JsrTarget, Operand};
use crate::cpu::memory::Memory;
use crate::cpu::registers::{Reg, Registers};
use crate::cpu::trap::TrapVector;
use serde::{Serialize, Deserialize};
use std::io;
use thiserror::Error;
use tracing::{trace, warn};

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed TRAP HALT).
    Halted,
}

/// The LC-3 machine: registers, memory and the console wired into memory.
pub struct Cpu<C> {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory, owning the console device.
    pub mem: Memory<C>,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed so far.
    pub cycles: u64,
    /// Last executed instruction (for tracing).
    last_instr: Option<Instruction>,
    /// Address of the instruction that faulted. Latched until `reset`.
    fault: Option<u16>,
}

impl<C: Console> Cpu<C> {
    /// Create a CPU in the power-on state with empty memory.
    pub fn new(console: C) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(console),
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
            fault: None,
        }
    }

    /// Reset registers and memory. The console stays attached.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
        self.fault = None;
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed, or an error.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }
        if let Some(address) = self.fault {
            return Err(CpuError::Faulted { address });
        }

        // Fetch
        let address = self.regs.pc;
        let raw = self.mem.read(address);

        // Advance PC before execute; PC-relative operands use the new value
        self.regs.advance_pc();

        // Decode
        let instr = decode::decode(raw);
        trace!("{:#06x}: {:#06x} {:?}", address, raw, instr);

        // Execute; any error is fatal until the next reset
        if let Err(e) = self.execute(address, instr) {
            self.fault = Some(address);
            return Err(e);
        }

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(instr)
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction fetched from `address`.
    fn execute(&mut self, address: u16, instr: Instruction) -> Result<(), CpuError> {
        match instr {
            // ==================== Operate ====================

            Instruction::Add { dr, sr1, src2 } => {
                let value = self.regs.get(sr1).wrapping_add(self.operand(src2));
                self.set_result(dr, value);
            }

            Instruction::And { dr, sr1, src2 } => {
                let value = self.regs.get(sr1) & self.operand(src2);
                self.set_result(dr, value);
            }

            Instruction::Not { dr, sr } => {
                let value = !self.regs.get(sr);
                self.set_result(dr, value);
            }

            // ==================== Data Movement ====================

            Instruction::Ld { dr, offset } => {
                let value = self.mem.read(self.regs.pc_relative(offset));
                self.set_result(dr, value);
            }

            Instruction::Ldi { dr, offset } => {
                let pointer = self.mem.read(self.regs.pc_relative(offset));
                let value = self.mem.read(pointer);
                self.set_result(dr, value);
            }

            Instruction::Ldr { dr, base, offset } => {
                let value = self.mem.read(self.regs.get(base).wrapping_add(offset));
                self.set_result(dr, value);
            }

            Instruction::Lea { dr, offset } => {
                let value = self.regs.pc_relative(offset);
                self.set_result(dr, value);
            }

            Instruction::St { sr, offset } => {
                self.mem.write(self.regs.pc_relative(offset), self.regs.get(sr));
            }

            Instruction::Sti { sr, offset } => {
                let pointer = self.mem.read(self.regs.pc_relative(offset));
                self.mem.write(pointer, self.regs.get(sr));
            }

            Instruction::Str { sr, base, offset } => {
                self.mem.write(self.regs.get(base).wrapping_add(offset), self.regs.get(sr));
            }

            // ==================== Control ====================

            Instruction::Br { mask, offset } => {
                if mask.intersects(CondMask::from_bits_truncate(self.regs.cond().bits())) {
                    self.regs.jump(self.regs.pc_relative(offset));
                }
            }

            Instruction::Jmp { base } => {
                self.regs.jump(self.regs.get(base));
            }

            Instruction::Jsr { target } => {
                // Resolve before linking: JSRR R7 jumps to the old R7
                let dest = match target {
                    JsrTarget::Offset(offset) => self.regs.pc_relative(offset),
                    JsrTarget::Reg(base) => self.regs.get(base),
                };
                self.regs.set(Reg::R7, self.regs.pc);
                self.regs.jump(dest);
            }

            Instruction::Trap { vector } => {
                self.regs.set(Reg::R7, self.regs.pc);
                let vector = TrapVector::try_from(vector).map_err(|e| {
                    warn!(address, "{}", e);
                    CpuError::IllegalTrap { address, vector: e.0 }
                })?;
                self.trap(vector)?;
            }

            // ==================== Reserved ====================

            Instruction::Illegal { opcode } => {
                warn!(address, opcode, "illegal opcode");
                return Err(CpuError::IllegalOpcode { address, opcode });
            }
        }

        Ok(())
    }

    /// Value of the second ALU operand.
    fn operand(&self, src2: Operand) -> u16 {
        match src2 {
            Operand::Reg(reg) => self.regs.get(reg),
            Operand::Imm(imm) => imm,
        }
    }

    /// Write a register and update the condition code from it.
    pub(crate) fn set_result(&mut self, dr: Reg, value: u16) {
        self.regs.set(dr, value);
        self.regs.update_flags(dr);
    }

    /// Borrow the console.
    pub fn console(&self) -> &C {
        self.mem.console()
    }

    /// Mutably borrow the console.
    pub fn console_mut(&mut self) -> &mut C {
        self.mem.console_mut()
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU can execute another instruction.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running && self.fault.is_none()
    }

    /// Address of the instruction that stopped the machine with an error.
    pub fn fault(&self) -> Option<u16> {
        self.fault
    }
}

impl<C: Console + Default> Default for Cpu<C> {
    fn default() -> Self {
        Self::new(C::default())
    }
}

impl<C> std::fmt::Debug for Cpu<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("fault", &self.fault)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that stop the CPU.
#[derive(Debug, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("machine faulted at address {address:#06x}; reset to continue")]
    Faulted { address: u16 },

    #[error("illegal opcode {opcode:#x} at address {address:#06x}")]
    IllegalOpcode { address: u16, opcode: u8 },

    #[error("illegal trap vector {vector:#04x} at address {address:#06x}")]
    IllegalTrap { address: u16, vector: u8 },

    #[error("console error: {0}")]
    Console(#[from] io::Error),
}
