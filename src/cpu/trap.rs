//! Built-in trap routines.
//!
//! The LC-3 reaches the console only through TRAP. The six service routines
//! are implemented natively here instead of as guest code in a trap table.

use crate::console::Console;
use crate::cpu::execute::{Cpu, CpuState};
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::registers::Reg;
use std::io;
use thiserror::Error;
use tracing::{debug, info};

/// Prompt printed by the IN trap.
pub const IN_PROMPT: &str = "Enter a character: ";

/// Notice printed by the HALT trap.
pub const HALT_NOTICE: &str = "HALT\n";

/// Trap vector numbers (low byte of a TRAP instruction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TrapVector {
    /// Read a character without echo into R0.
    Getc = 0x20,
    /// Write the character in R0.
    Out = 0x21,
    /// Write a string of one character per word.
    Puts = 0x22,
    /// Prompt, read and echo a character into R0.
    In = 0x23,
    /// Write a string of two characters per word.
    Putsp = 0x24,
    /// Stop the machine.
    Halt = 0x25,
}

/// A TRAP instruction named a vector with no routine behind it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown trap vector {0:#04x}")]
pub struct UnknownTrap(pub u8);

impl TryFrom<u8> for TrapVector {
    type Error = UnknownTrap;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x20 => Ok(TrapVector::Getc),
            0x21 => Ok(TrapVector::Out),
            0x22 => Ok(TrapVector::Puts),
            0x23 => Ok(TrapVector::In),
            0x24 => Ok(TrapVector::Putsp),
            0x25 => Ok(TrapVector::Halt),
            other => Err(UnknownTrap(other)),
        }
    }
}

impl<C: Console> Cpu<C> {
    /// Run the service routine for `vector`.
    ///
    /// R7 has already been set to the return address by the caller.
    pub(crate) fn trap(&mut self, vector: TrapVector) -> io::Result<()> {
        debug!(?vector, r0 = self.regs.get(Reg::R0), "trap");

        match vector {
            TrapVector::Getc => {
                let key = self.mem.console_mut().read_char()?;
                self.set_result(Reg::R0, key as u16);
            }

            TrapVector::Out => {
                let byte = self.regs.get(Reg::R0) as u8;
                let console = self.mem.console_mut();
                console.write_char(byte)?;
                console.flush()?;
            }

            TrapVector::Puts => {
                self.write_string(|word, out| out.push(word as u8))?;
            }

            TrapVector::In => {
                let console = self.mem.console_mut();
                console.write_str(IN_PROMPT)?;
                console.flush()?;
                let key = console.read_char()?;
                console.write_char(key)?;
                console.flush()?;
                self.set_result(Reg::R0, key as u16);
            }

            TrapVector::Putsp => {
                self.write_string(|word, out| {
                    out.push((word & 0xFF) as u8);
                    let high = (word >> 8) as u8;
                    if high != 0 {
                        out.push(high);
                    }
                })?;
            }

            TrapVector::Halt => {
                let console = self.mem.console_mut();
                console.write_str(HALT_NOTICE)?;
                console.flush()?;
                self.state = CpuState::Halted;
                info!(cycles = self.cycles + 1, "machine halted");
            }
        }

        Ok(())
    }

    /// Walk the zero-terminated word string at R0, letting `unpack` turn each
    /// word into output bytes.
    ///
    /// Memory is read with `peek`, so a string running over KBSR does not poll
    /// the keyboard. The walk gives up after one full lap of memory.
    fn write_string(&mut self, unpack: impl Fn(u16, &mut Vec<u8>)) -> io::Result<()> {
        let start = self.regs.get(Reg::R0);
        let mut bytes = Vec::new();

        for step in 0..MEMORY_SIZE {
            let word = self.mem.peek(start.wrapping_add(step as u16));
            if word == 0 {
                break;
            }
            unpack(word, &mut bytes);
        }

        let console = self.mem.console_mut();
        for byte in bytes {
            console.write_char(byte)?;
        }
        console.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;
    use crate::cpu::registers::{Condition, PC_START};

    fn cpu_with_input(input: &str) -> Cpu<BufferConsole> {
        Cpu::new(BufferConsole::with_input(input))
    }

    #[test]
    fn test_vector_conversion() {
        assert_eq!(TrapVector::try_from(0x20), Ok(TrapVector::Getc));
        assert_eq!(TrapVector::try_from(0x25), Ok(TrapVector::Halt));
        assert_eq!(TrapVector::try_from(0x26), Err(UnknownTrap(0x26)));
        assert_eq!(TrapVector::try_from(0x1F), Err(UnknownTrap(0x1F)));
        assert_eq!(TrapVector::Putsp as u8, 0x24);
    }

    #[test]
    fn test_getc_no_echo() {
        let mut cpu = cpu_with_input("a");
        cpu.trap(TrapVector::Getc).unwrap();

        assert_eq!(cpu.regs.get(Reg::R0), b'a' as u16);
        assert_eq!(cpu.regs.cond(), Condition::Positive);
        assert!(cpu.console().output().is_empty());
    }

    #[test]
    fn test_getc_without_input_fails() {
        let mut cpu = cpu_with_input("");
        let err = cpu.trap(TrapVector::Getc).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_in_prompts_and_echoes() {
        let mut cpu = cpu_with_input("z");
        cpu.trap(TrapVector::In).unwrap();

        assert_eq!(cpu.regs.get(Reg::R0), b'z' as u16);
        assert_eq!(cpu.console().output_string(), "Enter a character: z");
    }

    #[test]
    fn test_out_writes_low_byte() {
        let mut cpu = cpu_with_input("");
        cpu.regs.set(Reg::R0, 0x1241);
        cpu.trap(TrapVector::Out).unwrap();

        assert_eq!(cpu.console().output(), b"A");
    }

    #[test]
    fn test_puts() {
        let mut cpu = cpu_with_input("");
        cpu.mem.load(0x4000, &[0x0048, 0x0049, 0x0000, 0x0058]);
        cpu.regs.set(Reg::R0, 0x4000);
        cpu.trap(TrapVector::Puts).unwrap();

        assert_eq!(cpu.console().output_string(), "HI");
    }

    #[test]
    fn test_puts_empty_string() {
        let mut cpu = cpu_with_input("");
        cpu.regs.set(Reg::R0, 0x4000);
        cpu.trap(TrapVector::Puts).unwrap();

        assert!(cpu.console().output().is_empty());
    }

    #[test]
    fn test_putsp_packed() {
        let mut cpu = cpu_with_input("");
        // "Hel" + "lo": low byte first, a zero high byte ends the word early
        cpu.mem.load(0x4000, &[0x6548, 0x006C, 0x6F6C, 0x0000]);
        cpu.regs.set(Reg::R0, 0x4000);
        cpu.trap(TrapVector::Putsp).unwrap();

        assert_eq!(cpu.console().output_string(), "Hello");
    }

    #[test]
    fn test_halt() {
        let mut cpu = cpu_with_input("");
        cpu.trap(TrapVector::Halt).unwrap();

        assert!(cpu.is_halted());
        assert_eq!(cpu.console().output_string(), "HALT\n");
        assert_eq!(cpu.regs.pc, PC_START);
    }
}
