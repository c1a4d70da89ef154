//! Instruction decoder for the LC-3.
//!
//! Every instruction is a single 16-bit word. Bits 15-12 hold the opcode,
//! the remaining bits are opcode-specific operand fields.

use crate::cpu::registers::Reg;
use bitflags::bitflags;

bitflags! {
    /// The `nzp` condition field of a BR instruction (bits 11-9).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CondMask: u16 {
        const P = 0b001;
        const Z = 0b010;
        const N = 0b100;
    }
}

/// Second source operand of ADD and AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Register mode (bit 5 clear): SR2 in bits 2-0.
    Reg(Reg),
    /// Immediate mode (bit 5 set): imm5, already sign-extended.
    Imm(u16),
}

/// Where JSR jumps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsrTarget {
    /// JSR (bit 11 set): PC-relative, PCoffset11 already sign-extended.
    Offset(u16),
    /// JSRR (bit 11 clear): address held in a base register.
    Reg(Reg),
}

/// Decoded LC-3 instruction.
///
/// All offsets and immediates are stored sign-extended to 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // ==================== Operate ====================

    /// DR := SR1 + operand
    Add { dr: Reg, sr1: Reg, src2: Operand },

    /// DR := SR1 & operand
    And { dr: Reg, sr1: Reg, src2: Operand },

    /// DR := !SR
    Not { dr: Reg, sr: Reg },

    // ==================== Data Movement ====================

    /// DR := mem[PC + offset]
    Ld { dr: Reg, offset: u16 },

    /// DR := mem[mem[PC + offset]]
    Ldi { dr: Reg, offset: u16 },

    /// DR := mem[BaseR + offset]
    Ldr { dr: Reg, base: Reg, offset: u16 },

    /// DR := PC + offset
    Lea { dr: Reg, offset: u16 },

    /// mem[PC + offset] := SR
    St { sr: Reg, offset: u16 },

    /// mem[mem[PC + offset]] := SR
    Sti { sr: Reg, offset: u16 },

    /// mem[BaseR + offset] := SR
    Str { sr: Reg, base: Reg, offset: u16 },

    // ==================== Control ====================

    /// if (nzp & COND) != 0 then PC := PC + offset
    Br { mask: CondMask, offset: u16 },

    /// PC := BaseR (RET is JMP R7)
    Jmp { base: Reg },

    /// R7 := PC, then jump to the target
    Jsr { target: JsrTarget },

    /// R7 := PC, then run the trap routine
    Trap { vector: u8 },

    // ==================== Reserved ====================

    /// RTI (0b1000) and the reserved opcode (0b1101).
    Illegal { opcode: u8 },
}

/// Opcode values, bits 15-12.
mod opcode {
    pub const BR: u16 = 0b0000;
    pub const ADD: u16 = 0b0001;
    pub const LD: u16 = 0b0010;
    pub const ST: u16 = 0b0011;
    pub const JSR: u16 = 0b0100;
    pub const AND: u16 = 0b0101;
    pub const LDR: u16 = 0b0110;
    pub const STR: u16 = 0b0111;
    pub const RTI: u16 = 0b1000;
    pub const NOT: u16 = 0b1001;
    pub const LDI: u16 = 0b1010;
    pub const STI: u16 = 0b1011;
    pub const JMP: u16 = 0b1100;
    pub const RES: u16 = 0b1101;
    pub const LEA: u16 = 0b1110;
    pub const TRAP: u16 = 0b1111;
}

/// Sign-extend the low `bit_count` bits of `x` to 16 bits.
///
/// Bits above `bit_count` in the input are ignored.
pub fn sign_extend(x: u16, bit_count: u32) -> u16 {
    debug_assert!((1..16).contains(&bit_count));
    let x = x & low_mask(bit_count);
    if (x >> (bit_count - 1)) & 1 == 1 {
        x | (0xFFFF << bit_count)
    } else {
        x
    }
}

#[inline]
fn low_mask(bit_count: u32) -> u16 {
    (1u16 << bit_count) - 1
}

/// ADD/AND second operand: bit 5 selects imm5 over SR2.
fn alu_operand(word: u16) -> Operand {
    if (word >> 5) & 1 == 1 {
        Operand::Imm(sign_extend(word, 5))
    } else {
        Operand::Reg(Reg::from_bits(word))
    }
}

/// Decode a 16-bit instruction word.
///
/// Total: every word decodes to some variant, with the two unused opcodes
/// mapping to [`Instruction::Illegal`].
pub fn decode(word: u16) -> Instruction {
    let op = word >> 12;
    // Bits 11-9: DR or SR; bits 8-6: SR1 or BaseR
    let r_hi = Reg::from_bits(word >> 9);
    let r_mid = Reg::from_bits(word >> 6);
    let offset9 = sign_extend(word, 9);

    match op {
        opcode::BR => Instruction::Br {
            mask: CondMask::from_bits_truncate((word >> 9) & 0x7),
            offset: offset9,
        },
        opcode::ADD => Instruction::Add { dr: r_hi, sr1: r_mid, src2: alu_operand(word) },
        opcode::AND => Instruction::And { dr: r_hi, sr1: r_mid, src2: alu_operand(word) },
        opcode::NOT => Instruction::Not { dr: r_hi, sr: r_mid },
        opcode::LD => Instruction::Ld { dr: r_hi, offset: offset9 },
        opcode::LDI => Instruction::Ldi { dr: r_hi, offset: offset9 },
        opcode::LDR => Instruction::Ldr { dr: r_hi, base: r_mid, offset: sign_extend(word, 6) },
        opcode::LEA => Instruction::Lea { dr: r_hi, offset: offset9 },
        opcode::ST => Instruction::St { sr: r_hi, offset: offset9 },
        opcode::STI => Instruction::Sti { sr: r_hi, offset: offset9 },
        opcode::STR => Instruction::Str { sr: r_hi, base: r_mid, offset: sign_extend(word, 6) },
        opcode::JMP => Instruction::Jmp { base: r_mid },
        opcode::JSR => {
            let target = if (word >> 11) & 1 == 1 {
                JsrTarget::Offset(sign_extend(word, 11))
            } else {
                JsrTarget::Reg(r_mid)
            };
            Instruction::Jsr { target }
        }
        opcode::TRAP => Instruction::Trap { vector: (word & 0xFF) as u8 },
        _ => {
            debug_assert!(op == opcode::RTI || op == opcode::RES);
            Instruction::Illegal { opcode: op as u8 }
        }
    }
}

/// Encode an instruction back to a 16-bit word.
///
/// Offsets and immediates are truncated to their field width.
pub fn encode(instr: &Instruction) -> u16 {
    fn reg(r: Reg, shift: u32) -> u16 {
        (r.index() as u16) << shift
    }
    fn field(value: u16, bit_count: u32) -> u16 {
        value & low_mask(bit_count)
    }
    fn alu(op: u16, dr: Reg, sr1: Reg, src2: Operand) -> u16 {
        let src2 = match src2 {
            Operand::Reg(sr2) => reg(sr2, 0),
            Operand::Imm(imm) => 1 << 5 | field(imm, 5),
        };
        op << 12 | reg(dr, 9) | reg(sr1, 6) | src2
    }

    match *instr {
        Instruction::Add { dr, sr1, src2 } => alu(opcode::ADD, dr, sr1, src2),
        Instruction::And { dr, sr1, src2 } => alu(opcode::AND, dr, sr1, src2),
        Instruction::Not { dr, sr } => opcode::NOT << 12 | reg(dr, 9) | reg(sr, 6) | 0x3F,
        Instruction::Ld { dr, offset } => opcode::LD << 12 | reg(dr, 9) | field(offset, 9),
        Instruction::Ldi { dr, offset } => opcode::LDI << 12 | reg(dr, 9) | field(offset, 9),
        Instruction::Ldr { dr, base, offset } => {
            opcode::LDR << 12 | reg(dr, 9) | reg(base, 6) | field(offset, 6)
        }
        Instruction::Lea { dr, offset } => opcode::LEA << 12 | reg(dr, 9) | field(offset, 9),
        Instruction::St { sr, offset } => opcode::ST << 12 | reg(sr, 9) | field(offset, 9),
        Instruction::Sti { sr, offset } => opcode::STI << 12 | reg(sr, 9) | field(offset, 9),
        Instruction::Str { sr, base, offset } => {
            opcode::STR << 12 | reg(sr, 9) | reg(base, 6) | field(offset, 6)
        }
        Instruction::Br { mask, offset } => opcode::BR << 12 | mask.bits() << 9 | field(offset, 9),
        Instruction::Jmp { base } => opcode::JMP << 12 | reg(base, 6),
        Instruction::Jsr { target: JsrTarget::Offset(offset) } => {
            opcode::JSR << 12 | 1 << 11 | field(offset, 11)
        }
        Instruction::Jsr { target: JsrTarget::Reg(base) } => opcode::JSR << 12 | reg(base, 6),
        Instruction::Trap { vector } => opcode::TRAP << 12 | vector as u16,
        Instruction::Illegal { opcode } => field(opcode as u16, 4) << 12,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sign_extend_examples() {
        assert_eq!(sign_extend(0b11111, 5), 0xFFFF);
        assert_eq!(sign_extend(0b01111, 5), 15);
        assert_eq!(sign_extend(0b10000, 5), 0xFFF0);
        assert_eq!(sign_extend(0x1FF, 9), 0xFFFF);
        assert_eq!(sign_extend(0x100, 9), 0xFF00);
        assert_eq!(sign_extend(0x3FF, 11), 0x03FF);
        assert_eq!(sign_extend(0x400, 11), 0xFC00);
        assert_eq!(sign_extend(0b100000, 6), 0xFFE0);
    }

    #[test]
    fn test_sign_extend_ignores_high_bits() {
        // Opcode and register bits above the field must not leak in
        assert_eq!(sign_extend(0x1021, 5), 1);
    }

    proptest! {
        #[test]
        fn sign_extend_preserves_signed_value(
            bits in prop::sample::select(vec![5u32, 6, 9, 11]),
            raw in any::<u16>(),
        ) {
            let pattern = raw & ((1u16 << bits) - 1);
            let as_n_bit = if pattern >> (bits - 1) == 1 {
                pattern as i32 - (1i32 << bits)
            } else {
                pattern as i32
            };
            prop_assert_eq!(sign_extend(pattern, bits) as i16 as i32, as_n_bit);
        }

        #[test]
        fn decode_is_total(word in any::<u16>()) {
            let op = (word >> 12) as u8;
            let decoded = decode(word);
            let illegal = matches!(decoded, Instruction::Illegal { .. });
            prop_assert_eq!(illegal, op == 0b1000 || op == 0b1101);
        }
    }

    #[test]
    fn test_decode_add_register() {
        // ADD R0, R1, R2
        assert_eq!(
            decode(0x1042),
            Instruction::Add { dr: Reg::R0, sr1: Reg::R1, src2: Operand::Reg(Reg::R2) }
        );
    }

    #[test]
    fn test_decode_add_immediate() {
        // ADD R0, R1, #-1
        assert_eq!(
            decode(0x107F),
            Instruction::Add { dr: Reg::R0, sr1: Reg::R1, src2: Operand::Imm(0xFFFF) }
        );
    }

    #[test]
    fn test_decode_br() {
        // BRz #-3
        assert_eq!(
            decode(0x05FD),
            Instruction::Br { mask: CondMask::Z, offset: 0xFFFD }
        );
        // BRnzp #0
        assert_eq!(
            decode(0x0E00),
            Instruction::Br { mask: CondMask::all(), offset: 0 }
        );
    }

    #[test]
    fn test_decode_jsr_modes() {
        assert_eq!(
            decode(0x4FFF),
            Instruction::Jsr { target: JsrTarget::Offset(0xFFFF) }
        );
        assert_eq!(
            decode(0x4080),
            Instruction::Jsr { target: JsrTarget::Reg(Reg::R2) }
        );
    }

    #[test]
    fn test_decode_ret() {
        assert_eq!(decode(0xC1C0), Instruction::Jmp { base: Reg::R7 });
    }

    #[test]
    fn test_decode_memory_ops() {
        assert_eq!(decode(0x2205), Instruction::Ld { dr: Reg::R1, offset: 5 });
        assert_eq!(decode(0xA1FF), Instruction::Ldi { dr: Reg::R0, offset: 0xFFFF });
        assert_eq!(
            decode(0x6A7E),
            Instruction::Ldr { dr: Reg::R5, base: Reg::R1, offset: 0xFFFE }
        );
        assert_eq!(decode(0xE002), Instruction::Lea { dr: Reg::R0, offset: 2 });
        assert_eq!(
            decode(0x7D82),
            Instruction::Str { sr: Reg::R6, base: Reg::R6, offset: 2 }
        );
    }

    #[test]
    fn test_decode_trap_and_illegal() {
        assert_eq!(decode(0xF025), Instruction::Trap { vector: 0x25 });
        assert_eq!(decode(0x8000), Instruction::Illegal { opcode: 0x8 });
        assert_eq!(decode(0xD123), Instruction::Illegal { opcode: 0xD });
    }

    #[test]
    fn test_encode_matches_reference_words() {
        let cases = [
            (0x1042, Instruction::Add { dr: Reg::R0, sr1: Reg::R1, src2: Operand::Reg(Reg::R2) }),
            (0x107F, Instruction::Add { dr: Reg::R0, sr1: Reg::R1, src2: Operand::Imm(0xFFFF) }),
            (0x927F, Instruction::Not { dr: Reg::R1, sr: Reg::R1 }),
            (0xC1C0, Instruction::Jmp { base: Reg::R7 }),
            (0xE002, Instruction::Lea { dr: Reg::R0, offset: 2 }),
            (0xF022, Instruction::Trap { vector: 0x22 }),
        ];

        for (word, instr) in cases {
            assert_eq!(encode(&instr), word, "{:?}", instr);
            assert_eq!(decode(word), instr);
        }
    }
}
