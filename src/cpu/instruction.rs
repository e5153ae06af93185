//! Opcode table for the documented 6502 instruction set.
//!
//! One [`Instruction`] per official opcode (151 of them), indexed by opcode byte. Unofficial
//! opcodes have no entry and are reported as unknown by the CPU.

/// How an instruction finds its operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Relative,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Indirect,
    IndirectX,
    IndirectY,
}

impl AddressingMode {
    /// Instruction length in bytes (opcode included).
    pub const fn len(self) -> u8 {
        match self {
            AddressingMode::Implied | AddressingMode::Accumulator => 1,
            AddressingMode::Immediate
            | AddressingMode::ZeroPage
            | AddressingMode::ZeroPageX
            | AddressingMode::ZeroPageY
            | AddressingMode::Relative
            | AddressingMode::IndirectX
            | AddressingMode::IndirectY => 2,
            AddressingMode::Absolute
            | AddressingMode::AbsoluteX
            | AddressingMode::AbsoluteY
            | AddressingMode::Indirect => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mnemonic {
    Adc,
    And,
    Asl,
    Bcc,
    Bcs,
    Beq,
    Bit,
    Bmi,
    Bne,
    Bpl,
    Brk,
    Bvc,
    Bvs,
    Clc,
    Cld,
    Cli,
    Clv,
    Cmp,
    Cpx,
    Cpy,
    Dec,
    Dex,
    Dey,
    Eor,
    Inc,
    Inx,
    Iny,
    Jmp,
    Jsr,
    Lda,
    Ldx,
    Ldy,
    Lsr,
    Nop,
    Ora,
    Pha,
    Php,
    Pla,
    Plp,
    Rol,
    Ror,
    Rti,
    Rts,
    Sbc,
    Sec,
    Sed,
    Sei,
    Sta,
    Stx,
    Sty,
    Tax,
    Tay,
    Tsx,
    Txa,
    Txs,
    Tya,
}

/// Immutable descriptor for one opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Bytes consumed, opcode included. BRK counts its padding byte.
    pub len: u8,
    /// Base cycle count.
    pub cycles: u8,
    /// Extra cycles when indexing crosses a page boundary.
    pub page_penalty: u8,
}

const fn op(opcode: u8, mnemonic: Mnemonic, mode: AddressingMode, cycles: u8, page_penalty: u8) -> Instruction {
    Instruction {
        opcode,
        mnemonic,
        mode,
        len: mode.len(),
        cycles,
        page_penalty,
    }
}

use AddressingMode::*;
use Mnemonic::*;

const OPCODES: &[Instruction] = &[
    op(0x69, Adc, Immediate, 2, 0),
    op(0x65, Adc, ZeroPage, 3, 0),
    op(0x75, Adc, ZeroPageX, 4, 0),
    op(0x6D, Adc, Absolute, 4, 0),
    op(0x7D, Adc, AbsoluteX, 4, 1),
    op(0x79, Adc, AbsoluteY, 4, 1),
    op(0x61, Adc, IndirectX, 6, 0),
    op(0x71, Adc, IndirectY, 5, 1),
    op(0x29, And, Immediate, 2, 0),
    op(0x25, And, ZeroPage, 3, 0),
    op(0x35, And, ZeroPageX, 4, 0),
    op(0x2D, And, Absolute, 4, 0),
    op(0x3D, And, AbsoluteX, 4, 1),
    op(0x39, And, AbsoluteY, 4, 1),
    op(0x21, And, IndirectX, 6, 0),
    op(0x31, And, IndirectY, 5, 1),
    op(0x0A, Asl, Accumulator, 2, 0),
    op(0x06, Asl, ZeroPage, 5, 0),
    op(0x16, Asl, ZeroPageX, 6, 0),
    op(0x0E, Asl, Absolute, 6, 0),
    op(0x1E, Asl, AbsoluteX, 7, 0),
    op(0x90, Bcc, Relative, 2, 0),
    op(0xB0, Bcs, Relative, 2, 0),
    op(0xF0, Beq, Relative, 2, 0),
    op(0x30, Bmi, Relative, 2, 0),
    op(0xD0, Bne, Relative, 2, 0),
    op(0x10, Bpl, Relative, 2, 0),
    op(0x50, Bvc, Relative, 2, 0),
    op(0x70, Bvs, Relative, 2, 0),
    op(0x24, Bit, ZeroPage, 3, 0),
    op(0x2C, Bit, Absolute, 4, 0),
    Instruction {
        len: 2, // padding byte after BRK
        ..op(0x00, Brk, Implied, 7, 0)
    },
    op(0x18, Clc, Implied, 2, 0),
    op(0xD8, Cld, Implied, 2, 0),
    op(0x58, Cli, Implied, 2, 0),
    op(0xB8, Clv, Implied, 2, 0),
    op(0xC9, Cmp, Immediate, 2, 0),
    op(0xC5, Cmp, ZeroPage, 3, 0),
    op(0xD5, Cmp, ZeroPageX, 4, 0),
    op(0xCD, Cmp, Absolute, 4, 0),
    op(0xDD, Cmp, AbsoluteX, 4, 1),
    op(0xD9, Cmp, AbsoluteY, 4, 1),
    op(0xC1, Cmp, IndirectX, 6, 0),
    op(0xD1, Cmp, IndirectY, 5, 1),
    op(0xE0, Cpx, Immediate, 2, 0),
    op(0xE4, Cpx, ZeroPage, 3, 0),
    op(0xEC, Cpx, Absolute, 4, 0),
    op(0xC0, Cpy, Immediate, 2, 0),
    op(0xC4, Cpy, ZeroPage, 3, 0),
    op(0xCC, Cpy, Absolute, 4, 0),
    op(0xC6, Dec, ZeroPage, 5, 0),
    op(0xD6, Dec, ZeroPageX, 6, 0),
    op(0xCE, Dec, Absolute, 6, 0),
    op(0xDE, Dec, AbsoluteX, 7, 0),
    op(0xCA, Dex, Implied, 2, 0),
    op(0x88, Dey, Implied, 2, 0),
    op(0x49, Eor, Immediate, 2, 0),
    op(0x45, Eor, ZeroPage, 3, 0),
    op(0x55, Eor, ZeroPageX, 4, 0),
    op(0x4D, Eor, Absolute, 4, 0),
    op(0x5D, Eor, AbsoluteX, 4, 1),
    op(0x59, Eor, AbsoluteY, 4, 1),
    op(0x41, Eor, IndirectX, 6, 0),
    op(0x51, Eor, IndirectY, 5, 1),
    op(0xE6, Inc, ZeroPage, 5, 0),
    op(0xF6, Inc, ZeroPageX, 6, 0),
    op(0xEE, Inc, Absolute, 6, 0),
    op(0xFE, Inc, AbsoluteX, 7, 0),
    op(0xE8, Inx, Implied, 2, 0),
    op(0xC8, Iny, Implied, 2, 0),
    op(0x4C, Jmp, Absolute, 3, 0),
    op(0x6C, Jmp, Indirect, 5, 0),
    op(0x20, Jsr, Absolute, 6, 0),
    op(0xA9, Lda, Immediate, 2, 0),
    op(0xA5, Lda, ZeroPage, 3, 0),
    op(0xB5, Lda, ZeroPageX, 4, 0),
    op(0xAD, Lda, Absolute, 4, 0),
    op(0xBD, Lda, AbsoluteX, 4, 1),
    op(0xB9, Lda, AbsoluteY, 4, 1),
    op(0xA1, Lda, IndirectX, 6, 0),
    op(0xB1, Lda, IndirectY, 5, 1),
    op(0xA2, Ldx, Immediate, 2, 0),
    op(0xA6, Ldx, ZeroPage, 3, 0),
    op(0xB6, Ldx, ZeroPageY, 4, 0),
    op(0xAE, Ldx, Absolute, 4, 0),
    op(0xBE, Ldx, AbsoluteY, 4, 1),
    op(0xA0, Ldy, Immediate, 2, 0),
    op(0xA4, Ldy, ZeroPage, 3, 0),
    op(0xB4, Ldy, ZeroPageX, 4, 0),
    op(0xAC, Ldy, Absolute, 4, 0),
    op(0xBC, Ldy, AbsoluteX, 4, 1),
    op(0x4A, Lsr, Accumulator, 2, 0),
    op(0x46, Lsr, ZeroPage, 5, 0),
    op(0x56, Lsr, ZeroPageX, 6, 0),
    op(0x4E, Lsr, Absolute, 6, 0),
    op(0x5E, Lsr, AbsoluteX, 7, 0),
    op(0xEA, Nop, Implied, 2, 0),
    op(0x09, Ora, Immediate, 2, 0),
    op(0x05, Ora, ZeroPage, 3, 0),
    op(0x15, Ora, ZeroPageX, 4, 0),
    op(0x0D, Ora, Absolute, 4, 0),
    op(0x1D, Ora, AbsoluteX, 4, 1),
    op(0x19, Ora, AbsoluteY, 4, 1),
    op(0x01, Ora, IndirectX, 6, 0),
    op(0x11, Ora, IndirectY, 5, 1),
    op(0x48, Pha, Implied, 3, 0),
    op(0x08, Php, Implied, 3, 0),
    op(0x68, Pla, Implied, 4, 0),
    op(0x28, Plp, Implied, 4, 0),
    op(0x2A, Rol, Accumulator, 2, 0),
    op(0x26, Rol, ZeroPage, 5, 0),
    op(0x36, Rol, ZeroPageX, 6, 0),
    op(0x2E, Rol, Absolute, 6, 0),
    op(0x3E, Rol, AbsoluteX, 7, 0),
    op(0x6A, Ror, Accumulator, 2, 0),
    op(0x66, Ror, ZeroPage, 5, 0),
    op(0x76, Ror, ZeroPageX, 6, 0),
    op(0x6E, Ror, Absolute, 6, 0),
    op(0x7E, Ror, AbsoluteX, 7, 0),
    op(0x40, Rti, Implied, 6, 0),
    op(0x60, Rts, Implied, 6, 0),
    op(0xE9, Sbc, Immediate, 2, 0),
    op(0xE5, Sbc, ZeroPage, 3, 0),
    op(0xF5, Sbc, ZeroPageX, 4, 0),
    op(0xED, Sbc, Absolute, 4, 0),
    op(0xFD, Sbc, AbsoluteX, 4, 1),
    op(0xF9, Sbc, AbsoluteY, 4, 1),
    op(0xE1, Sbc, IndirectX, 6, 0),
    op(0xF1, Sbc, IndirectY, 5, 1),
    op(0x38, Sec, Implied, 2, 0),
    op(0xF8, Sed, Implied, 2, 0),
    op(0x78, Sei, Implied, 2, 0),
    op(0x85, Sta, ZeroPage, 3, 0),
    op(0x95, Sta, ZeroPageX, 4, 0),
    op(0x8D, Sta, Absolute, 4, 0),
    op(0x9D, Sta, AbsoluteX, 5, 0),
    op(0x99, Sta, AbsoluteY, 5, 0),
    op(0x81, Sta, IndirectX, 6, 0),
    op(0x91, Sta, IndirectY, 6, 0),
    op(0x86, Stx, ZeroPage, 3, 0),
    op(0x96, Stx, ZeroPageY, 4, 0),
    op(0x8E, Stx, Absolute, 4, 0),
    op(0x84, Sty, ZeroPage, 3, 0),
    op(0x94, Sty, ZeroPageX, 4, 0),
    op(0x8C, Sty, Absolute, 4, 0),
    op(0xAA, Tax, Implied, 2, 0),
    op(0xA8, Tay, Implied, 2, 0),
    op(0xBA, Tsx, Implied, 2, 0),
    op(0x8A, Txa, Implied, 2, 0),
    op(0x9A, Txs, Implied, 2, 0),
    op(0x98, Tya, Implied, 2, 0),
];

const fn build_table() -> [Option<Instruction>; 256] {
    let mut table = [None; 256];
    let mut i = 0;
    while i < OPCODES.len() {
        let inst = OPCODES[i];
        table[inst.opcode as usize] = Some(inst);
        i += 1;
    }
    table
}

/// Every documented opcode, keyed by opcode byte.
pub static INSTRUCTIONS: [Option<Instruction>; 256] = build_table();

/// Look up the descriptor for `opcode`; `None` for undocumented opcodes.
pub fn lookup(opcode: u8) -> Option<&'static Instruction> {
    INSTRUCTIONS[opcode as usize].as_ref()
}
