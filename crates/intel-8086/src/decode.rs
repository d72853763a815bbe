//! Opcode table.
//!
//! Every first byte maps to a descriptor naming the instruction, the lowest
//! instruction-set level that defines it and its base cycle cost. Group
//! opcodes defer to a second table indexed by the ModRM reg field, and the
//! 80286 `0F` map has its own table. A `None` from any of the sub-tables, or
//! an ISA level above the fitted CPU's, means "raise invalid opcode".

use crate::model::Isa;

/// How the dispatcher treats a first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    /// A complete instruction.
    Plain,
    /// Segment override, repeat or LOCK prefix.
    Prefix,
    /// ModRM reg field selects the operation.
    Group(Group),
    /// No instruction on any model.
    Invalid,
}

/// Opcode groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    /// 80-83: ALU r/m, imm.
    Immediate,
    /// 8F: POP r/m.
    Pop,
    /// C0, C1, D0-D3: shifts and rotates.
    Shift,
    /// C6, C7: MOV r/m, imm.
    Move,
    /// F6, F7: TEST NOT NEG MUL IMUL DIV IDIV.
    Unary,
    /// FE: INC/DEC r/m8.
    IncDec,
    /// FF: INC DEC CALL JMP PUSH.
    Misc,
    /// 0F: 80286 two-byte map.
    Extended,
}

/// Descriptor for one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: &'static str,
    pub isa: Isa,
    /// Base cost, register form.
    pub cycles: u8,
    pub class: Class,
}

/// Descriptor for one group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubOp {
    pub mnemonic: &'static str,
    pub cycles: u8,
}

const fn plain(mnemonic: &'static str, cycles: u8) -> Opcode {
    Opcode {
        mnemonic,
        isa: Isa::I8086,
        cycles,
        class: Class::Plain,
    }
}

const fn since(isa: Isa, mnemonic: &'static str, cycles: u8) -> Opcode {
    Opcode {
        mnemonic,
        isa,
        cycles,
        class: Class::Plain,
    }
}

const fn prefix(mnemonic: &'static str) -> Opcode {
    Opcode {
        mnemonic,
        isa: Isa::I8086,
        cycles: 2,
        class: Class::Prefix,
    }
}

const fn group(isa: Isa, mnemonic: &'static str, cycles: u8, group: Group) -> Opcode {
    Opcode {
        mnemonic,
        isa,
        cycles,
        class: Class::Group(group),
    }
}

const INVALID: Opcode = Opcode {
    mnemonic: "???",
    isa: Isa::I8086,
    cycles: 10,
    class: Class::Invalid,
};

const ALU_NAMES: [&str; 8] = ["ADD", "OR", "ADC", "SBB", "AND", "SUB", "XOR", "CMP"];

const fn describe(op: u8) -> Opcode {
    match op {
        // ALU block: op r/m,reg / reg,r/m / acc,imm
        0x00..=0x3F if op & 7 < 4 => plain(ALU_NAMES[(op >> 3) as usize], 3),
        0x00..=0x3F if op & 7 < 6 => plain(ALU_NAMES[(op >> 3) as usize], 4),
        0x06 | 0x0E | 0x16 | 0x1E => plain("PUSH", 10),
        0x07 | 0x17 | 0x1F => plain("POP", 8),
        0x0F => group(Isa::I80286, "0F", 2, Group::Extended),
        0x26 | 0x2E | 0x36 | 0x3E => prefix("SEG"),
        0x27 => plain("DAA", 4),
        0x2F => plain("DAS", 4),
        0x37 => plain("AAA", 8),
        0x3F => plain("AAS", 8),
        0x40..=0x47 => plain("INC", 2),
        0x48..=0x4F => plain("DEC", 2),
        0x50..=0x57 => plain("PUSH", 11),
        0x58..=0x5F => plain("POP", 8),
        0x60 => since(Isa::I80186, "PUSHA", 36),
        0x61 => since(Isa::I80186, "POPA", 51),
        0x62 => since(Isa::I80186, "BOUND", 33),
        0x63 => since(Isa::I80286, "ARPL", 10),
        0x68 | 0x6A => since(Isa::I80186, "PUSH", 10),
        0x69 | 0x6B => since(Isa::I80186, "IMUL", 25),
        0x6C | 0x6D => since(Isa::I80186, "INS", 14),
        0x6E | 0x6F => since(Isa::I80186, "OUTS", 14),
        0x70..=0x7F => plain("Jcc", 4),
        0x80..=0x83 => group(Isa::I8086, "GRP1", 4, Group::Immediate),
        0x84 | 0x85 => plain("TEST", 3),
        0x86 | 0x87 => plain("XCHG", 4),
        0x88..=0x8B => plain("MOV", 2),
        0x8C | 0x8E => plain("MOV", 2),
        0x8D => plain("LEA", 2),
        0x8F => group(Isa::I8086, "POP", 17, Group::Pop),
        0x90 => plain("NOP", 3),
        0x91..=0x97 => plain("XCHG", 3),
        0x98 => plain("CBW", 2),
        0x99 => plain("CWD", 5),
        0x9A => plain("CALL", 28),
        0x9B => plain("WAIT", 4),
        0x9C => plain("PUSHF", 10),
        0x9D => plain("POPF", 8),
        0x9E => plain("SAHF", 4),
        0x9F => plain("LAHF", 4),
        0xA0..=0xA3 => plain("MOV", 10),
        0xA4 | 0xA5 => plain("MOVS", 18),
        0xA6 | 0xA7 => plain("CMPS", 22),
        0xA8 | 0xA9 => plain("TEST", 4),
        0xAA | 0xAB => plain("STOS", 11),
        0xAC | 0xAD => plain("LODS", 12),
        0xAE | 0xAF => plain("SCAS", 15),
        0xB0..=0xBF => plain("MOV", 4),
        0xC0 | 0xC1 => group(Isa::I80186, "GRP2", 5, Group::Shift),
        0xC2 => plain("RET", 20),
        0xC3 => plain("RET", 16),
        0xC4 => plain("LES", 16),
        0xC5 => plain("LDS", 16),
        0xC6 | 0xC7 => group(Isa::I8086, "MOV", 10, Group::Move),
        0xC8 => since(Isa::I80186, "ENTER", 15),
        0xC9 => since(Isa::I80186, "LEAVE", 8),
        0xCA => plain("RETF", 25),
        0xCB => plain("RETF", 26),
        0xCC => plain("INT3", 52),
        0xCD => plain("INT", 51),
        0xCE => plain("INTO", 4),
        0xCF => plain("IRET", 24),
        0xD0..=0xD3 => group(Isa::I8086, "GRP2", 2, Group::Shift),
        0xD4 => plain("AAM", 83),
        0xD5 => plain("AAD", 60),
        0xD7 => plain("XLAT", 11),
        0xD8..=0xDF => plain("ESC", 2),
        0xE0 => plain("LOOPNZ", 5),
        0xE1 => plain("LOOPZ", 6),
        0xE2 => plain("LOOP", 5),
        0xE3 => plain("JCXZ", 6),
        0xE4 | 0xE5 | 0xEC | 0xED => plain("IN", 10),
        0xE6 | 0xE7 | 0xEE | 0xEF => plain("OUT", 10),
        0xE8 => plain("CALL", 19),
        0xE9 | 0xEB => plain("JMP", 15),
        0xEA => plain("JMP", 15),
        0xF0 => prefix("LOCK"),
        0xF2 => prefix("REPNZ"),
        0xF3 => prefix("REPZ"),
        0xF4 => plain("HLT", 2),
        0xF5 => plain("CMC", 2),
        0xF6 | 0xF7 => group(Isa::I8086, "GRP3", 3, Group::Unary),
        0xF8 => plain("CLC", 2),
        0xF9 => plain("STC", 2),
        0xFA => plain("CLI", 2),
        0xFB => plain("STI", 2),
        0xFC => plain("CLD", 2),
        0xFD => plain("STD", 2),
        0xFE => group(Isa::I8086, "GRP4", 3, Group::IncDec),
        0xFF => group(Isa::I8086, "GRP5", 3, Group::Misc),
        _ => INVALID,
    }
}

/// First-byte opcode table.
pub static OPCODES: [Opcode; 256] = {
    let mut table = [INVALID; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = describe(i as u8);
        i += 1;
    }
    table
};

const fn sub(mnemonic: &'static str, cycles: u8) -> Option<SubOp> {
    Some(SubOp { mnemonic, cycles })
}

/// Look up the operation a group opcode performs for a given reg field.
#[must_use]
pub const fn group_op(group: Group, reg: u8) -> Option<SubOp> {
    let reg = reg & 7;
    match group {
        Group::Immediate => sub(ALU_NAMES[reg as usize], 4),
        Group::Pop if reg == 0 => sub("POP", 0),
        Group::Move if reg == 0 => sub("MOV", 0),
        Group::Pop | Group::Move => None,
        Group::Shift => match reg {
            0 => sub("ROL", 2),
            1 => sub("ROR", 2),
            2 => sub("RCL", 2),
            3 => sub("RCR", 2),
            4 | 6 => sub("SHL", 2),
            5 => sub("SHR", 2),
            _ => sub("SAR", 2),
        },
        Group::Unary => match reg {
            0 | 1 => sub("TEST", 2),
            2 => sub("NOT", 0),
            3 => sub("NEG", 0),
            4 => sub("MUL", 67),
            5 => sub("IMUL", 77),
            6 => sub("DIV", 87),
            _ => sub("IDIV", 105),
        },
        Group::IncDec => match reg {
            0 => sub("INC", 0),
            1 => sub("DEC", 0),
            _ => None,
        },
        Group::Misc => match reg {
            0 => sub("INC", 0),
            1 => sub("DEC", 0),
            2 => sub("CALL", 13),
            3 => sub("CALLF", 34),
            4 => sub("JMP", 8),
            5 => sub("JMPF", 21),
            6 => sub("PUSH", 8),
            _ => None,
        },
        Group::Extended => None,
    }
}

/// Second byte of the 80286 `0F` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extended {
    /// 0F 00: SLDT STR LLDT LTR VERR VERW.
    Group6,
    /// 0F 01: SGDT SIDT LGDT LIDT SMSW LMSW.
    Group7,
    Lar,
    Lsl,
    Loadall,
    Clts,
}

/// Look up the second byte of a `0F` instruction.
#[must_use]
pub const fn extended_op(op: u8) -> Option<(Extended, SubOp)> {
    match op {
        0x00 => Some((Extended::Group6, SubOp { mnemonic: "GRP6", cycles: 2 })),
        0x01 => Some((Extended::Group7, SubOp { mnemonic: "GRP7", cycles: 3 })),
        0x02 => Some((Extended::Lar, SubOp { mnemonic: "LAR", cycles: 14 })),
        0x03 => Some((Extended::Lsl, SubOp { mnemonic: "LSL", cycles: 14 })),
        0x05 => Some((Extended::Loadall, SubOp { mnemonic: "LOADALL", cycles: 195 })),
        0x06 => Some((Extended::Clts, SubOp { mnemonic: "CLTS", cycles: 2 })),
        _ => None,
    }
}

/// Members of `0F 00`.
#[must_use]
pub const fn group6_op(reg: u8) -> Option<SubOp> {
    match reg & 7 {
        0 => sub("SLDT", 2),
        1 => sub("STR", 2),
        2 => sub("LLDT", 17),
        3 => sub("LTR", 17),
        4 => sub("VERR", 14),
        5 => sub("VERW", 14),
        _ => None,
    }
}

/// Members of `0F 01`.
#[must_use]
pub const fn group7_op(reg: u8) -> Option<SubOp> {
    match reg & 7 {
        0 => sub("SGDT", 11),
        1 => sub("SIDT", 12),
        2 => sub("LGDT", 11),
        3 => sub("LIDT", 12),
        4 => sub("SMSW", 2),
        6 => sub("LMSW", 3),
        _ => None,
    }
}
