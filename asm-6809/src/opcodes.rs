//! Mnemonic table: each entry names the emission template ("category") and
//! the base opcode value that template works from. Sorted by name for
//! binary search, transcribed from the reference assembler's `optable[]`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Fixed one-byte opcode, no operand (NOP, CLRA, RTS, ...).
    OneByte,
    /// A literal two-byte sequence, used both for genuine two-byte opcodes
    /// (SWI2) and for pseudo-mnemonics synthesized from another instruction
    /// plus a fixed operand byte (CLC = ANDCC #$FE, DEX = LEAX -1,X).
    TwoByte,
    /// One-byte opcode followed by an immediate byte (ANDCC, CWAI).
    OneImm,
    /// LEAX/LEAY/LEAS/LEAU: indexed-only addressing.
    Lea,
    /// 8-bit conditional branch.
    ShortBranch,
    /// 16-bit conditional branch, two-byte opcode (LBxx other than LBRA/LBSR).
    LongBranch2,
    /// 16-bit unconditional branch, one-byte opcode (LBRA, LBSR).
    LongBranch1,
    /// Accumulator arithmetic/logic with the 4-mode immediate/direct/indexed/extended fan-out.
    Arith,
    /// 16-bit register arithmetic/load/store, one-byte base opcode (X/U/D family).
    DArith,
    /// 16-bit register arithmetic/load/store, two-byte base opcode (Y/S family).
    D2Arith,
    /// Single-address read-modify-write (NEG, COM, ASL, ...).
    OneAddr,
    /// TFR/EXG: register-pair postbyte.
    TfrExg,
    /// PSHS/PSHU/PULS/PULU: register-mask postbyte.
    PshPul,
    /// Pseudo-op; `code` is the sub-operation number, not a CPU opcode.
    PseudoOp,
}

#[derive(Debug, Clone, Copy)]
pub struct OpRecord {
    pub name: &'static str,
    pub category: Category,
    pub code: u16,
}

pub mod pseudo {
    pub const RMB: u16 = 0;
    pub const ELSE: u16 = 1;
    pub const END: u16 = 2;
    pub const ENDIF: u16 = 3;
    pub const ENDM: u16 = 4;
    pub const EQU: u16 = 5;
    pub const EXTERN: u16 = 6;
    pub const FCB: u16 = 7;
    pub const FCC: u16 = 8;
    pub const FCW: u16 = 9;
    pub const IF: u16 = 10;
    pub const MACRO: u16 = 11;
    pub const ORG: u16 = 12;
    pub const PUBLIC: u16 = 13;
    pub const SETDP: u16 = 14;
    pub const SET: u16 = 15;
    pub const INCLUDE: u16 = 16;
    pub const TITLE: u16 = 18;
}

use Category::{Arith, DArith, D2Arith, Lea, LongBranch1, LongBranch2, OneAddr, OneByte, OneImm, PseudoOp as Pso, PshPul, ShortBranch, TfrExg, TwoByte};

macro_rules! op {
    ($name:literal, $cat:expr, $code:expr) => {
        OpRecord { name: $name, category: $cat, code: $code }
    };
}

/// The full mnemonic table, sorted alphabetically (required for binary search).
pub static OPTABLE: &[OpRecord] = &[
    op!("ABX", OneByte, 0x3a),
    op!("ADCA", Arith, 0x89),
    op!("ADCB", Arith, 0xc9),
    op!("ADDA", Arith, 0x8b),
    op!("ADDB", Arith, 0xcb),
    op!("ADDD", DArith, 0xc3),
    op!("ANDA", Arith, 0x84),
    op!("ANDB", Arith, 0xc4),
    op!("ANDCC", OneImm, 0x1c),
    op!("ASL", OneAddr, 0x08),
    op!("ASLA", OneByte, 0x48),
    op!("ASLB", OneByte, 0x58),
    op!("ASR", OneAddr, 0x07),
    op!("ASRA", OneByte, 0x47),
    op!("ASRB", OneByte, 0x57),
    op!("BCC", ShortBranch, 0x24),
    op!("BCS", ShortBranch, 0x25),
    op!("BEQ", ShortBranch, 0x27),
    op!("BGE", ShortBranch, 0x2c),
    op!("BGT", ShortBranch, 0x2e),
    op!("BHI", ShortBranch, 0x22),
    op!("BHS", ShortBranch, 0x24),
    op!("BITA", Arith, 0x85),
    op!("BITB", Arith, 0xc5),
    op!("BLE", ShortBranch, 0x2f),
    op!("BLO", ShortBranch, 0x25),
    op!("BLS", ShortBranch, 0x23),
    op!("BLT", ShortBranch, 0x2d),
    op!("BMI", ShortBranch, 0x2b),
    op!("BNE", ShortBranch, 0x26),
    op!("BPL", ShortBranch, 0x2a),
    op!("BRA", ShortBranch, 0x20),
    op!("BRN", ShortBranch, 0x21),
    op!("BSR", ShortBranch, 0x8d),
    op!("BVC", ShortBranch, 0x28),
    op!("BVS", ShortBranch, 0x29),
    op!("CLC", TwoByte, 0x1cfe),
    op!("CLF", TwoByte, 0x1cbf),
    op!("CLI", TwoByte, 0x1cef),
    op!("CLIF", TwoByte, 0x1caf),
    op!("CLR", OneAddr, 0x0f),
    op!("CLRA", OneByte, 0x4f),
    op!("CLRB", OneByte, 0x5f),
    op!("CLV", TwoByte, 0x1cfd),
    op!("CMPA", Arith, 0x81),
    op!("CMPB", Arith, 0xc1),
    op!("CMPD", D2Arith, 0x1083),
    op!("CMPS", D2Arith, 0x118c),
    op!("CMPU", D2Arith, 0x1183),
    op!("CMPX", DArith, 0x8c),
    op!("CMPY", D2Arith, 0x108c),
    op!("COM", OneAddr, 0x03),
    op!("COMA", OneByte, 0x43),
    op!("COMB", OneByte, 0x53),
    op!("CWAI", OneImm, 0x3c),
    op!("DAA", OneByte, 0x19),
    op!("DEC", OneAddr, 0x0a),
    op!("DECA", OneByte, 0x4a),
    op!("DECB", OneByte, 0x5a),
    op!("DES", TwoByte, 0x327f),
    op!("DEU", TwoByte, 0x335f),
    op!("DEX", TwoByte, 0x301f),
    op!("DEY", TwoByte, 0x313f),
    op!("ELSE", Pso, pseudo::ELSE),
    op!("END", Pso, pseudo::END),
    op!("ENDIF", Pso, pseudo::ENDIF),
    op!("ENDM", Pso, pseudo::ENDM),
    op!("EORA", Arith, 0x88),
    op!("EORB", Arith, 0xc8),
    op!("EQU", Pso, pseudo::EQU),
    op!("EXG", TfrExg, 0x1e),
    op!("EXTERN", Pso, pseudo::EXTERN),
    op!("FCB", Pso, pseudo::FCB),
    op!("FCC", Pso, pseudo::FCC),
    op!("FCW", Pso, pseudo::FCW),
    op!("FDB", Pso, pseudo::FCW),
    op!("IF", Pso, pseudo::IF),
    op!("INC", OneAddr, 0x0c),
    op!("INCA", OneByte, 0x4c),
    op!("INCB", OneByte, 0x5c),
    op!("INCLUDE", Pso, pseudo::INCLUDE),
    op!("INS", TwoByte, 0x3261),
    op!("INU", TwoByte, 0x3341),
    op!("INX", TwoByte, 0x3001),
    op!("INY", TwoByte, 0x3121),
    op!("JMP", OneAddr, 0x0e),
    op!("JSR", DArith, 0x8d),
    op!("LBCC", LongBranch2, 0x1024),
    op!("LBCS", LongBranch2, 0x1025),
    op!("LBEQ", LongBranch2, 0x1027),
    op!("LBGE", LongBranch2, 0x102c),
    op!("LBGT", LongBranch2, 0x102e),
    op!("LBHI", LongBranch2, 0x1022),
    op!("LBHS", LongBranch2, 0x1024),
    op!("LBLE", LongBranch2, 0x102f),
    op!("LBLO", LongBranch2, 0x1025),
    op!("LBLS", LongBranch2, 0x1023),
    op!("LBLT", LongBranch2, 0x102d),
    op!("LBMI", LongBranch2, 0x102b),
    op!("LBNE", LongBranch2, 0x1026),
    op!("LBPL", LongBranch2, 0x102a),
    op!("LBRA", LongBranch1, 0x16),
    op!("LBRN", LongBranch2, 0x1021),
    op!("LBSR", LongBranch1, 0x17),
    op!("LBVC", LongBranch2, 0x1028),
    op!("LBVS", LongBranch2, 0x1029),
    op!("LDA", Arith, 0x86),
    op!("LDB", Arith, 0xc6),
    op!("LDD", DArith, 0xcc),
    op!("LDS", D2Arith, 0x10ce),
    op!("LDU", DArith, 0xce),
    op!("LDX", DArith, 0x8e),
    op!("LDY", D2Arith, 0x108e),
    op!("LEAS", Lea, 0x32),
    op!("LEAU", Lea, 0x33),
    op!("LEAX", Lea, 0x30),
    op!("LEAY", Lea, 0x31),
    op!("LSL", OneAddr, 0x08),
    op!("LSLA", OneByte, 0x48),
    op!("LSLB", OneByte, 0x58),
    op!("LSR", OneAddr, 0x04),
    op!("LSRA", OneByte, 0x44),
    op!("LSRB", OneByte, 0x54),
    op!("MACRO", Pso, pseudo::MACRO),
    op!("MUL", OneByte, 0x3d),
    op!("NEG", OneAddr, 0x00),
    op!("NEGA", OneByte, 0x40),
    op!("NEGB", OneByte, 0x50),
    op!("NOP", OneByte, 0x12),
    op!("ORA", Arith, 0x8a),
    op!("ORB", Arith, 0xca),
    op!("ORCC", OneImm, 0x1a),
    op!("ORG", Pso, pseudo::ORG),
    op!("PSHS", PshPul, 0x34),
    op!("PSHU", PshPul, 0x36),
    op!("PUBLIC", Pso, pseudo::PUBLIC),
    op!("PULS", PshPul, 0x35),
    op!("PULU", PshPul, 0x37),
    op!("RMB", Pso, pseudo::RMB),
    op!("ROL", OneAddr, 0x09),
    op!("ROLA", OneByte, 0x49),
    op!("ROLB", OneByte, 0x59),
    op!("ROR", OneAddr, 0x06),
    op!("RORA", OneByte, 0x46),
    op!("RORB", OneByte, 0x56),
    op!("RTI", OneByte, 0x3b),
    op!("RTS", OneByte, 0x39),
    op!("SBCA", Arith, 0x82),
    op!("SBCB", Arith, 0xc2),
    op!("SEC", TwoByte, 0x1a01),
    op!("SEF", TwoByte, 0x1a40),
    op!("SEI", TwoByte, 0x1a10),
    op!("SEIF", TwoByte, 0x1a50),
    op!("SET", Pso, pseudo::SET),
    op!("SETDP", Pso, pseudo::SETDP),
    op!("SEV", TwoByte, 0x1a02),
    op!("SEX", OneByte, 0x1d),
    op!("STA", Arith, 0x87),
    op!("STB", Arith, 0xc7),
    op!("STD", DArith, 0xcd),
    op!("STS", D2Arith, 0x10cf),
    op!("STU", DArith, 0xcf),
    op!("STX", DArith, 0x8f),
    op!("STY", D2Arith, 0x108f),
    op!("SUBA", Arith, 0x80),
    op!("SUBB", Arith, 0xc0),
    op!("SUBD", DArith, 0x83),
    op!("SWI", OneByte, 0x3f),
    op!("SWI2", TwoByte, 0x103f),
    op!("SWI3", TwoByte, 0x113f),
    op!("SYNC", OneByte, 0x13),
    op!("TFR", TfrExg, 0x1f),
    op!("TITLE", Pso, pseudo::TITLE),
    op!("TST", OneAddr, 0x0d),
    op!("TSTA", OneByte, 0x4d),
    op!("TSTB", OneByte, 0x5d),
];

/// Find a mnemonic by name (already upper-cased) via binary search.
#[must_use]
pub fn find(name: &str) -> Option<&'static OpRecord> {
    OPTABLE.binary_search_by(|op| op.name.cmp(name)).ok().map(|i| &OPTABLE[i])
}

#[derive(Debug, Clone, Copy)]
pub struct RegRecord {
    pub name: &'static str,
    pub tfr: u8,
    pub psh: u8,
}

/// TFR/EXG nibble codes and PSHS/PULS mask bits, from the reference
/// assembler's `regtable[]`.
pub static REGTABLE: &[RegRecord] = &[
    RegRecord { name: "D", tfr: 0x00, psh: 0x06 },
    RegRecord { name: "X", tfr: 0x01, psh: 0x10 },
    RegRecord { name: "Y", tfr: 0x02, psh: 0x20 },
    RegRecord { name: "U", tfr: 0x03, psh: 0x40 },
    RegRecord { name: "S", tfr: 0x04, psh: 0x40 },
    RegRecord { name: "PC", tfr: 0x05, psh: 0x80 },
    RegRecord { name: "A", tfr: 0x08, psh: 0x02 },
    RegRecord { name: "B", tfr: 0x09, psh: 0x04 },
    RegRecord { name: "CC", tfr: 0x0a, psh: 0x01 },
    RegRecord { name: "CCR", tfr: 0x0a, psh: 0x01 },
    RegRecord { name: "DP", tfr: 0x0b, psh: 0x08 },
    RegRecord { name: "DPR", tfr: 0x0b, psh: 0x08 },
];

#[must_use]
pub fn find_reg(name: &str) -> Option<&'static RegRecord> {
    REGTABLE.iter().find(|r| r.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_for_binary_search() {
        for pair in OPTABLE.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} >= {}", pair[0].name, pair[1].name);
        }
    }

    #[test]
    fn finds_known_mnemonics() {
        assert_eq!(find("LDA").unwrap().code, 0x86);
        assert_eq!(find("LBRA").unwrap().code, 0x16);
        assert!(find("NOSUCHOP").is_none());
    }
}
