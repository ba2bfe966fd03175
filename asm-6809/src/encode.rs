//! Operand addressing-mode scanning and the twelve instruction-emission
//! templates. Grounded line-for-line on the reference assembler's
//! `scanoperands`/`scanindexed`/`scanspecial`/`doaddress` and its
//! `onebyte`/`twobyte`/`oneimm`/`lea`/`sbranch`/`lbra`/`lbranch`/`arith`/
//! `darith`/`d2arith`/`oneaddr`/`tfrexg`/`pshpul` emitters.

use crate::errors;
use crate::expr::Scanner;
use crate::opcodes::{self, RegRecord};
use crate::symtab::SymbolTable;

/// Addressing mode selected for the current operand, matching the reference
/// assembler's `mode` values exactly (kept numeric since `doaddress`
/// dispatches on arithmetic comparisons like `mode>=5`, not a closed match).
pub mod mode {
    pub const IMMEDIATE: u8 = 0;
    pub const DIRECT: u8 = 1;
    pub const EXTENDED: u8 = 2;
    pub const INDEXED: u8 = 3;
    pub const PCREL: u8 = 4;
    pub const INDEXED_INDIRECT: u8 = 5;
    pub const PCREL_INDIRECT: u8 = 6;
}

pub mod opsize {
    pub const UNKNOWN: u8 = 0;
    pub const BITS5: u8 = 1;
    pub const BITS8: u8 = 2;
    pub const BITS16: u8 = 3;
}

#[derive(Debug, Default)]
pub struct Operand {
    pub mode: u8,
    pub opsize: u8,
    pub value: u16,
    pub postbyte: u8,
}

/// `dpsetting`: the current `SETDP` value, or `-1` if unset.
pub struct OperandScanner<'a, 'b> {
    pub scan: &'a mut Scanner<'b>,
    pub symtab: &'a mut SymbolTable,
    pub dpsetting: i32,
}

impl OperandScanner<'_, '_> {
    fn peek(&self) -> Option<u8> {
        self.scan.rest().as_bytes().first().copied()
    }

    fn peek_at(&self, n: usize) -> Option<u8> {
        self.scan.rest().as_bytes().get(n).copied()
    }

    fn advance(&mut self) {
        self.scan.set_pos(self.scan.pos() + 1);
    }

    fn scan_index_register(&mut self, postbyte: &mut u8) -> bool {
        let c = self.peek().map(|b| b.to_ascii_uppercase());
        match c {
            Some(b'X') => true,
            Some(b'Y') => {
                *postbyte |= 0x20;
                true
            }
            Some(b'U') => {
                *postbyte |= 0x40;
                true
            }
            Some(b'S') => {
                *postbyte |= 0x60;
                true
            }
            _ => false,
        }
    }

    /// The `,-R` / `,--R` / `,R+` / `,R++` / `,R` forms (no leading
    /// expression before the comma).
    fn scan_special(&mut self, op: &mut Operand) {
        op.mode = op.mode.max(mode::INDEXED);
        self.scan.skip_space();
        let mut postbyte;
        if self.peek() == Some(b'-') {
            self.advance();
            if self.peek() == Some(b'-') {
                self.advance();
                postbyte = 0x83;
            } else {
                postbyte = 0x82;
            }
            if !self.scan_index_register(&mut postbyte) {
                self.scan.error |= errors::BAD_ADDR_MODE;
            } else {
                self.advance();
            }
        } else {
            postbyte = 0x80;
            if !self.scan_index_register(&mut postbyte) {
                self.scan.error |= errors::BAD_ADDR_MODE;
            } else {
                self.advance();
            }
            if self.peek() == Some(b'+') {
                self.advance();
                if self.peek() == Some(b'+') {
                    self.advance();
                    postbyte += 1;
                }
            } else {
                postbyte += 4;
            }
        }
        op.postbyte = postbyte;
    }

    /// The `,R` suffix after a leading expression (the offset already in
    /// `op.value`).
    fn scan_indexed(&mut self, op: &mut Operand) {
        op.mode = op.mode.max(mode::INDEXED);
        let mut postbyte = 0u8;
        if self.scan_index_register(&mut postbyte) {
            self.advance();
            if op.opsize == opsize::UNKNOWN {
                op.opsize = if self.scan.unknown || !self.scan.certain {
                    opsize::BITS16
                } else if (-16..16).contains(&(op.value as i16)) && op.mode == mode::INDEXED {
                    opsize::BITS5
                } else if (-128..128).contains(&(op.value as i16)) {
                    opsize::BITS8
                } else {
                    opsize::BITS16
                };
            }
            match op.opsize {
                opsize::BITS5 => {
                    postbyte += op.value as u8 & 0x1F;
                    op.opsize = opsize::UNKNOWN;
                }
                opsize::BITS8 => postbyte += 0x88,
                opsize::BITS16 => postbyte += 0x89,
                _ => {}
            }
        } else {
            self.scan.skip_space();
            if !matches!(self.peek().map(|c| c.to_ascii_uppercase()), Some(b'P')) {
                self.scan.error |= errors::BAD_ADDR_MODE;
            } else {
                self.advance();
                if !matches!(self.peek().map(|c| c.to_ascii_uppercase()), Some(b'C')) {
                    self.scan.error |= errors::BAD_ADDR_MODE;
                } else {
                    self.advance();
                    if matches!(self.peek().map(|c| c.to_ascii_uppercase()), Some(b'R')) {
                        self.advance();
                    }
                }
            }
            op.mode += 1; // INDEXED -> PCREL, or INDEXED_INDIRECT -> PCREL_INDIRECT
            postbyte += 0x8c;
            if op.opsize == opsize::BITS5 {
                op.opsize = opsize::BITS8;
            }
        }
        op.postbyte = postbyte;
    }

    /// Look ahead for `D,R` / `A,R` / `B,R`; on failure, rewind so the
    /// caller falls back to scanning an ordinary expression.
    fn try_accumulator_offset(&mut self, postbyte_base: u8, op: &mut Operand) -> bool {
        let saved = self.scan.pos();
        self.advance();
        self.scan.skip_space();
        if self.peek() != Some(b',') {
            self.scan.set_pos(saved);
            return false;
        }
        self.advance();
        let mut postbyte = postbyte_base;
        if !self.scan_index_register(&mut postbyte) {
            self.scan.set_pos(saved);
            return false;
        }
        self.advance();
        op.postbyte = postbyte;
        op.mode = op.mode.max(mode::INDEXED);
        true
    }

    fn scan_default(&mut self, op: &mut Operand) {
        op.value = self.scan.eval(self.symtab).0;
        self.scan.skip_space();
        if self.peek() == Some(b',') {
            self.advance();
            self.scan_indexed(op);
        } else {
            if op.opsize == opsize::UNKNOWN {
                let out_of_dp = self.dpsetting == -1 || (op.value.wrapping_sub((self.dpsetting as u16).wrapping_mul(256))) >= 256;
                op.opsize = if self.scan.unknown || !self.scan.certain || out_of_dp {
                    opsize::BITS16
                } else {
                    opsize::BITS8
                };
            }
            if op.opsize == opsize::BITS5 {
                op.opsize = opsize::BITS8;
            }
            if op.mode == mode::INDEXED_INDIRECT {
                op.postbyte = 0x8f;
                op.opsize = opsize::BITS16;
            } else {
                op.mode = op.opsize - 1;
            }
        }
    }

    /// Parse one operand field, producing the resolved addressing mode,
    /// size and value/postbyte.
    pub fn scan_operands(&mut self) -> Operand {
        self.scan.unknown = false;
        let mut op = Operand { mode: 0, opsize: opsize::UNKNOWN, value: 0, postbyte: 0 };
        self.scan.skip_space();
        if self.peek() == Some(b'[') {
            self.advance();
            op.mode = mode::INDEXED_INDIRECT;
        }
        match self.peek().map(|c| c.to_ascii_uppercase()) {
            Some(b'D') if self.try_accumulator_offset(0x8b, &mut op) => {}
            Some(b'A') if self.try_accumulator_offset(0x86, &mut op) => {}
            Some(b'B') if self.try_accumulator_offset(0x85, &mut op) => {}
            Some(b',') => {
                self.advance();
                self.scan_special(&mut op);
            }
            Some(b'#') => {
                if op.mode == mode::INDEXED_INDIRECT {
                    self.scan.error |= errors::BAD_ADDR_MODE;
                }
                op.mode = mode::IMMEDIATE;
                self.advance();
                op.value = self.scan.eval(self.symtab).0;
            }
            Some(b'<') => {
                self.advance();
                if self.peek() == Some(b'<') {
                    self.advance();
                    op.opsize = opsize::BITS5;
                } else {
                    op.opsize = opsize::BITS8;
                }
                self.scan_default(&mut op);
            }
            Some(b'>') => {
                self.advance();
                op.opsize = opsize::BITS16;
                self.scan_default(&mut op);
            }
            _ => self.scan_default(&mut op),
        }
        if op.mode >= mode::INDEXED_INDIRECT {
            self.scan.skip_space();
            op.postbyte |= 0x10;
            if self.peek() == Some(b']') {
                self.advance();
            } else {
                self.scan.error |= errors::BAD_ADDR_MODE;
            }
        }
        if self.scan.pass == 2 && self.scan.unknown {
            self.scan.error |= errors::UNDEFINED_LABEL;
        }
        op
    }
}

/// Assemble the addressing-mode bytes (postbyte/offset/operand) for an
/// operand already resolved by `scan_operands`, appending to `out`.
///
/// `unknown`/`certain` come from the `Scanner` that resolved `op.value`: an
/// unresolved or not-yet-certain forward reference must force the 16-bit
/// PC-relative form on every pass, so a later resolution to a nearby
/// address can't shrink the instruction and shift everything after it.
pub fn emit_address(op: &Operand, loccounter: u16, out: &mut Vec<u8>, error: &mut u16, unknown: bool, certain: bool) {
    match op.mode {
        mode::IMMEDIATE => {
            if op.opsize == opsize::BITS8 {
                out.push(op.value as u8);
            } else {
                out.extend_from_slice(&op.value.to_be_bytes());
            }
        }
        mode::DIRECT => out.push(op.value as u8),
        mode::EXTENDED => out.extend_from_slice(&op.value.to_be_bytes()),
        mode::INDEXED | mode::INDEXED_INDIRECT => {
            out.push(op.postbyte);
            match op.opsize {
                opsize::BITS8 => out.push(op.value as u8),
                opsize::BITS16 => out.extend_from_slice(&op.value.to_be_bytes()),
                _ => {}
            }
        }
        mode::PCREL | mode::PCREL_INDIRECT => {
            let codeptr = out.len() as u16;
            let mut offs = op.value.wrapping_sub(loccounter).wrapping_sub(codeptr).wrapping_sub(2) as i16;
            let mut postbyte = op.postbyte;
            let mut opsize_bits = op.opsize;
            let out_of_range = !(-128..128).contains(&offs) || opsize_bits == opsize::BITS16 || unknown || !certain;
            if out_of_range {
                if opsize_bits == opsize::BITS8 {
                    *error |= errors::BRANCH_RANGE;
                }
                offs = offs.wrapping_sub(1);
                opsize_bits = opsize::BITS16;
                postbyte += 1;
            }
            out.push(postbyte);
            if opsize_bits == opsize::BITS16 {
                out.extend_from_slice(&(offs as u16).to_be_bytes());
            } else {
                out.push(offs as u8);
            }
        }
        _ => {}
    }
}

pub fn one_byte(code: u16, out: &mut Vec<u8>) {
    out.push(code as u8);
}

pub fn two_byte(code: u16, out: &mut Vec<u8>) {
    out.extend_from_slice(&code.to_be_bytes());
}

pub fn one_imm(code: u16, opr: &mut OperandScanner, out: &mut Vec<u8>) {
    let op = opr.scan_operands();
    if op.mode >= mode::INDEXED {
        opr.scan.error |= errors::BAD_ADDR_MODE;
    }
    out.push(code as u8);
    out.push(op.value as u8);
}

pub fn lea(code: u16, opr: &mut OperandScanner, out: &mut Vec<u8>) {
    out.push(code as u8);
    let mut op = opr.scan_operands();
    if op.mode == mode::IMMEDIATE {
        opr.scan.error |= errors::BAD_ADDR_MODE;
    }
    if op.mode < mode::INDEXED {
        op.opsize = opsize::BITS16;
        op.postbyte = 0x8f;
        op.mode = mode::INDEXED;
    }
    let loccounter = opr.scan.loccounter;
    let (unknown, certain) = (opr.scan.unknown, opr.scan.certain);
    emit_address(&op, loccounter, out, &mut opr.scan.error, unknown, certain);
}

pub fn short_branch(code: u16, opr: &mut OperandScanner, out: &mut Vec<u8>) {
    let op = opr.scan_operands();
    if op.mode != mode::DIRECT && op.mode != mode::EXTENDED {
        opr.scan.error |= errors::BAD_ADDR_MODE;
    }
    let offs = op.value.wrapping_sub(opr.scan.loccounter).wrapping_sub(2) as i16;
    if !opr.scan.unknown && !(-128..128).contains(&offs) {
        opr.scan.error |= errors::BRANCH_RANGE;
    }
    if opr.scan.pass == 2 && opr.scan.unknown {
        opr.scan.error |= errors::UNDEFINED_LABEL;
    }
    out.push(code as u8);
    out.push(offs as u8);
}

pub fn long_branch_1byte(code: u16, opr: &mut OperandScanner, out: &mut Vec<u8>) {
    let op = opr.scan_operands();
    if op.mode != mode::DIRECT && op.mode != mode::EXTENDED {
        opr.scan.error |= errors::BAD_ADDR_MODE;
    }
    out.push(code as u8);
    let offs = op.value.wrapping_sub(opr.scan.loccounter).wrapping_sub(3);
    out.extend_from_slice(&offs.to_be_bytes());
}

pub fn long_branch_2byte(code: u16, opr: &mut OperandScanner, out: &mut Vec<u8>) {
    let op = opr.scan_operands();
    if op.mode != mode::DIRECT && op.mode != mode::EXTENDED {
        opr.scan.error |= errors::BAD_ADDR_MODE;
    }
    out.extend_from_slice(&code.to_be_bytes());
    let offs = op.value.wrapping_sub(opr.scan.loccounter).wrapping_sub(4);
    out.extend_from_slice(&offs.to_be_bytes());
}

pub fn arith(code: u16, opr: &mut OperandScanner, out: &mut Vec<u8>) {
    let mut op = opr.scan_operands();
    let base = match op.mode {
        mode::IMMEDIATE => {
            op.opsize = opsize::BITS8;
            code
        }
        mode::DIRECT => code + 0x10,
        mode::EXTENDED => code + 0x30,
        _ => code + 0x20,
    };
    out.push(base as u8);
    let loccounter = opr.scan.loccounter;
    let (unknown, certain) = (opr.scan.unknown, opr.scan.certain);
    emit_address(&op, loccounter, out, &mut opr.scan.error, unknown, certain);
}

pub fn darith(code: u16, opr: &mut OperandScanner, out: &mut Vec<u8>) {
    let mut op = opr.scan_operands();
    let base = match op.mode {
        mode::IMMEDIATE => {
            op.opsize = opsize::BITS16;
            code
        }
        mode::DIRECT => code + 0x10,
        mode::EXTENDED => code + 0x30,
        _ => code + 0x20,
    };
    out.push(base as u8);
    let loccounter = opr.scan.loccounter;
    let (unknown, certain) = (opr.scan.unknown, opr.scan.certain);
    emit_address(&op, loccounter, out, &mut opr.scan.error, unknown, certain);
}

pub fn d2arith(code: u16, opr: &mut OperandScanner, out: &mut Vec<u8>) {
    let mut op = opr.scan_operands();
    let base = match op.mode {
        mode::IMMEDIATE => {
            op.opsize = opsize::BITS16;
            code
        }
        mode::DIRECT => code + 0x10,
        mode::EXTENDED => code + 0x30,
        _ => code + 0x20,
    };
    out.extend_from_slice(&base.to_be_bytes());
    let loccounter = opr.scan.loccounter;
    let (unknown, certain) = (opr.scan.unknown, opr.scan.certain);
    emit_address(&op, loccounter, out, &mut opr.scan.error, unknown, certain);
}

pub fn one_addr(code: u16, opr: &mut OperandScanner, out: &mut Vec<u8>) {
    let op = opr.scan_operands();
    let base = match op.mode {
        mode::IMMEDIATE => {
            opr.scan.error |= errors::BAD_ADDR_MODE;
            code
        }
        mode::DIRECT => code,
        mode::EXTENDED => code + 0x70,
        _ => code + 0x60,
    };
    out.push(base as u8);
    let loccounter = opr.scan.loccounter;
    let (unknown, certain) = (opr.scan.unknown, opr.scan.certain);
    emit_address(&op, loccounter, out, &mut opr.scan.error, unknown, certain);
}

pub fn tfr_exg(code: u16, scan: &mut Scanner, out: &mut Vec<u8>) {
    out.push(code as u8);
    scan.skip_space();
    let src_name = scan.scan_name();
    let src: Option<&RegRecord> = opcodes::find_reg(&src_name);
    let mut postbyte = src.map_or(0, |r| r.tfr << 4);
    if src.is_none() {
        scan.error |= errors::BAD_ADDR_MODE;
    }
    scan.skip_space();
    if scan.rest().as_bytes().first() == Some(&b',') {
        scan.set_pos(scan.pos() + 1);
    } else {
        scan.error |= errors::BAD_ADDR_MODE;
    }
    scan.skip_space();
    let dst_name = scan.scan_name();
    match opcodes::find_reg(&dst_name) {
        Some(r) => postbyte |= r.tfr,
        None => scan.error |= errors::BAD_ADDR_MODE,
    }
    out.push(postbyte);
}

pub fn push_pull(code: u16, scan: &mut Scanner, out: &mut Vec<u8>) {
    out.push(code as u8);
    let mut postbyte = 0u8;
    loop {
        if scan.rest().as_bytes().first() == Some(&b',') {
            scan.set_pos(scan.pos() + 1);
        }
        scan.skip_space();
        let name = scan.scan_name();
        if name.is_empty() {
            break;
        }
        match opcodes::find_reg(&name) {
            Some(r) => postbyte |= r.psh,
            None => scan.error |= errors::BAD_ADDR_MODE,
        }
        scan.skip_space();
        if scan.rest().as_bytes().first() != Some(&b',') {
            break;
        }
    }
    out.push(postbyte);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lda_immediate() {
        let mut symtab = SymbolTable::new();
        let mut s = Scanner::new("#$42", 0x100, 2);
        let mut opr = OperandScanner { scan: &mut s, symtab: &mut symtab, dpsetting: -1 };
        let mut out = Vec::new();
        arith(0x86, &mut opr, &mut out);
        assert_eq!(out, vec![0x86, 0x42]);
    }

    #[test]
    fn leax_five_bit_offset_on_y() {
        let mut symtab = SymbolTable::new();
        let mut s = Scanner::new("5,Y", 0x100, 2);
        let mut opr = OperandScanner { scan: &mut s, symtab: &mut symtab, dpsetting: -1 };
        let mut out = Vec::new();
        lea(0x30, &mut opr, &mut out);
        assert_eq!(out, vec![0x30, 0x25]);
    }

    #[test]
    fn pcr_to_a_resolved_forward_label_still_forces_the_16_bit_form() {
        // FWD is defined (pass 2) a mere 1 byte past where the 16-bit form
        // would land, so the raw offset fits in 8 bits — but it's still a
        // forward reference (`certain` is false), and pass 1 had no choice
        // but to widen, so pass 2 must keep widening too or the image
        // would shrink out from under every address pass 1 already fixed.
        let mut symtab = SymbolTable::new();
        let idx = symtab.find_or_insert("FWD");
        let sym = symtab.get_mut(idx);
        sym.cat = crate::symtab::cat::ADDRESS;
        sym.value = 0x1004;
        let mut s = Scanner::new("FWD,PCR", 0x1000, 2);
        let mut opr = OperandScanner { scan: &mut s, symtab: &mut symtab, dpsetting: -1 };
        let mut out = Vec::new();
        lea(0x30, &mut opr, &mut out);
        assert!(!opr.scan.certain);
        assert_eq!(out, vec![0x30, 0x8d, 0x00, 0x01]);
    }

    #[test]
    fn lbra_to_self() {
        let mut symtab = SymbolTable::new();
        let mut s = Scanner::new("*", 0x100, 2);
        let mut opr = OperandScanner { scan: &mut s, symtab: &mut symtab, dpsetting: -1 };
        let mut out = Vec::new();
        long_branch_1byte(0x16, &mut opr, &mut out);
        assert_eq!(out, vec![0x16, 0xFF, 0xFD]);
    }
}
