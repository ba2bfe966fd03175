//! Recursive-descent expression evaluator with relocation-category algebra.
//!
//! Every subexpression carries, alongside its 16-bit two's-complement value,
//! a `category` bitmask tracking whether it is a plain constant, an address
//! within this module, external, already made non-relocatable by a
//! non-linear operator, or negated. The category algebra is kept as pure
//! functions (`combine_*`) separate from the parser so it can be tested on
//! its own.

use crate::errors;
use crate::symtab::{cat, SymbolTable};

/// Bit set in a category when the value is (or derives from) an address in
/// this module.
pub const ADDRESS: u8 = 0b0000_0010;
/// Bit set when the value is (or derives from) an address in another module.
pub const EXTERNAL: u8 = 0b0000_0100;
/// Bit set once a non-linear operator (anything but `+`/unary `-`) has
/// touched the value: it can no longer be relocated even if it looks like
/// an address.
pub const NON_RELOC: u8 = 0b0001_0000;
/// Bit set when the address component (if any) has been negated an odd
/// number of times.
pub const NEGATIVE: u8 = 0b0010_0000;

/// The additive ("RESOLVECAT") merge rule: combining two operand categories
/// across `+`/`-`. Collapses "address − same address" (`NEGATIVE|ADDRESS`
/// against plain `ADDRESS`) back down to a constant, and drops a side's
/// stray non-relocatable/negative bits when it never carried an address bit.
#[must_use]
pub fn combine_additive(mut lhs: u8, mut rhs: u8) -> u8 {
    if lhs & 0x0F == 0 {
        lhs = 0;
    }
    if rhs & 0x0F == 0 {
        rhs = 0;
    }
    if (rhs == ADDRESS && lhs == (NEGATIVE | ADDRESS)) || (rhs == (NEGATIVE | ADDRESS) && lhs == ADDRESS) {
        return 0;
    }
    rhs | lhs
}

/// Merge rule for every operator that isn't a pure linear combination:
/// multiply, divide, shift, compare, bitwise. The result is always marked
/// non-relocatable.
#[must_use]
pub fn combine_opaque(lhs: u8, rhs: u8) -> u8 {
    lhs | rhs | NON_RELOC
}

pub struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    pub loccounter: u16,
    pub pass: u8,
    pub unknown: bool,
    pub certain: bool,
    pub error: u16,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(src: &'a str, loccounter: u16, pass: u8) -> Self {
        Self { src: src.as_bytes(), pos: 0, loccounter, pass, unknown: false, certain: true, error: 0 }
    }

    #[must_use]
    pub fn rest(&self) -> &'a str {
        std::str::from_utf8(&self.src[self.pos..]).unwrap_or("")
    }

    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    pub fn skip_space(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.advance();
        }
    }

    /// Scan an alphanumeric identifier, folded to upper case, capped at 16
    /// significant characters (extra characters are consumed but dropped).
    pub fn scan_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !c.is_ascii_alphanumeric() {
                break;
            }
            if name.len() < 16 {
                name.push(c.to_ascii_uppercase() as char);
            }
            self.advance();
        }
        name
    }

    fn scan_decimal(&mut self) -> i16 {
        let mut t: i16 = 0;
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            t = t.wrapping_mul(10).wrapping_add(i16::from(c - b'0'));
            self.advance();
        }
        t
    }

    fn scan_hex(&mut self) -> i16 {
        self.advance(); // '$'
        let mut t: i16 = 0;
        let mut any = false;
        while let Some(c) = self.peek() {
            let Some(digit) = (c as char).to_digit(16) else { break };
            t = t.wrapping_mul(16).wrapping_add(i16::try_from(digit).unwrap());
            any = true;
            self.advance();
        }
        if !any {
            self.error |= errors::EXPR_SYNTAX;
        }
        t
    }

    fn scan_bin(&mut self) -> i16 {
        self.advance(); // '%'
        let mut t: i16 = 0;
        while matches!(self.peek(), Some(b'0' | b'1')) {
            t = t.wrapping_mul(2).wrapping_add(i16::from(self.peek().unwrap() - b'0'));
            self.advance();
        }
        t
    }

    fn scan_oct(&mut self) -> i16 {
        self.advance(); // '@'
        let mut t: i16 = 0;
        while matches!(self.peek(), Some(b'0'..=b'7')) {
            t = t.wrapping_mul(8).wrapping_add(i16::from(self.peek().unwrap() - b'0'));
            self.advance();
        }
        t
    }

    fn scan_char(&mut self) -> i16 {
        self.advance(); // opening quote
        let t = self.peek().map_or(0, |c| i16::from(c));
        if self.peek().is_some() {
            self.advance();
        }
        if self.peek() == Some(b'\'') {
            self.advance();
        }
        t
    }

    fn scan_label(&mut self, symtab: &mut SymbolTable) -> (i16, u8) {
        let name = self.scan_name();
        let idx = symtab.find_or_insert(&name);
        let sym = symtab.get(idx);
        if sym.cat == cat::EMPTY {
            symtab.get_mut(idx).cat = cat::UNRESOLVED;
        }
        let sym = symtab.get(idx);
        if sym.cat == cat::MACRO || sym.cat == cat::PARAMETER {
            self.error |= errors::EXPR_SYNTAX;
        }
        let mut category = sym.cat & 0x0E;
        if category == cat::UNRESOLVED || category == cat::PUBLIC_UNDEFINED {
            self.unknown = true;
        }
        if ((category == cat::ADDRESS || category == cat::PUBLIC) && sym.value > self.loccounter) || category == cat::EXTERN {
            self.certain = false;
        }
        if category == cat::PUBLIC || category == cat::UNRESOLVED || category == cat::PUBLIC_UNDEFINED {
            category = ADDRESS;
        }
        (sym.value as i16, category)
    }

    fn parse_primary(&mut self, symtab: &mut SymbolTable) -> (i16, u8) {
        self.skip_space();
        match self.peek() {
            Some(c) if c.is_ascii_alphabetic() => self.scan_label(symtab),
            Some(c) if c.is_ascii_digit() => (self.scan_decimal(), 0),
            Some(b'*') => {
                self.advance();
                (self.loccounter as i16, ADDRESS)
            }
            Some(b'$') => (self.scan_hex(), 0),
            Some(b'%') => (self.scan_bin(), 0),
            Some(b'@') => (self.scan_oct(), 0),
            Some(b'\'') => (self.scan_char(), 0),
            Some(b'(') => {
                self.advance();
                let (v, c) = self.parse_or(symtab);
                self.skip_space();
                if self.peek() == Some(b')') {
                    self.advance();
                } else {
                    self.error |= errors::EXPR_SYNTAX;
                }
                (v, c)
            }
            _ => {
                self.error |= errors::EXPR_SYNTAX;
                (0, 0)
            }
        }
    }

    fn parse_unary(&mut self, symtab: &mut SymbolTable) -> (i16, u8) {
        self.skip_space();
        match self.peek() {
            Some(b'-') => {
                self.advance();
                let (v, c) = self.parse_unary(symtab);
                (v.wrapping_neg(), c ^ NEGATIVE)
            }
            Some(b'+') => {
                self.advance();
                self.parse_unary(symtab)
            }
            Some(b'!') => {
                self.advance();
                let (v, c) = self.parse_unary(symtab);
                (i16::from(v == 0), c | NON_RELOC)
            }
            Some(b'~') => {
                self.advance();
                let (v, c) = self.parse_unary(symtab);
                (!v, c | NON_RELOC)
            }
            _ => self.parse_primary(symtab),
        }
    }

    fn parse_mul(&mut self, symtab: &mut SymbolTable) -> (i16, u8) {
        let (mut t, mut c) = self.parse_unary(symtab);
        loop {
            self.skip_space();
            match self.peek() {
                Some(b'*') => {
                    self.advance();
                    let (u, uc) = self.parse_unary(symtab);
                    t = t.wrapping_mul(u);
                    c = combine_opaque(c, uc);
                }
                Some(b'/') => {
                    self.advance();
                    let (u, uc) = self.parse_unary(symtab);
                    if u == 0 {
                        self.error |= errors::EXPR_SYNTAX;
                    } else {
                        t = t.wrapping_div(u);
                    }
                    c = combine_opaque(c, uc);
                }
                Some(b'%') => {
                    self.advance();
                    let (u, uc) = self.parse_unary(symtab);
                    if u == 0 {
                        self.error |= errors::EXPR_SYNTAX;
                    } else {
                        t = t.wrapping_rem(u);
                    }
                    c = combine_opaque(c, uc);
                }
                _ => return (t, c),
            }
        }
    }

    fn parse_add(&mut self, symtab: &mut SymbolTable) -> (i16, u8) {
        let (mut t, mut c) = self.parse_mul(symtab);
        loop {
            self.skip_space();
            match self.peek() {
                Some(b'+') => {
                    self.advance();
                    let (u, uc) = self.parse_mul(symtab);
                    t = t.wrapping_add(u);
                    c = combine_additive(c, uc);
                }
                Some(b'-') => {
                    self.advance();
                    let (u, uc) = self.parse_mul(symtab);
                    t = t.wrapping_sub(u);
                    c = combine_additive(c, uc ^ NEGATIVE);
                }
                _ => return (t, c),
            }
        }
    }

    fn parse_shift(&mut self, symtab: &mut SymbolTable) -> (i16, u8) {
        let (mut t, mut c) = self.parse_add(symtab);
        loop {
            self.skip_space();
            match (self.peek(), self.peek_at(1)) {
                (Some(b'<'), Some(b'<')) => {
                    self.pos += 2;
                    let (u, uc) = self.parse_add(symtab);
                    t = t.wrapping_shl(u as u32 & 15);
                    c = combine_opaque(c, uc);
                }
                (Some(b'>'), Some(b'>')) => {
                    self.pos += 2;
                    let (u, uc) = self.parse_add(symtab);
                    t = t.wrapping_shr(u as u32 & 15);
                    c = combine_opaque(c, uc);
                }
                _ => return (t, c),
            }
        }
    }

    fn parse_rel(&mut self, symtab: &mut SymbolTable) -> (i16, u8) {
        let (mut t, mut c) = self.parse_shift(symtab);
        loop {
            self.skip_space();
            match (self.peek(), self.peek_at(1)) {
                (Some(b'<'), Some(b'=')) => {
                    self.pos += 2;
                    let (u, uc) = self.parse_shift(symtab);
                    t = i16::from(t <= u);
                    c = combine_opaque(c, uc);
                }
                (Some(b'>'), Some(b'=')) => {
                    self.pos += 2;
                    let (u, uc) = self.parse_shift(symtab);
                    t = i16::from(t >= u);
                    c = combine_opaque(c, uc);
                }
                (Some(b'<'), _) => {
                    self.advance();
                    let (u, uc) = self.parse_shift(symtab);
                    t = i16::from(t < u);
                    c = combine_opaque(c, uc);
                }
                (Some(b'>'), _) => {
                    self.advance();
                    let (u, uc) = self.parse_shift(symtab);
                    t = i16::from(t > u);
                    c = combine_opaque(c, uc);
                }
                _ => return (t, c),
            }
        }
    }

    fn parse_eq(&mut self, symtab: &mut SymbolTable) -> (i16, u8) {
        let (mut t, mut c) = self.parse_rel(symtab);
        loop {
            self.skip_space();
            match (self.peek(), self.peek_at(1)) {
                (Some(b'='), _) => {
                    self.pos += if self.peek_at(1) == Some(b'=') { 2 } else { 1 };
                    let (u, uc) = self.parse_rel(symtab);
                    t = i16::from(t == u);
                    c = combine_opaque(c, uc);
                }
                (Some(b'!'), Some(b'=')) => {
                    self.pos += 2;
                    let (u, uc) = self.parse_rel(symtab);
                    t = i16::from(t != u);
                    c = combine_opaque(c, uc);
                }
                _ => return (t, c),
            }
        }
    }

    fn parse_and(&mut self, symtab: &mut SymbolTable) -> (i16, u8) {
        let (mut t, mut c) = self.parse_eq(symtab);
        while self.peek() == Some(b'&') {
            self.advance();
            let (u, uc) = self.parse_eq(symtab);
            t &= u;
            c = combine_opaque(c, uc);
            self.skip_space();
        }
        (t, c)
    }

    fn parse_xor(&mut self, symtab: &mut SymbolTable) -> (i16, u8) {
        let (mut t, mut c) = self.parse_and(symtab);
        while self.peek() == Some(b'^') {
            self.advance();
            let (u, uc) = self.parse_and(symtab);
            t ^= u;
            c = combine_opaque(c, uc);
            self.skip_space();
        }
        (t, c)
    }

    fn parse_or(&mut self, symtab: &mut SymbolTable) -> (i16, u8) {
        let (mut t, mut c) = self.parse_xor(symtab);
        while self.peek() == Some(b'|') {
            self.advance();
            let (u, uc) = self.parse_xor(symtab);
            t |= u;
            c = combine_opaque(c, uc);
            self.skip_space();
        }
        (t, c)
    }

    /// Evaluate one expression from the current position. Returns the
    /// 16-bit two's-complement value and its relocation category.
    pub fn eval(&mut self, symtab: &mut SymbolTable) -> (u16, u8) {
        self.skip_space();
        let (v, c) = self.parse_or(symtab);
        (v as u16, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_constants_have_no_category() {
        let mut symtab = SymbolTable::new();
        let mut s = Scanner::new("2+3*4", 0, 2);
        let (v, c) = s.eval(&mut symtab);
        assert_eq!(v, 14);
        assert_eq!(c & (ADDRESS | EXTERNAL), 0);
    }

    #[test]
    fn current_pc_token_is_an_address() {
        let mut symtab = SymbolTable::new();
        let mut s = Scanner::new("*", 0x100, 2);
        let (v, c) = s.eval(&mut symtab);
        assert_eq!(v, 0x100);
        assert_eq!(c & ADDRESS, ADDRESS);
    }

    #[test]
    fn address_minus_same_address_collapses_to_constant() {
        assert_eq!(combine_additive(ADDRESS, NEGATIVE | ADDRESS), 0);
        assert_eq!(combine_additive(NEGATIVE | ADDRESS, ADDRESS), 0);
    }

    #[test]
    fn multiplying_by_a_constant_marks_non_relocatable() {
        let c = combine_opaque(ADDRESS, 0);
        assert_eq!(c, ADDRESS | NON_RELOC);
    }

    #[test]
    fn hex_bin_oct_char_literals() {
        let mut symtab = SymbolTable::new();
        assert_eq!(Scanner::new("$2A", 0, 2).eval(&mut symtab).0, 0x2A);
        assert_eq!(Scanner::new("%101", 0, 2).eval(&mut symtab).0, 5);
        assert_eq!(Scanner::new("@17", 0, 2).eval(&mut symtab).0, 15);
        assert_eq!(Scanner::new("'A", 0, 2).eval(&mut symtab).0, u16::from(b'A'));
    }

    #[test]
    fn forward_reference_is_unknown_and_uncertain() {
        let mut symtab = SymbolTable::new();
        let mut s = Scanner::new("FOO", 0x100, 1);
        let (_, _) = s.eval(&mut symtab);
        assert!(s.unknown);
        assert!(s.certain);
    }
}
