//! Arithmetic and logic helpers shared by the opcode dispatch table.
//!
//! Each function mutates the condition-code byte per the 6809's normative
//! flag formulas and returns the instruction's result value. Flags that an
//! instruction leaves untouched are simply not written here.

use crate::flags::{self, CF, HF, NF, VF, ZF};

fn status8(cc: &mut u8, a: u8, b: u8, res: u16) {
    let a = a as u16;
    let b = b as u16;
    flags::set_bit(cc, HF, (a ^ b ^ res) & 0x10 != 0);
    flags::set_bit(cc, VF, (a ^ b ^ res ^ (res >> 1)) & 0x80 != 0);
    flags::set_bit(cc, CF, res & 0x100 != 0);
    flags::set_nz8(cc, res as u8);
}

fn status16(cc: &mut u8, a: u16, b: u16, res: u32) {
    let a = u32::from(a);
    let b = u32::from(b);
    flags::set_bit(cc, CF, res & 0x1_0000 != 0);
    flags::set_bit(cc, VF, ((res >> 1) ^ a ^ b ^ res) & 0x8000 != 0);
    flags::set_nz16(cc, res as u16);
}

pub fn add8(cc: &mut u8, a: u8, b: u8) -> u8 {
    let res = a as u16 + b as u16;
    status8(cc, a, b, res);
    res as u8
}

pub fn adc8(cc: &mut u8, a: u8, b: u8) -> u8 {
    let carry = u16::from(flags::test_bit(*cc, CF));
    let res = a as u16 + b as u16 + carry;
    status8(cc, a, b, res);
    res as u8
}

pub fn sub8(cc: &mut u8, a: u8, b: u8) -> u8 {
    let res = (a as u16).wrapping_sub(b as u16);
    status8(cc, a, b, res);
    res as u8
}

pub fn sbc8(cc: &mut u8, a: u8, b: u8) -> u8 {
    let carry = u16::from(flags::test_bit(*cc, CF));
    let res = (a as u16).wrapping_sub(b as u16).wrapping_sub(carry);
    status8(cc, a, b, res);
    res as u8
}

pub fn neg8(cc: &mut u8, b: u8) -> u8 {
    let res = 0u16.wrapping_sub(b as u16);
    status8(cc, 0, b, res);
    res as u8
}

pub fn and8(cc: &mut u8, a: u8, b: u8) -> u8 {
    let res = a & b;
    flags::set_nz8(cc, res);
    flags::set_bit(cc, VF, false);
    res
}

pub fn or8(cc: &mut u8, a: u8, b: u8) -> u8 {
    let res = a | b;
    flags::set_nz8(cc, res);
    flags::set_bit(cc, VF, false);
    res
}

pub fn eor8(cc: &mut u8, a: u8, b: u8) -> u8 {
    let res = a ^ b;
    flags::set_nz8(cc, res);
    flags::set_bit(cc, VF, false);
    res
}

/// BIT/TST's non-writeback AND: flags only.
pub fn bit8(cc: &mut u8, a: u8, b: u8) {
    and8(cc, a, b);
}

pub fn com8(cc: &mut u8, b: u8) -> u8 {
    let res = !b;
    flags::set_nz8(cc, res);
    flags::set_bit(cc, CF, true);
    flags::set_bit(cc, VF, false);
    res
}

pub fn lsr8(cc: &mut u8, val: u8) -> u8 {
    flags::set_bit(cc, CF, val & 0x01 != 0);
    flags::set_bit(cc, HF, val & 0x10 != 0);
    let res = val >> 1;
    flags::set_nz8(cc, res);
    res
}

pub fn asr8(cc: &mut u8, val: u8) -> u8 {
    flags::set_bit(cc, CF, val & 0x01 != 0);
    flags::set_bit(cc, HF, val & 0x10 != 0);
    let mut res = val >> 1;
    if val & 0x40 != 0 {
        res |= 0x80;
    }
    flags::set_nz8(cc, res);
    res
}

pub fn asl8(cc: &mut u8, val: u8) -> u8 {
    let res = (val as u16) << 1;
    status8(cc, val, val, res);
    res as u8
}

pub fn rol8(cc: &mut u8, val: u8) -> u8 {
    let carry_in = u8::from(flags::test_bit(*cc, CF));
    flags::set_bit(cc, CF, val & 0x80 != 0);
    flags::set_bit(cc, VF, (val & 0x80 != 0) != ((val << 1) & 0x80 != 0));
    let res = (val << 1) | carry_in;
    flags::set_nz8(cc, res);
    res
}

pub fn ror8(cc: &mut u8, val: u8) -> u8 {
    let carry_in = flags::test_bit(*cc, CF);
    flags::set_bit(cc, CF, val & 0x01 != 0);
    let res = (val >> 1) | if carry_in { 0x80 } else { 0 };
    flags::set_nz8(cc, res);
    res
}

pub fn dec8(cc: &mut u8, val: u8) -> u8 {
    let res = val.wrapping_sub(1);
    flags::set_bit(cc, VF, res == 0x7F);
    flags::set_nz8(cc, res);
    res
}

pub fn inc8(cc: &mut u8, val: u8) -> u8 {
    let res = val.wrapping_add(1);
    flags::set_bit(cc, VF, res == 0x80);
    flags::set_nz8(cc, res);
    res
}

pub fn tst8(cc: &mut u8, val: u8) {
    flags::set_nz8(cc, val);
}

pub fn clr8(cc: &mut u8) -> u8 {
    flags::set_bit(cc, NF, false);
    flags::set_bit(cc, VF, false);
    flags::set_bit(cc, ZF, true);
    flags::set_bit(cc, CF, false);
    0
}

/// Decimal adjust A after a BCD add/sub. Touches only C (never clears it)
/// and the accumulator; N/Z/V/H are left exactly as the preceding op set them.
pub fn daa(cc: &mut u8, a: u8) -> u8 {
    let mut tw = u16::from(a);
    if flags::test_bit(*cc, HF) {
        tw += 6;
    }
    if tw & 0x0F > 9 {
        tw += 6;
    }
    if flags::test_bit(*cc, CF) {
        tw += 0x60;
    }
    if tw & 0xF0 > 0x90 {
        tw += 0x60;
    }
    if tw & 0x100 != 0 {
        flags::set_bit(cc, CF, true);
    }
    tw as u8
}

/// Unsigned 8x8->16 multiply. Sets Z from the 16-bit result and C from bit 7
/// of the result (i.e. bit 7 of B); N is left untouched.
pub fn mul(cc: &mut u8, a: u8, b: u8) -> u16 {
    let res = u16::from(a) * u16::from(b);
    flags::set_bit(cc, ZF, res == 0);
    flags::set_bit(cc, CF, res & 0x80 != 0);
    res
}

pub fn add16(cc: &mut u8, a: u16, b: u16) -> u16 {
    let res = u32::from(a) + u32::from(b);
    status16(cc, a, b, res);
    res as u16
}

pub fn sub16(cc: &mut u8, a: u16, b: u16) -> u16 {
    let res = u32::from(a).wrapping_sub(u32::from(b));
    status16(cc, a, b, res);
    res as u16
}
