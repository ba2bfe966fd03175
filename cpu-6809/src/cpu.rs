//! The 6809 instruction interpreter: attention check, prefix handling,
//! effective-address resolution and the 256-entry opcode dispatch.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use m6809_core::{Bus, Cpu, Observable, Value};

use crate::addressing;
use crate::alu;
use crate::flags::{self, CF, FF, IF, NF, VF, ZF};
use crate::interrupt::{self, Latches, IRQ_FIRQ, IRQ_IRQ, IRQ_NONE};
use crate::registers::Registers;

/// What SYNC/CWAI is waiting for, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitKind {
    Running,
    Sync,
    Cwai,
}

/// A target for an 8-bit read-modify-write operation: one of the two
/// accumulators, or a memory location already resolved to an address.
#[derive(Clone, Copy)]
enum Target8 {
    A,
    B,
    Mem(u16),
}

impl Target8 {
    fn load(self, regs: &Registers, bus: &mut dyn Bus) -> u8 {
        match self {
            Target8::A => regs.a,
            Target8::B => regs.b,
            Target8::Mem(addr) => bus.read(addr),
        }
    }

    fn store(self, regs: &mut Registers, bus: &mut dyn Bus, value: u8) {
        match self {
            Target8::A => regs.a = value,
            Target8::B => regs.b = value,
            Target8::Mem(addr) => bus.write(addr, value),
        }
    }
}

/// Opcodes whose immediate operand is 16 bits rather than 8.
fn is_imm16(opcode: u8) -> bool {
    matches!(opcode, 0x83 | 0x8C | 0x8E | 0x8F | 0xC3 | 0xCC | 0xCD | 0xCE | 0xCF)
}

/// Motorola 6809 instruction interpreter.
pub struct Cpu6809 {
    regs: Registers,
    latches: Arc<Latches>,
    waiting: WaitKind,
}

impl Cpu6809 {
    #[must_use]
    pub fn new(latches: Arc<Latches>) -> Self {
        Self { regs: Registers::default(), latches, waiting: WaitKind::Running }
    }

    #[must_use]
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    #[must_use]
    pub fn latches(&self) -> &Arc<Latches> {
        &self.latches
    }

    fn fetch_byte(&mut self, bus: &mut dyn Bus) -> u8 {
        let b = bus.read(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        b
    }

    /// Step the CPU by one instruction, first consulting interrupt latches.
    ///
    /// While SYNC or CWAI has suspended execution, calls are non-blocking: if
    /// no qualifying interrupt has arrived yet, this returns immediately.
    pub fn step(&mut self, bus: &mut dyn Bus) {
        if self.waiting != WaitKind::Running && !self.service_wait(bus) {
            return;
        }

        self.attention_check(bus);

        let mut iflag = 0u8;
        let ireg = loop {
            let op = self.fetch_byte(bus);
            match op {
                0x10 => iflag = 1,
                0x11 => iflag = 2,
                other => break other,
            }
        };

        let eaddr = self.resolve_address(ireg, bus);
        self.execute(ireg, iflag, eaddr, bus);
    }

    pub fn reset(&mut self, bus: &mut dyn Bus) {
        self.waiting = WaitKind::Running;
        self.regs = Registers { pc: bus.read_word(interrupt::VEC_RESET), ..Registers::default() };
    }

    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.waiting != WaitKind::Running
    }

    /// Resume a SYNC or CWAI wait. Returns `false` if the wait continues
    /// (step should return without fetching an instruction).
    fn service_wait(&mut self, bus: &mut dyn Bus) -> bool {
        let irq = self.latches.irq.load(Ordering::Acquire);
        match self.waiting {
            WaitKind::Sync => {
                if irq == IRQ_NONE {
                    return false;
                }
                self.waiting = WaitKind::Running;
                true
            }
            WaitKind::Cwai => {
                let wakes = (irq == IRQ_IRQ && self.regs.cc & IF == 0)
                    || (irq == IRQ_FIRQ && self.regs.cc & FF == 0);
                if !wakes {
                    return false;
                }
                if irq == IRQ_IRQ {
                    self.regs.pc = bus.read_word(interrupt::VEC_IRQ);
                } else {
                    self.regs.pc = bus.read_word(interrupt::VEC_FIRQ);
                }
                self.latches.irq.store(IRQ_NONE, Ordering::Release);
                if !self.latches.tracing.load(Ordering::Acquire) {
                    self.latches.attention.store(false, Ordering::Release);
                }
                self.waiting = WaitKind::Running;
                false
            }
            WaitKind::Running => true,
        }
    }

    fn attention_check(&mut self, bus: &mut dyn Bus) {
        if !self.latches.attention.load(Ordering::Acquire) {
            return;
        }
        if self.latches.escape.load(Ordering::Acquire) {
            self.regs.pc = bus.read_word(interrupt::VEC_RESET);
            self.latches.escape.store(false, Ordering::Release);
        }
        let irq = self.latches.irq.load(Ordering::Acquire);
        if irq == IRQ_IRQ && self.regs.cc & IF == 0 {
            interrupt::take_irq(&mut self.regs, bus);
        }
        if irq == IRQ_FIRQ && self.regs.cc & FF == 0 {
            interrupt::take_firq(&mut self.regs, bus);
        }
        if irq != IRQ_NONE {
            self.latches.irq.store(IRQ_NONE, Ordering::Release);
        }
        if !self.latches.tracing.load(Ordering::Acquire) {
            self.latches.attention.store(false, Ordering::Release);
        }
    }

    fn resolve_address(&mut self, ireg: u8, bus: &mut dyn Bus) -> u16 {
        if addressing::has_postbyte(ireg) {
            let postbyte = self.fetch_byte(bus);
            return addressing::resolve_indexed(&mut self.regs, bus, postbyte);
        }
        match ireg {
            0x00..=0x0F | 0x90..=0x9F | 0xD0..=0xDF => addressing::direct(&mut self.regs, bus),
            0x70..=0x7F | 0xB0..=0xBF | 0xF0..=0xFF => addressing::extended(&mut self.regs, bus),
            0x80..=0x8F | 0xC0..=0xCF if is_imm16(ireg) => addressing::imm16_addr(&mut self.regs),
            0x80..=0x8F | 0xC0..=0xCF => addressing::imm8_addr(&mut self.regs),
            _ => 0,
        }
    }

    fn execute(&mut self, ireg: u8, iflag: u8, eaddr: u16, bus: &mut dyn Bus) {
        match ireg {
            0x00..=0x0F => self.execute_rmw_mem(ireg, eaddr, bus),
            0x10 | 0x11 => unreachable!("consumed by the prefix loop"),
            0x12 => {}
            0x13 => self.enter_sync(),
            0x14 | 0x15 | 0x18 | 0x1B | 0x3E => {}
            0x16 => {
                let off = self.fetch_word_pc(bus);
                self.regs.pc = self.regs.pc.wrapping_add(off);
            }
            _ => self.execute_rest(ireg, iflag, eaddr, bus),
        }
    }

    fn execute_rest(&mut self, ireg: u8, iflag: u8, eaddr: u16, bus: &mut dyn Bus) {
        match ireg {
            0x17 => {
                let off = self.fetch_word_pc(bus);
                interrupt::push_word(&mut self.regs, bus, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(off);
            }
            0x19 => self.regs.a = alu::daa(&mut self.regs.cc, self.regs.a),
            0x1A => {
                let b = self.fetch_byte(bus);
                self.regs.cc |= b;
            }
            0x1C => {
                let b = self.fetch_byte(bus);
                self.regs.cc &= b;
            }
            0x1D => {
                let v = sign_extend8(self.regs.b);
                flags::set_nz16(&mut self.regs.cc, v);
                self.regs.set_d(v);
            }
            0x1E => self.exg(bus),
            0x1F => self.tfr(bus),
            0x20..=0x2F => self.branch(ireg, iflag, bus),
            0x30 => {
                self.regs.x = eaddr;
                flags::set_bit(&mut self.regs.cc, ZF, eaddr == 0);
            }
            0x31 => {
                self.regs.y = eaddr;
                flags::set_bit(&mut self.regs.cc, ZF, eaddr == 0);
            }
            0x32 => self.regs.s = eaddr,
            0x33 => self.regs.u = eaddr,
            0x34 => self.pshs(bus),
            0x35 => self.puls(bus),
            0x36 => self.pshu(bus),
            0x37 => self.pulu(bus),
            0x39 => self.regs.pc = interrupt::pull_word(&mut self.regs, bus),
            0x3A => self.regs.x = self.regs.x.wrapping_add(u16::from(self.regs.b)),
            0x3B => interrupt::take_rti(&mut self.regs, bus),
            0x3C => self.enter_cwai(bus),
            0x3D => {
                let d = alu::mul(&mut self.regs.cc, self.regs.a, self.regs.b);
                self.regs.set_d(d);
            }
            0x3F => self.swi(iflag, bus),
            0x40..=0x5F => self.execute_rmw_accum(ireg, bus),
            0x60..=0x6F => self.execute_rmw_mem(ireg, eaddr, bus),
            0x70..=0x7F => self.execute_rmw_mem(ireg, eaddr, bus),
            0x80..=0xBF => self.execute_a_row(ireg, iflag, eaddr, bus),
            0xC0..=0xFF => self.execute_b_row(ireg, iflag, eaddr, bus),
            _ => {}
        }
    }

    fn fetch_word_pc(&mut self, bus: &mut dyn Bus) -> u16 {
        let w = bus.read_word(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(2);
        w
    }

    fn enter_sync(&mut self) {
        if self.latches.irq.load(Ordering::Acquire) == IRQ_NONE {
            self.waiting = WaitKind::Sync;
        }
    }

    fn enter_cwai(&mut self, bus: &mut dyn Bus) {
        let mask = self.fetch_byte(bus);
        interrupt::cwai_enter(&mut self.regs, bus, mask);
        self.waiting = WaitKind::Cwai;
    }

    fn swi(&mut self, iflag: u8, bus: &mut dyn Bus) {
        match iflag {
            0 => interrupt::take_swi(&mut self.regs, bus),
            1 => interrupt::take_swi2(&mut self.regs, bus),
            _ => interrupt::take_swi3(&mut self.regs, bus),
        }
    }

    fn branch(&mut self, ireg: u8, iflag: u8, bus: &mut dyn Bus) {
        let taken = match ireg & 0x0F {
            0x0 => true,
            0x1 => false,
            0x2 => self.regs.cc & (CF | ZF) == 0,
            0x3 => self.regs.cc & (CF | ZF) != 0,
            0x4 => self.regs.cc & CF == 0,
            0x5 => self.regs.cc & CF != 0,
            0x6 => self.regs.cc & ZF == 0,
            0x7 => self.regs.cc & ZF != 0,
            0x8 => self.regs.cc & VF == 0,
            0x9 => self.regs.cc & VF != 0,
            0xA => self.regs.cc & NF == 0,
            0xB => self.regs.cc & NF != 0,
            0xC => !self.nxorv(),
            0xD => self.nxorv(),
            0xE => !(self.nxorv() || self.regs.cc & ZF != 0),
            _ => self.nxorv() || self.regs.cc & ZF != 0,
        };
        if iflag == 0 {
            let off = self.fetch_byte(bus);
            if taken {
                self.regs.pc = self.regs.pc.wrapping_add(sign_extend8(off));
            }
        } else {
            let off = self.fetch_word_pc(bus);
            if taken {
                self.regs.pc = self.regs.pc.wrapping_add(off);
            }
        }
    }

    fn nxorv(&self) -> bool {
        let n = (self.regs.cc & NF) != 0;
        let v = (self.regs.cc & VF) != 0;
        n != v
    }

    fn exg(&mut self, bus: &mut dyn Bus) {
        let tb = self.fetch_byte(bus);
        let a = self.get_reg(tb >> 4);
        let b = self.get_reg(tb & 0x0F);
        self.set_reg(tb >> 4, b);
        self.set_reg(tb & 0x0F, a);
    }

    fn tfr(&mut self, bus: &mut dyn Bus) {
        let tb = self.fetch_byte(bus);
        let v = self.get_reg(tb >> 4);
        self.set_reg(tb & 0x0F, v);
    }

    fn get_reg(&self, sel: u8) -> u16 {
        match sel {
            0 => self.regs.d(),
            1 => self.regs.x,
            2 => self.regs.y,
            3 => self.regs.u,
            4 => self.regs.s,
            5 => self.regs.pc,
            8 => u16::from(self.regs.a),
            9 => u16::from(self.regs.b),
            10 => u16::from(self.regs.cc),
            11 => u16::from(self.regs.dp),
            _ => 0,
        }
    }

    fn set_reg(&mut self, sel: u8, value: u16) {
        match sel {
            0 => self.regs.set_d(value),
            1 => self.regs.x = value,
            2 => self.regs.y = value,
            3 => self.regs.u = value,
            4 => self.regs.s = value,
            5 => self.regs.pc = value,
            8 => self.regs.a = value as u8,
            9 => self.regs.b = value as u8,
            10 => self.regs.cc = value as u8,
            11 => self.regs.dp = value as u8,
            _ => {}
        }
    }

    fn pshs(&mut self, bus: &mut dyn Bus) {
        let tb = self.fetch_byte(bus);
        if tb & 0x80 != 0 {
            interrupt::push_word(&mut self.regs, bus, self.regs.pc);
        }
        if tb & 0x40 != 0 {
            interrupt::push_word(&mut self.regs, bus, self.regs.u);
        }
        if tb & 0x20 != 0 {
            interrupt::push_word(&mut self.regs, bus, self.regs.y);
        }
        if tb & 0x10 != 0 {
            interrupt::push_word(&mut self.regs, bus, self.regs.x);
        }
        if tb & 0x08 != 0 {
            interrupt::push_byte(&mut self.regs, bus, self.regs.dp);
        }
        if tb & 0x04 != 0 {
            interrupt::push_byte(&mut self.regs, bus, self.regs.b);
        }
        if tb & 0x02 != 0 {
            interrupt::push_byte(&mut self.regs, bus, self.regs.a);
        }
        if tb & 0x01 != 0 {
            interrupt::push_byte(&mut self.regs, bus, self.regs.cc);
        }
    }

    fn puls(&mut self, bus: &mut dyn Bus) {
        let tb = self.fetch_byte(bus);
        if tb & 0x01 != 0 {
            self.regs.cc = interrupt::pull_byte(&mut self.regs, bus);
        }
        if tb & 0x02 != 0 {
            self.regs.a = interrupt::pull_byte(&mut self.regs, bus);
        }
        if tb & 0x04 != 0 {
            self.regs.b = interrupt::pull_byte(&mut self.regs, bus);
        }
        if tb & 0x08 != 0 {
            self.regs.dp = interrupt::pull_byte(&mut self.regs, bus);
        }
        if tb & 0x10 != 0 {
            self.regs.x = interrupt::pull_word(&mut self.regs, bus);
        }
        if tb & 0x20 != 0 {
            self.regs.y = interrupt::pull_word(&mut self.regs, bus);
        }
        if tb & 0x40 != 0 {
            self.regs.u = interrupt::pull_word(&mut self.regs, bus);
        }
        if tb & 0x80 != 0 {
            self.regs.pc = interrupt::pull_word(&mut self.regs, bus);
        }
    }

    fn pshu(&mut self, bus: &mut dyn Bus) {
        let tb = self.fetch_byte(bus);
        let mut push_word_u = |regs: &mut Registers, bus: &mut dyn Bus, v: u16| {
            regs.u = regs.u.wrapping_sub(2);
            bus.write_word(regs.u, v);
        };
        if tb & 0x80 != 0 {
            push_word_u(&mut self.regs, bus, self.regs.pc);
        }
        if tb & 0x40 != 0 {
            push_word_u(&mut self.regs, bus, self.regs.s);
        }
        if tb & 0x20 != 0 {
            push_word_u(&mut self.regs, bus, self.regs.y);
        }
        if tb & 0x10 != 0 {
            push_word_u(&mut self.regs, bus, self.regs.x);
        }
        let mut push_byte_u = |regs: &mut Registers, bus: &mut dyn Bus, v: u8| {
            regs.u = regs.u.wrapping_sub(1);
            bus.write(regs.u, v);
        };
        if tb & 0x08 != 0 {
            push_byte_u(&mut self.regs, bus, self.regs.dp);
        }
        if tb & 0x04 != 0 {
            push_byte_u(&mut self.regs, bus, self.regs.b);
        }
        if tb & 0x02 != 0 {
            push_byte_u(&mut self.regs, bus, self.regs.a);
        }
        if tb & 0x01 != 0 {
            push_byte_u(&mut self.regs, bus, self.regs.cc);
        }
    }

    fn pulu(&mut self, bus: &mut dyn Bus) {
        let tb = self.fetch_byte(bus);
        let pull_byte_u = |regs: &mut Registers, bus: &mut dyn Bus| -> u8 {
            let v = bus.read(regs.u);
            regs.u = regs.u.wrapping_add(1);
            v
        };
        let pull_word_u = |regs: &mut Registers, bus: &mut dyn Bus| -> u16 {
            let v = bus.read_word(regs.u);
            regs.u = regs.u.wrapping_add(2);
            v
        };
        if tb & 0x01 != 0 {
            self.regs.cc = pull_byte_u(&mut self.regs, bus);
        }
        if tb & 0x02 != 0 {
            self.regs.a = pull_byte_u(&mut self.regs, bus);
        }
        if tb & 0x04 != 0 {
            self.regs.b = pull_byte_u(&mut self.regs, bus);
        }
        if tb & 0x08 != 0 {
            self.regs.dp = pull_byte_u(&mut self.regs, bus);
        }
        if tb & 0x10 != 0 {
            self.regs.x = pull_word_u(&mut self.regs, bus);
        }
        if tb & 0x20 != 0 {
            self.regs.y = pull_word_u(&mut self.regs, bus);
        }
        if tb & 0x40 != 0 {
            self.regs.s = pull_word_u(&mut self.regs, bus);
        }
        if tb & 0x80 != 0 {
            self.regs.pc = pull_word_u(&mut self.regs, bus);
        }
    }

    /// NEG/COM/LSR/ROR/ASR/ASL/ROL/DEC/INC/TST/JMP/CLR over direct, indexed
    /// or extended memory (rows `0x00-0x0F`, `0x60-0x6F`, `0x70-0x7F`).
    fn execute_rmw_mem(&mut self, ireg: u8, eaddr: u16, bus: &mut dyn Bus) {
        let t = Target8::Mem(eaddr);
        match ireg & 0x0F {
            0x0 => self.rmw(t, alu::neg8, bus),
            0x3 => self.rmw(t, alu::com8, bus),
            0x4 => self.rmw(t, alu::lsr8, bus),
            0x6 => self.rmw(t, alu::ror8, bus),
            0x7 => self.rmw(t, alu::asr8, bus),
            0x8 => self.rmw(t, alu::asl8, bus),
            0x9 => self.rmw(t, alu::rol8, bus),
            0xA => self.rmw(t, alu::dec8, bus),
            0xC => self.rmw(t, alu::inc8, bus),
            0xD => {
                let v = t.load(&self.regs, bus);
                alu::tst8(&mut self.regs.cc, v);
            }
            0xE => self.regs.pc = eaddr,
            0xF => {
                let r = alu::clr8(&mut self.regs.cc);
                t.store(&mut self.regs, bus, r);
            }
            _ => {}
        }
    }

    /// Same operation set as [`Self::execute_rmw_mem`] but on A/B directly
    /// (rows `0x40-0x4F`, `0x50-0x5F`); there is no JMP form here.
    fn execute_rmw_accum(&mut self, ireg: u8, bus: &mut dyn Bus) {
        let t = if ireg < 0x50 { Target8::A } else { Target8::B };
        match ireg & 0x0F {
            0x0 => self.rmw(t, alu::neg8, bus),
            0x3 => self.rmw(t, alu::com8, bus),
            0x4 => self.rmw(t, alu::lsr8, bus),
            0x6 => self.rmw(t, alu::ror8, bus),
            0x7 => self.rmw(t, alu::asr8, bus),
            0x8 => self.rmw(t, alu::asl8, bus),
            0x9 => self.rmw(t, alu::rol8, bus),
            0xA => self.rmw(t, alu::dec8, bus),
            0xC => self.rmw(t, alu::inc8, bus),
            0xD => {
                let v = t.load(&self.regs, bus);
                alu::tst8(&mut self.regs.cc, v);
            }
            0xF => {
                let r = alu::clr8(&mut self.regs.cc);
                t.store(&mut self.regs, bus, r);
            }
            _ => {}
        }
    }

    fn rmw(&mut self, t: Target8, f: impl FnOnce(&mut u8, u8) -> u8, bus: &mut dyn Bus) {
        let v = t.load(&self.regs, bus);
        let r = f(&mut self.regs.cc, v);
        t.store(&mut self.regs, bus, r);
    }

    /// SUBA/CMPA/SBCA/SUBD-CMPD-CMPU/ANDA/BITA/LDA/STA/EORA/ADCA/ORA/ADDA/
    /// CMPX-CMPY-CMPS/BSR-JSR/LDX-LDY/STX-STY (rows `0x80-0xBF`).
    fn execute_a_row(&mut self, ireg: u8, iflag: u8, eaddr: u16, bus: &mut dyn Bus) {
        match ireg & 0x0F {
            0x0 => self.regs.a = alu::sub8(&mut self.regs.cc, self.regs.a, bus.read(eaddr)),
            0x1 => {
                alu::sub8(&mut self.regs.cc, self.regs.a, bus.read(eaddr));
            }
            0x2 => self.regs.a = alu::sbc8(&mut self.regs.cc, self.regs.a, bus.read(eaddr)),
            0x3 => self.subd_cmpd_cmpu(iflag, eaddr, bus),
            0x4 => self.regs.a = alu::and8(&mut self.regs.cc, self.regs.a, bus.read(eaddr)),
            0x5 => {
                alu::bit8(&mut self.regs.cc, self.regs.a, bus.read(eaddr));
            }
            0x6 => {
                self.regs.a = bus.read(eaddr);
                flags::set_bit(&mut self.regs.cc, VF, false);
                flags::set_nz8(&mut self.regs.cc, self.regs.a);
            }
            0x7 => {
                flags::set_nz8(&mut self.regs.cc, self.regs.a);
                flags::set_bit(&mut self.regs.cc, VF, false);
                bus.write(eaddr, self.regs.a);
            }
            0x8 => self.regs.a = alu::eor8(&mut self.regs.cc, self.regs.a, bus.read(eaddr)),
            0x9 => self.regs.a = alu::adc8(&mut self.regs.cc, self.regs.a, bus.read(eaddr)),
            0xA => self.regs.a = alu::or8(&mut self.regs.cc, self.regs.a, bus.read(eaddr)),
            0xB => self.regs.a = alu::add8(&mut self.regs.cc, self.regs.a, bus.read(eaddr)),
            0xC => self.cmp_index_reg(iflag, eaddr, bus),
            0xD => self.bsr_or_jsr(ireg, eaddr, bus),
            0xE => {
                let v = bus.read_word(eaddr);
                flags::set_bit(&mut self.regs.cc, VF, false);
                flags::set_nz16(&mut self.regs.cc, v);
                if iflag == 0 {
                    self.regs.x = v;
                } else {
                    self.regs.y = v;
                }
            }
            0xF => {
                let v = if iflag == 0 { self.regs.x } else { self.regs.y };
                flags::set_bit(&mut self.regs.cc, VF, false);
                flags::set_nz16(&mut self.regs.cc, v);
                bus.write_word(eaddr, v);
            }
            _ => {}
        }
    }

    /// SUBB/CMPB/SBCB/ADDD/ANDB/BITB/LDB/STB/EORB/ADCB/ORB/ADDB/LDD/STD/
    /// LDU-LDS/STU-STS (rows `0xC0-0xFF`).
    fn execute_b_row(&mut self, ireg: u8, iflag: u8, eaddr: u16, bus: &mut dyn Bus) {
        match ireg & 0x0F {
            0x0 => self.regs.b = alu::sub8(&mut self.regs.cc, self.regs.b, bus.read(eaddr)),
            0x1 => {
                alu::sub8(&mut self.regs.cc, self.regs.b, bus.read(eaddr));
            }
            0x2 => self.regs.b = alu::sbc8(&mut self.regs.cc, self.regs.b, bus.read(eaddr)),
            0x3 => {
                let d = alu::add16(&mut self.regs.cc, self.regs.d(), bus.read_word(eaddr));
                self.regs.set_d(d);
            }
            0x4 => self.regs.b = alu::and8(&mut self.regs.cc, self.regs.b, bus.read(eaddr)),
            0x5 => {
                alu::bit8(&mut self.regs.cc, self.regs.b, bus.read(eaddr));
            }
            0x6 => {
                self.regs.b = bus.read(eaddr);
                flags::set_bit(&mut self.regs.cc, VF, false);
                flags::set_nz8(&mut self.regs.cc, self.regs.b);
            }
            0x7 => {
                flags::set_nz8(&mut self.regs.cc, self.regs.b);
                flags::set_bit(&mut self.regs.cc, VF, false);
                bus.write(eaddr, self.regs.b);
            }
            0x8 => self.regs.b = alu::eor8(&mut self.regs.cc, self.regs.b, bus.read(eaddr)),
            0x9 => self.regs.b = alu::adc8(&mut self.regs.cc, self.regs.b, bus.read(eaddr)),
            0xA => self.regs.b = alu::or8(&mut self.regs.cc, self.regs.b, bus.read(eaddr)),
            0xB => self.regs.b = alu::add8(&mut self.regs.cc, self.regs.b, bus.read(eaddr)),
            0xC => {
                let v = bus.read_word(eaddr);
                flags::set_bit(&mut self.regs.cc, VF, false);
                flags::set_nz16(&mut self.regs.cc, v);
                self.regs.set_d(v);
            }
            0xD => {
                let d = self.regs.d();
                flags::set_bit(&mut self.regs.cc, VF, false);
                flags::set_nz16(&mut self.regs.cc, d);
                bus.write_word(eaddr, d);
            }
            0xE => {
                let v = bus.read_word(eaddr);
                flags::set_bit(&mut self.regs.cc, VF, false);
                flags::set_nz16(&mut self.regs.cc, v);
                if iflag == 0 {
                    self.regs.u = v;
                } else {
                    self.regs.s = v;
                }
            }
            0xF => {
                let v = if iflag == 0 { self.regs.u } else { self.regs.s };
                flags::set_bit(&mut self.regs.cc, VF, false);
                flags::set_nz16(&mut self.regs.cc, v);
                bus.write_word(eaddr, v);
            }
            _ => {}
        }
    }

    fn subd_cmpd_cmpu(&mut self, iflag: u8, eaddr: u16, bus: &mut dyn Bus) {
        let operand = bus.read_word(eaddr);
        let lhs = if iflag == 2 { self.regs.u } else { self.regs.d() };
        let res = alu::sub16(&mut self.regs.cc, lhs, operand);
        if iflag == 0 {
            self.regs.set_d(res);
        }
    }

    fn cmp_index_reg(&mut self, iflag: u8, eaddr: u16, bus: &mut dyn Bus) {
        let operand = bus.read_word(eaddr);
        let lhs = match iflag {
            0 => self.regs.x,
            1 => self.regs.y,
            _ => self.regs.s,
        };
        alu::sub16(&mut self.regs.cc, lhs, operand);
    }

    fn bsr_or_jsr(&mut self, ireg: u8, eaddr: u16, bus: &mut dyn Bus) {
        if ireg == 0x8D {
            let off = sign_extend8(bus.read(eaddr));
            interrupt::push_word(&mut self.regs, bus, self.regs.pc);
            self.regs.pc = self.regs.pc.wrapping_add(off);
        } else {
            interrupt::push_word(&mut self.regs, bus, self.regs.pc);
            self.regs.pc = eaddr;
        }
    }
}

impl<B: Bus> Cpu<B> for Cpu6809 {
    fn step(&mut self, bus: &mut B) {
        Cpu6809::step(self, bus);
    }

    fn reset(&mut self, bus: &mut B) {
        Cpu6809::reset(self, bus);
    }

    fn pc(&self) -> u16 {
        self.regs.pc
    }

    fn is_waiting(&self) -> bool {
        Cpu6809::is_waiting(self)
    }
}

impl Observable for Cpu6809 {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "pc" => Some(self.regs.pc.into()),
            "a" => Some(self.regs.a.into()),
            "b" => Some(self.regs.b.into()),
            "d" => Some(self.regs.d().into()),
            "x" => Some(self.regs.x.into()),
            "y" => Some(self.regs.y.into()),
            "u" => Some(self.regs.u.into()),
            "s" => Some(self.regs.s.into()),
            "dp" => Some(self.regs.dp.into()),
            "cc" => Some(self.regs.cc.into()),
            "cc.e" => Some((self.regs.cc & flags::EF != 0).into()),
            "cc.f" => Some((self.regs.cc & FF != 0).into()),
            "cc.h" => Some((self.regs.cc & flags::HF != 0).into()),
            "cc.i" => Some((self.regs.cc & IF != 0).into()),
            "cc.n" => Some((self.regs.cc & NF != 0).into()),
            "cc.z" => Some((self.regs.cc & ZF != 0).into()),
            "cc.v" => Some((self.regs.cc & VF != 0).into()),
            "cc.c" => Some((self.regs.cc & CF != 0).into()),
            "waiting" => Some(self.is_waiting().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "pc", "a", "b", "d", "x", "y", "u", "s", "dp", "cc", "cc.e", "cc.f", "cc.h", "cc.i",
            "cc.n", "cc.z", "cc.v", "cc.c", "waiting",
        ]
    }
}

fn sign_extend8(b: u8) -> u16 {
    b as i8 as i16 as u16
}

