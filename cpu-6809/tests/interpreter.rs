//! End-to-end scenarios exercising the interpreter against a flat-memory bus.

use std::sync::Arc;

use m6809_core::{Bus, Cpu};

use cpu_6809::flags::{CF, HF, NF, VF, ZF};
use cpu_6809::{Cpu6809, Latches};

struct TestBus {
    mem: Vec<u8>,
}

impl TestBus {
    fn new() -> Self {
        Self { mem: vec![0; 0x1_0000] }
    }

    fn load(&mut self, addr: u16, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.mem[addr as usize + i] = *b;
        }
    }
}

impl Bus for TestBus {
    fn read(&mut self, address: u16) -> u8 {
        self.mem[address as usize]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.mem[address as usize] = value;
    }
}

fn new_cpu() -> Cpu6809 {
    Cpu6809::new(Arc::new(Latches::new()))
}

#[test]
fn adda_full_flag_scenario() {
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x8B, 0x01]); // ADDA #1
    let mut cpu = new_cpu();
    cpu.registers_mut().pc = 0x0100;
    cpu.registers_mut().a = 0x7F;

    cpu.step(&mut bus);

    let cc = cpu.registers().cc;
    assert_eq!(cpu.registers().a, 0x80);
    assert_ne!(cc & NF, 0, "N should be set");
    assert_eq!(cc & ZF, 0, "Z should be clear");
    assert_ne!(cc & VF, 0, "V should be set");
    assert_eq!(cc & CF, 0, "C should be clear");
    assert_ne!(cc & HF, 0, "H should be set");
}

#[test]
fn mul_computes_unsigned_product_and_touches_only_z_and_c() {
    let mut bus = TestBus::new();
    bus.load(0x0100, &[0x3D]); // MUL
    let mut cpu = new_cpu();
    cpu.registers_mut().pc = 0x0100;
    cpu.registers_mut().a = 0xFF;
    cpu.registers_mut().b = 0x01;

    cpu.step(&mut bus);

    let regs = cpu.registers();
    assert_eq!(regs.a, 0x00);
    assert_eq!(regs.b, 0xFF);
    assert_eq!(regs.cc & ZF, 0);
    assert_ne!(regs.cc & CF, 0);
}

#[test]
fn reset_loads_pc_from_vector() {
    let mut bus = TestBus::new();
    bus.load(0xFFFE, &[0x12, 0x34]);
    let mut cpu = new_cpu();

    cpu.reset(&mut bus);

    assert_eq!(cpu.pc(), 0x1234);
}

#[test]
fn pshs_then_puls_restores_registers_and_leaves_stack_balanced() {
    let mut bus = TestBus::new();
    // PSHS A,B,X,CC ; PULS A,B,X,CC ; next opcode after.
    bus.load(0x0100, &[0x34, 0x15, 0x35, 0x15]);
    let mut cpu = new_cpu();
    cpu.registers_mut().pc = 0x0100;
    cpu.registers_mut().s = 0x2000;
    cpu.registers_mut().a = 0x11;
    cpu.registers_mut().b = 0x22;
    cpu.registers_mut().x = 0x3344;
    cpu.registers_mut().cc = 0x55;

    let s_before = cpu.registers().s;
    cpu.step(&mut bus); // PSHS
    assert_ne!(cpu.registers().s, s_before);

    cpu.registers_mut().a = 0;
    cpu.registers_mut().b = 0;
    cpu.registers_mut().x = 0;
    cpu.registers_mut().cc = 0;

    cpu.step(&mut bus); // PULS

    let regs = cpu.registers();
    assert_eq!(regs.s, s_before);
    assert_eq!(regs.a, 0x11);
    assert_eq!(regs.b, 0x22);
    assert_eq!(regs.x, 0x3344);
    assert_eq!(regs.cc, 0x55);
}

#[test]
fn irq_entry_then_rti_restores_full_state() {
    let mut bus = TestBus::new();
    // Handler at the IRQ vector target is just RTI.
    bus.load(0xFFF8, &[0x20, 0x00]); // IRQ vector -> $2000
    bus.load(0x2000, &[0x3B]); // RTI

    let mut cpu = new_cpu();
    cpu.registers_mut().pc = 0x0100;
    cpu.registers_mut().s = 0x3000;
    cpu.registers_mut().a = 0xAA;
    cpu.registers_mut().b = 0xBB;
    cpu.registers_mut().x = 0x1111;
    cpu.registers_mut().y = 0x2222;
    cpu.registers_mut().u = 0x3333;
    cpu.registers_mut().dp = 0x40;
    cpu.registers_mut().cc = 0x00;

    let snapshot = *cpu.registers();

    cpu.latches().irq.store(1, std::sync::atomic::Ordering::Release);
    cpu.latches().attention.store(true, std::sync::atomic::Ordering::Release);

    cpu.step(&mut bus); // attention check takes IRQ, then executes RTI at $2000

    let regs = cpu.registers();
    assert_eq!(regs.pc, snapshot.pc);
    assert_eq!(regs.a, snapshot.a);
    assert_eq!(regs.b, snapshot.b);
    assert_eq!(regs.x, snapshot.x);
    assert_eq!(regs.y, snapshot.y);
    assert_eq!(regs.u, snapshot.u);
    assert_eq!(regs.dp, snapshot.dp);
    assert_eq!(regs.s, snapshot.s);
}

#[test]
fn swi_handler_that_immediately_rtis_is_a_loop_identity() {
    let mut bus = TestBus::new();
    bus.load(0xFFFA, &[0x21, 0x00]); // SWI vector -> $2100
    bus.load(0x2100, &[0x3B]); // RTI
    bus.load(0x0100, &[0x3F]); // SWI

    let mut cpu = new_cpu();
    cpu.registers_mut().pc = 0x0100;
    cpu.registers_mut().s = 0x3000;
    let snapshot = *cpu.registers();

    cpu.step(&mut bus); // SWI: push frame, jump to handler
    cpu.step(&mut bus); // RTI: pop frame, return

    let regs = cpu.registers();
    assert_eq!(regs.pc, snapshot.pc.wrapping_add(1));
    assert_eq!(regs.s, snapshot.s);
}
