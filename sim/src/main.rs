//! Host harness: loads a ROM image, resets the CPU through the reset
//! vector, and runs it against a 20ms FIRQ timer and a background stdin
//! reader, draining bridge output to stdout.
//!
//! Structure grounded on the model repo's windowed `runner/src/main.rs`
//! loop, with the window/audio/keyboard layer replaced by a headless
//! timer + stdin/stdout pair; timer semantics translated from
//! `original_source/sbc09/sbc09/io.c`'s `SIGALRM`-driven `timehandler`
//! into a sleeping background thread (§5).

mod bus;

use std::io::{Read, Write};
use std::sync::atomic::Ordering;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use cpu_6809::interrupt::{IRQ_IRQ, IRQ_NONE};
use cpu_6809::{Cpu6809, Latches};

use bus::SystemBus;

const TIMER_PERIOD: Duration = Duration::from_millis(20);

fn spawn_timer(latches: Arc<Latches>) {
    std::thread::spawn(move || loop {
        std::thread::sleep(TIMER_PERIOD);
        if latches.irq.load(Ordering::Acquire) == IRQ_NONE {
            latches.irq.store(cpu_6809::interrupt::IRQ_FIRQ, Ordering::Release);
            latches.attention.store(true, Ordering::Release);
        }
    });
}

fn spawn_stdin_reader(latches: Arc<Latches>) -> mpsc::Receiver<u8> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut byte = [0u8; 1];
        loop {
            match std::io::stdin().read(&mut byte) {
                Ok(0) | Err(_) => {
                    latches.escape.store(true, Ordering::Release);
                    latches.attention.store(true, Ordering::Release);
                    break;
                }
                Ok(_) => {
                    if tx.send(byte[0]).is_err() {
                        break;
                    }
                    if latches.irq.load(Ordering::Acquire) == IRQ_NONE {
                        latches.irq.store(IRQ_IRQ, Ordering::Release);
                    }
                    latches.attention.store(true, Ordering::Release);
                }
            }
        }
    });
    rx
}

fn main() {
    let rom_path = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: sim <rom-file>");
        std::process::exit(2);
    });
    let rom = std::fs::read(&rom_path).expect("Failed to load ROM");

    let mut bus = SystemBus::new();
    bus.load_rom(&rom);

    let latches = Arc::new(Latches::new());
    let mut cpu = Cpu6809::new(Arc::clone(&latches));
    cpu.reset(&mut bus);

    spawn_timer(Arc::clone(&latches));
    let stdin_rx = spawn_stdin_reader(Arc::clone(&latches));

    let stdout = std::io::stdout();
    loop {
        if latches.escape.load(Ordering::Acquire) {
            break;
        }
        while let Ok(byte) = stdin_rx.try_recv() {
            bus.bridge_mut().push_input(byte);
        }
        cpu.step(&mut bus);
        while let Some(byte) = bus.bridge_mut().pop_output() {
            let mut out = stdout.lock();
            out.write_all(&[byte]).ok();
            out.flush().ok();
        }
    }
}
