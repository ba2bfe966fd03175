//! A minimal UART-style I/O bridge mapped into a two-byte register page.
//!
//! # Registers (offsets from the bridge's base address)
//!
//! | Off | Name   | Description                                   |
//! |-----|--------|------------------------------------------------|
//! | $0  | STATUS | Bit 1 always set; bit 0 set iff a byte is ready |
//! | $1  | DATA   | Read consumes the pending input byte; write emits a byte |
//!
//! This models the ACIA-style port the reference interpreter exposes to
//! guest code, without its XMODEM file-transfer or interactive debug-console
//! extensions (out of scope here).

use std::collections::VecDeque;

/// Bit 1 of the status register: always asserted by the reference bridge.
const STATUS_ALWAYS: u8 = 0b10;
/// Bit 0 of the status register: set when a byte is waiting to be read.
const STATUS_READY: u8 = 0b01;

/// A byte-oriented UART bridge: one inbound queue fed by the host, one
/// outbound queue drained by the host (typically straight to stdout).
#[derive(Debug, Default)]
pub struct IoBridge {
    input: VecDeque<u8>,
    output: VecDeque<u8>,
}

impl IoBridge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a byte from the host into the guest-readable input queue.
    pub fn push_input(&mut self, byte: u8) {
        self.input.push_back(byte);
    }

    /// Drain a byte the guest has written, in FIFO order.
    pub fn pop_output(&mut self) -> Option<u8> {
        self.output.pop_front()
    }

    /// Read one of the two bridge registers.
    ///
    /// Offset 0 is the status byte; offset 1 is the data byte, and reading
    /// it consumes the head of the input queue.
    pub fn read(&mut self, offset: u8) -> u8 {
        match offset & 0x01 {
            0 => {
                let ready = u8::from(!self.input.is_empty());
                STATUS_ALWAYS | (ready & STATUS_READY)
            }
            _ => self.input.pop_front().unwrap_or(0),
        }
    }

    /// Write one of the two bridge registers. Only the data register (offset
    /// 1) has an effect; a write to the status register is ignored.
    pub fn write(&mut self, offset: u8, value: u8) {
        if offset & 0x01 == 1 {
            self.output.push_back(value);
        }
    }
}
