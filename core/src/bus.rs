/// Memory and I/O-bridge access for the 6809 address space.
///
/// A single flat 64 KiB space: implementations are responsible for routing
/// the I/O page (see the CPU crate's `bridge` module) and for ignoring
/// writes to the ROM region. There is no cycle accounting here — timing is
/// explicitly not modeled.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Read a big-endian word, wrapping at 0xFFFF without fault.
    fn read_word(&mut self, address: u16) -> u16 {
        let hi = self.read(address);
        let lo = self.read(address.wrapping_add(1));
        u16::from_be_bytes([hi, lo])
    }

    /// Write a big-endian word, wrapping at 0xFFFF without fault.
    fn write_word(&mut self, address: u16, value: u16) {
        let [hi, lo] = value.to_be_bytes();
        self.write(address, hi);
        self.write(address.wrapping_add(1), lo);
    }
}
