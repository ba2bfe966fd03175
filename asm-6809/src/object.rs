//! Binary image and Motorola S-record output, grounded on the reference
//! assembler's `outbuffer`/`outhex`/`flushhex`.

/// A sparse 64 KiB byte image assembled by one or more `ORG`-addressed
/// writes, later flattened into either contiguous binary or S-records.
pub struct Image {
    data: Vec<u8>,
    written: Vec<bool>,
}

impl Default for Image {
    fn default() -> Self {
        Self::new()
    }
}

impl Image {
    #[must_use]
    pub fn new() -> Self {
        Self { data: vec![0; 0x1_0000], written: vec![false; 0x1_0000] }
    }

    pub fn write(&mut self, address: u16, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            let addr = address.wrapping_add(i as u16) as usize;
            self.data[addr] = *b;
            self.written[addr] = true;
        }
    }

    fn lowest(&self) -> Option<u16> {
        self.written.iter().position(|w| *w).map(|i| i as u16)
    }

    fn highest(&self) -> Option<u16> {
        self.written.iter().rposition(|w| *w).map(|i| i as u16)
    }

    /// A contiguous image from the lowest to the highest written address,
    /// zero-filled across any gap.
    #[must_use]
    pub fn to_binary(&self) -> Vec<u8> {
        match (self.lowest(), self.highest()) {
            (Some(lo), Some(hi)) => self.data[lo as usize..=hi as usize].to_vec(),
            _ => Vec::new(),
        }
    }

    /// Motorola S1/S9 records, 16 data bytes per record, breaking a record
    /// early whenever the next written byte isn't address-contiguous.
    #[must_use]
    pub fn to_srecords(&self) -> String {
        let mut out = String::new();
        let mut record_addr: u32 = 0;
        let mut buf: Vec<u8> = Vec::new();

        let mut flush = |out: &mut String, addr: u32, buf: &mut Vec<u8>| {
            if buf.is_empty() {
                return;
            }
            let len = buf.len() as u32 + 3;
            let mut chksum: u32 = len + (addr & 0xff) + ((addr >> 8) & 0xff);
            for b in buf.iter() {
                chksum += u32::from(*b);
            }
            out.push_str(&format!("S1{len:02X}{addr:04X}"));
            for b in buf.iter() {
                out.push_str(&format!("{b:02X}"));
            }
            out.push_str(&format!("{:02X}\n", 0xff - (chksum & 0xff)));
            buf.clear();
        };

        for addr in 0..=0xFFFFu32 {
            if self.written[addr as usize] {
                if !buf.is_empty() && record_addr + buf.len() as u32 != addr {
                    flush(&mut out, record_addr, &mut buf);
                }
                if buf.is_empty() {
                    record_addr = addr;
                }
                buf.push(self.data[addr as usize]);
                if buf.len() == 16 {
                    flush(&mut out, record_addr, &mut buf);
                }
            }
        }
        flush(&mut out, record_addr, &mut buf);
        out.push_str("S9030000FC\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_is_zero_filled_across_a_gap() {
        let mut img = Image::new();
        img.write(0x100, &[0x86, 0x42]);
        img.write(0x110, &[0x39]);
        let bin = img.to_binary();
        assert_eq!(bin.len(), 0x11);
        assert_eq!(bin[0], 0x86);
        assert_eq!(bin[1], 0x42);
        assert_eq!(bin[2], 0); // gap
        assert_eq!(bin[0x10], 0x39);
    }

    #[test]
    fn srecord_terminator_is_always_present() {
        let img = Image::new();
        assert_eq!(img.to_srecords(), "S9030000FC\n");
    }

    #[test]
    fn srecord_checksum_matches_reference_format() {
        let mut img = Image::new();
        img.write(0x0000, &[0x00]);
        let out = img.to_srecords();
        // len=1 data byte + 3 = 4; addr 0000; data 00; checksum = ~(4+0+0+0)&0xff
        assert_eq!(out, "S1040000FB\nS9030000FC\n");
    }
}
