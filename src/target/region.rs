use managed::ManagedSlice;

use super::{CodeMemory, MemoryFault};

/// A window of target memory backed by a byte buffer mapped at `base`.
///
/// Useful for simulators, host-side tests, and for confining the debug
/// session to a known-safe RAM range on hardware.
pub struct MemoryRegion<'a> {
    base: u32,
    bytes: ManagedSlice<'a, u8>,
}

impl<'a> MemoryRegion<'a> {
    /// Map `bytes` at address `base`.
    pub fn new(base: u32, bytes: impl Into<ManagedSlice<'a, u8>>) -> MemoryRegion<'a> {
        MemoryRegion {
            base,
            bytes: bytes.into(),
        }
    }

    /// First mapped address.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// The backing bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn range(&self, addr: u32, len: usize) -> Result<core::ops::Range<usize>, MemoryFault> {
        let fault = MemoryFault { addr };
        let start = addr.checked_sub(self.base).ok_or(fault)? as usize;
        let end = start.checked_add(len).ok_or(fault)?;
        if end > self.bytes.len() {
            return Err(fault);
        }
        Ok(start..end)
    }
}

impl CodeMemory for MemoryRegion<'_> {
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryFault> {
        let range = self.range(addr, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryFault> {
        let range = self.range(addr, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_access() {
        let mut buf = [0u8; 8];
        let mut mem = MemoryRegion::new(0x1000, &mut buf[..]);

        mem.write_u32(0x1004, 0xE120_0070).unwrap();
        assert_eq!(mem.read_u16(0x1004).unwrap(), 0x0070);
        assert_eq!(mem.read_u32(0x1004).unwrap(), 0xE120_0070);
        assert_eq!(&mem.as_bytes()[4..], &[0x70, 0x00, 0x20, 0xE1]);
    }

    #[test]
    fn out_of_range() {
        let mut buf = [0u8; 8];
        let mut mem = MemoryRegion::new(0x1000, &mut buf[..]);

        assert_eq!(mem.read_u32(0x0ffc), Err(MemoryFault { addr: 0x0ffc }));
        assert_eq!(mem.read_u32(0x1006), Err(MemoryFault { addr: 0x1006 }));
        assert!(mem.write(0x1008, &[0]).is_err());
    }
}
