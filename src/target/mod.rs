//! Access to the debugged program's address space.
//!
//! Everything the stub does to target memory (reading instructions,
//! patching breakpoints, servicing `m`/`M` packets) goes through the
//! [`CodeMemory`] trait. On hardware this is [`RawMemory`]; simulators and
//! tests use a [`MemoryRegion`] over a plain byte slice.

use core::fmt::{self, Display};

mod raw;
mod region;

pub use self::raw::RawMemory;
pub use self::region::MemoryRegion;

/// An access to target memory failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryFault {
    /// First address of the failed access.
    pub addr: u32,
}

impl Display for MemoryFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "memory access fault at {:#010x}", self.addr)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MemoryFault {}

/// Byte-addressable view of the target's memory.
///
/// Multi-byte helpers are little-endian, matching the ARM7TDMI's data
/// layout.
pub trait CodeMemory {
    /// Fill `buf` with the bytes starting at `addr`.
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryFault>;

    /// Write `data` starting at `addr`.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryFault>;

    /// Make a freshly written instruction visible to instruction fetch.
    ///
    /// The ARM7TDMI has no caches, so the default is a no-op. Cores with a
    /// prefetch buffer or instruction cache should flush it here.
    fn sync_instruction(&mut self, _addr: u32, _len: usize) {}

    /// Read a little-endian halfword.
    fn read_u16(&mut self, addr: u32) -> Result<u16, MemoryFault> {
        let mut buf = [0; 2];
        self.read(addr, &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Read a little-endian word.
    fn read_u32(&mut self, addr: u32) -> Result<u32, MemoryFault> {
        let mut buf = [0; 4];
        self.read(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    /// Write a little-endian halfword.
    fn write_u16(&mut self, addr: u32, val: u16) -> Result<(), MemoryFault> {
        self.write(addr, &val.to_le_bytes())
    }

    /// Write a little-endian word.
    fn write_u32(&mut self, addr: u32, val: u32) -> Result<(), MemoryFault> {
        self.write(addr, &val.to_le_bytes())
    }
}

impl<M: CodeMemory + ?Sized> CodeMemory for &mut M {
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryFault> {
        (**self).read(addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryFault> {
        (**self).write(addr, data)
    }

    fn sync_instruction(&mut self, addr: u32, len: usize) {
        (**self).sync_instruction(addr, len)
    }

    fn read_u16(&mut self, addr: u32) -> Result<u16, MemoryFault> {
        (**self).read_u16(addr)
    }

    fn read_u32(&mut self, addr: u32) -> Result<u32, MemoryFault> {
        (**self).read_u32(addr)
    }

    fn write_u16(&mut self, addr: u32, val: u16) -> Result<(), MemoryFault> {
        (**self).write_u16(addr, val)
    }

    fn write_u32(&mut self, addr: u32, val: u32) -> Result<(), MemoryFault> {
        (**self).write_u32(addr, val)
    }
}
