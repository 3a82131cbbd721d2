use super::{CodeMemory, MemoryFault};

/// The physical address space of the running core, accessed with volatile
/// loads and stores.
///
/// Aligned halfword and word accesses are performed as single bus cycles, so
/// an instruction patch is never observed half-written.
#[derive(Debug)]
pub struct RawMemory {
    _private: (),
}

impl RawMemory {
    /// # Safety
    ///
    /// Every address the host asks for is dereferenced as-is. The caller must
    /// make sure the debug session only touches memory that is safe to read
    /// and write while the program is halted (no read-sensitive peripheral
    /// registers, no stub-owned memory).
    pub unsafe fn new() -> RawMemory {
        RawMemory { _private: () }
    }
}

impl CodeMemory for RawMemory {
    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryFault> {
        for (i, b) in buf.iter_mut().enumerate() {
            let ptr = addr.wrapping_add(i as u32) as usize as *const u8;
            // SAFETY: upheld by the contract of `RawMemory::new`
            *b = unsafe { core::ptr::read_volatile(ptr) };
        }
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryFault> {
        for (i, b) in data.iter().enumerate() {
            let ptr = addr.wrapping_add(i as u32) as usize as *mut u8;
            // SAFETY: upheld by the contract of `RawMemory::new`
            unsafe { core::ptr::write_volatile(ptr, *b) };
        }
        Ok(())
    }

    fn read_u16(&mut self, addr: u32) -> Result<u16, MemoryFault> {
        if addr & 1 != 0 {
            return Err(MemoryFault { addr });
        }
        // SAFETY: aligned, and upheld by the contract of `RawMemory::new`
        Ok(unsafe { core::ptr::read_volatile(addr as usize as *const u16) })
    }

    fn read_u32(&mut self, addr: u32) -> Result<u32, MemoryFault> {
        if addr & 3 != 0 {
            return Err(MemoryFault { addr });
        }
        // SAFETY: aligned, and upheld by the contract of `RawMemory::new`
        Ok(unsafe { core::ptr::read_volatile(addr as usize as *const u32) })
    }

    fn write_u16(&mut self, addr: u32, val: u16) -> Result<(), MemoryFault> {
        if addr & 1 != 0 {
            return Err(MemoryFault { addr });
        }
        // SAFETY: aligned, and upheld by the contract of `RawMemory::new`
        unsafe { core::ptr::write_volatile(addr as usize as *mut u16, val) };
        Ok(())
    }

    fn write_u32(&mut self, addr: u32, val: u32) -> Result<(), MemoryFault> {
        if addr & 3 != 0 {
            return Err(MemoryFault { addr });
        }
        // SAFETY: aligned, and upheld by the contract of `RawMemory::new`
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, val) };
        Ok(())
    }
}
