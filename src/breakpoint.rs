//! Software breakpoint management.
//!
//! Breakpoints are planted by overwriting an instruction with a tagged
//! `BKPT` (see [`encode_breakpoint`]). The table owns the displaced
//! instructions and is the only code that writes `BKPT`s into the program.

use crate::arch::Mode;
use crate::instr::{decode_breakpoint, encode_breakpoint, Instruction, MAX_TABLE_INDEX};
use crate::target::{CodeMemory, MemoryFault};
use crate::Error;

/// Default number of table slots, including the auto-step slot.
pub const MAX_BREAKPOINTS: usize = 16;

/// Slot reserved for the transient single-step breakpoint.
pub const AUTO_STEP_SLOT: usize = 0;

/// A reversible instruction patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodePatch {
    address: u32,
    original: Instruction,
    patched: Instruction,
    applied: bool,
}

impl CodePatch {
    /// A patch replacing `original` at `address` with `patched`. Nothing is
    /// written until [`apply`](Self::apply).
    pub fn new(address: u32, original: Instruction, patched: Instruction) -> CodePatch {
        CodePatch {
            address,
            original,
            patched,
            applied: false,
        }
    }

    /// Write the patched instruction.
    pub fn apply<M: CodeMemory + ?Sized>(&mut self, mem: &mut M) -> Result<(), MemoryFault> {
        self.patched.write_to(mem, self.address)?;
        mem.sync_instruction(self.address, self.patched.size());
        self.applied = true;
        Ok(())
    }

    /// Put the original instruction back.
    pub fn restore<M: CodeMemory + ?Sized>(&mut self, mem: &mut M) -> Result<(), MemoryFault> {
        self.original.write_to(mem, self.address)?;
        mem.sync_instruction(self.address, self.original.size());
        self.applied = false;
        Ok(())
    }

    /// Patched address.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// The displaced instruction.
    pub fn original(&self) -> Instruction {
        self.original
    }

    /// The instruction written by `apply`.
    pub fn patched(&self) -> Instruction {
        self.patched
    }

    /// Whether memory currently holds the patched instruction.
    pub fn is_applied(&self) -> bool {
        self.applied
    }
}

/// A live breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointEntry {
    /// The `BKPT` patch.
    pub patch: CodePatch,
    /// Transient single-step breakpoint.
    pub auto_step: bool,
    /// Slot holding this entry, also encoded in the `BKPT` immediate.
    pub index: u8,
}

impl BreakpointEntry {
    /// Breakpoint address.
    pub fn address(&self) -> u32 {
        self.patch.address()
    }

    /// Whether the breakpoint sits in Thumb code.
    pub fn is_thumb(&self) -> bool {
        self.patch.original().mode() == Mode::Thumb
    }
}

/// Fixed-capacity breakpoint table.
///
/// Slot [`AUTO_STEP_SLOT`] is reserved for the auto-step breakpoint, leaving
/// `N - 1` slots for user breakpoints. A slot is live iff it is occupied.
#[derive(Debug)]
pub struct BreakpointTable<const N: usize = MAX_BREAKPOINTS> {
    slots: [Option<BreakpointEntry>; N],
}

impl<const N: usize> Default for BreakpointTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> BreakpointTable<N> {
    const INDEX_FITS: () = assert!(
        N > 1 && N <= MAX_TABLE_INDEX + 1,
        "breakpoint table must have between 2 and 127 slots"
    );

    /// An empty table.
    ///
    /// Fails to compile if a slot index would not fit in a Thumb `BKPT`.
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::INDEX_FITS;
        BreakpointTable { slots: [None; N] }
    }

    /// Total number of slots, including the auto-step slot.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Plant a user breakpoint at `address`, returning its index.
    ///
    /// Fails with [`Error::AlreadyBreakpointed`] if the address already
    /// holds a debugger `BKPT` (planted or compiled-in), and with
    /// [`Error::TableFull`] if no user slot is free. On failure neither the
    /// table nor memory is modified.
    pub fn insert<M: CodeMemory + ?Sized>(
        &mut self,
        mem: &mut M,
        address: u32,
        mode: Mode,
    ) -> Result<usize, Error> {
        let current = Instruction::read(mem, address, mode).map_err(|_| Error::UnknownParameter)?;
        if decode_breakpoint(current).is_some() || self.resolve(address).is_some() {
            return Err(Error::AlreadyBreakpointed);
        }

        let index = (0..N)
            .filter(|&i| i != AUTO_STEP_SLOT)
            .find(|&i| self.slots[i].is_none())
            .ok_or(Error::TableFull)?;

        self.plant(mem, index, address, current, false)?;
        debug!("breakpoint {} planted at {:#010x} ({:?})", index, address, mode);
        Ok(index)
    }

    /// Plant the single-step breakpoint at `address`.
    pub fn insert_auto<M: CodeMemory + ?Sized>(
        &mut self,
        mem: &mut M,
        address: u32,
        mode: Mode,
    ) -> Result<usize, Error> {
        if self.slots[AUTO_STEP_SLOT].is_some() {
            return Err(Error::AlreadyBreakpointed);
        }

        let current = Instruction::read(mem, address, mode).map_err(|_| Error::DecodeError)?;
        if decode_breakpoint(current).is_some() {
            return Err(Error::AlreadyBreakpointed);
        }

        self.plant(mem, AUTO_STEP_SLOT, address, current, true)
            .map_err(|_| Error::DecodeError)?;
        trace!("auto-step breakpoint planted at {:#010x} ({:?})", address, mode);
        Ok(AUTO_STEP_SLOT)
    }

    fn plant<M: CodeMemory + ?Sized>(
        &mut self,
        mem: &mut M,
        index: usize,
        address: u32,
        original: Instruction,
        auto_step: bool,
    ) -> Result<(), Error> {
        let bkpt = encode_breakpoint(original, index as u16, auto_step);
        let mut patch = CodePatch::new(address, original, bkpt);
        patch.apply(mem).map_err(|_| Error::UnknownParameter)?;

        self.slots[index] = Some(BreakpointEntry {
            patch,
            auto_step,
            index: index as u8,
        });
        Ok(())
    }

    /// Remove the breakpoint in slot `index`, restoring the original
    /// instruction.
    pub fn remove<M: CodeMemory + ?Sized>(&mut self, mem: &mut M, index: usize) -> Result<(), Error> {
        let entry = self
            .slots
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidIndex)?;

        if entry.patch.is_applied() {
            entry.patch.restore(mem).map_err(|_| Error::UnknownParameter)?;
        }

        debug!("breakpoint {} removed from {:#010x}", index, entry.address());
        self.slots[index] = None;
        Ok(())
    }

    /// Index of the user breakpoint at `address`.
    pub fn resolve(&self, address: u32) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != AUTO_STEP_SLOT)
            .find(|(_, e)| matches!(e, Some(e) if e.address() == address))
            .map(|(i, _)| i)
    }

    /// The entry in slot `index`, if live.
    pub fn get(&self, index: usize) -> Option<&BreakpointEntry> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Live entries, auto-step slot included.
    pub fn iter(&self) -> impl Iterator<Item = &BreakpointEntry> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Temporarily put back the original instruction under a live
    /// breakpoint, keeping the slot.
    pub fn disarm<M: CodeMemory + ?Sized>(&mut self, mem: &mut M, index: usize) -> Result<(), Error> {
        let entry = self
            .slots
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidIndex)?;
        if entry.patch.is_applied() {
            entry.patch.restore(mem).map_err(|_| Error::UnknownParameter)?;
        }
        Ok(())
    }

    /// Re-plant a disarmed breakpoint. A slot freed in the meantime is not
    /// an error.
    pub fn rearm<M: CodeMemory + ?Sized>(&mut self, mem: &mut M, index: usize) -> Result<(), Error> {
        match self.slots.get_mut(index).and_then(Option::as_mut) {
            Some(entry) if !entry.patch.is_applied() => {
                entry.patch.apply(mem).map_err(|_| Error::UnknownParameter)
            }
            _ => Ok(()),
        }
    }

    /// Remove every breakpoint. Slots whose memory cannot be restored are
    /// dropped anyway.
    pub fn clear<M: CodeMemory + ?Sized>(&mut self, mem: &mut M) {
        for index in 0..N {
            if self.slots[index].is_some() && self.remove(mem, index).is_err() {
                warn!("could not restore memory under breakpoint {}", index);
                self.slots[index] = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::{BreakpointTag, ARM_BKPT, THUMB_BKPT_MANUAL};
    use crate::target::MemoryRegion;

    const BASE: u32 = 0x1000;

    fn program() -> [u8; 64] {
        let mut buf = [0u8; 64];
        for (i, word) in buf.chunks_mut(4).enumerate() {
            // mov r<i>, r<i>
            let instr = 0xe1a0_0000 | ((i as u32 & 0xf) << 12) | (i as u32 & 0xf);
            word.copy_from_slice(&instr.to_le_bytes());
        }
        buf
    }

    #[test]
    fn insert_remove_round_trip() {
        let mut buf = program();
        let pristine = buf;
        let mut mem = MemoryRegion::new(BASE, &mut buf[..]);
        let mut table: BreakpointTable<4> = BreakpointTable::new();

        let index = table.insert(&mut mem, BASE + 8, Mode::Arm).unwrap();
        assert_eq!(index, 1);
        assert_eq!(mem.read_u32(BASE + 8).unwrap(), ARM_BKPT | 0x1);
        assert_eq!(table.resolve(BASE + 8), Some(1));

        table.remove(&mut mem, index).unwrap();
        assert_eq!(mem.as_bytes(), &pristine[..]);
        assert_eq!(table.resolve(BASE + 8), None);

        // slot is reusable
        assert_eq!(table.insert(&mut mem, BASE + 12, Mode::Arm), Ok(1));
    }

    #[test]
    fn thumb_breakpoint() {
        let mut buf = program();
        let mut mem = MemoryRegion::new(BASE, &mut buf[..]);
        let mut table: BreakpointTable<4> = BreakpointTable::new();

        let index = table.insert(&mut mem, BASE + 2, Mode::Thumb).unwrap();
        assert_eq!(mem.read_u16(BASE + 2).unwrap(), 0xbe00 | index as u16);
        assert!(table.get(index).unwrap().is_thumb());
        // neighbouring halfword untouched
        assert_eq!(mem.read_u16(BASE).unwrap(), 0x0000);
    }

    #[test]
    fn table_full() {
        let mut buf = program();
        let mut mem = MemoryRegion::new(BASE, &mut buf[..]);
        let mut table: BreakpointTable<3> = BreakpointTable::new();

        table.insert(&mut mem, BASE, Mode::Arm).unwrap();
        table.insert(&mut mem, BASE + 4, Mode::Arm).unwrap();
        let before = mem.as_bytes().to_vec();

        assert_eq!(table.insert(&mut mem, BASE + 8, Mode::Arm), Err(Error::TableFull));
        assert_eq!(mem.as_bytes(), &before[..]);
        assert_eq!(table.iter().count(), 2);
    }

    #[test]
    fn invalid_index() {
        let mut buf = program();
        let mut mem = MemoryRegion::new(BASE, &mut buf[..]);
        let mut table: BreakpointTable<4> = BreakpointTable::new();

        assert_eq!(table.remove(&mut mem, 2), Err(Error::InvalidIndex));
        assert_eq!(table.remove(&mut mem, 40), Err(Error::InvalidIndex));
        assert_eq!(mem.as_bytes(), &program()[..]);
    }

    #[test]
    fn already_breakpointed() {
        let mut buf = program();
        buf[16..18].copy_from_slice(&THUMB_BKPT_MANUAL.to_le_bytes());
        let mut mem = MemoryRegion::new(BASE, &mut buf[..]);
        let mut table: BreakpointTable<4> = BreakpointTable::new();

        table.insert(&mut mem, BASE, Mode::Arm).unwrap();
        assert_eq!(table.insert(&mut mem, BASE, Mode::Arm), Err(Error::AlreadyBreakpointed));
        // compiled-in breakpoint
        assert_eq!(
            table.insert(&mut mem, BASE + 16, Mode::Thumb),
            Err(Error::AlreadyBreakpointed)
        );
    }

    #[test]
    fn auto_step_slot() {
        let mut buf = program();
        let mut mem = MemoryRegion::new(BASE, &mut buf[..]);
        let mut table: BreakpointTable<4> = BreakpointTable::new();

        assert_eq!(table.insert_auto(&mut mem, BASE + 4, Mode::Arm), Ok(AUTO_STEP_SLOT));
        let tag = decode_breakpoint(Instruction::Arm(mem.read_u32(BASE + 4).unwrap())).unwrap();
        assert!(tag.auto_step);
        assert_eq!(tag.index, 0);

        // never reported as a user breakpoint
        assert_eq!(table.resolve(BASE + 4), None);
        assert_eq!(table.insert(&mut mem, BASE + 8, Mode::Arm), Ok(1));
    }

    #[test]
    fn disarm_rearm() {
        let mut buf = program();
        let mut mem = MemoryRegion::new(BASE, &mut buf[..]);
        let mut table: BreakpointTable<4> = BreakpointTable::new();

        let index = table.insert(&mut mem, BASE, Mode::Arm).unwrap();
        table.disarm(&mut mem, index).unwrap();
        assert_eq!(mem.read_u32(BASE).unwrap(), 0xe1a0_0000);
        assert_eq!(table.resolve(BASE), Some(index));

        table.rearm(&mut mem, index).unwrap();
        assert_eq!(mem.read_u32(BASE).unwrap(), ARM_BKPT | 1);

        table.clear(&mut mem);
        assert_eq!(mem.as_bytes(), &program()[..]);
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn largest_table_indices_fit_thumb() {
        let mut buf = [0u8; 2 * MAX_TABLE_INDEX];
        let mut mem = MemoryRegion::new(BASE, &mut buf[..]);
        let mut table: BreakpointTable<{ MAX_TABLE_INDEX + 1 }> = BreakpointTable::new();

        for i in 0..MAX_TABLE_INDEX as u32 {
            table.insert(&mut mem, BASE + 2 * i, Mode::Thumb).unwrap();
        }
        assert_eq!(
            table.insert(&mut mem, BASE, Mode::Thumb),
            Err(Error::AlreadyBreakpointed)
        );

        let last = BASE + 2 * (MAX_TABLE_INDEX as u32 - 1);
        let tag = decode_breakpoint(Instruction::Thumb(mem.read_u16(last).unwrap())).unwrap();
        assert_eq!(usize::from(tag.index), MAX_TABLE_INDEX);
        assert_ne!(tag.index, BreakpointTag::manual_index(Instruction::Thumb(0)));
    }
}
