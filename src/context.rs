//! The saved register file of the halted program.

use core::fmt::{self, Display};

use crate::arch::{Mode, RegId};
use crate::stub::TrapFrame;

/// Number of words in a [`ContextStack`].
pub const CONTEXT_SLOTS: usize = 18;

/// Slot holding the address of the instruction that trapped.
pub const ABORTED_ADDR_INDEX: usize = 0;
/// Slot holding the program's CPSR (the trap mode's SPSR).
pub const USER_CPSR_INDEX: usize = 1;
/// Slot holding R0. R1-R15 follow.
pub const USER_REG_INDEX: usize = 2;
/// Position of CPSR relative to R0.
const CPSR_OFFSET: isize = -1;

/// A stack index was out of range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct IndexOutOfRange(pub usize);

impl Display for IndexOutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context stack index {} out of range", self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for IndexOutOfRange {}

/// Slot holding `reg`.
pub const fn map_register(reg: RegId) -> usize {
    let n = match reg {
        RegId::Gpr(n) => n as isize,
        RegId::Sp => 13,
        RegId::Lr => 14,
        RegId::Pc => 15,
        RegId::Cpsr => CPSR_OFFSET,
    };
    (USER_REG_INDEX as isize + n) as usize
}

/// Flat, fixed-size snapshot of the program's registers while halted.
///
/// | index | content                      |
/// |-------|------------------------------|
/// | 0     | aborted instruction address  |
/// | 1     | CPSR                         |
/// | 2..18 | R0..R15                      |
///
/// R15 holds the address execution resumes at. It starts out equal to the
/// aborted address and is moved by `P`/`G` packets, resume addresses, and
/// the skip past a compiled-in breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextStack {
    slots: [u32; CONTEXT_SLOTS],
}

impl Default for ContextStack {
    fn default() -> Self {
        ContextStack::new()
    }
}

impl ContextStack {
    /// An all-zero context.
    pub const fn new() -> ContextStack {
        ContextStack {
            slots: [0; CONTEXT_SLOTS],
        }
    }

    /// Read slot `index`.
    pub fn get(&self, index: usize) -> Result<u32, IndexOutOfRange> {
        self.slots.get(index).copied().ok_or(IndexOutOfRange(index))
    }

    /// Write slot `index`.
    pub fn set(&mut self, index: usize, val: u32) -> Result<(), IndexOutOfRange> {
        let slot = self.slots.get_mut(index).ok_or(IndexOutOfRange(index))?;
        *slot = val;
        Ok(())
    }

    /// Read a register.
    pub fn reg(&self, reg: RegId) -> u32 {
        self.slots[map_register(reg)]
    }

    /// Write a register.
    pub fn set_reg(&mut self, reg: RegId, val: u32) {
        self.slots[map_register(reg)] = val;
    }

    /// Resume address.
    pub fn pc(&self) -> u32 {
        self.reg(RegId::Pc)
    }

    /// Program status register.
    pub fn cpsr(&self) -> u32 {
        self.reg(RegId::Cpsr)
    }

    /// Instruction set the program was executing.
    pub fn mode(&self) -> Mode {
        Mode::from_cpsr(self.cpsr())
    }

    /// Address of the instruction that trapped.
    pub fn aborted_address(&self) -> u32 {
        self.slots[ABORTED_ADDR_INDEX]
    }

    /// R0..R15 followed by CPSR, the order of a `g` reply.
    pub fn gdb_registers(&self) -> impl Iterator<Item = u32> + '_ {
        self.slots[USER_REG_INDEX..]
            .iter()
            .chain(core::iter::once(&self.slots[USER_CPSR_INDEX]))
            .copied()
    }

    /// Capture the register file from a trap frame.
    pub fn save(&mut self, frame: &TrapFrame) {
        let aborted = frame.aborted_address();
        self.slots[ABORTED_ADDR_INDEX] = aborted;
        self.slots[USER_CPSR_INDEX] = frame.spsr;
        self.slots[USER_REG_INDEX..].copy_from_slice(&frame.regs);
        self.set_reg(RegId::Pc, aborted);
    }

    /// Write the (possibly modified) register file back into a trap frame.
    pub fn restore(&self, frame: &mut TrapFrame) {
        frame.spsr = self.cpsr();
        frame.regs.copy_from_slice(&self.slots[USER_REG_INDEX..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::TrapCause;

    #[test]
    fn mapping() {
        assert_eq!(map_register(RegId::Gpr(0)), 2);
        assert_eq!(map_register(RegId::Sp), 15);
        assert_eq!(map_register(RegId::Pc), 17);
        assert_eq!(map_register(RegId::Cpsr), USER_CPSR_INDEX);
    }

    #[test]
    fn bounds_checked() {
        let mut ctx = ContextStack::new();
        assert_eq!(ctx.get(17), Ok(0));
        assert_eq!(ctx.get(18), Err(IndexOutOfRange(18)));
        assert_eq!(ctx.set(18, 1), Err(IndexOutOfRange(18)));
        assert!(ctx.set(17, 0x1000).is_ok());
        assert_eq!(ctx.pc(), 0x1000);
    }

    #[test]
    fn save_restore() {
        let mut regs = [0u32; 16];
        for (i, r) in regs.iter_mut().enumerate() {
            *r = i as u32 * 0x11;
        }
        let frame = TrapFrame::new(TrapCause::Undefined, 0x6000_001f, regs, 0x1000);

        let mut ctx = ContextStack::new();
        ctx.save(&frame);
        assert_eq!(ctx.aborted_address(), 0x1000);
        assert_eq!(ctx.pc(), 0x1000);
        assert_eq!(ctx.cpsr(), 0x6000_001f);
        assert_eq!(ctx.reg(RegId::Gpr(3)), 0x33);
        assert_eq!(ctx.mode(), Mode::Arm);

        let order: Vec<u32> = ctx.gdb_registers().collect();
        assert_eq!(order.len(), 17);
        assert_eq!(order[0], 0);
        assert_eq!(order[15], 0x1000);
        assert_eq!(order[16], 0x6000_001f);

        ctx.set_reg(RegId::Pc, 0x1004);
        let mut out = frame.clone();
        ctx.restore(&mut out);
        assert_eq!(out.regs[15], 0x1004);
        assert_eq!(out.regs[3], 0x33);
    }
}
