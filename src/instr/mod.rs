//! ARM32 / Thumb16 instruction codec.
//!
//! Instructions are classified by walking a static table of
//! `(value, mask, kind)` entries, ordered from most to least specific: the
//! first entry with `instr & mask == value` wins. The classification is only
//! as fine-grained as the debugger needs. It distinguishes instructions that
//! can change the flow of control (and therefore matter for single-step)
//! from everything else.

use core::fmt::{self, Display};

use crate::arch::Mode;
use crate::target::{CodeMemory, MemoryFault};

mod bkpt;
mod step;
mod table;

pub use self::bkpt::{
    decode_breakpoint, encode_breakpoint, BreakpointTag, ARM_BKPT, ARM_BKPT_AUTO,
    ARM_BKPT_MANUAL, ARM_BKPT_MASK, MAX_TABLE_INDEX, THUMB_BKPT, THUMB_BKPT_AUTO, THUMB_BKPT_MANUAL,
    THUMB_BKPT_MASK,
};
pub use self::step::next_instruction;
pub use self::table::{DecodeEntry, ARM_DECODE_TABLE, THUMB_DECODE_TABLE};

/// A single instruction, tagged with its instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// An instruction from the ARM32 instruction set.
    Arm(u32),
    /// An instruction from the Thumb instruction set.
    Thumb(u16),
}

impl Instruction {
    /// Read the instruction at `addr` in the given instruction set.
    pub fn read<M: CodeMemory + ?Sized>(
        mem: &mut M,
        addr: u32,
        mode: Mode,
    ) -> Result<Instruction, MemoryFault> {
        Ok(match mode {
            Mode::Arm => Instruction::Arm(mem.read_u32(addr)?),
            Mode::Thumb => Instruction::Thumb(mem.read_u16(addr)?),
        })
    }

    /// Write this instruction to `addr`. The caller is responsible for
    /// calling [`CodeMemory::sync_instruction`] afterwards.
    pub fn write_to<M: CodeMemory + ?Sized>(self, mem: &mut M, addr: u32) -> Result<(), MemoryFault> {
        match self {
            Instruction::Arm(instr) => mem.write_u32(addr, instr),
            Instruction::Thumb(instr) => mem.write_u16(addr, instr),
        }
    }

    /// Instruction set this instruction belongs to.
    pub fn mode(self) -> Mode {
        match self {
            Instruction::Arm(_) => Mode::Arm,
            Instruction::Thumb(_) => Mode::Thumb,
        }
    }

    /// Encoded size in bytes.
    pub fn size(self) -> usize {
        match self {
            Instruction::Arm(_) => 4,
            Instruction::Thumb(_) => 2,
        }
    }
}

/// Instruction category, as far as control flow is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrKind {
    /// Falls through to the next instruction.
    Linear,
    /// `BKPT` (any immediate).
    Breakpoint,
    /// `SWI`. Single-step treats it as one instruction.
    SoftwareInterrupt,
    /// ARM `B` / `BL`, Thumb unconditional `B`.
    Branch,
    /// Thumb `B<cond>`.
    ConditionalBranch,
    /// `BX Rm`.
    BranchExchange,
    /// Thumb `BL` prefix, always followed by its suffix.
    LongBranchLink,
    /// Thumb `BL` suffix on its own.
    LongBranchLinkSuffix,
    /// ARM data processing with `Rd = PC`.
    DataProcessingPc,
    /// ARM `LDR PC, [...]`.
    LoadPc,
    /// ARM `LDM` with `PC` in the register list.
    LoadMultiplePc,
    /// Thumb `ADD PC, Rm` / `MOV PC, Rm`.
    HiRegisterPc,
    /// Thumb `POP {..., PC}`.
    PopPc,
}

/// Result of decoding one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// Category.
    pub kind: InstrKind,
    /// Length in bytes, including the suffix of a Thumb `BL` pair.
    pub len: u8,
}

impl Decoded {
    /// True for anything which may not fall through to `addr + len`.
    pub fn is_branch_or_special(&self) -> bool {
        self.kind != InstrKind::Linear
    }
}

/// An instruction could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// No table entry matches the opcode.
    Undefined(Instruction),
    /// A Thumb `BL` prefix is not followed by a `BL` suffix.
    UnpairedLongBranch(u32),
    /// Memory needed to decode or evaluate the instruction is unreadable.
    Fault(MemoryFault),
}

impl From<MemoryFault> for DecodeError {
    fn from(e: MemoryFault) -> Self {
        DecodeError::Fault(e)
    }
}

impl From<DecodeError> for crate::Error {
    fn from(_: DecodeError) -> Self {
        crate::Error::DecodeError
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Undefined(Instruction::Arm(i)) => write!(f, "undefined ARM opcode {:#010x}", i),
            DecodeError::Undefined(Instruction::Thumb(i)) => write!(f, "undefined Thumb opcode {:#06x}", i),
            DecodeError::UnpairedLongBranch(addr) => write!(f, "unpaired BL prefix at {:#010x}", addr),
            DecodeError::Fault(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

/// Classify a raw opcode. A Thumb `BL` prefix reports its pair length (4)
/// without checking that the suffix follows; [`decode`] does check.
pub fn decode_instruction(instr: Instruction) -> Result<Decoded, DecodeError> {
    let entry = match instr {
        Instruction::Arm(i) => table::lookup(&ARM_DECODE_TABLE, i).map(|e| (e.kind, e.len)),
        Instruction::Thumb(i) => table::lookup(&THUMB_DECODE_TABLE, i).map(|e| (e.kind, e.len)),
    };

    match entry {
        Some((kind, len)) => Ok(Decoded { kind, len }),
        None => Err(DecodeError::Undefined(instr)),
    }
}

/// Read and classify the instruction at `addr`.
pub fn decode<M: CodeMemory + ?Sized>(
    mem: &mut M,
    addr: u32,
    mode: Mode,
) -> Result<Decoded, DecodeError> {
    let instr = Instruction::read(mem, addr, mode)?;
    let decoded = decode_instruction(instr)?;

    if decoded.kind == InstrKind::LongBranchLink {
        let suffix = Instruction::read(mem, addr.wrapping_add(2), Mode::Thumb)?;
        match decode_instruction(suffix) {
            Ok(Decoded {
                kind: InstrKind::LongBranchLinkSuffix,
                ..
            }) => {}
            _ => return Err(DecodeError::UnpairedLongBranch(addr)),
        }
    }

    Ok(decoded)
}
