//! Debugger breakpoint opcodes.
//!
//! Every `BKPT` the debugger plants carries a tag in its immediate field:
//! the breakpoint table index, plus a flag marking the transient breakpoint
//! used for single-stepping. The all-ones index is reserved for breakpoints
//! compiled into the program (see the `breakpoint_*` intrinsics), which
//! have no table entry.
//!
//! | set   | base         | auto-step flag | index bits       | manual sentinel |
//! |-------|--------------|----------------|------------------|-----------------|
//! | ARM   | `0xE1200070` | `0x00080000`   | 18:8, 3:0 (15)   | `0xE127FF7F`    |
//! | Thumb | `0xBE00`     | `0x0080`       | 6:0 (7)          | `0xBE7F`        |

use super::Instruction;

/// Unconditional ARM `BKPT #0`.
pub const ARM_BKPT: u32 = 0xE120_0070;
/// Bits identifying an ARM `BKPT`.
pub const ARM_BKPT_MASK: u32 = 0xFFF0_00F0;
/// Immediate bits of an ARM `BKPT`.
const ARM_BKPT_IMM_MASK: u32 = 0x000F_FF0F;
/// Auto-step flag within an ARM `BKPT`.
pub const ARM_BKPT_AUTO: u32 = 0x0008_0000;
/// ARM `BKPT` emitted by the breakpoint intrinsic.
pub const ARM_BKPT_MANUAL: u32 = ARM_BKPT | 0x0007_FF0F;

/// Thumb `BKPT #0`.
pub const THUMB_BKPT: u16 = 0xBE00;
/// Bits identifying a Thumb `BKPT`.
pub const THUMB_BKPT_MASK: u16 = 0xFF00;
/// Auto-step flag within a Thumb `BKPT`.
pub const THUMB_BKPT_AUTO: u16 = 0x0080;
/// Thumb `BKPT` emitted by the breakpoint intrinsic.
pub const THUMB_BKPT_MANUAL: u16 = THUMB_BKPT | 0x007F;

const ARM_INDEX_MAX: u16 = 0x7FFF;
const THUMB_INDEX_MAX: u16 = 0x7F;

/// Largest table index that survives both encodings without colliding with
/// the manual sentinel.
pub const MAX_TABLE_INDEX: usize = THUMB_INDEX_MAX as usize - 1;

/// The tag carried by a debugger `BKPT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakpointTag {
    /// Breakpoint table index, or the manual sentinel.
    pub index: u16,
    /// Set on the transient single-step breakpoint.
    pub auto_step: bool,
}

impl BreakpointTag {
    /// Index reserved for compiled-in breakpoints in the given encoding.
    pub fn manual_index(instr: Instruction) -> u16 {
        match instr {
            Instruction::Arm(_) => ARM_INDEX_MAX,
            Instruction::Thumb(_) => THUMB_INDEX_MAX,
        }
    }
}

/// Build the `BKPT` that replaces `original`, in the same instruction set.
///
/// `index` is truncated to the width of the encoding's index field.
pub fn encode_breakpoint(original: Instruction, index: u16, auto_step: bool) -> Instruction {
    match original {
        Instruction::Arm(_) => {
            let mut imm = u32::from(index & ARM_INDEX_MAX);
            if auto_step {
                imm |= 0x8000;
            }
            Instruction::Arm(ARM_BKPT | ((imm & 0xFFF0) << 4) | (imm & 0xF))
        }
        Instruction::Thumb(_) => {
            let mut imm = index & THUMB_INDEX_MAX;
            if auto_step {
                imm |= THUMB_BKPT_AUTO;
            }
            Instruction::Thumb(THUMB_BKPT | imm)
        }
    }
}

/// Extract the tag from a `BKPT`, or `None` if `instr` is anything else.
pub fn decode_breakpoint(instr: Instruction) -> Option<BreakpointTag> {
    match instr {
        Instruction::Arm(i) => {
            if i & ARM_BKPT_MASK != ARM_BKPT {
                return None;
            }
            let imm = i & ARM_BKPT_IMM_MASK;
            let imm = ((imm >> 4) & 0xFFF0) | (imm & 0xF);
            Some(BreakpointTag {
                index: (imm as u16) & ARM_INDEX_MAX,
                auto_step: i & ARM_BKPT_AUTO != 0,
            })
        }
        Instruction::Thumb(i) => {
            if i & THUMB_BKPT_MASK != THUMB_BKPT {
                return None;
            }
            Some(BreakpointTag {
                index: i & THUMB_INDEX_MAX,
                auto_step: i & THUMB_BKPT_AUTO != 0,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOP_ARM: Instruction = Instruction::Arm(0xe1a0_0000);
    const NOP_THUMB: Instruction = Instruction::Thumb(0x46c0);

    #[test]
    fn bijection_arm() {
        for index in (0..ARM_INDEX_MAX).step_by(7).chain(Some(ARM_INDEX_MAX - 1)) {
            for &auto_step in &[false, true] {
                let bkpt = encode_breakpoint(NOP_ARM, index, auto_step);
                assert_eq!(bkpt.mode(), crate::arch::Mode::Arm);
                assert_eq!(
                    decode_breakpoint(bkpt),
                    Some(BreakpointTag { index, auto_step })
                );
            }
        }
    }

    #[test]
    fn bijection_thumb() {
        for index in 0..THUMB_INDEX_MAX {
            for &auto_step in &[false, true] {
                let bkpt = encode_breakpoint(NOP_THUMB, index, auto_step);
                assert_eq!(
                    decode_breakpoint(bkpt),
                    Some(BreakpointTag { index, auto_step })
                );
            }
        }
    }

    #[test]
    fn known_encodings() {
        assert_eq!(encode_breakpoint(NOP_ARM, 0, false), Instruction::Arm(ARM_BKPT));
        assert_eq!(
            encode_breakpoint(NOP_ARM, 0, true),
            Instruction::Arm(ARM_BKPT | ARM_BKPT_AUTO)
        );
        assert_eq!(
            encode_breakpoint(NOP_ARM, ARM_INDEX_MAX, false),
            Instruction::Arm(ARM_BKPT_MANUAL)
        );
        assert_eq!(
            encode_breakpoint(NOP_THUMB, THUMB_INDEX_MAX, false),
            Instruction::Thumb(THUMB_BKPT_MANUAL)
        );
        assert_eq!(ARM_BKPT_MANUAL, 0xE127_FF7F);
        assert_eq!(THUMB_BKPT_MANUAL, 0xBE7F);
    }

    #[test]
    fn manual_sentinels() {
        let tag = decode_breakpoint(Instruction::Arm(ARM_BKPT_MANUAL)).unwrap();
        assert_eq!(tag.index, BreakpointTag::manual_index(NOP_ARM));
        assert!(!tag.auto_step);

        let tag = decode_breakpoint(Instruction::Thumb(THUMB_BKPT_MANUAL)).unwrap();
        assert_eq!(tag.index, BreakpointTag::manual_index(NOP_THUMB));
    }

    #[test]
    fn not_a_breakpoint() {
        assert_eq!(decode_breakpoint(NOP_ARM), None);
        assert_eq!(decode_breakpoint(NOP_THUMB), None);
        // conditional BKPT is unpredictable, not ours
        assert_eq!(decode_breakpoint(Instruction::Arm(0x0120_0070)), None);
    }
}
