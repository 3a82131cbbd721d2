use num_traits::PrimInt;

use super::InstrKind;
use super::InstrKind::*;

/// One row of a decode table.
#[derive(Debug, Clone, Copy)]
pub struct DecodeEntry<I> {
    /// Bits which must be set once masked.
    pub value: I,
    /// Bits which take part in the match.
    pub mask: I,
    /// Category of matching instructions.
    pub kind: InstrKind,
    /// Length in bytes.
    pub len: u8,
}

const fn arm(value: u32, mask: u32, kind: InstrKind) -> DecodeEntry<u32> {
    DecodeEntry {
        value,
        mask,
        kind,
        len: 4,
    }
}

const fn thumb(value: u16, mask: u16, kind: InstrKind) -> DecodeEntry<u16> {
    DecodeEntry {
        value,
        mask,
        kind,
        len: 2,
    }
}

/// ARMv4T decode table. The condition field is excluded from every mask
/// except `BKPT`'s, which must be unconditional. The media space
/// (`xxx0_011x_..._1xxx`) has no entry and decodes as undefined.
#[rustfmt::skip]
pub static ARM_DECODE_TABLE: [DecodeEntry<u32>; 20] = [
    arm(0xE120_0070, 0xFFF0_00F0, Breakpoint),
    arm(0x012F_FF10, 0x0FFF_FFF0, BranchExchange),
    arm(0x0000_0090, 0x0FC0_00F0, Linear),           // MUL, MLA
    arm(0x0080_0090, 0x0F80_00F0, Linear),           // UMULL, SMULL, ...
    arm(0x0100_0090, 0x0FB0_0FF0, Linear),           // SWP, SWPB
    arm(0x0000_0090, 0x0E00_0090, Linear),           // LDRH, STRH, LDRSB, LDRSH
    arm(0x010F_0000, 0x0FBF_0FFF, Linear),           // MRS
    arm(0x0120_F000, 0x0DB0_F000, Linear),           // MSR
    arm(0x0000_F000, 0x0C00_F000, DataProcessingPc),
    arm(0x0000_0000, 0x0C00_0000, Linear),           // data processing
    arm(0x0410_F000, 0x0E10_F000, LoadPc),           // LDR pc, [rn, #imm]
    arm(0x0610_F000, 0x0E10_F010, LoadPc),           // LDR pc, [rn, rm, shift]
    arm(0x0400_0000, 0x0E00_0000, Linear),           // LDR, STR immediate
    arm(0x0600_0000, 0x0E00_0010, Linear),           // LDR, STR register
    arm(0x0810_8000, 0x0E10_8000, LoadMultiplePc),
    arm(0x0800_0000, 0x0E00_0000, Linear),           // LDM, STM
    arm(0x0A00_0000, 0x0E00_0000, Branch),           // B, BL
    arm(0x0C00_0000, 0x0E00_0000, Linear),           // LDC, STC
    arm(0x0E00_0000, 0x0F00_0000, Linear),           // CDP, MRC, MCR
    arm(0x0F00_0000, 0x0F00_0000, SoftwareInterrupt),
];

/// ARMv4T Thumb decode table. `0xDE00` (undefined), `0xE800` (`BLX` suffix)
/// and the v5 hi-register `BLX` have no entry.
#[rustfmt::skip]
pub static THUMB_DECODE_TABLE: [DecodeEntry<u16>; 28] = [
    thumb(0xBE00, 0xFF00, Breakpoint),
    thumb(0xDF00, 0xFF00, SoftwareInterrupt),
    thumb(0xD000, 0xF800, ConditionalBranch),        // BEQ..BVC
    thumb(0xD800, 0xFC00, ConditionalBranch),        // BHI..BLT
    thumb(0xDC00, 0xFE00, ConditionalBranch),        // BGT, BLE
    thumb(0x4700, 0xFF80, BranchExchange),
    thumb(0x4487, 0xFF87, HiRegisterPc),             // ADD pc, rm
    thumb(0x4687, 0xFF87, HiRegisterPc),             // MOV pc, rm
    thumb(0xBD00, 0xFF00, PopPc),
    thumb(0xE000, 0xF800, Branch),
    DecodeEntry { value: 0xF000, mask: 0xF800, kind: LongBranchLink, len: 4 },
    thumb(0xF800, 0xF800, LongBranchLinkSuffix),
    thumb(0x0000, 0xE000, Linear),                   // LSL, LSR, ASR, ADD, SUB
    thumb(0x2000, 0xE000, Linear),                   // MOV, CMP, ADD, SUB immediate
    thumb(0x4000, 0xFC00, Linear),                   // ALU operations
    thumb(0x4400, 0xFF00, Linear),                   // ADD hi
    thumb(0x4500, 0xFF00, Linear),                   // CMP hi
    thumb(0x4600, 0xFF00, Linear),                   // MOV hi
    thumb(0x4800, 0xF800, Linear),                   // LDR pc-relative
    thumb(0x5000, 0xF000, Linear),                   // load/store register offset
    thumb(0x6000, 0xE000, Linear),                   // load/store immediate offset
    thumb(0x8000, 0xF000, Linear),                   // LDRH, STRH
    thumb(0x9000, 0xF000, Linear),                   // SP-relative load/store
    thumb(0xA000, 0xF000, Linear),                   // ADD rd, pc/sp
    thumb(0xB000, 0xFF00, Linear),                   // ADD sp, #imm
    thumb(0xB400, 0xFE00, Linear),                   // PUSH
    thumb(0xBC00, 0xFF00, Linear),                   // POP
    thumb(0xC000, 0xF000, Linear),                   // LDMIA, STMIA
];

pub(super) fn lookup<I: PrimInt>(table: &[DecodeEntry<I>], instr: I) -> Option<&DecodeEntry<I>> {
    table.iter().find(|e| instr & e.mask == e.value)
}
