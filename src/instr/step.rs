//! Successor computation for single-step.
//!
//! Given the halted register file, work out which instruction the core will
//! execute after the one at `addr`, so that a transient breakpoint can be
//! planted there.

use super::{decode, DecodeError, InstrKind, Instruction};
use crate::arch::{condition_passed, Cpsr, Mode, RegId};
use crate::context::ContextStack;
use crate::target::CodeMemory;

/// Address and instruction set of the instruction executed after the one at
/// `addr`.
pub fn next_instruction<M: CodeMemory + ?Sized>(
    mem: &mut M,
    regs: &ContextStack,
    addr: u32,
    mode: Mode,
) -> Result<(u32, Mode), DecodeError> {
    let decoded = decode(mem, addr, mode)?;
    let fallthrough = (addr.wrapping_add(u32::from(decoded.len)), mode);

    if !decoded.is_branch_or_special() {
        return Ok(fallthrough);
    }

    let cpu = Cpu { regs, addr, mode };
    match Instruction::read(mem, addr, mode)? {
        Instruction::Arm(instr) => {
            if !condition_passed(instr >> 28, regs.cpsr()) {
                return Ok(fallthrough);
            }
            cpu.arm_target(mem, decoded.kind, instr, fallthrough)
        }
        Instruction::Thumb(instr) => cpu.thumb_target(mem, decoded.kind, instr, fallthrough),
    }
}

struct Cpu<'a> {
    regs: &'a ContextStack,
    addr: u32,
    mode: Mode,
}

impl Cpu<'_> {
    /// Register value as seen by the instruction at `self.addr`.
    fn reg(&self, n: u32) -> u32 {
        match RegId::from_number(n as u8) {
            RegId::Pc => self.mode.pc_read_value(self.addr),
            id => self.regs.reg(id),
        }
    }

    fn carry(&self) -> bool {
        Cpsr::from_bits_retain(self.regs.cpsr()).contains(Cpsr::C)
    }

    fn arm_target<M: CodeMemory + ?Sized>(
        &self,
        mem: &mut M,
        kind: InstrKind,
        instr: u32,
        fallthrough: (u32, Mode),
    ) -> Result<(u32, Mode), DecodeError> {
        let target = match kind {
            InstrKind::Branch => {
                let offset = sign_extend(instr & 0x00FF_FFFF, 24) << 2;
                self.reg(15).wrapping_add(offset)
            }
            InstrKind::BranchExchange => {
                let dest = self.reg(instr & 0xf);
                let mode = Mode::from_interwork_addr(dest);
                return Ok((align(dest, mode), mode));
            }
            InstrKind::DataProcessingPc => match self.data_processing(instr) {
                Some(result) => result,
                None => return Ok(fallthrough),
            },
            InstrKind::LoadPc => {
                let base = self.reg((instr >> 16) & 0xf);
                let offset = if instr & (1 << 25) == 0 {
                    instr & 0xfff
                } else {
                    let rm = self.reg(instr & 0xf);
                    shift_imm(rm, (instr >> 5) & 3, (instr >> 7) & 0x1f, self.carry())
                };
                let up = instr & (1 << 23) != 0;
                let pre = instr & (1 << 24) != 0;
                let ea = match (pre, up) {
                    (false, _) => base,
                    (true, true) => base.wrapping_add(offset),
                    (true, false) => base.wrapping_sub(offset),
                };
                if instr & (1 << 22) != 0 {
                    // LDRB pc is unpredictable
                    return Err(DecodeError::Undefined(Instruction::Arm(instr)));
                }
                let word = mem.read_u32(ea & !3)?;
                word.rotate_right((ea & 3) * 8)
            }
            InstrKind::LoadMultiplePc => {
                let base = self.reg((instr >> 16) & 0xf);
                let count = (instr & 0xffff).count_ones();
                let up = instr & (1 << 23) != 0;
                let pre = instr & (1 << 24) != 0;
                let lowest = match (pre, up) {
                    (false, true) => base,
                    (true, true) => base.wrapping_add(4),
                    (false, false) => base.wrapping_sub(4 * count).wrapping_add(4),
                    (true, false) => base.wrapping_sub(4 * count),
                };
                // pc is the highest-numbered register, so the last word loaded
                mem.read_u32(lowest.wrapping_add(4 * (count - 1)))?
            }
            InstrKind::SoftwareInterrupt | InstrKind::Breakpoint | InstrKind::Linear => {
                return Ok(fallthrough)
            }
            _ => return Err(DecodeError::Undefined(Instruction::Arm(instr))),
        };

        Ok((align(target, Mode::Arm), Mode::Arm))
    }

    /// Result written to PC by a data processing instruction, or `None` for
    /// the compare-only opcodes.
    fn data_processing(&self, instr: u32) -> Option<u32> {
        let reg_shift = instr & (1 << 25) == 0 && instr & (1 << 4) != 0;
        // a register-specified shift delays the PC read by one cycle
        let read = |n: u32| {
            let val = self.reg(n);
            if n == 15 && reg_shift {
                val.wrapping_add(4)
            } else {
                val
            }
        };

        let carry = self.carry();
        let op2 = if instr & (1 << 25) != 0 {
            (instr & 0xff).rotate_right(((instr >> 8) & 0xf) * 2)
        } else {
            let rm = read(instr & 0xf);
            let kind = (instr >> 5) & 3;
            if reg_shift {
                let amount = self.reg((instr >> 8) & 0xf) & 0xff;
                shift_reg(rm, kind, amount)
            } else {
                shift_imm(rm, kind, (instr >> 7) & 0x1f, carry)
            }
        };
        let rn = read((instr >> 16) & 0xf);
        let c = carry as u32;

        let result = match (instr >> 21) & 0xf {
            0x0 => rn & op2,
            0x1 => rn ^ op2,
            0x2 => rn.wrapping_sub(op2),
            0x3 => op2.wrapping_sub(rn),
            0x4 => rn.wrapping_add(op2),
            0x5 => rn.wrapping_add(op2).wrapping_add(c),
            0x6 => rn.wrapping_sub(op2).wrapping_sub(1 - c),
            0x7 => op2.wrapping_sub(rn).wrapping_sub(1 - c),
            0x8..=0xb => return None,
            0xc => rn | op2,
            0xd => op2,
            0xe => rn & !op2,
            _ => !op2,
        };
        Some(result)
    }

    fn thumb_target<M: CodeMemory + ?Sized>(
        &self,
        mem: &mut M,
        kind: InstrKind,
        instr: u16,
        fallthrough: (u32, Mode),
    ) -> Result<(u32, Mode), DecodeError> {
        let instr32 = u32::from(instr);
        let target = match kind {
            InstrKind::ConditionalBranch => {
                if !condition_passed(instr32 >> 8, self.regs.cpsr()) {
                    return Ok(fallthrough);
                }
                let offset = sign_extend(instr32 & 0xff, 8) << 1;
                self.reg(15).wrapping_add(offset)
            }
            InstrKind::Branch => {
                let offset = sign_extend(instr32 & 0x7ff, 11) << 1;
                self.reg(15).wrapping_add(offset)
            }
            InstrKind::LongBranchLink => {
                let suffix = u32::from(mem.read_u16(self.addr.wrapping_add(2))?);
                let hi = sign_extend(instr32 & 0x7ff, 11) << 12;
                let lo = (suffix & 0x7ff) << 1;
                self.reg(15).wrapping_add(hi).wrapping_add(lo)
            }
            InstrKind::LongBranchLinkSuffix => {
                let lr = self.reg(14);
                lr.wrapping_add((instr32 & 0x7ff) << 1)
            }
            InstrKind::BranchExchange => {
                let dest = self.reg((instr32 >> 3) & 0xf);
                let mode = Mode::from_interwork_addr(dest);
                return Ok((align(dest, mode), mode));
            }
            InstrKind::HiRegisterPc => {
                let rm = self.reg((instr32 >> 3) & 0xf);
                if instr & 0xff00 == 0x4400 {
                    self.reg(15).wrapping_add(rm)
                } else {
                    rm
                }
            }
            InstrKind::PopPc => {
                let sp = self.reg(13);
                let count = (instr32 & 0xff).count_ones();
                mem.read_u32(sp.wrapping_add(4 * count))?
            }
            InstrKind::SoftwareInterrupt | InstrKind::Breakpoint | InstrKind::Linear => {
                return Ok(fallthrough)
            }
            _ => return Err(DecodeError::Undefined(Instruction::Thumb(instr))),
        };

        Ok((align(target, Mode::Thumb), Mode::Thumb))
    }
}

fn align(addr: u32, mode: Mode) -> u32 {
    match mode {
        Mode::Arm => addr & !3,
        Mode::Thumb => addr & !1,
    }
}

fn sign_extend(val: u32, bits: u32) -> u32 {
    let shift = 32 - bits;
    (((val << shift) as i32) >> shift) as u32
}

/// Barrel shifter, immediate shift amount.
fn shift_imm(val: u32, kind: u32, amount: u32, carry: bool) -> u32 {
    match (kind, amount) {
        (0, n) => val << n,
        (1, 0) => 0,
        (1, n) => val >> n,
        (2, 0) => ((val as i32) >> 31) as u32,
        (2, n) => ((val as i32) >> n) as u32,
        (_, 0) => ((carry as u32) << 31) | (val >> 1),
        (_, n) => val.rotate_right(n),
    }
}

/// Barrel shifter, shift amount taken from the bottom byte of a register.
/// Unlike [`shift_imm`] there is no RRX form: `ROR` by a multiple of 32 is a
/// no-op.
fn shift_reg(val: u32, kind: u32, amount: u32) -> u32 {
    if amount == 0 {
        return val;
    }
    match kind {
        0 => val.checked_shl(amount).unwrap_or(0),
        1 => val.checked_shr(amount).unwrap_or(0),
        2 => ((val as i32) >> amount.min(31)) as u32,
        _ => val.rotate_right(amount & 31),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::MemoryRegion;

    const BASE: u32 = 0x1000;

    struct Fixture {
        mem: [u8; 0x100],
        regs: ContextStack,
    }

    impl Fixture {
        fn new(cpsr: u32) -> Fixture {
            let mut regs = ContextStack::new();
            regs.set_reg(RegId::Cpsr, cpsr);
            regs.set_reg(RegId::Sp, BASE + 0x80);
            Fixture {
                mem: [0; 0x100],
                regs,
            }
        }

        fn arm(&mut self, offset: u32, instr: u32) {
            let o = offset as usize;
            self.mem[o..o + 4].copy_from_slice(&instr.to_le_bytes());
        }

        fn thumb(&mut self, offset: u32, instr: u16) {
            let o = offset as usize;
            self.mem[o..o + 2].copy_from_slice(&instr.to_le_bytes());
        }

        fn next(&mut self, offset: u32, mode: Mode) -> Result<(u32, Mode), DecodeError> {
            let mut mem = MemoryRegion::new(BASE, &mut self.mem[..]);
            next_instruction(&mut mem, &self.regs, BASE + offset, mode)
        }
    }

    const ARM_MODE: u32 = 0x1f;
    const THUMB_MODE: u32 = 0x3f;

    #[test]
    fn arm_linear() {
        let mut f = Fixture::new(ARM_MODE);
        f.arm(0, 0xe1a0_0000); // mov r0, r0
        assert_eq!(f.next(0, Mode::Arm), Ok((BASE + 4, Mode::Arm)));
    }

    #[test]
    fn arm_branch() {
        let mut f = Fixture::new(ARM_MODE);
        f.arm(0, 0xeaff_fffe); // b .
        assert_eq!(f.next(0, Mode::Arm), Ok((BASE, Mode::Arm)));

        f.arm(4, 0xeb00_0002); // bl +8 from pc
        assert_eq!(f.next(4, Mode::Arm), Ok((BASE + 4 + 8 + 8, Mode::Arm)));
    }

    #[test]
    fn arm_condition_not_taken() {
        let mut f = Fixture::new(ARM_MODE); // Z clear
        f.arm(0, 0x0a00_0010); // beq
        assert_eq!(f.next(0, Mode::Arm), Ok((BASE + 4, Mode::Arm)));

        let mut f = Fixture::new(ARM_MODE | Cpsr::Z.bits());
        f.arm(0, 0x0a00_0010);
        assert_eq!(f.next(0, Mode::Arm), Ok((BASE + 8 + 0x40, Mode::Arm)));
    }

    #[test]
    fn arm_bx_to_thumb() {
        let mut f = Fixture::new(ARM_MODE);
        f.regs.set_reg(RegId::Lr, 0x2001);
        f.arm(0, 0xe12f_ff1e); // bx lr
        assert_eq!(f.next(0, Mode::Arm), Ok((0x2000, Mode::Thumb)));
    }

    #[test]
    fn arm_data_processing_pc() {
        let mut f = Fixture::new(ARM_MODE);
        f.regs.set_reg(RegId::Lr, 0x3000);
        f.arm(0, 0xe1a0_f00e); // mov pc, lr
        assert_eq!(f.next(0, Mode::Arm), Ok((0x3000, Mode::Arm)));

        f.regs.set_reg(RegId::Gpr(0), 2);
        f.arm(4, 0xe08f_f100); // add pc, pc, r0, lsl #2
        assert_eq!(f.next(4, Mode::Arm), Ok((BASE + 4 + 8 + 8, Mode::Arm)));

        f.arm(8, 0xe15f_f000); // cmp pc, r0 (writes no register)
        assert_eq!(f.next(8, Mode::Arm), Ok((BASE + 12, Mode::Arm)));
    }

    #[test]
    fn arm_load_pc() {
        let mut f = Fixture::new(ARM_MODE);
        f.arm(0, 0xe59f_f018); // ldr pc, [pc, #24]
        f.arm(0x20, 0x0000_4000);
        assert_eq!(f.next(0, Mode::Arm), Ok((0x4000, Mode::Arm)));
    }

    #[test]
    fn arm_pop_pc() {
        let mut f = Fixture::new(ARM_MODE);
        f.arm(0, 0xe8bd_8010); // ldmia sp!, {r4, pc}
        f.arm(0x84, 0x0000_5000);
        assert_eq!(f.next(0, Mode::Arm), Ok((0x5000, Mode::Arm)));
    }

    #[test]
    fn arm_swi_is_stepped_over() {
        let mut f = Fixture::new(ARM_MODE);
        f.arm(0, 0xef00_0000);
        assert_eq!(f.next(0, Mode::Arm), Ok((BASE + 4, Mode::Arm)));
    }

    #[test]
    fn arm_undefined() {
        let mut f = Fixture::new(ARM_MODE);
        f.arm(0, 0xe600_0010);
        assert!(f.next(0, Mode::Arm).is_err());
    }

    #[test]
    fn thumb_branches() {
        let mut f = Fixture::new(THUMB_MODE);
        f.thumb(0, 0xe7fe); // b .
        assert_eq!(f.next(0, Mode::Thumb), Ok((BASE, Mode::Thumb)));

        f.thumb(2, 0xd0fe); // beq . (Z clear: not taken)
        assert_eq!(f.next(2, Mode::Thumb), Ok((BASE + 4, Mode::Thumb)));

        f.thumb(4, 0xd1fe); // bne . (taken)
        assert_eq!(f.next(4, Mode::Thumb), Ok((BASE + 4, Mode::Thumb)));
    }

    #[test]
    fn thumb_bl_pair() {
        let mut f = Fixture::new(THUMB_MODE);
        f.thumb(0, 0xf000); // bl +0x10
        f.thumb(2, 0xf808);
        assert_eq!(f.next(0, Mode::Thumb), Ok((BASE + 4 + 0x10, Mode::Thumb)));
    }

    #[test]
    fn thumb_bx_and_pop() {
        let mut f = Fixture::new(THUMB_MODE);
        f.regs.set_reg(RegId::Lr, 0x6000);
        f.thumb(0, 0x4770); // bx lr
        assert_eq!(f.next(0, Mode::Thumb), Ok((0x6000, Mode::Arm)));

        f.thumb(2, 0xbd10); // pop {r4, pc}
        f.arm(0x84, 0x0000_7001);
        assert_eq!(f.next(2, Mode::Thumb), Ok((0x7000, Mode::Thumb)));

        f.thumb(4, 0x46f7); // mov pc, lr
        assert_eq!(f.next(4, Mode::Thumb), Ok((0x6000, Mode::Thumb)));
    }

    #[test]
    fn shifter() {
        assert_eq!(shift_imm(0x8000_0000, 1, 0, false), 0);
        assert_eq!(shift_imm(0x8000_0000, 2, 0, false), 0xffff_ffff);
        assert_eq!(shift_imm(0x2, 3, 0, true), 0x8000_0001);
        assert_eq!(shift_reg(1, 0, 32), 0);
        assert_eq!(shift_reg(0x8000_0000, 2, 40), 0xffff_ffff);
        assert_eq!(shift_reg(0x2, 3, 32), 0x2);
        assert_eq!(shift_reg(0x2, 3, 33), 0x1);
    }
}
