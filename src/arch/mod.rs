//! ARM7TDMI (ARMv4T) architecture definitions: instruction sets, the program
//! status register flags, and condition code evaluation.

mod reg;

pub use self::reg::RegId;

/// Instruction set the core is executing in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// 32-bit ARM instructions.
    Arm,
    /// 16-bit Thumb instructions.
    Thumb,
}

impl Mode {
    /// Instruction set selected by a CPSR/SPSR value.
    pub fn from_cpsr(cpsr: u32) -> Mode {
        if Cpsr::from_bits_retain(cpsr).contains(Cpsr::THUMB) {
            Mode::Thumb
        } else {
            Mode::Arm
        }
    }

    /// Instruction set selected by bit 0 of a `BX` target address.
    pub fn from_interwork_addr(addr: u32) -> Mode {
        if addr & 1 != 0 {
            Mode::Thumb
        } else {
            Mode::Arm
        }
    }

    /// Size of one instruction (Thumb `BL` pairs count as two).
    pub fn instr_size(self) -> u32 {
        match self {
            Mode::Arm => 4,
            Mode::Thumb => 2,
        }
    }

    /// Value read from `PC` by an instruction at `addr`.
    pub fn pc_read_value(self, addr: u32) -> u32 {
        addr.wrapping_add(self.instr_size() * 2)
    }
}

bitflags::bitflags! {
    /// Current/Saved Program Status Register.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Cpsr: u32 {
        /// Negative.
        const N = 1 << 31;
        /// Zero.
        const Z = 1 << 30;
        /// Carry / not borrow.
        const C = 1 << 29;
        /// Overflow.
        const V = 1 << 28;
        /// Thumb state.
        const THUMB = 1 << 5;
    }
}

/// Evaluate a 4-bit condition field against the NZCV flags of `cpsr`.
pub fn condition_passed(cond: u32, cpsr: u32) -> bool {
    let flags = Cpsr::from_bits_retain(cpsr);
    let n = flags.contains(Cpsr::N);
    let z = flags.contains(Cpsr::Z);
    let c = flags.contains(Cpsr::C);
    let v = flags.contains(Cpsr::V);

    match cond & 0xf {
        0x0 => z,
        0x1 => !z,
        0x2 => c,
        0x3 => !c,
        0x4 => n,
        0x5 => !n,
        0x6 => v,
        0x7 => !v,
        0x8 => c && !z,
        0x9 => !c || z,
        0xa => n == v,
        0xb => n != v,
        0xc => !z && n == v,
        0xd => z || n != v,
        // AL, and the ARMv4 "never" encoding which later became unconditional space
        0xe => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_cpsr() {
        assert_eq!(Mode::from_cpsr(0x6000_001f), Mode::Arm);
        assert_eq!(Mode::from_cpsr(0x6000_003f), Mode::Thumb);
    }

    #[test]
    fn conditions() {
        let z = Cpsr::Z.bits();
        let nv = (Cpsr::N | Cpsr::V).bits();

        assert!(condition_passed(0x0, z)); // EQ
        assert!(!condition_passed(0x1, z)); // NE
        assert!(condition_passed(0xa, nv)); // GE
        assert!(!condition_passed(0xb, nv)); // LT
        assert!(!condition_passed(0xc, z | nv)); // GT
        assert!(condition_passed(0xe, 0)); // AL
    }
}
