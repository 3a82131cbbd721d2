/// ARM7TDMI core register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegId {
    /// General purpose registers (R0-R12)
    Gpr(u8),
    /// Stack Pointer (R13)
    Sp,
    /// Link Register (R14)
    Lr,
    /// Program Counter (R15)
    Pc,
    /// Current Program Status Register (cpsr)
    Cpsr,
}

impl RegId {
    /// Map a GDB register number (as used by `p`/`P`) to a register.
    ///
    /// Follows the legacy ARM core numbering: the FPA registers 16-24 exist in
    /// GDB's numbering but not on this core.
    pub fn from_raw_id(id: usize) -> Option<RegId> {
        match id {
            0..=15 => Some(RegId::from_number(id as u8)),
            25 => Some(RegId::Cpsr),
            _ => None,
        }
    }

    /// Register `Rn` for `n` in 0..=15. Only the low nibble of `n` is used.
    pub fn from_number(n: u8) -> RegId {
        match n & 0xf {
            13 => RegId::Sp,
            14 => RegId::Lr,
            15 => RegId::Pc,
            n => RegId::Gpr(n),
        }
    }

    /// Register number in R0..=R15, or `None` for CPSR.
    pub fn number(self) -> Option<u8> {
        match self {
            RegId::Gpr(n) => Some(n),
            RegId::Sp => Some(13),
            RegId::Lr => Some(14),
            RegId::Pc => Some(15),
            RegId::Cpsr => None,
        }
    }
}
