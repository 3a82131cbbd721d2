use crate::arch::Mode;

/// Exception which entered the debugger.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum TrapCause {
    /// Undefined instruction exception (ARM7TDMI `BKPT` without a debug
    /// unit, or any undefined opcode).
    Undefined = 1,
    /// Prefetch abort (`BKPT` on cores which report it this way).
    PrefetchAbort = 2,
}

/// Register state pushed by the exception vector trampolines.
///
/// `regs[15]` holds the trap mode's `LR` on entry, and the address to
/// return to on exit. Every other register is the interrupted program's.
#[derive(Debug, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct TrapFrame {
    /// Raw [`TrapCause`] discriminant.
    pub cause: u32,
    /// The interrupted program's CPSR.
    pub spsr: u32,
    /// R0..R15.
    pub regs: [u32; 16],
}

impl TrapFrame {
    /// Build the frame the trampoline would push for a trap at `aborted`.
    ///
    /// `regs[15]` is ignored and replaced with the exception `LR`.
    pub fn new(cause: TrapCause, spsr: u32, mut regs: [u32; 16], aborted: u32) -> TrapFrame {
        let mut frame = TrapFrame {
            cause: cause as u32,
            spsr,
            regs,
        };
        regs[15] = aborted.wrapping_add(frame.lr_offset());
        frame.regs = regs;
        frame
    }

    /// Exception which pushed this frame. Unknown values are treated as
    /// undefined instruction traps.
    pub fn cause(&self) -> TrapCause {
        match self.cause {
            2 => TrapCause::PrefetchAbort,
            _ => TrapCause::Undefined,
        }
    }

    /// Instruction set of the interrupted program.
    pub fn mode(&self) -> Mode {
        Mode::from_cpsr(self.spsr)
    }

    fn lr_offset(&self) -> u32 {
        match (self.cause(), self.mode()) {
            (TrapCause::Undefined, Mode::Thumb) => 2,
            _ => 4,
        }
    }

    /// Address of the instruction which trapped.
    pub fn aborted_address(&self) -> u32 {
        self.regs[15].wrapping_sub(self.lr_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_address() {
        let arm = TrapFrame::new(TrapCause::Undefined, 0x1f, [0; 16], 0x1000);
        assert_eq!(arm.regs[15], 0x1004);
        assert_eq!(arm.aborted_address(), 0x1000);

        let thumb = TrapFrame::new(TrapCause::Undefined, 0x3f, [0; 16], 0x1002);
        assert_eq!(thumb.regs[15], 0x1004);
        assert_eq!(thumb.aborted_address(), 0x1002);

        let pabt = TrapFrame::new(TrapCause::PrefetchAbort, 0x3f, [0; 16], 0x1002);
        assert_eq!(pabt.regs[15], 0x1006);
        assert_eq!(pabt.aborted_address(), 0x1002);
    }
}
