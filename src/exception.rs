//! Exception vector glue for bare-metal ARM7TDMI targets.
//!
//! [`init`] points the undefined-instruction and prefetch-abort vectors at
//! trampolines which save the interrupted program's registers into a
//! [`TrapFrame`] on the exception stack, call the installed
//! [`TrapHandler`], and resume from the (possibly modified) frame.
//!
//! The interrupted program is expected to run in User or System mode: the
//! trampolines capture the User-bank `SP` and `LR`. The exception stacks must
//! be set up by the startup code before [`init`] is called.

use core::arch::{asm, global_asm};

use crate::stub::{TrapCause, TrapFrame, TrapHandler};
use crate::target::{CodeMemory, MemoryFault, RawMemory};

/// Undefined-instruction vector.
pub const UNDEFINED_VECTOR: u32 = 0x04;
/// Prefetch-abort vector.
pub const PREFETCH_ABORT_VECTOR: u32 = 0x0c;

static mut DEBUGGER: Option<&'static mut dyn TrapHandler> = None;

// Frame layout (18 words, lowest address first):
//   cause, spsr, r0-r12, sp_usr, lr_usr, exception lr
macro_rules! trap_trampoline {
    ($name:literal, $cause:expr) => {
        global_asm!(
            concat!(".section .text.", $name, ",\"ax\",%progbits"),
            ".arm",
            ".balign 4",
            concat!(".global ", $name),
            concat!($name, ":"),
            "sub   sp, sp, #64",
            "stmia sp, {{r0-r12}}",
            "add   r0, sp, #52",
            "stmia r0, {{r13, r14}}^",
            "nop",
            "str   lr, [sp, #60]",
            "mrs   r1, spsr",
            "mov   r0, #{cause}",
            "stmfd sp!, {{r0, r1}}",
            "mov   r0, sp",
            "ldr   r2, ={entry}",
            "mov   lr, pc",
            "bx    r2",
            "ldmfd sp!, {{r0, r1}}",
            "msr   spsr_cxsf, r1",
            "add   r0, sp, #52",
            "ldmia r0, {{r13, r14}}^",
            "nop",
            "ldr   lr, [sp, #60]",
            "ldmia sp, {{r0-r12}}",
            "add   sp, sp, #64",
            "movs  pc, lr",
            ".ltorg",
            cause = const $cause as u32,
            entry = sym armdebug_trap_entry,
        );
    };
}

trap_trampoline!("armdebug_undefined_trampoline", TrapCause::Undefined);
trap_trampoline!("armdebug_prefetch_abort_trampoline", TrapCause::PrefetchAbort);

extern "C" {
    fn armdebug_undefined_trampoline();
    fn armdebug_prefetch_abort_trampoline();
}

#[no_mangle]
unsafe extern "C" fn armdebug_trap_entry(frame: *mut TrapFrame) {
    // SAFETY: single core, and the trampolines are the only callers; traps do
    // not nest because the stub never executes a planted breakpoint.
    let debugger = &mut *core::ptr::addr_of_mut!(DEBUGGER);
    match debugger {
        Some(debugger) => debugger.handle_trap(&mut *frame),
        // without a debugger, execution continues after the trapping
        // instruction
        None => {}
    }
}

/// `B target` placed at `vector`, if in range.
fn branch_to(vector: u32, target: u32) -> Option<u32> {
    let offset = (target as i32).wrapping_sub(vector as i32 + 8);
    if offset & 3 != 0 || !(-(1 << 25)..(1 << 25)).contains(&offset) {
        return None;
    }
    Some(0xea00_0000 | ((offset >> 2) as u32 & 0x00ff_ffff))
}

fn install_vector<M: CodeMemory>(mem: &mut M, vector: u32, target: u32) -> Result<(), MemoryFault> {
    let instr = branch_to(vector, target).ok_or(MemoryFault { addr: vector })?;
    mem.write_u32(vector, instr)?;
    mem.sync_instruction(vector, 4);
    Ok(())
}

/// Install `debugger` and hook the exception vectors.
///
/// The vector table must be writable (e.g. remapped to RAM). Fails if a
/// trampoline is out of branch range of its vector.
pub fn init(debugger: &'static mut dyn TrapHandler) -> Result<(), MemoryFault> {
    debugger.init();

    // SAFETY: no trap can be in flight before the vectors point at us
    unsafe {
        *core::ptr::addr_of_mut!(DEBUGGER) = Some(debugger);
    }

    // SAFETY: only the two vector words are touched
    let mut mem = unsafe { RawMemory::new() };
    install_vector(
        &mut mem,
        UNDEFINED_VECTOR,
        armdebug_undefined_trampoline as usize as u32,
    )?;
    install_vector(
        &mut mem,
        PREFETCH_ABORT_VECTOR,
        armdebug_prefetch_abort_trampoline as usize as u32,
    )?;

    debug!("debugger installed");
    Ok(())
}

/// Halt in the debugger, as if a breakpoint had been set here (ARM code).
#[inline(never)]
#[instruction_set(arm::a32)]
pub fn breakpoint_arm() {
    // SAFETY: traps into the debugger, which resumes after the instruction
    unsafe { asm!(".inst 0xe127ff7f") }
}

/// Halt in the debugger, as if a breakpoint had been set here (Thumb code).
#[inline(never)]
#[instruction_set(arm::t32)]
pub fn breakpoint_thumb() {
    // SAFETY: traps into the debugger, which resumes after the instruction
    unsafe { asm!(".inst.n 0xbe7f") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_branch() {
        assert_eq!(branch_to(0x04, 0x0c), Some(0xea00_0000));
        assert_eq!(branch_to(0x0c, 0x0020_0000), Some(0xea07_fffb));
        assert_eq!(branch_to(0x04, 0x0400_0000), None);
    }
}
