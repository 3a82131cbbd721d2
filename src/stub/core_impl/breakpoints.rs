use super::prelude::*;
use crate::arch::Mode;
use crate::protocol::commands::breakpoint::BasicBreakpoint;

impl<M: CodeMemory + ?Sized> EngineImpl<M> {
    /// Validate a `Z`/`z` packet, returning the instruction set named by its
    /// `kind`.
    fn sw_breakpoint_mode(cmd: &BasicBreakpoint) -> Result<Mode, Error> {
        match cmd.type_ {
            0 => {}
            // hardware breakpoints and watchpoints
            1..=4 => return Err(Error::Reply(crate::Error::NotImplemented)),
            other => {
                warn!("unknown breakpoint type: {}", other);
                return Err(Error::Reply(crate::Error::UnknownParameter));
            }
        }

        match cmd.kind {
            2 => Ok(Mode::Thumb),
            4 => Ok(Mode::Arm),
            _ => Err(Error::Reply(crate::Error::UnknownParameter)),
        }
    }

    pub(crate) fn handle_add_breakpoint(
        &mut self,
        ctx: &mut DebuggerContext,
        mem: &mut M,
        cmd: BasicBreakpoint,
    ) -> Result<HandlerStatus, Error> {
        let mode = Self::sw_breakpoint_mode(&cmd)?;
        let index = ctx.breakpoints_mut().insert(mem, cmd.addr, mode)?;
        debug!("breakpoint {} set at {:#010x}", index, cmd.addr);
        Ok(HandlerStatus::NeedsOk)
    }

    pub(crate) fn handle_remove_breakpoint(
        &mut self,
        ctx: &mut DebuggerContext,
        mem: &mut M,
        cmd: BasicBreakpoint,
    ) -> Result<HandlerStatus, Error> {
        Self::sw_breakpoint_mode(&cmd)?;
        let index = ctx
            .breakpoints()
            .resolve(cmd.addr)
            .ok_or(crate::Error::InvalidIndex)?;
        ctx.breakpoints_mut().remove(mem, index)?;
        debug!("breakpoint {} at {:#010x} removed", index, cmd.addr);
        Ok(HandlerStatus::NeedsOk)
    }
}
