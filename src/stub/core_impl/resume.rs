use super::prelude::*;
use crate::stub::state_machine::ResumeAction;

impl<M: CodeMemory + ?Sized> EngineImpl<M> {
    pub(crate) fn handle_continue(
        &mut self,
        ctx: &mut DebuggerContext,
        mem: &mut M,
        addr: Option<u32>,
    ) -> Result<HandlerStatus, Error> {
        ctx.resume(mem, ResumeAction::Continue, addr)?;
        Ok(HandlerStatus::Resume)
    }

    pub(crate) fn handle_step(
        &mut self,
        ctx: &mut DebuggerContext,
        mem: &mut M,
        addr: Option<u32>,
    ) -> Result<HandlerStatus, Error> {
        ctx.resume(mem, ResumeAction::Step, addr)?;
        Ok(HandlerStatus::Resume)
    }

    pub(crate) fn handle_kill(
        &mut self,
        ctx: &mut DebuggerContext,
        mem: &mut M,
    ) -> Result<HandlerStatus, Error> {
        // there is no process to kill; run free of the debugger instead
        ctx.detach(mem);
        Ok(HandlerStatus::Resume)
    }

    pub(crate) fn handle_detach(
        &mut self,
        ctx: &mut DebuggerContext,
        mem: &mut M,
    ) -> Result<HandlerStatus, Error> {
        ctx.detach(mem);
        Ok(HandlerStatus::Detach)
    }
}
