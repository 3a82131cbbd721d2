use core::marker::PhantomData;

use crate::protocol::commands::Command;
use crate::stub::error::InternalError;
use crate::protocol::ResponseWriter;
use crate::stub::state_machine::DebuggerContext;
use crate::target::CodeMemory;

/// Common imports used by >50% of all handlers.
///
/// Do not clutter this prelude with types only used by a few handlers.
mod prelude {
    pub(super) use crate::protocol::ResponseWriter;
    pub(super) use crate::stub::core_impl::EngineImpl;
    pub(super) use crate::stub::core_impl::HandlerStatus;
    pub(super) use crate::stub::error::InternalError as Error;
    pub(super) use crate::stub::state_machine::DebuggerContext;
    pub(super) use crate::target::CodeMemory;
}

mod base;
mod breakpoints;
mod resume;

pub enum HandlerStatus {
    /// The handler wrote its own response.
    Handled,
    /// Reply `OK`.
    NeedsOk,
    /// Acknowledge with a lone `+` and let the program run.
    Resume,
    /// Reply `OK` and let the program run with the debugger detached.
    Detach,
}

pub(crate) struct EngineImpl<M: CodeMemory + ?Sized> {
    _mem: PhantomData<fn(&mut M)>,
}

impl<M: CodeMemory + ?Sized> EngineImpl<M> {
    pub fn new() -> EngineImpl<M> {
        EngineImpl { _mem: PhantomData }
    }

    pub fn handle_command(
        &mut self,
        res: &mut ResponseWriter<'_, '_>,
        ctx: &mut DebuggerContext,
        mem: &mut M,
        cmd: Command<'_>,
    ) -> Result<HandlerStatus, InternalError> {
        match cmd {
            Command::QuestionMark(_) => self.handle_stop_reason(res, ctx),
            Command::g(_) => self.handle_read_registers(res, ctx),
            Command::G(cmd) => self.handle_write_registers(ctx, cmd.vals),
            Command::p(cmd) => self.handle_read_register(res, ctx, cmd.reg_id),
            Command::P(cmd) => self.handle_write_register(ctx, cmd.reg_id, cmd.val),
            Command::m(cmd) => self.handle_read_memory(res, mem, cmd.addr, cmd.len),
            Command::M(cmd) => self.handle_write_memory(mem, cmd.addr, cmd.len, cmd.val),
            Command::Z(cmd) => self.handle_add_breakpoint(ctx, mem, cmd.0),
            Command::z(cmd) => self.handle_remove_breakpoint(ctx, mem, cmd.0),
            Command::c(cmd) => self.handle_continue(ctx, mem, cmd.addr),
            Command::s(cmd) => self.handle_step(ctx, mem, cmd.addr),
            Command::k(_) => self.handle_kill(ctx, mem),
            Command::D(_) => self.handle_detach(ctx, mem),
            Command::Unknown(body) => {
                warn!(
                    "unknown command: {}",
                    core::str::from_utf8(body).unwrap_or("<non-ascii>")
                );
                Err(InternalError::Reply(crate::Error::UnknownCommand))
            }
        }
    }
}
