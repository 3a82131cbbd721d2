//! The debugger's lifecycle.
//!
//! ```text
//!            init()
//!   Reset ────────────► Init ◄──────────────────────────┐
//!                        │                              │ resume
//!        BKPT (manual)   │   BKPT (auto-step)           │ (c / s / k / D)
//!        ┌───────────────┴───────────────┐              │
//!        ▼                               ▼              │
//!   ManualBreak{Arm,Thumb}      NormalBreak{Arm,Thumb} ─┘
//! ```
//!
//! Every transition happens inside the trap handler, while the program is
//! halted, through `&mut DebuggerContext`.

use crate::arch::{Mode, RegId};
use crate::breakpoint::{BreakpointTable, AUTO_STEP_SLOT};
use crate::common::Signal;
use crate::context::ContextStack;
use crate::instr::{decode_breakpoint, next_instruction, BreakpointTag, Instruction};
use crate::stub::TrapFrame;
use crate::target::CodeMemory;
use crate::Error;

/// Debugger lifecycle state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DebuggerState {
    /// Not initialized. Traps are not expected.
    Reset,
    /// Armed; the program is running (or about to resume).
    Init,
    /// Halted on a user or compiled-in breakpoint in ARM code.
    ManualBreakArm,
    /// Halted after a single-step in ARM code.
    NormalBreakArm,
    /// Halted on a user or compiled-in breakpoint in Thumb code.
    ManualBreakThumb,
    /// Halted after a single-step in Thumb code.
    NormalBreakThumb,
}

impl Default for DebuggerState {
    fn default() -> Self {
        DebuggerState::Reset
    }
}

impl DebuggerState {
    fn manual(mode: Mode) -> Self {
        match mode {
            Mode::Arm => DebuggerState::ManualBreakArm,
            Mode::Thumb => DebuggerState::ManualBreakThumb,
        }
    }

    fn normal(mode: Mode) -> Self {
        match mode {
            Mode::Arm => DebuggerState::NormalBreakArm,
            Mode::Thumb => DebuggerState::NormalBreakThumb,
        }
    }

    /// Whether the program is halted at a breakpoint.
    pub fn is_halted(self) -> bool {
        !matches!(self, DebuggerState::Reset | DebuggerState::Init)
    }

    /// Signal reported by `?`.
    pub fn signal(self) -> Signal {
        if self.is_halted() {
            Signal::SIGTRAP
        } else {
            Signal::SIGZERO
        }
    }
}

/// How the host asked the program to resume.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ResumeAction {
    /// Run until the next breakpoint.
    Continue,
    /// Execute one instruction.
    Step,
}

/// What to tell the host when a trap halts the program.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StopReport {
    /// `Snn`.
    Signal(Signal),
    /// `Enn`: the trap could not be attributed to a debugger breakpoint.
    Error(Error),
}

/// Outcome of classifying a trap.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrapOutcome {
    /// The program was halted. Serve the host, starting with this report.
    Halted(StopReport),
    /// An internal auto-step completed a continue; return to the program
    /// without involving the host.
    Resume,
}

/// All mutable debugger state: lifecycle, breakpoints, and saved registers.
#[derive(Debug, Default)]
pub struct DebuggerContext {
    state: DebuggerState,
    breakpoints: BreakpointTable,
    regs: ContextStack,
    /// Table breakpoint the program last halted on.
    current: Option<usize>,
    /// Breakpoint disarmed to continue past it, re-armed on the next trap.
    rearm: Option<usize>,
    /// The resume command which let the program run.
    pending: Option<ResumeAction>,
}

impl DebuggerContext {
    /// A context in the [`Reset`](DebuggerState::Reset) state.
    pub fn new() -> DebuggerContext {
        DebuggerContext::default()
    }

    /// Current state.
    pub fn state(&self) -> DebuggerState {
        self.state
    }

    /// Saved registers.
    pub fn regs(&self) -> &ContextStack {
        &self.regs
    }

    /// Saved registers, for `G`/`P`.
    pub fn regs_mut(&mut self) -> &mut ContextStack {
        &mut self.regs
    }

    /// Breakpoint table.
    pub fn breakpoints(&self) -> &BreakpointTable {
        &self.breakpoints
    }

    /// Breakpoint table, for `Z`/`z`.
    pub fn breakpoints_mut(&mut self) -> &mut BreakpointTable {
        &mut self.breakpoints
    }

    /// Index of the table breakpoint the program last halted on.
    pub fn current_breakpoint(&self) -> Option<usize> {
        self.current
    }

    fn transition(&mut self, next: DebuggerState) {
        if self.state != next {
            debug!("state transition: {:?} -> {:?}", self.state, next);
        }
        self.state = next;
    }

    /// (Re-)initialize: remove every breakpoint and enter
    /// [`Init`](DebuggerState::Init).
    pub fn init<M: CodeMemory + ?Sized>(&mut self, mem: &mut M) {
        self.breakpoints.clear(mem);
        self.current = None;
        self.rearm = None;
        self.pending = None;
        self.transition(DebuggerState::Init);
    }

    /// Classify a trap and update state accordingly.
    ///
    /// Saves the register file from `frame` first. A trap that is not a
    /// debugger `BKPT` is reported as [`Error::FormatError`] and leaves the
    /// state unchanged.
    pub fn enter_trap<M: CodeMemory + ?Sized>(&mut self, mem: &mut M, frame: &TrapFrame) -> TrapOutcome {
        self.regs.save(frame);
        let addr = self.regs.aborted_address();
        let mode = frame.mode();

        if let Some(index) = self.rearm.take() {
            if let Err(e) = self.breakpoints.rearm(mem, index) {
                warn!("could not re-arm breakpoint {}: {}", index, e);
            }
        }
        let pending = self.pending.take();

        let instr = Instruction::read(mem, addr, mode);
        let is_auto_step = matches!(instr.map(decode_breakpoint), Ok(Some(tag)) if tag.auto_step);
        if !is_auto_step && self.breakpoints.get(AUTO_STEP_SLOT).is_some() {
            // something else trapped before the step completed
            if let Err(e) = self.breakpoints.remove(mem, AUTO_STEP_SLOT) {
                warn!("could not remove stale auto-step breakpoint: {}", e);
            }
        }

        let instr = match instr {
            Ok(instr) => instr,
            Err(e) => {
                warn!("trap at unreadable address: {}", e);
                return TrapOutcome::Halted(StopReport::Error(Error::FormatError));
            }
        };

        match decode_breakpoint(instr) {
            Some(BreakpointTag { auto_step: true, .. }) => {
                match self.breakpoints.get(AUTO_STEP_SLOT) {
                    Some(entry) if entry.address() == addr => {}
                    _ => return self.unrecognized(instr, addr),
                }
                if let Err(e) = self.breakpoints.remove(mem, AUTO_STEP_SLOT) {
                    warn!("could not remove auto-step breakpoint: {}", e);
                }

                self.current = self.breakpoints.resolve(addr);
                self.transition(DebuggerState::normal(mode));

                if pending == Some(ResumeAction::Continue) {
                    trace!("stepped past breakpoint, continuing");
                    self.current = None;
                    self.transition(DebuggerState::Init);
                    TrapOutcome::Resume
                } else {
                    TrapOutcome::Halted(StopReport::Signal(Signal::SIGTRAP))
                }
            }
            Some(tag) if tag.index == BreakpointTag::manual_index(instr) => {
                debug!("compiled-in breakpoint at {:#010x}", addr);
                // the intrinsic has no original instruction to run
                self.regs.set_reg(RegId::Pc, addr.wrapping_add(instr.size() as u32));
                self.current = None;
                self.transition(DebuggerState::manual(mode));
                TrapOutcome::Halted(StopReport::Signal(Signal::SIGTRAP))
            }
            Some(tag) => {
                let index = match self.breakpoints.get(usize::from(tag.index)) {
                    Some(entry) if !entry.auto_step && entry.address() == addr => {
                        Some(usize::from(tag.index))
                    }
                    _ => self.breakpoints.resolve(addr),
                };
                match index {
                    Some(index) => {
                        debug!("breakpoint {} hit at {:#010x}", index, addr);
                        self.current = Some(index);
                        self.transition(DebuggerState::manual(mode));
                        TrapOutcome::Halted(StopReport::Signal(Signal::SIGTRAP))
                    }
                    None => self.unrecognized(instr, addr),
                }
            }
            None => self.unrecognized(instr, addr),
        }
    }

    fn unrecognized(&mut self, instr: Instruction, addr: u32) -> TrapOutcome {
        warn!("unrecognized trap {:x?} at {:#010x}", instr, addr);
        TrapOutcome::Halted(StopReport::Error(Error::FormatError))
    }

    /// Prepare to let the program run.
    ///
    /// `addr`, if given, replaces the resume address. A step, or any resume
    /// from the address of a live table breakpoint, plants the auto-step
    /// breakpoint at the next instruction first, unless a breakpoint already
    /// sits there. A table breakpoint at the resume address is disarmed until
    /// the next trap. If the next instruction cannot be decoded the resume is
    /// abandoned with [`Error::DecodeError`] and nothing changes.
    pub fn resume<M: CodeMemory + ?Sized>(
        &mut self,
        mem: &mut M,
        action: ResumeAction,
        addr: Option<u32>,
    ) -> Result<(), Error> {
        let pc = addr.unwrap_or_else(|| self.regs.pc());
        let mode = self.regs.mode();

        let over = self.breakpoints.resolve(pc);

        if action == ResumeAction::Step || over.is_some() {
            let mut regs = self.regs.clone();
            regs.set_reg(RegId::Pc, pc);
            let (next, next_mode) = match over {
                // the instruction under the breakpoint is in the table, not in memory
                Some(i) => self.next_over(mem, &regs, i, pc, mode)?,
                None => next_instruction(mem, &regs, pc, mode)?,
            };

            if over.is_some() && next == pc {
                // branch-to-self: nothing to step past
                trace!("resuming onto the same breakpoint");
            } else {
                // a table or compiled-in breakpoint at `next` traps on its own
                let planted = self.breakpoints.resolve(next).is_none()
                    && match self.breakpoints.insert_auto(mem, next, next_mode) {
                        Ok(_) => true,
                        Err(Error::AlreadyBreakpointed) => false,
                        Err(e) => return Err(e),
                    };
                if let Some(i) = over {
                    if let Err(e) = self.breakpoints.disarm(mem, i) {
                        if planted {
                            if let Err(e) = self.breakpoints.remove(mem, AUTO_STEP_SLOT) {
                                warn!("could not remove auto-step breakpoint: {}", e);
                            }
                        }
                        return Err(e);
                    }
                    self.rearm = Some(i);
                }
            }
        }

        self.regs.set_reg(RegId::Pc, pc);
        self.pending = Some(action);
        self.current = None;
        self.transition(DebuggerState::Init);
        Ok(())
    }

    /// Successor of the instruction displaced by breakpoint `index`.
    fn next_over<M: CodeMemory + ?Sized>(
        &mut self,
        mem: &mut M,
        regs: &ContextStack,
        index: usize,
        pc: u32,
        mode: Mode,
    ) -> Result<(u32, Mode), Error> {
        self.breakpoints.disarm(mem, index)?;
        let next = next_instruction(mem, regs, pc, mode);
        self.breakpoints.rearm(mem, index)?;
        Ok(next?)
    }

    /// Remove every breakpoint and let the program run freely.
    pub fn detach<M: CodeMemory + ?Sized>(&mut self, mem: &mut M) {
        self.breakpoints.clear(mem);
        self.current = None;
        self.rearm = None;
        self.pending = Some(ResumeAction::Continue);
        self.transition(DebuggerState::Init);
    }

    /// Write the saved registers back into the trap frame.
    pub fn leave_trap(&self, frame: &mut TrapFrame) {
        self.regs.restore(frame);
    }
}
