//! The debugger core: the [`ProtocolEngine`] which talks to the host, and the
//! [`Debugger`] which ties it to the trap state machine and target memory.

use managed::ManagedSlice;

use crate::conn::Transport;
use crate::protocol::telegram::{self, Reassembler, TelegramError, MAX_TELEGRAM_LEN};
use crate::protocol::{Packet, PacketParseError, ResponseWriter};
use crate::target::CodeMemory;

mod builder;
mod core_impl;
mod error;
mod trap;

pub mod state_machine;

pub use builder::{ProtocolEngineBuilder, ProtocolEngineBuilderError};
pub use error::EngineError;
pub use state_machine::{DebuggerContext, DebuggerState, ResumeAction, StopReport, TrapOutcome};
pub use trap::{TrapCause, TrapFrame};

use core_impl::{EngineImpl, HandlerStatus};
use error::InternalError;
use EngineError as Error;

/// Something which can be called from the exception vectors.
///
/// Implemented by [`Debugger`]; the `exception` module stores a
/// `&'static mut dyn TrapHandler`.
pub trait TrapHandler {
    /// Put the debugger in its initial state.
    fn init(&mut self);

    /// Run a debugging session for the trap described by `frame`, then update
    /// `frame` with the registers to resume with.
    fn handle_trap(&mut self, frame: &mut TrapFrame);
}

/// What to do with a reassembled message.
enum Next {
    /// Nothing to send.
    Ignore,
    /// Send `out_buf[..len]`, then keep serving.
    Reply(usize),
    /// Send `out_buf[..len]`, then return to the program.
    Resume(usize),
    /// Send the previous response again.
    Retransmit,
    /// Send a lone `-`.
    Nack,
}

/// Talks to the host while the program is halted.
///
/// Owns the transport and the message buffers. Create one with
/// [`ProtocolEngine::builder`].
pub struct ProtocolEngine<'a, T: Transport> {
    transport: T,
    reassembler: Reassembler<'a>,
    out_buf: ManagedSlice<'a, u8>,
    out_len: usize,
    frame: [u8; MAX_TELEGRAM_LEN],
    segment_size: usize,
}

impl<'a, T: Transport> ProtocolEngine<'a, T> {
    /// Create a [`ProtocolEngineBuilder`] using the provided Transport.
    pub fn builder(transport: T) -> ProtocolEngineBuilder<'a, T> {
        ProtocolEngineBuilder::new(transport)
    }

    /// Largest message accepted from, or sent to, the host.
    pub fn message_capacity(&self) -> usize {
        self.reassembler.capacity()
    }

    /// Borrow the underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Drop any partially received message.
    pub fn reset(&mut self) {
        self.reassembler.reset();
    }

    /// Serve host requests until one of them lets the program run.
    ///
    /// `report`, if given, is sent first as the (unacknowledged) stop report of
    /// the trap which started this session.
    pub fn serve<M: CodeMemory + ?Sized>(
        &mut self,
        ctx: &mut DebuggerContext,
        mem: &mut M,
        report: Option<StopReport>,
    ) -> Result<(), Error<T::Error>> {
        self.transport
            .on_session_start()
            .map_err(Error::ConnectionWrite)?;

        if let Some(report) = report {
            let len = Self::write_stop_report(&mut self.out_buf, report)
                .map_err(|_| Error::OutputBufferTooSmall)?;
            self.out_len = len;
            self.send_response()?;
        }

        let mut inner = EngineImpl::<M>::new();
        loop {
            let n = self
                .transport
                .receive(&mut self.frame)
                .map_err(Error::ConnectionRead)?;
            if n == 0 {
                continue;
            }

            let next = match self.reassembler.pump(&self.frame[..n]) {
                Ok(None) => Next::Ignore,
                Ok(Some(msg)) => Self::handle_message(&mut inner, &mut self.out_buf, ctx, mem, msg)?,
                Err(TelegramError::ForeignType(ty)) => {
                    warn!("ignoring telegram of type {:#04x}", ty);
                    Next::Ignore
                }
                Err(e) => {
                    warn!("dropping message: {}", e);
                    Next::Reply(Self::write_error(
                        &mut self.out_buf,
                        true,
                        crate::Error::FormatError,
                    )?)
                }
            };

            match next {
                Next::Ignore => {}
                Next::Nack => self.send(b"-")?,
                Next::Retransmit => {
                    debug!("host requested retransmission");
                    self.send_response()?;
                }
                Next::Reply(len) => {
                    self.out_len = len;
                    self.send_response()?;
                }
                Next::Resume(len) => {
                    self.out_len = len;
                    self.send_response()?;
                    return Ok(());
                }
            }
        }
    }

    fn handle_message<M: CodeMemory + ?Sized>(
        inner: &mut EngineImpl<M>,
        out_buf: &mut ManagedSlice<'a, u8>,
        ctx: &mut DebuggerContext,
        mem: &mut M,
        msg: &mut [u8],
    ) -> Result<Next, Error<T::Error>> {
        #[cfg(feature = "trace-pkt")]
        trace!(
            "<-- {}",
            core::str::from_utf8(msg).unwrap_or("<non-ascii message>")
        );

        let command = match Packet::from_buf(msg) {
            Ok(Packet::Ack) => return Ok(Next::Ignore),
            Ok(Packet::Nack) => return Ok(Next::Retransmit),
            Ok(Packet::Interrupt) => {
                debug!("<-- interrupt while halted");
                return Ok(Next::Ignore);
            }
            Ok(Packet::Command(command)) => command,
            Err(PacketParseError::ChecksumMismatched {
                checksum,
                calculated,
            }) => {
                warn!(
                    "checksum mismatch: got {:02x}, calculated {:02x}",
                    checksum, calculated
                );
                return Ok(Next::Nack);
            }
            Err(PacketParseError::EmptyBuf) => {
                return Ok(Next::Reply(Self::write_error(
                    out_buf,
                    true,
                    crate::Error::UnknownCommand,
                )?))
            }
            Err(e) => {
                warn!("malformed packet: {:?}", e);
                return Ok(Next::Reply(Self::write_error(
                    out_buf,
                    true,
                    crate::Error::FormatError,
                )?));
            }
        };

        let result = match ResponseWriter::new(out_buf, true) {
            Ok(mut res) => match inner.handle_command(&mut res, ctx, mem, command) {
                Ok(HandlerStatus::Handled) => res.flush().map(Next::Reply),
                Ok(HandlerStatus::NeedsOk) => res
                    .write_str("OK")
                    .and_then(|()| res.flush())
                    .map(Next::Reply),
                Ok(HandlerStatus::Resume) => Ok(Next::Resume(res.ack_only())),
                Ok(HandlerStatus::Detach) => res
                    .write_str("OK")
                    .and_then(|()| res.flush())
                    .map(Next::Resume),
                Err(e) => return Self::reply_internal_error(out_buf, e),
            },
            Err(e) => Err(e),
        };

        match result {
            Ok(next) => Ok(next),
            Err(_) => Self::reply_internal_error(out_buf, InternalError::ResponseOverflow),
        }
    }

    fn reply_internal_error(
        out_buf: &mut ManagedSlice<'a, u8>,
        e: InternalError,
    ) -> Result<Next, Error<T::Error>> {
        let code = e.reply_code();
        debug!("command failed: {:?}", e);
        Ok(Next::Reply(Self::write_error(out_buf, true, code)?))
    }

    fn write_error(
        out_buf: &mut ManagedSlice<'a, u8>,
        ack: bool,
        code: crate::Error,
    ) -> Result<usize, Error<T::Error>> {
        let mut res = ResponseWriter::new(out_buf, ack).map_err(|_| Error::OutputBufferTooSmall)?;
        res.write_str("E")
            .and_then(|()| res.write_hex(code.code()))
            .map_err(|_| Error::OutputBufferTooSmall)?;
        res.flush().map_err(|_| Error::OutputBufferTooSmall)
    }

    fn write_stop_report(
        out_buf: &mut ManagedSlice<'a, u8>,
        report: StopReport,
    ) -> Result<usize, crate::protocol::ResponseWriterError> {
        let mut res = ResponseWriter::new(out_buf, false)?;
        match report {
            StopReport::Signal(signal) => {
                res.write_str("S")?;
                res.write_hex(signal.0)?;
            }
            StopReport::Error(e) => {
                res.write_str("E")?;
                res.write_hex(e.code())?;
            }
        }
        res.flush()
    }

    /// Send the response in `out_buf`.
    fn send_response(&mut self) -> Result<(), Error<T::Error>> {
        let len = self.out_len;
        Self::send_message(
            &mut self.transport,
            &mut self.frame,
            self.segment_size,
            &self.out_buf[..len],
        )
    }

    fn send(&mut self, msg: &[u8]) -> Result<(), Error<T::Error>> {
        Self::send_message(&mut self.transport, &mut self.frame, self.segment_size, msg)
    }

    fn send_message(
        transport: &mut T,
        frame: &mut [u8; MAX_TELEGRAM_LEN],
        segment_size: usize,
        msg: &[u8],
    ) -> Result<(), Error<T::Error>> {
        let segments = telegram::segments(msg, segment_size).map_err(Error::Telegram)?;
        for (header, payload) in segments {
            let len = telegram::HEADER_LEN + payload.len();
            frame[..telegram::HEADER_LEN].copy_from_slice(&header.to_bytes());
            frame[telegram::HEADER_LEN..len].copy_from_slice(payload);

            let written = transport
                .send(&frame[..len])
                .map_err(Error::ConnectionWrite)?;
            if written != len {
                return Err(Error::ShortWrite {
                    expected: len,
                    written,
                });
            }
        }
        Ok(())
    }
}

/// A complete debugger: trap state, target memory, and the link to the host.
pub struct Debugger<'a, M: CodeMemory, T: Transport> {
    ctx: DebuggerContext,
    mem: M,
    engine: ProtocolEngine<'a, T>,
}

impl<'a, M: CodeMemory, T: Transport> Debugger<'a, M, T> {
    /// Create a new debugger in the [`Reset`](DebuggerState::Reset) state.
    pub fn new(mem: M, engine: ProtocolEngine<'a, T>) -> Debugger<'a, M, T> {
        Debugger {
            ctx: DebuggerContext::new(),
            mem,
            engine,
        }
    }

    /// Debugger state.
    pub fn context(&self) -> &DebuggerContext {
        &self.ctx
    }

    /// Target memory.
    pub fn memory(&self) -> &M {
        &self.mem
    }

    /// Borrow the protocol engine.
    pub fn engine(&self) -> &ProtocolEngine<'a, T> {
        &self.engine
    }

    /// Mutably borrow the protocol engine.
    pub fn engine_mut(&mut self) -> &mut ProtocolEngine<'a, T> {
        &mut self.engine
    }

    /// Handle one trap, returning once the host lets the program run.
    ///
    /// On a transport error the program must stay halted: call
    /// [`resume_session`](Self::resume_session) to talk to the host again.
    pub fn try_handle_trap(&mut self, frame: &mut TrapFrame) -> Result<(), Error<T::Error>> {
        match self.ctx.enter_trap(&mut self.mem, frame) {
            TrapOutcome::Resume => {}
            TrapOutcome::Halted(report) => {
                self.engine
                    .serve(&mut self.ctx, &mut self.mem, Some(report))?;
            }
        }
        self.ctx.leave_trap(frame);
        Ok(())
    }

    /// Continue serving the host after [`try_handle_trap`](Self::try_handle_trap)
    /// failed, without sending a new stop report.
    pub fn resume_session(&mut self, frame: &mut TrapFrame) -> Result<(), Error<T::Error>> {
        self.engine.reset();
        self.engine.serve(&mut self.ctx, &mut self.mem, None)?;
        self.ctx.leave_trap(frame);
        Ok(())
    }
}

impl<'a, M, T> TrapHandler for Debugger<'a, M, T>
where
    M: CodeMemory,
    T: Transport,
    T::Error: core::fmt::Debug,
{
    fn init(&mut self) {
        self.ctx.init(&mut self.mem);
    }

    fn handle_trap(&mut self, frame: &mut TrapFrame) {
        let mut result = self.try_handle_trap(frame);
        while let Err(e) = result {
            error!("debug session failed: {}", e);
            result = self.resume_session(frame);
        }
    }
}
