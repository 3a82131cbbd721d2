use core::fmt::{self, Debug, Display};

use crate::protocol::telegram::TelegramError;
use crate::protocol::ResponseWriterError;
use crate::target::MemoryFault;

/// A fatal error which ends a debugging session.
///
/// Protocol-level problems (bad checksums, malformed commands, unknown
/// registers...) are reported to the host as `Enn` replies and never surface
/// here.
#[derive(Debug)]
#[non_exhaustive]
pub enum EngineError<C> {
    /// Connection Error while reading a telegram.
    ConnectionRead(C),
    /// Connection Error while writing a telegram.
    ConnectionWrite(C),
    /// The transport accepted only part of a telegram.
    ShortWrite {
        /// Telegram length.
        expected: usize,
        /// Bytes accepted.
        written: usize,
    },
    /// The output buffer cannot hold even an error reply.
    OutputBufferTooSmall,
    /// An outgoing message could not be split into telegrams.
    Telegram(TelegramError),
}

impl<C> Display for EngineError<C>
where
    C: Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::EngineError::*;
        match self {
            ConnectionRead(e) => write!(f, "Connection Error while reading a telegram: {:?}", e),
            ConnectionWrite(e) => write!(f, "Connection Error while writing a telegram: {:?}", e),
            ShortWrite { expected, written } => write!(
                f,
                "Transport accepted {} of {} telegram bytes.",
                written, expected
            ),
            OutputBufferTooSmall => write!(f, "Output buffer too small for an error reply."),
            Telegram(e) => write!(f, "Could not send a message: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl<C> std::error::Error for EngineError<C> where C: Debug {}

/// Errors raised by command handlers.
#[derive(Debug)]
pub(crate) enum InternalError {
    /// Reply with `Enn`.
    Reply(crate::Error),
    /// The response outgrew the output buffer.
    ResponseOverflow,
}

impl From<crate::Error> for InternalError {
    fn from(e: crate::Error) -> Self {
        InternalError::Reply(e)
    }
}

impl From<ResponseWriterError> for InternalError {
    fn from(_: ResponseWriterError) -> Self {
        InternalError::ResponseOverflow
    }
}

impl From<MemoryFault> for InternalError {
    fn from(e: MemoryFault) -> Self {
        debug!("host access faulted: {}", e);
        InternalError::Reply(crate::Error::UnknownParameter)
    }
}

impl InternalError {
    /// Code sent to the host.
    pub fn reply_code(&self) -> crate::Error {
        match self {
            InternalError::Reply(e) => *e,
            InternalError::ResponseOverflow => crate::Error::FormatError,
        }
    }
}
