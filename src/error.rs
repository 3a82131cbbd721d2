use core::fmt::{self, Display};

/// Protocol-level error taxonomy.
///
/// Each variant maps to the two-digit code sent to the host in an `Enn`
/// reply. None of these are fatal: the stub reports them and keeps serving
/// packets, and the operation which produced them leaves all debugger state
/// untouched.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// The request is understood, but not supported by this stub.
    NotImplemented,
    /// The packet's checksum did not match its body.
    ChecksumError,
    /// The message (or a trap opcode) is malformed.
    FormatError,
    /// The command byte is not recognized.
    UnknownCommand,
    /// A command argument is out of range or unsupported.
    UnknownParameter,
    /// No free slot is left in the breakpoint table.
    TableFull,
    /// The breakpoint index does not name a live breakpoint.
    InvalidIndex,
    /// The instruction could not be decoded.
    DecodeError,
    /// The address already holds a debugger breakpoint.
    AlreadyBreakpointed,
}

impl Error {
    /// The error code sent to the host.
    pub fn code(self) -> u8 {
        use self::Error::*;
        match self {
            NotImplemented => 0x00,
            ChecksumError => 0x01,
            FormatError => 0x02,
            UnknownCommand => 0x03,
            UnknownParameter => 0x04,
            TableFull => 0x05,
            InvalidIndex => 0x06,
            DecodeError => 0x07,
            AlreadyBreakpointed => 0x08,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::Error::*;
        match self {
            NotImplemented => write!(f, "Request is not implemented."),
            ChecksumError => write!(f, "Packet checksum mismatch."),
            FormatError => write!(f, "Malformed message."),
            UnknownCommand => write!(f, "Unknown command."),
            UnknownParameter => write!(f, "Unknown or out-of-range parameter."),
            TableFull => write!(f, "Breakpoint table is full."),
            InvalidIndex => write!(f, "Breakpoint index is not in use."),
            DecodeError => write!(f, "Instruction could not be decoded."),
            AlreadyBreakpointed => write!(f, "Address already holds a breakpoint."),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::NotImplemented.code(), 0);
        assert_eq!(Error::ChecksumError.code(), 1);
        assert_eq!(Error::FormatError.code(), 2);
        assert_eq!(Error::UnknownCommand.code(), 3);
        assert_eq!(Error::UnknownParameter.code(), 4);
        assert_eq!(Error::AlreadyBreakpointed.code(), 8);
    }
}
