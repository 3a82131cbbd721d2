use crate::protocol::packet::PacketBuf;

/// Common imports used by most commands.
pub(self) mod prelude {
    pub use crate::protocol::commands::ParseCommand;
    pub use crate::protocol::common::hex::{decode_hex, decode_hex_buf};
    pub use crate::protocol::packet::PacketBuf;
}

/// Parse a command from its packet body (without the command byte).
pub trait ParseCommand<'a>: Sized {
    /// Returns `None` if the arguments are malformed.
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self>;
}

macro_rules! commands {
    ($($name:literal => $mod:ident::$command:ident$(<$lifetime:lifetime>)?,)*) => {
        $(
            #[allow(non_snake_case, non_camel_case_types)]
            pub mod $mod;
        )*
        $(pub use $mod::$command;)*

        /// Commands understood by the debug stub.
        #[allow(non_camel_case_types)]
        #[derive(Debug)]
        pub enum Command<'a> {
            $(
                #[allow(missing_docs)]
                $command($command<$($lifetime)?>),
            )*
            /// Any command byte not listed above.
            Unknown(&'a [u8]),
        }

        impl<'a> Command<'a> {
            /// Dispatch on the command byte, then parse the arguments.
            pub fn from_packet(buf: PacketBuf<'a>) -> Result<Command<'a>, CommandParseError> {
                let name = *buf.as_body().first().ok_or(CommandParseError::Empty)?;

                let command = match name {
                    $($name => {
                        let buf = buf.trim_start_body_bytes(1);
                        let cmd = $command::from_packet(buf)
                            .ok_or(CommandParseError::MalformedCommand(name))?;
                        Command::$command(cmd)
                    })*
                    _ => Command::Unknown(buf.into_body()),
                };

                Ok(command)
            }
        }
    };
}

/// Command parse error
#[derive(Debug, PartialEq, Eq)]
pub enum CommandParseError {
    /// `$#00`
    Empty,
    /// The arguments of the named command are malformed.
    MalformedCommand(u8),
}

pub mod breakpoint;

commands! {
    b'?' => question_mark::QuestionMark,
    b'c' => _c::c,
    b'D' => _d_upcase::D,
    b'g' => _g::g,
    b'G' => _g_upcase::G<'a>,
    b'k' => _k::k,
    b'm' => _m::m,
    b'M' => _m_upcase::M<'a>,
    b'p' => _p::p,
    b'P' => _p_upcase::P<'a>,
    b's' => _s::s,
    b'z' => _z::z,
    b'Z' => _z_upcase::Z,
}
