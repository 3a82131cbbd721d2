use super::prelude::*;

/// GDB's register number for the CPSR on ARM targets.
pub const CPSR_REG_ID: usize = 25;

#[derive(Debug)]
pub struct p {
    pub reg_id: usize,
}

/// A register number, or `!` for the CPSR.
pub(super) fn parse_reg_id(body: &[u8]) -> Option<usize> {
    match body {
        b"!" => Some(CPSR_REG_ID),
        _ => decode_hex(body).ok(),
    }
}

impl<'a> ParseCommand<'a> for p {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        let reg_id = parse_reg_id(buf.as_body())?;
        Some(p { reg_id })
    }
}
