use super::prelude::*;

#[derive(Debug)]
pub struct G<'a> {
    /// Raw register file, in target byte order.
    pub vals: &'a [u8],
}

impl<'a> ParseCommand<'a> for G<'a> {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        let vals = decode_hex_buf(buf.into_body()).ok()?;
        Some(G { vals })
    }
}
