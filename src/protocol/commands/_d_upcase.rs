use super::prelude::*;

#[derive(Debug)]
pub struct D;

impl<'a> ParseCommand<'a> for D {
    fn from_packet(_buf: PacketBuf<'a>) -> Option<Self> {
        Some(D)
    }
}
