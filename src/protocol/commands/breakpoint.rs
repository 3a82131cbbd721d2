use super::prelude::*;

// Breakpoint packets look like this:
//
// Z0,addr,kind
//  | \__/ \__/
//  |  |     \___ 2 for Thumb, 4 for ARM
//  |  \_________ instruction address
//  \____________ 0: software breakpoint, 1: hardware, 2-4: watchpoints

#[derive(Debug)]
pub struct BasicBreakpoint {
    pub type_: u8,
    pub addr: u32,
    /// architecture dependent
    pub kind: u8,
}

impl BasicBreakpoint {
    pub fn from_slice(body: &[u8]) -> Option<BasicBreakpoint> {
        let mut body = body.split(|&b| b == b',');
        let type_ = decode_hex(body.next()?).ok()?;
        let addr = decode_hex(body.next()?).ok()?;
        let kind = decode_hex(body.next()?).ok()?;
        if body.next().is_some() {
            return None;
        }

        Some(BasicBreakpoint { type_, addr, kind })
    }
}
