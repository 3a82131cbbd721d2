use super::breakpoint::BasicBreakpoint;
use super::prelude::*;

#[derive(Debug)]
pub struct Z(pub BasicBreakpoint);

impl<'a> ParseCommand<'a> for Z {
    fn from_packet(buf: PacketBuf<'a>) -> Option<Self> {
        Some(Z(BasicBreakpoint::from_slice(buf.as_body())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &[u8]) -> Option<Z> {
        let mut body = body.to_vec();
        Z::from_packet(PacketBuf::new_with_raw_body(&mut body).unwrap())
    }

    #[test]
    fn thumb_breakpoint() {
        let Z(bp) = parse(b"0,8000102,2").unwrap();
        assert_eq!(bp.type_, 0);
        assert_eq!(bp.addr, 0x0800_0102);
        assert_eq!(bp.kind, 2);
    }

    #[test]
    fn malformed() {
        assert!(parse(b"0,1000").is_none());
        assert!(parse(b"0,1000,4,1").is_none());
        assert!(parse(b"0,10000000000,4").is_none());
    }
}
