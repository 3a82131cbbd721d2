use crate::protocol::commands::{Command, CommandParseError};
use crate::protocol::common::hex::decode_hex;

/// Packet parse error.
#[derive(Debug, PartialEq, Eq)]
pub enum PacketParseError {
    ChecksumMismatched { checksum: u8, calculated: u8 },
    EmptyBuf,
    MissingChecksum,
    MalformedChecksum,
    MalformedCommand(u8),
    NotASCII,
    UnexpectedHeader(u8),
}

impl From<CommandParseError> for PacketParseError {
    fn from(e: CommandParseError) -> Self {
        match e {
            CommandParseError::Empty => PacketParseError::EmptyBuf,
            CommandParseError::MalformedCommand(c) => PacketParseError::MalformedCommand(c),
        }
    }
}

/// Top-level packet, as found in a reassembled message.
pub enum Packet<'a> {
    /// Lone `+`.
    Ack,
    /// Lone `-`: the host wants the last response again.
    Nack,
    /// `0x03`.
    Interrupt,
    /// `$...#cc` with a valid checksum.
    Command(Command<'a>),
}

/// Sum of `body` modulo 256.
pub fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |a, x| a.wrapping_add(*x))
}

pub struct PacketBuf<'a> {
    buf: &'a mut [u8],
    body_range: core::ops::Range<usize>,
}

impl<'a> PacketBuf<'a> {
    /// Validate a raw `$body#cc` buffer: structure, ASCII, and checksum.
    /// Anything after the two checksum digits is ignored.
    pub fn new(pkt_buf: &'a mut [u8]) -> Result<PacketBuf<'a>, PacketParseError> {
        if pkt_buf.is_empty() {
            return Err(PacketParseError::EmptyBuf);
        }

        let hash = pkt_buf
            .iter()
            .position(|&b| b == b'#')
            .ok_or(PacketParseError::MissingChecksum)?;
        let body = &pkt_buf[1..hash];
        let digits = pkt_buf
            .get(hash + 1..hash + 3)
            .ok_or(PacketParseError::MalformedChecksum)?;

        if !body.is_ascii() {
            return Err(PacketParseError::NotASCII);
        }

        let checksum_sent: u8 = decode_hex(digits).map_err(|_| PacketParseError::MalformedChecksum)?;
        let calculated = checksum(body);
        if calculated != checksum_sent {
            return Err(PacketParseError::ChecksumMismatched {
                checksum: checksum_sent,
                calculated,
            });
        }

        Ok(PacketBuf {
            buf: pkt_buf,
            body_range: 1..hash,
        })
    }

    /// (used for tests) Wrap a bare body, skipping framing and checksum.
    #[cfg(test)]
    pub fn new_with_raw_body(body: &'a mut [u8]) -> Result<PacketBuf<'a>, PacketParseError> {
        if !body.is_ascii() {
            return Err(PacketParseError::NotASCII);
        }

        let len = body.len();
        Ok(PacketBuf {
            buf: body,
            body_range: 0..len,
        })
    }

    pub fn trim_start_body_bytes(self, n: usize) -> Self {
        PacketBuf {
            buf: self.buf,
            body_range: (self.body_range.start + n)..self.body_range.end,
        }
    }

    pub fn as_body(&self) -> &[u8] {
        &self.buf[self.body_range.clone()]
    }

    /// Return a mut reference to slice of the packet buffer corresponding to
    /// the current body.
    pub fn into_body(self) -> &'a mut [u8] {
        &mut self.buf[self.body_range]
    }
}

impl<'a> Packet<'a> {
    /// Parse a reassembled message.
    ///
    /// Hosts may send the acknowledgement of the previous response in the
    /// same message as their next packet (`+$g#67`). Leading `+`/`-` bytes
    /// are skipped when something follows them: a new packet supersedes any
    /// request to retransmit the previous response.
    pub fn from_buf(buf: &'a mut [u8]) -> Result<Packet<'a>, PacketParseError> {
        if buf.is_empty() {
            return Err(PacketParseError::EmptyBuf);
        }

        let start = match buf.iter().position(|&b| b != b'+' && b != b'-') {
            Some(start) => start,
            None if buf.contains(&b'-') => return Ok(Packet::Nack),
            None => return Ok(Packet::Ack),
        };
        let buf = &mut buf[start..];

        let first = buf[0];
        match first {
            b'$' => Ok(Packet::Command(Command::from_packet(PacketBuf::new(buf)?)?)),
            0x03 => Ok(Packet::Interrupt),
            other => Err(PacketParseError::UnexpectedHeader(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_reference() {
        assert_eq!(checksum(b"g"), 0x67);
        assert_eq!(checksum(b"OK"), 0x9a);
        assert_eq!(checksum(b"S05"), 0xb8);
        assert_eq!(checksum(&[0xff, 0x02]), 0x01);
    }

    #[test]
    fn valid_packet() {
        let mut buf = b"$m1000,4#8e".to_vec();
        let pkt = PacketBuf::new(&mut buf).unwrap();
        assert_eq!(pkt.as_body(), b"m1000,4");
    }

    #[test]
    fn every_single_byte_corruption_is_detected() {
        let good = b"$M1000,2:0070#6d".to_vec();
        assert!(PacketBuf::new(&mut good.clone()).is_ok());

        let hash = good.iter().position(|&b| b == b'#').unwrap();
        for i in 1..hash {
            for delta in 1..=255u8 {
                let mut bad = good.clone();
                bad[i] = bad[i].wrapping_add(delta);
                if bad[i] == b'#' || !bad[i].is_ascii() {
                    continue;
                }
                assert!(
                    PacketBuf::new(&mut bad).is_err(),
                    "corruption at {} not detected",
                    i
                );
            }
        }
    }

    #[test]
    fn structural_errors() {
        assert_eq!(
            PacketBuf::new(&mut b"$g".to_vec()).err(),
            Some(PacketParseError::MissingChecksum)
        );
        assert_eq!(
            PacketBuf::new(&mut b"$g#6".to_vec()).err(),
            Some(PacketParseError::MalformedChecksum)
        );
        assert_eq!(
            PacketBuf::new(&mut b"$g#68".to_vec()).err(),
            Some(PacketParseError::ChecksumMismatched {
                checksum: 0x68,
                calculated: 0x67
            })
        );
    }

    #[test]
    fn control_bytes() {
        assert!(matches!(Packet::from_buf(&mut b"+".to_vec()), Ok(Packet::Ack)));
        assert!(matches!(Packet::from_buf(&mut b"-".to_vec()), Ok(Packet::Nack)));
        assert!(matches!(Packet::from_buf(&mut [0x03]), Ok(Packet::Interrupt)));
        assert!(matches!(
            Packet::from_buf(&mut b"x".to_vec()),
            Err(PacketParseError::UnexpectedHeader(b'x'))
        ));
        assert!(matches!(Packet::from_buf(&mut b"++".to_vec()), Ok(Packet::Ack)));
        assert!(matches!(Packet::from_buf(&mut b"+-".to_vec()), Ok(Packet::Nack)));
    }

    #[test]
    fn ack_in_front_of_a_packet() {
        assert!(matches!(
            Packet::from_buf(&mut b"+$g#67".to_vec()),
            Ok(Packet::Command(Command::g(_)))
        ));
        assert!(matches!(
            Packet::from_buf(&mut b"-+$?#3f".to_vec()),
            Ok(Packet::Command(Command::QuestionMark(_)))
        ));
        assert!(matches!(
            Packet::from_buf(&mut b"+x".to_vec()),
            Err(PacketParseError::UnexpectedHeader(b'x'))
        ));
        assert!(matches!(
            Packet::from_buf(&mut b"+$g#00".to_vec()),
            Err(PacketParseError::ChecksumMismatched { .. })
        ));
    }
}
