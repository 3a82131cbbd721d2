//! Telegram segmentation.
//!
//! The debug link moves fixed-size frames (64 bytes on a full-speed USB bulk
//! endpoint), so every protocol message travels as one or more telegrams:
//!
//! ```text
//! +------+-----+------+------------------------+
//! | 0x8d | seq | size | payload (size bytes)   |
//! +------+-----+------+------------------------+
//! ```
//!
//! A message that fits in one telegram is sent with `seq = 0`. Longer
//! messages are numbered `1, 2, ...`, and the final telegram is numbered `0`.
//! Frames may carry padding after the payload.

use core::fmt::{self, Display};

use managed::ManagedSlice;

/// Telegram type byte of debug messages.
pub const TELEGRAM_TYPE: u8 = 0x8d;
/// Bytes of header in front of every payload.
pub const HEADER_LEN: usize = 3;
/// Frame size of the default link.
pub const DEFAULT_MTU: usize = 64;
/// Payload bytes per telegram on the default link.
pub const DEFAULT_SEGMENT_SIZE: usize = DEFAULT_MTU - HEADER_LEN;
/// Telegrams per message on the default link.
pub const DEFAULT_NUM_SEGMENTS: usize = 3;
/// Largest frame a telegram can describe.
pub const MAX_TELEGRAM_LEN: usize = HEADER_LEN + u8::MAX as usize;
/// Most telegrams in one message: sequence numbers `1..=254`, then the final
/// `0`.
pub const MAX_SEGMENTS: usize = u8::MAX as usize;

/// A telegram could not be accepted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TelegramError {
    /// Frame shorter than a header.
    Truncated,
    /// Not a debug telegram.
    ForeignType(u8),
    /// The size field claims more payload than the frame holds.
    LengthMismatch {
        /// Size field.
        declared: usize,
        /// Bytes after the header.
        available: usize,
    },
    /// A segment arrived out of order. The partial message was dropped.
    OutOfSequence {
        /// Sequence number that would have been accepted (besides 0).
        expected: u8,
        /// Sequence number received.
        got: u8,
    },
    /// The message does not fit the message buffer. Reported once its final
    /// telegram has been received.
    Overflow,
    /// An outgoing message needs more than [`MAX_SEGMENTS`] telegrams.
    TooManySegments,
}

impl Display for TelegramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::TelegramError::*;
        match self {
            Truncated => write!(f, "telegram shorter than its header"),
            ForeignType(t) => write!(f, "not a debug telegram (type {:#04x})", t),
            LengthMismatch {
                declared,
                available,
            } => write!(f, "telegram declares {} bytes, carries {}", declared, available),
            OutOfSequence { expected, got } => {
                write!(f, "telegram {} out of sequence (expected {})", got, expected)
            }
            Overflow => write!(f, "message too large for the message buffer"),
            TooManySegments => write!(f, "message needs more than {} telegrams", MAX_SEGMENTS),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TelegramError {}

/// Telegram header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TelegramHeader {
    /// Sequence number; 0 marks the final telegram.
    pub seq: u8,
    /// Payload length.
    pub size: u8,
}

impl TelegramHeader {
    /// Split a frame into header and payload, dropping any padding.
    pub fn parse(frame: &[u8]) -> Result<(TelegramHeader, &[u8]), TelegramError> {
        if frame.len() < HEADER_LEN {
            return Err(TelegramError::Truncated);
        }
        if frame[0] != TELEGRAM_TYPE {
            return Err(TelegramError::ForeignType(frame[0]));
        }

        let header = TelegramHeader {
            seq: frame[1],
            size: frame[2],
        };
        let payload = &frame[HEADER_LEN..];
        let declared = usize::from(header.size);
        if declared > payload.len() {
            return Err(TelegramError::LengthMismatch {
                declared,
                available: payload.len(),
            });
        }

        Ok((header, &payload[..declared]))
    }

    /// Header bytes.
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        [TELEGRAM_TYPE, self.seq, self.size]
    }

    /// Whether this is the last telegram of its message.
    pub fn is_final(&self) -> bool {
        self.seq == 0
    }
}

enum State {
    Idle,
    Receiving { next_seq: u8 },
    Discarding,
}

/// Collects telegrams into a message buffer.
pub struct Reassembler<'a> {
    buf: ManagedSlice<'a, u8>,
    len: usize,
    state: State,
}

impl<'a> Reassembler<'a> {
    /// A reassembler whose capacity is the length of `buf`.
    pub fn new(buf: ManagedSlice<'a, u8>) -> Reassembler<'a> {
        Reassembler {
            buf,
            len: 0,
            state: State::Idle,
        }
    }

    /// Largest message accepted.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial message.
    pub fn reset(&mut self) {
        self.len = 0;
        self.state = State::Idle;
    }

    /// Feed one frame. Returns the complete message once its final telegram
    /// has been appended.
    pub fn pump(&mut self, frame: &[u8]) -> Result<Option<&mut [u8]>, TelegramError> {
        let (header, payload) = TelegramHeader::parse(frame)?;

        match self.state {
            State::Idle => {
                self.len = 0;
                if header.seq > 1 {
                    return Err(TelegramError::OutOfSequence {
                        expected: 1,
                        got: header.seq,
                    });
                }
            }
            State::Receiving { next_seq } => {
                if !header.is_final() && header.seq != next_seq {
                    self.reset();
                    return Err(TelegramError::OutOfSequence {
                        expected: next_seq,
                        got: header.seq,
                    });
                }
            }
            State::Discarding => {
                if header.is_final() {
                    self.reset();
                    return Err(TelegramError::Overflow);
                }
                return Ok(None);
            }
        }

        let end = self.len + payload.len();
        if end > self.buf.len() {
            if header.is_final() {
                self.reset();
                return Err(TelegramError::Overflow);
            }
            self.state = State::Discarding;
            return Ok(None);
        }
        self.buf[self.len..end].copy_from_slice(payload);
        self.len = end;

        if header.is_final() {
            let len = self.len;
            self.reset();
            return Ok(Some(&mut self.buf[..len]));
        }

        self.state = match header.seq.checked_add(1) {
            Some(next_seq) if next_seq != 0 => State::Receiving { next_seq },
            _ => State::Discarding,
        };
        Ok(None)
    }
}

/// Iterator over the telegrams of an outgoing message.
pub struct Segments<'m> {
    chunks: core::slice::Chunks<'m, u8>,
    seq: u8,
}

/// Split `msg` into telegrams of at most `segment_size` payload bytes.
///
/// Fails if that takes more than [`MAX_SEGMENTS`] telegrams, as the sequence
/// number would wrap around to the final-telegram marker.
pub fn segments(msg: &[u8], segment_size: usize) -> Result<Segments<'_>, TelegramError> {
    let chunks = msg.chunks(segment_size.max(1).min(u8::MAX as usize));
    if chunks.len() > MAX_SEGMENTS {
        return Err(TelegramError::TooManySegments);
    }
    Ok(Segments { chunks, seq: 0 })
}

impl<'m> Iterator for Segments<'m> {
    type Item = (TelegramHeader, &'m [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let chunk = self.chunks.next()?;
        // at most MAX_SEGMENTS chunks, so this cannot overflow
        self.seq += 1;
        let seq = if self.chunks.len() == 0 { 0 } else { self.seq };
        Some((
            TelegramHeader {
                seq,
                size: chunk.len() as u8,
            },
            chunk,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(seq: u8, payload: &[u8]) -> Vec<u8> {
        let mut f = TelegramHeader {
            seq,
            size: payload.len() as u8,
        }
        .to_bytes()
        .to_vec();
        f.extend_from_slice(payload);
        f
    }

    #[test]
    fn single_telegram() {
        let mut buf = [0u8; 32];
        let mut r = Reassembler::new(ManagedSlice::Borrowed(&mut buf));

        let msg = r.pump(&frame(0, b"$g#67")).unwrap().unwrap();
        assert_eq!(msg, b"$g#67");
    }

    #[test]
    fn padding_is_ignored() {
        let mut buf = [0u8; 32];
        let mut r = Reassembler::new(ManagedSlice::Borrowed(&mut buf));

        let mut f = frame(0, b"$g#67");
        f.resize(DEFAULT_MTU, 0);
        assert_eq!(r.pump(&f).unwrap().unwrap(), b"$g#67");
    }

    #[test]
    fn split_points_do_not_matter() {
        let message = b"$M1000,8:00000000ffffffff#00";
        for first in 1..message.len() - 1 {
            for second in first + 1..message.len() {
                let mut buf = [0u8; 64];
                let mut r = Reassembler::new(ManagedSlice::Borrowed(&mut buf));
                assert_eq!(r.pump(&frame(1, &message[..first])).unwrap(), None);
                assert_eq!(r.pump(&frame(2, &message[first..second])).unwrap(), None);
                let msg = r.pump(&frame(0, &message[second..])).unwrap().unwrap();
                assert_eq!(msg, &message[..]);
            }
        }
    }

    #[test]
    fn out_of_sequence() {
        let mut buf = [0u8; 64];
        let mut r = Reassembler::new(ManagedSlice::Borrowed(&mut buf));

        r.pump(&frame(1, b"$m10")).unwrap();
        assert_eq!(
            r.pump(&frame(3, b"00,4")),
            Err(TelegramError::OutOfSequence {
                expected: 2,
                got: 3
            })
        );

        // the partial message is gone; a fresh one goes through
        assert_eq!(r.pump(&frame(0, b"$g#67")).unwrap().unwrap(), b"$g#67");

        assert_eq!(
            r.pump(&frame(2, b"xx")),
            Err(TelegramError::OutOfSequence {
                expected: 1,
                got: 2
            })
        );
    }

    #[test]
    fn overflow_is_reported_at_the_end() {
        let mut buf = [0u8; 8];
        let mut r = Reassembler::new(ManagedSlice::Borrowed(&mut buf));

        assert_eq!(r.pump(&frame(1, b"$M1000,")).unwrap(), None);
        assert_eq!(r.pump(&frame(2, b"4:00000000")).unwrap(), None);
        assert_eq!(r.pump(&frame(0, b"#e0")), Err(TelegramError::Overflow));

        assert_eq!(r.pump(&frame(0, b"$g#67")).unwrap().unwrap(), b"$g#67");
    }

    #[test]
    fn header_errors() {
        assert_eq!(TelegramHeader::parse(&[0x8d, 0]), Err(TelegramError::Truncated));
        assert_eq!(
            TelegramHeader::parse(&[0x01, 0, 0]),
            Err(TelegramError::ForeignType(0x01))
        );
        assert_eq!(
            TelegramHeader::parse(&[0x8d, 0, 4, b'+']),
            Err(TelegramError::LengthMismatch {
                declared: 4,
                available: 1
            })
        );
    }

    #[test]
    fn segmentation() {
        let msg = [b'x'; 130];
        let segs: Vec<_> = segments(&msg, DEFAULT_SEGMENT_SIZE).unwrap().collect();
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[0].0, TelegramHeader { seq: 1, size: 61 });
        assert_eq!(segs[1].0, TelegramHeader { seq: 2, size: 61 });
        assert_eq!(segs[2].0, TelegramHeader { seq: 0, size: 8 });

        let single: Vec<_> = segments(b"+$OK#9a", DEFAULT_SEGMENT_SIZE).unwrap().collect();
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].0, TelegramHeader { seq: 0, size: 7 });
    }

    #[test]
    fn segmentation_round_trip() {
        let msg: Vec<u8> = (0..150u8).collect();
        let mut buf = [0u8; 183];
        let mut r = Reassembler::new(ManagedSlice::Borrowed(&mut buf));

        let mut out = None;
        for (header, payload) in segments(&msg, 20).unwrap() {
            let mut f = header.to_bytes().to_vec();
            f.extend_from_slice(payload);
            if let Some(m) = r.pump(&f).unwrap() {
                out = Some(m.to_vec());
            }
        }
        assert_eq!(out.unwrap(), msg);
    }

    #[test]
    fn sequence_numbers_never_wrap() {
        let msg = [b'x'; MAX_SEGMENTS];
        let seqs: Vec<u8> = segments(&msg, 1).unwrap().map(|(h, _)| h.seq).collect();
        assert_eq!(seqs.len(), MAX_SEGMENTS);
        assert_eq!(seqs[MAX_SEGMENTS - 2], 254);
        assert_eq!(seqs[MAX_SEGMENTS - 1], 0);
        assert!(seqs[..MAX_SEGMENTS - 1].iter().all(|&s| s != 0));

        let msg = [b'x'; MAX_SEGMENTS + 1];
        assert_eq!(segments(&msg, 1).err(), Some(TelegramError::TooManySegments));
    }

    #[test]
    fn longest_message_reassembles() {
        let msg = [b'x'; MAX_SEGMENTS];
        let mut buf = [0u8; MAX_SEGMENTS];
        let mut r = Reassembler::new(ManagedSlice::Borrowed(&mut buf));

        let mut out = None;
        for (header, payload) in segments(&msg, 1).unwrap() {
            let mut f = header.to_bytes().to_vec();
            f.extend_from_slice(payload);
            if let Some(m) = r.pump(&f).unwrap() {
                out = Some(m.len());
            }
        }
        assert_eq!(out, Some(MAX_SEGMENTS));
    }
}
