use core::fmt::{self, Display};

use managed::ManagedSlice;

use crate::conn::Transport;
use crate::protocol::telegram::{
    Reassembler, DEFAULT_NUM_SEGMENTS, DEFAULT_SEGMENT_SIZE, HEADER_LEN, MAX_SEGMENTS,
    MAX_TELEGRAM_LEN,
};

use super::ProtocolEngine;

/// An error which may occur when building a [`ProtocolEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolEngineBuilderError {
    /// Must provide buffers using `with_packet_buffers` in `#![no_std]` mode.
    MissingPacketBuffer,
    /// A provided buffer is shorter than `segment_size * num_segments`.
    PacketBufSizeMismatch,
    /// `segment_size` must be between 1 and 255 bytes.
    InvalidSegmentSize,
    /// `num_segments` must be between 1 and 255.
    InvalidSegmentCount,
}

impl Display for ProtocolEngineBuilderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::ProtocolEngineBuilderError::*;
        match self {
            MissingPacketBuffer => write!(
                f,
                "Must provide buffers using `with_packet_buffers` in `#![no_std]` mode."
            ),
            PacketBufSizeMismatch => write!(
                f,
                "`with_packet_buffers` buffers are shorter than `segment_size * num_segments`."
            ),
            InvalidSegmentSize => write!(f, "`segment_size` must be between 1 and 255."),
            InvalidSegmentCount => write!(f, "`num_segments` must be between 1 and 255."),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ProtocolEngineBuilderError {}

/// Helper to construct and customize [`ProtocolEngine`].
pub struct ProtocolEngineBuilder<'a, T: Transport> {
    transport: T,
    msg_buffer: Option<&'a mut [u8]>,
    out_buffer: Option<&'a mut [u8]>,
    segment_size: usize,
    num_segments: usize,
}

impl<'a, T: Transport> ProtocolEngineBuilder<'a, T> {
    /// Create a new `ProtocolEngineBuilder` using the provided Transport.
    pub fn new(transport: T) -> ProtocolEngineBuilder<'static, T> {
        ProtocolEngineBuilder {
            transport,
            msg_buffer: None,
            out_buffer: None,
            segment_size: DEFAULT_SEGMENT_SIZE,
            num_segments: DEFAULT_NUM_SEGMENTS,
        }
    }

    /// Use pre-allocated buffers for incoming and outgoing messages (instead
    /// of heap-allocating).
    ///
    /// _Note:_ This method is _required_ when the `alloc` feature is disabled!
    pub fn with_packet_buffers(mut self, msg_buffer: &'a mut [u8], out_buffer: &'a mut [u8]) -> Self {
        self.msg_buffer = Some(msg_buffer);
        self.out_buffer = Some(out_buffer);
        self
    }

    /// Payload bytes per telegram. Defaults to 61 (a 64 byte frame minus the
    /// header).
    pub fn segment_size(mut self, size: usize) -> Self {
        self.segment_size = size;
        self
    }

    /// Telegrams per message, at most 255. Defaults to 3.
    pub fn num_segments(mut self, n: usize) -> Self {
        self.num_segments = n;
        self
    }

    /// Build the ProtocolEngine, returning an error if something went wrong.
    pub fn build(self) -> Result<ProtocolEngine<'a, T>, ProtocolEngineBuilderError> {
        if self.segment_size == 0 || self.segment_size + HEADER_LEN > MAX_TELEGRAM_LEN {
            return Err(ProtocolEngineBuilderError::InvalidSegmentSize);
        }
        if self.num_segments == 0 || self.num_segments > MAX_SEGMENTS {
            return Err(ProtocolEngineBuilderError::InvalidSegmentCount);
        }
        let capacity = self.segment_size * self.num_segments;

        let msg_buf = Self::buffer(self.msg_buffer, capacity)?;
        let out_buf = Self::buffer(self.out_buffer, capacity)?;

        Ok(ProtocolEngine {
            transport: self.transport,
            reassembler: Reassembler::new(msg_buf),
            out_buf,
            out_len: 0,
            frame: [0; MAX_TELEGRAM_LEN],
            segment_size: self.segment_size,
        })
    }

    fn buffer(
        buf: Option<&'a mut [u8]>,
        capacity: usize,
    ) -> Result<ManagedSlice<'a, u8>, ProtocolEngineBuilderError> {
        match buf {
            Some(buf) => match buf.get_mut(..capacity) {
                Some(buf) => Ok(ManagedSlice::Borrowed(buf)),
                None => Err(ProtocolEngineBuilderError::PacketBufSizeMismatch),
            },
            None => {
                cfg_if::cfg_if! {
                    if #[cfg(feature = "alloc")] {
                        use alloc::vec;
                        Ok(ManagedSlice::Owned(vec![0; capacity]))
                    } else {
                        Err(ProtocolEngineBuilderError::MissingPacketBuffer)
                    }
                }
            }
        }
    }
}
