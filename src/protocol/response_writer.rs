use managed::ManagedSlice;

use crate::protocol::common::hex::nibble2ascii;
use crate::util::managed_vec::{CapacityError, ManagedVec};

/// The response did not fit in the output buffer.
pub type Error = CapacityError<u8>;

/// Builds a `$body#cc` response in the output buffer, computing the checksum
/// on the fly.
pub struct ResponseWriter<'a, 'b> {
    out: ManagedVec<'a, 'b, u8>,
    started: bool,
    checksum: u8,
}

impl<'a, 'b> ResponseWriter<'a, 'b> {
    /// Start a new response. With `ack`, the response begins with the `+`
    /// which acknowledges the host's packet.
    pub fn new(buf: &'b mut ManagedSlice<'a, u8>, ack: bool) -> Result<Self, Error> {
        let mut out = ManagedVec::new(buf);
        if ack {
            out.push(b'+')?;
        }
        Ok(ResponseWriter {
            out,
            started: false,
            checksum: 0,
        })
    }

    /// Consumes self, writing out the final '#' and checksum. Returns the
    /// length of the finished response.
    pub fn flush(mut self) -> Result<usize, Error> {
        if !self.started {
            self.started = true;
            self.out.push(b'$')?;
        }

        // don't include the '#' in checksum calculation
        let checksum = self.checksum;
        self.out.push(b'#')?;
        self.out.push(nibble2ascii(checksum >> 4))?;
        self.out.push(nibble2ascii(checksum))?;

        self.trace();
        Ok(self.out.len())
    }

    /// Consumes self without emitting a packet, leaving just the
    /// acknowledgement (if any). Returns its length.
    pub fn ack_only(self) -> usize {
        self.trace();
        self.out.len()
    }

    fn trace(&self) {
        #[cfg(feature = "trace-pkt")]
        trace!(
            "--> {}",
            core::str::from_utf8(self.out.as_slice()).unwrap_or("<non-ascii response>")
        );
    }

    fn write(&mut self, byte: u8) -> Result<(), Error> {
        if !self.started {
            self.started = true;
            self.out.push(b'$')?;
        }

        self.checksum = self.checksum.wrapping_add(byte);
        self.out.push(byte)
    }

    /// Write an entire string into the response.
    pub fn write_str(&mut self, s: &str) -> Result<(), Error> {
        for b in s.as_bytes().iter() {
            self.write(*b)?;
        }
        Ok(())
    }

    /// Write a single byte as a hex string (two ascii chars)
    pub fn write_hex(&mut self, byte: u8) -> Result<(), Error> {
        self.write(nibble2ascii(byte >> 4))?;
        self.write(nibble2ascii(byte))
    }

    /// Write a byte-buffer as a hex string (i.e: two ascii chars / byte).
    pub fn write_hex_buf(&mut self, data: &[u8]) -> Result<(), Error> {
        for b in data.iter() {
            self.write_hex(*b)?;
        }
        Ok(())
    }

    /// Write a 32-bit word the way GDB expects register contents: the target's
    /// little-endian byte order, two hex digits per byte.
    pub fn write_word(&mut self, word: u32) -> Result<(), Error> {
        self.write_hex_buf(&word.to_le_bytes())
    }
}
