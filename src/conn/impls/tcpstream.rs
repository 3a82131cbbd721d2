use crate::conn::Transport;
use crate::protocol::telegram::HEADER_LEN;
use std::io::{self, Read, Write};
use std::net::TcpStream;

// A byte stream has no telegram boundaries, so they are recovered from the
// size field of each header.
impl Transport for TcpStream {
    type Error = io::Error;

    fn send(&mut self, telegram: &[u8]) -> Result<usize, Self::Error> {
        Write::write_all(self, telegram)?;
        Write::flush(self)?;
        Ok(telegram.len())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.len() < HEADER_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "receive buffer shorter than a telegram header",
            ));
        }

        self.set_nonblocking(false)?;
        Read::read_exact(self, &mut buf[..HEADER_LEN])?;
        let end = HEADER_LEN + usize::from(buf[2]);
        let payload = buf.get_mut(HEADER_LEN..end).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "telegram larger than receive buffer")
        })?;
        Read::read_exact(self, payload)?;
        Ok(end)
    }

    fn on_session_start(&mut self) -> Result<(), Self::Error> {
        // telegrams are small and latency-sensitive
        self.set_nodelay(true)
    }
}
