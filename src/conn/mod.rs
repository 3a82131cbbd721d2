//! The link between the stub and the host.

mod impls;

/// A telegram-oriented, in-order link to the host.
///
/// Every call moves exactly one telegram (see
/// [`protocol::telegram`](crate::protocol::telegram)). On the target this is
/// typically a USB bulk endpoint.
///
/// When the `std` feature is enabled, this trait is automatically implemented
/// for [`TcpStream`](std::net::TcpStream), which is handy for driving the stub
/// from a host-side harness.
pub trait Transport {
    /// Transport-specific error type.
    type Error;

    /// Send one telegram, returning the number of bytes accepted.
    fn send(&mut self, telegram: &[u8]) -> Result<usize, Self::Error>;

    /// Receive one telegram into `buf`, returning its length.
    ///
    /// Returns `Ok(0)` if nothing has arrived yet; the caller polls again.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Called each time the stub starts talking to the host after a trap,
    /// _before_ any telegram is sent or received.
    ///
    /// This method's default implementation is a no-op.
    fn on_session_start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
