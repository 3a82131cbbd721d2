use crate::conn::Transport;
use alloc::boxed::Box;

impl<E> Transport for Box<dyn Transport<Error = E>> {
    type Error = E;

    fn send(&mut self, telegram: &[u8]) -> Result<usize, Self::Error> {
        (**self).send(telegram)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        (**self).receive(buf)
    }

    fn on_session_start(&mut self) -> Result<(), Self::Error> {
        (**self).on_session_start()
    }
}
