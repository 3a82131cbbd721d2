//! Wire protocol: telegram segmentation, packet framing, command parsing and
//! response encoding.

pub(crate) mod commands;
mod packet;
mod response_writer;

pub(crate) mod common;

pub mod telegram;

pub use packet::checksum;
pub(crate) use packet::{Packet, PacketParseError};
pub(crate) use response_writer::{Error as ResponseWriterError, ResponseWriter};
