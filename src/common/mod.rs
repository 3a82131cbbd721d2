//! Common types and definitions used across `armdebug`.

mod signal;

pub use self::signal::Signal;
