//! An exception-driven GDB debug stub for ARM7TDMI firmware.
//!
//! `armdebug` lives inside the debugged program. It hooks the
//! undefined-instruction and prefetch-abort vectors, and whenever a `BKPT`
//! instruction traps, it hands the halted register file to a host-side GDB
//! over a packet-oriented byte transport (typically a USB bulk endpoint).
//!
//! ## Features
//!
//! - Software breakpoints in both ARM and Thumb code, planted by patching the
//!   program image with tagged `BKPT` instructions.
//! - Single-step, implemented by decoding the current instruction, computing
//!   its successor, and planting a transient "auto-step" breakpoint there.
//! - Breakpoint intrinsics (`exception::breakpoint_arm` /
//!   `exception::breakpoint_thumb`) which halt the program unconditionally.
//! - A small subset of the GDB Remote Serial Protocol (`?`, `g`, `G`, `p`,
//!   `P`, `m`, `M`, `c`, `s`, `k`, `D`, `z0`, `Z0`), carried inside
//!   fixed-size telegrams so that it fits through a 64-byte endpoint.
//! - `#![no_std]` and allocation-free: every buffer can be provided by the
//!   caller.
//!
//! ## Getting started
//!
//! On the target, build a [`ProtocolEngine`](stub::ProtocolEngine) around
//! your [`Transport`](conn::Transport), combine it with a
//! [`CodeMemory`](target::CodeMemory) implementation into a
//! [`Debugger`](stub::Debugger), and pass it to `exception::init` (only
//! available when building for `arm-none` targets).
//!
//! ```rust,ignore
//! static mut MSG_BUF: [u8; 183] = [0; 183];
//! static mut OUT_BUF: [u8; 183] = [0; 183];
//!
//! let engine = ProtocolEngine::builder(UsbBulk::new())
//!     .with_packet_buffers(unsafe { &mut MSG_BUF }, unsafe { &mut OUT_BUF })
//!     .build()?;
//! let debugger = Debugger::new(unsafe { RawMemory::new() }, engine);
//! armdebug::exception::init(singleton!(debugger))?;
//! ```
//!
//! The host side of the link is expected to forward GDB's packets, split
//! into telegrams as described in [`protocol::telegram`].
//!
//! ## Feature flags
//!
//! - `std` (default): `Transport` impls for `std` types, `std::error::Error`
//!   impls.
//! - `alloc`: allow the engine to heap-allocate its buffers.
//! - `trace-pkt` (default): log every packet sent and received at `trace`
//!   level.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[macro_use]
extern crate log;

mod error;
mod util;

pub mod arch;
pub mod breakpoint;
pub mod common;
pub mod conn;
pub mod context;
pub mod instr;
pub mod protocol;
pub mod stub;
pub mod target;

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod exception;

pub use error::Error;
