//! Private utility types used internally within `armdebug`.
//!
//! These are all bits of functionality that _could_ exist as their own crates /
//! libraries, and do not rely on any `armdebug` specific infrastructure.

pub mod managed_vec;
