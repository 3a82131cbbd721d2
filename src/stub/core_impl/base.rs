use core::convert::TryFrom;

use super::prelude::*;
use crate::arch::RegId;

/// Bytes of memory read from the target per chunk.
const MEMORY_CHUNK: usize = 32;
/// R0-R15 and the CPSR.
const GDB_REGISTERS: usize = 17;

impl<M: CodeMemory + ?Sized> EngineImpl<M> {
    pub(crate) fn handle_stop_reason(
        &mut self,
        res: &mut ResponseWriter<'_, '_>,
        ctx: &DebuggerContext,
    ) -> Result<HandlerStatus, Error> {
        res.write_str("S")?;
        res.write_hex(ctx.state().signal().0)?;
        Ok(HandlerStatus::Handled)
    }

    pub(crate) fn handle_read_registers(
        &mut self,
        res: &mut ResponseWriter<'_, '_>,
        ctx: &DebuggerContext,
    ) -> Result<HandlerStatus, Error> {
        for val in ctx.regs().gdb_registers() {
            res.write_word(val)?;
        }
        Ok(HandlerStatus::Handled)
    }

    pub(crate) fn handle_write_registers(
        &mut self,
        ctx: &mut DebuggerContext,
        vals: &[u8],
    ) -> Result<HandlerStatus, Error> {
        if vals.len() != 4 * GDB_REGISTERS {
            return Err(Error::Reply(crate::Error::FormatError));
        }

        let regs = (0..16).map(RegId::from_number).chain(Some(RegId::Cpsr));
        for (reg, word) in regs.zip(vals.chunks_exact(4)) {
            ctx.regs_mut().set_reg(reg, word_from_le(word));
        }
        Ok(HandlerStatus::NeedsOk)
    }

    pub(crate) fn handle_read_register(
        &mut self,
        res: &mut ResponseWriter<'_, '_>,
        ctx: &DebuggerContext,
        reg_id: usize,
    ) -> Result<HandlerStatus, Error> {
        let reg = RegId::from_raw_id(reg_id).ok_or(crate::Error::UnknownParameter)?;
        res.write_word(ctx.regs().reg(reg))?;
        Ok(HandlerStatus::Handled)
    }

    pub(crate) fn handle_write_register(
        &mut self,
        ctx: &mut DebuggerContext,
        reg_id: usize,
        val: &[u8],
    ) -> Result<HandlerStatus, Error> {
        let reg = RegId::from_raw_id(reg_id).ok_or(crate::Error::UnknownParameter)?;
        if val.len() != 4 {
            return Err(Error::Reply(crate::Error::FormatError));
        }
        ctx.regs_mut().set_reg(reg, word_from_le(val));
        Ok(HandlerStatus::NeedsOk)
    }

    pub(crate) fn handle_read_memory(
        &mut self,
        res: &mut ResponseWriter<'_, '_>,
        mem: &mut M,
        addr: u32,
        len: usize,
    ) -> Result<HandlerStatus, Error> {
        let mut buf = [0u8; MEMORY_CHUNK];
        let mut offset = 0;
        while offset < len {
            let n = (len - offset).min(MEMORY_CHUNK);
            let chunk_addr = checked_offset(addr, offset)?;
            mem.read(chunk_addr, &mut buf[..n])?;
            res.write_hex_buf(&buf[..n])?;
            offset += n;
        }
        Ok(HandlerStatus::Handled)
    }

    pub(crate) fn handle_write_memory(
        &mut self,
        mem: &mut M,
        addr: u32,
        len: usize,
        val: &[u8],
    ) -> Result<HandlerStatus, Error> {
        if val.len() != len {
            return Err(Error::Reply(crate::Error::FormatError));
        }
        checked_offset(addr, len)?;

        mem.write(addr, val)?;
        // the host may be patching code
        mem.sync_instruction(addr, len);
        Ok(HandlerStatus::NeedsOk)
    }
}

fn word_from_le(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .rev()
        .fold(0, |word, &b| (word << 8) | u32::from(b))
}

/// `addr + offset`, if it stays inside the 32-bit address space.
fn checked_offset(addr: u32, offset: usize) -> Result<u32, Error> {
    u32::try_from(offset)
        .ok()
        .and_then(|offset| addr.checked_add(offset))
        .ok_or(Error::Reply(crate::Error::UnknownParameter))
}
