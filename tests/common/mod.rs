#![allow(dead_code)]

use std::collections::VecDeque;

use armdebug::conn::Transport;
use armdebug::protocol::checksum;
use armdebug::protocol::telegram::{self, TelegramHeader, DEFAULT_SEGMENT_SIZE};
use armdebug::stub::{Debugger, ProtocolEngine, TrapCause, TrapFrame};
use armdebug::target::MemoryRegion;

pub const BASE: u32 = 0x1000;
pub const ARM_NOP: u32 = 0xe1a0_0000;
pub const ARM_CPSR: u32 = 0x6000_001f;
pub const THUMB_CPSR: u32 = 0x6000_003f;

/// The script ran out of host telegrams.
#[derive(Debug, PartialEq, Eq)]
pub struct ScriptEnded;

/// Plays back host telegrams and records the stub's.
#[derive(Default)]
pub struct ScriptedTransport {
    pub incoming: VecDeque<Vec<u8>>,
    pub sent: Vec<Vec<u8>>,
}

impl Transport for ScriptedTransport {
    type Error = ScriptEnded;

    fn send(&mut self, telegram: &[u8]) -> Result<usize, ScriptEnded> {
        self.sent.push(telegram.to_vec());
        Ok(telegram.len())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, ScriptEnded> {
        let telegram = self.incoming.pop_front().ok_or(ScriptEnded)?;
        buf[..telegram.len()].copy_from_slice(&telegram);
        Ok(telegram.len())
    }
}

impl ScriptedTransport {
    /// Queue `msg` as the host would send it.
    pub fn push_message(&mut self, msg: &[u8]) {
        for (header, payload) in telegram::segments(msg, DEFAULT_SEGMENT_SIZE).unwrap() {
            self.push_telegram(header, payload);
        }
    }

    pub fn push_telegram(&mut self, header: TelegramHeader, payload: &[u8]) {
        let mut t = header.to_bytes().to_vec();
        t.extend_from_slice(payload);
        self.incoming.push_back(t);
    }

    /// Queue `$body#cc`.
    pub fn push_packet(&mut self, body: &str) {
        self.push_message(&packet(body));
    }

    /// Everything sent so far, reassembled into messages.
    pub fn take_messages(&mut self) -> Vec<String> {
        let mut messages = Vec::new();
        let mut current = Vec::new();
        for t in self.sent.drain(..) {
            let (header, payload) = TelegramHeader::parse(&t).expect("stub sent a bad telegram");
            current.extend_from_slice(payload);
            if header.is_final() {
                messages.push(String::from_utf8(std::mem::take(&mut current)).unwrap());
            }
        }
        assert!(current.is_empty(), "unterminated message");
        messages
    }
}

/// `$body#cc`
pub fn packet(body: &str) -> Vec<u8> {
    format!("${}#{:02x}", body, checksum(body.as_bytes())).into_bytes()
}

/// `+$body#cc`, as the stub answers a command.
pub fn reply(body: &str) -> String {
    format!("+{}", String::from_utf8(packet(body)).unwrap())
}

/// 64 bytes of ARM `NOP`s at [`BASE`], with `ARM_BKPT_MANUAL` at `BASE`.
pub fn program() -> Vec<u8> {
    let mut image = Vec::new();
    image.extend_from_slice(&armdebug::instr::ARM_BKPT_MANUAL.to_le_bytes());
    for _ in 1..16 {
        image.extend_from_slice(&ARM_NOP.to_le_bytes());
    }
    image
}

pub type TestDebugger = Debugger<'static, MemoryRegion<'static>, ScriptedTransport>;

pub fn debugger() -> TestDebugger {
    let _ = pretty_env_logger::try_init();

    let engine = ProtocolEngine::builder(ScriptedTransport::default())
        .build()
        .unwrap();
    let mut debugger = Debugger::new(MemoryRegion::new(BASE, program()), engine);
    armdebug::stub::TrapHandler::init(&mut debugger);
    debugger
}

/// Registers `r0..r14` hold their own number.
pub fn arm_trap(addr: u32) -> TrapFrame {
    TrapFrame::new(TrapCause::Undefined, ARM_CPSR, numbered_regs(), addr)
}

/// Like [`arm_trap`], interrupting Thumb code.
pub fn thumb_trap(addr: u32) -> TrapFrame {
    TrapFrame::new(TrapCause::Undefined, THUMB_CPSR, numbered_regs(), addr)
}

fn numbered_regs() -> [u32; 16] {
    let mut regs = [0; 16];
    for (i, r) in regs.iter_mut().enumerate() {
        *r = i as u32;
    }
    regs
}

pub fn transport(debugger: &mut TestDebugger) -> &mut ScriptedTransport {
    debugger.engine_mut().transport_mut()
}

pub fn word_at(debugger: &TestDebugger, addr: u32) -> u32 {
    let offset = (addr - BASE) as usize;
    let bytes = &debugger.memory().as_bytes()[offset..offset + 4];
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

pub fn half_at(debugger: &TestDebugger, addr: u32) -> u16 {
    let offset = (addr - BASE) as usize;
    let bytes = &debugger.memory().as_bytes()[offset..offset + 2];
    u16::from_le_bytes([bytes[0], bytes[1]])
}
