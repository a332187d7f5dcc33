//! DSP external bus
//!
//! The DSP addresses external memory in 16-bit words (21-bit addresses).
//! Word address `w` is word RAM byte address `w << 1`, accessed as the host
//! processor the DSP is attached to. Anything the translator rejects comes
//! back to the core as a fault.

use crate::translate::{AccessKind, Processor};
use crate::word_ram::WordRam;
use emu_core::cpu_ssp1601::{MemorySsp1601, SspFault};
use emu_core::logging::{log, LogCategory, LogLevel};

#[derive(Debug)]
pub struct DspBus {
    pub word_ram: WordRam,
    /// Host processor whose view of word RAM the DSP uses
    context: Processor,
}

impl DspBus {
    pub fn new(word_ram: WordRam, context: Processor) -> Self {
        Self { word_ram, context }
    }
}

impl MemorySsp1601 for DspBus {
    fn read_external(&mut self, addr: u32) -> Result<u16, SspFault> {
        let value = self
            .word_ram
            .read_word(self.context, addr << 1, AccessKind::Linear)
            .map_err(|e| e.to_fault(addr))?;
        log(LogCategory::Bus, LogLevel::Trace, || {
            format!("SSP bus: read {:06X} -> {:04X}", addr, value)
        });
        Ok(value)
    }

    fn write_external(&mut self, addr: u32, val: u16) -> Result<(), SspFault> {
        log(LogCategory::Bus, LogLevel::Trace, || {
            format!("SSP bus: write {:06X} <- {:04X}", addr, val)
        });
        self.word_ram
            .write_word(self.context, addr << 1, AccessKind::Linear, val)
            .map_err(|e| e.to_fault(addr))
    }
}
