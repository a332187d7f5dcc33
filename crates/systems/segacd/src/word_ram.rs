//! Word RAM: 256 KiB shared between the main CPU, the sub CPU and the DSP.
//!
//! All accesses go through [`crate::translate`]; nothing outside this module
//! indexes the storage directly.
//!
//! Memory mode register (low byte):
//! - bit 0: RET. 2M: 1 = main CPU owns the RAM. 1M: swap flag.
//! - bit 1: DMNA. Reads back as !RET in 2M mode.
//! - bit 2: MODE. 0 = 2M, 1 = 1M
//! - bits 4..3: pixel write priority

use emu_core::logging::{log, LogCategory, LogLevel};
use serde::{Deserialize, Serialize};

use crate::error::WordRamError;
use crate::nibble::{extract_nibble, insert_nibble, pixel_word_address, PriorityMode};
use crate::translate::{
    self, get_address, AccessKind, Partition, Processor, Translation, WordRamMode, WORD_RAM_SIZE,
};

/// Number of 16-bit words in word RAM
pub const WORD_RAM_WORDS: usize = (WORD_RAM_SIZE / 2) as usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRam {
    words: Vec<u16>,
    partition: Partition,
    priority: PriorityMode,
    /// Last DMNA bit written through the mode register
    dmna: bool,
    initial_mode: WordRamMode,
}

impl WordRam {
    pub fn new(initial_mode: WordRamMode) -> Self {
        Self {
            words: vec![0; WORD_RAM_WORDS],
            partition: Partition {
                mode: initial_mode,
                swap: false,
            },
            priority: PriorityMode::Off,
            dmna: false,
            initial_mode,
        }
    }

    /// Back to the power-on mode with cleared storage
    pub fn reset(&mut self) {
        self.words.fill(0);
        self.partition = Partition {
            mode: self.initial_mode,
            swap: false,
        };
        self.priority = PriorityMode::Off;
        self.dmna = false;
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn mode(&self) -> WordRamMode {
        self.partition.mode
    }

    pub fn swap_flag(&self) -> bool {
        self.partition.swap
    }

    pub fn priority(&self) -> PriorityMode {
        self.priority
    }

    pub fn set_mode(&mut self, mode: WordRamMode) {
        if mode != self.partition.mode {
            log(LogCategory::WordRam, LogLevel::Debug, || {
                format!("Word RAM: mode {:?} -> {:?}", self.partition.mode, mode)
            });
        }
        self.partition.mode = mode;
    }

    pub fn set_swap_flag(&mut self, swap: bool) {
        if swap != self.partition.swap {
            log(LogCategory::WordRam, LogLevel::Debug, || {
                format!("Word RAM: swap flag {} -> {}", self.partition.swap, swap)
            });
        }
        self.partition.swap = swap;
    }

    pub fn set_priority(&mut self, priority: PriorityMode) {
        self.priority = priority;
    }

    pub fn translate(
        &self,
        processor: Processor,
        address: u32,
        kind: AccessKind,
    ) -> Result<Translation, WordRamError> {
        translate::translate(self.partition, processor, address, kind)
    }

    /// Storage word index for an access; bit 0 of `address` is ignored
    fn word_index(
        &self,
        processor: Processor,
        address: u32,
        kind: AccessKind,
    ) -> Result<usize, WordRamError> {
        let t = self.translate(processor, address, kind).map_err(|e| {
            log(LogCategory::WordRam, LogLevel::Debug, || {
                format!("Word RAM: {} at {:06X}", e, address)
            });
            e
        })?;
        let physical = get_address(self.partition.mode, t.offset, t.bank)?;
        Ok((physical >> 1) as usize)
    }

    pub fn read_word(
        &self,
        processor: Processor,
        address: u32,
        kind: AccessKind,
    ) -> Result<u16, WordRamError> {
        Ok(self.words[self.word_index(processor, address, kind)?])
    }

    pub fn write_word(
        &mut self,
        processor: Processor,
        address: u32,
        kind: AccessKind,
        value: u16,
    ) -> Result<(), WordRamError> {
        let index = self.word_index(processor, address, kind)?;
        self.words[index] = value;
        Ok(())
    }

    /// Read one 4bpp pixel; `pixel` counts pixels from the window start
    pub fn read_pixel(&self, processor: Processor, pixel: u32) -> Result<u8, WordRamError> {
        let word = self.read_word(processor, pixel_word_address(pixel), AccessKind::Linear)?;
        Ok(extract_nibble(pixel, word))
    }

    /// Write one 4bpp pixel, subject to the priority mode. Returns whether
    /// the pixel was written.
    pub fn write_pixel(
        &mut self,
        processor: Processor,
        pixel: u32,
        value: u8,
    ) -> Result<bool, WordRamError> {
        let index = self.word_index(processor, pixel_word_address(pixel), AccessKind::Linear)?;
        let word = self.words[index];
        let value = value & 0xF;
        if !self.priority.allows(extract_nibble(pixel, word), value) {
            return Ok(false);
        }
        self.words[index] = insert_nibble(pixel, word, value);
        Ok(true)
    }

    /// Control port write to the memory mode register
    pub fn write_memory_mode(&mut self, value: u8) {
        let ret = value & 0x01 != 0;
        self.dmna = value & 0x02 != 0;
        let priority_bits = (value >> 3) & 3;
        if priority_bits == 3 {
            log(LogCategory::Stubs, LogLevel::Info, || {
                "Word RAM: reserved priority mode 3 treated as off".to_string()
            });
        }
        self.priority = PriorityMode::from_bits(priority_bits);

        if value & 0x04 != 0 {
            self.set_mode(WordRamMode::Split);
            self.set_swap_flag(ret);
        } else if ret {
            self.set_mode(WordRamMode::FullMain);
        } else {
            self.set_mode(WordRamMode::FullSub);
        }
    }

    /// Control port read of the memory mode register
    pub fn memory_mode(&self) -> u8 {
        let (mode_bit, ret, dmna) = match self.partition.mode {
            WordRamMode::FullMain => (0, true, false),
            WordRamMode::FullSub => (0, false, true),
            WordRamMode::Split => (1, self.partition.swap, self.dmna),
        };
        (self.priority.to_bits() << 3) | (mode_bit << 2) | (u8::from(dmna) << 1) | u8::from(ret)
    }

    /// Raw storage in physical order, for debuggers
    pub fn contents(&self) -> &[u16] {
        &self.words
    }

    /// Deserialized word RAM must cover the whole physical array
    pub fn has_full_storage(&self) -> bool {
        self.words.len() == WORD_RAM_WORDS
    }
}

impl Default for WordRam {
    fn default() -> Self {
        Self::new(WordRamMode::FullMain)
    }
}
