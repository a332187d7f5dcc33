//! Word RAM bank translation
//!
//! Pure functions mapping (partition, requesting CPU, logical address) to a
//! bank and offset, and (mode, offset, bank) to a byte address in the one
//! physical 256 KiB array. Nothing here is cached; callers pass the live
//! partition on every access.
//!
//! Physical layout: in 2M mode byte offset `o` is word `o >> 1`. In 1M mode
//! the two banks are word-interleaved, so bank `b` offset `o` is word
//! `((o >> 1) << 1) | b`. Switching modes therefore never moves data.

use serde::{Deserialize, Serialize};

use crate::error::WordRamError;

/// Total word RAM size in bytes
pub const WORD_RAM_SIZE: u32 = 0x40000;
/// Size of one 1M bank (and of one cell-arranged span) in bytes
pub const BANK_SIZE: u32 = 0x20000;
/// Largest logical window either CPU maps; anything past it is not word RAM
pub const ADDRESS_WINDOW: u32 = 0x80000;

/// Word RAM partition mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WordRamMode {
    /// 2M, main CPU owns everything
    #[default]
    FullMain,
    /// 2M, sub CPU owns everything
    FullSub,
    /// 1M, one bank per CPU
    Split,
}

impl WordRamMode {
    /// Exclusive owner in 2M mode
    pub fn owner(self) -> Option<Processor> {
        match self {
            WordRamMode::FullMain => Some(Processor::Main),
            WordRamMode::FullSub => Some(Processor::Sub),
            WordRamMode::Split => None,
        }
    }

    /// Bytes visible to one processor
    pub fn capacity(self) -> u32 {
        match self {
            WordRamMode::Split => BANK_SIZE,
            _ => WORD_RAM_SIZE,
        }
    }
}

/// Requesting host processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Processor {
    Main,
    Sub,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bank {
    /// The whole array (2M mode)
    Whole,
    Bank0,
    Bank1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessKind {
    #[default]
    Linear,
    /// Cell-arranged view used for bitmap to tile conversion
    Cell,
}

/// Live mode and swap flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Partition {
    pub mode: WordRamMode,
    /// 1M only: main CPU sees bank 1 when set
    pub swap: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    pub bank: Bank,
    pub offset: u32,
}

fn check_range(address: u32) -> Result<(), WordRamError> {
    if address >= ADDRESS_WINDOW {
        return Err(WordRamError::OutOfRangeAddress(address));
    }
    Ok(())
}

/// Bank a processor resolves to under `partition`
pub fn get_bank(
    partition: Partition,
    processor: Processor,
    address: u32,
) -> Result<Bank, WordRamError> {
    check_range(address)?;
    match partition.mode.owner() {
        Some(owner) if owner == processor => Ok(Bank::Whole),
        Some(_) => Err(WordRamError::AccessDenied {
            processor,
            mode: partition.mode,
        }),
        None => {
            let bank1 = match processor {
                Processor::Main => partition.swap,
                Processor::Sub => !partition.swap,
            };
            Ok(if bank1 { Bank::Bank1 } else { Bank::Bank0 })
        }
    }
}

/// Full translation of one access
pub fn translate(
    partition: Partition,
    processor: Processor,
    address: u32,
    kind: AccessKind,
) -> Result<Translation, WordRamError> {
    let bank = get_bank(partition, processor, address)?;
    let offset = address % partition.mode.capacity();
    let offset = match kind {
        AccessKind::Linear => offset,
        // Each 128 KiB span is arranged independently
        AccessKind::Cell => (offset & BANK_SIZE) | cell_offset(offset & (BANK_SIZE - 1)),
    };
    Ok(Translation { bank, offset })
}

/// Physical byte address of `address` within `bank`
pub fn get_address(mode: WordRamMode, address: u32, bank: Bank) -> Result<u32, WordRamError> {
    check_range(address)?;
    match (mode, bank) {
        (WordRamMode::FullMain | WordRamMode::FullSub, Bank::Whole) => {
            Ok(address % WORD_RAM_SIZE)
        }
        (WordRamMode::Split, Bank::Bank0 | Bank::Bank1) => {
            let offset = address % BANK_SIZE;
            let b = u32::from(bank == Bank::Bank1);
            Ok(((offset >> 1) << 2) | (b << 1) | (offset & 1))
        }
        _ => Err(WordRamError::InvalidBank { bank, mode }),
    }
}

/// (first 4-byte unit, width in cells) of the strip holding `unit`
fn cell_strip(unit: u32) -> (u32, u32) {
    match unit {
        0x0000..=0x3FFF => (0x0000, 64),
        0x4000..=0x5FFF => (0x4000, 32),
        0x6000..=0x6FFF => (0x6000, 16),
        0x7000..=0x77FF => (0x7000, 8),
        _ => (0x7800, 8),
    }
}

/// Remap an offset inside one 128 KiB span from cell order to dot order.
///
/// The span is cut into strips 32 cells tall. A cell is 8 lines of one
/// 4-byte unit (8 pixels at 4bpp). In cell order the units of a cell are
/// consecutive and cells run down each column of the strip; in dot order
/// each pixel row of the strip is contiguous.
pub fn cell_offset(offset: u32) -> u32 {
    let unit = (offset >> 2) & 0x7FFF;
    let (base, width) = cell_strip(unit);
    let u = unit - base;
    let cell = u >> 3;
    let line = u & 7;
    let col = cell >> 5;
    let row = cell & 31;
    let dot = (row * 8 + line) * width + col;
    ((base + dot) << 2) | (offset & 3)
}
