//! Nibble addressing for 4bpp pixel access.
//!
//! Four pixels share one 16-bit word. Slot `3 - (address & 3)` holds the
//! pixel, slot 0 being the most significant nibble, which puts the active
//! nibble at bit `(address & 3) * 4`.

use serde::{Deserialize, Serialize};

/// Pixel write priority (memory mode register bits 4..3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriorityMode {
    #[default]
    Off,
    /// Only write over transparent (zero) pixels
    Underwrite,
    /// Only write non-zero pixels
    Overwrite,
}

impl PriorityMode {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            1 => PriorityMode::Underwrite,
            2 => PriorityMode::Overwrite,
            _ => PriorityMode::Off,
        }
    }

    pub fn to_bits(self) -> u8 {
        match self {
            PriorityMode::Off => 0,
            PriorityMode::Underwrite => 1,
            PriorityMode::Overwrite => 2,
        }
    }

    /// Whether a pixel write of `new` over `old` goes through
    pub fn allows(self, old: u8, new: u8) -> bool {
        match self {
            PriorityMode::Off => true,
            PriorityMode::Underwrite => old == 0,
            PriorityMode::Overwrite => new != 0,
        }
    }
}

/// Bit position of the nibble selected by `address`
fn nibble_shift(address: u32) -> u32 {
    (address & 3) * 4
}

pub fn extract_nibble(address: u32, word: u16) -> u8 {
    ((word >> nibble_shift(address)) & 0xF) as u8
}

pub fn insert_nibble(address: u32, word: u16, nibble: u8) -> u16 {
    let shift = nibble_shift(address);
    (word & !(0xF << shift)) | (((nibble & 0xF) as u16) << shift)
}

/// Byte address of the word holding pixel `pixel`
pub fn pixel_word_address(pixel: u32) -> u32 {
    (pixel >> 2) << 1
}
