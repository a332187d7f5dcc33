//! Programmable memory (PM) channels behind r8..r14.
//!
//! PMC is a two-phase latch (address word, then mode word). Once both halves
//! are written, the next blind access to PMx turns the latched value into
//! that register's read or write channel. A programmed channel transfers a
//! word over the external bus on every access and then steps its address.

use serde::{Deserialize, Serialize};

/// External addresses are 21-bit word addresses
pub const EXTERNAL_ADDRESS_MASK: u32 = 0x1F_FFFF;

/// Address step encoded in mode bits 13..11, sign in bit 15
pub fn increment_for(mode: u16) -> i32 {
    let sel = (mode >> 11) & 7;
    if sel == 0 {
        return 0;
    }
    let shift = if sel == 7 { 7 } else { sel - 1 };
    let inc = 1i32 << shift;
    if mode & 0x8000 != 0 {
        -inc
    } else {
        inc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PmChannel {
    pub address: u32,
    pub increment: i32,
    pub active: bool,
}

impl PmChannel {
    /// Build a channel from a full PMC value (mode in the high half)
    pub fn from_pmc(value: u32) -> Self {
        let mode = (value >> 16) as u16;
        Self {
            address: (value & 0xFFFF) | (((mode & 0x1F) as u32) << 16),
            increment: increment_for(mode),
            active: true,
        }
    }

    pub fn advance(&mut self) {
        self.address = (self.address as i64 + self.increment as i64) as u32 & EXTERNAL_ADDRESS_MASK;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PmUnit {
    pmc: u32,
    /// Next PMC access targets the mode (high) half
    pmc_mode_phase: bool,
    /// Both PMC halves written; the next blind PMx access programs a channel
    programming: bool,
    pub read: [PmChannel; 5],
    pub write: [PmChannel; 5],
    /// Plain register contents of unprogrammed PMx
    pub latch: [u16; 5],
}

impl PmUnit {
    pub fn pmc(&self) -> u32 {
        self.pmc
    }

    pub fn is_programming(&self) -> bool {
        self.programming
    }

    pub fn read_pmc(&mut self) -> u16 {
        let value = if self.pmc_mode_phase {
            (self.pmc >> 16) as u16
        } else {
            self.pmc as u16
        };
        self.pmc_mode_phase = !self.pmc_mode_phase;
        value
    }

    pub fn write_pmc(&mut self, value: u16) {
        if self.pmc_mode_phase {
            self.pmc = (self.pmc & 0x0000_FFFF) | ((value as u32) << 16);
            self.programming = true;
        } else {
            self.pmc = (self.pmc & 0xFFFF_0000) | value as u32;
        }
        self.pmc_mode_phase = !self.pmc_mode_phase;
    }

    /// Consume the latched PMC value into channel `index`
    pub fn program(&mut self, index: usize, for_write: bool) {
        let channel = PmChannel::from_pmc(self.pmc);
        if for_write {
            self.write[index] = channel;
        } else {
            self.read[index] = channel;
        }
        self.programming = false;
    }
}
