//! Serializable machine state

use serde::{Deserialize, Serialize};

use crate::word_ram::{WordRam, WORD_RAM_WORDS};
use emu_core::cpu_ssp1601::Ssp1601State;

pub const SNAPSHOT_SYSTEM: &str = "segacd";
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything that changes while running. The DSP program ROM is not part
/// of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub system: String,
    pub version: u32,
    pub dsp: Ssp1601State,
    pub word_ram: WordRam,
}

impl Snapshot {
    pub fn new(dsp: Ssp1601State, word_ram: WordRam) -> Self {
        Self {
            system: SNAPSHOT_SYSTEM.to_string(),
            version: SNAPSHOT_VERSION,
            dsp,
            word_ram,
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.system == SNAPSHOT_SYSTEM && self.version == SNAPSHOT_VERSION
    }

    /// Check the tag and the shape of every component before restoring
    pub fn validate(&self) -> Result<(), String> {
        if !self.is_compatible() {
            return Err(format!(
                "expected {} v{}, got {} v{}",
                SNAPSHOT_SYSTEM, SNAPSHOT_VERSION, self.system, self.version
            ));
        }
        self.dsp.validate()?;
        if !self.word_ram.has_full_storage() {
            return Err(format!(
                "word RAM holds {} words, expected {}",
                self.word_ram.contents().len(),
                WORD_RAM_WORDS
            ));
        }
        Ok(())
    }
}
