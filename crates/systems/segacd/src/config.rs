//! Sega CD configuration, loaded from JSON

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::SegaCdError;
use crate::translate::{Processor, WordRamMode};
use emu_core::cpu_ssp1601::RESET_VECTOR;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegaCdConfig {
    /// Which host processor's word RAM view the DSP uses
    pub dsp_context: Processor,
    /// DSP program counter after reset
    pub dsp_reset_vector: u16,
    /// Word RAM mode after reset
    pub initial_mode: WordRamMode,
}

impl Default for SegaCdConfig {
    fn default() -> Self {
        Self {
            dsp_context: Processor::Sub,
            dsp_reset_vector: RESET_VECTOR,
            initial_mode: WordRamMode::FullMain,
        }
    }
}

impl SegaCdConfig {
    pub fn from_json(text: &str) -> Result<Self, SegaCdError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SegaCdError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn to_json(&self) -> Result<String, SegaCdError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
