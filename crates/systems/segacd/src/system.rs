//! Sega CD word RAM + DSP system

use crate::bus::DspBus;
use crate::config::SegaCdConfig;
use crate::error::{SegaCdError, WordRamError};
use crate::snapshot::Snapshot;
use crate::translate::{self, AccessKind, Bank, Processor, Translation, WordRamMode};
use crate::word_ram::WordRam;
use emu_core::chip::Chip;
use emu_core::cpu_ssp1601::{Ssp1601, StepResult, HOST_PORT_XST, PROGRAM_WORDS};
use emu_core::logging::{log, LogCategory, LogLevel};
use emu_core::{MountPointInfo, System};
use serde::de::Error as _;
use serde_json::Value;

pub const PROGRAM_MOUNT_POINT: &str = "Program";

/// Word RAM shared by the main CPU, the sub CPU and an SSP1601 DSP.
///
/// The host CPUs are not emulated here; callers access word RAM on their
/// behalf through the `*_word` and `*_pixel` methods. The DSP reaches word
/// RAM through its external bus, so every access funnels through the same
/// [`WordRam`].
pub struct SegaCdSystem {
    dsp: Ssp1601<DspBus>,
    config: SegaCdConfig,
    program_loaded: bool,
}

impl SegaCdSystem {
    pub fn new() -> Self {
        Self::with_config(SegaCdConfig::default())
    }

    pub fn with_config(config: SegaCdConfig) -> Self {
        let bus = DspBus::new(WordRam::new(config.initial_mode), config.dsp_context);
        Self {
            dsp: Ssp1601::with_reset_vector(bus, config.dsp_reset_vector),
            config,
            program_loaded: false,
        }
    }

    pub fn config(&self) -> &SegaCdConfig {
        &self.config
    }

    pub fn dsp(&self) -> &Ssp1601<DspBus> {
        &self.dsp
    }

    pub fn dsp_mut(&mut self) -> &mut Ssp1601<DspBus> {
        &mut self.dsp
    }

    fn word_ram(&self) -> &WordRam {
        &self.dsp.memory.word_ram
    }

    fn word_ram_mut(&mut self) -> &mut WordRam {
        &mut self.dsp.memory.word_ram
    }

    /// Total DSP cycles since reset
    pub fn cycles(&self) -> u64 {
        self.dsp.cycles
    }

    /// Execute one DSP instruction
    pub fn step(&mut self) -> StepResult {
        let result = self.dsp.step();
        if let Some(fault) = result.fault {
            log(LogCategory::Dsp, LogLevel::Debug, || {
                format!("SSP: {} (PC now {:04X})", fault, self.dsp.regs.pc)
            });
        }
        result
    }

    /// Power-on state: DSP registers, internal RAM, word RAM mode and
    /// contents. The DSP program stays loaded.
    pub fn reset(&mut self) {
        self.dsp.reset();
        self.word_ram_mut().reset();
    }

    /// Parse a big-endian program image and load it at DSP address 0
    pub fn load_program(&mut self, data: &[u8]) -> Result<(), SegaCdError> {
        if data.len() % 2 != 0 {
            return Err(SegaCdError::InvalidProgram(format!(
                "odd image length {}",
                data.len()
            )));
        }
        if data.len() / 2 > PROGRAM_WORDS {
            return Err(SegaCdError::InvalidProgram(format!(
                "{} words exceed program memory",
                data.len() / 2
            )));
        }
        let words: Vec<u16> = data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Chip::init(&mut self.dsp, &words);
        self.word_ram_mut().reset();
        self.program_loaded = true;
        log(LogCategory::Dsp, LogLevel::Info, || {
            format!("SSP: loaded {} program words", words.len())
        });
        Ok(())
    }

    pub fn read_word(&self, processor: Processor, address: u32) -> Result<u16, WordRamError> {
        self.read_word_as(processor, address, AccessKind::Linear)
    }

    pub fn write_word(
        &mut self,
        processor: Processor,
        address: u32,
        value: u16,
    ) -> Result<(), WordRamError> {
        self.write_word_as(processor, address, AccessKind::Linear, value)
    }

    pub fn read_word_as(
        &self,
        processor: Processor,
        address: u32,
        kind: AccessKind,
    ) -> Result<u16, WordRamError> {
        self.word_ram().read_word(processor, address, kind)
    }

    pub fn write_word_as(
        &mut self,
        processor: Processor,
        address: u32,
        kind: AccessKind,
        value: u16,
    ) -> Result<(), WordRamError> {
        self.word_ram_mut().write_word(processor, address, kind, value)
    }

    pub fn read_pixel(&self, processor: Processor, pixel: u32) -> Result<u8, WordRamError> {
        self.word_ram().read_pixel(processor, pixel)
    }

    pub fn write_pixel(
        &mut self,
        processor: Processor,
        pixel: u32,
        value: u8,
    ) -> Result<bool, WordRamError> {
        self.word_ram_mut().write_pixel(processor, pixel, value)
    }

    pub fn mode(&self) -> WordRamMode {
        self.word_ram().mode()
    }

    pub fn swap_flag(&self) -> bool {
        self.word_ram().swap_flag()
    }

    pub fn set_mode(&mut self, mode: WordRamMode) {
        self.word_ram_mut().set_mode(mode);
    }

    pub fn set_swap_flag(&mut self, swap: bool) {
        self.word_ram_mut().set_swap_flag(swap);
    }

    pub fn write_memory_mode(&mut self, value: u8) {
        self.word_ram_mut().write_memory_mode(value);
    }

    pub fn memory_mode(&self) -> u8 {
        self.word_ram().memory_mode()
    }

    /// Bank `processor` currently resolves to
    pub fn get_bank(&self, processor: Processor, address: u32) -> Result<Bank, WordRamError> {
        translate::get_bank(self.word_ram().partition(), processor, address)
    }

    /// Physical byte address of `address` in `bank` under the current mode
    pub fn get_address(&self, address: u32, bank: Bank) -> Result<u32, WordRamError> {
        translate::get_address(self.mode(), address, bank)
    }

    pub fn translate(
        &self,
        processor: Processor,
        address: u32,
        kind: AccessKind,
    ) -> Result<Translation, WordRamError> {
        self.word_ram().translate(processor, address, kind)
    }

    /// Host side of the XST mailbox
    pub fn xst(&self) -> u16 {
        Chip::read(&self.dsp, HOST_PORT_XST)
    }

    pub fn set_xst(&mut self, value: u16) {
        Chip::write(&mut self.dsp, HOST_PORT_XST, value);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.dsp.state(), self.word_ram().clone())
    }

    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), SegaCdError> {
        snapshot
            .validate()
            .map_err(SegaCdError::IncompatibleSnapshot)?;
        self.dsp.restore_state(&snapshot.dsp);
        self.dsp.memory.word_ram = snapshot.word_ram.clone();
        Ok(())
    }
}

impl Default for SegaCdSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for SegaCdSystem {
    type Error = SegaCdError;

    fn reset(&mut self) {
        SegaCdSystem::reset(self);
    }

    fn run_cycles(&mut self, budget: u32) -> Result<u32, Self::Error> {
        if !self.program_loaded {
            return Err(SegaCdError::InvalidProgram("no program mounted".to_string()));
        }
        Ok(Chip::update(&mut self.dsp, budget))
    }

    fn save_state(&self) -> Value {
        serde_json::to_value(self.snapshot()).unwrap_or_else(|e| {
            log(LogCategory::Stubs, LogLevel::Error, || {
                format!("Sega CD: save state serialization failed: {}", e)
            });
            Value::Null
        })
    }

    fn load_state(&mut self, v: &Value) -> Result<(), serde_json::Error> {
        let snapshot: Snapshot = serde_json::from_value(v.clone())?;
        self.restore(&snapshot).map_err(serde_json::Error::custom)
    }

    fn supports_save_states(&self) -> bool {
        true
    }

    fn mount_points(&self) -> Vec<MountPointInfo> {
        vec![MountPointInfo {
            id: PROGRAM_MOUNT_POINT.to_string(),
            name: "DSP Program ROM".to_string(),
            extensions: vec!["bin".to_string(), "ssp".to_string()],
            required: true,
        }]
    }

    fn mount(&mut self, mount_point_id: &str, data: &[u8]) -> Result<(), Self::Error> {
        if mount_point_id != PROGRAM_MOUNT_POINT {
            return Err(SegaCdError::InvalidMountPoint);
        }
        self.load_program(data)
    }

    fn unmount(&mut self, mount_point_id: &str) -> Result<(), Self::Error> {
        if mount_point_id != PROGRAM_MOUNT_POINT {
            return Err(SegaCdError::InvalidMountPoint);
        }
        self.dsp.clear_program();
        self.program_loaded = false;
        SegaCdSystem::reset(self);
        Ok(())
    }

    fn is_mounted(&self, mount_point_id: &str) -> bool {
        mount_point_id == PROGRAM_MOUNT_POINT && self.program_loaded
    }
}
