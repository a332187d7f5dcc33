//! Sega CD word RAM and SVP-class DSP emulation
//!
//! This crate models the shared word RAM of the Sega CD and an SSP1601 DSP
//! that reaches it over its external bus.
//!
//! # Architecture
//!
//! - **Word RAM**: 256 KiB, 2M (one owner) or 1M (one bank per CPU) mode
//! - **Translator**: (mode, CPU, address) -> bank and physical offset,
//!   linear or cell-arranged
//! - **Nibble unit**: 4bpp pixel access with write priority modes
//! - **DSP**: Samsung SSP1601, see `emu_core::cpu_ssp1601`
//!
//! The main and sub CPUs themselves are not emulated; their word RAM
//! accesses arrive through [`SegaCdSystem`].

mod bus;
pub mod config;
pub mod error;
pub mod nibble;
pub mod snapshot;
mod system;
pub mod translate;
pub mod word_ram;

pub use bus::DspBus;
pub use config::SegaCdConfig;
pub use error::{SegaCdError, WordRamError};
pub use snapshot::Snapshot;
pub use system::{SegaCdSystem, PROGRAM_MOUNT_POINT};
pub use translate::{AccessKind, Bank, Partition, Processor, Translation, WordRamMode};
