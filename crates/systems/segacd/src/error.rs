//! Sega CD error types

use crate::translate::{Bank, Processor, WordRamMode};
use emu_core::cpu_ssp1601::SspFault;
use thiserror::Error;

/// Word RAM arbitration failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WordRamError {
    #[error("{processor:?} CPU denied word RAM access in {mode:?} mode")]
    AccessDenied { processor: Processor, mode: WordRamMode },
    #[error("word RAM address {0:06X} out of range")]
    OutOfRangeAddress(u32),
    #[error("bank {bank:?} does not exist in {mode:?} mode")]
    InvalidBank { bank: Bank, mode: WordRamMode },
}

impl WordRamError {
    /// Same failure as seen from the DSP's external bus
    pub fn to_fault(self, address: u32) -> SspFault {
        match self {
            WordRamError::AccessDenied { .. } => SspFault::AccessDenied { address },
            WordRamError::OutOfRangeAddress(_) | WordRamError::InvalidBank { .. } => {
                SspFault::OutOfRangeAddress { address }
            }
        }
    }
}

/// Sega CD emulator errors
#[derive(Debug, Error)]
pub enum SegaCdError {
    #[error("Invalid mount point")]
    InvalidMountPoint,
    #[error("Invalid DSP program: {0}")]
    InvalidProgram(String),
    #[error("Incompatible save state: {0}")]
    IncompatibleSnapshot(String),
    #[error(transparent)]
    WordRam(#[from] WordRamError),
    #[error("DSP fault: {0}")]
    Dsp(#[from] SspFault),
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_mapping() {
        let denied = WordRamError::AccessDenied {
            processor: Processor::Sub,
            mode: WordRamMode::FullMain,
        };
        assert_eq!(
            denied.to_fault(0x1234),
            SspFault::AccessDenied { address: 0x1234 }
        );
        assert_eq!(
            WordRamError::OutOfRangeAddress(0x9_0000).to_fault(0x4_8000),
            SspFault::OutOfRangeAddress { address: 0x4_8000 }
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: SegaCdError = WordRamError::OutOfRangeAddress(0x80000).into();
        assert!(matches!(
            err,
            SegaCdError::WordRam(WordRamError::OutOfRangeAddress(0x80000))
        ));
        assert_eq!(err.to_string(), "word RAM address 080000 out of range");
    }
}
