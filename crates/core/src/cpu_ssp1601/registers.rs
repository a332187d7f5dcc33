//! SSP1601 register file: general registers, status word, call stack and
//! the eight RAM pointer registers.

use serde::{Deserialize, Serialize};

use super::alu::Flags;
use super::SspFault;
use crate::logging::{log, LogCategory, LogLevel};

/// Status register: repeat/modulo length (`RPL`)
pub const ST_RPL_MASK: u16 = 0x0007;
/// Status register: general purpose mode bits
pub const ST_MODE_MASK: u16 = 0x0060;
/// Status register: carry ("L" in the SSP manuals)
pub const ST_FLAG_L: u16 = 1 << 12;
/// Status register: zero
pub const ST_FLAG_Z: u16 = 1 << 13;
/// Status register: overflow
pub const ST_FLAG_V: u16 = 1 << 14;
/// Status register: negative
pub const ST_FLAG_N: u16 = 1 << 15;

const ST_FLAGS_MASK: u16 = ST_FLAG_L | ST_FLAG_Z | ST_FLAG_V | ST_FLAG_N;
/// Bits that survive a register write; the reserved ones read back as zero.
const ST_WRITABLE_MASK: u16 = ST_FLAGS_MASK | ST_MODE_MASK | ST_RPL_MASK;

/// Hardware call stack depth
pub const STACK_DEPTH: usize = 6;

/// Memory-mapped registers living outside the core (r8..r14)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtReg {
    Pm0,
    Pm1,
    Pm2,
    Pm3,
    Pm4,
    Xst,
    Pmc,
}

impl ExtReg {
    /// PM channel number for PM0..PM4
    pub fn pm_index(self) -> Option<usize> {
        match self {
            ExtReg::Pm0 => Some(0),
            ExtReg::Pm1 => Some(1),
            ExtReg::Pm2 => Some(2),
            ExtReg::Pm3 => Some(3),
            ExtReg::Pm4 => Some(4),
            ExtReg::Xst | ExtReg::Pmc => None,
        }
    }
}

/// General register selected by a 4-bit operand field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
    /// "-": reads as 0xFFFF, writes are discarded
    Blind,
    X,
    Y,
    /// Accumulator high half
    A,
    St,
    Stack,
    Pc,
    /// Product register (read-only)
    P,
    Ext(ExtReg),
    /// Accumulator low half
    Al,
}

impl TryFrom<u8> for Reg {
    type Error = SspFault;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Ok(match index {
            0 => Reg::Blind,
            1 => Reg::X,
            2 => Reg::Y,
            3 => Reg::A,
            4 => Reg::St,
            5 => Reg::Stack,
            6 => Reg::Pc,
            7 => Reg::P,
            8 => Reg::Ext(ExtReg::Pm0),
            9 => Reg::Ext(ExtReg::Pm1),
            10 => Reg::Ext(ExtReg::Pm2),
            11 => Reg::Ext(ExtReg::Pm3),
            12 => Reg::Ext(ExtReg::Pm4),
            13 => Reg::Ext(ExtReg::Xst),
            14 => Reg::Ext(ExtReg::Pmc),
            15 => Reg::Al,
            _ => return Err(SspFault::InvalidRegister(index)),
        })
    }
}

/// Auto-modify step applied to a pointer register after an indirect use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Modifier {
    #[default]
    None,
    PostIncrement,
    PostDecrement,
    /// +1 inside a `1 << RPL` window (circular buffers)
    PostIncrementModulo,
}

impl Modifier {
    /// Decode the 2-bit `m` field of an indirect operand
    pub fn from_bits(bits: u8) -> Self {
        match bits & 3 {
            0 => Modifier::None,
            1 => Modifier::PostIncrement,
            2 => Modifier::PostDecrement,
            _ => Modifier::PostIncrementModulo,
        }
    }
}

/// One of r0..r7
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PointerRegister {
    pub value: u8,
    pub modifier: Modifier,
}

impl PointerRegister {
    /// Apply the configured step. `rpl` is the modulo window exponent from ST.
    pub fn advance(&mut self, rpl: u16) {
        self.value = match self.modifier {
            Modifier::None => self.value,
            Modifier::PostIncrement => self.value.wrapping_add(1),
            Modifier::PostDecrement => self.value.wrapping_sub(1),
            Modifier::PostIncrementModulo => {
                if rpl == 0 {
                    self.value.wrapping_add(1)
                } else {
                    let mask = ((1u16 << rpl) - 1) as u8;
                    (self.value & !mask) | (self.value.wrapping_add(1) & mask)
                }
            }
        };
    }
}

/// Register state of the SSP1601
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    pub x: u16,
    pub y: u16,
    /// A:AL as one 32-bit value
    pub acc: u32,
    st: u16,
    pub pc: u16,
    stack: [u16; STACK_DEPTH],
    /// Number of occupied stack slots, wraps as a ring
    stack_ptr: usize,
    pub pointers: [PointerRegister; 8],
}

impl RegisterFile {
    pub fn new(pc: u16) -> Self {
        Self {
            x: 0,
            y: 0,
            acc: 0,
            st: 0,
            pc,
            stack: [0; STACK_DEPTH],
            stack_ptr: 0,
            pointers: [PointerRegister::default(); 8],
        }
    }

    /// Accumulator high half
    pub fn a(&self) -> u16 {
        (self.acc >> 16) as u16
    }

    pub fn set_a(&mut self, value: u16) {
        self.acc = (self.acc & 0x0000_FFFF) | ((value as u32) << 16);
    }

    /// Accumulator low half
    pub fn al(&self) -> u16 {
        self.acc as u16
    }

    pub fn set_al(&mut self, value: u16) {
        self.acc = (self.acc & 0xFFFF_0000) | value as u32;
    }

    pub fn st(&self) -> u16 {
        self.st
    }

    /// Register write to ST; reserved bits are cleared.
    pub fn set_st(&mut self, value: u16) {
        self.st = value & ST_WRITABLE_MASK;
    }

    pub fn rpl(&self) -> u16 {
        self.st & ST_RPL_MASK
    }

    pub fn flags(&self) -> Flags {
        Flags::from_status(self.st)
    }

    /// Replace the four condition flags, leaving mode bits alone
    pub fn set_flags(&mut self, flags: Flags) {
        self.st = (self.st & !ST_FLAGS_MASK) | flags.to_status();
    }

    /// 32-bit product of the signed X and Y registers, doubled
    pub fn product(&self) -> u32 {
        ((self.x as i16 as i32) * (self.y as i16 as i32)).wrapping_mul(2) as u32
    }

    pub fn push(&mut self, value: u16) {
        if self.stack_ptr >= STACK_DEPTH {
            log(LogCategory::Dsp, LogLevel::Warn, || {
                format!("SSP: call stack overflow at PC={:04X}", self.pc)
            });
            self.stack_ptr = 0;
        }
        self.stack[self.stack_ptr] = value;
        self.stack_ptr += 1;
    }

    pub fn pop(&mut self) -> u16 {
        if self.stack_ptr == 0 {
            log(LogCategory::Dsp, LogLevel::Warn, || {
                format!("SSP: call stack underflow at PC={:04X}", self.pc)
            });
            self.stack_ptr = STACK_DEPTH;
        }
        self.stack_ptr -= 1;
        self.stack[self.stack_ptr]
    }

    pub fn stack_depth(&self) -> usize {
        self.stack_ptr
    }

    /// Restored state can carry a stack pointer past the end of the stack
    pub fn stack_in_range(&self) -> bool {
        self.stack_ptr <= STACK_DEPTH
    }

    /// Read a register that lives in the core.
    ///
    /// Has side effects: reading STACK pops it. External registers are
    /// resolved by the PM unit; here they read as open bus.
    pub fn read(&mut self, reg: Reg) -> u16 {
        match reg {
            Reg::Blind => 0xFFFF,
            Reg::X => self.x,
            Reg::Y => self.y,
            Reg::A => self.a(),
            Reg::St => self.st,
            Reg::Stack => self.pop(),
            Reg::Pc => self.pc,
            Reg::P => (self.product() >> 16) as u16,
            Reg::Al => self.al(),
            Reg::Ext(_) => 0xFFFF,
        }
    }

    /// Write a register that lives in the core.
    pub fn write(&mut self, reg: Reg, value: u16) {
        match reg {
            Reg::Blind => {}
            Reg::X => self.x = value,
            Reg::Y => self.y = value,
            Reg::A => self.set_a(value),
            Reg::St => self.set_st(value),
            Reg::Stack => self.push(value),
            Reg::Pc => self.pc = value,
            Reg::P => {
                log(LogCategory::Dsp, LogLevel::Debug, || {
                    format!("SSP: write {:04X} to read-only P ignored", value)
                });
            }
            Reg::Al => self.set_al(value),
            Reg::Ext(_) => {}
        }
    }

    /// Read by raw index, for debuggers and the bus layer
    pub fn read_index(&mut self, index: u8) -> Result<u16, SspFault> {
        Ok(self.read(Reg::try_from(index)?))
    }

    /// Write by raw index, for debuggers and the bus layer
    pub fn write_index(&mut self, index: u8, value: u16) -> Result<(), SspFault> {
        self.write(Reg::try_from(index)?, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_index_range() {
        assert_eq!(Reg::try_from(3), Ok(Reg::A));
        assert_eq!(Reg::try_from(13), Ok(Reg::Ext(ExtReg::Xst)));
        assert_eq!(Reg::try_from(15), Ok(Reg::Al));
        assert_eq!(Reg::try_from(16), Err(SspFault::InvalidRegister(16)));

        let mut regs = RegisterFile::new(0);
        assert_eq!(regs.write_index(42, 1), Err(SspFault::InvalidRegister(42)));
        assert_eq!(regs.read_index(200), Err(SspFault::InvalidRegister(200)));
    }

    #[test]
    fn test_accumulator_halves() {
        let mut regs = RegisterFile::new(0);
        regs.write(Reg::A, 0x1234);
        regs.write(Reg::Al, 0x5678);
        assert_eq!(regs.acc, 0x1234_5678);
        assert_eq!(regs.read(Reg::A), 0x1234);
        assert_eq!(regs.read(Reg::Al), 0x5678);
    }

    #[test]
    fn test_status_write_clears_reserved_bits() {
        let mut regs = RegisterFile::new(0);
        regs.write(Reg::St, 0xFFFF);
        assert_eq!(regs.st(), 0xF067);
        assert_eq!(regs.rpl(), 7);
        assert!(regs.flags().zero);
    }

    #[test]
    fn test_blind_register() {
        let mut regs = RegisterFile::new(0);
        regs.write(Reg::Blind, 0x1234);
        assert_eq!(regs.read(Reg::Blind), 0xFFFF);
    }

    #[test]
    fn test_product_is_signed_and_doubled() {
        let mut regs = RegisterFile::new(0);
        regs.x = 0xFFFE; // -2
        regs.y = 3;
        assert_eq!(regs.product(), (-12i32) as u32);
        assert_eq!(regs.read(Reg::P), 0xFFFF);
        regs.write(Reg::P, 0);
        assert_eq!(regs.product(), (-12i32) as u32);
    }

    #[test]
    fn test_stack_push_pop_through_register() {
        let mut regs = RegisterFile::new(0);
        regs.write(Reg::Stack, 0x0100);
        regs.write(Reg::Stack, 0x0200);
        assert_eq!(regs.stack_depth(), 2);
        assert_eq!(regs.read(Reg::Stack), 0x0200);
        assert_eq!(regs.read(Reg::Stack), 0x0100);
        assert_eq!(regs.stack_depth(), 0);
    }

    #[test]
    fn test_stack_wraps_as_ring() {
        let mut regs = RegisterFile::new(0);
        for i in 0..=STACK_DEPTH as u16 {
            regs.push(i);
        }
        // The seventh push overwrote slot 0
        assert_eq!(regs.stack_depth(), 1);
        assert_eq!(regs.pop(), STACK_DEPTH as u16);
        // Underflow wraps to the top of the ring
        assert_eq!(regs.pop(), (STACK_DEPTH - 1) as u16);
    }

    #[test]
    fn test_pointer_modifiers() {
        let mut p = PointerRegister {
            value: 0x10,
            modifier: Modifier::PostIncrement,
        };
        p.advance(0);
        assert_eq!(p.value, 0x11);

        p.modifier = Modifier::PostDecrement;
        p.advance(0);
        p.advance(0);
        assert_eq!(p.value, 0x0F);

        p.modifier = Modifier::None;
        p.advance(3);
        assert_eq!(p.value, 0x0F);
    }

    #[test]
    fn test_pointer_modulo_wraps_in_window() {
        let mut p = PointerRegister {
            value: 0x23,
            modifier: Modifier::PostIncrementModulo,
        };
        // RPL = 2: 4-entry window 0x20..0x23
        p.advance(2);
        assert_eq!(p.value, 0x20);
        p.advance(2);
        assert_eq!(p.value, 0x21);

        // RPL = 0 falls back to a plain increment
        p.value = 0xFF;
        p.advance(0);
        assert_eq!(p.value, 0x00);
    }
}
