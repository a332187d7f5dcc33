//! Samsung SSP1601 DSP core (SVP-class cartridge coprocessor)
//!
//! A 16-bit fixed-point DSP with a 32-bit accumulator, a hardware multiplier,
//! two 256-word internal RAM banks addressed through eight pointer registers,
//! and programmable memory (PM) channels that stream words to and from the
//! host's shared memory.
//!
//! # Register map
//!
//! | idx | name  | notes |
//! |-----|-------|-------|
//! | 0   | `-`   | reads 0xFFFF, writes discarded |
//! | 1,2 | X, Y  | multiplier inputs |
//! | 3   | A     | accumulator high half |
//! | 4   | ST    | flags L/Z/V/N in bits 12..15, RPL in bits 0..2 |
//! | 5   | STACK | write pushes, read pops |
//! | 6   | PC    | |
//! | 7   | P     | `X * Y * 2`, read-only |
//! | 8-12| PM0-4 | external channels |
//! | 13  | XST   | host mailbox |
//! | 14  | PMC   | PM programming latch |
//! | 15  | AL    | accumulator low half |
//!
//! External data accesses go through [`MemorySsp1601`]; the host decides what
//! an external address means and whether the access is allowed.

pub mod alu;
pub mod decode;
pub mod pm;
pub mod registers;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chip::Chip;
use crate::logging::{log, LogCategory, LogLevel};
use alu::{AluOp, Flags, Operand};
use decode::{decode, Condition, Instruction, MacOp, PtrRef, Source, Target};
use pm::PmUnit;
use registers::{ExtReg, Modifier, Reg, RegisterFile};

/// Default entry point after reset
pub const RESET_VECTOR: u16 = 0x0400;
/// Program memory size in words
pub const PROGRAM_WORDS: usize = 0x10000;
/// Words per internal RAM bank
pub const RAM_BANK_WORDS: usize = 256;

/// Host port carrying the XST mailbox
pub const HOST_PORT_XST: u16 = 0;
/// Host port mirroring ST (read-only)
pub const HOST_PORT_STATUS: u16 = 1;

/// Faults reported by [`Ssp1601::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SspFault {
    #[error("reserved opcode {opcode:04X} at PC={pc:04X}")]
    InvalidInstruction { opcode: u16, pc: u16 },
    #[error("register index {0} out of range")]
    InvalidRegister(u8),
    #[error("external access to {address:06X} denied")]
    AccessDenied { address: u32 },
    #[error("external address {address:06X} out of range")]
    OutOfRangeAddress { address: u32 },
}

/// External bus as seen by the DSP. Addresses are 21-bit word addresses.
pub trait MemorySsp1601 {
    fn read_external(&mut self, addr: u32) -> Result<u16, SspFault>;

    fn write_external(&mut self, addr: u32, val: u16) -> Result<(), SspFault>;
}

/// Cycles consumed by one instruction and the fault it raised, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    pub cycles: u32,
    pub fault: Option<SspFault>,
}

/// Serializable DSP state (program memory excluded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ssp1601State {
    pub regs: RegisterFile,
    pub ram: Vec<u16>,
    pub pm: PmUnit,
    pub xst: u16,
    pub cycles: u64,
}

impl Ssp1601State {
    /// Reject state whose shape the core cannot run from
    pub fn validate(&self) -> Result<(), String> {
        if self.ram.len() != RAM_BANK_WORDS * 2 {
            return Err(format!(
                "internal RAM holds {} words, expected {}",
                self.ram.len(),
                RAM_BANK_WORDS * 2
            ));
        }
        if !self.regs.stack_in_range() {
            return Err(format!(
                "stack pointer {} exceeds depth {}",
                self.regs.stack_depth(),
                registers::STACK_DEPTH
            ));
        }
        Ok(())
    }
}

/// SSP1601 CPU state
#[derive(Debug)]
pub struct Ssp1601<M: MemorySsp1601> {
    pub regs: RegisterFile,
    /// Both internal RAM banks, bank 1 at offset 256
    ram: Vec<u16>,
    pub pm: PmUnit,
    /// Host mailbox
    pub xst: u16,
    program: Vec<u16>,
    reset_vector: u16,
    /// Total cycles executed
    pub cycles: u64,

    fault: Option<SspFault>,
    bus_cycles: u32,

    /// External bus
    pub memory: M,
}

impl<M: MemorySsp1601> Ssp1601<M> {
    pub fn new(memory: M) -> Self {
        Self::with_reset_vector(memory, RESET_VECTOR)
    }

    pub fn with_reset_vector(memory: M, reset_vector: u16) -> Self {
        Self {
            regs: RegisterFile::new(reset_vector),
            ram: vec![0; RAM_BANK_WORDS * 2],
            pm: PmUnit::default(),
            xst: 0,
            program: vec![0; PROGRAM_WORDS],
            reset_vector,
            cycles: 0,
            fault: None,
            bus_cycles: 0,
            memory,
        }
    }

    /// Reinitialise registers, internal RAM and PM channels. Program memory
    /// is ROM and survives.
    pub fn reset(&mut self) {
        self.regs = RegisterFile::new(self.reset_vector);
        self.ram.fill(0);
        self.pm = PmUnit::default();
        self.xst = 0;
        self.cycles = 0;
        self.fault = None;
        self.bus_cycles = 0;
    }

    /// Copy program words starting at `base`; anything past the end of
    /// program memory is dropped.
    pub fn load_program(&mut self, base: u16, words: &[u16]) {
        let start = base as usize;
        let room = PROGRAM_WORDS - start;
        if words.len() > room {
            log(LogCategory::Dsp, LogLevel::Warn, || {
                format!(
                    "SSP: program of {} words at {:04X} truncated to {}",
                    words.len(),
                    base,
                    room
                )
            });
        }
        let n = words.len().min(room);
        self.program[start..start + n].copy_from_slice(&words[..n]);
    }

    pub fn clear_program(&mut self) {
        self.program.fill(0);
    }

    pub fn program_word(&self, addr: u16) -> u16 {
        self.program[addr as usize]
    }

    pub fn ram(&self, bank: usize, addr: u8) -> u16 {
        self.ram[(bank & 1) * RAM_BANK_WORDS + addr as usize]
    }

    pub fn set_ram(&mut self, bank: usize, addr: u8, value: u16) {
        self.ram[(bank & 1) * RAM_BANK_WORDS + addr as usize] = value;
    }

    pub fn state(&self) -> Ssp1601State {
        Ssp1601State {
            regs: self.regs.clone(),
            ram: self.ram.clone(),
            pm: self.pm.clone(),
            xst: self.xst,
            cycles: self.cycles,
        }
    }

    /// Apply a state produced by [`Ssp1601::state`]. The caller is expected
    /// to have checked it with [`Ssp1601State::validate`].
    pub fn restore_state(&mut self, state: &Ssp1601State) {
        self.regs = state.regs.clone();
        self.ram = state.ram.clone();
        self.ram.resize(RAM_BANK_WORDS * 2, 0);
        self.pm = state.pm.clone();
        self.xst = state.xst;
        self.cycles = state.cycles;
    }

    /// Decode and execute exactly one instruction
    pub fn step(&mut self) -> StepResult {
        self.fault = None;
        self.bus_cycles = 0;

        let pc = self.regs.pc;
        let op = self.program_word(pc);
        let next = self.program_word(pc.wrapping_add(1));

        let cycles = match decode(op, next, pc) {
            Ok(decoded) => {
                log(LogCategory::Dsp, LogLevel::Trace, || {
                    format!(
                        "SSP {:04X}: {:04X} {:?} ({:?})",
                        pc,
                        op,
                        decoded.instruction,
                        decoded.instruction.class()
                    )
                });
                self.regs.pc = pc.wrapping_add(decoded.len);
                let branch = self.execute(decoded.instruction);
                decoded.len as u32 + branch + self.bus_cycles
            }
            Err(fault) => {
                log(LogCategory::Dsp, LogLevel::Warn, || format!("SSP: {}", fault));
                self.regs.pc = pc.wrapping_add(1);
                self.record_fault(fault);
                1
            }
        };

        self.cycles += cycles as u64;
        StepResult {
            cycles,
            fault: self.fault.take(),
        }
    }

    fn record_fault(&mut self, fault: SspFault) {
        self.fault.get_or_insert(fault);
    }

    fn bus_read(&mut self, addr: u32) -> u16 {
        self.bus_cycles += 1;
        match self.memory.read_external(addr) {
            Ok(value) => value,
            Err(fault) => {
                self.record_fault(fault);
                0
            }
        }
    }

    fn bus_write(&mut self, addr: u32, value: u16) {
        self.bus_cycles += 1;
        if let Err(fault) = self.memory.write_external(addr, value) {
            self.record_fault(fault);
        }
    }

    /// RAM index for an indirect reference, stepping the pointer afterwards
    fn pointer_address(&mut self, ptr: PtrRef) -> usize {
        let base = ptr.bank() * RAM_BANK_WORDS;
        if ptr.is_direct() {
            return base + ptr.mode as usize;
        }
        let rpl = self.regs.rpl();
        let reg = &mut self.regs.pointers[ptr.index as usize];
        reg.modifier = Modifier::from_bits(ptr.mode);
        let addr = reg.value;
        reg.advance(rpl);
        base + addr as usize
    }

    fn read_reg(&mut self, index: u8) -> u16 {
        match Reg::try_from(index) {
            Ok(Reg::Ext(ext)) => self.read_external_reg(ext),
            Ok(reg) => self.regs.read(reg),
            Err(fault) => {
                self.record_fault(fault);
                0xFFFF
            }
        }
    }

    fn write_reg(&mut self, index: u8, value: u16) {
        match Reg::try_from(index) {
            Ok(Reg::Ext(ext)) => self.write_external_reg(ext, value),
            Ok(reg) => self.regs.write(reg, value),
            Err(fault) => self.record_fault(fault),
        }
    }

    fn read_external_reg(&mut self, ext: ExtReg) -> u16 {
        match ext {
            ExtReg::Xst => self.xst,
            ExtReg::Pmc => self.pm.read_pmc(),
            _ => {
                let Some(i) = ext.pm_index() else { return 0xFFFF };
                let channel = self.pm.read[i];
                if channel.active {
                    let value = self.bus_read(channel.address);
                    self.pm.read[i].advance();
                    value
                } else {
                    self.pm.latch[i]
                }
            }
        }
    }

    fn write_external_reg(&mut self, ext: ExtReg, value: u16) {
        match ext {
            ExtReg::Xst => self.xst = value,
            ExtReg::Pmc => self.pm.write_pmc(value),
            _ => {
                let Some(i) = ext.pm_index() else { return };
                let channel = self.pm.write[i];
                if channel.active {
                    self.bus_write(channel.address, value);
                    self.pm.write[i].advance();
                } else {
                    self.pm.latch[i] = value;
                }
            }
        }
    }

    /// `ld -, PMx` programs a read channel, `ld PMx, -` a write channel.
    fn try_program_pm(&mut self, dst: u8, src: u8) -> bool {
        let pm_of = |index: u8| match Reg::try_from(index) {
            Ok(Reg::Ext(ext)) => ext.pm_index(),
            _ => None,
        };
        match (dst, src) {
            (0, s) => match pm_of(s) {
                Some(i) => {
                    self.pm.program(i, false);
                    true
                }
                None => false,
            },
            (d, 0) => match pm_of(d) {
                Some(i) => {
                    self.pm.program(i, true);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn read_source(&mut self, src: Source) -> u16 {
        match src {
            Source::Reg(index) => self.read_reg(index),
            Source::Ptr(ptr) => {
                let addr = self.pointer_address(ptr);
                self.ram[addr]
            }
            Source::DoublePtr(ptr) => {
                // The RAM word is an external address and is post-incremented
                let addr = self.pointer_address(ptr);
                let external = self.ram[addr];
                self.ram[addr] = external.wrapping_add(1);
                self.bus_read(external as u32)
            }
            Source::Direct { bank, addr } => self.ram(bank as usize, addr),
            Source::Imm(value) => value,
            Source::ShortImm(value) => value as u16,
            Source::PtrValue(index) => self.regs.pointers[(index & 7) as usize].value as u16,
            Source::ProgramAtA => self.program_word(self.regs.a()),
        }
    }

    fn condition(&self, cond: Condition) -> bool {
        let f = self.regs.flags();
        match cond {
            Condition::Always => true,
            Condition::Never => false,
            Condition::Carry => f.carry,
            Condition::NoCarry => !f.carry,
            Condition::Equal => f.zero,
            Condition::NotEqual => !f.zero,
            Condition::Overflow => f.overflow,
            Condition::NoOverflow => !f.overflow,
            Condition::Negative => f.negative,
            Condition::NonNegative => !f.negative,
        }
    }

    /// Execute a decoded instruction; returns extra cycles for a taken branch.
    /// The source operand is always fully resolved before the destination is
    /// written.
    fn execute(&mut self, instruction: Instruction) -> u32 {
        match instruction {
            Instruction::Nop => {}
            Instruction::Load { dst, src } => {
                if let Source::Reg(s) = src {
                    if self.pm.is_programming() && self.try_program_pm(dst, s) {
                        return 0;
                    }
                }
                let value = self.read_source(src);
                self.write_reg(dst, value);
            }
            Instruction::StorePtr { ptr, src } => {
                let value = self.read_source(src);
                let addr = self.pointer_address(ptr);
                self.ram[addr] = value;
            }
            Instruction::StoreDirect { bank, addr } => {
                let a = self.regs.a();
                self.set_ram(bank as usize, addr, a);
            }
            Instruction::LoadPointer { index, src } => {
                let value = self.read_source(src);
                self.regs.pointers[(index & 7) as usize].value = value as u8;
            }
            Instruction::Alu { op, src } => {
                let operand = match src {
                    Source::Reg(7) => Operand::Long(self.regs.product()),
                    other => Operand::Word(self.read_source(other)),
                };
                let result = alu::execute(op, self.regs.acc, operand);
                if result.store {
                    self.regs.acc = result.value;
                }
                self.regs.set_flags(result.flags);
            }
            Instruction::Branch { cond, target, link } => {
                if self.condition(cond) {
                    let ret = self.regs.pc;
                    if link {
                        self.regs.push(ret);
                    }
                    self.regs.pc = match target {
                        Target::Absolute(addr) => addr,
                        Target::Relative(disp) => ret.wrapping_add(disp as u16),
                    };
                    return 1;
                }
            }
            Instruction::Modify { cond, op } => {
                if self.condition(cond) {
                    let result = alu::execute_unary(op, self.regs.acc);
                    self.regs.acc = result.value;
                    self.regs.set_flags(result.flags);
                }
            }
            Instruction::MulAcc { op, rj, ri } => {
                let product = Operand::Long(self.regs.product());
                let (acc, flags) = match op {
                    MacOp::Mpya => {
                        let r = alu::execute(AluOp::Add, self.regs.acc, product);
                        (r.value, r.flags)
                    }
                    MacOp::Mpys => {
                        let r = alu::execute(AluOp::Sub, self.regs.acc, product);
                        (r.value, r.flags)
                    }
                    MacOp::Mld => (
                        0,
                        Flags {
                            zero: true,
                            ..Flags::default()
                        },
                    ),
                };
                self.regs.acc = acc;
                self.regs.set_flags(flags);

                let x_addr = self.pointer_address(rj);
                let y_addr = self.pointer_address(ri);
                self.regs.x = self.ram[x_addr];
                self.regs.y = self.ram[y_addr];
            }
        }
        0
    }
}

impl<M: MemorySsp1601> crate::Cpu for Ssp1601<M> {
    fn reset(&mut self) {
        Ssp1601::reset(self);
    }

    fn step(&mut self) -> u32 {
        Ssp1601::step(self).cycles
    }
}

impl<M: MemorySsp1601> Chip for Ssp1601<M> {
    fn reset(&mut self) {
        Ssp1601::reset(self);
    }

    fn init(&mut self, program: &[u16]) {
        self.load_program(0, program);
        Ssp1601::reset(self);
    }

    fn update(&mut self, cycles: u32) -> u32 {
        let mut spent = 0;
        while spent < cycles {
            let result = Ssp1601::step(self);
            spent = spent.saturating_add(result.cycles);
            if let Some(fault) = result.fault {
                log(LogCategory::Dsp, LogLevel::Debug, || {
                    format!("SSP: fault during batch run: {}", fault)
                });
            }
        }
        spent
    }

    fn write(&mut self, port: u16, value: u16) {
        match port {
            HOST_PORT_XST => self.xst = value,
            _ => log(LogCategory::Stubs, LogLevel::Debug, || {
                format!("SSP: host write {:04X} to unmapped port {}", value, port)
            }),
        }
    }

    fn read(&self, port: u16) -> u16 {
        match port {
            HOST_PORT_XST => self.xst,
            HOST_PORT_STATUS => self.regs.st(),
            _ => 0xFFFF,
        }
    }
}

#[cfg(test)]
mod tests;
