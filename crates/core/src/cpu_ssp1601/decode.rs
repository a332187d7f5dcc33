//! Instruction word decoding.
//!
//! Opcode is bits 15..9. Operand fields:
//!
//! ```text
//! d    = bits 7..4          s   = bits 3..0
//! ri   = bits 1..0 | bit 8 << 2,  m = bits 3..2
//! bank = bit 8, adr = bits 7..0
//! cond = bits 7..4, polarity = bit 8
//! ```

use super::alu::{AluOp, UnaryOp};
use super::SspFault;

/// Reference to r0..r7 as written in an indirect operand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtrRef {
    /// 0..=7; r0..r3 address RAM bank 0, r4..r7 bank 1
    pub index: u8,
    /// Raw modifier field. For r3/r7 this is the RAM address instead.
    pub mode: u8,
}

impl PtrRef {
    fn from_op(op: u16) -> Self {
        Self {
            index: ((op & 3) | ((op >> 6) & 4)) as u8,
            mode: ((op >> 2) & 3) as u8,
        }
    }

    pub fn bank(self) -> usize {
        (self.index >> 2) as usize
    }

    /// r3 and r7 address RAM words 0..3 directly and are never modified
    pub fn is_direct(self) -> bool {
        self.index & 3 == 3
    }
}

/// Where a value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// General register by index
    Reg(u8),
    /// `(ri)`: internal RAM through a pointer
    Ptr(PtrRef),
    /// `((ri))`: external memory at the address held in RAM
    DoublePtr(PtrRef),
    /// `adr`: internal RAM, direct
    Direct { bank: u8, addr: u8 },
    /// 16-bit immediate from the following word
    Imm(u16),
    /// 8-bit immediate from the instruction word
    ShortImm(u8),
    /// Value of a pointer register itself
    PtrValue(u8),
    /// `(a)`: program memory addressed by A
    ProgramAtA,
}

/// Branch predicate: true iff the flag equals the polarity bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    Never,
    Carry,
    NoCarry,
    Equal,
    NotEqual,
    Overflow,
    NoOverflow,
    Negative,
    NonNegative,
}

impl Condition {
    fn from_op(op: u16) -> Option<Self> {
        let set = (op >> 8) & 1 != 0;
        Some(match ((op >> 4) & 0xF, set) {
            (0x0, false) => Condition::Always,
            (0x0, true) => Condition::Never,
            (0x4, true) => Condition::Carry,
            (0x4, false) => Condition::NoCarry,
            (0x5, true) => Condition::Equal,
            (0x5, false) => Condition::NotEqual,
            (0x6, true) => Condition::Overflow,
            (0x6, false) => Condition::NoOverflow,
            (0x7, true) => Condition::Negative,
            (0x7, false) => Condition::NonNegative,
            _ => return None,
        })
    }
}

/// Branch destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Absolute(u16),
    /// Signed displacement from the address after the instruction
    Relative(i16),
}

/// Multiply-accumulate flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacOp {
    /// acc -= P
    Mpys,
    /// acc += P
    Mpya,
    /// acc = 0
    Mld,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Nop,
    /// `ld d, <src>`
    Load { dst: u8, src: Source },
    /// `ld (ri), s` / `ldi (ri), imm`
    StorePtr { ptr: PtrRef, src: Source },
    /// `ld adr, a`
    StoreDirect { bank: u8, addr: u8 },
    /// `ld ri, s` / `ldi ri, imm8`
    LoadPointer { index: u8, src: Source },
    Alu { op: AluOp, src: Source },
    Branch {
        cond: Condition,
        target: Target,
        link: bool,
    },
    Modify { cond: Condition, op: UnaryOp },
    MulAcc { op: MacOp, rj: PtrRef, ri: PtrRef },
}

/// Coarse classification used by tracing and the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstructionClass {
    AluBinary,
    AluImmediate,
    Load,
    Store,
    ConditionalBranch,
    PointerModify,
    MappedRegister,
}

fn is_mapped(index: u8) -> bool {
    (8..=14).contains(&index)
}

impl Instruction {
    pub fn class(&self) -> InstructionClass {
        match *self {
            Instruction::Nop => InstructionClass::Load,
            Instruction::Load { dst, src } => {
                if is_mapped(dst) || matches!(src, Source::Reg(s) if is_mapped(s)) {
                    InstructionClass::MappedRegister
                } else {
                    InstructionClass::Load
                }
            }
            Instruction::StorePtr { src, .. } => {
                if matches!(src, Source::Reg(s) if is_mapped(s)) {
                    InstructionClass::MappedRegister
                } else {
                    InstructionClass::Store
                }
            }
            Instruction::StoreDirect { .. } => InstructionClass::Store,
            Instruction::LoadPointer { .. } => InstructionClass::PointerModify,
            Instruction::Alu { src, .. } => match src {
                Source::Imm(_) | Source::ShortImm(_) => InstructionClass::AluImmediate,
                _ => InstructionClass::AluBinary,
            },
            Instruction::Modify { .. } | Instruction::MulAcc { .. } => InstructionClass::AluBinary,
            Instruction::Branch { .. } => InstructionClass::ConditionalBranch,
        }
    }
}

/// A decoded instruction and the number of words it occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    pub instruction: Instruction,
    pub len: u16,
}

impl Decoded {
    fn one(instruction: Instruction) -> Self {
        Self { instruction, len: 1 }
    }

    fn two(instruction: Instruction) -> Self {
        Self { instruction, len: 2 }
    }
}

/// ALU source for the low nibble of an ALU opcode
fn alu_source(mode: u16, op: u16, next: u16) -> Option<(Source, u16)> {
    Some(match mode {
        0x0 => (Source::Reg((op & 0xF) as u8), 1),
        0x1 => (Source::Ptr(PtrRef::from_op(op)), 1),
        0x3 => (
            Source::Direct {
                bank: ((op >> 8) & 1) as u8,
                addr: op as u8,
            },
            1,
        ),
        0x4 => (Source::Imm(next), 2),
        0x5 => (Source::DoublePtr(PtrRef::from_op(op)), 1),
        0x9 => (Source::PtrValue(PtrRef::from_op(op).index), 1),
        0xC => (Source::ShortImm(op as u8), 1),
        _ => return None,
    })
}

/// Decode `op`; `next` is the word after it, consumed by two-word forms.
pub fn decode(op: u16, next: u16, pc: u16) -> Result<Decoded, SspFault> {
    let invalid = SspFault::InvalidInstruction { opcode: op, pc };
    let d = ((op >> 4) & 0xF) as u8;
    let s = (op & 0xF) as u8;

    let decoded = match op >> 9 {
        0x00 if op == 0 => Decoded::one(Instruction::Nop),
        0x00 => Decoded::one(Instruction::Load {
            dst: d,
            src: Source::Reg(s),
        }),
        0x01 => Decoded::one(Instruction::Load {
            dst: d,
            src: Source::Ptr(PtrRef::from_op(op)),
        }),
        0x02 => Decoded::one(Instruction::StorePtr {
            ptr: PtrRef::from_op(op),
            src: Source::Reg(d),
        }),
        0x03 => Decoded::one(Instruction::Load {
            dst: 3,
            src: Source::Direct {
                bank: ((op >> 8) & 1) as u8,
                addr: op as u8,
            },
        }),
        0x04 => Decoded::two(Instruction::Load {
            dst: d,
            src: Source::Imm(next),
        }),
        0x05 => Decoded::one(Instruction::Load {
            dst: d,
            src: Source::DoublePtr(PtrRef::from_op(op)),
        }),
        0x06 => Decoded::two(Instruction::StorePtr {
            ptr: PtrRef::from_op(op),
            src: Source::Imm(next),
        }),
        0x07 => Decoded::one(Instruction::StoreDirect {
            bank: ((op >> 8) & 1) as u8,
            addr: op as u8,
        }),
        0x09 => Decoded::one(Instruction::Load {
            dst: d,
            src: Source::PtrValue(PtrRef::from_op(op).index),
        }),
        0x0A => Decoded::one(Instruction::LoadPointer {
            index: PtrRef::from_op(op).index,
            src: Source::Reg(d),
        }),
        0x0C..=0x0F => Decoded::one(Instruction::LoadPointer {
            index: ((op >> 8) & 7) as u8,
            src: Source::ShortImm(op as u8),
        }),
        0x1B | 0x4B | 0x5B => {
            let mac = match op >> 9 {
                0x1B => MacOp::Mpys,
                0x4B => MacOp::Mpya,
                _ => MacOp::Mld,
            };
            Decoded::one(Instruction::MulAcc {
                op: mac,
                rj: PtrRef {
                    index: ((op >> 4) & 3) as u8,
                    mode: ((op >> 6) & 3) as u8,
                },
                ri: PtrRef {
                    index: (op & 3) as u8 | 4,
                    mode: ((op >> 2) & 3) as u8,
                },
            })
        }
        0x24 | 0x26 | 0x27 => {
            let cond = Condition::from_op(op).ok_or(invalid)?;
            let target = if op >> 9 == 0x27 {
                Target::Relative(next as i16)
            } else {
                Target::Absolute(next)
            };
            Decoded::two(Instruction::Branch {
                cond,
                target,
                link: op >> 9 == 0x24,
            })
        }
        0x25 => Decoded::one(Instruction::Load {
            dst: d,
            src: Source::ProgramAtA,
        }),
        0x48 => Decoded::one(Instruction::Modify {
            cond: Condition::from_op(op).ok_or(invalid)?,
            op: UnaryOp::from_bits(op).ok_or(invalid)?,
        }),
        opcode => {
            let alu = AluOp::from_opcode(opcode).ok_or(invalid)?;
            let (src, len) = alu_source(opcode & 0xF, op, next).ok_or(invalid)?;
            Decoded {
                instruction: Instruction::Alu { op: alu, src },
                len,
            }
        }
    };
    Ok(decoded)
}
