//! Accumulator arithmetic and flag evaluation.
//!
//! Everything here is a pure function of its inputs. 16-bit operands are
//! aligned with the accumulator's upper half before the operation; the
//! product register supplies a full 32-bit operand.

use serde::{Deserialize, Serialize};

use super::registers::{ST_FLAG_L, ST_FLAG_N, ST_FLAG_V, ST_FLAG_Z};

/// Condition flags held in ST bits 12..15
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flags {
    pub zero: bool,
    pub negative: bool,
    pub carry: bool,
    pub overflow: bool,
}

impl Flags {
    pub fn from_status(st: u16) -> Self {
        Self {
            zero: st & ST_FLAG_Z != 0,
            negative: st & ST_FLAG_N != 0,
            carry: st & ST_FLAG_L != 0,
            overflow: st & ST_FLAG_V != 0,
        }
    }

    pub fn to_status(self) -> u16 {
        let mut st = 0;
        if self.zero {
            st |= ST_FLAG_Z;
        }
        if self.negative {
            st |= ST_FLAG_N;
        }
        if self.carry {
            st |= ST_FLAG_L;
        }
        if self.overflow {
            st |= ST_FLAG_V;
        }
        st
    }

    fn zn(value: u32) -> Self {
        Self {
            zero: value == 0,
            negative: value & 0x8000_0000 != 0,
            carry: false,
            overflow: false,
        }
    }
}

/// Two-operand accumulator operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Sub,
    Cmp,
    Add,
    And,
    Or,
    Eor,
}

impl AluOp {
    /// Decode the high nibble of an ALU opcode
    pub fn from_opcode(op: u16) -> Option<Self> {
        match op >> 4 {
            0x1 => Some(AluOp::Sub),
            0x3 => Some(AluOp::Cmp),
            0x4 => Some(AluOp::Add),
            0x5 => Some(AluOp::And),
            0x6 => Some(AluOp::Or),
            0x7 => Some(AluOp::Eor),
            _ => None,
        }
    }
}

/// Single-operand accumulator operations (`mod`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic shift right by one
    Sra,
    /// Shift left by one
    Shl,
    Neg,
    Abs,
}

impl UnaryOp {
    pub fn from_bits(bits: u16) -> Option<Self> {
        match bits & 0xF {
            2 => Some(UnaryOp::Sra),
            3 => Some(UnaryOp::Shl),
            6 => Some(UnaryOp::Neg),
            7 => Some(UnaryOp::Abs),
            _ => None,
        }
    }
}

/// ALU operand after alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// 16-bit value, lined up with A
    Word(u16),
    /// Full 32-bit value (product register)
    Long(u32),
}

impl Operand {
    pub fn aligned(self) -> u32 {
        match self {
            Operand::Word(w) => (w as u32) << 16,
            Operand::Long(l) => l,
        }
    }
}

/// Outcome of an ALU operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u32,
    pub flags: Flags,
    /// False for compare: the accumulator must not change
    pub store: bool,
}

fn add(lhs: u32, rhs: u32) -> (u32, Flags) {
    let (value, carry) = lhs.overflowing_add(rhs);
    let overflow = ((lhs ^ value) & (rhs ^ value)) & 0x8000_0000 != 0;
    let mut flags = Flags::zn(value);
    flags.carry = carry;
    flags.overflow = overflow;
    (value, flags)
}

fn sub(lhs: u32, rhs: u32) -> (u32, Flags) {
    let (value, borrow) = lhs.overflowing_sub(rhs);
    let overflow = ((lhs ^ rhs) & (lhs ^ value)) & 0x8000_0000 != 0;
    let mut flags = Flags::zn(value);
    flags.carry = borrow;
    flags.overflow = overflow;
    (value, flags)
}

/// Apply a logic op to the part of the accumulator the operand covers
fn logic(acc: u32, operand: Operand, f: impl Fn(u32, u32) -> u32) -> u32 {
    match operand {
        Operand::Word(_) => (f(acc, operand.aligned()) & 0xFFFF_0000) | (acc & 0x0000_FFFF),
        Operand::Long(l) => f(acc, l),
    }
}

/// Run a two-operand operation against the accumulator
pub fn execute(op: AluOp, acc: u32, operand: Operand) -> AluResult {
    let rhs = operand.aligned();
    let (value, flags, store) = match op {
        AluOp::Add => {
            let (v, f) = add(acc, rhs);
            (v, f, true)
        }
        AluOp::Sub => {
            let (v, f) = sub(acc, rhs);
            (v, f, true)
        }
        AluOp::Cmp => {
            // A 16-bit operand is compared against A only; AL does not take part.
            let lhs = match operand {
                Operand::Word(_) => acc & 0xFFFF_0000,
                Operand::Long(_) => acc,
            };
            let (_, f) = sub(lhs, rhs);
            (acc, f, false)
        }
        AluOp::And => {
            let v = logic(acc, operand, |a, b| a & b);
            (v, Flags::zn(v), true)
        }
        AluOp::Or => {
            let v = logic(acc, operand, |a, b| a | b);
            (v, Flags::zn(v), true)
        }
        AluOp::Eor => {
            let v = logic(acc, operand, |a, b| a ^ b);
            (v, Flags::zn(v), true)
        }
    };
    AluResult { value, flags, store }
}

/// Run a single-operand operation on the accumulator
pub fn execute_unary(op: UnaryOp, acc: u32) -> AluResult {
    let (value, flags) = match op {
        UnaryOp::Sra => {
            let v = ((acc as i32) >> 1) as u32;
            let mut f = Flags::zn(v);
            f.carry = acc & 1 != 0;
            (v, f)
        }
        UnaryOp::Shl => {
            let v = acc << 1;
            let mut f = Flags::zn(v);
            f.carry = acc & 0x8000_0000 != 0;
            f.overflow = (acc ^ v) & 0x8000_0000 != 0;
            (v, f)
        }
        UnaryOp::Neg => sub(0, acc),
        UnaryOp::Abs => {
            if acc & 0x8000_0000 != 0 {
                sub(0, acc)
            } else {
                (acc, Flags::zn(acc))
            }
        }
    };
    AluResult {
        value,
        flags,
        store: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_leaves_accumulator_untouched() {
        let acc = 0x1234_5678;
        let r = execute(AluOp::Cmp, acc, Operand::Word(0x1234));
        assert!(!r.store);
        assert_eq!(r.value, acc);
        assert!(r.flags.zero, "A == operand, AL must not matter");
        assert!(!r.flags.negative);
        assert!(!r.flags.carry);
    }

    #[test]
    fn test_compare_zero_iff_equal_to_upper_half() {
        for (a, x) in [(0x0000u16, 0x0000u16), (0x8000, 0x8000), (0x0001, 0x0002), (0xFFFF, 0x0001)] {
            let acc = ((a as u32) << 16) | 0xBEEF;
            let r = execute(AluOp::Cmp, acc, Operand::Word(x));
            assert_eq!(r.flags.zero, a == x, "A={:04X} x={:04X}", a, x);
            assert_eq!(r.value, acc);
        }
    }

    #[test]
    fn test_compare_flags_fixture() {
        // 0x0001 - 0x0002: negative with borrow
        let r = execute(AluOp::Cmp, 0x0001_0000, Operand::Word(0x0002));
        assert!(!r.flags.zero);
        assert!(r.flags.negative);
        assert!(r.flags.carry);
        assert!(!r.flags.overflow);

        // 0x8000 - 0x0001: signed overflow, no borrow
        let r = execute(AluOp::Cmp, 0x8000_0000, Operand::Word(0x0001));
        assert!(!r.flags.negative);
        assert!(r.flags.overflow);
        assert!(!r.flags.carry);
    }

    #[test]
    fn test_compare_with_product_uses_all_bits() {
        let r = execute(AluOp::Cmp, 0x0000_0010, Operand::Long(0x0000_0010));
        assert!(r.flags.zero);
        let r = execute(AluOp::Cmp, 0x0000_0011, Operand::Long(0x0000_0010));
        assert!(!r.flags.zero);
    }

    #[test]
    fn test_add_sub_wrap() {
        let r = execute(AluOp::Add, 0xFFFF_0000, Operand::Word(0x0001));
        assert_eq!(r.value, 0);
        assert!(r.flags.zero);
        assert!(r.flags.carry);

        let r = execute(AluOp::Sub, 0x0000_0000, Operand::Word(0x0001));
        assert_eq!(r.value, 0xFFFF_0000);
        assert!(r.flags.negative);
        assert!(r.flags.carry);

        let r = execute(AluOp::Add, 0x7FFF_0000, Operand::Word(0x0001));
        assert!(r.flags.overflow);
        assert!(r.flags.negative);
    }

    #[test]
    fn test_logic_ops_keep_low_half() {
        let r = execute(AluOp::And, 0xF0F0_1234, Operand::Word(0x0FF0));
        assert_eq!(r.value, 0x00F0_1234);
        let r = execute(AluOp::Or, 0xF0F0_1234, Operand::Word(0x0F0F));
        assert_eq!(r.value, 0xFFFF_1234);
        assert!(r.flags.negative);
        let r = execute(AluOp::Eor, 0xFFFF_0000, Operand::Word(0xFFFF));
        assert_eq!(r.value, 0);
        assert!(r.flags.zero);
        assert!(!r.flags.carry && !r.flags.overflow);
    }

    #[test]
    fn test_unary_ops() {
        let r = execute_unary(UnaryOp::Sra, 0x8000_0003);
        assert_eq!(r.value, 0xC000_0001);
        assert!(r.flags.carry);

        let r = execute_unary(UnaryOp::Shl, 0x8000_0001);
        assert_eq!(r.value, 0x0000_0002);
        assert!(r.flags.carry);

        let r = execute_unary(UnaryOp::Neg, 0x0001_0000);
        assert_eq!(r.value, 0xFFFF_0000);

        let r = execute_unary(UnaryOp::Abs, 0xFFFF_0000);
        assert_eq!(r.value, 0x0001_0000);
        let r = execute_unary(UnaryOp::Abs, 0x0001_0000);
        assert_eq!(r.value, 0x0001_0000);
    }

    #[test]
    fn test_flags_status_round_trip() {
        let flags = Flags {
            zero: true,
            negative: false,
            carry: true,
            overflow: false,
        };
        assert_eq!(flags.to_status(), ST_FLAG_Z | ST_FLAG_L);
        assert_eq!(Flags::from_status(flags.to_status()), flags);
    }
}
