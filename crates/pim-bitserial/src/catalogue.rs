//! Operation catalogue shared by the native and bit-serial paths
//!
//! | id | op | second operand |
//! |----|----|----------------|
//! | 0 | add | src2 |
//! | 1 | sub | src2 |
//! | 2 | mul | src2 |
//! | 3 | div | srcNonZero |
//! | 4 | abs | unary |
//! | 5..=8 | and, or, xor, xnor | src2 |
//! | 9..=11 | gt, lt, eq | src2 |
//! | 12, 13 | min, max | src2 |
//! | 14 | popcount | unary |
//!
//! Floating point runs ids 0..=3 only.

use crate::category::NumericKind;
use pim_backends::PimOp;

/// Which host vector feeds the second source of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondOperand {
    General,
    NonZero,
    None,
}

impl SecondOperand {
    pub const fn for_op(op: PimOp) -> Self {
        match op {
            PimOp::Div => SecondOperand::NonZero,
            PimOp::Abs | PimOp::PopCount => SecondOperand::None,
            _ => SecondOperand::General,
        }
    }
}

const FLOAT_OPS: [PimOp; 4] = [PimOp::Add, PimOp::Sub, PimOp::Mul, PimOp::Div];

/// Operations tested for a numeric kind, in id order
pub fn operations(kind: NumericKind) -> &'static [PimOp] {
    match kind {
        NumericKind::Signed | NumericKind::Unsigned => &PimOp::ALL,
        NumericKind::Float => &FLOAT_OPS,
    }
}
