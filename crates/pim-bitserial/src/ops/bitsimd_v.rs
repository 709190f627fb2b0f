//! BitSIMD-V family
//!
//! Every gate maps onto one register instruction, bracketed by the row reads
//! of its inputs and the row write of its output.

use super::microcode::{Emitter, GateSet, Row};
use super::{fp32, int, BitSerialOps, KernelTable};
use crate::category::NumericKind;
use pim_backends::{DeviceFamily, LogicOp, PimOp, Result, RowReg};

/// Gate lowering for BitSIMD-V
pub struct BitSimdVGates;

impl GateSet for BitSimdVGates {
    fn family(&self) -> DeviceFamily {
        DeviceFamily::BitSimdV
    }

    fn logic(&self, em: &mut Emitter<'_>, op: LogicOp, a: Row, b: Row, dst: Row) -> Result<()> {
        em.load(a, RowReg::R1)?;
        em.read(b)?;
        em.logic(op, RowReg::R1, RowReg::Sa, RowReg::Sa)?;
        em.write(dst)
    }

    fn maj(&self, em: &mut Emitter<'_>, a: Row, b: Row, c: Row, dst: Row) -> Result<()> {
        em.load(a, RowReg::R1)?;
        em.load(b, RowReg::R2)?;
        em.read(c)?;
        em.maj(RowReg::R1, RowReg::R2, RowReg::Sa, RowReg::Sa)?;
        em.write(dst)
    }

    fn sel(&self, em: &mut Emitter<'_>, cond: Row, a: Row, b: Row, dst: Row) -> Result<()> {
        em.load(cond, RowReg::R1)?;
        em.load(a, RowReg::R2)?;
        em.read(b)?;
        em.sel(RowReg::R1, RowReg::R2, RowReg::Sa, RowReg::Sa)?;
        em.write(dst)
    }
}

/// Full integer catalogue for both signednesses plus fp32 add/sub/mul/div
pub fn ops() -> BitSerialOps {
    let signed = KernelTable::new()
        .with(PimOp::Add, int::add)
        .with(PimOp::Sub, int::sub)
        .with(PimOp::Mul, int::mul)
        .with(PimOp::Div, int::div_signed)
        .with(PimOp::Abs, int::abs_signed)
        .with(PimOp::And, int::and)
        .with(PimOp::Or, int::or)
        .with(PimOp::Xor, int::xor)
        .with(PimOp::Xnor, int::xnor)
        .with(PimOp::Gt, int::gt_signed)
        .with(PimOp::Lt, int::lt_signed)
        .with(PimOp::Eq, int::eq)
        .with(PimOp::Min, int::min_signed)
        .with(PimOp::Max, int::max_signed)
        .with(PimOp::PopCount, int::popcount);

    let unsigned = KernelTable::new()
        .with(PimOp::Add, int::add)
        .with(PimOp::Sub, int::sub)
        .with(PimOp::Mul, int::mul)
        .with(PimOp::Div, int::div_unsigned)
        .with(PimOp::Abs, int::abs_unsigned)
        .with(PimOp::And, int::and)
        .with(PimOp::Or, int::or)
        .with(PimOp::Xor, int::xor)
        .with(PimOp::Xnor, int::xnor)
        .with(PimOp::Gt, int::gt_unsigned)
        .with(PimOp::Lt, int::lt_unsigned)
        .with(PimOp::Eq, int::eq)
        .with(PimOp::Min, int::min_unsigned)
        .with(PimOp::Max, int::max_unsigned)
        .with(PimOp::PopCount, int::popcount);

    let float = KernelTable::new()
        .with(PimOp::Add, fp32::add)
        .with(PimOp::Sub, fp32::sub)
        .with(PimOp::Mul, fp32::mul)
        .with(PimOp::Div, fp32::div);

    BitSerialOps::new(Box::new(BitSimdVGates))
        .with_table(NumericKind::Signed, signed)
        .with_table(NumericKind::Unsigned, unsigned)
        .with_table(NumericKind::Float, float)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_coverage() {
        let ops = ops();
        assert_eq!(ops.family(), DeviceFamily::BitSimdV);
        for op in PimOp::ALL {
            assert!(ops.supports(NumericKind::Signed, op), "signed {op}");
            assert!(ops.supports(NumericKind::Unsigned, op), "unsigned {op}");
        }
        for op in [PimOp::Add, PimOp::Sub, PimOp::Mul, PimOp::Div] {
            assert!(ops.supports(NumericKind::Float, op));
        }
        assert!(!ops.supports(NumericKind::Float, PimOp::Abs));
    }
}
