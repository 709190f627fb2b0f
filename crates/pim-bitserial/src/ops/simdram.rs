//! SIMDRAM family
//!
//! Only majority and complement exist in the array, so two-input logic and
//! selection are built from majority networks with a constant third input:
//!
//! ```text
//! and(a, b)    = maj(a, b, 0)
//! or(a, b)     = maj(a, b, 1)
//! xor(a, b)    = maj(or(a, b), !and(a, b), 0)
//! sel(c, a, b) = maj(maj(c, a, 0), maj(!c, b, 0), 1)
//! ```

use super::microcode::{Emitter, GateSet, Row};
use super::{int, BitSerialOps, KernelTable};
use crate::category::NumericKind;
use pim_backends::{DeviceFamily, LogicOp, PimOp, Result, RowReg};

/// Gate lowering for SIMDRAM
pub struct SimdramGates;

impl SimdramGates {
    /// `R4 = and(R1, R2)`, `R5 = or(R1, R2)`
    fn and_or(em: &mut Emitter<'_>) -> Result<()> {
        em.set(RowReg::R3, false)?;
        em.maj(RowReg::R1, RowReg::R2, RowReg::R3, RowReg::R4)?;
        em.set(RowReg::R3, true)?;
        em.maj(RowReg::R1, RowReg::R2, RowReg::R3, RowReg::R5)
    }
}

impl GateSet for SimdramGates {
    fn family(&self) -> DeviceFamily {
        DeviceFamily::Simdram
    }

    fn logic(&self, em: &mut Emitter<'_>, op: LogicOp, a: Row, b: Row, dst: Row) -> Result<()> {
        em.load(a, RowReg::R1)?;
        em.load(b, RowReg::R2)?;
        match op {
            LogicOp::And | LogicOp::Or => {
                em.set(RowReg::R3, op == LogicOp::Or)?;
                em.maj(RowReg::R1, RowReg::R2, RowReg::R3, RowReg::Sa)?;
            }
            LogicOp::Xor | LogicOp::Xnor => {
                Self::and_or(em)?;
                em.not(RowReg::R4, RowReg::R4)?;
                em.set(RowReg::R3, false)?;
                em.maj(RowReg::R5, RowReg::R4, RowReg::R3, RowReg::Sa)?;
                if op == LogicOp::Xnor {
                    em.not(RowReg::Sa, RowReg::Sa)?;
                }
            }
        }
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
        em.set(RowReg::R3, false)?;
        em.maj(RowReg::R1, RowReg::R2, RowReg::R3, RowReg::R4)?;
        em.not(RowReg::R1, RowReg::R1)?;
        em.read(b)?;
        em.maj(RowReg::R1, RowReg::Sa, RowReg::R3, RowReg::R5)?;
        em.set(RowReg::R3, true)?;
        em.maj(RowReg::R4, RowReg::R5, RowReg::R3, RowReg::Sa)?;
        em.write(dst)
    }
}

/// Integer catalogue without mul and div; no floating point
pub fn ops() -> BitSerialOps {
    let signed = KernelTable::new()
        .with(PimOp::Add, int::add)
        .with(PimOp::Sub, int::sub)
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

    BitSerialOps::new(Box::new(SimdramGates))
        .with_table(NumericKind::Signed, signed)
        .with_table(NumericKind::Unsigned, unsigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::microcode::{Field, Microcode};
    use pim_backends::{DataType, Device, DeviceExt, FunctionalDevice};

    /// Every (a, b, c) combination across eight elements
    fn truth_table(op: impl Fn(&mut Microcode<'_>, Field) -> Result<()>) -> u8 {
        let mut device = FunctionalDevice::new(DeviceFamily::Simdram);
        let obj = device.allocate(8, 4, DataType::UInt8).unwrap();
        device.copy_to_device(&[0u8, 1, 2, 3, 4, 5, 6, 7], obj).unwrap();

        let gates = SimdramGates;
        let mut mc = Microcode::new(&mut device, &gates, obj).unwrap();
        op(&mut mc, Field::whole(obj, 4)).unwrap();
        mc.finish().unwrap();

        let mut out = [0u8; 8];
        device.copy_from_device(obj, &mut out).unwrap();
        out.iter()
            .enumerate()
            .fold(0u8, |acc, (i, v)| acc | (((v >> 3) & 1) << i))
    }

    #[test]
    fn test_majority_lowerings() {
        // Bit i of each table is the output for a = i & 1, b = (i >> 1) & 1, c = (i >> 2) & 1
        assert_eq!(truth_table(|mc, f| mc.and(f.row(0), f.row(1), f.row(3))), 0b1000_1000);
        assert_eq!(truth_table(|mc, f| mc.or(f.row(0), f.row(1), f.row(3))), 0b1110_1110);
        assert_eq!(truth_table(|mc, f| mc.xor(f.row(0), f.row(1), f.row(3))), 0b0110_0110);
        assert_eq!(truth_table(|mc, f| mc.xnor(f.row(0), f.row(1), f.row(3))), 0b1001_1001);
        assert_eq!(
            truth_table(|mc, f| mc.maj(f.row(0), f.row(1), f.row(2), f.row(3))),
            0b1110_1000
        );
        // c ? a : b
        assert_eq!(
            truth_table(|mc, f| mc.sel(f.row(2), f.row(0), f.row(1), f.row(3))),
            0b1010_1100
        );
    }

    #[test]
    fn test_partial_coverage() {
        let ops = ops();
        assert_eq!(ops.family(), DeviceFamily::Simdram);
        assert!(!ops.supports(NumericKind::Signed, PimOp::Mul));
        assert!(!ops.supports(NumericKind::Unsigned, PimOp::Div));
        assert!(ops.supports(NumericKind::Unsigned, PimOp::PopCount));
        assert!(!ops.supports(NumericKind::Float, PimOp::Add));
    }
}
