//! Instruction execution for the functional device
//!
//! Row instructions run against a register file bound to one placement.
//! Native operations gather elements, compute on the host, and scatter the
//! results back into bit-planes.

use super::memory::{value_mask, words_for, ObjectArena};
use crate::device::{DeviceFamily, ObjId};
use crate::error::{BackendError, Result};
use crate::isa::{DataType, Operands, PimOp, RowInstruction, RowReg};

// ================================================================================================
// Register File
// ================================================================================================

/// Row registers of the processing elements
///
/// Registers are as wide as the placement they are bound to. Binding a
/// different placement clears them.
pub(crate) struct RegisterFile {
    bound: Option<ObjId>,
    regs: [Vec<u64>; RowReg::COUNT],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self {
            bound: None,
            regs: Default::default(),
        }
    }

    fn bind(&mut self, root: ObjId, num_elements: u64) {
        let words = words_for(num_elements);
        if self.bound != Some(root) || self.regs[0].len() != words {
            self.bound = Some(root);
            for reg in &mut self.regs {
                reg.clear();
                reg.resize(words, 0);
            }
        }
    }

    /// Drop the binding if it refers to `root`
    pub fn release(&mut self, root: ObjId) {
        if self.bound == Some(root) {
            self.bound = None;
        }
    }

    #[cfg(test)]
    pub fn get(&self, reg: RowReg) -> &[u64] {
        &self.regs[reg.index()]
    }

    fn map1(&mut self, src: RowReg, dest: RowReg, f: impl Fn(u64) -> u64) {
        let out = self.regs[src.index()].iter().map(|&a| f(a)).collect();
        self.regs[dest.index()] = out;
    }

    fn map2(&mut self, a: RowReg, b: RowReg, dest: RowReg, f: impl Fn(u64, u64) -> u64) {
        let out = self.regs[a.index()]
            .iter()
            .zip(&self.regs[b.index()])
            .map(|(&a, &b)| f(a, b))
            .collect();
        self.regs[dest.index()] = out;
    }

    fn map3(&mut self, a: RowReg, b: RowReg, c: RowReg, dest: RowReg, f: impl Fn(u64, u64, u64) -> u64) {
        let out = self.regs[a.index()]
            .iter()
            .zip(&self.regs[b.index()])
            .zip(&self.regs[c.index()])
            .map(|((&a, &b), &c)| f(a, b, c))
            .collect();
        self.regs[dest.index()] = out;
    }
}

// ================================================================================================
// Row Instructions
// ================================================================================================

pub(crate) fn execute_row(
    arena: &mut ObjectArena,
    registers: &mut RegisterFile,
    family: DeviceFamily,
    obj: ObjId,
    instr: RowInstruction,
) -> Result<()> {
    if !family.supports(instr.kind()) {
        return Err(BackendError::UnsupportedInstruction(format!(
            "{} is not available on {family}",
            instr.kind()
        )));
    }

    let info = arena.info(obj)?;
    registers.bind(info.base.unwrap_or(obj), info.num_elements);

    match instr {
        RowInstruction::ReadRow { obj: src, row } => {
            arena.check_associated(obj, src)?;
            let data = arena.row(src, row)?;
            registers.regs[RowReg::Sa.index()].copy_from_slice(data);
        }
        RowInstruction::WriteRow { obj: dest, row } => {
            arena.check_associated(obj, dest)?;
            arena.set_row(dest, row, &registers.regs[RowReg::Sa.index()])?;
        }
        RowInstruction::Set { dest, value } => {
            let fill = if value { u64::MAX } else { 0 };
            registers.regs[dest.index()].fill(fill);
        }
        RowInstruction::Move { src, dest } => registers.map1(src, dest, |a| a),
        RowInstruction::Not { src, dest } => registers.map1(src, dest, |a| !a),
        RowInstruction::Logic { op, src1, src2, dest } => registers.map2(src1, src2, dest, |a, b| op.apply(a, b)),
        RowInstruction::Maj { a, b, c, dest } => registers.map3(a, b, c, dest, |a, b, c| (a & b) | (a & c) | (b & c)),
        RowInstruction::Sel { cond, a, b, dest } => registers.map3(cond, a, b, dest, |s, a, b| (s & a) | (!s & b)),
    }
    Ok(())
}

// ================================================================================================
// Native Operations
// ================================================================================================

pub(crate) fn execute_native(arena: &mut ObjectArena, op: PimOp, operands: Operands) -> Result<()> {
    if op.is_unary() != operands.src2().is_none() {
        return Err(BackendError::unsupported(format!(
            "{op} takes {} source operand(s)",
            if op.is_unary() { 1 } else { 2 }
        )));
    }

    let src1 = arena.info(operands.src1())?;
    let data_type = src1.data_type;
    if data_type.is_float() && !matches!(op, PimOp::Add | PimOp::Sub | PimOp::Mul | PimOp::Div) {
        return Err(BackendError::unsupported(format!("{op} on {data_type}")));
    }

    let others = operands.src2().into_iter().chain(std::iter::once(operands.dest()));
    for other in std::iter::once(src1.id).chain(others) {
        arena.check_associated(src1.id, other)?;
        let info = arena.info(other)?;
        if info.data_type != data_type {
            return Err(BackendError::type_mismatch(other, data_type, info.data_type));
        }
        if info.bits != data_type.bits() {
            return Err(BackendError::unsupported(format!(
                "{op} on {other}: native operations need {} rows, object has {}",
                data_type.bits(),
                info.bits
            )));
        }
    }

    let a = arena.read_elements(src1.id)?;
    let result = match operands.src2() {
        None => a
            .iter()
            .map(|&a| unary_element(op, data_type, a))
            .collect::<Result<Vec<_>>>()?,
        Some(src2) => {
            let b = arena.read_elements(src2)?;
            a.iter()
                .zip(&b)
                .enumerate()
                .map(|(index, (&a, &b))| binary_element(op, data_type, a, b, index))
                .collect::<Result<Vec<_>>>()?
        }
    };
    arena.write_elements(operands.dest(), &result)
}

macro_rules! int_binary {
    ($t:ty, $op:expr, $a:expr, $b:expr, $index:expr) => {{
        let a = $a as $t;
        let b = $b as $t;
        let value: $t = match $op {
            PimOp::Add => a.wrapping_add(b),
            PimOp::Sub => a.wrapping_sub(b),
            PimOp::Mul => a.wrapping_mul(b),
            PimOp::Div => {
                if b == 0 {
                    return Err(BackendError::DivisionByZero($index));
                }
                a.wrapping_div(b)
            }
            PimOp::And => a & b,
            PimOp::Or => a | b,
            PimOp::Xor => a ^ b,
            PimOp::Xnor => !(a ^ b),
            PimOp::Gt => <$t>::from(a > b),
            PimOp::Lt => <$t>::from(a < b),
            PimOp::Eq => <$t>::from(a == b),
            PimOp::Min => a.min(b),
            PimOp::Max => a.max(b),
            PimOp::Abs | PimOp::PopCount => {
                return Err(BackendError::unsupported(format!("{} is unary", $op)));
            }
        };
        Ok(value as u64)
    }};
}

fn binary_element(op: PimOp, data_type: DataType, a: u64, b: u64, index: usize) -> Result<u64> {
    match data_type {
        DataType::Int8 => int_binary!(i8, op, a, b, index),
        DataType::Int16 => int_binary!(i16, op, a, b, index),
        DataType::Int32 => int_binary!(i32, op, a, b, index),
        DataType::Int64 => int_binary!(i64, op, a, b, index),
        DataType::UInt8 => int_binary!(u8, op, a, b, index),
        DataType::UInt16 => int_binary!(u16, op, a, b, index),
        DataType::UInt32 => int_binary!(u32, op, a, b, index),
        DataType::UInt64 => int_binary!(u64, op, a, b, index),
        DataType::Fp32 => fp32_binary(op, a, b, index),
    }
}

fn unary_element(op: PimOp, data_type: DataType, a: u64) -> Result<u64> {
    match op {
        PimOp::PopCount => Ok(u64::from((a & value_mask(data_type.bits())).count_ones())),
        PimOp::Abs => match data_type {
            DataType::Int8 => Ok((a as i8).wrapping_abs() as u64),
            DataType::Int16 => Ok((a as i16).wrapping_abs() as u64),
            DataType::Int32 => Ok((a as i32).wrapping_abs() as u64),
            DataType::Int64 => Ok((a as i64).wrapping_abs() as u64),
            DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => Ok(a),
            DataType::Fp32 => Err(BackendError::unsupported(format!("{op} on {data_type}"))),
        },
        _ => Err(BackendError::unsupported(format!("{op} is binary"))),
    }
}

/// Subnormals read as zero and results that would be subnormal are flushed
fn fp32_binary(op: PimOp, a: u64, b: u64, index: usize) -> Result<u64> {
    let a = flush_subnormal(f32::from_bits(a as u32));
    let b = flush_subnormal(f32::from_bits(b as u32));
    let value = match op {
        PimOp::Add => a + b,
        PimOp::Sub => a - b,
        PimOp::Mul => a * b,
        PimOp::Div => {
            if b == 0.0 {
                return Err(BackendError::DivisionByZero(index));
            }
            a / b
        }
        _ => return Err(BackendError::unsupported(format!("{op} on fp32"))),
    };
    Ok(u64::from(flush_subnormal(value).to_bits()))
}

fn flush_subnormal(x: f32) -> f32 {
    if x.is_subnormal() {
        0.0f32.copysign(x)
    } else {
        x
    }
}
