//! Bit-level row instructions
//!
//! These are the primitives bit-serial micro-programs are written in. A row
//! of an object holds one bit position of every element (vertical layout),
//! so each instruction touches the same bit of all elements at once.

use super::types::{LogicOp, RowReg};
use crate::device::ObjId;
use std::fmt;

/// One row-level instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowInstruction {
    /// Sense row `row` of `obj` into SA
    ReadRow { obj: ObjId, row: u32 },
    /// Write SA back into row `row` of `obj`
    WriteRow { obj: ObjId, row: u32 },
    /// Fill a register with all zeros or all ones
    Set { dest: RowReg, value: bool },
    /// Copy a register
    Move { src: RowReg, dest: RowReg },
    /// Bitwise complement
    Not { src: RowReg, dest: RowReg },
    /// Two-input logic function
    Logic {
        op: LogicOp,
        src1: RowReg,
        src2: RowReg,
        dest: RowReg,
    },
    /// Three-input majority
    Maj { a: RowReg, b: RowReg, c: RowReg, dest: RowReg },
    /// `dest = cond ? a : b`
    Sel {
        cond: RowReg,
        a: RowReg,
        b: RowReg,
        dest: RowReg,
    },
}

impl RowInstruction {
    /// Instruction category used in statistics and capability checks
    pub const fn kind(&self) -> RowInstructionKind {
        match self {
            RowInstruction::ReadRow { .. } => RowInstructionKind::ReadRow,
            RowInstruction::WriteRow { .. } => RowInstructionKind::WriteRow,
            RowInstruction::Set { .. } => RowInstructionKind::Set,
            RowInstruction::Move { .. } => RowInstructionKind::Move,
            RowInstruction::Not { .. } => RowInstructionKind::Not,
            RowInstruction::Logic { op, .. } => RowInstructionKind::Logic(*op),
            RowInstruction::Maj { .. } => RowInstructionKind::Maj,
            RowInstruction::Sel { .. } => RowInstructionKind::Sel,
        }
    }
}

impl fmt::Display for RowInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowInstruction::ReadRow { obj, row } => write!(f, "read {obj}[{row}] -> sa"),
            RowInstruction::WriteRow { obj, row } => write!(f, "write sa -> {obj}[{row}]"),
            RowInstruction::Set { dest, value } => write!(f, "set {dest} = {}", u8::from(*value)),
            RowInstruction::Move { src, dest } => write!(f, "mov {dest} = {src}"),
            RowInstruction::Not { src, dest } => write!(f, "not {dest} = ~{src}"),
            RowInstruction::Logic { op, src1, src2, dest } => write!(f, "{op} {dest} = {src1}, {src2}"),
            RowInstruction::Maj { a, b, c, dest } => write!(f, "maj {dest} = {a}, {b}, {c}"),
            RowInstruction::Sel { cond, a, b, dest } => write!(f, "sel {dest} = {cond} ? {a} : {b}"),
        }
    }
}

/// Instruction category without operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowInstructionKind {
    ReadRow,
    WriteRow,
    Set,
    Move,
    Not,
    Logic(LogicOp),
    Maj,
    Sel,
}

impl RowInstructionKind {
    /// Name used in statistics output
    pub const fn name(self) -> &'static str {
        match self {
            RowInstructionKind::ReadRow => "row.read",
            RowInstructionKind::WriteRow => "row.write",
            RowInstructionKind::Set => "reg.set",
            RowInstructionKind::Move => "reg.mov",
            RowInstructionKind::Not => "reg.not",
            RowInstructionKind::Logic(LogicOp::And) => "reg.and",
            RowInstructionKind::Logic(LogicOp::Or) => "reg.or",
            RowInstructionKind::Logic(LogicOp::Xor) => "reg.xor",
            RowInstructionKind::Logic(LogicOp::Xnor) => "reg.xnor",
            RowInstructionKind::Maj => "reg.maj",
            RowInstructionKind::Sel => "reg.sel",
        }
    }
}

impl fmt::Display for RowInstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
