//! Native operation catalogue
//!
//! Every device exposes the same fixed set of element-wise operations.
//! Operation ids are stable and shared by everything that enumerates the
//! catalogue.

use crate::device::ObjId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Element-wise operation executed natively by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PimOp {
    Add,
    Sub,
    Mul,
    Div,
    Abs,
    And,
    Or,
    Xor,
    Xnor,
    Gt,
    Lt,
    Eq,
    Min,
    Max,
    PopCount,
}

impl PimOp {
    /// Full catalogue ordered by id
    pub const ALL: [PimOp; 15] = [
        PimOp::Add,
        PimOp::Sub,
        PimOp::Mul,
        PimOp::Div,
        PimOp::Abs,
        PimOp::And,
        PimOp::Or,
        PimOp::Xor,
        PimOp::Xnor,
        PimOp::Gt,
        PimOp::Lt,
        PimOp::Eq,
        PimOp::Min,
        PimOp::Max,
        PimOp::PopCount,
    ];

    /// Stable operation id (0..=14)
    pub const fn id(self) -> usize {
        self as usize
    }

    /// Look up an operation by id
    pub fn from_id(id: usize) -> Option<Self> {
        Self::ALL.get(id).copied()
    }

    /// Lower-case operation name
    pub const fn name(self) -> &'static str {
        match self {
            PimOp::Add => "add",
            PimOp::Sub => "sub",
            PimOp::Mul => "mul",
            PimOp::Div => "div",
            PimOp::Abs => "abs",
            PimOp::And => "and",
            PimOp::Or => "or",
            PimOp::Xor => "xor",
            PimOp::Xnor => "xnor",
            PimOp::Gt => "gt",
            PimOp::Lt => "lt",
            PimOp::Eq => "eq",
            PimOp::Min => "min",
            PimOp::Max => "max",
            PimOp::PopCount => "popcount",
        }
    }

    /// Unary operations read a single source
    pub const fn is_unary(self) -> bool {
        matches!(self, PimOp::Abs | PimOp::PopCount)
    }

    /// Comparisons write 1 or 0 into the destination element
    pub const fn is_comparison(self) -> bool {
        matches!(self, PimOp::Gt | PimOp::Lt | PimOp::Eq)
    }
}

impl fmt::Display for PimOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PimOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name() == wanted)
            .ok_or_else(|| format!("unknown operation '{s}'"))
    }
}

/// Object operands of one native operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    Unary { src: ObjId, dest: ObjId },
    Binary { src1: ObjId, src2: ObjId, dest: ObjId },
}

impl Operands {
    pub const fn unary(src: ObjId, dest: ObjId) -> Self {
        Operands::Unary { src, dest }
    }

    pub const fn binary(src1: ObjId, src2: ObjId, dest: ObjId) -> Self {
        Operands::Binary { src1, src2, dest }
    }

    /// Destination object
    pub const fn dest(&self) -> ObjId {
        match *self {
            Operands::Unary { dest, .. } | Operands::Binary { dest, .. } => dest,
        }
    }

    /// First source object
    pub const fn src1(&self) -> ObjId {
        match *self {
            Operands::Unary { src, .. } => src,
            Operands::Binary { src1, .. } => src1,
        }
    }

    /// Second source object, if any
    pub const fn src2(&self) -> Option<ObjId> {
        match *self {
            Operands::Unary { .. } => None,
            Operands::Binary { src2, .. } => Some(src2),
        }
    }
}
