//! Device command set
//!
//! # Native Operations
//!
//! Element-wise operations the device executes directly ([`PimOp`]):
//! add, sub, mul, div, abs, and, or, xor, xnor, gt, lt, eq, min, max, popcount.
//!
//! # Row Instructions
//!
//! Bit-level primitives ([`RowInstruction`]) over the row registers SA and
//! R1..R5. Which instructions a device accepts depends on its family.

mod op;
mod row;
mod types;

pub use op::{Operands, PimOp};
pub use row::{RowInstruction, RowInstructionKind};
pub use types::{DataType, LogicOp, RowReg};
