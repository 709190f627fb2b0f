//! Core types of the device command set
//!
//! - Element data types stored in device objects
//! - Row registers of the bit-serial processing elements
//! - Two-input logic functions

use serde::{Deserialize, Serialize};
use std::fmt;

// ================================================================================================
// Data Types
// ================================================================================================

/// Type of the elements held by a device object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DataType {
    // Signed integers
    Int8,
    Int16,
    Int32,
    Int64,

    // Unsigned integers
    UInt8,
    UInt16,
    UInt32,
    UInt64,

    // Floating point
    Fp32, // IEEE 754 single precision
}

impl DataType {
    /// All data types, in declaration order
    pub const ALL: [DataType; 9] = [
        DataType::Int8,
        DataType::Int16,
        DataType::Int32,
        DataType::Int64,
        DataType::UInt8,
        DataType::UInt16,
        DataType::UInt32,
        DataType::UInt64,
        DataType::Fp32,
    ];

    /// Width of one element in bits
    pub const fn bits(self) -> u32 {
        match self {
            DataType::Int8 | DataType::UInt8 => 8,
            DataType::Int16 | DataType::UInt16 => 16,
            DataType::Int32 | DataType::UInt32 | DataType::Fp32 => 32,
            DataType::Int64 | DataType::UInt64 => 64,
        }
    }

    /// Size of one element in host memory
    pub const fn size_bytes(self) -> usize {
        (self.bits() / 8) as usize
    }

    /// Is this an integer type?
    pub const fn is_integer(self) -> bool {
        !self.is_float()
    }

    /// Is this a floating-point type?
    pub const fn is_float(self) -> bool {
        matches!(self, DataType::Fp32)
    }

    /// Is this a signed integer type?
    pub const fn is_signed_integer(self) -> bool {
        matches!(self, DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int8 => write!(f, "int8"),
            DataType::Int16 => write!(f, "int16"),
            DataType::Int32 => write!(f, "int32"),
            DataType::Int64 => write!(f, "int64"),
            DataType::UInt8 => write!(f, "uint8"),
            DataType::UInt16 => write!(f, "uint16"),
            DataType::UInt32 => write!(f, "uint32"),
            DataType::UInt64 => write!(f, "uint64"),
            DataType::Fp32 => write!(f, "fp32"),
        }
    }
}

// ================================================================================================
// Row Registers
// ================================================================================================

/// Row-wide register of the processing elements
///
/// `Sa` is the sense amplifier row: every row read lands in it and every row
/// write is taken from it. `R1`..`R5` are scratch registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowReg {
    Sa,
    R1,
    R2,
    R3,
    R4,
    R5,
}

impl RowReg {
    /// Number of row registers
    pub const COUNT: usize = 6;

    /// Register file index
    pub const fn index(self) -> usize {
        match self {
            RowReg::Sa => 0,
            RowReg::R1 => 1,
            RowReg::R2 => 2,
            RowReg::R3 => 3,
            RowReg::R4 => 4,
            RowReg::R5 => 5,
        }
    }
}

impl fmt::Display for RowReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowReg::Sa => write!(f, "sa"),
            RowReg::R1 => write!(f, "r1"),
            RowReg::R2 => write!(f, "r2"),
            RowReg::R3 => write!(f, "r3"),
            RowReg::R4 => write!(f, "r4"),
            RowReg::R5 => write!(f, "r5"),
        }
    }
}

// ================================================================================================
// Logic Functions
// ================================================================================================

/// Two-input logic function applied bitwise across a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogicOp {
    And,
    Or,
    Xor,
    Xnor,
}

impl LogicOp {
    /// Apply to one packed word of a row
    #[inline]
    pub const fn apply(self, a: u64, b: u64) -> u64 {
        match self {
            LogicOp::And => a & b,
            LogicOp::Or => a | b,
            LogicOp::Xor => a ^ b,
            LogicOp::Xnor => !(a ^ b),
        }
    }
}

impl fmt::Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicOp::And => write!(f, "and"),
            LogicOp::Or => write!(f, "or"),
            LogicOp::Xor => write!(f, "xor"),
            LogicOp::Xnor => write!(f, "xnor"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_widths() {
        assert_eq!(DataType::Int8.bits(), 8);
        assert_eq!(DataType::UInt16.size_bytes(), 2);
        assert_eq!(DataType::Fp32.bits(), 32);
        assert_eq!(DataType::Int64.size_bytes(), 8);
    }

    #[test]
    fn test_data_type_kinds() {
        assert!(DataType::Int32.is_signed_integer());
        assert!(!DataType::UInt32.is_signed_integer());
        assert!(DataType::Fp32.is_float());
        assert!(!DataType::Fp32.is_integer());
        assert_eq!(DataType::ALL.iter().filter(|t| t.is_integer()).count(), 8);
    }

    #[test]
    fn test_logic_op_apply() {
        assert_eq!(LogicOp::And.apply(0b1100, 0b1010), 0b1000);
        assert_eq!(LogicOp::Or.apply(0b1100, 0b1010), 0b1110);
        assert_eq!(LogicOp::Xor.apply(0b1100, 0b1010), 0b0110);
        assert_eq!(LogicOp::Xnor.apply(0, 0), u64::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::UInt64.to_string(), "uint64");
        assert_eq!(RowReg::R3.to_string(), "r3");
        assert_eq!(LogicOp::Xnor.to_string(), "xnor");
    }
}
