//! Numeric categories under which the operation catalogue is tested

use pim_backends::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How the bits of an element are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericKind {
    Signed,
    Unsigned,
    Float,
}

/// Closed interval operands are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ValueRange {
    Signed { min: i64, max: i64 },
    Unsigned { min: u64, max: u64 },
    Float { min: f32, max: f32 },
}

/// A numeric type with its device data type and generation bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NumericCategory {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Fp32,
}

impl NumericCategory {
    /// Full catalogue in run order
    pub const ALL: [NumericCategory; 9] = [
        NumericCategory::Int8,
        NumericCategory::Int16,
        NumericCategory::Int32,
        NumericCategory::Int64,
        NumericCategory::UInt8,
        NumericCategory::UInt16,
        NumericCategory::UInt32,
        NumericCategory::UInt64,
        NumericCategory::Fp32,
    ];

    pub const fn data_type(self) -> DataType {
        match self {
            NumericCategory::Int8 => DataType::Int8,
            NumericCategory::Int16 => DataType::Int16,
            NumericCategory::Int32 => DataType::Int32,
            NumericCategory::Int64 => DataType::Int64,
            NumericCategory::UInt8 => DataType::UInt8,
            NumericCategory::UInt16 => DataType::UInt16,
            NumericCategory::UInt32 => DataType::UInt32,
            NumericCategory::UInt64 => DataType::UInt64,
            NumericCategory::Fp32 => DataType::Fp32,
        }
    }

    pub const fn bits(self) -> u32 {
        self.data_type().bits()
    }

    pub const fn kind(self) -> NumericKind {
        match self {
            NumericCategory::Int8 | NumericCategory::Int16 | NumericCategory::Int32 | NumericCategory::Int64 => {
                NumericKind::Signed
            }
            NumericCategory::UInt8
            | NumericCategory::UInt16
            | NumericCategory::UInt32
            | NumericCategory::UInt64 => NumericKind::Unsigned,
            NumericCategory::Fp32 => NumericKind::Float,
        }
    }

    /// Generation bounds
    ///
    /// Narrower than the type's range so that products and sums of the
    /// larger types stay mostly meaningful.
    pub const fn bounds(self) -> ValueRange {
        match self {
            NumericCategory::Int8 => ValueRange::Signed { min: -100, max: 127 },
            NumericCategory::Int16 => ValueRange::Signed { min: -10_000, max: 10_000 },
            NumericCategory::Int32 => ValueRange::Signed {
                min: -100_000,
                max: 100_000,
            },
            NumericCategory::Int64 => ValueRange::Signed {
                min: -40_000_000_000,
                max: 40_000_000_000,
            },
            NumericCategory::UInt8 => ValueRange::Unsigned { min: 0, max: 255 },
            NumericCategory::UInt16 => ValueRange::Unsigned { min: 0, max: 40_000 },
            NumericCategory::UInt32 => ValueRange::Unsigned { min: 0, max: 100_000 },
            NumericCategory::UInt64 => ValueRange::Unsigned {
                min: 0,
                max: 40_000_000_000,
            },
            NumericCategory::Fp32 => ValueRange::Float {
                min: -10_000.0,
                max: 10_000.0,
            },
        }
    }

    /// Name accepted by `--test`
    pub const fn name(self) -> &'static str {
        match self {
            NumericCategory::Int8 => "int8",
            NumericCategory::Int16 => "int16",
            NumericCategory::Int32 => "int32",
            NumericCategory::Int64 => "int64",
            NumericCategory::UInt8 => "uint8",
            NumericCategory::UInt16 => "uint16",
            NumericCategory::UInt32 => "uint32",
            NumericCategory::UInt64 => "uint64",
            NumericCategory::Fp32 => "fp32",
        }
    }
}

impl fmt::Display for NumericCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NumericCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|category| category.name() == wanted)
            .ok_or_else(|| format!("unknown test category '{s}'"))
    }
}
