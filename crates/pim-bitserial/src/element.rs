//! Host element types, one per numeric category

use crate::category::{NumericCategory, ValueRange};
use rand::distributions::uniform::SampleUniform;
use std::fmt;

/// Host representation of one numeric category
///
/// Implemented for `i8`..`i64`, `u8`..`u64` and `f32`.
pub trait Element: bytemuck::Pod + PartialOrd + fmt::Debug + fmt::Display + SampleUniform + Send + Sync {
    const CATEGORY: NumericCategory;

    /// Convert the category bounds into this type, `None` if they do not fit
    fn bounds_from(range: ValueRange) -> Option<(Self, Self)>;

    fn is_zero(&self) -> bool;

    /// Whether `[min, max]` can be sampled uniformly
    fn samplable(_min: Self, _max: Self) -> bool {
        true
    }

    /// Bit-for-bit equality, so that `-0.0 != 0.0` and `NaN == NaN` for floats
    fn bit_eq(&self, other: &Self) -> bool {
        bytemuck::bytes_of(self) == bytemuck::bytes_of(other)
    }
}

macro_rules! impl_signed_element {
    ($($t:ty => $category:ident),* $(,)?) => {$(
        impl Element for $t {
            const CATEGORY: NumericCategory = NumericCategory::$category;

            fn bounds_from(range: ValueRange) -> Option<(Self, Self)> {
                match range {
                    ValueRange::Signed { min, max } => Some((<$t>::try_from(min).ok()?, <$t>::try_from(max).ok()?)),
                    _ => None,
                }
            }

            fn is_zero(&self) -> bool {
                *self == 0
            }
        }
    )*};
}

macro_rules! impl_unsigned_element {
    ($($t:ty => $category:ident),* $(,)?) => {$(
        impl Element for $t {
            const CATEGORY: NumericCategory = NumericCategory::$category;

            fn bounds_from(range: ValueRange) -> Option<(Self, Self)> {
                match range {
                    ValueRange::Unsigned { min, max } => Some((<$t>::try_from(min).ok()?, <$t>::try_from(max).ok()?)),
                    _ => None,
                }
            }

            fn is_zero(&self) -> bool {
                *self == 0
            }
        }
    )*};
}

impl_signed_element!(i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64);
impl_unsigned_element!(u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64);

impl Element for f32 {
    const CATEGORY: NumericCategory = NumericCategory::Fp32;

    fn bounds_from(range: ValueRange) -> Option<(Self, Self)> {
        match range {
            ValueRange::Float { min, max } => Some((min, max)),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        *self == 0.0
    }

    /// Finite bounds whose span is also finite
    fn samplable(min: Self, max: Self) -> bool {
        min.is_finite() && max.is_finite() && (max - min).is_finite()
    }
}
