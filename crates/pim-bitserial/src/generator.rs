//! Random operand generation

use crate::element::Element;
use crate::error::{HarnessError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of bounded random operand vectors
pub struct OperandGenerator {
    rng: StdRng,
}

impl OperandGenerator {
    /// Generator seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible generator
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw `count` values uniformly from `[min, max]`
    ///
    /// With `exclude_zero` every zero is redrawn.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `min > max`, if a float range is not
    /// finite, or if the range holds nothing but zero while zeros are
    /// excluded.
    pub fn generate<T: Element>(&mut self, count: usize, min: T, max: T, exclude_zero: bool) -> Result<Vec<T>> {
        if !(min <= max) {
            return Err(HarnessError::config(format!("empty operand range [{min}, {max}]")));
        }
        if !T::samplable(min, max) {
            return Err(HarnessError::config(format!("operand range [{min}, {max}] is not finite")));
        }
        if exclude_zero && min.is_zero() && max.is_zero() {
            return Err(HarnessError::config(
                "operand range [0, 0] has no non-zero values",
            ));
        }

        let values = (0..count)
            .map(|_| loop {
                let value = self.rng.gen_range(min..=max);
                if !(exclude_zero && value.is_zero()) {
                    break value;
                }
            })
            .collect();
        Ok(values)
    }
}

impl Default for OperandGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Positions forced equal between the two general operands
///
/// `n / 40` and `3n / 4`, which are 100 and 3000 for the default population.
pub fn equality_indices(num_elements: usize) -> Result<[usize; 2]> {
    if num_elements < 2 {
        return Err(HarnessError::config(format!(
            "population of {num_elements} element(s) is too small, need at least 2"
        )));
    }
    Ok([num_elements / 40, 3 * num_elements / 4])
}

/// Copy `src1[i]` into `src2[i]` for every index
pub fn seed_equal<T: Copy>(src1: &[T], src2: &mut [T], indices: &[usize]) -> Result<()> {
    for &index in indices {
        let (Some(value), Some(slot)) = (src1.get(index), src2.get_mut(index)) else {
            return Err(HarnessError::config(format!(
                "equality index {index} outside operands of length {}",
                src1.len().min(src2.len())
            )));
        };
        *slot = *value;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_stay_in_bounds() {
        let mut gen = OperandGenerator::seeded(7);
        let values = gen.generate::<i8>(4000, -100, 127, false).unwrap();
        assert_eq!(values.len(), 4000);
        assert!(values.iter().all(|v| (-100..=127).contains(v)));

        let floats = gen.generate::<f32>(4000, -10_000.0, 10_000.0, false).unwrap();
        assert!(floats.iter().all(|v| (-10_000.0..=10_000.0).contains(v)));
    }

    #[test]
    fn test_exclude_zero() {
        let mut gen = OperandGenerator::seeded(11);
        let values = gen.generate::<u8>(4000, 0, 255, true).unwrap();
        assert_eq!(values.iter().filter(|v| **v == 0).count(), 0);

        let values = gen.generate::<i16>(200, -1, 1, true).unwrap();
        assert!(values.iter().all(|v| *v == -1 || *v == 1));
    }

    #[test]
    fn test_bad_ranges_are_configuration_errors() {
        let mut gen = OperandGenerator::seeded(1);
        assert!(matches!(
            gen.generate::<u32>(10, 0, 0, true),
            Err(HarnessError::Configuration(_))
        ));
        assert!(matches!(
            gen.generate::<i32>(10, 5, 4, false),
            Err(HarnessError::Configuration(_))
        ));
        assert_eq!(gen.generate::<u32>(3, 0, 0, false).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn test_non_finite_float_ranges_are_configuration_errors() {
        let mut gen = OperandGenerator::seeded(1);
        for (min, max) in [
            (f32::NEG_INFINITY, 0.0),
            (0.0, f32::INFINITY),
            (f32::NAN, 1.0),
            (f32::MIN, f32::MAX),
        ] {
            assert!(
                matches!(gen.generate::<f32>(4, min, max, false), Err(HarnessError::Configuration(_))),
                "[{min}, {max}]"
            );
        }
        assert_eq!(gen.generate::<f32>(2, 1.5, 1.5, true).unwrap(), vec![1.5, 1.5]);
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let a = OperandGenerator::seeded(42).generate::<i64>(64, -5, 5, false).unwrap();
        let b = OperandGenerator::seeded(42).generate::<i64>(64, -5, 5, false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_equality_indices() {
        assert_eq!(equality_indices(4000).unwrap(), [100, 3000]);
        assert_eq!(equality_indices(2).unwrap(), [0, 1]);
        assert!(matches!(equality_indices(1), Err(HarnessError::Configuration(_))));
    }

    #[test]
    fn test_seed_equal() {
        let src1 = vec![1, 2, 3, 4];
        let mut src2 = vec![9, 9, 9, 9];
        seed_equal(&src1, &mut src2, &[0, 3]).unwrap();
        assert_eq!(src2, vec![1, 9, 9, 4]);
        assert!(seed_equal(&src1, &mut src2, &[4]).is_err());
    }
}
