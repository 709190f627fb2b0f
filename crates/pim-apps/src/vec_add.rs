//! Element-wise Int32 addition on the device

use crate::error::{AppError, Result};
use pim_backends::{DataType, Device, DeviceExt, ObjectChain, Operands, PimOp};

/// `a + b` computed by the device's native add, wrapping on overflow
pub fn vector_add(device: &mut dyn Device, a: &[i32], b: &[i32]) -> Result<Vec<i32>> {
    if a.len() != b.len() {
        return Err(AppError::invalid(format!(
            "operand lengths differ: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Err(AppError::invalid("operands are empty"));
    }

    let mut chain = ObjectChain::new(device);
    let src1 = chain.base(a.len() as u64, DataType::Int32)?;
    let src2 = chain.associated(DataType::Int32)?;
    let dest = chain.associated(DataType::Int32)?;

    let device = chain.device();
    device.copy_to_device(a, src1)?;
    device.copy_to_device(b, src2)?;
    device.execute(PimOp::Add, Operands::binary(src1, src2, dest))?;

    let mut out = vec![0i32; a.len()];
    device.copy_from_device(dest, &mut out)?;
    chain.release()?;
    Ok(out)
}

/// The operands the vec-add binary uses: `i` and `2i - 10`
pub fn demo_operands(n: usize) -> (Vec<i32>, Vec<i32>) {
    let a = (0..n as i32).collect();
    let b = (0..n as i32).map(|i| i.wrapping_mul(2).wrapping_sub(10)).collect();
    (a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pim_backends::{DeviceFamily, FunctionalDevice};

    #[test]
    fn test_vector_add() {
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let (a, b) = demo_operands(512);
        let sum = vector_add(&mut device, &a, &b).unwrap();
        assert_eq!(sum[0], -10);
        assert_eq!(sum[511], 511 + 1012);
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn test_wraps_on_overflow() {
        let mut device = FunctionalDevice::new(DeviceFamily::Simdram);
        let sum = vector_add(&mut device, &[i32::MAX, -1], &[1, 1]).unwrap();
        assert_eq!(sum, vec![i32::MIN, 0]);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        assert!(matches!(
            vector_add(&mut device, &[1, 2], &[1]),
            Err(AppError::InvalidInput(_))
        ));
        assert!(vector_add(&mut device, &[], &[]).is_err());
    }
}
