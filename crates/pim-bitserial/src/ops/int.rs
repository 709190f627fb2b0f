//! Integer kernels
//!
//! All arithmetic wraps at the operand width. Signed kernels treat the most
//! significant row as the two's complement sign. The field helpers here are
//! shared with the floating-point kernels.

use super::microcode::{Field, Microcode, Row};
use super::KernelArgs;
use pim_backends::{BackendError, Result};

// ================================================================================================
// Field Helpers
// ================================================================================================

/// Common width of `fields`, or an error if they differ
pub(crate) fn same_width(fields: &[Field]) -> Result<u32> {
    let width = fields.first().map_or(0, |f| f.width);
    if fields.iter().any(|f| f.width != width) {
        let widths: Vec<u32> = fields.iter().map(|f| f.width).collect();
        return Err(BackendError::unsupported(format!("operand widths differ: {widths:?}")));
    }
    Ok(width)
}

pub(crate) fn fill(mc: &mut Microcode<'_>, dst: Field, value: bool) -> Result<()> {
    for row in dst.rows() {
        mc.constant(row, value)?;
    }
    Ok(())
}

/// `dst = src`, zero-extended or truncated to the width of `dst`
pub(crate) fn copy_field(mc: &mut Microcode<'_>, src: Field, dst: Field) -> Result<()> {
    for i in 0..dst.width {
        if i < src.width {
            mc.copy(src.row(i), dst.row(i))?;
        } else {
            mc.constant(dst.row(i), false)?;
        }
    }
    Ok(())
}

/// `out = field != 0`
pub(crate) fn or_reduce(mc: &mut Microcode<'_>, field: Field, out: Row) -> Result<()> {
    let mut rows = field.rows();
    match rows.next() {
        Some(first) => mc.copy(first, out)?,
        None => return mc.constant(out, false),
    }
    for row in rows {
        mc.or(out, row, out)?;
    }
    Ok(())
}

/// `dst = a + (invert_b ? !b : b) + carry`, leaving the carry-out in `carry`
///
/// `dst` may alias `a` or `b`.
pub(crate) fn add_with_carry(
    mc: &mut Microcode<'_>,
    a: Field,
    b: Field,
    dst: Field,
    carry: Row,
    invert_b: bool,
) -> Result<()> {
    let width = same_width(&[a, b, dst])?;
    let t = mc.temp(2)?;
    let (half, next) = (t.row(0), t.row(1));
    for i in 0..width {
        let mut bi = b.row(i);
        if invert_b {
            mc.not(bi, next)?;
            bi = next;
        }
        mc.xor(a.row(i), bi, half)?;
        mc.maj(a.row(i), bi, carry, next)?;
        mc.xor(half, carry, dst.row(i))?;
        mc.copy(next, carry)?;
    }
    mc.release(t)
}

/// `dst = a + b + carry_in`, or `a - b` with `invert_b` and `carry_in` set
pub(crate) fn add_fields(
    mc: &mut Microcode<'_>,
    a: Field,
    b: Field,
    dst: Field,
    carry_in: bool,
    invert_b: bool,
) -> Result<()> {
    let carry = mc.temp(1)?;
    mc.constant(carry.row(0), carry_in)?;
    add_with_carry(mc, a, b, dst, carry.row(0), invert_b)?;
    mc.release(carry)
}

/// `dst = a + k`, or `a + (mask ? k : 0)` when a mask row is given
pub(crate) fn add_const(mc: &mut Microcode<'_>, a: Field, k: u64, mask: Option<Row>, dst: Field) -> Result<()> {
    let width = same_width(&[a, dst])?;
    let t = mc.temp(3)?;
    let (carry, next, half) = (t.row(0), t.row(1), t.row(2));
    mc.constant(carry, false)?;
    for i in 0..width {
        let bit = i < 64 && (k >> i) & 1 == 1;
        let (ai, di) = (a.row(i), dst.row(i));
        match (bit, mask) {
            (false, _) => {
                mc.and(ai, carry, next)?;
                mc.xor(ai, carry, di)?;
            }
            (true, None) => {
                mc.or(ai, carry, next)?;
                mc.xnor(ai, carry, di)?;
            }
            (true, Some(m)) => {
                mc.xor(ai, m, half)?;
                mc.maj(ai, m, carry, next)?;
                mc.xor(half, carry, di)?;
            }
        }
        mc.copy(next, carry)?;
    }
    mc.release(t)
}

/// `field += bit`, in place
pub(crate) fn increment(mc: &mut Microcode<'_>, field: Field, bit: Row) -> Result<()> {
    let t = mc.temp(2)?;
    let (carry, next) = (t.row(0), t.row(1));
    mc.copy(bit, carry)?;
    for row in field.rows() {
        mc.and(row, carry, next)?;
        mc.xor(row, carry, row)?;
        mc.copy(next, carry)?;
    }
    mc.release(t)
}

/// `dst = cond ? -src : src`
pub(crate) fn negate_if(mc: &mut Microcode<'_>, src: Field, cond: Row, dst: Field) -> Result<()> {
    let width = same_width(&[src, dst])?;
    let t = mc.temp(4)?;
    let (c, carry, flipped, next) = (t.row(0), t.row(1), t.row(2), t.row(3));
    mc.copy(cond, c)?;
    mc.copy(cond, carry)?;
    for i in 0..width {
        mc.xor(src.row(i), c, flipped)?;
        mc.and(flipped, carry, next)?;
        mc.xor(flipped, carry, dst.row(i))?;
        mc.copy(next, carry)?;
    }
    mc.release(t)
}

/// `flag = a < b`
///
/// Scans from the LSB up, so the most significant differing bit decides.
pub(crate) fn less_than(mc: &mut Microcode<'_>, a: Field, b: Field, flag: Row, signed: bool) -> Result<()> {
    let width = same_width(&[a, b])?;
    let t = mc.temp(1)?;
    let differ = t.row(0);
    mc.constant(flag, false)?;
    for i in 0..width {
        mc.xor(a.row(i), b.row(i), differ)?;
        // at a differing sign bit the negative operand is the smaller one
        let decide = if signed && i == width - 1 { a.row(i) } else { b.row(i) };
        mc.sel(differ, decide, flag, flag)?;
    }
    mc.release(t)
}

/// `flag = a == b`
pub(crate) fn equal(mc: &mut Microcode<'_>, a: Field, b: Field, flag: Row) -> Result<()> {
    let width = same_width(&[a, b])?;
    let t = mc.temp(1)?;
    let same = t.row(0);
    mc.constant(flag, true)?;
    for i in 0..width {
        mc.xnor(a.row(i), b.row(i), same)?;
        mc.and(flag, same, flag)?;
    }
    mc.release(t)
}

/// `dst = a * b`, truncated to the width of `dst`
///
/// `dst` must not alias either source.
pub(crate) fn mul_into(mc: &mut Microcode<'_>, a: Field, b: Field, dst: Field) -> Result<()> {
    fill(mc, dst, false)?;
    let t = mc.temp(4)?;
    let (partial, half, next, carry) = (t.row(0), t.row(1), t.row(2), t.row(3));
    for i in 0..b.width.min(dst.width) {
        mc.constant(carry, false)?;
        for j in 0..a.width.min(dst.width - i) {
            let acc = dst.row(i + j);
            mc.and(a.row(j), b.row(i), partial)?;
            mc.xor(acc, partial, half)?;
            mc.maj(acc, partial, carry, next)?;
            mc.xor(half, carry, acc)?;
            mc.copy(next, carry)?;
        }
        if i + a.width < dst.width {
            mc.copy(carry, dst.row(i + a.width))?;
        }
    }
    mc.release(t)
}

/// Restoring division: `quot = num / den`, `rem = num % den`
///
/// `rem` has the width of `den`. The row shifted out of it at each step is
/// kept in a scratch row, so no field grows past the operand width. A zero
/// divisor yields an all-ones quotient.
pub(crate) fn udiv(mc: &mut Microcode<'_>, num: Field, den: Field, quot: Field, rem: Field) -> Result<()> {
    same_width(&[num, quot])?;
    let width = same_width(&[den, rem])?;

    fill(mc, rem, false)?;
    let diff = mc.temp(width)?;
    let t = mc.temp(2)?;
    let (carry, fits) = (t.row(0), t.row(1));

    for i in (0..num.width).rev() {
        mc.copy(rem.msb(), fits)?;
        for k in (1..width).rev() {
            mc.copy(rem.row(k - 1), rem.row(k))?;
        }
        mc.copy(num.row(i), rem.row(0))?;

        // a set top row means the partial remainder exceeds any divisor
        mc.constant(carry, true)?;
        add_with_carry(mc, rem, den, diff, carry, true)?;
        mc.or(fits, carry, fits)?;
        for k in 0..width {
            mc.sel(fits, diff.row(k), rem.row(k), rem.row(k))?;
        }
        mc.copy(fits, quot.row(i))?;
    }
    mc.release(t)?;
    mc.release(diff)
}

/// Comparison result: 1 or 0 in the destination
fn write_flag(mc: &mut Microcode<'_>, flag: Row, dest: Field) -> Result<()> {
    mc.copy(flag, dest.row(0))?;
    for i in 1..dest.width {
        mc.constant(dest.row(i), false)?;
    }
    Ok(())
}

fn bitwise<'m>(
    mc: &mut Microcode<'m>,
    args: &KernelArgs,
    mut gate: impl FnMut(&mut Microcode<'m>, Row, Row, Row) -> Result<()>,
) -> Result<()> {
    let (a, b) = args.sources()?;
    let width = same_width(&[a, b, args.dest])?;
    for i in 0..width {
        gate(mc, a.row(i), b.row(i), args.dest.row(i))?;
    }
    Ok(())
}

fn compare(mc: &mut Microcode<'_>, a: Field, b: Field, dest: Field, signed: bool) -> Result<()> {
    let flag = mc.temp(1)?;
    less_than(mc, a, b, flag.row(0), signed)?;
    write_flag(mc, flag.row(0), dest)
}

/// `dest = (a < b) == pick_a ? a : b`
fn select_by_order(mc: &mut Microcode<'_>, args: &KernelArgs, signed: bool, pick_a: bool) -> Result<()> {
    let (a, b) = args.sources()?;
    let width = same_width(&[a, b, args.dest])?;
    let flag = mc.temp(1)?;
    let flag = flag.row(0);
    less_than(mc, a, b, flag, signed)?;
    let (first, second) = if pick_a { (a, b) } else { (b, a) };
    for i in 0..width {
        mc.sel(flag, first.row(i), second.row(i), args.dest.row(i))?;
    }
    Ok(())
}

// ================================================================================================
// Kernels
// ================================================================================================

pub fn add(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    add_fields(mc, a, b, args.dest, false, false)
}

pub fn sub(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    add_fields(mc, a, b, args.dest, true, true)
}

/// Shift-and-add; the low half of the product is the same for both signednesses
pub fn mul(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    same_width(&[a, b, args.dest])?;
    mul_into(mc, a, b, args.dest)
}

pub fn div_unsigned(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    same_width(&[a, b, args.dest])?;
    let rem = mc.temp(b.width)?;
    udiv(mc, a, b, args.dest, rem)
}

/// Divide magnitudes, then negate when the signs differ (truncates toward zero)
pub fn div_signed(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    let width = same_width(&[a, b, args.dest])?;

    let negative = mc.temp(1)?;
    let negative = negative.row(0);
    mc.xor(a.msb(), b.msb(), negative)?;

    let abs_a = mc.temp(width)?;
    negate_if(mc, a, a.msb(), abs_a)?;
    let abs_b = mc.temp(width)?;
    negate_if(mc, b, b.msb(), abs_b)?;

    let rem = mc.temp(width)?;
    udiv(mc, abs_a, abs_b, args.dest, rem)?;
    negate_if(mc, args.dest, negative, args.dest)
}

pub fn abs_signed(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let a = args.src1;
    negate_if(mc, a, a.msb(), args.dest)
}

pub fn abs_unsigned(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    same_width(&[args.src1, args.dest])?;
    copy_field(mc, args.src1, args.dest)
}

pub fn and(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    bitwise(mc, args, |mc, a, b, d| mc.and(a, b, d))
}

pub fn or(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    bitwise(mc, args, |mc, a, b, d| mc.or(a, b, d))
}

pub fn xor(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    bitwise(mc, args, |mc, a, b, d| mc.xor(a, b, d))
}

pub fn xnor(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    bitwise(mc, args, |mc, a, b, d| mc.xnor(a, b, d))
}

pub fn gt_signed(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    compare(mc, b, a, args.dest, true)
}

pub fn gt_unsigned(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    compare(mc, b, a, args.dest, false)
}

pub fn lt_signed(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    compare(mc, a, b, args.dest, true)
}

pub fn lt_unsigned(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    compare(mc, a, b, args.dest, false)
}

pub fn eq(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    let flag = mc.temp(1)?;
    equal(mc, a, b, flag.row(0))?;
    write_flag(mc, flag.row(0), args.dest)
}

pub fn min_signed(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    select_by_order(mc, args, true, true)
}

pub fn min_unsigned(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    select_by_order(mc, args, false, true)
}

pub fn max_signed(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    select_by_order(mc, args, true, false)
}

pub fn max_unsigned(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    select_by_order(mc, args, false, false)
}

/// Ripple-increment a counter in the destination once per set source bit
pub fn popcount(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, dest) = (args.src1, args.dest);
    fill(mc, dest, false)?;
    for i in 0..a.width {
        // a count of i + 1 needs this many rows
        let span = (u32::BITS - (i + 1).leading_zeros()).min(dest.width);
        increment(mc, dest.slice(0, span), a.row(i))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::bitsimd_v::BitSimdVGates;
    use crate::ops::simdram::SimdramGates;
    use crate::ops::{GateSet, Kernel};
    use pim_backends::{DataType, Device, DeviceExt, DeviceFamily, FunctionalDevice};

    fn run_binary<T: bytemuck::Pod + Default>(
        gates: &dyn GateSet,
        data_type: DataType,
        kernel: Kernel,
        a: &[T],
        b: &[T],
    ) -> Vec<T> {
        let mut device = FunctionalDevice::new(gates.family());
        let bits = data_type.bits();
        let n = a.len() as u64;
        let src1 = device.allocate(n, bits, data_type).unwrap();
        let src2 = device.allocate_associated(bits, src1, data_type).unwrap();
        let dest = device.allocate_associated(bits, src1, data_type).unwrap();
        device.copy_to_device(a, src1).unwrap();
        device.copy_to_device(b, src2).unwrap();

        let args = KernelArgs::binary(
            Field::whole(src1, bits),
            Field::whole(src2, bits),
            Field::whole(dest, bits),
        );
        let mut mc = Microcode::new(&mut device, gates, src1).unwrap();
        kernel(&mut mc, &args).unwrap();
        mc.finish().unwrap();

        let mut out = vec![T::default(); a.len()];
        device.copy_from_device(dest, &mut out).unwrap();
        assert_eq!(device.live_objects(), 3, "kernel leaked temporaries");
        out
    }

    fn run_unary<T: bytemuck::Pod + Default>(gates: &dyn GateSet, data_type: DataType, kernel: Kernel, a: &[T]) -> Vec<T> {
        let mut device = FunctionalDevice::new(gates.family());
        let bits = data_type.bits();
        let src = device.allocate(a.len() as u64, bits, data_type).unwrap();
        let dest = device.allocate_associated(bits, src, data_type).unwrap();
        device.copy_to_device(a, src).unwrap();

        let args = KernelArgs::unary(Field::whole(src, bits), Field::whole(dest, bits));
        let mut mc = Microcode::new(&mut device, gates, src).unwrap();
        kernel(&mut mc, &args).unwrap();
        mc.finish().unwrap();

        let mut out = vec![T::default(); a.len()];
        device.copy_from_device(dest, &mut out).unwrap();
        out
    }

    const A8: [i8; 8] = [0, 1, -1, 127, -128, 42, -100, 7];
    const B8: [i8; 8] = [0, -1, -1, 1, -1, -43, 100, 7];

    #[test]
    fn test_add_sub_wrap() {
        for gates in [&BitSimdVGates as &dyn GateSet, &SimdramGates] {
            let sum = run_binary(gates, DataType::Int8, add, &A8, &B8);
            let expected: Vec<i8> = A8.iter().zip(&B8).map(|(a, b)| a.wrapping_add(*b)).collect();
            assert_eq!(sum, expected, "{}", gates.family());

            let diff = run_binary(gates, DataType::Int8, sub, &A8, &B8);
            let expected: Vec<i8> = A8.iter().zip(&B8).map(|(a, b)| a.wrapping_sub(*b)).collect();
            assert_eq!(diff, expected, "{}", gates.family());
        }
    }

    #[test]
    fn test_mul_low_half() {
        let a = [3u16, 65535, 300, 0, 1234];
        let b = [5u16, 2, 300, 9, 4321];
        let out = run_binary(&BitSimdVGates, DataType::UInt16, mul, &a, &b);
        let expected: Vec<u16> = a.iter().zip(&b).map(|(x, y)| x.wrapping_mul(*y)).collect();
        assert_eq!(out, expected);

        let out = run_binary(&BitSimdVGates, DataType::Int8, mul, &A8, &B8);
        let expected: Vec<i8> = A8.iter().zip(&B8).map(|(x, y)| x.wrapping_mul(*y)).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_div() {
        let a = [7u8, 255, 0, 100, 9];
        let b = [2u8, 16, 3, 100, 10];
        let out = run_binary(&BitSimdVGates, DataType::UInt8, div_unsigned, &a, &b);
        assert_eq!(out, vec![3, 15, 0, 1, 0]);

        let a = [-7i8, 7, -7, 7, -128, -128, 100];
        let b = [2i8, -2, -2, 2, -1, 1, -7];
        let out = run_binary(&BitSimdVGates, DataType::Int8, div_signed, &a, &b);
        let expected: Vec<i8> = a.iter().zip(&b).map(|(x, y)| x.wrapping_div(*y)).collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_div_64_bit() {
        let a = [u64::MAX, u64::MAX, 1 << 63, 12_345_678_901_234, 5, 0];
        let b = [1u64, u64::MAX, 3, 1_000_003, u64::MAX, 7];
        let out = run_binary(&BitSimdVGates, DataType::UInt64, div_unsigned, &a, &b);
        let expected: Vec<u64> = a.iter().zip(&b).map(|(x, y)| x / y).collect();
        assert_eq!(out, expected);

        let a = [i64::MIN, i64::MIN, i64::MAX, -9_000_000_000_000, 77, i64::MIN];
        let b = [-1i64, 1, -1, 7, i64::MIN, i64::MIN];
        let out = run_binary(&BitSimdVGates, DataType::Int64, div_signed, &a, &b);
        let expected: Vec<i64> = a.iter().zip(&b).map(|(x, y)| x.wrapping_div(*y)).collect();
        assert_eq!(out, expected);
        assert_eq!(out[0], i64::MIN);
    }

    #[test]
    fn test_div_by_zero_is_all_ones() {
        let out = run_binary(&BitSimdVGates, DataType::UInt16, div_unsigned, &[9u16, 0], &[0u16, 0]);
        assert_eq!(out, vec![u16::MAX, u16::MAX]);
    }

    #[test]
    fn test_comparisons() {
        for gates in [&BitSimdVGates as &dyn GateSet, &SimdramGates] {
            let lt = run_binary(gates, DataType::Int8, lt_signed, &A8, &B8);
            let expected: Vec<i8> = A8.iter().zip(&B8).map(|(a, b)| i8::from(a < b)).collect();
            assert_eq!(lt, expected);

            let gt = run_binary(gates, DataType::Int8, gt_signed, &A8, &B8);
            let expected: Vec<i8> = A8.iter().zip(&B8).map(|(a, b)| i8::from(a > b)).collect();
            assert_eq!(gt, expected);

            let eq_out = run_binary(gates, DataType::Int8, eq, &A8, &B8);
            assert_eq!(eq_out, vec![1, 0, 1, 0, 0, 0, 0, 1]);
        }

        let a = [200u8, 5, 128, 0];
        let b = [100u8, 6, 127, 0];
        assert_eq!(run_binary(&BitSimdVGates, DataType::UInt8, lt_unsigned, &a, &b), vec![0, 1, 0, 0]);
        assert_eq!(run_binary(&BitSimdVGates, DataType::UInt8, gt_unsigned, &a, &b), vec![1, 0, 1, 0]);
    }

    #[test]
    fn test_min_max() {
        let min = run_binary(&SimdramGates, DataType::Int8, min_signed, &A8, &B8);
        let expected: Vec<i8> = A8.iter().zip(&B8).map(|(a, b)| *a.min(b)).collect();
        assert_eq!(min, expected);

        let max = run_binary(&BitSimdVGates, DataType::Int8, max_signed, &A8, &B8);
        let expected: Vec<i8> = A8.iter().zip(&B8).map(|(a, b)| *a.max(b)).collect();
        assert_eq!(max, expected);

        let a = [200u8, 5];
        let b = [100u8, 6];
        assert_eq!(run_binary(&BitSimdVGates, DataType::UInt8, min_unsigned, &a, &b), vec![100, 5]);
        assert_eq!(run_binary(&BitSimdVGates, DataType::UInt8, max_unsigned, &a, &b), vec![200, 6]);
    }

    #[test]
    fn test_bitwise() {
        let a = [0b1100u8, 0xff, 0];
        let b = [0b1010u8, 0x0f, 0];
        assert_eq!(run_binary(&SimdramGates, DataType::UInt8, and, &a, &b), vec![0b1000, 0x0f, 0]);
        assert_eq!(run_binary(&SimdramGates, DataType::UInt8, or, &a, &b), vec![0b1110, 0xff, 0]);
        assert_eq!(run_binary(&SimdramGates, DataType::UInt8, xor, &a, &b), vec![0b0110, 0xf0, 0]);
        assert_eq!(run_binary(&BitSimdVGates, DataType::UInt8, xnor, &a, &b), vec![0xf9, 0x0f, 0xff]);
    }

    #[test]
    fn test_abs_and_popcount() {
        let a = [-5i16, 5, 0, i16::MIN, -1];
        let out = run_unary(&SimdramGates, DataType::Int16, abs_signed, &a);
        let expected: Vec<i16> = a.iter().map(|x| x.wrapping_abs()).collect();
        assert_eq!(out, expected);

        let out = run_unary(&BitSimdVGates, DataType::Int16, popcount, &a);
        let expected: Vec<i16> = a.iter().map(|x| x.count_ones() as i16).collect();
        assert_eq!(out, expected);

        let a = [7u32, u32::MAX, 0];
        assert_eq!(run_unary(&BitSimdVGates, DataType::UInt32, abs_unsigned, &a), a.to_vec());
        assert_eq!(run_unary(&SimdramGates, DataType::UInt32, popcount, &a), vec![3, 32, 0]);
    }

    #[test]
    fn test_simdram_rejects_native_logic_gates() {
        // A kernel lowered through the BitSIMD-V gate set uses `reg.and`,
        // which SIMDRAM devices refuse.
        let mut device = FunctionalDevice::new(DeviceFamily::Simdram);
        let src = device.allocate(4, 8, DataType::UInt8).unwrap();
        let dest = device.allocate_associated(8, src, DataType::UInt8).unwrap();
        let args = KernelArgs::binary(Field::whole(src, 8), Field::whole(src, 8), Field::whole(dest, 8));

        let gates = BitSimdVGates;
        let mut mc = Microcode::new(&mut device, &gates, src).unwrap();
        let err = and(&mut mc, &args).unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedInstruction(_)));
    }
}
