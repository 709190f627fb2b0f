//! IEEE-754 single precision kernels
//!
//! Subnormal inputs read as zero and results below the normal range flush
//! to a signed zero, matching a host running with DAZ and FTZ set.
//! Infinities, NaNs and exponent overflow are outside the operand ranges
//! these kernels are exercised with and are not modelled.
//!
//! Results are rounded to nearest, ties to even, from a 27-bit working
//! significand:
//!
//! ```text
//!  26   25 ........ 3   2   1   0
//! [1 ] [ fraction 23 ] [G] [R] [S]
//! ```
//!
//! Exponents are carried in 10-bit two's complement so that underflow shows
//! up as a non-positive value.

use super::int::{
    add_fields, add_const, add_with_carry, copy_field, fill, increment, less_than, mul_into, or_reduce, same_width,
    udiv,
};
use super::microcode::{Field, Microcode, Row};
use super::KernelArgs;
use pim_backends::{BackendError, Result};

const FRAC_BITS: u32 = 23;
const EXP_BITS: u32 = 8;
const SIG_BITS: u32 = FRAC_BITS + 1;
const WORD_BITS: u32 = 32;
const BIAS: u64 = 127;

const WORK_BITS: u32 = 27;
const EXP_WORK_BITS: u32 = 10;
const EXP_MODULUS: u64 = 1 << EXP_WORK_BITS;

/// Row views of one packed operand
#[derive(Clone, Copy)]
struct Unpacked {
    sign: Row,
    exp: Field,
    frac: Field,
    magnitude: Field,
}

impl Unpacked {
    fn new(word: Field) -> Self {
        Self {
            sign: word.msb(),
            exp: word.slice(FRAC_BITS, EXP_BITS),
            frac: word.slice(0, FRAC_BITS),
            magnitude: word.slice(0, WORD_BITS - 1),
        }
    }
}

fn check_words(fields: &[Field]) -> Result<()> {
    match same_width(fields)? {
        WORD_BITS => Ok(()),
        width => Err(BackendError::unsupported(format!("fp32 kernel on {width}-bit operands"))),
    }
}

/// `sig = 1.frac`, or zero for a zero or subnormal input; `hidden` gets the leading bit
fn significand(mc: &mut Microcode<'_>, frac: Field, exp: Field, hidden: Row, sig: Field) -> Result<()> {
    or_reduce(mc, exp, hidden)?;
    for i in 0..FRAC_BITS {
        mc.and(frac.row(i), hidden, sig.row(i))?;
    }
    mc.copy(hidden, sig.row(FRAC_BITS))
}

/// Shift `m` right by `d`, OR-ing everything shifted out into row 0
fn align_right(mc: &mut Microcode<'_>, m: Field, d: Field) -> Result<()> {
    let t = mc.temp(3)?;
    let (sticky, keep, far) = (t.row(0), t.row(1), t.row(2));

    for stage in 0..5 {
        let k = 1u32 << stage;
        let shift = d.row(stage);
        or_reduce(mc, m.slice(0, k), sticky)?;
        mc.not(shift, keep)?;
        for r in 0..m.width {
            if r + k < m.width {
                mc.sel(shift, m.row(r + k), m.row(r), m.row(r))?;
            } else {
                mc.and(keep, m.row(r), m.row(r))?;
            }
        }
        mc.and(sticky, shift, sticky)?;
        mc.or(m.row(0), sticky, m.row(0))?;
    }

    // 32 or more: only the sticky bit survives
    mc.or(d.row(5), d.row(6), far)?;
    mc.or(far, d.row(7), far)?;
    or_reduce(mc, m, sticky)?;
    mc.not(far, keep)?;
    for r in 1..m.width {
        mc.and(m.row(r), keep, m.row(r))?;
    }
    mc.sel(far, sticky, m.row(0), m.row(0))?;
    mc.release(t)
}

/// Shift `m` right by one when `cond` is set, keeping the sticky bit
fn shift_right_once(mc: &mut Microcode<'_>, m: Field, cond: Row) -> Result<()> {
    let t = mc.temp(1)?;
    let sticky = t.row(0);
    mc.and(m.row(0), cond, sticky)?;
    for r in 0..m.width - 1 {
        mc.sel(cond, m.row(r + 1), m.row(r), m.row(r))?;
    }
    // `cond` is the old top row, so the top is zero either way
    mc.constant(m.msb(), false)?;
    mc.or(m.row(0), sticky, m.row(0))?;
    mc.release(t)
}

/// Shift the leading one of `w` up to the top row, lowering `e` to match
fn normalize_left(mc: &mut Microcode<'_>, w: Field, e: Field) -> Result<()> {
    let t = mc.temp(2)?;
    let (shift, keep) = (t.row(0), t.row(1));
    for k in [16u32, 8, 4, 2, 1] {
        or_reduce(mc, w.slice(w.width - k, k), keep)?;
        mc.not(keep, shift)?;
        for r in (0..w.width).rev() {
            if r >= k {
                mc.sel(shift, w.row(r - k), w.row(r), w.row(r))?;
            } else {
                mc.and(w.row(r), keep, w.row(r))?;
            }
        }
        add_const(mc, e, EXP_MODULUS - u64::from(k), Some(shift), e)?;
    }
    mc.release(t)
}

/// Round `w` to nearest even and pack the result into `dest`
///
/// `zero` forces a signed zero; an exponent at or below zero flushes to one.
fn round_and_pack(mc: &mut Microcode<'_>, w: Field, e: Field, sign: Row, zero: Row, dest: Field) -> Result<()> {
    let t = mc.temp(3)?;
    let (round_up, scratch, nonzero) = (t.row(0), t.row(1), t.row(2));

    let (sticky, round, guard, lsb) = (w.row(0), w.row(1), w.row(2), w.row(3));
    mc.or(round, sticky, scratch)?;
    mc.or(scratch, lsb, scratch)?;
    mc.and(guard, scratch, round_up)?;

    let m = mc.temp(SIG_BITS + 1)?;
    copy_field(mc, w.slice(3, SIG_BITS), m)?;
    increment(mc, m, round_up)?;
    // rounding carried into a new leading bit: the fraction is already zero
    increment(mc, e, m.msb())?;

    or_reduce(mc, e, scratch)?;
    mc.not(scratch, scratch)?;
    mc.or(scratch, e.msb(), scratch)?;
    mc.or(scratch, zero, scratch)?;
    mc.not(scratch, nonzero)?;

    for i in 0..FRAC_BITS {
        mc.and(m.row(i), nonzero, dest.row(i))?;
    }
    for i in 0..EXP_BITS {
        mc.and(e.row(i), nonzero, dest.row(FRAC_BITS + i))?;
    }
    mc.copy(sign, dest.msb())?;

    mc.release(m)?;
    mc.release(t)
}

fn add_sub(mc: &mut Microcode<'_>, args: &KernelArgs, subtract: bool) -> Result<()> {
    let (a, b) = args.sources()?;
    check_words(&[a, b, args.dest])?;
    let (ua, ub) = (Unpacked::new(a), Unpacked::new(b));

    let flags = mc.temp(6)?;
    let (b_sign, swap, x_sign, y_sign, eff_sub) = (flags.row(0), flags.row(1), flags.row(2), flags.row(3), flags.row(4));
    let scratch = flags.row(5);
    if subtract {
        mc.not(ub.sign, b_sign)?;
    } else {
        mc.copy(ub.sign, b_sign)?;
    }

    // x is the operand of larger magnitude
    less_than(mc, ua.magnitude, ub.magnitude, swap, false)?;
    let x = mc.temp(WORD_BITS - 1)?;
    let y = mc.temp(WORD_BITS - 1)?;
    for i in 0..WORD_BITS - 1 {
        mc.sel(swap, ub.magnitude.row(i), ua.magnitude.row(i), x.row(i))?;
        mc.sel(swap, ua.magnitude.row(i), ub.magnitude.row(i), y.row(i))?;
    }
    mc.sel(swap, b_sign, ua.sign, x_sign)?;
    mc.sel(swap, ua.sign, b_sign, y_sign)?;
    mc.xor(x_sign, y_sign, eff_sub)?;
    let (x_exp, y_exp) = (x.slice(FRAC_BITS, EXP_BITS), y.slice(FRAC_BITS, EXP_BITS));

    // significands at rows 3..27 with a spare carry row on top
    let hidden = mc.temp(2)?;
    let mx = mc.temp(WORK_BITS + 1)?;
    let my = mc.temp(WORK_BITS + 1)?;
    for m in [mx, my] {
        fill(mc, m.slice(0, 3), false)?;
        mc.constant(m.msb(), false)?;
    }
    significand(mc, x.slice(0, FRAC_BITS), x_exp, hidden.row(0), mx.slice(3, SIG_BITS))?;
    significand(mc, y.slice(0, FRAC_BITS), y_exp, hidden.row(1), my.slice(3, SIG_BITS))?;

    let d = mc.temp(EXP_BITS)?;
    add_fields(mc, x_exp, y_exp, d, true, true)?;
    align_right(mc, my, d)?;

    // subtraction of magnitudes: mx + !my + 1
    for r in my.rows() {
        mc.xor(r, eff_sub, r)?;
    }
    mc.copy(eff_sub, scratch)?;
    add_with_carry(mc, mx, my, mx, scratch, false)?;

    let zero = mc.temp(1)?;
    let zero = zero.row(0);
    or_reduce(mc, mx, zero)?;
    mc.not(zero, zero)?;

    let e = mc.temp(EXP_WORK_BITS)?;
    copy_field(mc, x_exp, e)?;
    mc.copy(mx.msb(), scratch)?;
    shift_right_once(mc, mx, scratch)?;
    increment(mc, e, scratch)?;
    let w = mx.slice(0, WORK_BITS);
    normalize_left(mc, w, e)?;

    // exact cancellation rounds to +0
    mc.and(zero, eff_sub, scratch)?;
    mc.not(scratch, scratch)?;
    mc.and(scratch, x_sign, scratch)?;
    round_and_pack(mc, w, e, scratch, zero, args.dest)
}

// ================================================================================================
// Kernels
// ================================================================================================

pub fn add(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    add_sub(mc, args, false)
}

pub fn sub(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    add_sub(mc, args, true)
}

pub fn mul(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    check_words(&[a, b, args.dest])?;
    let (ua, ub) = (Unpacked::new(a), Unpacked::new(b));

    let flags = mc.temp(4)?;
    let (sign, zero, ha, hb) = (flags.row(0), flags.row(1), flags.row(2), flags.row(3));
    mc.xor(ua.sign, ub.sign, sign)?;

    let ma = mc.temp(SIG_BITS)?;
    let mb = mc.temp(SIG_BITS)?;
    significand(mc, ua.frac, ua.exp, ha, ma)?;
    significand(mc, ub.frac, ub.exp, hb, mb)?;
    mc.and(ha, hb, zero)?;
    mc.not(zero, zero)?;

    let product = mc.temp(2 * SIG_BITS)?;
    mul_into(mc, ma, mb, product)?;

    let e = mc.temp(EXP_WORK_BITS)?;
    let eb = mc.temp(EXP_WORK_BITS)?;
    copy_field(mc, ua.exp, e)?;
    copy_field(mc, ub.exp, eb)?;
    add_fields(mc, e, eb, e, false, false)?;
    add_const(mc, e, EXP_MODULUS - BIAS, None, e)?;

    // the product has its leading one at row 47 or 46
    let top = product.msb();
    let w = mc.temp(WORK_BITS)?;
    for j in 1..WORK_BITS {
        mc.sel(top, product.row(j + 21), product.row(j + 20), w.row(j))?;
    }
    let sticky = mc.temp(2)?;
    or_reduce(mc, product.slice(0, 22), sticky.row(0))?;
    or_reduce(mc, product.slice(0, 21), sticky.row(1))?;
    mc.sel(top, sticky.row(0), sticky.row(1), w.row(0))?;
    increment(mc, e, top)?;

    round_and_pack(mc, w, e, sign, zero, args.dest)
}

/// Long division of `1.frac_a << 26` by `1.frac_b`
///
/// A zero divisor is outside the operand contract and yields garbage.
pub fn div(mc: &mut Microcode<'_>, args: &KernelArgs) -> Result<()> {
    let (a, b) = args.sources()?;
    check_words(&[a, b, args.dest])?;
    let (ua, ub) = (Unpacked::new(a), Unpacked::new(b));

    let flags = mc.temp(5)?;
    let (sign, zero, ha, hb, scratch) = (flags.row(0), flags.row(1), flags.row(2), flags.row(3), flags.row(4));
    mc.xor(ua.sign, ub.sign, sign)?;

    let ma = mc.temp(SIG_BITS)?;
    let mb = mc.temp(SIG_BITS)?;
    significand(mc, ua.frac, ua.exp, ha, ma)?;
    significand(mc, ub.frac, ub.exp, hb, mb)?;
    mc.not(ha, zero)?;

    const SHIFT: u32 = WORK_BITS - 1;
    let num = mc.temp(SHIFT + SIG_BITS)?;
    fill(mc, num.slice(0, SHIFT), false)?;
    copy_field(mc, ma, num.slice(SHIFT, SIG_BITS))?;
    let quot = mc.temp(num.width)?;
    let rem = mc.temp(SIG_BITS)?;
    udiv(mc, num, mb, quot, rem)?;

    // the quotient has its leading one at row 26 or 25
    let top = quot.row(SHIFT);
    let w = mc.temp(WORK_BITS)?;
    for j in 1..WORK_BITS {
        mc.sel(top, quot.row(j), quot.row(j - 1), w.row(j))?;
    }
    or_reduce(mc, rem, scratch)?;
    mc.and(top, quot.row(0), w.row(0))?;
    mc.or(w.row(0), scratch, w.row(0))?;

    let e = mc.temp(EXP_WORK_BITS)?;
    let eb = mc.temp(EXP_WORK_BITS)?;
    copy_field(mc, ua.exp, e)?;
    copy_field(mc, ub.exp, eb)?;
    add_fields(mc, e, eb, e, true, true)?;
    add_const(mc, e, BIAS, None, e)?;
    mc.not(top, scratch)?;
    add_const(mc, e, EXP_MODULUS - 1, Some(scratch), e)?;

    round_and_pack(mc, w, e, sign, zero, args.dest)
}
