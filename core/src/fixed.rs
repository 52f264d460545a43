//! Numeric model: Q3.12 fixed point and the native-float reference build.
//!
//! A Q3.12 value is an `i16` with 12 fractional bits. Products of two Q3.12
//! values are summed in an `i32` accumulator that already carries the bias
//! pre-shifted by [`FRAC_BITS`], so one arithmetic right shift at the very end
//! normalizes bias and products together.
//!
//! Rounding is truncation toward negative infinity (`>>` on a signed value),
//! not round-to-nearest. Overflow is not detected: with weights bounded by
//! `|w| < 8.0` and inputs by `|x| < 8.0`, every product is below `2^30`, so a
//! reduction over `n` terms is safe while `n · max|w·x| < 2^31`. Debug builds
//! assert this inside the multiply-accumulate.

use core::fmt::Debug;

/// Fractional bits of the Q3.12 format.
pub const FRAC_BITS: u32 = 12;

/// 1.0 in Q3.12.
pub const ONE: i16 = 1 << FRAC_BITS;

/// Largest Q3.12 value strictly below 1.0.
pub const ONE_MINUS_EPS: i16 = ONE - 1;

/// Quantize a real number to Q3.12, truncating toward negative infinity.
///
/// Values outside `[-8.0, 8.0)` saturate to the i16 range; NaN maps to zero.
pub fn from_f32(x: f32) -> i16 {
    let scaled = x * ONE as f32;
    let mut t = scaled as i32;
    if (t as f32) > scaled {
        t -= 1;
    }
    t.clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Exact conversion of a Q3.12 value back to a real number.
#[inline]
pub fn to_f32(q: i16) -> f32 {
    q as f32 / ONE as f32
}

/// Scalar element type a kernel is instantiated with.
///
/// Implemented for `i16` (Q3.12, accumulating in `i32`) and `f32`
/// (accumulating in `f32`, no rescaling). Every kernel in the crate is generic
/// over this trait, so the numeric format is a type parameter rather than a
/// build switch.
pub trait Numeric: Copy + Default + PartialEq + Debug + 'static {
    /// Wide accumulator used during a reduction.
    type Acc: Copy + Debug;

    const ZERO: Self;

    /// The empty accumulator (used when a Linear layer has no bias).
    fn acc_zero() -> Self::Acc;

    /// Bias pre-scaled into accumulator precision.
    fn bias_to_acc(bias: Self) -> Self::Acc;

    /// Sum of two biases, widened before scaling.
    fn bias_pair_to_acc(b1: Self, b2: Self) -> Self::Acc;

    /// `acc + a·b` without rescaling.
    fn mac(acc: Self::Acc, a: Self, b: Self) -> Self::Acc;

    /// Normalize a finished accumulator back to the element format.
    fn requantize(acc: Self::Acc) -> Self;

    /// Elementwise sum; both operands share the format so no rescale is needed.
    fn add(a: Self, b: Self) -> Self;

    /// Elementwise product, rescaled once.
    fn hadamard(a: Self, b: Self) -> Self;

    fn from_f32(x: f32) -> Self;

    fn to_f32(self) -> f32;
}

impl Numeric for i16 {
    type Acc = i32;

    const ZERO: Self = 0;

    #[inline(always)]
    fn acc_zero() -> i32 {
        0
    }

    #[inline(always)]
    fn bias_to_acc(bias: i16) -> i32 {
        (bias as i32) << FRAC_BITS
    }

    #[inline(always)]
    fn bias_pair_to_acc(b1: i16, b2: i16) -> i32 {
        (b1 as i32 + b2 as i32) << FRAC_BITS
    }

    #[inline(always)]
    fn mac(acc: i32, a: i16, b: i16) -> i32 {
        let product = a as i32 * b as i32;
        debug_assert!(
            acc.checked_add(product).is_some(),
            "Q3.12 accumulator overflow: {acc} + {product}"
        );
        acc.wrapping_add(product)
    }

    #[inline(always)]
    fn requantize(acc: i32) -> i16 {
        // Stores into a 16-bit tensor keep the low half.
        (acc >> FRAC_BITS) as i16
    }

    #[inline(always)]
    fn add(a: i16, b: i16) -> i16 {
        a.wrapping_add(b)
    }

    #[inline(always)]
    fn hadamard(a: i16, b: i16) -> i16 {
        ((a as i32 * b as i32) >> FRAC_BITS) as i16
    }

    fn from_f32(x: f32) -> i16 {
        from_f32(x)
    }

    fn to_f32(self) -> f32 {
        to_f32(self)
    }
}

impl Numeric for f32 {
    type Acc = f32;

    const ZERO: Self = 0.0;

    #[inline(always)]
    fn acc_zero() -> f32 {
        0.0
    }

    #[inline(always)]
    fn bias_to_acc(bias: f32) -> f32 {
        bias
    }

    #[inline(always)]
    fn bias_pair_to_acc(b1: f32, b2: f32) -> f32 {
        b1 + b2
    }

    #[inline(always)]
    fn mac(acc: f32, a: f32, b: f32) -> f32 {
        acc + a * b
    }

    #[inline(always)]
    fn requantize(acc: f32) -> f32 {
        acc
    }

    #[inline(always)]
    fn add(a: f32, b: f32) -> f32 {
        a + b
    }

    #[inline(always)]
    fn hadamard(a: f32, b: f32) -> f32 {
        a * b
    }

    fn from_f32(x: f32) -> f32 {
        x
    }

    fn to_f32(self) -> f32 {
        self
    }
}

/// Quantize a slice of reals into a Q3.12 destination of equal length.
pub fn quantize_into(src: &[f32], dst: &mut [i16]) -> crate::KernelResult<()> {
    crate::error::expect_len("quantize destination", src.len(), dst.len())?;
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = from_f32(s);
    }
    Ok(())
}
