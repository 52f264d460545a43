//! Hardware seams: the 2-lane multiply-accumulate and the LUT activation unit.
//!
//! Kernels are written once against [`VectorMac`] and [`LutActivate`]. The
//! [`Portable`] backend is plain integer/float arithmetic and is always
//! available; [`pulp::PulpExt`] models the RISC-Y extension instructions bit
//! for bit so its numerics can be checked on the host.

pub mod pulp;

use crate::activation::{self, Activation};
use crate::fixed::Numeric;

/// `acc + a0·b0 + a1·b1` over a packed pair, no rescale.
pub trait VectorMac<T: Numeric> {
    fn mac2(&self, acc: T::Acc, a: [T; 2], b: [T; 2]) -> T::Acc;

    /// Scalar fallback for the odd trailing element of a reduction.
    #[inline(always)]
    fn mac1(&self, acc: T::Acc, a: T, b: T) -> T::Acc {
        T::mac(acc, a, b)
    }
}

/// Elementwise tanh / sigmoid unit.
pub trait LutActivate<T: Numeric> {
    fn tanh(&self, x: T) -> T;

    fn sigmoid(&self, x: T) -> T;

    #[inline(always)]
    fn apply(&self, activation: Activation, x: T) -> T {
        match activation {
            Activation::Identity => x,
            Activation::Tanh => self.tanh(x),
            Activation::Sigmoid => self.sigmoid(x),
        }
    }
}

/// Everything a layer needs from the target.
pub trait Backend<T: Numeric>: VectorMac<T> + LutActivate<T> {}

impl<T: Numeric, B: VectorMac<T> + LutActivate<T>> Backend<T> for B {}

/// Software fallback for both seams.
#[derive(Debug, Clone, Copy, Default)]
pub struct Portable;

impl<T: Numeric> VectorMac<T> for Portable {
    #[inline(always)]
    fn mac2(&self, acc: T::Acc, a: [T; 2], b: [T; 2]) -> T::Acc {
        T::mac(T::mac(acc, a[0], b[0]), a[1], b[1])
    }
}

impl LutActivate<i16> for Portable {
    #[inline(always)]
    fn tanh(&self, x: i16) -> i16 {
        activation::tanh_q12(x)
    }

    #[inline(always)]
    fn sigmoid(&self, x: i16) -> i16 {
        activation::sigmoid_q12(x)
    }
}

#[cfg(feature = "std")]
impl LutActivate<f32> for Portable {
    #[inline(always)]
    fn tanh(&self, x: f32) -> f32 {
        x.tanh()
    }

    #[inline(always)]
    fn sigmoid(&self, x: f32) -> f32 {
        1.0 / (1.0 + (-x).exp())
    }
}
