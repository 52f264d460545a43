//! Host model of the RISC-Y DSP/RNN extension.
//!
//! `pl.sdotsp.h` multiplies two packed 16-bit lanes and adds both products to
//! a 32-bit register with wrap-around. `pl.tanh` / `pl.sig` read the same
//! tables as the software path but take the magnitude of a negative operand as
//! its one's complement, so negative inputs land one LSB further from zero in
//! the table than with [`crate::activation::tanh_q12`].

use super::{LutActivate, VectorMac};
use crate::activation::{sigmoid_mirror, segment, tanh_mirror, SIG_M, SIG_Q, TANH_M, TANH_Q};

/// Bit-exact software model of the accelerator instructions (Q3.12 only).
#[derive(Debug, Clone, Copy, Default)]
pub struct PulpExt;

#[inline(always)]
fn ones_complement_magnitude(x: i16) -> (bool, i32) {
    let x = x as i32;
    if x < 0 {
        (true, !x)
    } else {
        (false, x)
    }
}

impl VectorMac<i16> for PulpExt {
    #[inline(always)]
    fn mac2(&self, acc: i32, a: [i16; 2], b: [i16; 2]) -> i32 {
        acc.wrapping_add(a[0] as i32 * b[0] as i32)
            .wrapping_add(a[1] as i32 * b[1] as i32)
    }

    #[inline(always)]
    fn mac1(&self, acc: i32, a: i16, b: i16) -> i32 {
        acc.wrapping_add(a as i32 * b as i32)
    }
}

impl LutActivate<i16> for PulpExt {
    fn tanh(&self, x: i16) -> i16 {
        let (negative, magnitude) = ones_complement_magnitude(x);
        tanh_mirror(negative, segment(&TANH_M, &TANH_Q, magnitude))
    }

    fn sigmoid(&self, x: i16) -> i16 {
        let (negative, magnitude) = ones_complement_magnitude(x);
        sigmoid_mirror(negative, segment(&SIG_M, &SIG_Q, magnitude))
    }
}
