//! Piecewise-linear tanh and sigmoid over 16 magnitude buckets.
//!
//! The magnitude `a = |x|` of a Q3.12 input selects bucket `a >> 10`, so
//! each bucket spans 0.25 and the table covers `[0, 4.0)`. Inside a bucket the
//! result is `(m·a + q) >> 12`; beyond it the function saturates.
//!
//! The negative half is derived from the positive one without a second table:
//! tanh returns the bitwise complement `!r` (that is `-r - 1`, one LSB below the
//! true mirror), sigmoid returns `4095 + !r` (that is `4096 - r - 1`). Both are
//! part of the reference numerics and are reproduced exactly, which is why
//! `tanh(0) = 4` and the tables are only monotone up to a 1-2 LSB ripple at
//! some bucket seams.

use crate::fixed::{ONE, ONE_MINUS_EPS};

/// Number of linear segments in each table.
pub const LUT_SIZE: usize = 16;

/// Right shift from a Q3.12 magnitude to its bucket index.
pub const LUT_INDEX_SHIFT: u32 = 10;

pub(crate) const TANH_M: [i32; LUT_SIZE] = [
    4021, 3563, 2835, 2070, 1418, 929, 592, 370, 228, 140, 86, 52, 32, 19, 12, 7,
];

pub(crate) const TANH_Q: [i32; LUT_SIZE] = [
    17060, 512067, 2012407, 4361003, 7021506, 9510743, 11575189, 13158594, 14311861, 15123015,
    15679911, 16055709, 16306104, 16471340, 16579558, 16650000,
];

pub(crate) const SIG_M: [i32; LUT_SIZE] = [
    1019, 988, 930, 850, 758, 660, 563, 472, 391, 319, 258, 207, 165, 131, 104, 82,
];

pub(crate) const SIG_Q: [i32; LUT_SIZE] = [
    8389671, 8423495, 8544906, 8789991, 9169470, 9670607, 10264318, 10914030, 11583389,
    12241371, 12864661, 13437943, 13952921, 14406803, 14800713, 15138308,
];

/// Nonlinearity applied after a requantize, or in a standalone pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    #[default]
    Identity,
    Tanh,
    Sigmoid,
}

impl Activation {
    pub fn name(&self) -> &'static str {
        match self {
            Activation::Identity => "identity",
            Activation::Tanh => "tanh",
            Activation::Sigmoid => "sigmoid",
        }
    }
}

/// Table lookup on an already-computed magnitude. `None` means saturated.
#[inline(always)]
pub(crate) fn segment(m: &[i32; LUT_SIZE], q: &[i32; LUT_SIZE], magnitude: i32) -> Option<i32> {
    let idx = (magnitude >> LUT_INDEX_SHIFT) as usize;
    if idx >= LUT_SIZE {
        return None;
    }
    Some((m[idx] * magnitude + q[idx]) >> 12)
}

/// Mirror a positive-branch tanh result for a negative input.
#[inline(always)]
pub(crate) fn tanh_mirror(negative: bool, r: Option<i32>) -> i16 {
    match (r, negative) {
        (None, false) => ONE,
        (None, true) => -ONE,
        (Some(r), false) => r as i16,
        (Some(r), true) => !r as i16,
    }
}

/// Mirror a positive-branch sigmoid result for a negative input.
#[inline(always)]
pub(crate) fn sigmoid_mirror(negative: bool, r: Option<i32>) -> i16 {
    match (r, negative) {
        (None, false) => ONE,
        (None, true) => 0,
        (Some(r), false) => r as i16,
        (Some(r), true) => (ONE_MINUS_EPS as i32 + !r) as i16,
    }
}

/// Q3.12 tanh as computed by the kernel library (true negation for `|x|`).
pub fn tanh_q12(x: i16) -> i16 {
    let negative = x < 0;
    tanh_mirror(negative, segment(&TANH_M, &TANH_Q, (x as i32).abs()))
}

/// Q3.12 logistic sigmoid as computed by the kernel library.
pub fn sigmoid_q12(x: i16) -> i16 {
    let negative = x < 0;
    sigmoid_mirror(negative, segment(&SIG_M, &SIG_Q, (x as i32).abs()))
}
