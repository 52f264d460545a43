//! Gate fusion: `out = f(W1·x1 + b1 + W2·x2 + b2)` in one accumulation.
//!
//! Both projections land in the same tile of accumulators, so the per-gate
//! work of an LSTM/RNN needs neither two output tensors nor a tensor add.

use crate::activation::Activation;
use crate::backend::{LutActivate, VectorMac};
use crate::error::{expect_len, KernelResult};
use crate::fixed::Numeric;
use crate::tiling::{accumulate_tile, for_each_tile, TileSchedule, MAX_TILE_WIDTH};

/// One projection term of a fused gate.
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a, T> {
    /// Row-major `[out][input.len()]`.
    pub weights: &'a [T],
    pub bias: &'a [T],
    pub input: &'a [T],
}

impl<T: Numeric> Projection<'_, T> {
    fn check(&self, out_len: usize) -> KernelResult<()> {
        expect_len("gate weights", out_len * self.input.len(), self.weights.len())?;
        expect_len("gate bias", out_len, self.bias.len())
    }
}

/// Accumulate two projections, requantize once, then apply `activation`.
///
/// Pass [`Activation::Identity`] to leave the nonlinearity to a separate pass.
pub fn gate_fusion<T, B>(
    backend: &B,
    schedule: &TileSchedule,
    first: Projection<'_, T>,
    second: Projection<'_, T>,
    activation: Activation,
    output: &mut [T],
) -> KernelResult<()>
where
    T: Numeric,
    B: VectorMac<T> + LutActivate<T>,
{
    let out_len = output.len();
    first.check(out_len)?;
    second.check(out_len)?;

    let (in1, in2) = (first.input.len(), second.input.len());
    let mut acc = [T::acc_zero(); MAX_TILE_WIDTH];
    for_each_tile(schedule, out_len, |c0, width| {
        let acc = &mut acc[..width];
        for (t, a) in acc.iter_mut().enumerate() {
            *a = T::bias_pair_to_acc(first.bias[c0 + t], second.bias[c0 + t]);
        }

        accumulate_tile(backend, acc, first.input, first.weights, c0 * in1, in1);
        accumulate_tile(backend, acc, second.input, second.weights, c0 * in2, in2);

        for (o, &a) in output[c0..c0 + width].iter_mut().zip(acc.iter()) {
            *o = backend.apply(activation, T::requantize(a));
        }
    });
    Ok(())
}
