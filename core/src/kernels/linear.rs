//! Fully-connected kernel: `out = W·x + b`.

use crate::backend::VectorMac;
use crate::error::{expect_len, KernelResult};
use crate::fixed::Numeric;
use crate::tiling::{accumulate_tile, for_each_tile, TileSchedule, MAX_TILE_WIDTH};

/// Fully-connected layer over one input vector.
///
/// `weights` is row-major `[output.len()][input.len()]`. With `bias = None`
/// every accumulator starts at zero; otherwise at `bias[c] << 12`.
pub fn linear<T: Numeric, M: VectorMac<T>>(
    mac: &M,
    schedule: &TileSchedule,
    weights: &[T],
    bias: Option<&[T]>,
    input: &[T],
    output: &mut [T],
) -> KernelResult<()> {
    let in_len = input.len();
    let out_len = output.len();
    expect_len("linear weights", out_len * in_len, weights.len())?;
    if let Some(bias) = bias {
        expect_len("linear bias", out_len, bias.len())?;
    }

    let mut acc = [T::acc_zero(); MAX_TILE_WIDTH];
    for_each_tile(schedule, out_len, |first, width| {
        let acc = &mut acc[..width];
        match bias {
            Some(bias) => {
                for (a, &b) in acc.iter_mut().zip(&bias[first..first + width]) {
                    *a = T::bias_to_acc(b);
                }
            }
            None => acc.fill(T::acc_zero()),
        }

        accumulate_tile(mac, acc, input, weights, first * in_len, in_len);

        for (o, &a) in output[first..first + width].iter_mut().zip(acc.iter()) {
            *o = T::requantize(a);
        }
    });
    Ok(())
}
