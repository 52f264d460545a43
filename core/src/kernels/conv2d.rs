//! Same-size 2D convolution with a clamped window.
//!
//! The tap loops of a border pixel are clipped to `[0, H) x [0, W)`, so it
//! accumulates over fewer taps; there is no padded input and no zero taps.
//!
//! Layouts:
//! - input `[H][W][C_in]` (channels innermost, so one tap is a contiguous run)
//! - weights `[C_out][K][K][C_in]`
//! - output `[C_out][H][W]` (channel planar)

use crate::backend::VectorMac;
use crate::error::{expect_len, KernelError, KernelResult};
use crate::fixed::Numeric;
use crate::tiling::{accumulate_tile, for_each_tile, TileSchedule, MAX_TILE_WIDTH};

/// Geometry of a Conv2D invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub in_channels: usize,
    pub out_channels: usize,
    /// Odd, square kernel side.
    pub kernel_size: usize,
    pub height: usize,
    pub width: usize,
}

impl ConvGeometry {
    pub fn validate(&self) -> KernelResult<()> {
        if self.kernel_size % 2 == 0 {
            return Err(KernelError::InvalidAttribute { name: "kernel_size", value: self.kernel_size });
        }
        for (name, value) in [
            ("in_channels", self.in_channels),
            ("out_channels", self.out_channels),
            ("height", self.height),
            ("width", self.width),
        ] {
            if value == 0 {
                return Err(KernelError::InvalidAttribute { name, value });
            }
        }
        Ok(())
    }

    pub fn input_len(&self) -> usize {
        self.height * self.width * self.in_channels
    }

    pub fn output_len(&self) -> usize {
        self.out_channels * self.height * self.width
    }

    pub fn weights_len(&self) -> usize {
        self.out_channels * self.filter_len()
    }

    /// Elements of one output channel's filter.
    pub fn filter_len(&self) -> usize {
        self.kernel_size * self.kernel_size * self.in_channels
    }
}

/// Convolve `input` into `output`; see the module docs for layouts.
pub fn conv2d<T: Numeric, M: VectorMac<T>>(
    mac: &M,
    schedule: &TileSchedule,
    geometry: &ConvGeometry,
    weights: &[T],
    bias: &[T],
    input: &[T],
    output: &mut [T],
) -> KernelResult<()> {
    geometry.validate()?;
    expect_len("conv2d weights", geometry.weights_len(), weights.len())?;
    expect_len("conv2d bias", geometry.out_channels, bias.len())?;
    expect_len("conv2d input", geometry.input_len(), input.len())?;
    expect_len("conv2d output", geometry.output_len(), output.len())?;

    let ConvGeometry { in_channels: cin, kernel_size: k, height: h_len, width: w_len, .. } = *geometry;
    let half = k / 2;
    let filter = geometry.filter_len();
    let plane = h_len * w_len;

    let mut acc = [T::acc_zero(); MAX_TILE_WIDTH];
    for_each_tile(schedule, geometry.out_channels, |c0, width| {
        let acc = &mut acc[..width];
        for h in 0..h_len {
            let rows = h.saturating_sub(half)..=usize::min(h + half, h_len - 1);
            for w in 0..w_len {
                for (a, &b) in acc.iter_mut().zip(&bias[c0..c0 + width]) {
                    *a = T::bias_to_acc(b);
                }

                for r in rows.clone() {
                    let kh = r + half - h;
                    for c in w.saturating_sub(half)..=usize::min(w + half, w_len - 1) {
                        let kw = c + half - w;
                        let pixel = (r * w_len + c) * cin;
                        let tap = (kh * k + kw) * cin;
                        accumulate_tile(mac, acc, &input[pixel..pixel + cin], weights, c0 * filter + tap, filter);
                    }
                }

                let px = h * w_len + w;
                for (t, &a) in acc.iter().enumerate() {
                    output[(c0 + t) * plane + px] = T::requantize(a);
                }
            }
        }
    });
    Ok(())
}
