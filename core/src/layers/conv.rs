//! Conv2D layer descriptor.

use crate::backend::VectorMac;
use crate::config::KernelConfig;
use crate::error::{expect_len, KernelResult};
use crate::fixed::Numeric;
use crate::kernels::conv2d::{conv2d, ConvGeometry};

/// Same-size convolution with a square odd kernel and a clamped border.
#[derive(Debug, Clone, Copy)]
pub struct Conv2dLayer<'p, T> {
    weights: &'p [T],
    bias: &'p [T],
    geometry: ConvGeometry,
}

impl<'p, T: Numeric> Conv2dLayer<'p, T> {
    /// `weights` is `[out_channels][k][k][in_channels]`, `bias` is `[out_channels]`.
    pub fn new(weights: &'p [T], bias: &'p [T], geometry: ConvGeometry) -> KernelResult<Self> {
        geometry.validate()?;
        expect_len("conv2d weights", geometry.weights_len(), weights.len())?;
        expect_len("conv2d bias", geometry.out_channels, bias.len())?;
        Ok(Self { weights, bias, geometry })
    }

    pub fn geometry(&self) -> &ConvGeometry {
        &self.geometry
    }

    pub fn forward<M: VectorMac<T>>(
        &self,
        mac: &M,
        config: &KernelConfig,
        input: &[T],
        output: &mut [T],
    ) -> KernelResult<()> {
        conv2d(mac, &config.schedule, &self.geometry, self.weights, self.bias, input, output)
    }
}
