//! Linear (fully-connected) layer descriptor.

use crate::backend::VectorMac;
use crate::config::KernelConfig;
use crate::error::{expect_len, KernelError, KernelResult};
use crate::fixed::Numeric;
use crate::kernels::linear;

/// `out = W·x (+ b)` with weights borrowed from flash or a caller buffer.
#[derive(Debug, Clone, Copy)]
pub struct LinearLayer<'p, T> {
    weights: &'p [T],
    bias: Option<&'p [T]>,
    in_features: usize,
    out_features: usize,
}

impl<'p, T: Numeric> LinearLayer<'p, T> {
    /// `weights` is row-major `[out_features][in_features]`. `None` for `bias`
    /// means the layer has no bias term at all.
    pub fn new(
        weights: &'p [T],
        bias: Option<&'p [T]>,
        in_features: usize,
        out_features: usize,
    ) -> KernelResult<Self> {
        if in_features == 0 {
            return Err(KernelError::InvalidAttribute { name: "in_features", value: 0 });
        }
        if out_features == 0 {
            return Err(KernelError::InvalidAttribute { name: "out_features", value: 0 });
        }
        expect_len("linear weights", out_features * in_features, weights.len())?;
        if let Some(bias) = bias {
            expect_len("linear bias", out_features, bias.len())?;
        }
        Ok(Self { weights, bias, in_features, out_features })
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn has_bias(&self) -> bool {
        self.bias.is_some()
    }

    pub fn forward<M: VectorMac<T>>(
        &self,
        mac: &M,
        config: &KernelConfig,
        input: &[T],
        output: &mut [T],
    ) -> KernelResult<()> {
        expect_len("linear input", self.in_features, input.len())?;
        expect_len("linear output", self.out_features, output.len())?;
        linear(mac, &config.schedule, self.weights, self.bias, input, output)
    }
}
