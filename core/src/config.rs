//! Runtime kernel configuration.
//!
//! Tile width and activation fusion used to be fixed per firmware image; here
//! they are plain values threaded through the kernels.

use crate::tiling::TileSchedule;

/// Scratch length (in elements) of the reference firmware: two halves of 1024.
pub const DEFAULT_SCRATCH_LEN: usize = 2048;

/// Knobs shared by every kernel invocation of a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    pub schedule: TileSchedule,
    /// Apply LSTM gate activations while storing the gate instead of in a
    /// separate pass over the gate tensor.
    pub fuse_activation: bool,
}

impl KernelConfig {
    pub const fn riscy() -> Self {
        Self { schedule: TileSchedule::riscy(), fuse_activation: true }
    }

    /// The ASIP has no activation unit on the store path.
    pub const fn asip() -> Self {
        Self { schedule: TileSchedule::asip(), fuse_activation: false }
    }

    pub const fn with_schedule(mut self, schedule: TileSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub const fn with_fused_activation(mut self, fuse: bool) -> Self {
        self.fuse_activation = fuse;
        self
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::riscy()
    }
}
