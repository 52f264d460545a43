//! Error types for the fixnet-core library.
//!
//! Every fallible entry point returns `KernelResult<T>`. Shape problems are
//! caught when a layer or network is built; the kernels repeat only the cheap
//! length checks needed to stay panic-free on a bare-metal target.

use thiserror::Error;

/// All error conditions reported by the kernel library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KernelError {
    /// A weight, bias, state or activation tensor disagrees with the layer attributes.
    #[error("shape mismatch for {tensor}: expected {expected} elements, got {actual}")]
    ShapeMismatch {
        tensor: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The caller-provided scratch buffer cannot hold the ping-pong halves.
    #[error("scratch buffer too small: need {required} elements, have {available}")]
    BufferTooSmall { required: usize, available: usize },

    /// A compiled layer record carries a type tag this engine does not know.
    #[error("unsupported layer type tag {0}")]
    UnsupportedLayerType(u8),

    /// Tile widths must be strictly descending, within the register budget, and end in 1.
    #[error("invalid tile schedule")]
    InvalidTileSchedule,

    /// A layer attribute is outside the range the kernels accept.
    #[error("invalid attribute {name} = {value}")]
    InvalidAttribute { name: &'static str, value: usize },

    /// Sequence length is zero, or a sequence was fed to a non-recurrent front layer.
    #[error("invalid sequence length {seq_len}")]
    InvalidSequenceLength { seq_len: usize },

    #[error("network has no layers")]
    EmptyNetwork,
}

pub type KernelResult<T> = Result<T, KernelError>;

/// Length check shared by layer constructors and kernel entry points.
#[inline]
pub(crate) fn expect_len(tensor: &'static str, expected: usize, actual: usize) -> KernelResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(KernelError::ShapeMismatch { tensor, expected, actual })
    }
}
