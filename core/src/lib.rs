//! # fixnet-core: fixed-point inference kernels for RISC-V class accelerators
//!
//! A `no_std` Rust library running Linear, Conv2D, LSTM and RNN layers in
//! Q3.12 fixed point (or native `f32` for reference runs) on cores with a
//! packed 16-bit multiply-accumulate and an optional tanh/sigmoid unit.
//!
//! ## Architecture
//!
//! - **Numeric model** ([`fixed`]): Q3.12 `i16` with `i32` accumulators, one
//!   requantizing shift per output.
//! - **Backends** ([`backend`]): `VectorMac` / `LutActivate` seams with a
//!   portable fallback and a bit-exact model of the RISC-Y extension.
//! - **Tile scheduler** ([`tiling`]): greedy output-channel register blocking
//!   shared by every kernel.
//! - **Kernels** ([`kernels`]): Linear, Conv2D and two-input gate fusion.
//! - **Layers** ([`layers`]): tagged union of layer descriptors that borrow
//!   their weights and state.
//! - **Driver** ([`network`]): sequential execution over a caller-owned
//!   ping-pong scratch buffer, no heap.
//!
//! ## Usage
//!
//! ```ignore
//! use fixnet_core::*;
//!
//! let fc1 = LinearLayer::new(FC1_W, Some(FC1_B), 64, 32)?;
//! let lstm = LstmLayer::new(LSTM_W, 32, 16, &mut lstm_state)?;
//! let fc2 = LinearLayer::new(FC2_W, Some(FC2_B), 16, 4)?;
//!
//! let mut layers = [Layer::Linear(fc1), Layer::Lstm(lstm), Layer::Linear(fc2)];
//! let mut net = Network::new(&mut layers, 64)?;
//!
//! let mut scratch = Tensor::<i16, DEFAULT_SCRATCH_LEN>::zeros();
//! let logits = net.infer(&input, scratch.as_mut_slice(), 1)?;
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod activation;
pub mod backend;
pub mod config;
pub mod error;
pub mod fixed;
pub mod kernels;
pub mod layers;
pub mod network;
pub mod scratch;
pub mod tensor;
pub mod tiling;

// Re-export primary types
pub use activation::{sigmoid_q12, tanh_q12, Activation};
pub use backend::{pulp::PulpExt, Backend, LutActivate, Portable, VectorMac};
pub use config::{KernelConfig, DEFAULT_SCRATCH_LEN};
pub use error::{KernelError, KernelResult};
pub use fixed::{Numeric, FRAC_BITS, ONE};
pub use kernels::conv2d::ConvGeometry;
pub use kernels::gate::Projection;
pub use kernels::{conv2d, gate_fusion, linear};
pub use layers::{
    Conv2dLayer, Layer, LayerKind, LayerSpec, LinearLayer, LstmLayer, RecurrentWeights, RnnLayer,
};
pub use network::{Network, NetworkObserver};
pub use scratch::{Half, PingPong};
pub use tensor::{
    activate_in_place, add_in_place, copy_into, fill, hadamard_in_place, sigmoid_tensor, tanh_tensor,
    Tensor,
};
pub use tiling::{TilePass, TileSchedule};
