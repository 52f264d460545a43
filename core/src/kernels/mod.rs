//! Layer kernels built on the tile scheduler and the MAC seam.
//!
//! All entry points are pure functions over explicit slices: no allocation, no
//! hidden state. Lengths are checked on entry; values are not.

pub mod conv2d;
pub mod gate;
pub mod linear;

pub use conv2d::conv2d;
pub use gate::gate_fusion;
pub use linear::linear;
