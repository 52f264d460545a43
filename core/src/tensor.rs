//! Caller-owned tensors and the elementwise operations on them.
//!
//! Tensors carry no shape at run time: a kernel sees a flat slice and the
//! owning layer's attributes say how to read it. [`Tensor`] is a convenience
//! for stack- or `static`-allocated storage of a compile-time size; every
//! operation below works on plain slices so layer state and scratch halves
//! use the same code.

use crate::activation::Activation;
use crate::backend::LutActivate;
use crate::error::{expect_len, KernelError, KernelResult};
use crate::fixed::Numeric;

/// Fixed-capacity tensor of `N` elements.
///
/// Single const generic for the element count: the caller tracks the
/// row/column/channel interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T: Numeric, const N: usize> {
    data: [T; N],
}

impl<T: Numeric, const N: usize> Tensor<T, N> {
    pub fn zeros() -> Self {
        Self { data: [T::ZERO; N] }
    }

    /// Copy from a slice of exactly `N` elements.
    pub fn from_slice(slice: &[T]) -> KernelResult<Self> {
        expect_len("tensor", N, slice.len())?;
        let mut data = [T::ZERO; N];
        data.copy_from_slice(slice);
        Ok(Self { data })
    }

    /// Quantize real values into a new tensor.
    pub fn from_f32(values: &[f32]) -> KernelResult<Self> {
        expect_len("tensor", N, values.len())?;
        let mut data = [T::ZERO; N];
        for (d, &v) in data.iter_mut().zip(values) {
            *d = T::from_f32(v);
        }
        Ok(Self { data })
    }

    #[inline(always)]
    pub fn get(&self, index: usize) -> Option<T> {
        self.data.get(index).copied()
    }

    pub fn set(&mut self, index: usize, value: T) -> KernelResult<()> {
        match self.data.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(KernelError::ShapeMismatch { tensor: "tensor index", expected: N, actual: index }),
        }
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline(always)]
    pub const fn len(&self) -> usize {
        N
    }

    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }
}

impl<T: Numeric, const N: usize> Default for Tensor<T, N> {
    fn default() -> Self {
        Self::zeros()
    }
}

// =============================================================================
// Elementwise operations
// =============================================================================

/// `a += b`, no rescale.
pub fn add_in_place<T: Numeric>(a: &mut [T], b: &[T]) -> KernelResult<()> {
    expect_len("add operand", a.len(), b.len())?;
    for (x, &y) in a.iter_mut().zip(b) {
        *x = T::add(*x, y);
    }
    Ok(())
}

/// `a = (a ⊙ b) >> 12`.
pub fn hadamard_in_place<T: Numeric>(a: &mut [T], b: &[T]) -> KernelResult<()> {
    expect_len("hadamard operand", a.len(), b.len())?;
    for (x, &y) in a.iter_mut().zip(b) {
        *x = T::hadamard(*x, y);
    }
    Ok(())
}

pub fn copy_into<T: Numeric>(dst: &mut [T], src: &[T]) -> KernelResult<()> {
    expect_len("copy source", dst.len(), src.len())?;
    dst.copy_from_slice(src);
    Ok(())
}

pub fn fill<T: Numeric>(dst: &mut [T], value: T) {
    dst.fill(value);
}

/// Standalone activation pass, used when activations are not fused into a kernel.
pub fn activate_in_place<T: Numeric, L: LutActivate<T>>(lut: &L, activation: Activation, data: &mut [T]) {
    if activation == Activation::Identity {
        return;
    }
    for x in data.iter_mut() {
        *x = lut.apply(activation, *x);
    }
}

pub fn tanh_tensor<T: Numeric, L: LutActivate<T>>(lut: &L, data: &mut [T]) {
    activate_in_place(lut, Activation::Tanh, data);
}

pub fn sigmoid_tensor<T: Numeric, L: LutActivate<T>>(lut: &L, data: &mut [T]) {
    activate_in_place(lut, Activation::Sigmoid, data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Portable;

    #[test]
    fn tensor_from_f32_quantizes() {
        let t = Tensor::<i16, 3>::from_f32(&[1.0, -0.5, 0.25]).unwrap();
        assert_eq!(t.as_slice(), &[4096, -2048, 1024]);
        assert!(Tensor::<i16, 3>::from_f32(&[1.0]).is_err());
    }

    #[test]
    fn tensor_get_set_bounds() {
        let mut t = Tensor::<i16, 2>::zeros();
        t.set(1, 5).unwrap();
        assert_eq!(t.get(1), Some(5));
        assert_eq!(t.get(2), None);
        assert!(t.set(2, 1).is_err());
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn elementwise_in_place() {
        let mut a = [4096i16, -4096, 2048];
        add_in_place(&mut a, &[4096, 4096, 2048]).unwrap();
        assert_eq!(a, [8192, 0, 4096]);

        hadamard_in_place(&mut a, &[2048, 2048, -4096]).unwrap();
        assert_eq!(a, [4096, 0, -4096]);

        let mut b = [0i16; 3];
        copy_into(&mut b, &a).unwrap();
        assert_eq!(b, a);

        fill(&mut b, 7);
        assert_eq!(b, [7; 3]);

        assert!(add_in_place(&mut b, &[1, 2]).is_err());
        assert!(copy_into(&mut b, &[1]).is_err());
    }

    #[test]
    fn activation_passes() {
        let mut x = [0i16, 16384, -16384];
        tanh_tensor(&Portable, &mut x);
        assert_eq!(x, [4, 4096, -4096]);

        let mut y = [0i16, 16384, -16384];
        sigmoid_tensor(&Portable, &mut y);
        assert_eq!(y, [2048, 4096, 0]);

        let mut z = [-3i16, 9];
        activate_in_place(&Portable, Activation::Identity, &mut z);
        assert_eq!(z, [-3, 9]);
    }
}
