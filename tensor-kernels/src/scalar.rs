use crate::matmul;
use num_complex::Complex32;
use num_traits::{One, Zero};
use std::ops::{Add, AddAssign, Mul};

/// Arithmetic capability required by the generic kernels: an additive and a multiplicative
/// identity, addition and multiplication. Everything is resolved at compile time.
pub trait Scalar:
    Copy + Zero + One + Add<Output = Self> + Mul<Output = Self> + AddAssign + Send + Sync + 'static
{
    /// Fused multiply-add matrix multiplication for this element type.
    ///
    /// Only `f32` has hardware kernels, every other type runs the lane-vectorized loop.
    fn mm_fused(m: usize, n: usize, k: usize, a: &[Self], b: &[Self], c: &mut [Self]) {
        matmul::mm_vectorized(m, n, k, a, b, c);
    }
}

macro_rules! impl_scalar {
    ($($ty:ty),+) => {
        $(impl Scalar for $ty {})+
    };
}

impl_scalar!(i8, u8, i16, u16, i32, u32, i64, u64, f64, Complex32);

impl Scalar for f32 {
    fn mm_fused(m: usize, n: usize, k: usize, a: &[f32], b: &[f32], c: &mut [f32]) {
        matmul::mm_intrinsics(m, n, k, a, b, c);
    }
}
