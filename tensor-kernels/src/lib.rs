//! Library crate for tensor_kernels
//!
//! Numeric kernels operating on raw row-major slices: matrix multiplication in four tiers
//! (scalar, lane-vectorized, unchecked pointers, fused multiply-add intrinsics), im2col based
//! grouped convolution, convolution padding geometry and error function approximations.
//!
//! Kernels never allocate their outputs: callers pass destination buffers sized for the
//! geometry they describe.

mod config;
mod error;
mod scalar;

pub mod conv;
pub mod erf;
pub mod hardware;
pub mod im2col;
pub mod matmul;
pub mod padding;

pub use crate::config::KernelConfig;
pub use crate::conv::{Conv2dGeometry, conv2d};
pub use crate::erf::{ErfFloat, erf, erf2};
pub use crate::error::KernelError;
pub use crate::im2col::im2col;
pub use crate::matmul::{LANES, MatMulKernel, matmul};
pub use crate::padding::{Conv2dOutputInfo, PadInfo, PadType};
pub use crate::scalar::Scalar;

pub type Result<T> = std::result::Result<T, KernelError>;
