//! Library crate for tensor_engine
//!
//! Tensors are described by a [`ViewLayout`]: dimensions, signed strides and a start offset into
//! a flat buffer. [`DenseTensor`] owns its buffer, while [`BroadcastedTensor`] and [`TensorSlice`]
//! are views that borrow one. Broadcasting, axis insertion and removal, slicing and transposition
//! only rewrite the layout, so none of them copy elements.
//!
//! Every tensor kind implements the [`Tensor`] trait, which carries the shared read API (element
//! access, iteration, view construction, printing) once for all of them. Arithmetic lives in
//! [`NumericOps`] and [`FloatOps`], matrix products and convolutions are delegated to the
//! `tensor_kernels` crate.
//!
//! [`AnyTensor`] wraps a dense tensor of any supported [`ElementType`] for code that only learns
//! the element type at runtime, e.g. when tensors are looked up by name in a [`TensorMap`].

mod broadcast;
mod constructive;
mod conv;
mod dense;
mod display;
mod dynamic;
mod element;
mod error;
mod iterator;
mod math;
mod matmul;
mod misc;
mod slicing;
mod storage;
mod tensor;
mod tensor_slice;
mod view;

pub mod layout;

pub use crate::broadcast::{BroadcastView, BroadcastViewMut, BroadcastedTensor, broadcast, broadcast_shape, broadcast_to};
pub use crate::conv::{Conv2dParams, conv2d, max_pool2d};
pub use crate::dense::DenseTensor;
pub use crate::display::{print_data, print_shape};
pub use crate::dynamic::{AnyTensor, TensorMap};
pub use crate::element::{Element, ElementType, FloatElement, Numeric};
pub use crate::error::TensorError;
pub use crate::iterator::{DimensionsIterator, Elements, Offsets};
pub use crate::layout::Dims;
pub use crate::math::{FloatOps, NumericOps, zip_with};
pub use crate::matmul::{matmul, matmul_2d, matmul_2d_with, matmul_with};
pub use crate::slicing::{SliceDef, SliceIndex, expand_ellipsis, format_slices, parse_slices, replay_slicing_on_coords};
pub use crate::storage::{Storage, StorageMut};
pub use crate::tensor::{AxisIndex, Tensor, TensorMut};
pub use crate::tensor_slice::{SliceChain, SliceView, SliceViewMut, TensorSlice, ViewAxis};
pub use crate::view::{Strides, ViewLayout};

pub use tensor_kernels::{KernelConfig, MatMulKernel, PadType};

pub type Result<T> = std::result::Result<T, TensorError>;
