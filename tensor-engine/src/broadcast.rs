//! Broadcast views and the NumPy broadcasting rules.
//!
//! A broadcast axis has stride zero: every coordinate along it addresses the same cell of the
//! borrowed buffer. Writing through one such coordinate is visible through all the others.

use crate::layout::Dims;
use crate::storage::{Storage, StorageMut};
use crate::tensor::{Tensor, TensorMut};
use crate::view::ViewLayout;
use crate::Result;
use smallvec::SmallVec;

/// A view over another tensor's buffer with some unit axes stretched.
#[derive(Clone, Debug)]
pub struct BroadcastedTensor<S> {
    storage: S,
    layout: ViewLayout,
    axes: Dims,
    reversed: bool,
}

/// Read-only broadcast of a borrowed buffer.
pub type BroadcastView<'a, T> = BroadcastedTensor<&'a [T]>;

/// Writable broadcast of a borrowed buffer.
pub type BroadcastViewMut<'a, T> = BroadcastedTensor<&'a mut [T]>;

impl<S: Storage> BroadcastedTensor<S> {
    pub(crate) fn from_parts(storage: S, layout: ViewLayout, axes: Dims, reversed: bool) -> Self {
        debug_assert!(
            axes.iter().all(|&axis| axis < layout.rank() && layout.strides()[axis] == 0),
            "broadcast axes must have zero stride"
        );
        Self {
            storage,
            layout,
            axes,
            reversed,
        }
    }
}

impl<S: Storage> Tensor for BroadcastedTensor<S> {
    type Elem = S::Elem;

    fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    fn buffer(&self) -> &[S::Elem] {
        self.storage.as_slice()
    }

    fn is_reversed_stride(&self) -> bool {
        self.reversed
    }

    fn broadcast_axes(&self) -> &[usize] {
        &self.axes
    }
}

impl<S: StorageMut> TensorMut for BroadcastedTensor<S> {
    fn buffer_mut(&mut self) -> &mut [S::Elem] {
        self.storage.as_mut_slice()
    }
}

/// Shape two operands broadcast to, `None` when some aligned pair of sizes differs and neither
/// is 1.
pub fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Option<Dims> {
    let rank = lhs.len().max(rhs.len());
    let padded = |dims: &[usize], axis: usize| {
        let missing = rank - dims.len();
        if axis < missing { 1 } else { dims[axis - missing] }
    };

    let mut shape: Dims = SmallVec::with_capacity(rank);
    for axis in 0..rank {
        let (l, r) = (padded(lhs, axis), padded(rhs, axis));
        let size = match (l, r) {
            _ if l == r => l,
            (1, _) => r,
            (_, 1) => l,
            _ => return None,
        };
        shape.push(size);
    }
    Some(shape)
}

/// Layout of `source` left-padded with unit axes and stretched to `shape`, plus the axes that
/// were stretched.
fn expand_layout(source: &ViewLayout, broadcast_axes: &[usize], shape: &[usize]) -> Result<(ViewLayout, Dims)> {
    let missing = shape.len() - source.rank();
    let mut layout = source.clone();
    for _ in 0..missing {
        layout = layout.insert_axis(0)?;
    }
    let mut axes: Dims = broadcast_axes.iter().map(|&axis| axis + missing).collect();
    for (axis, &size) in shape.iter().enumerate() {
        if layout.dims()[axis] != size {
            layout = layout.broadcast_axis(axis, size)?;
            axes.push(axis);
        }
    }
    Ok((layout, axes))
}

/// Views of `tensor` stretched to `shape`, which it must be broadcastable to.
pub fn broadcast_to<'a, A>(tensor: &'a A, shape: &[usize]) -> Result<BroadcastView<'a, A::Elem>>
where
    A: Tensor + ?Sized,
{
    if shape.len() < tensor.rank() {
        return Err(crate::TensorError::ShapeMismatch(format!(
            "cannot broadcast a tensor of rank {} to rank {}",
            tensor.rank(),
            shape.len()
        )));
    }
    let (layout, axes) = expand_layout(tensor.layout(), tensor.broadcast_axes(), shape)?;
    Ok(BroadcastedTensor::from_parts(
        tensor.buffer(),
        layout,
        axes,
        tensor.is_reversed_stride(),
    ))
}

/// Broadcasts two tensors against each other.
///
/// Returns two views of the common shape, or `None` when the shapes are incompatible. Rank zero
/// operands become views whose every axis has stride zero.
pub fn broadcast<'a, A, B>(lhs: &'a A, rhs: &'a B) -> Option<(BroadcastView<'a, A::Elem>, BroadcastView<'a, B::Elem>)>
where
    A: Tensor + ?Sized,
    B: Tensor + ?Sized,
{
    let Some(shape) = broadcast_shape(lhs.dims(), rhs.dims()) else {
        tracing::debug!(lhs = ?lhs.dims(), rhs = ?rhs.dims(), "shapes cannot be broadcast");
        return None;
    };
    let lhs = broadcast_to(lhs, &shape).ok()?;
    let rhs = broadcast_to(rhs, &shape).ok()?;
    Some((lhs, rhs))
}
