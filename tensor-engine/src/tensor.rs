//! The capability traits shared by owning tensors and views.
//!
//! Every tensor kind exposes its buffer and a [`ViewLayout`] over it; everything else (indexing,
//! iteration, view construction, materialization) is provided on top of those two.

use crate::broadcast::{BroadcastView, BroadcastViewMut, BroadcastedTensor};
use crate::iterator::{DimensionsIterator, Elements, Offsets};
use crate::layout::{self, Dims};
use crate::slicing::{SliceIndex, parse_slices};
use crate::tensor_slice::{SliceChain, SliceView, SliceViewMut, TensorSlice};
use crate::view::ViewLayout;
use crate::{DenseTensor, Element, ElementType, Result, TensorError};
use num_traits::{NumCast, ToPrimitive};
use std::ops::Range;

/// Position along one axis, counted from its start or from its end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxisIndex {
    Start(usize),
    /// `FromEnd(1)` is the last element. `FromEnd(0)` also selects the last element.
    FromEnd(usize),
}

impl AxisIndex {
    fn resolve(&self, axis: usize, size: usize) -> Result<usize> {
        let out_of_bounds = |index: isize| TensorError::IndexOutOfBounds { index, axis, size };
        match *self {
            AxisIndex::Start(index) if index < size => Ok(index),
            AxisIndex::Start(index) => Err(out_of_bounds(index as isize)),
            AxisIndex::FromEnd(0) if size > 0 => Ok(size - 1),
            AxisIndex::FromEnd(back) if back > 0 && back <= size => Ok(size - back),
            AxisIndex::FromEnd(back) => Err(out_of_bounds(-(back as isize))),
        }
    }
}

/// Read access shared by every tensor kind.
pub trait Tensor {
    type Elem: Element;

    /// Shape, strides and base offset over [`Tensor::buffer`].
    fn layout(&self) -> &ViewLayout;

    /// The backing elements. Views return the whole buffer of the tensor they borrow.
    fn buffer(&self) -> &[Self::Elem];

    /// Whether linear indices run column-major.
    fn is_reversed_stride(&self) -> bool {
        false
    }

    /// Axes stretched by broadcasting.
    fn broadcast_axes(&self) -> &[usize] {
        &[]
    }

    /// The slicing state new slices compose with.
    fn slice_chain(&self) -> SliceChain {
        SliceChain::identity(self.layout())
    }

    fn dims(&self) -> &[usize] {
        self.layout().dims()
    }

    fn rank(&self) -> usize {
        self.layout().rank()
    }

    /// Number of elements, 1 for a rank zero tensor.
    fn len(&self) -> usize {
        self.layout().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn element_type(&self) -> ElementType {
        Self::Elem::ELEMENT_TYPE
    }

    /// Strides of the logical linear index, row-major or column-major.
    fn strides(&self) -> Dims {
        layout::strides_for(self.dims(), self.is_reversed_stride())
    }

    /// Element at a logical linear index.
    ///
    /// # Panics
    /// When `index >= len()`.
    fn get_value(&self, index: usize) -> Self::Elem {
        assert!(index < self.len(), "index {index} is out of bounds for length {}", self.len());
        let coords = layout::coords_for(&self.strides(), self.is_reversed_stride(), index);
        self.buffer()[self.layout().offset_of(&coords)]
    }

    /// Element at `coords`.
    fn get(&self, coords: &[usize]) -> Result<&Self::Elem> {
        let offset = self.layout().try_offset_of(coords)?;
        Ok(&self.buffer()[offset])
    }

    /// Element at positions that may count from the end of their axis.
    fn get_from_end(&self, indices: &[AxisIndex]) -> Result<&Self::Elem> {
        if indices.len() != self.rank() {
            return Err(TensorError::ShapeMismatch(format!(
                "{} indices given for a tensor of rank {}",
                indices.len(),
                self.rank()
            )));
        }
        let coords = indices
            .iter()
            .zip(self.dims())
            .enumerate()
            .map(|(axis, (index, &size))| index.resolve(axis, size))
            .collect::<Result<Dims>>()?;
        self.get(&coords)
    }

    /// Elements in row-major order of the logical coordinates.
    fn elements(&self) -> Elements<'_, Self::Elem> {
        Elements::new(self.buffer(), self.layout())
    }

    /// Copies the elements into a new row-major tensor.
    fn to_dense(&self) -> DenseTensor<Self::Elem> {
        DenseTensor::from_elements(self.elements().copied().collect(), self.dims())
    }

    /// Coordinates of every element.
    fn dims_iter(&self) -> DimensionsIterator {
        DimensionsIterator::new(self.dims())
    }

    /// Coordinates over the sub-shape formed by `axes`.
    fn dims_iter_range(&self, axes: Range<usize>) -> Result<DimensionsIterator> {
        if axes.start > axes.end || axes.end > self.rank() {
            return Err(TensorError::InvalidArgument(format!(
                "axes {axes:?} are out of range for a tensor of rank {}",
                self.rank()
            )));
        }
        Ok(DimensionsIterator::new(&self.dims()[axes]))
    }

    /// Sub-tensors along the first axis.
    fn outer_iter(&self) -> impl Iterator<Item = SliceView<'_, Self::Elem>> {
        let outer = self.dims().first().copied().unwrap_or(0);
        (0..outer).filter_map(move |i| self.slice(&[SliceIndex::Index(i as isize)]).ok())
    }

    /// View with the unit axis `axis` stretched to `size`. Cells along it alias each other.
    fn broadcast_dim(&self, axis: usize, size: usize) -> Result<BroadcastView<'_, Self::Elem>> {
        let layout = self.layout().broadcast_axis(axis, size)?;
        let mut axes: Dims = self.broadcast_axes().iter().copied().collect();
        if !axes.contains(&axis) {
            axes.push(axis);
        }
        Ok(BroadcastedTensor::from_parts(
            self.buffer(),
            layout,
            axes,
            self.is_reversed_stride(),
        ))
    }

    /// View with a unit axis inserted before `axis`.
    fn insert_dim(&self, axis: usize) -> Result<BroadcastView<'_, Self::Elem>> {
        let layout = self.layout().insert_axis(axis)?;
        let axes = self
            .broadcast_axes()
            .iter()
            .map(|&a| if a >= axis { a + 1 } else { a })
            .collect();
        Ok(BroadcastedTensor::from_parts(
            self.buffer(),
            layout,
            axes,
            self.is_reversed_stride(),
        ))
    }

    /// View with a unit axis in front.
    fn pad_left(&self) -> Result<BroadcastView<'_, Self::Elem>> {
        self.insert_dim(0)
    }

    /// View without the unit axis `axis`.
    fn remove_dim(&self, axis: usize) -> Result<BroadcastView<'_, Self::Elem>> {
        let layout = self.layout().remove_axis(axis)?;
        let axes = self
            .broadcast_axes()
            .iter()
            .filter(|&&a| a != axis)
            .map(|&a| if a > axis { a - 1 } else { a })
            .collect();
        Ok(BroadcastedTensor::from_parts(
            self.buffer(),
            layout,
            axes,
            self.is_reversed_stride(),
        ))
    }

    /// View with unit axes at `axes`, which index the result and may be negative.
    fn unsqueeze(&self, axes: &[isize]) -> Result<BroadcastView<'_, Self::Elem>> {
        let rank = self.rank() + axes.len();
        let mut resolved = layout::normalize_axes(axes, rank)?;
        resolved.sort_unstable();

        let mut view = self.layout().clone();
        let mut broadcast: Dims = self.broadcast_axes().iter().copied().collect();
        for &axis in &resolved {
            view = view.insert_axis(axis)?;
            for a in broadcast.iter_mut().filter(|a| **a >= axis) {
                *a += 1;
            }
        }
        Ok(BroadcastedTensor::from_parts(
            self.buffer(),
            view,
            broadcast,
            self.is_reversed_stride(),
        ))
    }

    /// View without the unit axes at `axes`, or without every unit axis when `axes` is empty.
    fn squeeze(&self, axes: &[isize]) -> Result<BroadcastView<'_, Self::Elem>> {
        let mut resolved = if axes.is_empty() {
            self.dims()
                .iter()
                .enumerate()
                .filter(|(_, d)| **d == 1)
                .map(|(axis, _)| axis)
                .collect()
        } else {
            layout::normalize_axes(axes, self.rank())?
        };
        resolved.sort_unstable_by(|a, b| b.cmp(a));

        let mut view = self.layout().clone();
        let mut broadcast: Dims = self.broadcast_axes().iter().copied().collect();
        for &axis in &resolved {
            view = view.remove_axis(axis)?;
            broadcast.retain(|a| *a != axis);
            for a in broadcast.iter_mut().filter(|a| **a > axis) {
                *a -= 1;
            }
        }
        Ok(BroadcastedTensor::from_parts(
            self.buffer(),
            view,
            broadcast,
            self.is_reversed_stride(),
        ))
    }

    /// Zero-copy view selected by `indices`.
    ///
    /// Unmentioned trailing axes are kept whole. Slicing a slice composes the two selections, so
    /// any chain of slices addresses the buffer with a single offset computation.
    fn slice(&self, indices: &[SliceIndex]) -> Result<SliceView<'_, Self::Elem>> {
        let chain = self.slice_chain().compose(self.dims(), indices)?;
        Ok(TensorSlice::from_chain(self.buffer(), chain, self.is_reversed_stride()))
    }

    /// [`Tensor::slice`] with Python notation, e.g. `"..., 2"` or `":, 2:4"`.
    fn slice_str(&self, notation: &str) -> Result<SliceView<'_, Self::Elem>> {
        self.slice(&parse_slices(notation)?)
    }

    /// Copies the elements into a new tensor of shape `dims`, keeping their row-major order.
    fn reshape(&self, dims: &[usize]) -> Result<DenseTensor<Self::Elem>> {
        self.to_dense().reshape(dims)
    }

    /// Copies the elements into a new tensor whose axis `i` is axis `perm[i]` of this one.
    fn transpose(&self, perm: &[usize]) -> Result<DenseTensor<Self::Elem>> {
        let permuted = self.layout().permuted(perm)?;
        let buffer = self.buffer();
        let data = Offsets::new(&permuted).map(|offset| buffer[offset]).collect();
        Ok(DenseTensor::from_elements(data, permuted.dims()))
    }

    /// Applies `f` to every element.
    fn map<U: Element>(&self, f: impl FnMut(Self::Elem) -> U) -> DenseTensor<U> {
        DenseTensor::from_elements(self.elements().copied().map(f).collect(), self.dims())
    }

    /// Converts every element to `U`.
    fn cast<U: Element + NumCast>(&self) -> Result<DenseTensor<U>>
    where
        Self::Elem: ToPrimitive,
    {
        let data = self
            .elements()
            .map(|&value| {
                <U as NumCast>::from(value).ok_or_else(|| {
                    TensorError::Cast(format!(
                        "{value} is not representable as {}",
                        U::ELEMENT_TYPE
                    ))
                })
            })
            .collect::<Result<Vec<U>>>()?;
        Ok(DenseTensor::from_elements(data, self.dims()))
    }

    /// Values along the diagonal of the first two axes, `offset` above (positive) or below
    /// (negative) the main one.
    fn diagonal(&self, offset: isize) -> Result<DenseTensor<Self::Elem>> {
        if self.rank() < 2 {
            return Err(TensorError::ShapeMismatch(format!(
                "a diagonal needs at least two axes, the tensor has {}",
                self.rank()
            )));
        }
        let dims = self.dims();
        let rows = dims[0] as isize + offset.min(0);
        let cols = dims[1] as isize - offset.max(0);
        let length = rows.min(cols);
        if length <= 0 {
            return Err(TensorError::InvalidArgument(format!(
                "no diagonal at offset {offset} for dims {dims:?}"
            )));
        }

        let mut result_dims: Dims = dims[1..].iter().copied().collect();
        result_dims[0] = length as usize;

        let mut data = Vec::with_capacity(layout::product(&result_dims));
        let mut coords: Dims = smallvec::SmallVec::from_elem(0, self.rank());
        for i in 0..length {
            coords[0] = (i - offset.min(0)) as usize;
            coords[1] = (i + offset.max(0)) as usize;
            let mut rest = DimensionsIterator::new(&dims[2..]);
            while let Some(inner) = rest.advance() {
                coords[2..].copy_from_slice(inner);
                data.push(self.buffer()[self.layout().offset_of(&coords)]);
            }
        }
        Ok(DenseTensor::from_elements(data, &result_dims))
    }

    /// Copy keeping the elements on and below (`upper == false`) or on and above the diagonal at
    /// `offset`; every other element is reset to its default.
    fn triangle(&self, offset: isize, upper: bool) -> Result<DenseTensor<Self::Elem>> {
        if self.rank() < 2 {
            return Err(TensorError::ShapeMismatch(format!(
                "a triangle needs at least two axes, the tensor has {}",
                self.rank()
            )));
        }
        let mut coords = self.dims_iter();
        let mut data = Vec::with_capacity(self.len());
        while let Some(c) = coords.advance() {
            let distance = c[1] as isize - c[0] as isize;
            let keep = if upper { distance >= offset } else { distance <= offset };
            data.push(if keep {
                self.buffer()[self.layout().offset_of(c)]
            } else {
                Self::Elem::default()
            });
        }
        Ok(DenseTensor::from_elements(data, self.dims()))
    }

    /// Shape as `[a,b,c]`.
    fn print_shape(&self) -> String {
        crate::display::print_shape(self.dims())
    }

    /// Nested bracket rendering of the elements, for diagnostics.
    fn print_data(&self, include_whitespace: bool) -> String {
        crate::display::print_data(self, include_whitespace)
    }
}

/// Write access for owning tensors and mutable views.
pub trait TensorMut: Tensor {
    fn buffer_mut(&mut self) -> &mut [Self::Elem];

    /// # Panics
    /// When `index >= len()`.
    fn set_value(&mut self, index: usize, value: Self::Elem) {
        assert!(index < self.len(), "index {index} is out of bounds for length {}", self.len());
        let coords = layout::coords_for(&self.strides(), self.is_reversed_stride(), index);
        let offset = self.layout().offset_of(&coords);
        self.buffer_mut()[offset] = value;
    }

    fn set(&mut self, coords: &[usize], value: Self::Elem) -> Result<()> {
        let offset = self.layout().try_offset_of(coords)?;
        self.buffer_mut()[offset] = value;
        Ok(())
    }

    /// Writes `value` to every logical element.
    fn fill(&mut self, value: Self::Elem) {
        let view = self.layout().clone();
        let buffer = self.buffer_mut();
        for offset in Offsets::new(&view) {
            buffer[offset] = value;
        }
    }

    /// Mutable zero-copy view selected by `indices`.
    fn slice_mut(&mut self, indices: &[SliceIndex]) -> Result<SliceViewMut<'_, Self::Elem>> {
        let chain = self.slice_chain().compose(self.dims(), indices)?;
        let reversed = self.is_reversed_stride();
        Ok(TensorSlice::from_chain(self.buffer_mut(), chain, reversed))
    }

    /// Mutable broadcast view. Writing one cell along `axis` writes all of them.
    fn broadcast_dim_mut(&mut self, axis: usize, size: usize) -> Result<BroadcastViewMut<'_, Self::Elem>> {
        let layout = self.layout().broadcast_axis(axis, size)?;
        let mut axes: Dims = self.broadcast_axes().iter().copied().collect();
        if !axes.contains(&axis) {
            axes.push(axis);
        }
        let reversed = self.is_reversed_stride();
        Ok(BroadcastedTensor::from_parts(self.buffer_mut(), layout, axes, reversed))
    }

    /// Copies `src` element by element into a tensor of the same shape.
    fn copy_from<S: Tensor<Elem = Self::Elem> + ?Sized>(&mut self, src: &S) -> Result<()> {
        if self.dims() != src.dims() {
            return Err(TensorError::ShapeMismatch(format!(
                "cannot copy a tensor of shape {:?} into one of shape {:?}",
                src.dims(),
                self.dims()
            )));
        }
        let view = self.layout().clone();
        let buffer = self.buffer_mut();
        for (offset, &value) in Offsets::new(&view).zip(src.elements()) {
            buffer[offset] = value;
        }
        Ok(())
    }

    /// Writes `src` into the region selected by `indices`.
    fn assign_slice<S: Tensor<Elem = Self::Elem> + ?Sized>(&mut self, indices: &[SliceIndex], src: &S) -> Result<()> {
        self.slice_mut(indices)?.copy_from(src)
    }
}
