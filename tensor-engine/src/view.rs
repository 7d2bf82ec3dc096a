//! Physical layout of a tensor over its buffer: shape, signed per-axis strides and a base offset.
//!
//! Owning tensors use a contiguous layout; views derive theirs by zeroing strides (broadcast),
//! scaling and offsetting them (slicing) or inserting unit axes. No view ever touches element
//! memory to change its shape.

use crate::layout::{self, Dims};
use crate::{Result, TensorError};
use smallvec::SmallVec;

/// Signed strides: slices with a negative step walk their axis backwards.
pub type Strides = SmallVec<[isize; 4]>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewLayout {
    dims: Dims,
    strides: Strides,
    offset: usize,
}

impl ViewLayout {
    /// Layout of a contiguous buffer holding `dims`.
    pub fn contiguous(dims: &[usize], reversed: bool) -> Self {
        let strides = layout::strides_for(dims, reversed).iter().map(|&s| s as isize).collect();
        Self {
            dims: dims.iter().copied().collect(),
            strides,
            offset: 0,
        }
    }

    pub fn new(dims: Dims, strides: Strides, offset: usize) -> Self {
        debug_assert_eq!(dims.len(), strides.len(), "dims and strides differ in rank");
        Self { dims, strides, offset }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn len(&self) -> usize {
        layout::product(&self.dims)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffer position of `coords`.
    ///
    /// # Panics
    /// When the rank differs or a coordinate is out of bounds.
    pub fn offset_of(&self, coords: &[usize]) -> usize {
        assert_eq!(coords.len(), self.rank(), "coordinates and layout differ in rank");
        let mut offset = self.offset as isize;
        for ((&c, &d), &s) in coords.iter().zip(&self.dims).zip(&self.strides) {
            assert!(c < d, "coordinate {c} is out of bounds for an axis of size {d}");
            offset += c as isize * s;
        }
        offset as usize
    }

    /// Checked version of [`ViewLayout::offset_of`].
    pub fn try_offset_of(&self, coords: &[usize]) -> Result<usize> {
        if coords.len() != self.rank() {
            return Err(TensorError::ShapeMismatch(format!(
                "{} coordinates given for a tensor of rank {}",
                coords.len(),
                self.rank()
            )));
        }
        for (axis, (&c, &d)) in coords.iter().zip(&self.dims).enumerate() {
            if c >= d {
                return Err(TensorError::IndexOutOfBounds {
                    index: c as isize,
                    axis,
                    size: d,
                });
            }
        }
        Ok(self.offset_of(coords))
    }

    /// Stretches the unit axis `axis` to `size` by giving it a zero stride.
    pub fn broadcast_axis(&self, axis: usize, size: usize) -> Result<Self> {
        if axis >= self.rank() {
            return Err(TensorError::AxisOutOfRange {
                axis: axis as isize,
                rank: self.rank(),
            });
        }
        if self.dims[axis] != 1 {
            return Err(TensorError::NotBroadcastable {
                axis,
                size: self.dims[axis],
            });
        }
        let mut result = self.clone();
        result.dims[axis] = size;
        result.strides[axis] = 0;
        Ok(result)
    }

    /// Inserts a unit axis before `axis`; `axis == rank` appends.
    pub fn insert_axis(&self, axis: usize) -> Result<Self> {
        if axis > self.rank() {
            return Err(TensorError::AxisOutOfRange {
                axis: axis as isize,
                rank: self.rank(),
            });
        }
        let mut result = self.clone();
        result.dims.insert(axis, 1);
        result.strides.insert(axis, 0);
        Ok(result)
    }

    /// Drops the unit axis `axis`.
    pub fn remove_axis(&self, axis: usize) -> Result<Self> {
        if axis >= self.rank() {
            return Err(TensorError::AxisOutOfRange {
                axis: axis as isize,
                rank: self.rank(),
            });
        }
        if self.dims[axis] != 1 {
            return Err(TensorError::NotUnitDim {
                axis,
                size: self.dims[axis],
            });
        }
        let mut result = self.clone();
        result.dims.remove(axis);
        result.strides.remove(axis);
        Ok(result)
    }

    /// Reorders axes so that result axis `i` is axis `perm[i]`.
    pub fn permuted(&self, perm: &[usize]) -> Result<Self> {
        layout::check_permutation(perm, self.rank())?;
        Ok(Self {
            dims: layout::permute(&self.dims, perm),
            strides: perm.iter().map(|&axis| self.strides[axis]).collect(),
            offset: self.offset,
        })
    }

    /// True when the layout addresses `len()` consecutive cells from `offset` in row-major order.
    pub fn is_contiguous(&self) -> bool {
        let mut expected = 1isize;
        for (&d, &s) in self.dims.iter().zip(&self.strides).rev() {
            if d != 1 && s != expected {
                return false;
            }
            expected *= d as isize;
        }
        true
    }
}
