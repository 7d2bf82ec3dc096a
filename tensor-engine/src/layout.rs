//! Index arithmetic shared by every tensor kind: strides, offsets, coordinates, axis helpers.
//!
//! These are the only implementations of stride computation and negative axis handling in the
//! crate; tensors and operations call into this module rather than re-deriving them.

use crate::{Result, TensorError};
use smallvec::SmallVec;

/// Shape or coordinate vector. Tensors of rank four or less keep it inline.
pub type Dims = SmallVec<[usize; 4]>;

/// Row-major (or column-major when `reversed`) strides of a contiguous buffer with `dims`.
pub fn strides_for(dims: &[usize], reversed: bool) -> Dims {
    let mut strides: Dims = SmallVec::from_elem(0, dims.len());
    let mut stride = 1;
    if reversed {
        for (s, &d) in strides.iter_mut().zip(dims) {
            *s = stride;
            stride *= d;
        }
    } else {
        for (s, &d) in strides.iter_mut().zip(dims).rev() {
            *s = stride;
            stride *= d;
        }
    }
    strides
}

/// Linear offset of `coords` under `strides`.
///
/// # Panics
/// When the two slices have different lengths.
pub fn offset_for(strides: &[usize], coords: &[usize]) -> usize {
    assert_eq!(strides.len(), coords.len(), "strides and coordinates differ in rank");
    strides.iter().zip(coords).map(|(s, c)| s * c).sum()
}

/// Decomposes a linear offset into coordinates, writing them into `coords`.
///
/// # Panics
/// When `coords` and `strides` have different lengths.
pub fn coords_into(strides: &[usize], reversed: bool, offset: usize, coords: &mut [usize]) {
    assert_eq!(strides.len(), coords.len(), "strides and coordinates differ in rank");
    debug_assert!(
        if reversed { is_ascending(strides) } else { is_descending(strides) },
        "index decomposition requires ordered strides"
    );

    let rank = strides.len();
    let mut remainder = offset;
    for i in 0..rank {
        // largest stride first
        let axis = if reversed { rank - 1 - i } else { i };
        let stride = strides[axis];
        if stride == 0 {
            coords[axis] = 0;
            continue;
        }
        coords[axis] = remainder / stride;
        remainder %= stride;
    }
}

/// Decomposes a linear offset into coordinates.
pub fn coords_for(strides: &[usize], reversed: bool, offset: usize) -> Dims {
    let mut coords: Dims = SmallVec::from_elem(0, strides.len());
    coords_into(strides, reversed, offset, &mut coords);
    coords
}

/// Re-expresses an offset computed under `source` strides as an offset under `target` strides,
/// keeping the coordinates unchanged.
pub fn transform_offset(offset: usize, source: &[usize], reversed: bool, target: &[usize]) -> usize {
    assert_eq!(source.len(), target.len(), "stride tables differ in rank");
    let rank = source.len();
    let mut result = 0;
    let mut remainder = offset;
    for i in 0..rank {
        let axis = if reversed { rank - 1 - i } else { i };
        if source[axis] == 0 {
            continue;
        }
        result += target[axis] * (remainder / source[axis]);
        remainder %= source[axis];
    }
    result
}

/// Number of elements of a shape. A rank zero shape holds one element.
pub fn product(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Number of elements of a shape, `None` on overflow.
pub fn checked_product(dims: &[usize]) -> Option<usize> {
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

pub fn is_ascending(values: &[usize]) -> bool {
    values.windows(2).all(|w| w[0] <= w[1])
}

pub fn is_descending(values: &[usize]) -> bool {
    values.windows(2).all(|w| w[0] >= w[1])
}

/// Splits `strides` into those of the axes not listed in `split_axes` and those that are, the
/// latter in the order of `split_axes`.
pub fn split_strides(strides: &[usize], split_axes: &[usize]) -> (Dims, Dims) {
    let kept = strides
        .iter()
        .enumerate()
        .filter(|(axis, _)| !split_axes.contains(axis))
        .map(|(_, &s)| s)
        .collect();
    let split = split_axes.iter().map(|&axis| strides[axis]).collect();
    (kept, split)
}

/// Resolves a possibly negative axis against `rank`.
pub fn normalize_axis(axis: isize, rank: usize) -> Result<usize> {
    let resolved = if axis < 0 { axis + rank as isize } else { axis };
    if resolved < 0 || resolved >= rank as isize {
        return Err(TensorError::AxisOutOfRange { axis, rank });
    }
    Ok(resolved as usize)
}

/// Resolves a list of possibly negative axes and rejects duplicates.
pub fn normalize_axes(axes: &[isize], rank: usize) -> Result<Dims> {
    let resolved = axes
        .iter()
        .map(|&axis| normalize_axis(axis, rank))
        .collect::<Result<Dims>>()?;
    if !check_no_repeated_dims(&resolved) {
        return Err(TensorError::InvalidArgument(format!("repeated axes in {axes:?}")));
    }
    Ok(resolved)
}

pub fn check_no_repeated_dims(dims: &[usize]) -> bool {
    dims.iter()
        .enumerate()
        .all(|(i, d)| !dims[..i].contains(d))
}

pub fn clamp(value: isize, min: isize, max: isize) -> isize {
    value.max(min).min(max)
}

/// Splits `shape` into the dimensions kept by a reduction over `axes` and the reduced ones.
pub fn shapes_for_reduction(shape: &[usize], axes: &[usize]) -> (Dims, Dims) {
    split_strides(shape, axes)
}

/// True when `axes` are exactly the last `axes.len()` axes of a tensor of `rank`, in order.
pub fn axes_are_innermost(axes: &[usize], rank: usize) -> bool {
    axes.len() <= rank && axes == innermost_axes(axes.len(), rank).as_slice()
}

/// Permutation moving `axes` to the innermost positions, `None` when they already are.
pub fn axes_permutation_for_reduction(axes: &[usize], rank: usize) -> Option<Dims> {
    if axes_are_innermost(axes, rank) {
        return None;
    }
    let mut perm: Dims = (0..rank).filter(|axis| !axes.contains(axis)).collect();
    perm.extend_from_slice(axes);
    Some(perm)
}

/// The last `n` axes of a tensor of `rank`.
pub fn innermost_axes(n: usize, rank: usize) -> Dims {
    (rank.saturating_sub(n)..rank).collect()
}

/// Reorders `dims` so that result axis `i` is input axis `perm[i]`.
pub fn permute(dims: &[usize], perm: &[usize]) -> Dims {
    perm.iter().map(|&axis| dims[axis]).collect()
}

/// Validates that `perm` is a permutation of `0..rank`.
pub fn check_permutation(perm: &[usize], rank: usize) -> Result<()> {
    if perm.len() != rank || perm.iter().any(|&axis| axis >= rank) || !check_no_repeated_dims(perm) {
        return Err(TensorError::InvalidArgument(format!(
            "{perm:?} is not a permutation of {rank} axes"
        )));
    }
    Ok(())
}
