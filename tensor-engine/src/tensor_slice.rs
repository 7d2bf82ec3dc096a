//! Zero-copy slice views.

use crate::layout::Dims;
use crate::slicing::{SliceDef, SliceIndex, expand_ellipsis};
use crate::storage::{Storage, StorageMut};
use crate::tensor::{Tensor, TensorMut};
use crate::view::{Strides, ViewLayout};
use crate::{Result, TensorError};
use smallvec::SmallVec;

/// Where an axis of a slice view comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewAxis {
    /// Axis of the sliced source layout.
    Source(usize),
    /// Axis added by a new axis marker, with zero stride.
    Inserted { len: usize },
}

/// A source layout plus one resolved slice per source axis.
///
/// Slices are always kept relative to the source: slicing again merges the new selection into
/// them, so the view offset stays a single pass over the source axes however deep the chain is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceChain {
    source: ViewLayout,
    slices: SmallVec<[SliceDef; 4]>,
    axes: SmallVec<[ViewAxis; 4]>,
}

impl SliceChain {
    /// A chain selecting all of `source`.
    pub fn identity(source: &ViewLayout) -> Self {
        Self {
            source: source.clone(),
            slices: source.dims().iter().map(|&d| SliceDef::all(d)).collect(),
            axes: (0..source.rank()).map(ViewAxis::Source).collect(),
        }
    }

    pub fn source(&self) -> &ViewLayout {
        &self.source
    }

    /// Resolved selection on every source axis.
    pub fn slices(&self) -> &[SliceDef] {
        &self.slices
    }

    pub fn axes(&self) -> &[ViewAxis] {
        &self.axes
    }

    /// Applies `indices`, given relative to a view of shape `dims`, on top of this chain.
    pub fn compose(&self, dims: &[usize], indices: &[SliceIndex]) -> Result<SliceChain> {
        debug_assert_eq!(dims.len(), self.axes.len(), "chain and view differ in rank");
        let expanded = expand_ellipsis(indices, dims.len())?;

        let mut slices = self.slices.clone();
        let mut axes = SmallVec::new();
        let mut current = self.axes.iter().zip(dims).enumerate();

        for index in &expanded {
            if index.is_new_axis() {
                axes.push(ViewAxis::Inserted { len: 1 });
                continue;
            }
            let Some((position, (axis, &dim))) = current.next() else {
                return Err(TensorError::ShapeMismatch(format!(
                    "too many indices for a tensor of rank {}",
                    dims.len()
                )));
            };
            let def = index.to_slice_def(dim).map_err(|err| match err {
                TensorError::IndexOutOfBounds { index, size, .. } => TensorError::IndexOutOfBounds {
                    index,
                    axis: position,
                    size,
                },
                other => other,
            })?;

            match *axis {
                ViewAxis::Source(source_axis) => {
                    slices[source_axis] = slices[source_axis].merge(&def);
                    if !def.is_index {
                        axes.push(ViewAxis::Source(source_axis));
                    }
                }
                ViewAxis::Inserted { .. } => {
                    if !def.is_index {
                        axes.push(ViewAxis::Inserted { len: def.count });
                    }
                }
            }
        }

        Ok(SliceChain {
            source: self.source.clone(),
            slices,
            axes,
        })
    }

    /// Layout addressing the selected cells of the source buffer.
    pub fn layout(&self) -> ViewLayout {
        let source_strides = self.source.strides();
        let offset = self
            .slices
            .iter()
            .zip(source_strides)
            .fold(self.source.offset() as isize, |acc, (slice, &stride)| {
                acc + slice.start as isize * stride
            });

        let mut dims = Dims::new();
        let mut strides = Strides::new();
        for axis in &self.axes {
            match *axis {
                ViewAxis::Source(i) => {
                    dims.push(self.slices[i].count);
                    strides.push(source_strides[i] * self.slices[i].step);
                }
                ViewAxis::Inserted { len } => {
                    dims.push(len);
                    strides.push(0);
                }
            }
        }
        ViewLayout::new(dims, strides, offset.max(0) as usize)
    }
}

/// A view selecting a strided sub-region of another tensor's buffer.
#[derive(Clone, Debug)]
pub struct TensorSlice<S> {
    storage: S,
    chain: SliceChain,
    layout: ViewLayout,
    reversed: bool,
}

/// Read-only slice of a borrowed buffer.
pub type SliceView<'a, T> = TensorSlice<&'a [T]>;

/// Writable slice of a borrowed buffer.
pub type SliceViewMut<'a, T> = TensorSlice<&'a mut [T]>;

impl<S: Storage> TensorSlice<S> {
    pub(crate) fn from_chain(storage: S, chain: SliceChain, reversed: bool) -> Self {
        let layout = chain.layout();
        debug_assert!(
            layout.is_empty() || layout.offset_of(&vec![0; layout.rank()]) < storage.as_slice().len(),
            "slice starts outside of its buffer"
        );
        Self {
            storage,
            chain,
            layout,
            reversed,
        }
    }

    /// Resolved selection on every axis of the sliced tensor.
    pub fn slice_defs(&self) -> &[SliceDef] {
        self.chain.slices()
    }
}

impl<S: Storage> Tensor for TensorSlice<S> {
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

    fn slice_chain(&self) -> SliceChain {
        self.chain.clone()
    }
}

impl<S: StorageMut> TensorMut for TensorSlice<S> {
    fn buffer_mut(&mut self) -> &mut [S::Elem] {
        self.storage.as_mut_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DenseTensor, s, step};

    fn create_test_tensor() -> Result<DenseTensor<i32>> {
        DenseTensor::arange(0, 24, 1)?.reshape(&[4, 6])
    }

    fn create_3d_test_tensor() -> Result<DenseTensor<i32>> {
        DenseTensor::arange(0, 24, 1)?.reshape(&[2, 3, 4])
    }

    #[test]
    fn test_basic_slicing() -> Result<()> {
        let tensor = create_test_tensor()?;

        let full_slice = tensor.slice(s![.., ..])?;
        assert_eq!(full_slice, tensor);

        let row_slice = tensor.slice(s![1, ..])?;
        assert_eq!(row_slice, DenseTensor::from(vec![6, 7, 8, 9, 10, 11]));

        let col_slice = tensor.slice(s![.., 2])?;
        assert_eq!(col_slice, DenseTensor::from(vec![2, 8, 14, 20]));

        let range_slice = tensor.slice(s![1..3, 2..5])?;
        let expected = DenseTensor::from_vec(vec![8, 9, 10, 14, 15, 16], &[2, 3])?;
        assert_eq!(range_slice, expected);

        Ok(())
    }

    #[test]
    fn test_negative_indices() -> Result<()> {
        let tensor = create_test_tensor()?;

        let last_row = tensor.slice(s![-1, ..])?;
        assert_eq!(last_row, DenseTensor::from(vec![18, 19, 20, 21, 22, 23]));

        let last_two_rows = tensor.slice(s![-2.., ..])?;
        let expected = DenseTensor::try_from(vec![[12, 13, 14, 15, 16, 17], [18, 19, 20, 21, 22, 23]])?;
        assert_eq!(last_two_rows, expected);

        let without_last_col = tensor.slice(s![.., ..-1])?;
        let expected = DenseTensor::try_from(vec![
            [0, 1, 2, 3, 4],
            [6, 7, 8, 9, 10],
            [12, 13, 14, 15, 16],
            [18, 19, 20, 21, 22],
        ])?;
        assert_eq!(without_last_col, expected);

        Ok(())
    }

    #[test]
    fn test_stepped_slicing() -> Result<()> {
        let tensor = create_test_tensor()?;

        let stepped = tensor.slice(&[step![.., 2]])?;
        let expected = DenseTensor::try_from(vec![[0, 1, 2, 3, 4, 5], [12, 13, 14, 15, 16, 17]])?;
        assert_eq!(stepped, expected);

        let two_steps = tensor.slice(&[step![.., 2], step![.., 3]])?;
        let expected = DenseTensor::try_from(vec![[0, 3], [12, 15]])?;
        assert_eq!(two_steps, expected);

        Ok(())
    }

    #[test]
    fn test_mixed_slicing() -> Result<()> {
        let tensor = create_3d_test_tensor()?;

        let mixed = tensor.slice(s![0, 0..2, ..])?;
        let expected = DenseTensor::try_from(vec![[0, 1, 2, 3], [4, 5, 6, 7]])?;
        assert_eq!(mixed, expected);

        let mixed = tensor.slice(s![-1, .., 1..3])?;
        let expected = DenseTensor::try_from(vec![[13, 14], [17, 18], [21, 22]])?;
        assert_eq!(mixed, expected);

        Ok(())
    }

    #[test]
    fn test_notation() -> Result<()> {
        let tensor = create_3d_test_tensor()?;

        let last = tensor.slice_str("..., 2")?;
        assert_eq!(last.dims(), &[2, 3]);
        assert_eq!(last, DenseTensor::try_from(vec![[2, 6, 10], [14, 18, 22]])?);

        let inner = tensor.slice_str("1, 1:3, 2:4")?;
        assert_eq!(inner, DenseTensor::try_from(vec![[18, 19], [22, 23]])?);

        let expanded = tensor.slice_str("0, np.newaxis, :, 0")?;
        assert_eq!(expanded.dims(), &[1, 3]);
        assert_eq!(expanded, DenseTensor::try_from(vec![[0, 4, 8]])?);
        Ok(())
    }

    #[test]
    fn test_slice_of_slice_merges() -> Result<()> {
        let tensor = DenseTensor::<i32>::arange(0, 12, 1)?;
        let outer = tensor.slice_str("2:10:2")?;
        let inner = outer.slice_str("1:3")?;

        assert_eq!(inner, DenseTensor::from(vec![4, 6]));
        assert_eq!(inner.slice_defs(), &[SliceDef::new(4, 2, 2)]);

        let reversed = outer.slice_str("::-1")?;
        assert_eq!(reversed, DenseTensor::from(vec![8, 6, 4, 2]));
        assert_eq!(reversed.slice_defs(), &[SliceDef::new(8, -2, 4)]);

        let picked = reversed.slice_str("-1")?;
        assert_eq!(picked.rank(), 0);
        assert_eq!(picked.get_value(0), 2);
        Ok(())
    }

    #[test]
    fn test_slice_of_inserted_axis() -> Result<()> {
        let tensor = create_test_tensor()?;
        let view = tensor.slice_str("np.newaxis, 1")?;
        assert_eq!(view.dims(), &[1, 6]);

        let dropped = view.slice_str("0, 2:4")?;
        assert_eq!(dropped, DenseTensor::from(vec![8, 9]));

        let emptied = view.slice_str("1:, :")?;
        assert_eq!(emptied.dims(), &[0, 6]);
        assert!(emptied.is_empty());
        Ok(())
    }

    #[test]
    fn test_edge_cases() -> Result<()> {
        let tensor = create_test_tensor()?;

        let empty = tensor.slice(s![1..1, ..])?;
        assert_eq!(empty.dims(), &[0, 6]);
        assert_eq!(empty.elements().count(), 0);

        let zero_step = tensor.slice(&[SliceIndex::range_with_step(None, None, 0)])?;
        assert_eq!(zero_step.dims(), &[0, 6]);

        let single = tensor.slice(s![1, 2])?;
        assert_eq!(single.dims(), &[] as &[usize]);
        assert_eq!(single.elements().count(), 1);
        assert_eq!(single.get_value(0), 8);

        Ok(())
    }

    #[test]
    fn test_error_conditions() -> Result<()> {
        let tensor = create_test_tensor()?;

        assert_eq!(
            tensor.slice(s![.., 10]).err(),
            Some(TensorError::IndexOutOfBounds {
                index: 10,
                axis: 1,
                size: 6
            })
        );
        assert!(tensor.slice(s![-10, ..]).is_err());
        assert!(matches!(
            tensor.slice(s![.., .., ..]),
            Err(TensorError::ShapeMismatch(_))
        ));
        assert!(matches!(
            tensor.slice_str("..., 1, ..."),
            Err(TensorError::SliceParse(_))
        ));
        assert!(matches!(tensor.slice_str("1:a"), Err(TensorError::SliceParse(_))));

        Ok(())
    }

    #[test]
    fn test_slice_mut_writes_through() -> Result<()> {
        let mut tensor = create_test_tensor()?;
        {
            let mut column = tensor.slice_mut(s![.., 0])?;
            column.fill(-1);
        }
        assert_eq!(tensor.get(&[3, 0])?, &-1);
        assert_eq!(tensor.get(&[3, 1])?, &19);

        let patch = DenseTensor::try_from(vec![[100, 101], [102, 103]])?;
        tensor.assign_slice(s![2..4, 4..], &patch)?;
        assert_eq!(tensor.get(&[3, 5])?, &103);
        assert_eq!(tensor.get(&[2, 4])?, &100);

        assert!(tensor.assign_slice(s![0..3, 4..], &patch).is_err());
        Ok(())
    }
}
