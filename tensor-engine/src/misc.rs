use crate::broadcast::BroadcastedTensor;
use crate::storage::{Storage, StorageMut};
use crate::tensor::{Tensor, TensorMut};
use crate::tensor_slice::TensorSlice;
use crate::{DenseTensor, Element};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Same shape and same elements in logical order, whatever the tensor kinds and layouts.
fn structurally_equal<A, B>(lhs: &A, rhs: &B) -> bool
where
    A: Tensor + ?Sized,
    B: Tensor<Elem = A::Elem> + ?Sized,
{
    lhs.dims() == rhs.dims() && lhs.elements().eq(rhs.elements())
}

impl<T: Element, O: Tensor<Elem = T> + ?Sized> PartialEq<O> for DenseTensor<T> {
    fn eq(&self, other: &O) -> bool {
        structurally_equal(self, other)
    }
}

impl<T: Element + Eq> Eq for DenseTensor<T> {}

impl<S: Storage, O: Tensor<Elem = S::Elem> + ?Sized> PartialEq<O> for BroadcastedTensor<S> {
    fn eq(&self, other: &O) -> bool {
        structurally_equal(self, other)
    }
}

impl<S: Storage, O: Tensor<Elem = S::Elem> + ?Sized> PartialEq<O> for TensorSlice<S> {
    fn eq(&self, other: &O) -> bool {
        structurally_equal(self, other)
    }
}

impl<T: Element> fmt::Debug for DenseTensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DenseTensor")
            .field("dims", &self.dims())
            .field("elements", &self.elements().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: Element, const N: usize> Index<[usize; N]> for DenseTensor<T> {
    type Output = T;

    fn index(&self, coords: [usize; N]) -> &T {
        &self.buffer()[self.layout().offset_of(&coords)]
    }
}

impl<T: Element, const N: usize> IndexMut<[usize; N]> for DenseTensor<T> {
    fn index_mut(&mut self, coords: [usize; N]) -> &mut T {
        let offset = self.layout().offset_of(&coords);
        &mut self.buffer_mut()[offset]
    }
}

impl<S: Storage, const N: usize> Index<[usize; N]> for BroadcastedTensor<S> {
    type Output = S::Elem;

    fn index(&self, coords: [usize; N]) -> &S::Elem {
        &self.buffer()[self.layout().offset_of(&coords)]
    }
}

impl<S: Storage, const N: usize> Index<[usize; N]> for TensorSlice<S> {
    type Output = S::Elem;

    fn index(&self, coords: [usize; N]) -> &S::Elem {
        &self.buffer()[self.layout().offset_of(&coords)]
    }
}

impl<S: StorageMut, const N: usize> IndexMut<[usize; N]> for TensorSlice<S> {
    fn index_mut(&mut self, coords: [usize; N]) -> &mut S::Elem {
        let offset = self.layout().offset_of(&coords);
        &mut self.buffer_mut()[offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Result, s};

    #[test]
    fn can_compare_tensors() -> Result<()> {
        let tensor1 = DenseTensor::<i32>::arange(0, 5, 1)?;
        let tensor2 = DenseTensor::<i32>::arange(0, 5, 1)?;
        let tensor3 = DenseTensor::<i32>::arange(0, 6, 1)?;

        assert_eq!(tensor1, tensor2);
        assert_ne!(tensor1, tensor3);
        Ok(())
    }

    #[test]
    fn compare_reshaped_tensors() -> Result<()> {
        let flat = DenseTensor::<i32>::arange(0, 8, 1)?;
        let matrix = flat.clone().reshape(&[2, 4])?;
        let cube = flat.reshape(&[2, 2, 2])?;

        assert_ne!(matrix, cube);
        assert_eq!(DenseTensor::from_vec((0..8).collect::<Vec<i32>>(), &[2, 4])?, matrix);
        Ok(())
    }

    #[test]
    fn compare_across_layouts() -> Result<()> {
        let row_major = DenseTensor::from_vec(vec![1, 2, 3, 4], &[2, 2])?;
        let col_major = DenseTensor::from_vec_with_layout(vec![1, 3, 2, 4], &[2, 2], true)?;
        assert_eq!(row_major, col_major);
        Ok(())
    }

    #[test]
    fn compare_sliced_tensors() -> Result<()> {
        let tensor = DenseTensor::<i32>::arange(0, 8, 1)?.reshape(&[2, 2, 2])?;

        let slice = tensor.slice(s![1])?;
        assert_eq!(slice, DenseTensor::from_vec(vec![4, 5, 6, 7], &[2, 2])?);
        assert_ne!(slice, DenseTensor::from(vec![4, 5, 6, 7]));
        assert_eq!(tensor.slice(s![1, 0])?, DenseTensor::from(vec![4, 5]));

        let column = DenseTensor::from_vec(vec![4, 6], &[2, 1])?;
        let wide = column.broadcast_dim(1, 2)?;
        assert_eq!(wide, DenseTensor::from_vec(vec![4, 4, 6, 6], &[2, 2])?);
        Ok(())
    }

    #[test]
    fn index_by_coordinates() -> Result<()> {
        let mut tensor = DenseTensor::<i32>::arange(0, 6, 1)?.reshape(&[2, 3])?;
        assert_eq!(tensor[[1, 2]], 5);
        tensor[[0, 1]] = 10;
        assert_eq!(tensor.get(&[0, 1])?, &10);

        {
            let mut view = tensor.slice_mut(s![.., 1..])?;
            assert_eq!(view[[1, 0]], 4);
            view[[1, 1]] = 20;
        }
        assert_eq!(tensor[[1, 2]], 20);

        let column = DenseTensor::from_vec(vec![1, 2], &[2, 1])?;
        assert_eq!(column.broadcast_dim(1, 3)?[[1, 2]], 2);
        Ok(())
    }

    #[test]
    #[should_panic]
    fn index_out_of_bounds_panics() {
        let tensor = DenseTensor::<i32>::new(&[2, 2]);
        let _ = tensor[[2, 0]];
    }

    #[test]
    fn debug_lists_elements() -> Result<()> {
        let tensor = DenseTensor::from_vec(vec![1, 2], &[1, 2])?;
        assert_eq!(
            format!("{tensor:?}"),
            "DenseTensor { dims: [1, 2], elements: [1, 2] }"
        );
        Ok(())
    }
}
