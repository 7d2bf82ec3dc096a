use crate::layout::{self, Dims};
use crate::tensor::{Tensor, TensorMut};
use crate::view::ViewLayout;
use crate::{Element, Result, TensorError};

/// A tensor owning its elements in one contiguous buffer.
///
/// This is the only tensor kind that allocates element memory. Broadcast and slice views borrow
/// the buffer and are bounded by its lifetime. Reshaping and adding or removing unit axes of an
/// owned tensor never copy.
#[derive(Clone)]
pub struct DenseTensor<T> {
    data: Vec<T>,
    layout: ViewLayout,
    reversed: bool,
}

impl<T: Element> DenseTensor<T> {
    /// A tensor of shape `dims` holding default values (zero for numbers).
    pub fn new(dims: &[usize]) -> Self {
        Self::from_elements(vec![T::default(); layout::product(dims)], dims)
    }

    /// Wraps `data` as a row-major tensor of shape `dims`.
    pub fn from_vec(data: Vec<T>, dims: &[usize]) -> Result<Self> {
        Self::from_vec_with_layout(data, dims, false)
    }

    /// Wraps `data` as a tensor of shape `dims`, column-major when `reversed`.
    pub fn from_vec_with_layout(data: Vec<T>, dims: &[usize], reversed: bool) -> Result<Self> {
        let expected = layout::checked_product(dims).ok_or_else(|| {
            TensorError::InvalidArgument(format!("the element count of {dims:?} overflows"))
        })?;
        if data.len() != expected {
            return Err(TensorError::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            layout: ViewLayout::contiguous(dims, reversed),
            reversed,
        })
    }

    pub(crate) fn from_elements(data: Vec<T>, dims: &[usize]) -> Self {
        debug_assert_eq!(data.len(), layout::product(dims), "buffer does not match the shape");
        Self {
            data,
            layout: ViewLayout::contiguous(dims, false),
            reversed: false,
        }
    }

    /// A rank zero tensor.
    pub fn scalar(value: T) -> Self {
        Self::from_elements(vec![value], &[])
    }

    /// A default-filled tensor of shape `dims` with this tensor's stride order.
    pub fn clone_empty(&self, dims: &[usize]) -> Self {
        Self {
            data: vec![T::default(); layout::product(dims)],
            layout: ViewLayout::contiguous(dims, self.reversed),
            reversed: self.reversed,
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Same elements in the same linear order with shape `dims`.
    pub fn reshape(self, dims: &[usize]) -> Result<Self> {
        if layout::checked_product(dims) != Some(self.data.len()) {
            return Err(TensorError::ReshapeLength {
                requested: dims.to_vec(),
                actual: self.data.len(),
            });
        }
        let layout = ViewLayout::contiguous(dims, self.reversed);
        Ok(Self { layout, ..self })
    }

    /// Inserts a unit axis before `axis`.
    pub fn insert_dim(self, axis: usize) -> Result<Self> {
        if axis > self.rank() {
            return Err(TensorError::AxisOutOfRange {
                axis: axis as isize,
                rank: self.rank(),
            });
        }
        let mut dims: Dims = self.dims().iter().copied().collect();
        dims.insert(axis, 1);
        self.reshape(&dims)
    }

    /// Inserts a unit axis in front.
    pub fn pad_left(self) -> Result<Self> {
        self.insert_dim(0)
    }

    /// Removes the unit axis `axis`.
    pub fn remove_dim(self, axis: usize) -> Result<Self> {
        let dims: Dims = self.layout.remove_axis(axis)?.dims().iter().copied().collect();
        self.reshape(&dims)
    }

    /// Inserts unit axes at `axes`, given relative to the result.
    pub fn unsqueeze(self, axes: &[isize]) -> Result<Self> {
        let dims: Dims = Tensor::unsqueeze(&self, axes)?.dims().iter().copied().collect();
        self.reshape(&dims)
    }

    /// Removes the unit axes at `axes`, or every unit axis when `axes` is empty.
    pub fn squeeze(self, axes: &[isize]) -> Result<Self> {
        let dims: Dims = Tensor::squeeze(&self, axes)?.dims().iter().copied().collect();
        self.reshape(&dims)
    }
}

impl<T: Element> Tensor for DenseTensor<T> {
    type Elem = T;

    fn layout(&self) -> &ViewLayout {
        &self.layout
    }

    fn buffer(&self) -> &[T] {
        &self.data
    }

    fn is_reversed_stride(&self) -> bool {
        self.reversed
    }

    fn get_value(&self, index: usize) -> T {
        self.data[index]
    }

    fn to_dense(&self) -> DenseTensor<T> {
        if self.reversed {
            DenseTensor::from_elements(self.elements().copied().collect(), self.dims())
        } else {
            self.clone()
        }
    }
}

impl<T: Element> TensorMut for DenseTensor<T> {
    fn buffer_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    fn set_value(&mut self, index: usize, value: T) {
        self.data[index] = value;
    }

    fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T: Element> From<Vec<T>> for DenseTensor<T> {
    fn from(data: Vec<T>) -> Self {
        let len = data.len();
        Self::from_elements(data, &[len])
    }
}

impl<T: Element, const N: usize> TryFrom<Vec<[T; N]>> for DenseTensor<T> {
    type Error = TensorError;

    fn try_from(rows: Vec<[T; N]>) -> Result<Self> {
        let dims = [rows.len(), N];
        let data = rows.into_iter().flatten().collect();
        Self::from_vec(data, &dims)
    }
}
