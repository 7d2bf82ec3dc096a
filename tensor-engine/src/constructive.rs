//! Constructors producing new dense tensors.

use crate::layout;
use crate::tensor::Tensor;
use crate::{DenseTensor, Element, Numeric, Result, TensorError};
use num_traits::NumCast;
use rand::Rng;
use rand::distributions::{Distribution, Standard};

impl<T: Element> DenseTensor<T> {
    /// A tensor of shape `dims` with every element set to `value`.
    pub fn full(dims: &[usize], value: T) -> Self {
        Self::from_elements(vec![value; layout::product(dims)], dims)
    }
}

impl<T: Numeric> DenseTensor<T> {
    pub fn zeros(dims: &[usize]) -> Self {
        Self::full(dims, T::zero())
    }

    pub fn ones(dims: &[usize]) -> Self {
        Self::full(dims, T::one())
    }

    /// Square matrix with ones on the main diagonal.
    pub fn identity(n: usize) -> Self {
        let mut data = vec![T::zero(); n * n];
        for i in 0..n {
            data[i * n + i] = T::one();
        }
        Self::from_elements(data, &[n, n])
    }

    /// Square tensor with `diag` laid along the diagonal at `offset`, the inverse of
    /// [`Tensor::diagonal`].
    ///
    /// `diag` has shape `[len, rest..]`; the result has shape `[n, n, rest..]` where
    /// `n = len + |offset|`.
    pub fn from_diagonal<D>(diag: &D, offset: isize) -> Result<Self>
    where
        D: Tensor<Elem = T> + ?Sized,
    {
        let Some((&len, rest)) = diag.dims().split_first() else {
            return Err(TensorError::ShapeMismatch(
                "a diagonal needs at least one axis".to_string(),
            ));
        };
        let n = len + offset.unsigned_abs();
        let block = layout::product(rest);

        let mut dims = vec![n, n];
        dims.extend_from_slice(rest);
        let mut data = vec![T::zero(); layout::product(&dims)];

        let values: Vec<T> = diag.elements().copied().collect();
        let row_shift = (-offset).max(0) as usize;
        let col_shift = offset.max(0) as usize;
        for (i, chunk) in values.chunks(block.max(1)).take(len).enumerate() {
            let start = ((i + row_shift) * n + i + col_shift) * block;
            data[start..start + block].copy_from_slice(&chunk[..block]);
        }
        Ok(Self::from_elements(data, &dims))
    }
}

impl<T: Numeric + PartialOrd + NumCast> DenseTensor<T> {
    /// Values from `start` towards `stop` (exclusive) spaced by `step`, as a rank one tensor.
    ///
    /// A negative `step` counts down. A `step` of zero and non-finite bounds are rejected.
    pub fn arange(start: T, stop: T, step: T) -> Result<Self> {
        if !(step > T::zero() || step < T::zero()) {
            return Err(TensorError::InvalidArgument(format!("arange step must not be {step}")));
        }
        let (Some(from), Some(to), Some(by)) = (start.to_f64(), stop.to_f64(), step.to_f64()) else {
            return Err(TensorError::InvalidArgument(format!(
                "arange bounds {start}, {stop}, {step} have no numeric value"
            )));
        };
        let span = ((to - from) / by).ceil();
        if !span.is_finite() {
            return Err(TensorError::InvalidArgument(format!(
                "arange from {start} to {stop} by {step} is not a finite range"
            )));
        }
        if span >= isize::MAX as f64 {
            return Err(TensorError::InvalidArgument(format!(
                "arange from {start} to {stop} by {step} has too many elements"
            )));
        }
        let len = span.max(0.0) as usize;

        let data = (0..len)
            .map(|i| {
                <T as NumCast>::from(from + i as f64 * by).ok_or_else(|| {
                    TensorError::Cast(format!("element {i} of arange is not representable as {}", T::ELEMENT_TYPE))
                })
            })
            .collect::<Result<Vec<T>>>()?;
        Ok(Self::from_elements(data, &[len]))
    }
}

impl<T: Element> DenseTensor<T>
where
    Standard: Distribution<T>,
{
    /// Random values, uniform in `[0, 1)` for floats.
    pub fn rand(dims: &[usize]) -> Self {
        Self::rand_with(&mut rand::thread_rng(), dims)
    }

    /// Random values drawn from `rng`.
    pub fn rand_with<R: Rng + ?Sized>(rng: &mut R, dims: &[usize]) -> Self {
        let data = (0..layout::product(dims)).map(|_| rng.r#gen()).collect();
        Self::from_elements(data, dims)
    }
}
