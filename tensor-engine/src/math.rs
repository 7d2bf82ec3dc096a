//! Elementwise arithmetic, reductions and float functions over any tensor kind.
//!
//! Binary operations broadcast their operands and always produce a new row-major
//! [`DenseTensor`]. Operands whose shapes cannot be broadcast give
//! [`TensorError::IncompatibleShapes`].

use crate::broadcast::broadcast;
use crate::iterator::Offsets;
use crate::layout::{self, Dims};
use crate::tensor::Tensor;
use crate::{DenseTensor, Element, FloatElement, Numeric, Result, TensorError};
use num_traits::{Float, One, Zero};
use std::borrow::Cow;
use std::ops::Neg;

/// Elements in row-major order, borrowed when the layout already is a contiguous row-major run.
pub(crate) fn row_major_elements<A: Tensor + ?Sized>(tensor: &A) -> Cow<'_, [A::Elem]> {
    let layout = tensor.layout();
    if !layout.is_empty() && layout.is_contiguous() {
        let start = layout.offset();
        Cow::Borrowed(&tensor.buffer()[start..start + layout.len()])
    } else {
        Cow::Owned(tensor.elements().copied().collect())
    }
}

/// Combines the broadcast elements of `lhs` and `rhs` pairwise.
pub fn zip_with<A, B, U, F>(lhs: &A, rhs: &B, mut f: F) -> Result<DenseTensor<U>>
where
    A: Tensor + ?Sized,
    B: Tensor + ?Sized,
    U: Element,
    F: FnMut(A::Elem, B::Elem) -> U,
{
    let Some((l, r)) = broadcast(lhs, rhs) else {
        return Err(TensorError::IncompatibleShapes {
            lhs: lhs.dims().to_vec(),
            rhs: rhs.dims().to_vec(),
        });
    };
    let data = l.elements().zip(r.elements()).map(|(&a, &b)| f(a, b)).collect();
    Ok(DenseTensor::from_elements(data, l.dims()))
}

/// Arithmetic available for every numeric element type.
pub trait NumericOps: Tensor<Elem: Numeric> {
    fn add<B: Tensor<Elem = Self::Elem> + ?Sized>(&self, other: &B) -> Result<DenseTensor<Self::Elem>> {
        zip_with(self, other, |a, b| a + b)
    }

    fn sub<B: Tensor<Elem = Self::Elem> + ?Sized>(&self, other: &B) -> Result<DenseTensor<Self::Elem>> {
        zip_with(self, other, |a, b| a - b)
    }

    fn mul<B: Tensor<Elem = Self::Elem> + ?Sized>(&self, other: &B) -> Result<DenseTensor<Self::Elem>> {
        zip_with(self, other, |a, b| a * b)
    }

    /// # Panics
    /// On integer division by zero.
    fn div<B: Tensor<Elem = Self::Elem> + ?Sized>(&self, other: &B) -> Result<DenseTensor<Self::Elem>> {
        zip_with(self, other, |a, b| a / b)
    }

    fn neg(&self) -> DenseTensor<Self::Elem>
    where
        Self::Elem: Neg<Output = Self::Elem>,
    {
        self.map(|a| -a)
    }

    fn square(&self) -> DenseTensor<Self::Elem> {
        self.map(|a| a * a)
    }

    /// Sums over `axes`, or over every axis when `axes` is empty.
    ///
    /// Reduced axes are dropped from the result unless `keep_dims` is set, in which case they
    /// stay with size 1.
    fn sum_axes(&self, axes: &[isize], keep_dims: bool) -> Result<DenseTensor<Self::Elem>> {
        let rank = self.rank();
        let resolved = if axes.is_empty() {
            (0..rank).collect()
        } else {
            layout::normalize_axes(axes, rank)?
        };
        let (kept, reduced) = layout::shapes_for_reduction(self.dims(), &resolved);
        let reduced_len = layout::product(&reduced);

        // reduced axes go innermost, so each output sums one consecutive run of offsets
        let permuted = match layout::axes_permutation_for_reduction(&resolved, rank) {
            Some(perm) => self.layout().permuted(&perm)?,
            None => self.layout().clone(),
        };
        let buffer = self.buffer();
        let mut data = vec![Self::Elem::zero(); layout::product(&kept)];
        if reduced_len > 0 {
            let mut offsets = Offsets::new(&permuted);
            for total in data.iter_mut() {
                for offset in offsets.by_ref().take(reduced_len) {
                    *total += buffer[offset];
                }
            }
        }

        let dims: Dims = if keep_dims {
            self.dims()
                .iter()
                .enumerate()
                .map(|(axis, &d)| if resolved.contains(&axis) { 1 } else { d })
                .collect()
        } else {
            kept
        };
        Ok(DenseTensor::from_elements(data, &dims))
    }

    /// Largest element, `None` for an empty tensor.
    fn max(&self) -> Option<Self::Elem>
    where
        Self::Elem: PartialOrd,
    {
        self.elements()
            .copied()
            .reduce(|acc, v| if v > acc { v } else { acc })
    }

    /// Smallest element, `None` for an empty tensor.
    fn min(&self) -> Option<Self::Elem>
    where
        Self::Elem: PartialOrd,
    {
        self.elements()
            .copied()
            .reduce(|acc, v| if v < acc { v } else { acc })
    }

    /// Product of two matrices.
    fn matmul_2d<B: Tensor<Elem = Self::Elem> + ?Sized>(&self, other: &B) -> Result<DenseTensor<Self::Elem>> {
        crate::matmul::matmul_2d(self, other)
    }

    /// Matrix product with NumPy semantics: 1-D operands are promoted to matrices and leading
    /// batch axes broadcast.
    fn matmul<B: Tensor<Elem = Self::Elem> + ?Sized>(&self, other: &B) -> Result<DenseTensor<Self::Elem>> {
        crate::matmul::matmul(self, other)
    }
}

impl<A> NumericOps for A
where
    A: Tensor + ?Sized,
    A::Elem: Numeric,
{
}

/// Functions of real floating point elements.
pub trait FloatOps: NumericOps + Tensor<Elem: FloatElement> {
    /// Error function, five term approximation.
    fn erf(&self) -> DenseTensor<Self::Elem> {
        self.map(tensor_kernels::erf)
    }

    /// Error function, double precision rational approximation.
    fn erf2(&self) -> DenseTensor<Self::Elem> {
        self.map(tensor_kernels::erf2)
    }

    fn sqrt(&self) -> DenseTensor<Self::Elem> {
        self.map(|a| a.sqrt())
    }

    fn exp(&self) -> DenseTensor<Self::Elem> {
        self.map(|a| a.exp())
    }

    fn tanh(&self) -> DenseTensor<Self::Elem> {
        self.map(|a| a.tanh())
    }

    /// `x * (1 + erf(x / sqrt(2))) / 2`
    fn gelu(&self) -> DenseTensor<Self::Elem> {
        let one = Self::Elem::one();
        let two = one + one;
        let sqrt_two = two.sqrt();
        self.map(|x| x * (one + tensor_kernels::erf(x / sqrt_two)) / two)
    }

    /// Averages over `axes`, or over every axis when `axes` is empty.
    fn mean_axes(&self, axes: &[isize], keep_dims: bool) -> Result<DenseTensor<Self::Elem>> {
        let sum = self.sum_axes(axes, keep_dims)?;
        let count = self.len() / sum.len().max(1);
        let Some(divisor) = <Self::Elem as num_traits::NumCast>::from(count) else {
            return Err(TensorError::Cast(format!("{count} is not representable as {}", self.element_type())));
        };
        Ok(sum.map(|total| total / divisor))
    }

    /// Normalized exponentials of a vector.
    fn softmax(&self) -> Result<DenseTensor<Self::Elem>> {
        if self.rank() != 1 {
            return Err(TensorError::ShapeMismatch(format!(
                "softmax is implemented for vectors only, got a tensor of rank {}",
                self.rank()
            )));
        }
        let max = self
            .elements()
            .copied()
            .fold(Self::Elem::neg_infinity(), num_traits::Float::max);
        let exps: Vec<Self::Elem> = self.elements().map(|&x| (x - max).exp()).collect();
        let total = exps.iter().fold(Self::Elem::zero(), |acc, &e| acc + e);
        let data = exps.into_iter().map(|e| e / total).collect();
        Ok(DenseTensor::from_elements(data, self.dims()))
    }
}

impl<A> FloatOps for A
where
    A: Tensor + ?Sized,
    A::Elem: FloatElement,
{
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_elementwise_broadcast() -> Result<()> {
        let lhs = DenseTensor::from_vec(vec![1, 2, 3, 4, 5, 6], &[2, 3])?;
        let rhs = DenseTensor::from(vec![10, 20, 30]);
        assert_eq!(lhs.add(&rhs)?.into_vec(), vec![11, 22, 33, 14, 25, 36]);
        assert_eq!(rhs.sub(&lhs)?.into_vec(), vec![9, 18, 27, 6, 15, 24]);
        assert_eq!(lhs.mul(&DenseTensor::scalar(2))?.into_vec(), vec![2, 4, 6, 8, 10, 12]);
        assert_eq!(rhs.div(&DenseTensor::scalar(10))?.into_vec(), vec![1, 2, 3]);

        let err = lhs.add(&DenseTensor::from(vec![1, 2])).err();
        assert_eq!(
            err,
            Some(TensorError::IncompatibleShapes {
                lhs: vec![2, 3],
                rhs: vec![2]
            })
        );
        Ok(())
    }

    #[test]
    fn test_ops_on_views() -> Result<()> {
        let tensor = DenseTensor::<i32>::arange(0, 6, 1)?.reshape(&[2, 3])?;
        let first_col = tensor.slice_str(":, :1")?;
        let last_col = tensor.slice_str(":, 2:")?;
        let sum = first_col.add(&last_col)?;
        assert_eq!(sum.dims(), &[2, 1]);
        assert_eq!(sum.into_vec(), vec![2, 8]);

        assert_eq!(tensor.slice_str("::-1")?.neg().into_vec(), vec![-3, -4, -5, 0, -1, -2]);
        assert_eq!(first_col.square().into_vec(), vec![0, 9]);
        Ok(())
    }

    #[test]
    fn test_zip_with_changes_type() -> Result<()> {
        let lhs = DenseTensor::from(vec![1, 5, 3]);
        let rhs = DenseTensor::from(vec![2, 4, 3]);
        let greater = zip_with(&lhs, &rhs, |a, b| a > b)?;
        assert_eq!(greater.into_vec(), vec![false, true, false]);
        Ok(())
    }

    #[test]
    fn test_sum_axes() -> Result<()> {
        let tensor = DenseTensor::<i32>::arange(0, 24, 1)?.reshape(&[2, 3, 4])?;

        let all = tensor.sum_axes(&[], false)?;
        assert_eq!(all.rank(), 0);
        assert_eq!(all.into_vec(), vec![276]);

        let inner = tensor.sum_axes(&[-1], false)?;
        assert_eq!(inner.dims(), &[2, 3]);
        assert_eq!(inner.into_vec(), vec![6, 22, 38, 54, 70, 86]);

        let outer = tensor.sum_axes(&[0], true)?;
        assert_eq!(outer.dims(), &[1, 3, 4]);
        assert_eq!(outer.get(&[0, 2, 3])?, &(11 + 23));

        let middle = tensor.sum_axes(&[1, 0], false)?;
        assert_eq!(middle.into_vec(), vec![60, 66, 72, 78]);

        assert!(tensor.sum_axes(&[3], false).is_err());
        assert!(tensor.sum_axes(&[0, -3], false).is_err());
        Ok(())
    }

    #[test]
    fn test_sum_of_empty_axis() -> Result<()> {
        let tensor = DenseTensor::<f64>::new(&[2, 0]);
        let sum = tensor.sum_axes(&[1], false)?;
        assert_eq!(sum.into_vec(), vec![0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_max_min() -> Result<()> {
        let tensor = DenseTensor::from_vec(vec![3, -7, 12, 0], &[2, 2])?;
        assert_eq!(tensor.max(), Some(12));
        assert_eq!(tensor.min(), Some(-7));
        assert_eq!(DenseTensor::<f32>::new(&[0]).max(), None);
        Ok(())
    }

    #[test]
    fn test_float_functions() -> Result<()> {
        let tensor = DenseTensor::from(vec![0.0f32, 1.0, 4.0]);
        assert_close(&tensor.sqrt().into_vec(), &[0.0, 1.0, 2.0]);
        assert_close(&tensor.exp().into_vec(), &[1.0, 1.0f32.exp(), 4.0f32.exp()]);
        assert_close(&tensor.tanh().into_vec(), &[0.0, 1.0f32.tanh(), 4.0f32.tanh()]);

        let erf = DenseTensor::from(vec![0.0f32, 1.0, -1.0]).erf();
        assert_close(&erf.into_vec(), &[0.0, 0.842_700_8, -0.842_700_8]);
        let erf2 = DenseTensor::from(vec![0.5f32]).erf2();
        assert_close(&erf2.into_vec(), &[0.520_499_9]);

        let gelu = DenseTensor::from(vec![0.0f32, 1.0, -1.0]).gelu();
        assert_close(&gelu.into_vec(), &[0.0, 0.841_344_7, -0.158_655_3]);
        Ok(())
    }

    #[test]
    fn test_mean_axes() -> Result<()> {
        let tensor = DenseTensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3])?;
        assert_eq!(tensor.mean_axes(&[1], false)?.into_vec(), vec![2.0, 5.0]);
        assert_eq!(tensor.mean_axes(&[0], true)?.into_vec(), vec![2.5, 3.5, 4.5]);
        assert_eq!(tensor.mean_axes(&[], false)?.into_vec(), vec![3.5]);
        Ok(())
    }

    #[test]
    fn test_softmax() -> Result<()> {
        let tensor = DenseTensor::from(vec![1.0f32, 2.0, 3.0]);
        let softmax = tensor.softmax()?.into_vec();
        assert_close(&softmax, &[0.090_030_57, 0.244_728_47, 0.665_240_94]);
        assert!((softmax.iter().sum::<f32>() - 1.0).abs() < 1e-6);

        let large = DenseTensor::from(vec![1000.0f64, 1000.0]);
        assert_eq!(large.softmax()?.into_vec(), vec![0.5, 0.5]);

        let matrix = DenseTensor::<f32>::ones(&[2, 2]);
        assert!(matches!(matrix.softmax(), Err(TensorError::ShapeMismatch(_))));
        Ok(())
    }

    #[test]
    fn test_row_major_elements_borrows_contiguous() -> Result<()> {
        let tensor = DenseTensor::<i32>::arange(0, 12, 1)?.reshape(&[3, 4])?;
        assert!(matches!(row_major_elements(&tensor), Cow::Borrowed(_)));

        let rows = tensor.slice_str("1:")?;
        let elements = row_major_elements(&rows);
        assert!(matches!(elements, Cow::Borrowed(_)));
        assert_eq!(&elements[..], &[4, 5, 6, 7, 8, 9, 10, 11]);

        let cols = tensor.slice_str(":, 1:3")?;
        let elements = row_major_elements(&cols);
        assert!(matches!(elements, Cow::Owned(_)));
        assert_eq!(&elements[..], &[1, 2, 5, 6, 9, 10]);
        Ok(())
    }
}
