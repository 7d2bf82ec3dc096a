use crate::broadcast::{broadcast_shape, broadcast_to};
use crate::layout::{self, Dims};
use crate::math::row_major_elements;
use crate::tensor::Tensor;
use crate::{DenseTensor, Numeric, Result, TensorError};
use num_traits::Zero;
use tensor_kernels::{KernelConfig, MatMulKernel};

/// Multiplies two matrices with the kernel tier of the installed [`KernelConfig`].
pub fn matmul_2d<A, B>(lhs: &A, rhs: &B) -> Result<DenseTensor<A::Elem>>
where
    A: Tensor<Elem: Numeric> + ?Sized,
    B: Tensor<Elem = A::Elem> + ?Sized,
{
    matmul_2d_with(lhs, rhs, KernelConfig::current().matmul_kernel())
}

/// Multiplies two matrices with an explicit kernel tier.
pub fn matmul_2d_with<A, B>(lhs: &A, rhs: &B, kernel: MatMulKernel) -> Result<DenseTensor<A::Elem>>
where
    A: Tensor<Elem: Numeric> + ?Sized,
    B: Tensor<Elem = A::Elem> + ?Sized,
{
    let (&[m, n], &[n2, k]) = (lhs.dims(), rhs.dims()) else {
        return Err(TensorError::ShapeMismatch(format!(
            "matmul_2d requires two matrices, got shapes {:?} and {:?}",
            lhs.dims(),
            rhs.dims()
        )));
    };
    if n != n2 {
        return Err(TensorError::ShapeMismatch(format!(
            "matrix dimensions incompatible for multiplication: {n} != {n2}"
        )));
    }

    let a = row_major_elements(lhs);
    let b = row_major_elements(rhs);
    let mut c = vec![A::Elem::zero(); m * k];
    tensor_kernels::matmul(kernel, m, n, k, &a, &b, &mut c)?;
    Ok(DenseTensor::from_elements(c, &[m, k]))
}

/// Matrix product with NumPy semantics, using the installed kernel tier.
pub fn matmul<A, B>(lhs: &A, rhs: &B) -> Result<DenseTensor<A::Elem>>
where
    A: Tensor<Elem: Numeric> + ?Sized,
    B: Tensor<Elem = A::Elem> + ?Sized,
{
    matmul_with(lhs, rhs, KernelConfig::current().matmul_kernel())
}

/// Matrix product with NumPy semantics.
///
/// A 1-D left operand is treated as a row and a 1-D right operand as a column, and the
/// promoted axis is dropped from the result. Axes before the last two are batch axes and
/// broadcast against each other.
pub fn matmul_with<A, B>(lhs: &A, rhs: &B, kernel: MatMulKernel) -> Result<DenseTensor<A::Elem>>
where
    A: Tensor<Elem: Numeric> + ?Sized,
    B: Tensor<Elem = A::Elem> + ?Sized,
{
    if lhs.rank() == 0 || rhs.rank() == 0 {
        return Err(TensorError::ShapeMismatch(
            "matmul is not defined for rank zero operands".to_string(),
        ));
    }
    if lhs.rank() == 2 && rhs.rank() == 2 {
        return matmul_2d_with(lhs, rhs, kernel);
    }

    let lhs_view = if lhs.rank() == 1 {
        lhs.insert_dim(0)?
    } else {
        broadcast_to(lhs, lhs.dims())?
    };
    let rhs_view = if rhs.rank() == 1 {
        rhs.insert_dim(1)?
    } else {
        broadcast_to(rhs, rhs.dims())?
    };

    let (lhs_batch, lhs_matrix) = lhs_view.dims().split_at(lhs_view.rank() - 2);
    let (rhs_batch, rhs_matrix) = rhs_view.dims().split_at(rhs_view.rank() - 2);
    let (m, n, n2, k) = (lhs_matrix[0], lhs_matrix[1], rhs_matrix[0], rhs_matrix[1]);
    if n != n2 {
        return Err(TensorError::ShapeMismatch(format!(
            "matrix dimensions incompatible for multiplication: {n} != {n2}"
        )));
    }
    let Some(batch) = broadcast_shape(lhs_batch, rhs_batch) else {
        return Err(TensorError::IncompatibleShapes {
            lhs: lhs.dims().to_vec(),
            rhs: rhs.dims().to_vec(),
        });
    };

    let expanded = |matrix: [usize; 2]| -> Dims {
        let mut dims = batch.clone();
        dims.extend_from_slice(&matrix);
        dims
    };
    let a = row_major_elements(&broadcast_to(&lhs_view, &expanded([m, n]))?).into_owned();
    let b = row_major_elements(&broadcast_to(&rhs_view, &expanded([n, k]))?).into_owned();

    let count = layout::product(&batch);
    tracing::trace!(?batch, m, n, k, "batched matmul");
    let mut c = vec![A::Elem::zero(); count * m * k];
    for i in 0..count {
        tensor_kernels::matmul(
            kernel,
            m,
            n,
            k,
            &a[i * m * n..(i + 1) * m * n],
            &b[i * n * k..(i + 1) * n * k],
            &mut c[i * m * k..(i + 1) * m * k],
        )?;
    }

    let mut dims = batch;
    if lhs.rank() > 1 {
        dims.push(m);
    }
    if rhs.rank() > 1 {
        dims.push(k);
    }
    Ok(DenseTensor::from_elements(c, &dims))
}
