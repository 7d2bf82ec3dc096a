//! Dense tensors whose element type is only known at runtime.
//!
//! A model graph hands tensors around by name with an element type tag. [`AnyTensor`] keeps one
//! variant per [`ElementType`] and forwards each operation to the statically typed
//! implementation; element types without kernels report
//! [`TensorError::UnsupportedElementType`].

use crate::math::{FloatOps, NumericOps};
use crate::tensor::Tensor;
use crate::{DenseTensor, ElementType, Result, TensorError};
use half::{bf16, f16};
use num_complex::Complex32;
use num_traits::ToPrimitive;
use std::collections::HashMap;

/// Named tensors, e.g. the inputs and initializers of a graph.
pub type TensorMap = HashMap<String, AnyTensor>;

#[derive(Clone, Debug, PartialEq)]
pub enum AnyTensor {
    Bool(DenseTensor<bool>),
    Int8(DenseTensor<i8>),
    UInt8(DenseTensor<u8>),
    Int16(DenseTensor<i16>),
    UInt16(DenseTensor<u16>),
    Int32(DenseTensor<i32>),
    UInt32(DenseTensor<u32>),
    Int64(DenseTensor<i64>),
    UInt64(DenseTensor<u64>),
    Float16(DenseTensor<f16>),
    BFloat16(DenseTensor<bf16>),
    Float(DenseTensor<f32>),
    Double(DenseTensor<f64>),
    Complex64(DenseTensor<Complex32>),
}

/// Runs `$body` with `$t` bound to the typed tensor of any variant.
macro_rules! for_any {
    ($value:expr, $t:ident => $body:expr) => {
        match $value {
            AnyTensor::Bool($t) => $body,
            AnyTensor::Int8($t) => $body,
            AnyTensor::UInt8($t) => $body,
            AnyTensor::Int16($t) => $body,
            AnyTensor::UInt16($t) => $body,
            AnyTensor::Int32($t) => $body,
            AnyTensor::UInt32($t) => $body,
            AnyTensor::Int64($t) => $body,
            AnyTensor::UInt64($t) => $body,
            AnyTensor::Float16($t) => $body,
            AnyTensor::BFloat16($t) => $body,
            AnyTensor::Float($t) => $body,
            AnyTensor::Double($t) => $body,
            AnyTensor::Complex64($t) => $body,
        }
    };
}

/// Like `for_any!` but keeps the variant of the result.
macro_rules! map_any {
    ($value:expr, $t:ident => $body:expr) => {
        match $value {
            AnyTensor::Bool($t) => AnyTensor::Bool($body),
            AnyTensor::Int8($t) => AnyTensor::Int8($body),
            AnyTensor::UInt8($t) => AnyTensor::UInt8($body),
            AnyTensor::Int16($t) => AnyTensor::Int16($body),
            AnyTensor::UInt16($t) => AnyTensor::UInt16($body),
            AnyTensor::Int32($t) => AnyTensor::Int32($body),
            AnyTensor::UInt32($t) => AnyTensor::UInt32($body),
            AnyTensor::Int64($t) => AnyTensor::Int64($body),
            AnyTensor::UInt64($t) => AnyTensor::UInt64($body),
            AnyTensor::Float16($t) => AnyTensor::Float16($body),
            AnyTensor::BFloat16($t) => AnyTensor::BFloat16($body),
            AnyTensor::Float($t) => AnyTensor::Float($body),
            AnyTensor::Double($t) => AnyTensor::Double($body),
            AnyTensor::Complex64($t) => AnyTensor::Complex64($body),
        }
    };
}

/// Pairs two operands of the same numeric element type, failing for storage only types.
macro_rules! numeric_binary {
    ($op:literal, $lhs:expr, $rhs:expr, ($a:ident, $b:ident) => $body:expr) => {
        match ($lhs, $rhs) {
            (AnyTensor::Int8($a), AnyTensor::Int8($b)) => Ok(AnyTensor::Int8($body)),
            (AnyTensor::UInt8($a), AnyTensor::UInt8($b)) => Ok(AnyTensor::UInt8($body)),
            (AnyTensor::Int16($a), AnyTensor::Int16($b)) => Ok(AnyTensor::Int16($body)),
            (AnyTensor::UInt16($a), AnyTensor::UInt16($b)) => Ok(AnyTensor::UInt16($body)),
            (AnyTensor::Int32($a), AnyTensor::Int32($b)) => Ok(AnyTensor::Int32($body)),
            (AnyTensor::UInt32($a), AnyTensor::UInt32($b)) => Ok(AnyTensor::UInt32($body)),
            (AnyTensor::Int64($a), AnyTensor::Int64($b)) => Ok(AnyTensor::Int64($body)),
            (AnyTensor::UInt64($a), AnyTensor::UInt64($b)) => Ok(AnyTensor::UInt64($body)),
            (AnyTensor::Float($a), AnyTensor::Float($b)) => Ok(AnyTensor::Float($body)),
            (AnyTensor::Double($a), AnyTensor::Double($b)) => Ok(AnyTensor::Double($body)),
            (AnyTensor::Complex64($a), AnyTensor::Complex64($b)) => Ok(AnyTensor::Complex64($body)),
            (lhs, rhs) if lhs.element_type() != rhs.element_type() => Err(TensorError::InvalidArgument(format!(
                "{} needs operands of one element type, got {} and {}",
                $op,
                lhs.element_type(),
                rhs.element_type()
            ))),
            (lhs, _) => Err(TensorError::UnsupportedElementType {
                op: $op,
                element_type: lhs.element_type(),
            }),
        }
    };
}

impl AnyTensor {
    pub fn element_type(&self) -> ElementType {
        for_any!(self, t => t.element_type())
    }

    pub fn dims(&self) -> &[usize] {
        for_any!(self, t => t.dims())
    }

    pub fn rank(&self) -> usize {
        self.dims().len()
    }

    pub fn len(&self) -> usize {
        for_any!(self, t => t.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `name:type:d0xd1x..`, e.g. `weights:float:2x3`.
    pub fn describe(&self, name: &str) -> String {
        let dims: Vec<String> = self.dims().iter().map(|d| d.to_string()).collect();
        format!("{name}:{}:{}", self.element_type(), dims.join("x"))
    }

    pub fn print_shape(&self) -> String {
        for_any!(self, t => t.print_shape())
    }

    pub fn print_data(&self, include_whitespace: bool) -> String {
        for_any!(self, t => t.print_data(include_whitespace))
    }

    pub fn reshape(self, dims: &[usize]) -> Result<Self> {
        Ok(map_any!(self, t => t.reshape(dims)?))
    }

    pub fn insert_dim(self, axis: usize) -> Result<Self> {
        Ok(map_any!(self, t => t.insert_dim(axis)?))
    }

    pub fn pad_left(self) -> Result<Self> {
        self.insert_dim(0)
    }

    pub fn remove_dim(self, axis: usize) -> Result<Self> {
        Ok(map_any!(self, t => t.remove_dim(axis)?))
    }

    /// Copies the region selected by slice notation into a new tensor.
    pub fn slice_str(&self, notation: &str) -> Result<Self> {
        Ok(map_any!(self, t => t.slice_str(notation)?.to_dense()))
    }

    pub fn add(&self, other: &AnyTensor) -> Result<Self> {
        numeric_binary!("add", self, other, (a, b) => a.add(b)?)
    }

    pub fn sub(&self, other: &AnyTensor) -> Result<Self> {
        numeric_binary!("sub", self, other, (a, b) => a.sub(b)?)
    }

    pub fn mul(&self, other: &AnyTensor) -> Result<Self> {
        numeric_binary!("mul", self, other, (a, b) => a.mul(b)?)
    }

    pub fn matmul(&self, other: &AnyTensor) -> Result<Self> {
        numeric_binary!("matmul", self, other, (a, b) => a.matmul(b)?)
    }

    /// Softmax of a vector of `float` or `double`.
    pub fn softmax(&self) -> Result<Self> {
        if self.rank() != 1 {
            return Err(TensorError::ShapeMismatch(format!(
                "softmax is implemented for vectors only, got a tensor of rank {}",
                self.rank()
            )));
        }
        match self {
            AnyTensor::Float(t) => Ok(AnyTensor::Float(t.softmax()?)),
            AnyTensor::Double(t) => Ok(AnyTensor::Double(t.softmax()?)),
            other => Err(TensorError::UnsupportedElementType {
                op: "softmax",
                element_type: other.element_type(),
            }),
        }
    }

    pub fn erf(&self) -> Result<Self> {
        match self {
            AnyTensor::Float(t) => Ok(AnyTensor::Float(t.erf())),
            AnyTensor::Double(t) => Ok(AnyTensor::Double(t.erf())),
            other => Err(TensorError::UnsupportedElementType {
                op: "erf",
                element_type: other.element_type(),
            }),
        }
    }

    /// Converts every element to `target`.
    ///
    /// Only real numeric types convert; values out of range of `target` are a
    /// [`TensorError::Cast`].
    pub fn cast_to(&self, target: ElementType) -> Result<Self> {
        match self {
            AnyTensor::Int8(t) => cast_dense(t, target),
            AnyTensor::UInt8(t) => cast_dense(t, target),
            AnyTensor::Int16(t) => cast_dense(t, target),
            AnyTensor::UInt16(t) => cast_dense(t, target),
            AnyTensor::Int32(t) => cast_dense(t, target),
            AnyTensor::UInt32(t) => cast_dense(t, target),
            AnyTensor::Int64(t) => cast_dense(t, target),
            AnyTensor::UInt64(t) => cast_dense(t, target),
            AnyTensor::Float(t) => cast_dense(t, target),
            AnyTensor::Double(t) => cast_dense(t, target),
            other => Err(TensorError::UnsupportedElementType {
                op: "cast",
                element_type: other.element_type(),
            }),
        }
    }
}

fn cast_dense<T>(tensor: &DenseTensor<T>, target: ElementType) -> Result<AnyTensor>
where
    T: crate::Element + ToPrimitive,
{
    Ok(match target {
        ElementType::Int8 => AnyTensor::Int8(tensor.cast()?),
        ElementType::UInt8 => AnyTensor::UInt8(tensor.cast()?),
        ElementType::Int16 => AnyTensor::Int16(tensor.cast()?),
        ElementType::UInt16 => AnyTensor::UInt16(tensor.cast()?),
        ElementType::Int32 => AnyTensor::Int32(tensor.cast()?),
        ElementType::UInt32 => AnyTensor::UInt32(tensor.cast()?),
        ElementType::Int64 => AnyTensor::Int64(tensor.cast()?),
        ElementType::UInt64 => AnyTensor::UInt64(tensor.cast()?),
        ElementType::Float => AnyTensor::Float(tensor.cast()?),
        ElementType::Double => AnyTensor::Double(tensor.cast()?),
        ElementType::Bool | ElementType::Float16 | ElementType::BFloat16 | ElementType::Complex64 => {
            return Err(TensorError::UnsupportedElementType {
                op: "cast",
                element_type: target,
            });
        }
    })
}

macro_rules! impl_conversions {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<DenseTensor<$ty>> for AnyTensor {
                fn from(tensor: DenseTensor<$ty>) -> Self {
                    AnyTensor::$variant(tensor)
                }
            }

            impl TryFrom<AnyTensor> for DenseTensor<$ty> {
                type Error = TensorError;

                fn try_from(tensor: AnyTensor) -> Result<Self> {
                    match tensor {
                        AnyTensor::$variant(t) => Ok(t),
                        other => Err(TensorError::InvalidArgument(format!(
                            "expected a {} tensor, got {}",
                            ElementType::$variant,
                            other.element_type()
                        ))),
                    }
                }
            }
        )+
    };
}

impl_conversions!(
    bool => Bool,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f16 => Float16,
    bf16 => BFloat16,
    f32 => Float,
    f64 => Double,
    Complex32 => Complex64,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() -> Result<()> {
        let tensor = AnyTensor::from(DenseTensor::<f32>::zeros(&[2, 3]));
        assert_eq!(tensor.element_type(), ElementType::Float);
        assert_eq!(tensor.dims(), &[2, 3]);
        assert_eq!(tensor.describe("weights"), "weights:float:2x3");
        assert_eq!(tensor.print_shape(), "[2,3]");

        let mut inputs = TensorMap::new();
        inputs.insert("ids".to_string(), DenseTensor::from(vec![1i64, 2]).into());
        let descriptions: Vec<String> = inputs.iter().map(|(name, t)| t.describe(name)).collect();
        assert_eq!(descriptions, vec!["ids:int64:2".to_string()]);
        Ok(())
    }

    #[test]
    fn test_dispatch_arithmetic() -> Result<()> {
        let a = AnyTensor::from(DenseTensor::from_vec(vec![1.0f64, 2.0, 3.0, 4.0], &[2, 2])?);
        let b = AnyTensor::from(DenseTensor::<f64>::identity(2));
        assert_eq!(a.matmul(&b)?, a);
        assert_eq!(
            DenseTensor::<f64>::try_from(a.add(&b)?)?.into_vec(),
            vec![2.0, 2.0, 3.0, 5.0]
        );

        let ints = AnyTensor::from(DenseTensor::from(vec![1i32, 2]));
        assert!(matches!(a.add(&ints), Err(TensorError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn test_storage_only_types_fail() -> Result<()> {
        let halves = AnyTensor::from(DenseTensor::from(vec![f16::ONE, f16::ZERO]));
        assert_eq!(
            halves.add(&halves),
            Err(TensorError::UnsupportedElementType {
                op: "add",
                element_type: ElementType::Float16
            })
        );
        assert!(matches!(
            halves.softmax(),
            Err(TensorError::UnsupportedElementType { .. })
        ));
        assert!(halves.cast_to(ElementType::Float).is_err());

        let flags = AnyTensor::from(DenseTensor::from(vec![true, false]));
        assert!(flags.matmul(&flags).is_err());

        let complex = AnyTensor::from(DenseTensor::from(vec![Complex32::new(1.0, 1.0)]));
        assert!(complex.erf().is_err());
        assert!(complex.add(&complex).is_ok());
        Ok(())
    }

    #[test]
    fn test_softmax_and_erf() -> Result<()> {
        let logits = AnyTensor::from(DenseTensor::from(vec![0.0f32, 0.0]));
        let probabilities = DenseTensor::<f32>::try_from(logits.softmax()?)?;
        assert_eq!(probabilities.into_vec(), vec![0.5, 0.5]);

        let matrix = AnyTensor::from(DenseTensor::<f64>::zeros(&[2, 2]));
        assert!(matches!(matrix.softmax(), Err(TensorError::ShapeMismatch(_))));
        let erf = DenseTensor::<f64>::try_from(matrix.erf()?)?;
        assert_eq!(erf.dims(), &[2, 2]);
        assert!(erf.elements().all(|v| v.abs() < 1e-6));
        Ok(())
    }

    #[test]
    fn test_cast_to() -> Result<()> {
        let floats = AnyTensor::from(DenseTensor::from(vec![1.5f32, -2.0]));
        let ints = floats.cast_to(ElementType::Int64)?;
        assert_eq!(ints.element_type(), ElementType::Int64);
        assert_eq!(DenseTensor::<i64>::try_from(ints)?.into_vec(), vec![1, -2]);

        assert!(matches!(floats.cast_to(ElementType::UInt8), Err(TensorError::Cast(_))));
        assert!(matches!(
            floats.cast_to(ElementType::BFloat16),
            Err(TensorError::UnsupportedElementType { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_shape_ops() -> Result<()> {
        let tensor = AnyTensor::from(DenseTensor::<u8>::arange(0, 6, 1)?);
        let matrix = tensor.reshape(&[2, 3])?;
        assert_eq!(matrix.slice_str(":, 1")?.print_data(false), "[1,4]");
        let padded = matrix.pad_left()?;
        assert_eq!(padded.dims(), &[1, 2, 3]);
        assert_eq!(padded.remove_dim(0)?.rank(), 2);
        assert!(DenseTensor::<f32>::try_from(AnyTensor::from(DenseTensor::<u8>::new(&[1]))).is_err());
        Ok(())
    }
}
