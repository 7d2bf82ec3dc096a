use crate::ElementType;
use tensor_kernels::KernelError;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TensorError {
    /// Ranks or dimensions of the operands do not fit the operation.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("cannot reshape {actual} elements into shape {requested:?}")]
    ReshapeLength { requested: Vec<usize>, actual: usize },

    #[error("axis {axis} is out of range for a tensor of rank {rank}")]
    AxisOutOfRange { axis: isize, rank: usize },

    #[error("index {index} is out of bounds for axis {axis} with size {size}")]
    IndexOutOfBounds { index: isize, axis: usize, size: usize },

    #[error("axis {axis} has size {size} and cannot be broadcast")]
    NotBroadcastable { axis: usize, size: usize },

    #[error("axis {axis} has size {size}, expected 1")]
    NotUnitDim { axis: usize, size: usize },

    #[error("buffer holds {actual} elements but the shape requires {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation needed to broadcast its operands and could not.
    #[error("shapes {lhs:?} and {rhs:?} cannot be broadcast together")]
    IncompatibleShapes { lhs: Vec<usize>, rhs: Vec<usize> },

    #[error("{op} is not implemented for element type {element_type}")]
    UnsupportedElementType {
        op: &'static str,
        element_type: ElementType,
    },

    #[error("invalid slice notation: {0}")]
    SliceParse(String),

    #[error("cast error: {0}")]
    Cast(String),

    #[error(transparent)]
    Kernel(#[from] KernelError),
}
