//! Element type tags and the capability traits the tensor operations are generic over.

use half::{bf16, f16};
use num_complex::Complex32;
use std::fmt;
use std::ops::{Div, Sub};
use tensor_kernels::{ErfFloat, Scalar};

/// Primitive element types a tensor may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float16,
    BFloat16,
    Float,
    Double,
    Complex64,
}

impl ElementType {
    pub const ALL: [ElementType; 14] = [
        ElementType::Bool,
        ElementType::Int8,
        ElementType::UInt8,
        ElementType::Int16,
        ElementType::UInt16,
        ElementType::Int32,
        ElementType::UInt32,
        ElementType::Int64,
        ElementType::UInt64,
        ElementType::Float16,
        ElementType::BFloat16,
        ElementType::Float,
        ElementType::Double,
        ElementType::Complex64,
    ];

    /// Width of one element in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            ElementType::Bool | ElementType::Int8 | ElementType::UInt8 => 1,
            ElementType::Int16 | ElementType::UInt16 | ElementType::Float16 | ElementType::BFloat16 => 2,
            ElementType::Int32 | ElementType::UInt32 | ElementType::Float => 4,
            ElementType::Int64 | ElementType::UInt64 | ElementType::Double | ElementType::Complex64 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Bool => "bool",
            ElementType::Int8 => "int8",
            ElementType::UInt8 => "uint8",
            ElementType::Int16 => "int16",
            ElementType::UInt16 => "uint16",
            ElementType::Int32 => "int32",
            ElementType::UInt32 => "uint32",
            ElementType::Int64 => "int64",
            ElementType::UInt64 => "uint64",
            ElementType::Float16 => "float16",
            ElementType::BFloat16 => "bfloat16",
            ElementType::Float => "float",
            ElementType::Double => "double",
            ElementType::Complex64 => "complex64",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            ElementType::Float16 | ElementType::BFloat16 | ElementType::Float | ElementType::Double
        )
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Anything a tensor can store.
pub trait Element: Copy + Default + fmt::Debug + fmt::Display + PartialEq + Send + Sync + 'static {
    const ELEMENT_TYPE: ElementType;

    /// Writes the value the way the data printer shows it.
    fn write_value(&self, f: &mut dyn fmt::Write) -> fmt::Result {
        if Self::ELEMENT_TYPE.is_float() {
            write!(f, "{self:.5}")
        } else {
            write!(f, "{self}")
        }
    }
}

macro_rules! impl_element {
    ($($ty:ty => $tag:ident),+ $(,)?) => {
        $(impl Element for $ty {
            const ELEMENT_TYPE: ElementType = ElementType::$tag;
        })+
    };
}

impl_element!(
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

/// Elements with kernel support: zero, one, addition, subtraction, multiplication and division.
///
/// `bool`, `f16` and `bf16` are storage only.
pub trait Numeric: Element + Scalar + Sub<Output = Self> + Div<Output = Self> {}

impl<T> Numeric for T where T: Element + Scalar + Sub<Output = T> + Div<Output = T> {}

/// Real floating point elements.
pub trait FloatElement: Numeric + num_traits::Float + ErfFloat {}

impl<T> FloatElement for T where T: Numeric + num_traits::Float + ErfFloat {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_tags() {
        assert_eq!(f32::ELEMENT_TYPE, ElementType::Float);
        assert_eq!(Complex32::ELEMENT_TYPE, ElementType::Complex64);
        assert_eq!(bf16::ELEMENT_TYPE.name(), "bfloat16");
        assert_eq!(ElementType::Complex64.size_bytes(), 8);
        assert_eq!(ElementType::Float16.size_bytes(), 2);
        assert!(ElementType::BFloat16.is_float());
        assert!(!ElementType::Int32.is_float());
    }

    #[test]
    fn test_value_format() -> fmt::Result {
        let mut out = String::new();
        1.5f32.write_value(&mut out)?;
        out.push(' ');
        7i64.write_value(&mut out)?;
        assert_eq!(out, "1.50000 7");
        Ok(())
    }
}
