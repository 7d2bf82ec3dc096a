//! Human readable rendering of shapes and data, for diagnostics only.

use crate::broadcast::BroadcastedTensor;
use crate::layout::{self, Dims};
use crate::storage::Storage;
use crate::tensor::Tensor;
use crate::tensor_slice::TensorSlice;
use crate::{DenseTensor, Element};
use smallvec::SmallVec;
use std::fmt;

/// Shape as `[a,b,c]`.
pub fn print_shape(dims: &[usize]) -> String {
    let dims: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
    format!("[{}]", dims.join(","))
}

/// Elements as nested brackets, one row of the innermost axis per line when
/// `include_whitespace` is set.
pub fn print_data<A: Tensor + ?Sized>(tensor: &A, include_whitespace: bool) -> String {
    DataPrinter {
        tensor,
        include_whitespace,
    }
    .to_string()
}

struct DataPrinter<'a, A: ?Sized> {
    tensor: &'a A,
    include_whitespace: bool,
}

impl<A: Tensor + ?Sized> fmt::Display for DataPrinter<'_, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_data(self.tensor, self.include_whitespace, f)
    }
}

fn write_indent(out: &mut dyn fmt::Write, level: usize) -> fmt::Result {
    for _ in 0..level {
        out.write_str("    ")?;
    }
    Ok(())
}

fn write_data<A: Tensor + ?Sized>(tensor: &A, whitespace: bool, out: &mut dyn fmt::Write) -> fmt::Result {
    let dims = tensor.dims();
    let Some(inner_axis) = dims.len().checked_sub(1) else {
        return tensor.get_value(0).write_value(out);
    };
    if tensor.is_empty() {
        return out.write_str("[]");
    }

    let inner_len = dims[inner_axis];
    let strides = layout::strides_for(dims, false);
    let mut coords: Dims = SmallVec::from_elem(0, dims.len());
    let mut indent = 0;

    for outer in (0..tensor.len()).step_by(inner_len) {
        layout::coords_into(&strides, false, outer, &mut coords);

        // open the brackets of every axis starting over here
        while indent < inner_axis && coords[indent] == 0 {
            if whitespace {
                write_indent(out, indent)?;
            }
            indent += 1;
            out.write_char('[')?;
            if whitespace {
                out.write_char('\n')?;
            }
        }

        for i in 0..inner_len {
            coords[inner_axis] = i;
            if i == 0 {
                if whitespace {
                    write_indent(out, indent)?;
                }
                out.write_char('[')?;
            } else {
                out.write_char(',')?;
            }
            tensor.buffer()[tensor.layout().offset_of(&coords)].write_value(out)?;
        }
        out.write_char(']')?;

        for axis in (0..inner_axis).rev() {
            if coords[axis] + 1 == dims[axis] {
                indent -= 1;
                if whitespace {
                    out.write_char('\n')?;
                    write_indent(out, indent)?;
                }
                out.write_char(']')?;
            } else {
                out.write_char(',')?;
                if whitespace {
                    out.write_char('\n')?;
                }
                break;
            }
        }
    }
    Ok(())
}

impl<T: Element> fmt::Display for DenseTensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_data(self, true, f)
    }
}

impl<S: Storage> fmt::Display for BroadcastedTensor<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_data(self, true, f)
    }
}

impl<S: Storage> fmt::Display for TensorSlice<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_data(self, true, f)
    }
}
