//! Convolution and pooling padding geometry.

use crate::KernelError;

/// How the spatial borders of a convolution input are padded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PadType {
    /// No padding, the output shrinks by the effective filter size minus one.
    Valid,
    /// Output size is `ceil(input / stride)`, an odd total padding puts the extra unit at the end.
    SameUpper,
    /// Output size is `ceil(input / stride)`, an odd total padding puts the extra unit at the start.
    SameLower,
    /// The same explicit amount of padding on all four sides.
    Value(usize),
}

/// Padding amounts for each side plus the totals along each axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PadInfo {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
    /// `top + bottom`
    pub h: usize,
    /// `left + right`
    pub w: usize,
}

impl PadInfo {
    pub fn new(top: usize, bottom: usize, left: usize, right: usize) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
            h: top + bottom,
            w: left + right,
        }
    }

    pub fn symmetric(value: usize) -> Self {
        Self::new(value, value, value, value)
    }
}

/// Padding together with the resulting `[height, width]` output shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conv2dOutputInfo {
    pub pad: PadInfo,
    pub shape: [usize; 2],
}

/// Size of a filter once dilation spreads its taps apart.
pub fn effective_filter_size(filter_size: usize, dilation: usize) -> usize {
    if dilation <= 1 {
        filter_size
    } else {
        filter_size + filter_size.saturating_sub(1) * (dilation - 1)
    }
}

/// Rejects empty filter windows and zero dilations.
pub(crate) fn check_window(filter: [usize; 2], dilations: [usize; 2]) -> Result<(), KernelError> {
    if filter.contains(&0) {
        return Err(KernelError::InvalidGeometry(format!(
            "filter must not be empty, got {filter:?}"
        )));
    }
    if dilations.contains(&0) {
        return Err(KernelError::InvalidGeometry(format!(
            "dilations must be positive, got {dilations:?}"
        )));
    }
    Ok(())
}

/// `[height, width]` of a convolution output given the total padding along each axis.
///
/// Kernel sizes are expected to already include dilation.
pub fn conv2d_output_shape(
    input: [usize; 2],
    kernel: [usize; 2],
    strides: [usize; 2],
    pad: [usize; 2],
) -> Result<[usize; 2], KernelError> {
    let mut out = [0; 2];
    for axis in 0..2 {
        if strides[axis] == 0 {
            return Err(KernelError::InvalidGeometry(format!(
                "stride along axis {axis} is zero"
            )));
        }
        let padded = input[axis] + pad[axis];
        if padded < kernel[axis] {
            return Err(KernelError::InvalidGeometry(format!(
                "kernel {} is larger than padded input {} along axis {axis}",
                kernel[axis], padded
            )));
        }
        out[axis] = (padded - kernel[axis]) / strides[axis] + 1;
    }
    Ok(out)
}

/// Symmetric padding that keeps the output the same size as the input for the given stride.
pub fn default_pad(input_size: usize, field_size: usize, stride: usize, dilation: usize) -> usize {
    let effective = effective_filter_size(field_size, dilation) as isize;
    let stride = stride as isize;
    let total = input_size as isize * (stride - 1) - stride + effective;
    total.max(0) as usize / 2
}

/// Resolves padding and output shape of a 2D convolution or pooling window.
pub fn conv2d_output_info(
    pad: PadType,
    input: [usize; 2],
    filter: [usize; 2],
    strides: [usize; 2],
    dilations: [usize; 2],
) -> Result<Conv2dOutputInfo, KernelError> {
    if strides.contains(&0) {
        return Err(KernelError::InvalidGeometry(format!(
            "strides must be positive, got {strides:?}"
        )));
    }
    check_window(filter, dilations)?;

    let kernel = [
        effective_filter_size(filter[0], dilations[0]),
        effective_filter_size(filter[1], dilations[1]),
    ];

    match pad {
        PadType::Valid => {
            let shape = conv2d_output_shape(input, kernel, strides, [0, 0])?;
            Ok(Conv2dOutputInfo {
                pad: PadInfo::default(),
                shape,
            })
        }
        PadType::SameUpper | PadType::SameLower => {
            let shape = [
                input[0].div_ceil(strides[0]),
                input[1].div_ceil(strides[1]),
            ];
            let along = |axis: usize| {
                let needed = shape[axis].saturating_sub(1) * strides[axis] + kernel[axis];
                needed.saturating_sub(input[axis])
            };
            let (along_h, along_w) = (along(0), along(1));

            let split = |total: usize| {
                let small = total / 2;
                let large = total - small;
                if pad == PadType::SameUpper {
                    (small, large)
                } else {
                    (large, small)
                }
            };
            let (top, bottom) = split(along_h);
            let (left, right) = split(along_w);

            Ok(Conv2dOutputInfo {
                pad: PadInfo::new(top, bottom, left, right),
                shape,
            })
        }
        PadType::Value(value) => {
            let pad = PadInfo::symmetric(value);
            let shape = conv2d_output_shape(input, kernel, strides, [pad.h, pad.w])?;
            Ok(Conv2dOutputInfo { pad, shape })
        }
    }
}
