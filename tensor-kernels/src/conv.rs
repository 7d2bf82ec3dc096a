//! Im2col based two-dimensional convolution over NCHW buffers.

use crate::error::ensure_len;
use crate::padding::{PadInfo, check_window, conv2d_output_shape, effective_filter_size};
use crate::{KernelError, MatMulKernel, Scalar, im2col, matmul};

/// Shapes and hyper-parameters of one grouped 2D convolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conv2dGeometry {
    pub batch: usize,
    pub in_channels: usize,
    pub in_height: usize,
    pub in_width: usize,
    pub out_channels: usize,
    /// `[height, width]` of the filter before dilation.
    pub kernel: [usize; 2],
    pub strides: [usize; 2],
    pub dilations: [usize; 2],
    pub pad: PadInfo,
    /// `group == in_channels == out_channels` is a depthwise convolution.
    pub group: usize,
}

impl Conv2dGeometry {
    /// `[height, width]` of every output plane.
    pub fn output_shape(&self) -> Result<[usize; 2], KernelError> {
        check_window(self.kernel, self.dilations)?;
        let kernel = [
            effective_filter_size(self.kernel[0], self.dilations[0]),
            effective_filter_size(self.kernel[1], self.dilations[1]),
        ];
        conv2d_output_shape(
            [self.in_height, self.in_width],
            kernel,
            self.strides,
            [self.pad.h, self.pad.w],
        )
    }

    /// Number of elements of the im2col buffer for one image.
    pub fn col_len(&self) -> Result<usize, KernelError> {
        let [out_h, out_w] = self.output_shape()?;
        Ok(self.in_channels * self.kernel[0] * self.kernel[1] * out_h * out_w)
    }

    /// Number of elements of the weight buffer, `[out_channels, in_channels / group, kh, kw]`.
    pub fn weight_len(&self) -> usize {
        self.out_channels * (self.in_channels / self.group.max(1)) * self.kernel[0] * self.kernel[1]
    }

    /// Number of elements of the whole NCHW output.
    pub fn output_len(&self) -> Result<usize, KernelError> {
        let [out_h, out_w] = self.output_shape()?;
        Ok(self.batch * self.out_channels * out_h * out_w)
    }

    fn validate(&self) -> Result<(), KernelError> {
        if self.group == 0 {
            return Err(KernelError::InvalidGeometry("group must be positive".to_string()));
        }
        if self.in_channels % self.group != 0 {
            return Err(KernelError::InvalidGroups {
                what: "input",
                channels: self.in_channels,
                group: self.group,
            });
        }
        if self.out_channels % self.group != 0 {
            return Err(KernelError::InvalidGroups {
                what: "output",
                channels: self.out_channels,
                group: self.group,
            });
        }
        if self.dilations.contains(&0) {
            return Err(KernelError::InvalidGeometry(format!(
                "dilations must be positive, got {:?}",
                self.dilations
            )));
        }
        Ok(())
    }
}

/// Convolves `src` with `weight` into `dst`, overwriting it.
///
/// Each image is unfolded with [`im2col`], then every group is one matrix multiplication of its
/// `[out_channels / group, in_channels / group * kh * kw]` weights with its slice of the column
/// buffer. The optional bias holds one value per output channel.
pub fn conv2d<T: Scalar>(
    src: &[T],
    weight: &[T],
    bias: Option<&[T]>,
    dst: &mut [T],
    geometry: &Conv2dGeometry,
    kernel: MatMulKernel,
) -> Result<(), KernelError> {
    geometry.validate()?;

    let [out_h, out_w] = geometry.output_shape()?;
    let src_len = geometry.in_channels * geometry.in_height * geometry.in_width;
    let dst_len = geometry.out_channels * out_h * out_w;

    ensure_len("src", src.len(), geometry.batch * src_len)?;
    ensure_len("weight", weight.len(), geometry.weight_len())?;
    ensure_len("dst", dst.len(), geometry.batch * dst_len)?;
    if let Some(bias) = bias {
        ensure_len("bias", bias.len(), geometry.out_channels)?;
    }

    tracing::debug!(?geometry, out_h, out_w, ?kernel, "conv2d");

    let rows = geometry.out_channels / geometry.group;
    let spatial = out_h * out_w;
    let depth = geometry.in_channels * geometry.kernel[0] * geometry.kernel[1] / geometry.group;

    let mut buf = vec![T::zero(); geometry.col_len()?];

    for b in 0..geometry.batch {
        let image = &src[b * src_len..(b + 1) * src_len];
        let out = &mut dst[b * dst_len..(b + 1) * dst_len];
        out.fill(T::zero());

        im2col(image, geometry, &mut buf)?;

        for g in 0..geometry.group {
            matmul(
                kernel,
                rows,
                depth,
                spatial,
                &weight[rows * depth * g..rows * depth * (g + 1)],
                &buf[depth * spatial * g..depth * spatial * (g + 1)],
                &mut out[rows * spatial * g..rows * spatial * (g + 1)],
            )?;
        }

        if let Some(bias) = bias {
            for (plane, &value) in out.chunks_exact_mut(spatial.max(1)).zip(bias) {
                for cell in plane {
                    *cell += value;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(channels: usize, size: usize, out_channels: usize, group: usize) -> Conv2dGeometry {
        Conv2dGeometry {
            batch: 1,
            in_channels: channels,
            in_height: size,
            in_width: size,
            out_channels,
            kernel: [3, 3],
            strides: [1, 1],
            dilations: [1, 1],
            pad: PadInfo::default(),
            group,
        }
    }

    #[test]
    fn test_valid_window_sums() -> Result<(), KernelError> {
        let src: Vec<f32> = (0..25).map(|v| v as f32).collect();
        let weight = vec![1f32; 9];
        let geometry = geometry(1, 5, 1, 1);
        let mut dst = vec![0f32; geometry.output_len()?];

        conv2d(&src, &weight, None, &mut dst, &geometry, MatMulKernel::Managed)?;

        assert_eq!(dst, vec![54., 63., 72., 99., 108., 117., 144., 153., 162.]);
        Ok(())
    }

    #[test]
    fn test_bias_and_overwrite() -> Result<(), KernelError> {
        let src = vec![1i32; 2 * 16];
        let weight = vec![1i32; 2 * 2 * 9];
        let geometry = geometry(2, 4, 2, 1);
        let mut dst = vec![100; geometry.output_len()?];

        conv2d(&src, &weight, Some(&[1, -1][..]), &mut dst, &geometry, MatMulKernel::Vectorized)?;

        assert_eq!(&dst[..4], &[19, 19, 19, 19]);
        assert_eq!(&dst[4..], &[17, 17, 17, 17]);
        Ok(())
    }

    #[test]
    fn test_depthwise_groups() -> Result<(), KernelError> {
        // channel 0 is all ones, channel 1 all twos, each convolved with its own filter
        let mut src = vec![1f64; 9];
        src.extend(vec![2f64; 9]);
        let mut weight = vec![1f64; 9];
        weight.extend(vec![10f64; 9]);

        let geometry = geometry(2, 3, 2, 2);
        let mut dst = vec![0f64; geometry.output_len()?];
        conv2d(&src, &weight, None, &mut dst, &geometry, MatMulKernel::Unsafe)?;

        assert_eq!(dst, vec![9.0, 180.0]);
        Ok(())
    }

    #[test]
    fn test_batches_and_padding() -> Result<(), KernelError> {
        let src = vec![1f32; 2 * 9];
        let weight = vec![1f32; 9];
        let geometry = Conv2dGeometry {
            batch: 2,
            pad: PadInfo::symmetric(1),
            ..geometry(1, 3, 1, 1)
        };
        assert_eq!(geometry.output_shape()?, [3, 3]);

        let mut dst = vec![0f32; geometry.output_len()?];
        conv2d(&src, &weight, None, &mut dst, &geometry, MatMulKernel::Intrinsics)?;

        let image = [4., 6., 4., 6., 9., 6., 4., 6., 4.];
        assert_eq!(&dst[..9], &image);
        assert_eq!(&dst[9..], &image);
        Ok(())
    }

    #[test]
    fn test_invalid_groups() {
        let geometry = geometry(3, 5, 2, 2);
        let mut dst = vec![0f32; 18];
        let err = conv2d(&[0f32; 75], &[0f32; 18], None, &mut dst, &geometry, MatMulKernel::Managed);
        assert_eq!(
            err,
            Err(KernelError::InvalidGroups {
                what: "input",
                channels: 3,
                group: 2
            })
        );
    }

    #[test]
    fn test_empty_dilated_kernel() {
        let geometry = Conv2dGeometry {
            kernel: [0, 3],
            dilations: [2, 2],
            ..geometry(1, 4, 1, 1)
        };
        assert!(matches!(geometry.output_shape(), Err(KernelError::InvalidGeometry(_))));
        let mut dst = vec![0f32; 4];
        let err = conv2d(&[0f32; 16], &[], None, &mut dst, &geometry, MatMulKernel::Managed);
        assert!(matches!(err, Err(KernelError::InvalidGeometry(_))));
    }
}
