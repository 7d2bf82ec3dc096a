//! Convolution and pooling over NCHW tensors.

use crate::math::row_major_elements;
use crate::tensor::Tensor;
use crate::{DenseTensor, Element, Numeric, Result, TensorError};
use num_traits::Zero;
use tensor_kernels::padding::conv2d_output_info;
use tensor_kernels::{Conv2dGeometry, KernelConfig, PadType};

/// Hyper-parameters of a 2D convolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conv2dParams {
    pub pad: PadType,
    pub strides: [usize; 2],
    pub dilations: [usize; 2],
    pub group: usize,
}

impl Default for Conv2dParams {
    fn default() -> Self {
        Self {
            pad: PadType::Valid,
            strides: [1, 1],
            dilations: [1, 1],
            group: 1,
        }
    }
}

fn nchw_dims(dims: &[usize], what: &str) -> Result<[usize; 4]> {
    match *dims {
        [n, c, h, w] => Ok([n, c, h, w]),
        _ => Err(TensorError::ShapeMismatch(format!(
            "{what} must have rank 4, got shape {dims:?}"
        ))),
    }
}

/// Convolves `input` `[N, C, H, W]` with `weight` `[M, C / group, kh, kw]`.
///
/// The optional `bias` holds one value per output channel. The result has shape
/// `[N, M, oh, ow]`.
pub fn conv2d<A, W>(
    input: &A,
    weight: &W,
    bias: Option<&DenseTensor<A::Elem>>,
    params: &Conv2dParams,
) -> Result<DenseTensor<A::Elem>>
where
    A: Tensor<Elem: Numeric> + ?Sized,
    W: Tensor<Elem = A::Elem> + ?Sized,
{
    let [batch, channels, height, width] = nchw_dims(input.dims(), "convolution input")?;
    let [out_channels, group_channels, kh, kw] = nchw_dims(weight.dims(), "convolution weight")?;
    if params.group == 0 {
        return Err(TensorError::InvalidArgument("group must be positive".to_string()));
    }
    if group_channels * params.group != channels {
        return Err(TensorError::ShapeMismatch(format!(
            "weight expects {} input channels in {} groups, the input has {channels}",
            group_channels * params.group,
            params.group
        )));
    }
    if let Some(bias) = bias {
        if bias.dims() != [out_channels] {
            return Err(TensorError::ShapeMismatch(format!(
                "bias must have shape [{out_channels}], got {:?}",
                bias.dims()
            )));
        }
    }

    let info = conv2d_output_info(params.pad, [height, width], [kh, kw], params.strides, params.dilations)?;
    let geometry = Conv2dGeometry {
        batch,
        in_channels: channels,
        in_height: height,
        in_width: width,
        out_channels,
        kernel: [kh, kw],
        strides: params.strides,
        dilations: params.dilations,
        pad: info.pad,
        group: params.group,
    };
    let [out_h, out_w] = geometry.output_shape()?;

    let src = row_major_elements(input);
    let filter = row_major_elements(weight);
    let mut dst = vec![A::Elem::zero(); geometry.output_len()?];
    tensor_kernels::conv2d(
        &src,
        &filter,
        bias.map(|b| b.buffer()),
        &mut dst,
        &geometry,
        KernelConfig::current().matmul_kernel(),
    )?;
    Ok(DenseTensor::from_elements(dst, &[batch, out_channels, out_h, out_w]))
}

/// Largest value of every `kernel` window of an `[N, C, H, W]` tensor.
///
/// Padded cells never win: a window is the maximum of the input cells it covers.
pub fn max_pool2d<A>(input: &A, kernel: [usize; 2], strides: [usize; 2], pad: PadType) -> Result<DenseTensor<A::Elem>>
where
    A: Tensor + ?Sized,
    A::Elem: Element + PartialOrd,
{
    let [batch, channels, height, width] = nchw_dims(input.dims(), "pooling input")?;
    let info = conv2d_output_info(pad, [height, width], kernel, strides, [1, 1])?;
    let [out_h, out_w] = info.shape;
    let (top, left) = (info.pad.top as isize, info.pad.left as isize);

    let layout = input.layout();
    let buffer = input.buffer();
    let mut data = Vec::with_capacity(batch * channels * out_h * out_w);
    for n in 0..batch {
        for c in 0..channels {
            for oy in 0..out_h {
                for ox in 0..out_w {
                    let y0 = (oy * strides[0]) as isize - top;
                    let x0 = (ox * strides[1]) as isize - left;
                    let mut best: Option<A::Elem> = None;
                    for y in (y0..y0 + kernel[0] as isize).filter(|&y| y >= 0 && y < height as isize) {
                        for x in (x0..x0 + kernel[1] as isize).filter(|&x| x >= 0 && x < width as isize) {
                            let value = buffer[layout.offset_of(&[n, c, y as usize, x as usize])];
                            if best.is_none_or(|b| value > b) {
                                best = Some(value);
                            }
                        }
                    }
                    data.push(best.unwrap_or_default());
                }
            }
        }
    }
    Ok(DenseTensor::from_elements(data, &[batch, channels, out_h, out_w]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> Result<DenseTensor<f32>> {
        DenseTensor::arange(0.0, 25.0, 1.0)?.reshape(&[1, 1, 5, 5])
    }

    #[test]
    fn test_conv2d_valid() -> Result<()> {
        let kernel = DenseTensor::<f32>::ones(&[1, 1, 3, 3]);
        let output = conv2d(&image()?, &kernel, None, &Conv2dParams::default())?;
        assert_eq!(output.dims(), &[1, 1, 3, 3]);
        assert_eq!(
            output.into_vec(),
            vec![54.0, 63.0, 72.0, 99.0, 108.0, 117.0, 144.0, 153.0, 162.0]
        );
        Ok(())
    }

    #[test]
    fn test_conv2d_same_with_bias() -> Result<()> {
        let kernel = DenseTensor::<f32>::ones(&[1, 1, 3, 3]);
        let bias = DenseTensor::from(vec![1.0f32]);
        let params = Conv2dParams {
            pad: PadType::SameUpper,
            ..Conv2dParams::default()
        };
        let output = conv2d(&image()?, &kernel, Some(&bias), &params)?;
        assert_eq!(output.dims(), &[1, 1, 5, 5]);
        assert_eq!(output.get(&[0, 0, 0, 0])?, &13.0);
        assert_eq!(output.get(&[0, 0, 2, 2])?, &109.0);
        Ok(())
    }

    #[test]
    fn test_conv2d_strided() -> Result<()> {
        let kernel = DenseTensor::<f32>::ones(&[1, 1, 3, 3]);
        let params = Conv2dParams {
            strides: [2, 2],
            ..Conv2dParams::default()
        };
        let output = conv2d(&image()?, &kernel, None, &params)?;
        assert_eq!(output.into_vec(), vec![54.0, 72.0, 144.0, 162.0]);
        Ok(())
    }

    #[test]
    fn test_depthwise_conv2d() -> Result<()> {
        let input = DenseTensor::<i32>::arange(0, 8, 1)?.reshape(&[1, 2, 2, 2])?;
        let weight = DenseTensor::from_vec(vec![2, 3], &[2, 1, 1, 1])?;
        let params = Conv2dParams {
            group: 2,
            ..Conv2dParams::default()
        };
        let output = conv2d(&input, &weight, None, &params)?;
        assert_eq!(output.dims(), &[1, 2, 2, 2]);
        assert_eq!(output.into_vec(), vec![0, 2, 4, 6, 12, 15, 18, 21]);
        Ok(())
    }

    #[test]
    fn test_conv2d_rejects_bad_shapes() -> Result<()> {
        let input = image()?;
        let wrong_channels = DenseTensor::<f32>::ones(&[1, 2, 3, 3]);
        assert!(matches!(
            conv2d(&input, &wrong_channels, None, &Conv2dParams::default()),
            Err(TensorError::ShapeMismatch(_))
        ));

        let flat = DenseTensor::<f32>::ones(&[5, 5]);
        let kernel = DenseTensor::<f32>::ones(&[1, 1, 3, 3]);
        assert!(conv2d(&flat, &kernel, None, &Conv2dParams::default()).is_err());

        let bias = DenseTensor::from(vec![1.0f32, 2.0]);
        assert!(conv2d(&input, &kernel, Some(&bias), &Conv2dParams::default()).is_err());

        let empty_window = DenseTensor::<f32>::zeros(&[1, 1, 0, 3]);
        let dilated = Conv2dParams {
            dilations: [2, 2],
            ..Conv2dParams::default()
        };
        assert!(matches!(
            conv2d(&DenseTensor::<f32>::zeros(&[1, 1, 4, 4]), &empty_window, None, &dilated),
            Err(TensorError::Kernel(_))
        ));

        let too_large = DenseTensor::<f32>::ones(&[1, 1, 7, 7]);
        assert!(matches!(
            conv2d(&input, &too_large, None, &Conv2dParams::default()),
            Err(TensorError::Kernel(_))
        ));
        Ok(())
    }

    #[test]
    fn test_max_pool2d() -> Result<()> {
        let input = DenseTensor::<i32>::arange(0, 16, 1)?.reshape(&[1, 1, 4, 4])?;
        let pooled = max_pool2d(&input, [2, 2], [2, 2], PadType::Valid)?;
        assert_eq!(pooled.dims(), &[1, 1, 2, 2]);
        assert_eq!(pooled.into_vec(), vec![5, 7, 13, 15]);

        let overlapping = max_pool2d(&input, [2, 2], [1, 1], PadType::Valid)?;
        assert_eq!(overlapping.into_vec(), vec![5, 6, 7, 9, 10, 11, 13, 14, 15]);

        let padded = max_pool2d(&input, [3, 3], [2, 2], PadType::Value(1))?;
        assert_eq!(padded.into_vec(), vec![5, 7, 13, 15]);

        let negative = input.map(|v| -v);
        let same = max_pool2d(&negative, [3, 3], [1, 1], PadType::SameUpper)?;
        assert_eq!(same.dims(), &[1, 1, 4, 4]);
        assert_eq!(same.get(&[0, 0, 0, 0])?, &0);
        assert_eq!(same.get(&[0, 0, 3, 3])?, &-10);
        Ok(())
    }
}
