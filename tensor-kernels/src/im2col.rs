use crate::error::ensure_len;
use crate::{Conv2dGeometry, KernelError, Scalar};

/// Gathers every receptive field of one `C x H x W` image into the rows of a column buffer.
///
/// The buffer is laid out as `[C * kernel_h * kernel_w, out_h * out_w]`: one row per input channel
/// and kernel tap, one column per output position. Taps that land in the padding read zero.
pub fn im2col<T: Scalar>(src: &[T], geometry: &Conv2dGeometry, buf: &mut [T]) -> Result<(), KernelError> {
    let [out_h, out_w] = geometry.output_shape()?;
    let (channels, height, width) = (geometry.in_channels, geometry.in_height, geometry.in_width);
    let [kernel_y, kernel_x] = geometry.kernel;
    let [dilation_y, dilation_x] = geometry.dilations;
    let [stride_y, stride_x] = geometry.strides;

    ensure_len("src", src.len(), channels * height * width)?;
    ensure_len("buf", buf.len(), geometry.col_len()?)?;

    let mut out = buf.iter_mut();
    for channel in 0..channels {
        let plane = &src[channel * height * width..(channel + 1) * height * width];
        for ky in 0..kernel_y {
            let row_origin = (ky * dilation_y) as isize - geometry.pad.top as isize;
            for kx in 0..kernel_x {
                let col_origin = (kx * dilation_x) as isize - geometry.pad.left as isize;
                for dy in 0..out_h {
                    let sy = row_origin + (dy * stride_y) as isize;
                    if sy < 0 || sy >= height as isize {
                        for cell in out.by_ref().take(out_w) {
                            *cell = T::zero();
                        }
                        continue;
                    }

                    let row = &plane[sy as usize * width..(sy as usize + 1) * width];
                    for (dx, cell) in out.by_ref().take(out_w).enumerate() {
                        let sx = col_origin + (dx * stride_x) as isize;
                        *cell = if sx >= 0 && sx < width as isize {
                            row[sx as usize]
                        } else {
                            T::zero()
                        };
                    }
                }
            }
        }
    }

    Ok(())
}
