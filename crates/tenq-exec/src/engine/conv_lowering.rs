//! Convolution lowering (im2col) and its inverse
//!
//! Lowering turns every receptive field of the input into one row, so a
//! convolution becomes a matrix product against the flattened kernel:
//!
//! - 1-D: input `[N, C, L]`, kernel `[F, C, K]` → `[N, OL, C·K]`
//! - 2-D: input `[N, C, H, W]`, kernel `[F, C, KH, KW]` → `[N, OH, OW, C·KH·KW]`
//!
//! Rows are laid out channel-major, then kernel row, then kernel column.
//! Zero padding is applied on both sides of each spatial axis.
//!
//! Un-lowering scatters rows back to the input layout. Positions covered by
//! several patches receive the mean of their contributions, so lowering
//! followed by un-lowering with the same parameters reproduces the input
//! wherever some patch reads it. Positions no patch reads (stride wider
//! than the kernel, or an uncovered tail) are left at zero.

use tenq_core::Tensor;

use super::functions::EngineError;
use crate::ops::{ConvParams, ConvRank, SpatialSize};

/// Spatial layout shared by both directions; 1-D is a plane of height 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Geometry {
    batch: usize,
    channels: usize,
    height: usize,
    width: usize,
    kernel_h: usize,
    kernel_w: usize,
    pad_h: usize,
    pad_w: usize,
    stride_h: usize,
    stride_w: usize,
    out_h: usize,
    out_w: usize,
}

impl Geometry {
    fn patch_len(&self) -> usize {
        self.channels * self.kernel_h * self.kernel_w
    }

    fn input_shape(&self, rank: ConvRank) -> Vec<usize> {
        match rank {
            ConvRank::One => vec![self.batch, self.channels, self.width],
            ConvRank::Two => vec![self.batch, self.channels, self.height, self.width],
        }
    }

    fn lowered_shape(&self, rank: ConvRank) -> Vec<usize> {
        match rank {
            ConvRank::One => vec![self.batch, self.out_w, self.patch_len()],
            ConvRank::Two => vec![self.batch, self.out_h, self.out_w, self.patch_len()],
        }
    }

    /// Input position read by a patch element, `None` inside the padding.
    fn source(&self, oy: usize, ox: usize, ky: usize, kx: usize) -> Option<(usize, usize)> {
        let iy = (oy * self.stride_h + ky).checked_sub(self.pad_h)?;
        let ix = (ox * self.stride_w + kx).checked_sub(self.pad_w)?;
        (iy < self.height && ix < self.width).then_some((iy, ix))
    }

    /// Visit every (lowered offset, input offset) pair that is not padding.
    fn for_each_pair(&self, mut f: impl FnMut(usize, usize)) {
        let patch = self.patch_len();
        for n in 0..self.batch {
            for oy in 0..self.out_h {
                for ox in 0..self.out_w {
                    let row = ((n * self.out_h + oy) * self.out_w + ox) * patch;
                    for c in 0..self.channels {
                        for ky in 0..self.kernel_h {
                            for kx in 0..self.kernel_w {
                                if let Some((iy, ix)) = self.source(oy, ox, ky, kx) {
                                    let col = (c * self.kernel_h + ky) * self.kernel_w + kx;
                                    let src = ((n * self.channels + c) * self.height + iy)
                                        * self.width
                                        + ix;
                                    f(row + col, src);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

type SpatialPair = (usize, usize);

/// Padding and stride as (height, width) in the layout's terms.
fn spatial_params(
    rank: ConvRank,
    params: ConvParams,
) -> Result<(SpatialPair, SpatialPair), EngineError> {
    let (pad, stride) = match rank {
        ConvRank::One => ((0, params.padding.1), (1, params.stride.1)),
        ConvRank::Two => (params.padding, params.stride),
    };
    if stride.0 == 0 || stride.1 == 0 {
        return Err(EngineError::InvalidParameter(format!(
            "stride must be positive, got {:?}",
            params.stride
        )));
    }
    Ok((pad, stride))
}

/// Kernel channels and spatial extent.
fn kernel_dims(rank: ConvRank, kernel: &Tensor) -> Result<(usize, usize, usize), EngineError> {
    let dims = match (rank, kernel.shape()) {
        (ConvRank::One, &[_, c, k]) => (c, 1, k),
        (ConvRank::Two, &[_, c, kh, kw]) => (c, kh, kw),
        (_, shape) => {
            return Err(EngineError::Shape(format!(
                "kernel must be [F, C, {}], got {:?}",
                match rank {
                    ConvRank::One => "K",
                    ConvRank::Two => "KH, KW",
                },
                shape
            )))
        }
    };
    if dims.1 == 0 || dims.2 == 0 {
        return Err(EngineError::Shape(format!(
            "kernel spatial extent must be positive, got {:?}",
            kernel.shape()
        )));
    }
    Ok(dims)
}

/// `size + 2 * pad`, rejecting padding that overflows the index range.
fn padded_extent(axis: &str, size: usize, pad: usize) -> Result<usize, EngineError> {
    pad.checked_mul(2)
        .and_then(|both| both.checked_add(size))
        .ok_or_else(|| {
            EngineError::InvalidParameter(format!("{} padding {} is out of range", axis, pad))
        })
}

fn output_extent(
    axis: &str,
    size: usize,
    kernel: usize,
    pad: usize,
    stride: usize,
) -> Result<usize, EngineError> {
    let padded = padded_extent(axis, size, pad)?;
    if padded < kernel {
        return Err(EngineError::Shape(format!(
            "{} extent {} (padded {}) is smaller than kernel extent {}",
            axis, size, padded, kernel
        )));
    }
    Ok((padded - kernel) / stride + 1)
}

/// Smallest input extent producing `out` positions.
fn inferred_extent(
    axis: &str,
    out: usize,
    kernel: usize,
    pad: usize,
    stride: usize,
) -> Result<usize, EngineError> {
    let covered = out
        .saturating_sub(1)
        .checked_mul(stride)
        .and_then(|span| span.checked_add(kernel))
        .ok_or_else(|| {
            EngineError::InvalidParameter(format!(
                "{} positions at stride {} exceed the index range",
                out, stride
            ))
        })?;
    let padding = padded_extent(axis, 0, pad)?;
    match covered.checked_sub(padding) {
        Some(size) if size > 0 && out > 0 => Ok(size),
        _ => Err(EngineError::Shape(format!(
            "cannot infer {} extent from {} output positions with padding {}",
            axis, out, pad
        ))),
    }
}

/// Zero-filled buffer for `shape`; an error instead of an abort when the
/// element count overflows or cannot be allocated.
fn zeroed<T: Clone + Default>(what: &str, shape: &[usize]) -> Result<Vec<T>, EngineError> {
    let too_large =
        || EngineError::InvalidParameter(format!("{} of shape {:?} is too large", what, shape));
    let len = shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(too_large)?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| too_large())?;
    buf.resize(len, T::default());
    Ok(buf)
}

/// Extract receptive fields of `input` as rows.
pub fn lower(
    rank: ConvRank,
    params: ConvParams,
    input: &Tensor,
    kernel: &Tensor,
) -> Result<Tensor, EngineError> {
    let ((pad_h, pad_w), (stride_h, stride_w)) = spatial_params(rank, params)?;
    let (kc, kernel_h, kernel_w) = kernel_dims(rank, kernel)?;
    let (batch, channels, height, width) = match (rank, input.shape()) {
        (ConvRank::One, &[n, c, l]) => (n, c, 1, l),
        (ConvRank::Two, &[n, c, h, w]) => (n, c, h, w),
        (_, shape) => {
            return Err(EngineError::Shape(format!(
                "input must be {}, got {:?}",
                match rank {
                    ConvRank::One => "[N, C, L]",
                    ConvRank::Two => "[N, C, H, W]",
                },
                shape
            )))
        }
    };
    if kc != channels {
        return Err(EngineError::Shape(format!(
            "kernel has {} channels, input has {}",
            kc, channels
        )));
    }
    let geo = Geometry {
        batch,
        channels,
        height,
        width,
        kernel_h,
        kernel_w,
        pad_h,
        pad_w,
        stride_h,
        stride_w,
        out_h: output_extent("height", height, kernel_h, pad_h, stride_h)?,
        out_w: output_extent("width", width, kernel_w, pad_w, stride_w)?,
    };

    let shape = geo.lowered_shape(rank);
    let src = input.data();
    let mut data = zeroed::<f64>("lowered tensor", &shape)?;
    geo.for_each_pair(|dst, from| data[dst] = src[from]);
    Ok(Tensor::from_vec(data, &shape)?)
}

/// Scatter lowered rows back to the input layout.
pub fn unlower(
    rank: ConvRank,
    params: ConvParams,
    target: Option<SpatialSize>,
    cols: &Tensor,
    kernel: &Tensor,
) -> Result<Tensor, EngineError> {
    let ((pad_h, pad_w), (stride_h, stride_w)) = spatial_params(rank, params)?;
    let (channels, kernel_h, kernel_w) = kernel_dims(rank, kernel)?;
    let (batch, out_h, out_w, patch) = match (rank, cols.shape()) {
        (ConvRank::One, &[n, ol, p]) => (n, 1, ol, p),
        (ConvRank::Two, &[n, oh, ow, p]) => (n, oh, ow, p),
        (_, shape) => {
            return Err(EngineError::Shape(format!(
                "lowered tensor must be {}, got {:?}",
                match rank {
                    ConvRank::One => "[N, OL, C*K]",
                    ConvRank::Two => "[N, OH, OW, C*KH*KW]",
                },
                shape
            )))
        }
    };
    if patch != channels * kernel_h * kernel_w {
        return Err(EngineError::Shape(format!(
            "row length {} does not match kernel patch {}x{}x{}",
            patch, channels, kernel_h, kernel_w
        )));
    }

    let (height, width) = match (rank, target) {
        (_, None) => (
            inferred_extent("height", out_h, kernel_h, pad_h, stride_h)?,
            inferred_extent("width", out_w, kernel_w, pad_w, stride_w)?,
        ),
        (ConvRank::One, Some(SpatialSize::Length(l))) => (1, l),
        (ConvRank::Two, Some(SpatialSize::Plane(h, w))) => (h, w),
        (_, Some(size)) => {
            return Err(EngineError::InvalidParameter(format!(
                "target size {:?} does not match the lowering rank",
                size
            )))
        }
    };
    let expected = (
        output_extent("height", height, kernel_h, pad_h, stride_h)?,
        output_extent("width", width, kernel_w, pad_w, stride_w)?,
    );
    if expected != (out_h, out_w) {
        return Err(EngineError::Shape(format!(
            "target extent {}x{} yields {}x{} patches, lowered tensor has {}x{}",
            height, width, expected.0, expected.1, out_h, out_w
        )));
    }

    let geo = Geometry {
        batch,
        channels,
        height,
        width,
        kernel_h,
        kernel_w,
        pad_h,
        pad_w,
        stride_h,
        stride_w,
        out_h,
        out_w,
    };
    let shape = geo.input_shape(rank);
    let src = cols.data();
    let mut mean = zeroed::<f64>("input tensor", &shape)?;
    let mut count = zeroed::<u32>("input tensor", &shape)?;
    // Incremental mean: identical contributions reproduce the value exactly
    geo.for_each_pair(|from, dst| {
        count[dst] += 1;
        mean[dst] += (src[from] - mean[dst]) / f64::from(count[dst]);
    });
    Ok(Tensor::from_vec(mean, &shape)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(shape: &[usize]) -> Tensor {
        let n: usize = shape.iter().product();
        Tensor::from_vec((0..n).map(|i| i as f64 + 1.0).collect(), shape).unwrap()
    }

    #[test]
    fn test_lower_1d_shapes_and_values() {
        let x = ramp(&[1, 1, 4]);
        let k = Tensor::zeros(&[2, 1, 2]);
        let cols = lower(ConvRank::One, ConvParams::default(), &x, &k).unwrap();
        assert_eq!(cols.shape(), &[1, 3, 2]);
        assert_eq!(cols.data(), &[1.0, 2.0, 2.0, 3.0, 3.0, 4.0]);
    }

    #[test]
    fn test_lower_1d_padding() {
        let x = ramp(&[1, 1, 3]);
        let k = Tensor::zeros(&[1, 1, 3]);
        let cols = lower(ConvRank::One, ConvParams::symmetric(1, 1), &x, &k).unwrap();
        assert_eq!(cols.shape(), &[1, 3, 3]);
        assert_eq!(cols.data(), &[0.0, 1.0, 2.0, 1.0, 2.0, 3.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_lower_2d_shape() {
        let x = ramp(&[2, 3, 5, 5]);
        let k = Tensor::zeros(&[4, 3, 3, 3]);
        let cols = lower(ConvRank::Two, ConvParams::symmetric(1, 2), &x, &k).unwrap();
        assert_eq!(cols.shape(), &[2, 3, 3, 27]);
    }

    #[test]
    fn test_round_trip_2d() {
        let x = ramp(&[2, 2, 4, 5]);
        let k = Tensor::zeros(&[3, 2, 3, 3]);
        let params = ConvParams::symmetric(1, 1);
        let cols = lower(ConvRank::Two, params, &x, &k).unwrap();
        let back = unlower(
            ConvRank::Two,
            params,
            Some(SpatialSize::Plane(4, 5)),
            &cols,
            &k,
        )
        .unwrap();
        assert_eq!(back, x);
    }

    #[test]
    fn test_round_trip_1d_inferred_size() {
        let x = ramp(&[1, 2, 7]);
        let k = Tensor::zeros(&[1, 2, 3]);
        let params = ConvParams::symmetric(0, 2);
        let cols = lower(ConvRank::One, params, &x, &k).unwrap();
        let back = unlower(ConvRank::One, params, None, &cols, &k).unwrap();
        assert_eq!(back, x);
    }

    #[test]
    fn test_channel_mismatch_and_bad_stride() {
        let x = ramp(&[1, 2, 4]);
        let k = Tensor::zeros(&[1, 3, 2]);
        assert!(lower(ConvRank::One, ConvParams::default(), &x, &k).is_err());
        let k = Tensor::zeros(&[1, 2, 2]);
        assert!(lower(ConvRank::One, ConvParams::symmetric(0, 0), &x, &k).is_err());
    }

    #[test]
    fn test_uncovered_positions_come_back_zero() {
        let x = ramp(&[1, 1, 6]);
        let k = Tensor::zeros(&[1, 1, 2]);
        let params = ConvParams::symmetric(0, 3);
        let cols = lower(ConvRank::One, params, &x, &k).unwrap();
        assert_eq!(cols.data(), &[1.0, 2.0, 4.0, 5.0]);
        let target = Some(SpatialSize::Length(6));
        let back = unlower(ConvRank::One, params, target, &cols, &k).unwrap();
        assert_eq!(back.data(), &[1.0, 2.0, 0.0, 4.0, 5.0, 0.0]);
    }

    #[test]
    fn test_oversized_parameters_are_rejected() {
        let x = ramp(&[1, 1, 4]);
        let k = Tensor::zeros(&[1, 1, 2]);
        let huge_pad = ConvParams::symmetric(usize::MAX / 2 + 1, 1);
        assert!(matches!(
            lower(ConvRank::One, huge_pad, &x, &k),
            Err(EngineError::InvalidParameter(_))
        ));

        let wide_pad = ConvParams::symmetric(usize::MAX / 4, 1);
        assert!(matches!(
            lower(ConvRank::One, wide_pad, &x, &k),
            Err(EngineError::InvalidParameter(_))
        ));

        let cols = lower(ConvRank::One, ConvParams::default(), &x, &k).unwrap();
        let huge_stride = ConvParams::symmetric(0, usize::MAX);
        assert!(matches!(
            unlower(ConvRank::One, huge_stride, None, &cols, &k),
            Err(EngineError::InvalidParameter(_))
        ));
        assert!(matches!(
            unlower(ConvRank::One, huge_pad, None, &cols, &k),
            Err(EngineError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_unlower_rejects_mismatched_target() {
        let x = ramp(&[1, 1, 4, 4]);
        let k = Tensor::zeros(&[1, 1, 2, 2]);
        let cols = lower(ConvRank::Two, ConvParams::default(), &x, &k).unwrap();
        assert!(unlower(
            ConvRank::Two,
            ConvParams::default(),
            Some(SpatialSize::Plane(6, 6)),
            &cols,
            &k
        )
        .is_err());
        assert!(unlower(
            ConvRank::Two,
            ConvParams::default(),
            Some(SpatialSize::Length(4)),
            &cols,
            &k
        )
        .is_err());
    }
}
