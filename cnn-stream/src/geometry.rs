//! Problem geometry: runtime dimensions bounded by compile-time maxima.
//!
//! Every buffer in the pipeline is sized to the maxima below and indexed
//! with runtime dimensions, so one build serves any problem instance up to
//! the ceiling. [`Geometry`] can only be obtained through its validating
//! constructors; holding one is proof that the dimensions are consistent
//! and within bounds.

use crate::error::Error;

pub const MAX_CHANNELS: usize = 256;
pub const MAX_KERNEL: usize = 5;
pub const MAX_IMAGE_SIZE: usize = 224;
pub const MAX_IN_IMAGE_SIZE: usize = MAX_IMAGE_SIZE + MAX_KERNEL - 1;
pub const MAX_OUT_IMAGE_SIZE: usize = MAX_IMAGE_SIZE / 2;

/// Validated dimensions of one convolution problem.
///
/// Tensor shapes implied by a geometry:
///
/// - input:  `[num_channels, in_image_size, in_image_size]`
/// - weight: `[num_channels, num_channels, kernel_size, kernel_size]`
/// - bias:   `[num_channels]`
/// - output: `[num_channels, out_image_size, out_image_size]`
///
/// `in_image_size = image_size + kernel_size - 1` (valid convolution, no
/// padding) and `out_image_size = image_size / 2` (2x2 pooling, truncating)
/// hold for every constructed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    num_channels: usize,
    kernel_size: usize,
    image_size: usize,
    in_image_size: usize,
    out_image_size: usize,
}

fn check_dim(name: &'static str, value: usize, max: usize) -> Result<(), Error> {
    if value == 0 {
        return Err(Error::ZeroDimension(name));
    }
    if value > max {
        return Err(Error::DimensionTooLarge { name, value, max });
    }
    Ok(())
}

impl Geometry {
    /// Builds a geometry from the three base dimensions, deriving the rest.
    pub fn new(num_channels: usize, kernel_size: usize, image_size: usize) -> Result<Self, Error> {
        check_dim("num_channels", num_channels, MAX_CHANNELS)?;
        check_dim("kernel_size", kernel_size, MAX_KERNEL)?;
        check_dim("image_size", image_size, MAX_IMAGE_SIZE)?;
        Ok(Geometry {
            num_channels,
            kernel_size,
            image_size,
            in_image_size: image_size + kernel_size - 1,
            out_image_size: image_size / 2,
        })
    }

    /// Builds a geometry from all five dimensions, rejecting derived ones
    /// that disagree with the base dimensions.
    pub fn from_dims(
        num_channels: usize,
        kernel_size: usize,
        image_size: usize,
        in_image_size: usize,
        out_image_size: usize,
    ) -> Result<Self, Error> {
        let geom = Self::new(num_channels, kernel_size, image_size)?;
        if in_image_size != geom.in_image_size {
            return Err(Error::DerivedMismatch {
                name: "in_image_size",
                expected: geom.in_image_size,
                actual: in_image_size,
            });
        }
        if out_image_size != geom.out_image_size {
            return Err(Error::DerivedMismatch {
                name: "out_image_size",
                expected: geom.out_image_size,
                actual: out_image_size,
            });
        }
        Ok(geom)
    }

    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn image_size(&self) -> usize {
        self.image_size
    }

    pub fn in_image_size(&self) -> usize {
        self.in_image_size
    }

    pub fn out_image_size(&self) -> usize {
        self.out_image_size
    }

    // ------------------------------------------------------------------
    // Tensor lengths
    // ------------------------------------------------------------------

    pub fn input_len(&self) -> usize {
        self.num_channels * self.in_image_size * self.in_image_size
    }

    pub fn weight_len(&self) -> usize {
        self.num_channels * self.num_channels * self.kernel_size * self.kernel_size
    }

    pub fn bias_len(&self) -> usize {
        self.num_channels
    }

    pub fn output_len(&self) -> usize {
        self.num_channels * self.out_image_size * self.out_image_size
    }

    /// Checks the four caller buffers against the lengths this geometry
    /// requires. Runs before any stage is spawned.
    pub fn check_buffers(
        &self,
        input_len: usize,
        weight_len: usize,
        bias_len: usize,
        output_len: usize,
    ) -> Result<(), Error> {
        let expect = |name: &'static str, expected: usize, actual: usize| {
            if actual == expected {
                Ok(())
            } else {
                Err(Error::BufferLen {
                    name,
                    expected,
                    actual,
                })
            }
        };
        expect("input", self.input_len(), input_len)?;
        expect("weight", self.weight_len(), weight_len)?;
        expect("bias", self.bias_len(), bias_len)?;
        expect("output", self.output_len(), output_len)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Flat index formulas
    // ------------------------------------------------------------------

    /// Input element `(j, h, w)`: channel, row, column in the padded image.
    #[inline]
    pub fn input_idx(&self, j: usize, h: usize, w: usize) -> usize {
        j * self.in_image_size * self.in_image_size + h * self.in_image_size + w
    }

    /// Weight element `(i, j, p, q)`: output channel, input channel,
    /// kernel row, kernel column.
    #[inline]
    pub fn weight_idx(&self, i: usize, j: usize, p: usize, q: usize) -> usize {
        i * self.num_channels * self.kernel_size * self.kernel_size
            + j * self.kernel_size * self.kernel_size
            + p * self.kernel_size
            + q
    }

    /// Output element `(i, h, w)` in the pooled image.
    #[inline]
    pub fn output_idx(&self, i: usize, h: usize, w: usize) -> usize {
        i * self.out_image_size * self.out_image_size + h * self.out_image_size + w
    }

    // ------------------------------------------------------------------
    // Channel element counts
    // ------------------------------------------------------------------
    //
    // Producer and consumer sides of every channel derive their counts
    // from the same geometry, which is what rules out deadlock: totals are
    // matched by construction. u64 because the input total exceeds u32
    // range at the maxima.

    /// Elements of one input pass: `num_channels * image_size^2 * kernel_size^2`.
    pub fn input_pass_elems(&self) -> u64 {
        self.num_channels as u64
            * (self.image_size as u64 * self.image_size as u64)
            * (self.kernel_size as u64 * self.kernel_size as u64)
    }

    /// Total input-channel traffic: one pass per output channel.
    pub fn input_stream_elems(&self) -> u64 {
        self.num_channels as u64 * self.input_pass_elems()
    }

    /// Total weight-channel traffic: each weight exactly once.
    pub fn weight_stream_elems(&self) -> u64 {
        self.weight_len() as u64
    }

    /// Total bias-channel traffic: `bias[i]` broadcast once per pixel.
    pub fn bias_stream_elems(&self) -> u64 {
        self.num_channels as u64 * self.image_size as u64 * self.image_size as u64
    }

    /// Multiply-accumulate operations in one invocation.
    pub fn mac_count(&self) -> u64 {
        self.input_stream_elems()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_in_and_out_sizes() {
        let g = Geometry::new(4, 3, 6).unwrap();
        assert_eq!(g.in_image_size(), 8);
        assert_eq!(g.out_image_size(), 3);
        let g = Geometry::new(256, 5, 224).unwrap();
        assert_eq!(g.in_image_size(), MAX_IN_IMAGE_SIZE);
        assert_eq!(g.out_image_size(), MAX_OUT_IMAGE_SIZE);
    }

    #[test]
    fn odd_image_size_truncates_pooling() {
        let g = Geometry::new(1, 1, 5).unwrap();
        assert_eq!(g.out_image_size(), 2);
        // 2x2 pooling never reads row/col 4 of a 5-wide accumulator.
        assert_eq!(2 * g.out_image_size(), 4);
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert_eq!(
            Geometry::new(0, 3, 6),
            Err(Error::ZeroDimension("num_channels"))
        );
        assert_eq!(
            Geometry::new(4, 0, 6),
            Err(Error::ZeroDimension("kernel_size"))
        );
        assert_eq!(
            Geometry::new(4, 3, 0),
            Err(Error::ZeroDimension("image_size"))
        );
    }

    #[test]
    fn rejects_dimensions_above_maxima() {
        let err = Geometry::new(MAX_CHANNELS + 1, 3, 6).unwrap_err();
        assert_eq!(
            err,
            Error::DimensionTooLarge {
                name: "num_channels",
                value: MAX_CHANNELS + 1,
                max: MAX_CHANNELS,
            }
        );
        assert!(Geometry::new(4, MAX_KERNEL + 1, 6).is_err());
        assert!(Geometry::new(4, 3, MAX_IMAGE_SIZE + 1).is_err());
    }

    #[test]
    fn rejects_inconsistent_derived_dimensions() {
        let err = Geometry::from_dims(4, 3, 6, 9, 3).unwrap_err();
        assert_eq!(
            err,
            Error::DerivedMismatch {
                name: "in_image_size",
                expected: 8,
                actual: 9,
            }
        );
        let err = Geometry::from_dims(4, 3, 6, 8, 4).unwrap_err();
        assert!(matches!(
            err,
            Error::DerivedMismatch {
                name: "out_image_size",
                ..
            }
        ));
        assert!(Geometry::from_dims(4, 3, 6, 8, 3).is_ok());
    }

    #[test]
    fn index_formulas_cover_tensors_densely() {
        let g = Geometry::new(2, 3, 4).unwrap();
        // Last element of each tensor lands on len - 1.
        assert_eq!(
            g.input_idx(1, g.in_image_size() - 1, g.in_image_size() - 1),
            g.input_len() - 1
        );
        assert_eq!(g.weight_idx(1, 1, 2, 2), g.weight_len() - 1);
        assert_eq!(
            g.output_idx(1, g.out_image_size() - 1, g.out_image_size() - 1),
            g.output_len() - 1
        );
        // Row stride of the input is the padded width.
        assert_eq!(g.input_idx(0, 1, 0) - g.input_idx(0, 0, 0), 6);
    }

    #[test]
    fn buffer_check_names_the_offender() {
        let g = Geometry::new(2, 3, 4).unwrap();
        assert!(g
            .check_buffers(g.input_len(), g.weight_len(), g.bias_len(), g.output_len())
            .is_ok());
        let err = g
            .check_buffers(g.input_len() - 1, g.weight_len(), g.bias_len(), g.output_len())
            .unwrap_err();
        assert_eq!(
            err,
            Error::BufferLen {
                name: "input",
                expected: g.input_len(),
                actual: g.input_len() - 1,
            }
        );
        let msg = err.to_string();
        assert!(msg.contains("input"), "got: {msg}");
    }

    #[test]
    fn stream_counts_match_loop_nests() {
        let g = Geometry::new(2, 3, 4).unwrap();
        assert_eq!(g.input_pass_elems(), 2 * 16 * 9);
        assert_eq!(g.input_stream_elems(), 2 * 2 * 16 * 9);
        assert_eq!(g.weight_stream_elems(), 2 * 2 * 9);
        assert_eq!(g.bias_stream_elems(), 2 * 16);
    }

    #[test]
    fn mac_count_fits_u64_at_maxima() {
        let g = Geometry::new(MAX_CHANNELS, MAX_KERNEL, MAX_IMAGE_SIZE).unwrap();
        assert_eq!(g.mac_count(), 82_208_358_400);
    }
}
