//! Interleaved RGBA to planar NCHW conversion

use ndarray::{ArrayView4, ArrayViewMut4};
use tracing::debug;

use crate::{ChannelStats, PreprocessError};

/// Color channels written to the tensor (alpha is dropped)
pub const CHANNELS: usize = 3;

/// Bytes per source pixel (R, G, B, A)
pub const SOURCE_BYTES_PER_PIXEL: usize = 4;

/// Planar f32 tensor of shape [1, 3, height, width]
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTensor {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl NormalizedTensor {
    /// Tensor shape in NCHW order
    pub fn shape(&self) -> [usize; 4] {
        [1, CHANNELS, self.height, self.width]
    }

    /// Flat element count (3 * height * width)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Planar storage, channel-major then row then column
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Element at channel `c`, row `y`, column `x`
    pub fn get(&self, c: usize, y: usize, x: usize) -> Option<f32> {
        if c >= CHANNELS || y >= self.height || x >= self.width {
            return None;
        }
        self.data.get(c * self.width * self.height + y * self.width + x).copied()
    }

    /// Shaped view over the storage
    pub fn view(&self) -> Result<ArrayView4<'_, f32>, PreprocessError> {
        ArrayView4::from_shape((1, CHANNELS, self.height, self.width), &self.data)
            .map_err(|e| PreprocessError::Shape(e.to_string()))
    }

}

/// Byte length of a packed RGBA image and element count of its tensor, if both fit in `usize`
pub fn checked_sizes(width: usize, height: usize) -> Option<(usize, usize)> {
    let pixels = width.checked_mul(height)?;
    Some((
        pixels.checked_mul(SOURCE_BYTES_PER_PIXEL)?,
        pixels.checked_mul(CHANNELS)?,
    ))
}

/// Tensor preprocessor for a fixed input resolution
#[derive(Debug, Clone)]
pub struct Preprocessor {
    stats: ChannelStats,
    width: usize,
    height: usize,
    byte_len: usize,
    tensor_len: usize,
}

impl Preprocessor {
    /// Create a preprocessor for `width` x `height` inputs.
    ///
    /// Fails when the source byte count or tensor element count overflows `usize`.
    pub fn new(stats: ChannelStats, width: usize, height: usize) -> Result<Self, PreprocessError> {
        stats.validate()?;
        let (byte_len, tensor_len) =
            checked_sizes(width, height).ok_or(PreprocessError::TooLarge { width, height })?;
        Ok(Self {
            stats,
            width,
            height,
            byte_len,
            tensor_len,
        })
    }

    /// Required input width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Required input height
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Element count of the produced tensor
    pub fn tensor_len(&self) -> usize {
        self.tensor_len
    }

    /// Convert row-major RGBA bytes into a standardized planar tensor.
    ///
    /// The byte at `i*width*4 + j*4 + k` lands at `k*width*height + i*width + j`.
    /// Alpha bytes are never read. Geometry must match exactly; nothing is resized.
    pub fn preprocess(
        &self,
        pixels: &[u8],
        width: usize,
        height: usize,
    ) -> Result<NormalizedTensor, PreprocessError> {
        if width != self.width || height != self.height {
            return Err(PreprocessError::DimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width,
                height,
            });
        }

        let expected = self.byte_len;
        if pixels.len() < expected {
            return Err(PreprocessError::BufferTooSmall {
                expected,
                actual: pixels.len(),
            });
        }

        let len = self.tensor_len();
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| PreprocessError::Allocation(len))?;
        data.resize(len, 0.0f32);

        {
            let mut tensor = ArrayViewMut4::from_shape((1, CHANNELS, height, width), &mut data)
                .map_err(|e| PreprocessError::Shape(e.to_string()))?;

            for (idx, px) in pixels[..expected]
                .chunks_exact(SOURCE_BYTES_PER_PIXEL)
                .enumerate()
            {
                let (i, j) = (idx / width, idx % width);
                for k in 0..CHANNELS {
                    tensor[[0, k, i, j]] = self.stats.normalize(k, px[k]);
                }
            }
        }

        debug!("Preprocessed {}x{} pixels into {} tensor elements", width, height, len);

        Ok(NormalizedTensor {
            data,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IMAGENET_MEAN, IMAGENET_STD};
    use proptest::prelude::*;

    fn imagenet(width: usize, height: usize) -> Preprocessor {
        Preprocessor::new(ChannelStats::imagenet(), width, height).unwrap()
    }

    fn reference(raw: u8, k: usize) -> f32 {
        (raw as f32 / 255.0 - IMAGENET_MEAN[k]) / IMAGENET_STD[k]
    }

    #[test]
    fn test_output_length() {
        let pre = imagenet(256, 256);
        let pixels = vec![128u8; 256 * 256 * 4];
        let tensor = pre.preprocess(&pixels, 256, 256).unwrap();
        assert_eq!(tensor.len(), 3 * 256 * 256);
        assert_eq!(tensor.shape(), [1, 3, 256, 256]);
    }

    #[test]
    fn test_all_zero_bytes() {
        let pre = imagenet(256, 256);
        let tensor = pre.preprocess(&vec![0u8; 256 * 256 * 4], 256, 256).unwrap();
        let plane = 256 * 256;
        for k in 0..3 {
            let expected = -IMAGENET_MEAN[k] / IMAGENET_STD[k];
            for &v in &tensor.as_slice()[k * plane..(k + 1) * plane] {
                assert!((v - expected).abs() < 1e-5);
            }
        }
        assert!((tensor.as_slice()[0] - (-2.1179)).abs() < 1e-4);
    }

    #[test]
    fn test_all_255_bytes() {
        let pre = imagenet(256, 256);
        let tensor = pre.preprocess(&vec![255u8; 256 * 256 * 4], 256, 256).unwrap();
        let plane = 256 * 256;
        for k in 0..3 {
            let expected = (1.0 - IMAGENET_MEAN[k]) / IMAGENET_STD[k];
            for &v in &tensor.as_slice()[k * plane..(k + 1) * plane] {
                assert!((v - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_planar_layout() {
        // 2x2 image, distinct channel values per pixel
        let pixels = [
            10, 20, 30, 255, 11, 21, 31, 255, //
            12, 22, 32, 255, 13, 23, 33, 255,
        ];
        let tensor = imagenet(2, 2).preprocess(&pixels, 2, 2).unwrap();
        let data = tensor.as_slice();
        assert_eq!(data[0], reference(10, 0));
        assert_eq!(data[3], reference(13, 0));
        assert_eq!(data[4], reference(20, 1));
        assert_eq!(data[4 + 1], reference(21, 1));
        assert_eq!(data[8 + 2], reference(32, 2));
        assert_eq!(tensor.get(2, 1, 1), Some(reference(33, 2)));
        assert_eq!(tensor.view().unwrap()[[0, 1, 1, 0]], reference(22, 1));
    }

    #[test]
    fn test_alpha_ignored() {
        let pre = imagenet(1, 1);
        let opaque = pre.preprocess(&[1, 2, 3, 255], 1, 1).unwrap();
        let clear = pre.preprocess(&[1, 2, 3, 0], 1, 1).unwrap();
        assert_eq!(opaque, clear);
    }

    #[test]
    fn test_dimension_mismatch() {
        let pre = imagenet(256, 256);
        let err = pre.preprocess(&vec![0u8; 128 * 128 * 4], 128, 128).unwrap_err();
        assert!(matches!(err, PreprocessError::DimensionMismatch { width: 128, .. }));
    }

    #[test]
    fn test_short_buffer() {
        let pre = imagenet(2, 2);
        let err = pre.preprocess(&[0u8; 15], 2, 2).unwrap_err();
        assert_eq!(
            err,
            PreprocessError::BufferTooSmall {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn test_oversized_resolution_rejected() {
        let result = Preprocessor::new(ChannelStats::imagenet(), usize::MAX, 2);
        assert!(matches!(result, Err(PreprocessError::TooLarge { .. })));

        let side = u32::MAX as usize;
        let result = Preprocessor::new(ChannelStats::imagenet(), side, side);
        assert!(matches!(result, Err(PreprocessError::TooLarge { .. })));
        assert_eq!(checked_sizes(256, 256), Some((256 * 256 * 4, 3 * 256 * 256)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_matches_formula_full_resolution(
            pixels in proptest::collection::vec(any::<u8>(), 256 * 256 * 4),
            coords in proptest::collection::vec((0usize..256, 0usize..256), 64),
        ) {
            let tensor = imagenet(256, 256).preprocess(&pixels, 256, 256).unwrap();
            prop_assert_eq!(tensor.len(), 3 * 256 * 256);
            for (i, j) in coords {
                for k in 0..3 {
                    let raw = pixels[i * 256 * 4 + j * 4 + k];
                    prop_assert_eq!(tensor.get(k, i, j), Some(reference(raw, k)));
                }
            }
        }
    }

    proptest! {
        #[test]
        fn prop_matches_formula(
            pixels in proptest::collection::vec(any::<u8>(), 8 * 6 * 4),
            i in 0usize..6,
            j in 0usize..8,
        ) {
            let (width, height) = (8, 6);
            let tensor = imagenet(width, height).preprocess(&pixels, width, height).unwrap();
            prop_assert_eq!(tensor.len(), 3 * width * height);
            for k in 0..3 {
                let raw = pixels[i * width * 4 + j * 4 + k];
                let got = tensor.as_slice()[k * width * height + i * width + j];
                prop_assert_eq!(got, reference(raw, k));
            }
        }
    }
}
