//! Per-channel standardization constants

use serde::{Deserialize, Serialize};

use crate::PreprocessError;

/// ImageNet channel means (R, G, B)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations (R, G, B)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Mean and standard deviation per color channel, in R, G, B order.
///
/// A raw byte `v` on channel `c` maps to `(v / 255 - mean[c]) / std[c]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Default for ChannelStats {
    fn default() -> Self {
        Self::imagenet()
    }
}

impl ChannelStats {
    /// ImageNet statistics
    pub fn imagenet() -> Self {
        Self {
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    /// Check every std is finite and non-zero
    pub fn validate(&self) -> Result<(), PreprocessError> {
        for (channel, &value) in self.std.iter().enumerate() {
            if value == 0.0 || !value.is_finite() {
                return Err(PreprocessError::InvalidStd { channel, value });
            }
        }
        Ok(())
    }

    /// Standardize one raw byte for `channel`
    #[inline]
    pub fn normalize(&self, channel: usize, raw: u8) -> f32 {
        (raw as f32 / 255.0 - self.mean[channel]) / self.std[channel]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imagenet_black() {
        let stats = ChannelStats::imagenet();
        assert!((stats.normalize(0, 0) - (-2.1179)).abs() < 1e-4);
        assert!((stats.normalize(1, 0) - (-2.0357)).abs() < 1e-4);
        assert!((stats.normalize(2, 0) - (-1.8044)).abs() < 1e-4);
    }

    #[test]
    fn test_imagenet_white() {
        let stats = ChannelStats::imagenet();
        assert!((stats.normalize(0, 255) - 2.2489).abs() < 1e-4);
        assert!((stats.normalize(1, 255) - 2.4286).abs() < 1e-4);
        assert!((stats.normalize(2, 255) - 2.64).abs() < 1e-4);
    }

    #[test]
    fn test_zero_std_rejected() {
        let stats = ChannelStats {
            mean: IMAGENET_MEAN,
            std: [0.229, 0.0, 0.225],
        };
        assert_eq!(
            stats.validate(),
            Err(PreprocessError::InvalidStd {
                channel: 1,
                value: 0.0
            })
        );
        assert!(ChannelStats::imagenet().validate().is_ok());
    }
}
