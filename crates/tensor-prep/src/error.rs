//! Preprocessing Error Types

use thiserror::Error;

/// Errors while building the input tensor
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreprocessError {
    /// Source geometry differs from the configured resolution
    #[error("Dimension mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    DimensionMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    /// Pixel buffer shorter than width * height * 4
    #[error("Pixel buffer too small: expected {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    /// Resolution whose byte or element count overflows `usize`
    #[error("Resolution {width}x{height} is too large")]
    TooLarge { width: usize, height: usize },

    /// Tensor storage could not be allocated
    #[error("Failed to allocate {0} tensor elements")]
    Allocation(usize),

    /// Standard deviation that would divide by zero
    #[error("Invalid std for channel {channel}: {value}")]
    InvalidStd { channel: usize, value: f32 },

    /// Buffer length does not match the tensor shape
    #[error("Tensor shape error: {0}")]
    Shape(String),
}
