//! Bitmap Source
//!
//! Contract between the classification core and whatever owns the pixels:
//! - Pixel format and dimension query
//! - Lock/unlock discipline with a scoped [`PixelLock`] guard
//! - In-memory [`Bitmap`] and `image::RgbaImage` implementations

pub mod bitmap;
pub mod lock;

pub use bitmap::Bitmap;
pub use lock::PixelLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bitmap error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BitmapError {
    #[error("Failed to query bitmap info: {0}")]
    Info(String),

    #[error("Failed to lock pixels: {0}")]
    Lock(String),

    #[error("Pixel buffer too small: expected at least {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },
}

/// Pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 4 bytes per pixel, R,G,B,A byte order
    Rgba8888,
    /// 2 bytes per pixel, packed 5-6-5
    Rgb565,
    /// 2 bytes per pixel, packed 4-4-4-4
    Rgba4444,
    /// 1 byte per pixel, alpha only
    Alpha8,
    /// 8 bytes per pixel, half-float channels
    RgbaF16,
}

impl PixelFormat {
    /// Bytes occupied by one pixel
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Rgba8888 => 4,
            PixelFormat::Rgb565 | PixelFormat::Rgba4444 => 2,
            PixelFormat::Alpha8 => 1,
            PixelFormat::RgbaF16 => 8,
        }
    }
}

/// Format and geometry of a bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitmapInfo {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl BitmapInfo {
    /// Minimum byte length of a tightly packed buffer with this geometry
    pub fn packed_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Anything that can hand out a raw pixel buffer under a lock.
///
/// Every successful [`lock_pixels`](BitmapSource::lock_pixels) must be paired
/// with exactly one [`unlock_pixels`](BitmapSource::unlock_pixels). Use
/// [`PixelLock::acquire`] rather than calling them directly.
pub trait BitmapSource {
    /// Query format and dimensions without touching the pixels
    fn info(&self) -> Result<BitmapInfo, BitmapError>;

    /// Lock the pixel buffer and borrow its bytes
    fn lock_pixels(&self) -> Result<&[u8], BitmapError>;

    /// Release a lock taken by `lock_pixels`
    fn unlock_pixels(&self);
}

impl<T: BitmapSource + ?Sized> BitmapSource for &T {
    fn info(&self) -> Result<BitmapInfo, BitmapError> {
        (**self).info()
    }

    fn lock_pixels(&self) -> Result<&[u8], BitmapError> {
        (**self).lock_pixels()
    }

    fn unlock_pixels(&self) {
        (**self).unlock_pixels()
    }
}

impl BitmapSource for image::RgbaImage {
    fn info(&self) -> Result<BitmapInfo, BitmapError> {
        Ok(BitmapInfo {
            width: self.width(),
            height: self.height(),
            format: PixelFormat::Rgba8888,
        })
    }

    fn lock_pixels(&self) -> Result<&[u8], BitmapError> {
        Ok(self.as_raw())
    }

    fn unlock_pixels(&self) {}
}
