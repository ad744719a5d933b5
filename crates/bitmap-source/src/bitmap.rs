//! Owned in-memory bitmap

use crate::{BitmapError, BitmapInfo, BitmapSource, PixelFormat};

/// Decoded bitmap held in memory
#[derive(Debug, Clone)]
pub struct Bitmap {
    /// Pixel data (width * height * bytes_per_pixel)
    pub data: Vec<u8>,
    /// Bitmap width
    pub width: u32,
    /// Bitmap height
    pub height: u32,
    /// Pixel format of `data`
    pub format: PixelFormat,
}

impl Bitmap {
    /// Create a bitmap from raw bytes, checking the buffer covers the geometry
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self, BitmapError> {
        let info = BitmapInfo { width, height, format };
        if data.len() < info.packed_len() {
            return Err(BitmapError::BufferTooSmall {
                expected: info.packed_len(),
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Take ownership of an RGBA image
    pub fn from_rgba_image(img: image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            data: img.into_raw(),
            width,
            height,
            format: PixelFormat::Rgba8888,
        }
    }
}

impl BitmapSource for Bitmap {
    fn info(&self) -> Result<BitmapInfo, BitmapError> {
        Ok(BitmapInfo {
            width: self.width,
            height: self.height,
            format: self.format,
        })
    }

    fn lock_pixels(&self) -> Result<&[u8], BitmapError> {
        Ok(&self.data)
    }

    fn unlock_pixels(&self) {}
}
