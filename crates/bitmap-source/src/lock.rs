//! Scoped pixel access

use std::ops::Deref;

use tracing::trace;

use crate::{BitmapError, BitmapSource};

/// Locked pixel buffer with RAII unlock
///
/// The source is unlocked exactly once, when the guard is dropped.
pub struct PixelLock<'a, B: BitmapSource + ?Sized> {
    source: &'a B,
    pixels: &'a [u8],
}

impl<'a, B: BitmapSource + ?Sized> PixelLock<'a, B> {
    /// Lock `source` and borrow its pixels until the guard drops
    pub fn acquire(source: &'a B) -> Result<Self, BitmapError> {
        let pixels = source.lock_pixels()?;
        trace!("Locked {} pixel bytes", pixels.len());
        Ok(Self { source, pixels })
    }

    /// Locked bytes
    pub fn pixels(&self) -> &[u8] {
        self.pixels
    }
}

impl<B: BitmapSource + ?Sized> Deref for PixelLock<'_, B> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.pixels
    }
}

impl<B: BitmapSource + ?Sized> Drop for PixelLock<'_, B> {
    fn drop(&mut self) {
        self.source.unlock_pixels();
        trace!("Unlocked pixels");
    }
}
