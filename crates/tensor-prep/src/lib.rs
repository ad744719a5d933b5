//! Tensor Preparation
//!
//! Converts interleaved RGBA bytes into the planar, standardized f32 tensor
//! an image classifier consumes.

mod error;
mod normalizer;
mod preprocessor;

pub use error::PreprocessError;
pub use normalizer::{ChannelStats, IMAGENET_MEAN, IMAGENET_STD};
pub use preprocessor::{checked_sizes, NormalizedTensor, Preprocessor, CHANNELS, SOURCE_BYTES_PER_PIXEL};
