//! Classifier configuration

use std::path::Path;

use bitmap_source::PixelFormat;
use inference_engine::TensorSpec;
use serde::{Deserialize, Serialize};
use tensor_prep::ChannelStats;
use tracing::info;

use crate::ClassifyError;

/// Environment variable prefix for overrides (`IMGCLASS_INPUT_WIDTH=224`)
pub const ENV_PREFIX: &str = "IMGCLASS";

/// Classifier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Required bitmap width (pixels)
    pub input_width: u32,

    /// Required bitmap height (pixels)
    pub input_height: u32,

    /// Number of scores the model emits
    pub class_count: usize,

    /// Model input tensor name
    pub input_name: String,

    /// Model output tensor name
    pub output_name: String,

    /// Only accepted bitmap format
    pub pixel_format: PixelFormat,

    /// Per-channel standardization
    pub normalization: ChannelStats,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self::imagenet()
    }
}

impl ClassifierConfig {
    /// 256x256 RGBA input, 1000 ImageNet classes
    pub fn imagenet() -> Self {
        Self {
            input_width: 256,
            input_height: 256,
            class_count: 1000,
            input_name: "input".to_string(),
            output_name: "output".to_string(),
            pixel_format: PixelFormat::Rgba8888,
            normalization: ChannelStats::imagenet(),
        }
    }

    /// ImageNet settings at another input resolution
    pub fn with_resolution(width: u32, height: u32) -> Self {
        Self {
            input_width: width,
            input_height: height,
            ..Self::imagenet()
        }
    }

    /// Load from an optional file, then apply `IMGCLASS_*` environment overrides.
    ///
    /// Keys absent from both sources keep their [`imagenet`](Self::imagenet) value.
    pub fn load(path: Option<&Path>) -> Result<Self, ClassifyError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            info!("Loading classifier config from {}", path.display());
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ClassifyError::Config(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject configurations no model could satisfy
    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.input_width == 0 || self.input_height == 0 {
            return Err(ClassifyError::Config(format!(
                "input resolution must be non-zero, got {}x{}",
                self.input_width, self.input_height
            )));
        }
        if tensor_prep::checked_sizes(self.input_width as usize, self.input_height as usize).is_none() {
            return Err(ClassifyError::Config(format!(
                "input resolution {}x{} is too large",
                self.input_width, self.input_height
            )));
        }
        if self.class_count == 0 {
            return Err(ClassifyError::Config("class_count must be at least 1".into()));
        }
        if self.input_name.is_empty() || self.output_name.is_empty() {
            return Err(ClassifyError::Config("tensor names must not be empty".into()));
        }
        if self.pixel_format != PixelFormat::Rgba8888 {
            return Err(ClassifyError::Config(format!(
                "pixel format {:?} is not supported, only Rgba8888",
                self.pixel_format
            )));
        }
        self.normalization
            .validate()
            .map_err(|e| ClassifyError::Config(e.to_string()))
    }

    /// Declared model input: `[1, 3, height, width]`
    pub fn input_spec(&self) -> TensorSpec {
        TensorSpec::image_input(
            self.input_name.clone(),
            self.input_width as usize,
            self.input_height as usize,
        )
    }

    /// Declared model output: `[1, class_count]`
    pub fn output_spec(&self) -> TensorSpec {
        TensorSpec::class_scores(self.output_name.clone(), self.class_count)
    }
}
