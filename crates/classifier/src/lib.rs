//! Image Classifier
//!
//! Top-1 classification of a fixed-size RGBA bitmap:
//! - Format and dimension validation
//! - Scoped pixel acquisition
//! - Standardized NCHW tensor preparation
//! - One synchronous forward pass
//! - Argmax decoding

pub mod config;
pub mod decoder;
pub mod ffi;

pub use config::ClassifierConfig;
pub use decoder::{argmax, top1, top_k};

use std::time::Duration;

use bitmap_source::{BitmapError, BitmapSource, PixelFormat, PixelLock};
use inference_engine::{InferenceEngine, InferenceError, Invoker, OutputActivations, TensorSpec};
use tensor_prep::{PreprocessError, Preprocessor};
use thiserror::Error;
use tracing::{debug, trace};

/// Classifier error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassifyError {
    #[error("Unsupported pixel format: {actual}, expected {expected:?}")]
    Format { actual: String, expected: PixelFormat },

    #[error("Dimension mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    Dimension {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("Pixel acquisition failed: {0}")]
    Acquisition(#[from] BitmapError),

    #[error("Preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Engine produced no scores")]
    EmptyOutput,

    #[error("Engine handle is not loaded")]
    InvalidEngine,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClassifyError {
    /// Negative sentinel for callers that only receive an integer
    pub fn code(&self) -> i32 {
        match self {
            ClassifyError::Acquisition(BitmapError::Info(_)) => -1,
            ClassifyError::Format { .. } => -2,
            ClassifyError::Acquisition(_) => -3,
            ClassifyError::Preprocess(_) => -4,
            ClassifyError::Inference(_) | ClassifyError::EmptyOutput => -5,
            ClassifyError::InvalidEngine => -6,
            ClassifyError::Config(_) => -7,
            ClassifyError::Dimension { .. } => -10,
        }
    }

    /// Whether retrying the same call could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClassifyError::Acquisition(_))
    }
}

/// Outcome of one successful classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Winning class, in `[0, class_count)`
    pub class_index: usize,
    /// Winning score (0.0 when no score was positive)
    pub score: f32,
    /// Time spent in the engine's forward pass
    pub inference_time: Duration,
}

/// Single-image classification pipeline.
///
/// Holds no engine and no pixels; both are borrowed per call, so one
/// `Classifier` can serve any number of sequential or concurrent calls.
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
    preprocessor: Preprocessor,
    input: TensorSpec,
    output: TensorSpec,
}

impl Classifier {
    /// Create a classifier from a validated configuration
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifyError> {
        config.validate()?;
        let preprocessor = Preprocessor::new(
            config.normalization,
            config.input_width as usize,
            config.input_height as usize,
        )?;
        Ok(Self {
            input: config.input_spec(),
            output: config.output_spec(),
            preprocessor,
            config,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Declared model input
    pub fn input_spec(&self) -> &TensorSpec {
        &self.input
    }

    /// Declared model output
    pub fn output_spec(&self) -> &TensorSpec {
        &self.output
    }

    /// Classify a bitmap.
    ///
    /// Format and dimensions are checked before the pixels are locked; the
    /// lock is released exactly once on every path after it is taken.
    pub fn classify<E, B>(&self, engine: &E, bitmap: &B) -> Result<Classification, ClassifyError>
    where
        E: InferenceEngine + ?Sized,
        B: BitmapSource + ?Sized,
    {
        self.classify_bitmap(engine, bitmap).map(|(result, _)| result)
    }

    /// Classify a bitmap and also rank the `k` best classes.
    ///
    /// `class_index` still follows the [`top1`] policy; the ranking is
    /// informational.
    pub fn classify_top_k<E, B>(
        &self,
        engine: &E,
        bitmap: &B,
        k: usize,
    ) -> Result<(Classification, Vec<(usize, f32)>), ClassifyError>
    where
        E: InferenceEngine + ?Sized,
        B: BitmapSource + ?Sized,
    {
        let (result, activations) = self.classify_bitmap(engine, bitmap)?;
        Ok((result, top_k(activations.as_slice(), k)))
    }

    /// Classify a raw pixel buffer the caller already holds
    pub fn classify_pixels<E>(
        &self,
        engine: &E,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Classification, ClassifyError>
    where
        E: InferenceEngine + ?Sized,
    {
        self.check_engine(engine)?;
        self.validate(format, width, height)?;
        self.run_pipeline(engine, pixels, width, height)
            .map(|(result, _)| result)
    }

    fn classify_bitmap<E, B>(
        &self,
        engine: &E,
        bitmap: &B,
    ) -> Result<(Classification, OutputActivations), ClassifyError>
    where
        E: InferenceEngine + ?Sized,
        B: BitmapSource + ?Sized,
    {
        self.check_engine(engine)?;

        let info = bitmap.info()?;
        self.validate(info.format, info.width, info.height)?;

        let pixels = PixelLock::acquire(bitmap)?;
        self.run_pipeline(engine, &pixels, info.width, info.height)
    }

    fn check_engine<E: InferenceEngine + ?Sized>(&self, engine: &E) -> Result<(), ClassifyError> {
        if engine.is_ready() {
            Ok(())
        } else {
            Err(ClassifyError::InvalidEngine)
        }
    }

    fn validate(&self, format: PixelFormat, width: u32, height: u32) -> Result<(), ClassifyError> {
        if format != self.config.pixel_format {
            return Err(ClassifyError::Format {
                actual: format!("{:?}", format),
                expected: self.config.pixel_format,
            });
        }
        if width != self.config.input_width || height != self.config.input_height {
            return Err(ClassifyError::Dimension {
                expected_width: self.config.input_width,
                expected_height: self.config.input_height,
                width,
                height,
            });
        }
        Ok(())
    }

    fn run_pipeline<E: InferenceEngine + ?Sized>(
        &self,
        engine: &E,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<(Classification, OutputActivations), ClassifyError> {
        let tensor = self
            .preprocessor
            .preprocess(pixels, width as usize, height as usize)?;
        trace!("Tensor ready: {:?}", tensor.shape());

        let invocation = Invoker::new(engine, self.input.clone(), self.output.clone()).run(&tensor)?;
        drop(tensor);

        let (class_index, score) =
            decoder::top1(invocation.activations.as_slice()).ok_or(ClassifyError::EmptyOutput)?;

        debug!(
            "Classified as {} (score={:.4}, inference={:?})",
            class_index, score, invocation.elapsed
        );

        let result = Classification {
            class_index,
            score,
            inference_time: invocation.elapsed,
        };
        Ok((result, invocation.activations))
    }
}
