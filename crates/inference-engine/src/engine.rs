//! Engine contract

use serde::{Deserialize, Serialize};

/// Status code reported by an engine run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    /// Forward pass completed and the output buffer is filled
    Success,
    /// Tensor names, shapes or buffer sizes did not match the model
    InvalidArgs,
    /// Engine ran out of memory or device resources
    OutOfResources,
    /// Operation or configuration not supported by the engine
    Unsupported,
    /// Any other failure inside the engine
    RuntimeError,
}

impl StatusCode {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Success => "success",
            StatusCode::InvalidArgs => "invalid_args",
            StatusCode::OutOfResources => "out_of_resources",
            StatusCode::Unsupported => "unsupported",
            StatusCode::RuntimeError => "runtime_error",
        }
    }
}

/// Result of one engine run: a status code plus diagnostic text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub code: StatusCode,
    pub information: String,
}

impl EngineStatus {
    pub fn success() -> Self {
        Self {
            code: StatusCode::Success,
            information: String::new(),
        }
    }

    pub fn error(code: StatusCode, information: impl Into<String>) -> Self {
        Self {
            code,
            information: information.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == StatusCode::Success
    }
}

/// Memory layout of an image tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataLayout {
    /// Channel-first (planar)
    Nchw,
    /// Channel-last (interleaved)
    Nhwc,
}

/// Declared name and shape of a model tensor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

impl TensorSpec {
    pub fn new(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// `[1, 3, height, width]` input in NCHW order
    pub fn image_input(name: impl Into<String>, width: usize, height: usize) -> Self {
        Self::new(name, vec![1, 3, height, width])
    }

    /// `[1, class_count]` score output
    pub fn class_scores(name: impl Into<String>, class_count: usize) -> Self {
        Self::new(name, vec![1, class_count])
    }

    /// Number of elements the shape holds, saturating at `usize::MAX`
    pub fn element_count(&self) -> usize {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .unwrap_or(usize::MAX)
    }
}

/// Named read-only input tensor handed to an engine
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    pub name: &'a str,
    pub shape: &'a [usize],
    pub layout: DataLayout,
    pub data: &'a [f32],
}

/// Named caller-owned output tensor an engine writes into
#[derive(Debug)]
pub struct TensorViewMut<'a> {
    pub name: &'a str,
    pub shape: &'a [usize],
    pub data: &'a mut [f32],
}

/// A loaded model ready to run forward passes.
///
/// Implementations write results into the caller-supplied output buffer and
/// never allocate their own output. `run` takes `&self`; engines that are not
/// safe to run concurrently must serialize internally or be used from one
/// thread at a time.
pub trait InferenceEngine {
    /// Whether the handle refers to a usable, loaded model
    fn is_ready(&self) -> bool {
        true
    }

    /// Run one synchronous forward pass
    fn run(&self, input: TensorView<'_>, output: TensorViewMut<'_>) -> EngineStatus;
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for &E {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn run(&self, input: TensorView<'_>, output: TensorViewMut<'_>) -> EngineStatus {
        (**self).run(input, output)
    }
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for Box<E> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn run(&self, input: TensorView<'_>, output: TensorViewMut<'_>) -> EngineStatus {
        (**self).run(input, output)
    }
}

impl<E: InferenceEngine + ?Sized> InferenceEngine for std::sync::Arc<E> {
    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn run(&self, input: TensorView<'_>, output: TensorViewMut<'_>) -> EngineStatus {
        (**self).run(input, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_input_spec() {
        let spec = TensorSpec::image_input("input", 256, 128);
        assert_eq!(spec.shape, vec![1, 3, 128, 256]);
        assert_eq!(spec.element_count(), 3 * 128 * 256);
    }

    #[test]
    fn test_element_count_saturates() {
        let spec = TensorSpec::new("output", vec![usize::MAX, 2]);
        assert_eq!(spec.element_count(), usize::MAX);
    }

    #[test]
    fn test_status() {
        assert!(EngineStatus::success().is_success());
        let status = EngineStatus::error(StatusCode::OutOfResources, "gpu oom");
        assert!(!status.is_success());
        assert_eq!(status.code.as_str(), "out_of_resources");
    }
}
