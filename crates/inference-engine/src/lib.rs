//! Inference Engine
//!
//! Engine contract and synchronous invoker for a single forward pass, plus an
//! ONNX backend built on tract.

mod engine;
mod invoker;
mod onnx;

pub use engine::{DataLayout, EngineStatus, InferenceEngine, StatusCode, TensorSpec, TensorView, TensorViewMut};
pub use invoker::{Invocation, Invoker, OutputActivations};
pub use onnx::OnnxEngine;

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Engine run failed ({code:?}): {information}")]
    EngineFailed { code: StatusCode, information: String },
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Failed to allocate {0} output elements")]
    OutputAllocation(usize),
}
