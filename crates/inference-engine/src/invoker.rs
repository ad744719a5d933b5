//! Synchronous single-pass invoker

use std::time::{Duration, Instant};

use tensor_prep::NormalizedTensor;
use tracing::debug;

use crate::engine::{DataLayout, InferenceEngine, TensorSpec, TensorView, TensorViewMut};
use crate::InferenceError;

/// Scores produced by one forward pass, one per class
#[derive(Debug, Clone, PartialEq)]
pub struct OutputActivations(Vec<f32>);

impl OutputActivations {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of a successful invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Output scores
    pub activations: OutputActivations,
    /// Wall-clock time spent inside the engine
    pub elapsed: Duration,
}

/// Binds an engine to its declared input and output tensors
pub struct Invoker<'e, E: InferenceEngine + ?Sized> {
    engine: &'e E,
    input: TensorSpec,
    output: TensorSpec,
}

impl<'e, E: InferenceEngine + ?Sized> Invoker<'e, E> {
    /// Create an invoker borrowing `engine`
    pub fn new(engine: &'e E, input: TensorSpec, output: TensorSpec) -> Self {
        Self {
            engine,
            input,
            output,
        }
    }

    pub fn input_spec(&self) -> &TensorSpec {
        &self.input
    }

    pub fn output_spec(&self) -> &TensorSpec {
        &self.output
    }

    /// Run one forward pass over `tensor`.
    ///
    /// Blocks until the engine returns. The output buffer is allocated here and
    /// handed to the engine; on a non-success status it is dropped unread.
    pub fn run(&self, tensor: &NormalizedTensor) -> Result<Invocation, InferenceError> {
        let shape = tensor.shape();
        if shape[..] != self.input.shape[..] {
            return Err(InferenceError::InvalidInputShape {
                expected: format!("{:?}", self.input.shape),
                actual: format!("{:?}", shape),
            });
        }

        let len = self.output.element_count();
        let mut scores = Vec::new();
        scores
            .try_reserve_exact(len)
            .map_err(|_| InferenceError::OutputAllocation(len))?;
        scores.resize(len, 0.0f32);

        let input = TensorView {
            name: &self.input.name,
            shape: &self.input.shape,
            layout: DataLayout::Nchw,
            data: tensor.as_slice(),
        };
        let output = TensorViewMut {
            name: &self.output.name,
            shape: &self.output.shape,
            data: &mut scores,
        };

        let start = Instant::now();
        let status = self.engine.run(input, output);
        let elapsed = start.elapsed();

        metrics::histogram!("imgclass_inference_latency_ms").record(elapsed.as_secs_f64() * 1000.0);

        if !status.is_success() {
            metrics::counter!("imgclass_inference_failures_total").increment(1);
            return Err(InferenceError::EngineFailed {
                code: status.code,
                information: status.information,
            });
        }

        debug!("Inference completed in {:.2}ms", elapsed.as_secs_f64() * 1000.0);

        Ok(Invocation {
            activations: OutputActivations(scores),
            elapsed,
        })
    }
}
