//! ONNX backend using tract

use std::io::Cursor;
use std::path::Path;

use tract_onnx::prelude::*;
use tracing::{debug, info};

use crate::engine::{DataLayout, EngineStatus, InferenceEngine, StatusCode, TensorSpec, TensorView, TensorViewMut};
use crate::InferenceError;

type RunnablePlan = TypedRunnableModel<TypedModel>;

/// ONNX model compiled into a tract runnable plan
pub struct OnnxEngine {
    plan: RunnablePlan,
    input: TensorSpec,
    output: TensorSpec,
    source: String,
}

impl OnnxEngine {
    /// Load and optimize an ONNX model file.
    ///
    /// `input` fixes the model's first input fact; `output` declares the name
    /// and shape callers must request.
    pub fn load(path: impl AsRef<Path>, input: TensorSpec, output: TensorSpec) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        info!("Loading ONNX model from {}", path.display());

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {}", path.display(), e)))?;

        Self::compile(model, input, output, path.display().to_string())
    }

    /// Load an ONNX model from memory
    pub fn from_bytes(bytes: &[u8], input: TensorSpec, output: TensorSpec) -> Result<Self, InferenceError> {
        info!("Loading ONNX model from {} bytes", bytes.len());

        let model = tract_onnx::onnx()
            .model_for_read(&mut Cursor::new(bytes))
            .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;

        Self::compile(model, input, output, "<memory>".to_string())
    }

    fn compile(
        model: InferenceModel,
        input: TensorSpec,
        output: TensorSpec,
        source: String,
    ) -> Result<Self, InferenceError> {
        let plan = model
            .with_input_fact(0, f32::fact(input.shape.clone()).into())
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| InferenceError::ModelLoadError(e.to_string()))?;

        info!(
            "Model ready: input {} {:?}, output {} {:?}",
            input.name, input.shape, output.name, output.shape
        );

        Ok(Self {
            plan,
            input,
            output,
            source,
        })
    }

    pub fn input_spec(&self) -> &TensorSpec {
        &self.input
    }

    pub fn output_spec(&self) -> &TensorSpec {
        &self.output
    }

    /// Path (or `<memory>`) the model was loaded from
    pub fn source(&self) -> &str {
        &self.source
    }

    fn check_args(&self, input: &TensorView<'_>, output: &TensorViewMut<'_>) -> Option<EngineStatus> {
        if input.name != self.input.name || output.name != self.output.name {
            return Some(EngineStatus::error(
                StatusCode::InvalidArgs,
                format!(
                    "unknown tensor names {}/{} (model declares {}/{})",
                    input.name, output.name, self.input.name, self.output.name
                ),
            ));
        }
        if input.layout != DataLayout::Nchw {
            return Some(EngineStatus::error(StatusCode::Unsupported, "only NCHW input is supported"));
        }
        if input.shape != self.input.shape.as_slice() || input.data.len() != self.input.element_count() {
            return Some(EngineStatus::error(
                StatusCode::InvalidArgs,
                format!("input shape {:?} does not match {:?}", input.shape, self.input.shape),
            ));
        }
        if output.data.len() != self.output.element_count() {
            return Some(EngineStatus::error(
                StatusCode::InvalidArgs,
                format!(
                    "output buffer holds {} elements, model produces {}",
                    output.data.len(),
                    self.output.element_count()
                ),
            ));
        }
        None
    }
}

impl InferenceEngine for OnnxEngine {
    fn run(&self, input: TensorView<'_>, output: TensorViewMut<'_>) -> EngineStatus {
        if let Some(status) = self.check_args(&input, &output) {
            return status;
        }

        let tensor = match Tensor::from_shape::<f32>(input.shape, input.data) {
            Ok(t) => t,
            Err(e) => return EngineStatus::error(StatusCode::InvalidArgs, e.to_string()),
        };

        let results = match self.plan.run(tvec!(tensor.into())) {
            Ok(r) => r,
            Err(e) => return EngineStatus::error(StatusCode::RuntimeError, e.to_string()),
        };

        let Some(first) = results.first() else {
            return EngineStatus::error(StatusCode::RuntimeError, "model produced no outputs");
        };

        let scores = match first.as_slice::<f32>() {
            Ok(s) => s,
            Err(e) => return EngineStatus::error(StatusCode::Unsupported, e.to_string()),
        };

        if scores.len() != output.data.len() {
            return EngineStatus::error(
                StatusCode::InvalidArgs,
                format!("model produced {} scores, expected {}", scores.len(), output.data.len()),
            );
        }

        output.data.copy_from_slice(scores);
        debug!("Copied {} scores into {}", scores.len(), output.name);
        EngineStatus::success()
    }
}
