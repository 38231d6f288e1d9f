// src/onnx.rs - ONNX Runtime backend for the exported sequence model
//
// Only compiled with the `onnx` feature. The session needs `&mut` to run, so it
// sits behind a mutex; a session never has more than one inference in flight.
use crate::error::{ConfigError, ModelError};
use crate::model::{resolve_output_width, InputLayout, InputTensor, OutputKind, SequenceModel};
use ort::session::Session;
use ort::value::ValueType;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

pub struct OnnxSequenceModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    output_width: usize,
    output_kind: OutputKind,
}

impl std::fmt::Debug for OnnxSequenceModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSequenceModel")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("output_width", &self.output_width)
            .finish()
    }
}

impl OnnxSequenceModel {
    /// `output_width` is what the label table expects; a graph with a fixed,
    /// different class dimension is rejected here.
    pub fn from_file(path: impl AsRef<Path>, output_width: usize, output_kind: OutputKind) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(?path, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| ConfigError::Backend(format!("failed to create session builder: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| ConfigError::Backend(format!("failed to load {}: {}", path.display(), e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| ConfigError::Backend("model declares no inputs".to_string()))?;
        let output = session
            .outputs
            .first()
            .ok_or_else(|| ConfigError::Backend("model declares no outputs".to_string()))?;
        let output_name = output.name.clone();

        // Class count as the graph declares it; `[batch, classes]` for the exported model
        let declared = match &output.output_type {
            ValueType::Tensor { shape, .. } => shape.last().copied(),
            _ => None,
        };
        let output_width = resolve_output_width(declared, output_width)?;

        info!(input = %input_name, output = %output_name, classes = output_width, "ONNX model ready");

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            output_width,
            output_kind,
        })
    }
}

impl SequenceModel for OnnxSequenceModel {
    fn name(&self) -> &str {
        "onnx-sequence"
    }

    fn layout(&self) -> InputLayout {
        InputLayout::Sequence
    }

    fn output_width(&self) -> usize {
        self.output_width
    }

    fn output_kind(&self) -> OutputKind {
        self.output_kind
    }

    fn run(&self, input: &InputTensor) -> Result<Vec<f32>, ModelError> {
        let shape: Vec<i64> = input.shape.iter().map(|&d| d as i64).collect();
        let tensor = ort::value::Tensor::from_array((shape, input.data.clone()))
            .map_err(|e| ModelError::execution(format!("failed to build input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::execution("session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => tensor])
            .map_err(|e| ModelError::execution(e.to_string()))?;

        let (_, scores) = outputs[self.output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::execution(format!("failed to read output: {}", e)))?;

        Ok(scores.to_vec())
    }
}
