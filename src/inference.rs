// src/inference.rs - throttled classifier invocation
use crate::buffer::SequenceBuffer;
use crate::error::{ConfigError, ModelError};
use crate::model::{argmax, softmax, InputLayout, InputTensor, LabelTable, OutputKind, SequenceModel};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Run the model on every Nth processed frame
pub const DEFAULT_FRAME_SKIP: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

/// What the engine decided to do with this frame
#[derive(Debug, Clone, PartialEq)]
pub enum Schedule {
    /// Not an inference frame; reuse the cached stable prediction
    Skip,
    /// Inference frame, but the window has not filled yet
    WarmingUp,
    /// Inference frame with a ready input tensor
    Run(InputTensor),
}

pub struct InferenceEngine {
    model: Arc<dyn SequenceModel>,
    labels: LabelTable,
    frame_skip: u32,
    frame_counter: u64,
    failures: u64,
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("model", &self.model.name())
            .field("labels", &self.labels.len())
            .field("frame_skip", &self.frame_skip)
            .field("frame_counter", &self.frame_counter)
            .finish()
    }
}

impl InferenceEngine {
    /// Fails when the label table does not cover the model output exactly.
    pub fn new(model: Arc<dyn SequenceModel>, labels: LabelTable, frame_skip: u32) -> Result<Self, ConfigError> {
        if frame_skip == 0 {
            return Err(ConfigError::invalid("frame_skip must be at least 1"));
        }
        labels.ensure_matches(model.as_ref())?;

        Ok(Self {
            model,
            labels,
            frame_skip,
            frame_counter: 0,
            failures: 0,
        })
    }

    pub fn model(&self) -> Arc<dyn SequenceModel> {
        Arc::clone(&self.model)
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Count this frame and decide whether the model should run on it.
    ///
    /// Callers push the frame into `buffer` before scheduling, so skipped frames
    /// still land in the window.
    pub fn schedule(&mut self, buffer: &SequenceBuffer) -> Schedule {
        self.frame_counter += 1;
        if self.frame_counter % u64::from(self.frame_skip) != 0 {
            return Schedule::Skip;
        }
        if !buffer.is_full() {
            return Schedule::WarmingUp;
        }

        match self.build_input(buffer) {
            Ok(input) => Schedule::Run(input),
            Err(e) => {
                self.failures += 1;
                warn!(error = %e, "Failed to assemble model input");
                Schedule::WarmingUp
            }
        }
    }

    fn build_input(&self, buffer: &SequenceBuffer) -> Result<InputTensor, ModelError> {
        let layout = self.model.layout();
        let data = match layout {
            InputLayout::Sequence => buffer.to_flat(),
            InputLayout::SingleFrame => buffer
                .latest()
                .map(|frame| frame.to_vec())
                .ok_or_else(|| ModelError::execution("empty buffer"))?,
        };
        InputTensor::new(layout.shape(), data)
    }

    /// Turn a model result into a prediction. Errors are logged and become `None`.
    pub fn decode(&mut self, result: Result<Vec<f32>, ModelError>) -> Option<Prediction> {
        match self.interpret(result) {
            Ok(prediction) => {
                debug!(label = %prediction.label, confidence = prediction.confidence, "Inference");
                Some(prediction)
            }
            Err(e) => {
                self.failures += 1;
                warn!(error = %e, "Inference failed, skipping frame");
                None
            }
        }
    }

    fn interpret(&self, result: Result<Vec<f32>, ModelError>) -> Result<Prediction, ModelError> {
        let scores = result?;
        if scores.len() != self.labels.len() {
            return Err(ModelError::OutputWidth {
                expected: self.labels.len(),
                actual: scores.len(),
            });
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(ModelError::NonFinite);
        }

        let probabilities = match self.model.output_kind() {
            OutputKind::Logits => softmax(&scores),
            OutputKind::Probabilities => scores,
        };

        let (index, confidence) = argmax(&probabilities).ok_or(ModelError::OutputWidth {
            expected: self.labels.len(),
            actual: 0,
        })?;
        let label = self.labels.get(index).ok_or(ModelError::OutputWidth {
            expected: self.labels.len(),
            actual: index + 1,
        })?;

        Ok(Prediction {
            label: label.to_string(),
            confidence,
        })
    }

    /// Run the model inline on the calling thread
    pub fn infer(&mut self, input: &InputTensor) -> Option<Prediction> {
        let result = self.model.run(input);
        self.decode(result)
    }

    /// Start counting frames from zero again
    pub fn reset(&mut self) {
        self.frame_counter = 0;
    }
}
