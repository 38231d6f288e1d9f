// src/model.rs - classifier contract, label table and model store loading
use crate::buffer::SEQUENCE_LENGTH;
use crate::error::{ConfigError, ModelError};
use crate::features::FEATURE_COUNT;
use crate::mlp::MlpModel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub const MODEL_CONFIG_FILE: &str = "model_config.json";
pub const LABELS_FILE: &str = "labels.json";
/// Names the ONNX export step gives the copies deployed next to `lstm_model.onnx`
pub const DEPLOYED_CONFIG_FILE: &str = "lstm_config.json";
pub const DEPLOYED_LABELS_FILE: &str = "lstm_labels.json";
pub const SEQUENCE_MODEL_FILE: &str = "lstm_model.onnx";
pub const FALLBACK_MODEL_FILE: &str = "mlp_model.json";

/// What the model consumes per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayout {
    /// `[1, SEQUENCE_LENGTH, FEATURE_COUNT]`, the whole window
    Sequence,
    /// `[1, FEATURE_COUNT]`, newest frame only
    SingleFrame,
}

impl InputLayout {
    pub fn shape(&self) -> Vec<usize> {
        match self {
            InputLayout::Sequence => vec![1, SEQUENCE_LENGTH, FEATURE_COUNT],
            InputLayout::SingleFrame => vec![1, FEATURE_COUNT],
        }
    }
}

/// What the model's output scores mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Raw class scores, softmax is applied by the engine
    #[default]
    Logits,
    Probabilities,
}

/// Dense input tensor with an explicit shape.
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl InputTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, ModelError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(ModelError::ShapeMismatch {
                expected: shape,
                actual: vec![data.len()],
            });
        }
        Ok(Self { shape, data })
    }
}

/// An opaque classifier: one input tensor in, one score per class out.
pub trait SequenceModel: Send + Sync {
    fn name(&self) -> &str;

    fn layout(&self) -> InputLayout;

    fn output_width(&self) -> usize;

    fn output_kind(&self) -> OutputKind {
        OutputKind::Logits
    }

    fn run(&self, input: &InputTensor) -> Result<Vec<f32>, ModelError>;
}

/// `model_config.json` written next to the exported model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub sequence_length: usize,
    pub num_features: usize,
    pub num_classes: usize,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub output: OutputKind,
}

impl ModelConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }

    /// Reject a model trained on a different window or feature layout
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sequence_length != SEQUENCE_LENGTH {
            return Err(ConfigError::SequenceLength {
                expected: SEQUENCE_LENGTH,
                actual: self.sequence_length,
            });
        }
        if self.num_features != FEATURE_COUNT {
            return Err(ConfigError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: self.num_features,
            });
        }
        if !self.labels.is_empty() && self.labels.len() != self.num_classes {
            return Err(ConfigError::LabelMismatch {
                labels: self.labels.len(),
                outputs: self.num_classes,
            });
        }
        Ok(())
    }
}

/// Index → label lookup. Its length must equal the model output width.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelTable(Vec<String>);

impl LabelTable {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        read_json(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    pub fn ensure_matches(&self, model: &dyn SequenceModel) -> Result<(), ConfigError> {
        if self.len() != model.output_width() {
            return Err(ConfigError::LabelMismatch {
                labels: self.len(),
                outputs: model.output_width(),
            });
        }
        Ok(())
    }
}

/// A model ready to be handed to a session.
#[derive(Clone)]
pub struct LoadedModel {
    pub model: Arc<dyn SequenceModel>,
    pub labels: LabelTable,
    pub source: PathBuf,
}

impl std::fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModel")
            .field("model", &self.model.name())
            .field("layout", &self.model.layout())
            .field("labels", &self.labels.len())
            .field("source", &self.source)
            .finish()
    }
}

/// Load the classifier from a model directory.
///
/// Prefers the ONNX sequence model when the `onnx` feature is enabled and the
/// file exists, otherwise falls back to the single-frame MLP. Any mismatch
/// between labels, config and model output is fatal here, never per frame.
pub fn load_model(dir: impl AsRef<Path>) -> Result<LoadedModel, ConfigError> {
    let dir = dir.as_ref();

    let config = match first_existing(dir, &[MODEL_CONFIG_FILE, DEPLOYED_CONFIG_FILE]) {
        Some(path) => {
            let config = ModelConfig::load(&path)?;
            config.validate()?;
            Some(config)
        }
        None => None,
    };

    let labels = if let Some(path) = first_existing(dir, &[LABELS_FILE, DEPLOYED_LABELS_FILE]) {
        LabelTable::load(&path)?
    } else if let Some(cfg) = config.as_ref().filter(|c| !c.labels.is_empty()) {
        LabelTable::new(cfg.labels.iter().cloned())
    } else {
        return Err(ConfigError::Io {
            path: dir.join(LABELS_FILE),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "label table missing"),
        });
    };

    let sequence_path = dir.join(SEQUENCE_MODEL_FILE);
    let fallback_path = dir.join(FALLBACK_MODEL_FILE);

    if sequence_path.exists() && !cfg!(feature = "onnx") {
        warn!(path = %sequence_path.display(), "Sequence model present but ONNX support is not compiled in");
    }

    let (model, source): (Arc<dyn SequenceModel>, PathBuf) = if sequence_path.exists() && cfg!(feature = "onnx") {
        let output = config.as_ref().map(|c| c.output).unwrap_or_default();
        // The graph must agree with the label table; config agreement is checked below
        let width = labels.len();
        (open_sequence_model(&sequence_path, width, output)?, sequence_path)
    } else if fallback_path.exists() {
        let mlp: Arc<dyn SequenceModel> = Arc::new(MlpModel::load(&fallback_path)?);
        (mlp, fallback_path)
    } else {
        return Err(ConfigError::ModelMissing(dir.to_path_buf()));
    };

    labels.ensure_matches(model.as_ref())?;
    if let Some(cfg) = &config {
        if cfg.num_classes != model.output_width() {
            return Err(ConfigError::LabelMismatch {
                labels: cfg.num_classes,
                outputs: model.output_width(),
            });
        }
    }

    info!(
        model = model.name(),
        layout = ?model.layout(),
        classes = labels.len(),
        source = %source.display(),
        "Model loaded"
    );

    Ok(LoadedModel {
        model,
        labels,
        source,
    })
}

#[cfg(feature = "onnx")]
fn open_sequence_model(path: &Path, width: usize, output: OutputKind) -> Result<Arc<dyn SequenceModel>, ConfigError> {
    let model = crate::onnx::OnnxSequenceModel::from_file(path, width, output)?;
    Ok(Arc::new(model))
}

#[cfg(not(feature = "onnx"))]
fn open_sequence_model(_path: &Path, _width: usize, _output: OutputKind) -> Result<Arc<dyn SequenceModel>, ConfigError> {
    Err(ConfigError::Backend("built without the `onnx` feature".to_string()))
}

fn first_existing(dir: &Path, names: &[&str]) -> Option<PathBuf> {
    names.iter().map(|name| dir.join(name)).find(|path| path.exists())
}

/// Pick the class count for a model whose graph declares `declared` as the last
/// output dimension. Dynamic dimensions (`None`, or `<= 0` in ONNX) defer to
/// `expected`; a fixed dimension has to agree with it.
pub fn resolve_output_width(declared: Option<i64>, expected: usize) -> Result<usize, ConfigError> {
    match declared {
        Some(dim) if dim > 0 => {
            let dim = dim as usize;
            if dim != expected {
                return Err(ConfigError::LabelMismatch {
                    labels: expected,
                    outputs: dim,
                });
            }
            Ok(dim)
        }
        _ => Ok(expected),
    }
}

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Numerically stable softmax
pub fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index and value of the largest score. Ties go to the lowest index.
pub fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in scores.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best
}
