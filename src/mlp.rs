// src/mlp.rs - single-frame fallback classifier, pure Rust dense layers
use crate::error::{ConfigError, ModelError};
use crate::features::FEATURE_COUNT;
use crate::model::{read_json, InputLayout, InputTensor, OutputKind, SequenceModel};
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    #[default]
    Linear,
}

#[derive(Debug, Deserialize)]
struct LayerSpec {
    /// `[out][in]`
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
    #[serde(default)]
    activation: Activation,
}

#[derive(Debug, Deserialize)]
struct MlpSpec {
    #[serde(default)]
    name: Option<String>,
    layers: Vec<LayerSpec>,
    #[serde(default)]
    output: OutputKind,
}

/// Fully-connected layer: `y = W x + b`
#[derive(Debug, Clone)]
pub struct DenseLayer {
    weights: DMatrix<f32>,
    bias: DVector<f32>,
    activation: Activation,
}

impl DenseLayer {
    pub fn new(weights: DMatrix<f32>, bias: DVector<f32>, activation: Activation) -> Result<Self, ConfigError> {
        if weights.nrows() != bias.len() {
            return Err(ConfigError::invalid(format!(
                "dense layer has {} rows but {} biases",
                weights.nrows(),
                bias.len()
            )));
        }
        Ok(Self {
            weights,
            bias,
            activation,
        })
    }

    pub fn inputs(&self) -> usize {
        self.weights.ncols()
    }

    pub fn outputs(&self) -> usize {
        self.weights.nrows()
    }

    pub fn forward(&self, x: &DVector<f32>) -> DVector<f32> {
        let mut y = &self.weights * x + &self.bias;
        if self.activation == Activation::Relu {
            y.apply(|v| *v = v.max(0.0));
        }
        y
    }
}

/// Multi-layer perceptron over the newest feature vector
#[derive(Debug, Clone)]
pub struct MlpModel {
    name: String,
    layers: Vec<DenseLayer>,
    output: OutputKind,
}

impl MlpModel {
    pub fn new(name: impl Into<String>, layers: Vec<DenseLayer>, output: OutputKind) -> Result<Self, ConfigError> {
        let first = layers
            .first()
            .ok_or_else(|| ConfigError::invalid("MLP has no layers"))?;
        if first.inputs() != FEATURE_COUNT {
            return Err(ConfigError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: first.inputs(),
            });
        }
        for pair in layers.windows(2) {
            if pair[0].outputs() != pair[1].inputs() {
                return Err(ConfigError::invalid(format!(
                    "layer output {} does not feed next layer input {}",
                    pair[0].outputs(),
                    pair[1].inputs()
                )));
            }
        }

        Ok(Self {
            name: name.into(),
            layers,
            output,
        })
    }

    /// Load weights exported as JSON (`layers[].weights`, `layers[].bias`, `layers[].activation`)
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let spec: MlpSpec = read_json(path.as_ref())?;

        let mut layers = Vec::with_capacity(spec.layers.len());
        for (i, layer) in spec.layers.into_iter().enumerate() {
            let rows = layer.weights.len();
            let cols = layer.weights.first().map_or(0, Vec::len);
            if rows == 0 || cols == 0 || layer.weights.iter().any(|r| r.len() != cols) {
                return Err(ConfigError::invalid(format!("layer {} has a ragged or empty weight matrix", i)));
            }
            let weights = DMatrix::from_row_iterator(rows, cols, layer.weights.into_iter().flatten());
            layers.push(DenseLayer::new(weights, DVector::from_vec(layer.bias), layer.activation)?);
        }

        let name = spec.name.unwrap_or_else(|| "mlp".to_string());
        Self::new(name, layers, spec.output)
    }
}

impl SequenceModel for MlpModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn layout(&self) -> InputLayout {
        InputLayout::SingleFrame
    }

    fn output_width(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::outputs)
    }

    fn output_kind(&self) -> OutputKind {
        self.output
    }

    fn run(&self, input: &InputTensor) -> Result<Vec<f32>, ModelError> {
        let expected = self.layout().shape();
        if input.shape != expected {
            return Err(ModelError::ShapeMismatch {
                expected,
                actual: input.shape.clone(),
            });
        }

        let mut x = DVector::from_column_slice(&input.data);
        for layer in &self.layers {
            x = layer.forward(&x);
        }
        Ok(x.iter().copied().collect())
    }
}
