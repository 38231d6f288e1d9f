// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Problems that stop a session from starting. These are never raised per frame.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("model file not found in {0}")]
    ModelMissing(PathBuf),

    #[error("label table has {labels} entries but the model outputs {outputs} classes")]
    LabelMismatch { labels: usize, outputs: usize },

    #[error("model expects sequence length {actual}, pipeline produces {expected}")]
    SequenceLength { expected: usize, actual: usize },

    #[error("model expects {actual} features per frame, pipeline produces {expected}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("invalid setting: {0}")]
    Invalid(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("model backend unavailable: {0}")]
    Backend(String),
}

impl ConfigError {
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        ConfigError::Invalid(msg.into())
    }
}

/// Failures while running the classifier on one frame. The engine downgrades
/// these to "no prediction".
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("input shape {actual:?} does not match model input {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("model returned {actual} scores, expected {expected}")]
    OutputWidth { expected: usize, actual: usize },

    #[error("model returned non-finite scores")]
    NonFinite,

    #[error("inference failed: {0}")]
    Execution(String),
}

impl ModelError {
    pub fn execution<S: Into<String>>(msg: S) -> Self {
        ModelError::Execution(msg.into())
    }
}
