// src/lib.rs
pub mod buffer;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod hold;
pub mod inference;
pub mod landmarks;
pub mod mlp;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod runner;
pub mod session;
pub mod smoothing;
pub mod stability;
pub mod tracking;
pub mod transcript;

pub use config::AppConfig;
pub use error::{ConfigError, ModelError};
pub use landmarks::{FrameLandmarks, Landmark};
pub use model::{load_model, LoadedModel};
pub use runner::{RunnerStats, SessionHandle, SessionRunner};
pub use session::{FrameOutput, RecognitionSession, SessionConfig};
