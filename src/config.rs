// src/config.rs - recognizer settings, JSON file with defaults for every field
use crate::error::ConfigError;
use crate::hold::{COOLDOWN_DURATION, HOLD_DURATION};
use crate::inference::DEFAULT_FRAME_SKIP;
use crate::model::read_json;
use crate::smoothing::DEFAULT_ALPHA;
use crate::stability::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_HISTORY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub stability: StabilityConfig,
    #[serde(default)]
    pub hold: HoldConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub smoothing_alpha: f32,
    /// Model runs on every Nth processed frame
    pub frame_skip: u32,
    /// Ticks closer together than this are dropped (~30 fps)
    pub min_frame_interval_ms: u64,
    /// Front camera feeds are mirrored; swaps tracker handedness
    pub mirrored: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    pub history: usize,
    pub confidence_threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    pub hold_duration_ms: u64,
    pub cooldown_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub model_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_ALPHA,
            frame_skip: DEFAULT_FRAME_SKIP,
            min_frame_interval_ms: 33,
            mirrored: true,
        }
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            history: DEFAULT_HISTORY,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            hold_duration_ms: HOLD_DURATION.as_millis() as u64,
            cooldown_ms: COOLDOWN_DURATION.as_millis() as u64,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let base = directories::UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(|p| p.join("SignStream")))
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            model_dir: base.join("models"),
            output_dir: base.join("sessions"),
        }
    }
}

impl PipelineConfig {
    pub fn min_frame_interval(&self) -> Duration {
        Duration::from_millis(self.min_frame_interval_ms)
    }
}

impl HoldConfig {
    pub fn hold_duration(&self) -> Duration {
        Duration::from_millis(self.hold_duration_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = read_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let alpha = self.pipeline.smoothing_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::invalid(format!("smoothing_alpha must be in (0, 1], got {}", alpha)));
        }
        if self.pipeline.frame_skip == 0 {
            return Err(ConfigError::invalid("frame_skip must be at least 1"));
        }
        if self.stability.history == 0 {
            return Err(ConfigError::invalid("stability history must be at least 1"));
        }
        let threshold = self.stability.confidence_threshold;
        if !(0.0..1.0).contains(&threshold) {
            return Err(ConfigError::invalid(format!(
                "confidence_threshold must be in [0, 1), got {}",
                threshold
            )));
        }
        if self.hold.hold_duration_ms == 0 {
            return Err(ConfigError::invalid("hold_duration_ms must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_pipeline_constants() {
        let config = AppConfig::default();
        assert_eq!(config.pipeline.smoothing_alpha, 0.4);
        assert_eq!(config.pipeline.frame_skip, 2);
        assert_eq!(config.stability.history, 5);
        assert_eq!(config.stability.confidence_threshold, 0.7);
        assert_eq!(config.hold.hold_duration(), Duration::from_millis(1200));
        assert_eq!(config.hold.cooldown(), Duration::from_millis(800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"pipeline": {"frame_skip": 3}, "hold": {"cooldown_ms": 500}}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.pipeline.frame_skip, 3);
        assert_eq!(config.pipeline.smoothing_alpha, 0.4);
        assert_eq!(config.hold.cooldown_ms, 500);
        assert_eq!(config.hold.hold_duration_ms, 1200);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = AppConfig::default();
        config.pipeline.frame_skip = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.pipeline.smoothing_alpha = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.stability.confidence_threshold = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unparseable_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse { .. })));
    }
}
