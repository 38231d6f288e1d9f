// src/session.rs - one recognition session: smoothing through hold-to-commit
use crate::buffer::SequenceBuffer;
use crate::config::AppConfig;
use crate::error::{ConfigError, ModelError};
use crate::features::extract_features;
use crate::hold::{HoldStateMachine, COOLDOWN_DURATION, HOLD_DURATION};
use crate::inference::{InferenceEngine, Prediction, Schedule, DEFAULT_FRAME_SKIP};
use crate::landmarks::FrameLandmarks;
use crate::model::LoadedModel;
use crate::smoothing::{LandmarkSmoother, DEFAULT_ALPHA};
use crate::stability::{StabilityFilter, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_HISTORY};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub smoothing_alpha: f32,
    pub frame_skip: u32,
    pub min_frame_interval: Duration,
    pub stability_history: usize,
    pub confidence_threshold: f32,
    pub hold_duration: Duration,
    pub cooldown: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_ALPHA,
            frame_skip: DEFAULT_FRAME_SKIP,
            min_frame_interval: Duration::from_millis(33),
            stability_history: DEFAULT_HISTORY,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            hold_duration: HOLD_DURATION,
            cooldown: COOLDOWN_DURATION,
        }
    }
}

impl From<&AppConfig> for SessionConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            smoothing_alpha: config.pipeline.smoothing_alpha,
            frame_skip: config.pipeline.frame_skip,
            min_frame_interval: config.pipeline.min_frame_interval(),
            stability_history: config.stability.history,
            confidence_threshold: config.stability.confidence_threshold,
            hold_duration: config.hold.hold_duration(),
            cooldown: config.hold.cooldown(),
        }
    }
}

/// What a processed frame produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutput {
    #[serde(serialize_with = "serialize_millis")]
    pub timestamp: Duration,
    /// Raw classifier output, only on frames where a result was decoded
    pub prediction: Option<Prediction>,
    /// Debounced label driving the hold machine
    pub stable: Option<String>,
    /// Hold progress, 0..=100
    pub progress: f32,
    pub commit: Option<String>,
}

fn serialize_millis<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

pub struct RecognitionSession {
    id: Uuid,
    config: SessionConfig,
    smoother: LandmarkSmoother,
    buffer: SequenceBuffer,
    engine: InferenceEngine,
    stability: StabilityFilter,
    hold: HoldStateMachine,
    last_tick: Option<Duration>,
    processed: u64,
    commits: u64,
}

impl std::fmt::Debug for RecognitionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionSession")
            .field("id", &self.id)
            .field("engine", &self.engine)
            .field("buffered", &self.buffer.len())
            .field("hold", self.hold.state())
            .field("processed", &self.processed)
            .finish()
    }
}

impl RecognitionSession {
    /// Fails on any configuration mismatch; a session never starts half-configured.
    pub fn new(model: LoadedModel, config: SessionConfig) -> Result<Self, ConfigError> {
        if !(config.smoothing_alpha > 0.0 && config.smoothing_alpha <= 1.0) {
            return Err(ConfigError::invalid(format!(
                "smoothing_alpha must be in (0, 1], got {}",
                config.smoothing_alpha
            )));
        }
        if config.stability_history == 0 {
            return Err(ConfigError::invalid("stability history must be at least 1"));
        }

        let engine = InferenceEngine::new(model.model, model.labels, config.frame_skip)?;
        let id = Uuid::new_v4();
        info!(%id, model = engine.model().name(), frame_skip = config.frame_skip, "Recognition session started");

        Ok(Self {
            id,
            smoother: LandmarkSmoother::new(config.smoothing_alpha),
            buffer: SequenceBuffer::new(),
            engine,
            stability: StabilityFilter::new(config.stability_history, config.confidence_threshold),
            hold: HoldStateMachine::new(config.hold_duration, config.cooldown),
            config,
            last_tick: None,
            processed: 0,
            commits: 0,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn buffer(&self) -> &SequenceBuffer {
        &self.buffer
    }

    pub fn hold(&self) -> &HoldStateMachine {
        &self.hold
    }

    pub fn processed_frames(&self) -> u64 {
        self.processed
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn last_stable(&self) -> Option<String> {
        self.stability.last_stable().map(str::to_string)
    }

    /// Run one frame through the whole pipeline, calling the model inline.
    /// Returns `None` when the tick is throttled.
    pub fn process_frame(&mut self, frame: &FrameLandmarks, now: Duration) -> Option<FrameOutput> {
        if !self.accept(now) {
            return None;
        }

        let (prediction, stable) = match self.advance(frame) {
            Schedule::Skip => (None, self.last_stable()),
            Schedule::WarmingUp => (None, None),
            Schedule::Run(input) => {
                let prediction = self.engine.infer(&input);
                let stable = self.resolve(prediction.as_ref());
                (prediction, stable)
            }
        };

        Some(self.finish(prediction, stable, now))
    }

    /// Throttle check. Records `now` as the last tick when accepted.
    pub fn accept(&mut self, now: Duration) -> bool {
        if let Some(last) = self.last_tick {
            if now.saturating_sub(last) < self.config.min_frame_interval || now < last {
                return false;
            }
        }
        self.last_tick = Some(now);
        true
    }

    /// Smooth, extract and buffer the frame, then decide whether the model runs.
    /// Frames are buffered whether or not inference follows.
    pub fn advance(&mut self, frame: &FrameLandmarks) -> Schedule {
        self.processed += 1;
        let smoothed = self.smoother.smooth(frame);
        if !smoothed.has_hands() {
            self.stability.forget_stable();
        }

        self.buffer.push(extract_features(&smoothed));
        self.engine.schedule(&self.buffer)
    }

    /// Decode a raw model result produced off the session's thread
    pub fn decode(&mut self, result: Result<Vec<f32>, ModelError>) -> Option<Prediction> {
        self.engine.decode(result)
    }

    /// Feed a decoded prediction through the stability filter. A missing
    /// prediction clears the cached stable label as well.
    pub fn resolve(&mut self, prediction: Option<&Prediction>) -> Option<String> {
        let Some(prediction) = prediction else {
            self.stability.forget_stable();
            return None;
        };
        self.stability.filter(&prediction.label, prediction.confidence)
    }

    /// Advance the hold machine with this tick's stable label
    pub fn finish(&mut self, prediction: Option<Prediction>, stable: Option<String>, now: Duration) -> FrameOutput {
        let update = self.hold.update(stable.as_deref(), now);
        if update.commit.is_some() {
            self.commits += 1;
            self.stability.clear();
        }

        FrameOutput {
            timestamp: now,
            prediction,
            stable,
            progress: update.progress,
            commit: update.commit,
        }
    }

    /// Drop prediction state but keep smoothing baselines
    pub fn clear(&mut self) {
        debug!(id = %self.id, "Clearing prediction state");
        self.buffer.clear();
        self.engine.reset();
        self.stability.clear();
        self.hold.reset();
        self.last_tick = None;
    }

    pub fn reset(&mut self) {
        self.clear();
        self.smoother.reset();
    }
}
