// src/runner.rs - drive a session from a frame channel, inference off the async threads
use crate::error::ModelError;
use crate::inference::{Prediction, Schedule};
use crate::landmarks::FrameLandmarks;
use crate::session::{FrameOutput, RecognitionSession};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Frame queue depth; outputs are unbounded so the loop never waits on a slow consumer
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum RunnerInput {
    Frame { frame: FrameLandmarks, timestamp: Duration },
    /// Drop prediction state, keep smoothing
    Clear,
    Reset,
}

type PendingInference = JoinHandle<Result<Vec<f32>, ModelError>>;

/// Counters reported when the runner stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStats {
    pub frames: u64,
    pub commits: u64,
    /// Inference ticks skipped because a previous request was still running
    pub dropped_inferences: u64,
}

/// Owns the session inside the runner task
pub struct SessionRunner {
    session: RecognitionSession,
    pending: Option<PendingInference>,
    dropped_inferences: u64,
}

/// Caller side of a running session
pub struct SessionHandle {
    frames: mpsc::Sender<RunnerInput>,
    events: mpsc::UnboundedReceiver<FrameOutput>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<RunnerStats>,
}

impl SessionRunner {
    pub fn new(session: RecognitionSession) -> Self {
        Self {
            session,
            pending: None,
            dropped_inferences: 0,
        }
    }

    /// Spawn the runner loop on the current tokio runtime
    pub fn spawn(self) -> SessionHandle {
        let (frame_tx, frame_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(self.run(frame_rx, event_tx, shutdown_rx));

        SessionHandle {
            frames: frame_tx,
            events: event_rx,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn run(
        mut self,
        mut frames: mpsc::Receiver<RunnerInput>,
        events: mpsc::UnboundedSender<FrameOutput>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> RunnerStats {
        let id = self.session.id();
        info!(%id, "Session runner started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(%id, "Session runner shutdown requested");
                    break;
                }
                input = frames.recv() => {
                    let Some(input) = input else {
                        debug!(%id, "Frame channel closed");
                        break;
                    };
                    match input {
                        RunnerInput::Frame { frame, timestamp } => {
                            if let Some(output) = self.on_frame(&frame, timestamp).await {
                                if events.send(output).is_err() {
                                    debug!(%id, "Event receiver dropped");
                                    break;
                                }
                            }
                        }
                        RunnerInput::Clear => {
                            self.abandon_pending();
                            self.session.clear();
                        }
                        RunnerInput::Reset => {
                            self.abandon_pending();
                            self.session.reset();
                        }
                    }
                }
            }
        }

        self.abandon_pending();
        let stats = RunnerStats {
            frames: self.session.processed_frames(),
            commits: self.session.commits(),
            dropped_inferences: self.dropped_inferences,
        };
        info!(
            %id,
            frames = stats.frames,
            commits = stats.commits,
            dropped_inferences = stats.dropped_inferences,
            "Session runner stopped"
        );
        stats
    }

    async fn on_frame(&mut self, frame: &FrameLandmarks, now: Duration) -> Option<FrameOutput> {
        if !self.session.accept(now) {
            return None;
        }

        let schedule = self.session.advance(frame);
        let completed = self.take_completed().await;

        let warming_up = matches!(schedule, Schedule::WarmingUp);
        if let Schedule::Run(input) = schedule {
            if self.pending.is_some() {
                self.dropped_inferences += 1;
                debug!("Inference still in flight, reusing last stable prediction");
            } else {
                let model = self.session.engine().model();
                self.pending = Some(tokio::task::spawn_blocking(move || model.run(&input)));
            }
        }

        let (prediction, stable) = match completed {
            Some((prediction, stable)) => (prediction, stable),
            None if warming_up => (None, None),
            None => (None, self.session.last_stable()),
        };

        Some(self.session.finish(prediction, stable, now))
    }

    /// Apply a finished inference, if any, to the stability filter
    async fn take_completed(&mut self) -> Option<(Option<Prediction>, Option<String>)> {
        if !self.pending.as_ref().map_or(false, |h| h.is_finished()) {
            return None;
        }
        let handle = self.pending.take()?;

        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(ModelError::execution(format!("inference task failed: {}", e))),
        };
        let prediction = self.session.decode(result);
        let stable = self.session.resolve(prediction.as_ref());
        Some((prediction, stable))
    }

    fn abandon_pending(&mut self) {
        if self.pending.take().is_some() {
            debug!("Abandoning in-flight inference");
        }
    }
}

impl SessionHandle {
    /// Queue a frame. Fails once the runner has stopped.
    pub async fn send_frame(&self, frame: FrameLandmarks, timestamp: Duration) -> anyhow::Result<()> {
        self.frames
            .send(RunnerInput::Frame { frame, timestamp })
            .await
            .map_err(|_| anyhow::anyhow!("session runner has stopped"))
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        self.frames
            .send(RunnerInput::Clear)
            .await
            .map_err(|_| anyhow::anyhow!("session runner has stopped"))
    }

    pub async fn reset(&self) -> anyhow::Result<()> {
        self.frames
            .send(RunnerInput::Reset)
            .await
            .map_err(|_| anyhow::anyhow!("session runner has stopped"))
    }

    /// Next frame output; `None` after the runner stops
    pub async fn next_event(&mut self) -> Option<FrameOutput> {
        self.events.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<FrameOutput> {
        self.events.try_recv().ok()
    }

    /// Stop sending frames and collect every remaining output
    pub async fn finish(self) -> (Vec<FrameOutput>, RunnerStats) {
        let SessionHandle {
            frames,
            mut events,
            shutdown,
            task,
        } = self;
        drop(frames);

        let mut remaining = Vec::new();
        while let Some(output) = events.recv().await {
            remaining.push(output);
        }
        drop(shutdown);
        let stats = task.await.unwrap_or_else(|e| {
            warn!(error = %e, "Session runner task ended abnormally");
            RunnerStats::default()
        });
        (remaining, stats)
    }

    /// Stop immediately. Queued frames and any in-flight inference are discarded.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.events.close();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Session runner task ended abnormally");
        }
    }
}
