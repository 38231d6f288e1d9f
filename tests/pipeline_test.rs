// tests/pipeline_test.rs - end-to-end runs through the public API
use sign_stream::data::SessionRecorder;
use sign_stream::error::ModelError;
use sign_stream::model::{load_model, InputLayout, InputTensor, LabelTable, LoadedModel, OutputKind, SequenceModel};
use sign_stream::runner::SessionRunner;
use sign_stream::session::{FrameOutput, RecognitionSession, SessionConfig};
use sign_stream::tracking::{read_recording, write_recording, DetectedHand, Handedness, TrackerFrame};
use sign_stream::FrameLandmarks;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

struct ConstantModel(Vec<f32>);

impl SequenceModel for ConstantModel {
    fn name(&self) -> &str {
        "constant"
    }

    fn layout(&self) -> InputLayout {
        InputLayout::Sequence
    }

    fn output_width(&self) -> usize {
        self.0.len()
    }

    fn output_kind(&self) -> OutputKind {
        OutputKind::Probabilities
    }

    fn run(&self, _input: &InputTensor) -> Result<Vec<f32>, ModelError> {
        Ok(self.0.clone())
    }
}

fn constant_model() -> LoadedModel {
    LoadedModel {
        model: Arc::new(ConstantModel(vec![0.04, 0.96])),
        labels: LabelTable::new(["hello", "x"]),
        source: PathBuf::from("memory"),
    }
}

fn tracker_frame(ms: u64) -> TrackerFrame {
    let landmarks = (0..21).map(|i| [0.4 + 0.01 * i as f32, 0.6 - 0.005 * i as f32, -0.02]).collect();
    TrackerFrame {
        timestamp_ms: ms,
        hands: vec![DetectedHand {
            handedness: Handedness::Left,
            landmarks,
        }],
        pose: Some(vec![[0.5, 0.3, 0.0]; 33]),
    }
}

fn hand_frames(count: u64) -> Vec<FrameLandmarks> {
    (0..count).map(|i| tracker_frame(i * 40).into_landmarks(true)).collect()
}

/// The parts of an output that do not depend on the absolute clock
fn shape(outputs: &[FrameOutput]) -> Vec<(Option<String>, u32, Option<String>)> {
    outputs
        .iter()
        .map(|o| (o.stable.clone(), (o.progress * 1000.0).round() as u32, o.commit.clone()))
        .collect()
}

#[test]
fn test_clear_after_commit_matches_fresh_session() {
    let frames = hand_frames(120);
    let tick = |i: usize| Duration::from_millis(i as u64 * 40);

    let mut fresh = RecognitionSession::new(constant_model(), SessionConfig::default()).unwrap();
    let fresh_outputs: Vec<FrameOutput> = frames
        .iter()
        .enumerate()
        .filter_map(|(i, f)| fresh.process_frame(f, tick(i)))
        .collect();
    assert!(fresh_outputs.iter().any(|o| o.commit.as_deref() == Some("X")));

    // Run a second session until its first commit, clear, then replay from a later epoch
    let mut reused = RecognitionSession::new(constant_model(), SessionConfig::default()).unwrap();
    let mut i = 0;
    loop {
        let output = reused.process_frame(&frames[i], tick(i)).unwrap();
        i += 1;
        if output.commit.is_some() {
            break;
        }
    }
    reused.clear();

    let offset = tick(i) + Duration::from_millis(5000);
    let replay_outputs: Vec<FrameOutput> = frames
        .iter()
        .enumerate()
        .filter_map(|(i, f)| reused.process_frame(f, offset + tick(i)))
        .collect();

    assert_eq!(shape(&fresh_outputs), shape(&replay_outputs));
}

#[test]
fn test_hold_never_commits_twice_without_release_or_cooldown() {
    let frames = hand_frames(200);
    let mut session = RecognitionSession::new(constant_model(), SessionConfig::default()).unwrap();
    let commits: Vec<Duration> = frames
        .iter()
        .enumerate()
        .filter_map(|(i, f)| session.process_frame(f, Duration::from_millis(i as u64 * 40)))
        .filter(|o| o.commit.is_some())
        .map(|o| o.timestamp)
        .collect();

    assert!(commits.len() >= 2);
    for pair in commits.windows(2) {
        // Cooldown plus a fresh hold must separate consecutive commits
        assert!(pair[1] - pair[0] >= Duration::from_millis(2000));
    }
}

fn write_mlp_model_dir(dir: &Path) {
    fs::write(dir.join("labels.json"), r#"["a", "b"]"#).unwrap();
    fs::write(
        dir.join("model_config.json"),
        r#"{"sequence_length": 30, "num_features": 159, "num_classes": 2, "labels": ["a", "b"], "output": "logits"}"#,
    )
    .unwrap();

    let zeros = vec![0.0_f32; 159];
    let model = serde_json::json!({
        "name": "bias-only",
        "layers": [{ "weights": [zeros.clone(), zeros], "bias": [0.0, 5.0], "activation": "linear" }],
        "output": "logits"
    });
    fs::write(dir.join("mlp_model.json"), model.to_string()).unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_recording_through_runner_and_export() {
    let model_dir = tempdir().unwrap();
    write_mlp_model_dir(model_dir.path());
    let model = load_model(model_dir.path()).unwrap();
    assert_eq!(model.model.layout(), InputLayout::SingleFrame);

    let work = tempdir().unwrap();
    let recording_path = work.path().join("stream.jsonl");
    let recording: Vec<TrackerFrame> = (0..150).map(|i| tracker_frame(i * 40)).collect();
    write_recording(&recording_path, &recording).unwrap();
    let frames = read_recording(&recording_path).unwrap();

    // The synchronous path applies every inference on its own frame
    let sync_model = load_model(model_dir.path()).unwrap();
    let mut sync_session = RecognitionSession::new(sync_model, SessionConfig::default()).unwrap();
    let sync_commits: Vec<String> = frames
        .iter()
        .filter_map(|f| sync_session.process_frame(&f.clone().into_landmarks(true), f.timestamp()))
        .filter_map(|o| o.commit)
        .collect();
    assert_eq!(sync_commits.first().map(String::as_str), Some("B"));

    let session = RecognitionSession::new(model, SessionConfig::default()).unwrap();
    let mut recorder = SessionRecorder::new(work.path(), Some("replay".into()), session.id(), "bias-only");
    let mut handle = SessionRunner::new(session).spawn();

    for frame in frames {
        let timestamp = frame.timestamp();
        handle.send_frame(frame.into_landmarks(true), timestamp).await.unwrap();
        if let Some(output) = handle.next_event().await {
            recorder.add_frame(output);
        }
    }
    let (remaining, stats) = handle.finish().await;
    assert!(remaining.is_empty());
    assert_eq!(stats.frames, 150);

    // Async completion can shift commits later but never changes the label
    assert_eq!(recorder.frame_count(), 150);
    assert!(recorder.transcript().text().chars().all(|c| c == 'B'));
    assert_eq!(stats.commits as usize, recorder.transcript().commits().len());

    let session_dir = recorder.export().unwrap();
    assert!(session_dir.join("frames.csv").exists());
    assert!(session_dir.join("summary.json").exists());
}

#[test]
fn test_mismatched_labels_refuse_to_load() {
    let model_dir = tempdir().unwrap();
    write_mlp_model_dir(model_dir.path());
    fs::write(model_dir.path().join("labels.json"), r#"["a", "b", "c"]"#).unwrap();

    assert!(load_model(model_dir.path()).is_err());
}
