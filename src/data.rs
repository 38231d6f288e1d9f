// src/data.rs
use crate::session::FrameOutput;
use crate::transcript::Transcript;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct FrameRecord {
    frame: usize,
    timestamp_ms: u64,
    raw_label: Option<String>,
    raw_confidence: Option<f32>,
    stable_label: Option<String>,
    progress: f32,
    commit: Option<String>,
}

#[derive(Debug, Serialize)]
struct CommitRecord {
    label: String,
    timestamp_ms: u64,
}

#[derive(Debug, Serialize)]
struct SessionSummary<'a> {
    session_id: String,
    session_name: &'a str,
    started_at: String,
    model: &'a str,
    frames: usize,
    inferred_frames: usize,
    stable_frames: usize,
    commits: Vec<CommitRecord>,
    transcript: &'a str,
}

/// Collects frame outputs for one session and writes them to disk
pub struct SessionRecorder {
    output_dir: PathBuf,
    session_name: String,
    session_id: Uuid,
    started_at: DateTime<Local>,
    model: String,
    frames: Vec<FrameOutput>,
    transcript: Transcript,
}

impl SessionRecorder {
    pub fn new<P: AsRef<Path>>(output_dir: P, session_name: Option<String>, session_id: Uuid, model: &str) -> Self {
        let started_at = Local::now();
        let session_name =
            session_name.unwrap_or_else(|| format!("session_{}", started_at.format("%Y%m%d_%H%M%S")));

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            session_id,
            started_at,
            model: model.to_string(),
            frames: Vec::new(),
            transcript: Transcript::new(),
        }
    }

    pub fn add_frame(&mut self, output: FrameOutput) {
        if let Some(label) = &output.commit {
            self.transcript.push(label);
        }
        self.frames.push(output);
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.session_dir().join("frames.csv");
        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let file = File::create(&csv_path).with_context(|| format!("Failed to create {}", csv_path.display()))?;
        let mut writer = Writer::from_writer(file);

        for (i, output) in self.frames.iter().enumerate() {
            writer.serialize(Self::create_record(i, output))?;
        }

        writer.flush()?;
        Ok(csv_path)
    }

    fn create_record(frame: usize, output: &FrameOutput) -> FrameRecord {
        FrameRecord {
            frame,
            timestamp_ms: output.timestamp.as_millis() as u64,
            raw_label: output.prediction.as_ref().map(|p| p.label.clone()),
            raw_confidence: output.prediction.as_ref().map(|p| p.confidence),
            stable_label: output.stable.clone(),
            progress: output.progress,
            commit: output.commit.clone(),
        }
    }

    pub fn export_summary(&self) -> Result<PathBuf> {
        let summary_path = self.session_dir().join("summary.json");
        if let Some(parent) = summary_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let commits = self
            .frames
            .iter()
            .filter_map(|o| {
                o.commit.as_ref().map(|label| CommitRecord {
                    label: label.clone(),
                    timestamp_ms: o.timestamp.as_millis() as u64,
                })
            })
            .collect();

        let summary = SessionSummary {
            session_id: self.session_id.to_string(),
            session_name: &self.session_name,
            started_at: self.started_at.to_rfc3339(),
            model: &self.model,
            frames: self.frames.len(),
            inferred_frames: self.frames.iter().filter(|o| o.prediction.is_some()).count(),
            stable_frames: self.frames.iter().filter(|o| o.stable.is_some()).count(),
            commits,
            transcript: self.transcript.text(),
        };

        let file = File::create(&summary_path)
            .with_context(|| format!("Failed to create {}", summary_path.display()))?;
        serde_json::to_writer_pretty(file, &summary)?;
        Ok(summary_path)
    }

    /// Write both the frame table and the summary
    pub fn export(&self) -> Result<PathBuf> {
        self.export_csv()?;
        self.export_summary()?;
        Ok(self.session_dir())
    }
}
