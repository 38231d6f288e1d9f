// src/tracking.rs - tracker output at the pipeline boundary and recorded streams
use crate::landmarks::{from_triples, FrameLandmarks};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

/// One hand as the tracker reports it, handedness as seen by the camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedHand {
    pub handedness: Handedness,
    pub landmarks: Vec<[f32; 3]>,
}

/// Raw tracker output for one video frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerFrame {
    pub timestamp_ms: u64,
    #[serde(default)]
    pub hands: Vec<DetectedHand>,
    #[serde(default)]
    pub pose: Option<Vec<[f32; 3]>>,
}

impl TrackerFrame {
    pub fn timestamp(&self) -> Duration {
        Duration::from_millis(self.timestamp_ms)
    }

    /// Assign detected hands to the left/right feature slots.
    ///
    /// A mirrored feed reports the signer's right hand as "Left", so the slots
    /// are swapped. When two hands claim the same side the first one wins.
    pub fn into_landmarks(self, mirrored: bool) -> FrameLandmarks {
        let mut frame = FrameLandmarks {
            pose: self.pose.as_deref().map(from_triples),
            ..FrameLandmarks::default()
        };

        for hand in &self.hands {
            let goes_left = match (hand.handedness, mirrored) {
                (Handedness::Left, false) | (Handedness::Right, true) => true,
                (Handedness::Right, false) | (Handedness::Left, true) => false,
            };
            let slot = if goes_left {
                &mut frame.left_hand
            } else {
                &mut frame.right_hand
            };

            if slot.is_some() {
                debug!(handedness = ?hand.handedness, "Duplicate hand for slot, ignoring");
                continue;
            }
            *slot = Some(from_triples(&hand.landmarks));
        }

        frame
    }
}

/// Read a JSON Lines recording, one `TrackerFrame` per line. Blank lines are skipped.
pub fn read_recording(path: impl AsRef<Path>) -> Result<Vec<TrackerFrame>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open recording {}", path.display()))?;

    let mut frames = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: TrackerFrame = serde_json::from_str(&line)
            .with_context(|| format!("Invalid tracker frame at {}:{}", path.display(), index + 1))?;
        frames.push(frame);
    }

    info!(path = %path.display(), frames = frames.len(), "Recording loaded");
    Ok(frames)
}

pub fn write_recording(path: impl AsRef<Path>, frames: &[TrackerFrame]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for frame in frames {
        serde_json::to_writer(&mut writer, frame)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
