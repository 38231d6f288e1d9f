// src/landmarks.rs
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One tracked point in normalized camera space. `z` is relative depth.
pub type Landmark = Vector3<f32>;

/// Landmarks per hand, wrist first.
pub const HAND_LANDMARKS: usize = 21;

// MediaPipe pose indices
pub const NOSE: usize = 0;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;

/// Hand and pose landmarks for one video frame, already assigned to the
/// left/right feature slots. Any part may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameLandmarks {
    #[serde(default)]
    pub left_hand: Option<Vec<Landmark>>,
    #[serde(default)]
    pub right_hand: Option<Vec<Landmark>>,
    #[serde(default)]
    pub pose: Option<Vec<Landmark>>,
}

impl FrameLandmarks {
    pub fn new(
        left_hand: Option<Vec<Landmark>>,
        right_hand: Option<Vec<Landmark>>,
        pose: Option<Vec<Landmark>>,
    ) -> Self {
        Self {
            left_hand,
            right_hand,
            pose,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// True when at least one hand carries landmarks.
    pub fn has_hands(&self) -> bool {
        let present = |hand: &Option<Vec<Landmark>>| hand.as_ref().map_or(false, |h| !h.is_empty());
        present(&self.left_hand) || present(&self.right_hand)
    }
}

/// Build a landmark list from raw `[x, y, z]` triples.
pub fn from_triples(points: &[[f32; 3]]) -> Vec<Landmark> {
    points.iter().map(|p| Vector3::new(p[0], p[1], p[2])).collect()
}
