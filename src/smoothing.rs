// src/smoothing.rs - EMA jitter filter, one accumulator per landmark topology
use crate::landmarks::{FrameLandmarks, Landmark};

/// Blend weight of the newest sample. Hand-tuned, not derived from data.
pub const DEFAULT_ALPHA: f32 = 0.4;

/// Exponential moving average over a variable-length landmark set.
#[derive(Debug, Clone)]
pub struct EmaSmoother {
    alpha: f32,
    previous: Option<Vec<Landmark>>,
}

impl EmaSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            previous: None,
        }
    }

    /// Smooth `new_set` against the stored baseline.
    ///
    /// A missing or empty set drops the baseline so a hand that reappears later
    /// starts fresh. A set whose length differs from the baseline becomes the new
    /// baseline unsmoothed.
    pub fn smooth(&mut self, new_set: Option<&[Landmark]>) -> Option<Vec<Landmark>> {
        let new_set = match new_set {
            Some(set) if !set.is_empty() => set,
            _ => {
                self.previous = None;
                return None;
            }
        };

        let smoothed: Vec<Landmark> = match &self.previous {
            Some(prev) if prev.len() == new_set.len() => new_set
                .iter()
                .zip(prev.iter())
                .map(|(new, old)| new * self.alpha + old * (1.0 - self.alpha))
                .collect(),
            _ => new_set.to_vec(),
        };

        self.previous = Some(smoothed.clone());
        Some(smoothed)
    }

    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }
}

impl Default for EmaSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}

/// Independent smoothers for the left hand, right hand and pose.
#[derive(Debug, Clone, Default)]
pub struct LandmarkSmoother {
    left_hand: EmaSmoother,
    right_hand: EmaSmoother,
    pose: EmaSmoother,
}

impl LandmarkSmoother {
    pub fn new(alpha: f32) -> Self {
        Self {
            left_hand: EmaSmoother::new(alpha),
            right_hand: EmaSmoother::new(alpha),
            pose: EmaSmoother::new(alpha),
        }
    }

    pub fn smooth(&mut self, frame: &FrameLandmarks) -> FrameLandmarks {
        FrameLandmarks {
            left_hand: self.left_hand.smooth(frame.left_hand.as_deref()),
            right_hand: self.right_hand.smooth(frame.right_hand.as_deref()),
            pose: self.pose.smooth(frame.pose.as_deref()),
        }
    }

    pub fn reset(&mut self) {
        self.left_hand.reset();
        self.right_hand.reset();
        self.pose.reset();
    }
}
