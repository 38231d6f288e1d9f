// src/stability.rs - debounce inference output across consecutive inferred frames
use std::collections::VecDeque;

pub const DEFAULT_HISTORY: usize = 5;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;

/// A label only becomes stable after `history` identical raw predictions in a
/// row, the last of which is confident enough.
#[derive(Debug, Clone)]
pub struct StabilityFilter {
    history: VecDeque<String>,
    capacity: usize,
    confidence_threshold: f32,
    last_stable: Option<String>,
}

impl StabilityFilter {
    pub fn new(capacity: usize, confidence_threshold: f32) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity + 1),
            capacity,
            confidence_threshold,
            last_stable: None,
        }
    }

    /// Record one raw prediction and return the uppercased label if it is stable.
    pub fn filter(&mut self, raw_label: &str, raw_confidence: f32) -> Option<String> {
        self.history.push_back(raw_label.to_string());
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        let unanimous = self.history.len() >= self.capacity && self.history.iter().all(|label| label == raw_label);
        if unanimous && raw_confidence > self.confidence_threshold {
            let stable = raw_label.to_uppercase();
            self.last_stable = Some(stable.clone());
            Some(stable)
        } else {
            // An unstable result ends the detection; skip frames must not revive it
            self.last_stable = None;
            None
        }
    }

    /// Stable label from the most recent inference, reused on frames where the
    /// model does not run. `None` once an inference came back unstable.
    pub fn last_stable(&self) -> Option<&str> {
        self.last_stable.as_deref()
    }

    /// Forget the cached stable label but keep the history
    pub fn forget_stable(&mut self) {
        self.last_stable = None;
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.last_stable = None;
    }
}

impl Default for StabilityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY, DEFAULT_CONFIDENCE_THRESHOLD)
    }
}
