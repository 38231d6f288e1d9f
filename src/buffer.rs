// src/buffer.rs - sliding window of feature vectors used as model context
use crate::features::{FeatureVector, FEATURE_COUNT};
use std::collections::VecDeque;

/// Number of frames in the classification window
pub const SEQUENCE_LENGTH: usize = 30;

/// Rolling buffer that keeps the last `SEQUENCE_LENGTH` frames in chronological order
#[derive(Debug, Clone)]
pub struct SequenceBuffer {
    frames: VecDeque<FeatureVector>,
    capacity: usize,
}

impl SequenceBuffer {
    pub fn new() -> Self {
        Self::with_capacity(SEQUENCE_LENGTH)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest once the window is over capacity
    pub fn push(&mut self, features: FeatureVector) {
        self.frames.push_back(features);
        while self.frames.len() > self.capacity {
            self.frames.pop_front();
        }
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &FeatureVector> {
        self.frames.iter()
    }

    pub fn latest(&self) -> Option<&FeatureVector> {
        self.frames.back()
    }

    /// Row-major `[frames, FEATURE_COUNT]` copy of the window
    pub fn to_flat(&self) -> Vec<f32> {
        let mut flat = Vec::with_capacity(self.frames.len() * FEATURE_COUNT);
        for frame in &self.frames {
            flat.extend_from_slice(frame);
        }
        flat
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl Default for SequenceBuffer {
    fn default() -> Self {
        Self::new()
    }
}
