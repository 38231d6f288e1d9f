// src/transcript.rs - build a sentence from committed signs
use serde::Serialize;

/// Labels with an editing meaning rather than text
const SPACE: &str = "SPACE";
const DELETE: [&str; 2] = ["DEL", "BACKSPACE"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Transcript {
    text: String,
    commits: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: &str) {
        let label = label.trim();
        if label.is_empty() {
            return;
        }
        self.commits.push(label.to_string());

        let upper = label.to_uppercase();
        if upper == SPACE {
            self.text.push(' ');
        } else if DELETE.contains(&upper.as_str()) {
            self.text.pop();
        } else if label.chars().count() == 1 {
            self.text.push_str(label);
        } else {
            // Whole-word gestures stand on their own
            if !self.text.is_empty() && !self.text.ends_with(' ') {
                self.text.push(' ');
            }
            self.text.push_str(label);
            self.text.push(' ');
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Every label pushed, editing labels included
    pub fn commits(&self) -> &[String] {
        &self.commits
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.commits.clear();
    }
}
