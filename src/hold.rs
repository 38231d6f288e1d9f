// src/hold.rs - hold-to-commit state machine
use serde::Serialize;
use std::time::Duration;
use tracing::info;

pub const HOLD_DURATION: Duration = Duration::from_millis(1200);
pub const COOLDOWN_DURATION: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldState {
    Idle,
    Holding { label: String, started_at: Duration },
    Cooldown { until: Duration },
}

/// Result of one tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldUpdate {
    /// 0..=100
    pub progress: f32,
    pub commit: Option<String>,
}

impl HoldUpdate {
    fn idle() -> Self {
        Self {
            progress: 0.0,
            commit: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HoldStateMachine {
    state: HoldState,
    hold_duration: Duration,
    cooldown: Duration,
}

impl HoldStateMachine {
    pub fn new(hold_duration: Duration, cooldown: Duration) -> Self {
        Self {
            state: HoldState::Idle,
            hold_duration,
            cooldown,
        }
    }

    pub fn state(&self) -> &HoldState {
        &self.state
    }

    /// Advance with this tick's stable label. `now` is the caller's clock; the
    /// machine never reads wall time itself.
    pub fn update(&mut self, stable: Option<&str>, now: Duration) -> HoldUpdate {
        if let HoldState::Cooldown { until } = self.state {
            if now < until {
                return HoldUpdate::idle();
            }
            self.state = HoldState::Idle;
        }

        let Some(label) = stable else {
            self.state = HoldState::Idle;
            return HoldUpdate::idle();
        };

        let continuing = match &self.state {
            HoldState::Holding { label: held, started_at } if held == label => Some(*started_at),
            _ => None,
        };
        let Some(started_at) = continuing else {
            self.state = HoldState::Holding {
                label: label.to_string(),
                started_at: now,
            };
            return HoldUpdate::idle();
        };

        let elapsed = now.saturating_sub(started_at);
        if elapsed >= self.hold_duration {
            info!(label, held_ms = elapsed.as_millis() as u64, "Sign committed");
            self.state = HoldState::Cooldown {
                until: now + self.cooldown,
            };
            return HoldUpdate {
                progress: 0.0,
                commit: Some(label.to_string()),
            };
        }

        let progress = (elapsed.as_secs_f32() / self.hold_duration.as_secs_f32() * 100.0).min(100.0);
        HoldUpdate {
            progress,
            commit: None,
        }
    }

    pub fn reset(&mut self) {
        self.state = HoldState::Idle;
    }
}

impl Default for HoldStateMachine {
    fn default() -> Self {
        Self::new(HOLD_DURATION, COOLDOWN_DURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_hold_commit_cooldown_scenario() {
        let mut hold = HoldStateMachine::default();

        let update = hold.update(Some("A"), ms(0));
        assert_eq!(update.progress, 0.0);
        assert_eq!(
            hold.state(),
            &HoldState::Holding {
                label: "A".into(),
                started_at: ms(0)
            }
        );

        let update = hold.update(Some("A"), ms(600));
        assert_relative_eq!(update.progress, 50.0, epsilon = 1e-3);
        assert!(update.commit.is_none());

        let update = hold.update(Some("A"), ms(1250));
        assert_eq!(update.commit.as_deref(), Some("A"));
        assert_eq!(update.progress, 0.0);
        assert_eq!(hold.state(), &HoldState::Cooldown { until: ms(2050) });

        let update = hold.update(Some("A"), ms(1800));
        assert!(update.commit.is_none());
        assert_eq!(update.progress, 0.0);
        assert_eq!(hold.state(), &HoldState::Cooldown { until: ms(2050) });

        let update = hold.update(Some("A"), ms(2100));
        assert!(update.commit.is_none());
        assert_eq!(update.progress, 0.0);
        assert_eq!(
            hold.state(),
            &HoldState::Holding {
                label: "A".into(),
                started_at: ms(2100)
            }
        );
    }

    #[test]
    fn test_no_label_returns_to_idle() {
        let mut hold = HoldStateMachine::default();
        hold.update(Some("A"), ms(0));
        let update = hold.update(None, ms(500));

        assert_eq!(update.progress, 0.0);
        assert_eq!(hold.state(), &HoldState::Idle);

        // Restarting the hold does not inherit the earlier start
        hold.update(Some("A"), ms(600));
        let update = hold.update(Some("A"), ms(1200));
        assert_relative_eq!(update.progress, 50.0, epsilon = 1e-3);
    }

    #[test]
    fn test_label_change_restarts_hold() {
        let mut hold = HoldStateMachine::default();
        hold.update(Some("A"), ms(0));
        hold.update(Some("A"), ms(1000));

        let update = hold.update(Some("B"), ms(1100));
        assert_eq!(update.progress, 0.0);
        assert!(update.commit.is_none());
        assert_eq!(
            hold.state(),
            &HoldState::Holding {
                label: "B".into(),
                started_at: ms(1100)
            }
        );
    }

    #[test]
    fn test_commit_exactly_at_threshold() {
        let mut hold = HoldStateMachine::default();
        hold.update(Some("C"), ms(100));
        let update = hold.update(Some("C"), ms(1300));
        assert_eq!(update.commit.as_deref(), Some("C"));
    }

    #[test]
    fn test_cooldown_ignores_labels_until_expiry() {
        let mut hold = HoldStateMachine::default();
        hold.update(Some("A"), ms(0));
        hold.update(Some("A"), ms(1200));

        // Different label during cooldown is ignored
        hold.update(Some("B"), ms(1500));
        assert_eq!(hold.state(), &HoldState::Cooldown { until: ms(2000) });

        // Expiry falls through to normal evaluation on the same tick
        hold.update(None, ms(2000));
        assert_eq!(hold.state(), &HoldState::Idle);
    }
}
