// src/engine.rs - Temporal debouncing: rate-limited volume steps and hold-to-fire triggers
use std::time::Duration;

use crate::gesture::GestureClass;

/// Minimum spacing between two applied volume steps.
pub const VOL_DELAY: Duration = Duration::from_millis(300);
/// How long a discrete gesture must be held before it fires.
pub const HOLD_TIME: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDirection {
    Up,
    Down,
}

/// An action emitted by the engine, at most one per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    VolumeStep(VolumeDirection),
    MediaTrigger(GestureClass),
}

/// Status line rendered over the video feed each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    NoHand,
    Waiting,
    VolumeUp,
    VolumeDown,
    Hold(GestureClass),
    Action(GestureClass),
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::NoHand => write!(f, "No Hand Detected"),
            Status::Waiting => write!(f, "Waiting for Gesture..."),
            Status::VolumeUp => write!(f, "Volume UP"),
            Status::VolumeDown => write!(f, "Volume DOWN"),
            Status::Hold(GestureClass::PlayPause) => write!(f, "Hold: Play / Pause"),
            Status::Hold(GestureClass::Next) => write!(f, "Hold: Next Track"),
            Status::Hold(GestureClass::Previous) => write!(f, "Hold: Previous Track"),
            Status::Hold(g) => write!(f, "Hold: {}", g.action_name()),
            Status::Action(g) => write!(f, "Action: {}", g.action_name()),
        }
    }
}

/// One frame's outcome: the action to dispatch (if any) and the overlay status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Option<Action>,
    pub status: Status,
}

/// Hold-to-fire state for discrete gestures. `Fired` stays latched until the
/// resolved gesture leaves `g`, which is what guarantees one trigger per
/// contiguous hold episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HoldPhase {
    Idle,
    Holding { gesture: GestureClass, since: Duration },
    Fired { gesture: GestureClass },
}

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub vol_delay: Duration,
    pub hold_time: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vol_delay: VOL_DELAY,
            hold_time: HOLD_TIME,
        }
    }
}

/// The only component carrying state across frames. Timestamps are supplied
/// by the caller (monotonic, arbitrary origin) so the engine runs the same
/// against the wall clock or a synthetic one.
pub struct GestureEngine {
    config: EngineConfig,
    hold: HoldPhase,
    last_volume_step: Option<Duration>,
}

impl GestureEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            hold: HoldPhase::Idle,
            last_volume_step: None,
        }
    }

    /// Feed one frame's resolved gesture. Zero-hand frames must be fed as
    /// `GestureClass::None` so an interrupted hold resets.
    pub fn process(&mut self, gesture: GestureClass, now: Duration) -> Decision {
        match gesture {
            GestureClass::VolumeUp | GestureClass::VolumeDown => {
                self.hold = HoldPhase::Idle;
                let direction = if gesture == GestureClass::VolumeUp {
                    VolumeDirection::Up
                } else {
                    VolumeDirection::Down
                };
                let due = self
                    .last_volume_step
                    .map_or(true, |last| now.saturating_sub(last) > self.config.vol_delay);
                let action = if due {
                    self.last_volume_step = Some(now);
                    Some(Action::VolumeStep(direction))
                } else {
                    None
                };
                let status = if direction == VolumeDirection::Up {
                    Status::VolumeUp
                } else {
                    Status::VolumeDown
                };
                Decision { action, status }
            }
            GestureClass::PlayPause | GestureClass::Next | GestureClass::Previous => {
                match self.hold {
                    HoldPhase::Holding { gesture: held, since } if held == gesture => {
                        if now.saturating_sub(since) >= self.config.hold_time {
                            self.hold = HoldPhase::Fired { gesture };
                            Decision {
                                action: Some(Action::MediaTrigger(gesture)),
                                status: Status::Action(gesture),
                            }
                        } else {
                            Decision {
                                action: None,
                                status: Status::Hold(gesture),
                            }
                        }
                    }
                    HoldPhase::Fired { gesture: held } if held == gesture => Decision {
                        action: None,
                        status: Status::Hold(gesture),
                    },
                    // First appearance, or a switch from a different
                    // discrete gesture: the timer restarts from this frame.
                    _ => {
                        self.hold = HoldPhase::Holding {
                            gesture,
                            since: now,
                        };
                        Decision {
                            action: None,
                            status: Status::Hold(gesture),
                        }
                    }
                }
            }
            GestureClass::None => {
                self.hold = HoldPhase::Idle;
                Decision {
                    action: None,
                    status: Status::Waiting,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::resolve;
    use crate::landmarks::classify;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn engine() -> GestureEngine {
        GestureEngine::new(EngineConfig::default())
    }

    fn count_actions(decisions: &[Decision]) -> usize {
        decisions.iter().filter(|d| d.action.is_some()).count()
    }

    #[test]
    fn test_first_volume_step_is_immediate() {
        let mut eng = engine();
        let d = eng.process(GestureClass::VolumeUp, secs(0.0));
        assert_eq!(
            d.action,
            Some(Action::VolumeStep(VolumeDirection::Up))
        );
        assert_eq!(d.status, Status::VolumeUp);
    }

    #[test]
    fn test_volume_rate_limiting_cadence() {
        // Dense frames (10 ms apart) over 1.0 s: floor(1.0 / 0.3) + 1 = 4
        // applied steps, the +1 being the immediate first application.
        let mut eng = engine();
        let mut decisions = Vec::new();
        let mut t = 0.0;
        while t <= 1.0 + 1e-9 {
            decisions.push(eng.process(GestureClass::VolumeDown, secs(t)));
            t += 0.01;
        }
        assert_eq!(count_actions(&decisions), 4);
        // Every frame still reports the volume status, applied or not.
        assert!(decisions.iter().all(|d| d.status == Status::VolumeDown));
    }

    #[test]
    fn test_volume_step_not_reapplied_within_delay() {
        let mut eng = engine();
        assert!(eng.process(GestureClass::VolumeUp, secs(0.0)).action.is_some());
        assert!(eng.process(GestureClass::VolumeUp, secs(0.1)).action.is_none());
        assert!(eng.process(GestureClass::VolumeUp, secs(0.3)).action.is_none()); // strict >
        assert!(eng.process(GestureClass::VolumeUp, secs(0.31)).action.is_some());
    }

    #[test]
    fn test_hold_fires_exactly_once() {
        let mut eng = engine();
        let mut fired = 0;
        let mut t = 0.0;
        while t <= 2.0 {
            if eng
                .process(GestureClass::PlayPause, secs(t))
                .action
                .is_some()
            {
                fired += 1;
            }
            t += 0.05;
        }
        assert_eq!(fired, 1);
    }

    #[test]
    fn test_hold_fires_at_threshold() {
        let mut eng = engine();
        assert!(eng.process(GestureClass::Next, secs(0.0)).action.is_none());
        assert!(eng.process(GestureClass::Next, secs(0.2)).action.is_none());
        let d = eng.process(GestureClass::Next, secs(0.4)); // inclusive >=
        assert_eq!(d.action, Some(Action::MediaTrigger(GestureClass::Next)));
        assert_eq!(d.status, Status::Action(GestureClass::Next));
        // Continued hold reports Hold again, never Action.
        let d = eng.process(GestureClass::Next, secs(0.5));
        assert_eq!(d.action, None);
        assert_eq!(d.status, Status::Hold(GestureClass::Next));
    }

    #[test]
    fn test_abandoned_hold_fires_nothing() {
        let mut eng = engine();
        let mut decisions = Vec::new();
        decisions.push(eng.process(GestureClass::Previous, secs(0.0)));
        decisions.push(eng.process(GestureClass::Previous, secs(0.3)));
        decisions.push(eng.process(GestureClass::None, secs(0.35)));
        // Re-raised after the reset: the old 0.3 s of hold must not count.
        decisions.push(eng.process(GestureClass::Previous, secs(0.45)));
        decisions.push(eng.process(GestureClass::Previous, secs(0.7)));
        assert_eq!(count_actions(&decisions), 0);
    }

    #[test]
    fn test_rearm_on_release() {
        let mut eng = engine();
        let mut fired = 0;
        for t in [0.0, 0.2, 0.4, 0.6] {
            if eng.process(GestureClass::PlayPause, secs(t)).action.is_some() {
                fired += 1;
            }
        }
        eng.process(GestureClass::None, secs(0.7));
        for t in [0.8, 1.0, 1.2, 1.4] {
            if eng.process(GestureClass::PlayPause, secs(t)).action.is_some() {
                fired += 1;
            }
        }
        assert_eq!(fired, 2);
    }

    #[test]
    fn test_switching_gestures_restarts_timer() {
        let mut eng = engine();
        eng.process(GestureClass::Next, secs(0.0));
        eng.process(GestureClass::Next, secs(0.3));
        // Switch at 0.35: Previous starts its own episode, so nothing may
        // fire before 0.75.
        assert!(eng.process(GestureClass::Previous, secs(0.35)).action.is_none());
        assert!(eng.process(GestureClass::Previous, secs(0.7)).action.is_none());
        let d = eng.process(GestureClass::Previous, secs(0.75));
        assert_eq!(d.action, Some(Action::MediaTrigger(GestureClass::Previous)));
    }

    #[test]
    fn test_continuous_gesture_clears_hold_state() {
        let mut eng = engine();
        eng.process(GestureClass::PlayPause, secs(0.0));
        eng.process(GestureClass::VolumeUp, secs(0.2));
        // Back to the discrete gesture: a fresh episode from 0.3.
        assert!(eng.process(GestureClass::PlayPause, secs(0.3)).action.is_none());
        assert!(eng.process(GestureClass::PlayPause, secs(0.6)).action.is_none());
        assert!(eng.process(GestureClass::PlayPause, secs(0.7)).action.is_some());
    }

    #[test]
    fn test_discrete_gesture_does_not_reset_volume_cadence() {
        // RateLimitState persists across gesture changes: only actual
        // applications update it.
        let mut eng = engine();
        assert!(eng.process(GestureClass::VolumeUp, secs(0.0)).action.is_some());
        eng.process(GestureClass::Next, secs(0.1));
        assert!(eng.process(GestureClass::VolumeUp, secs(0.2)).action.is_none());
        assert!(eng.process(GestureClass::VolumeUp, secs(0.35)).action.is_some());
    }

    #[test]
    fn test_fired_then_switch_then_back_rearms() {
        let mut eng = engine();
        eng.process(GestureClass::Next, secs(0.0));
        assert!(eng.process(GestureClass::Next, secs(0.4)).action.is_some());
        // Switch directly to another discrete gesture while latched.
        assert!(eng.process(GestureClass::Previous, secs(0.5)).action.is_none());
        assert!(eng.process(GestureClass::Previous, secs(0.9)).action.is_some());
    }

    #[test]
    fn test_previous_track_scenario_from_landmarks() {
        // Index+middle extended, ring/pinky curled, thumb tucked, held for
        // 0.5 s from t=0: exactly one previous-track trigger, at t=0.4,
        // with the "Action" status on that frame only.
        let pose = crate::detector::synthetic_pose(GestureClass::Previous);
        let shape = classify(&pose).unwrap();
        assert_eq!(resolve(&shape), GestureClass::Previous);

        let mut eng = engine();
        let mut fire_times = Vec::new();
        let mut t = 0.0;
        while t <= 0.5 + 1e-9 {
            let d = eng.process(resolve(&shape), secs(t));
            if let Some(Action::MediaTrigger(g)) = d.action {
                assert_eq!(g, GestureClass::Previous);
                assert_eq!(d.status, Status::Action(GestureClass::Previous));
                fire_times.push(t);
            } else {
                assert_eq!(d.status, Status::Hold(GestureClass::Previous));
            }
            t += 0.1;
        }
        assert_eq!(fire_times.len(), 1);
        assert!((fire_times[0] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_status_lines() {
        assert_eq!(Status::NoHand.to_string(), "No Hand Detected");
        assert_eq!(Status::Waiting.to_string(), "Waiting for Gesture...");
        assert_eq!(Status::VolumeUp.to_string(), "Volume UP");
        assert_eq!(Status::VolumeDown.to_string(), "Volume DOWN");
        assert_eq!(
            Status::Hold(GestureClass::PlayPause).to_string(),
            "Hold: Play / Pause"
        );
        assert_eq!(
            Status::Hold(GestureClass::Next).to_string(),
            "Hold: Next Track"
        );
        assert_eq!(
            Status::Hold(GestureClass::Previous).to_string(),
            "Hold: Previous Track"
        );
        assert_eq!(
            Status::Action(GestureClass::PlayPause).to_string(),
            "Action: PLAY PAUSE"
        );
    }
}
