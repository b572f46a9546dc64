//! Hold-to-exit gesture detector
//!
//! Tracks whether Command and Escape are both held and drives a normalized
//! progress value from 0 to 1 over the configured hold duration. Reaching 1
//! finishes the session; the detector never re-arms afterwards.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::events::GestureEvent;
use crate::input::keys::{codes, KeyCode};
use crate::input::InputEvent;

/// Detector phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Combo not held, no timer
    #[default]
    Idle,
    /// Combo held, progress advancing on ticks
    Holding,
    /// Hold completed; terminal
    Finished,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Holding => write!(f, "Holding"),
            Phase::Finished => write!(f, "Finished"),
        }
    }
}

/// Everything the detector knows about the current hold
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureState {
    pub command_held: bool,
    pub exit_key_held: bool,
    /// Normalized progress in `[0, 1]`
    pub progress: f64,
    /// When the current hold began
    pub started_at: Option<Instant>,
}

impl GestureState {
    fn combo_held(&self) -> bool {
        self.command_held && self.exit_key_held
    }
}

/// State machine behind the hold-to-exit gesture
#[derive(Debug)]
pub struct HoldGestureDetector {
    phase: Phase,
    state: GestureState,
    hold_duration: Duration,
    exit_key: KeyCode,
}

impl HoldGestureDetector {
    pub fn new(hold_duration: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            state: GestureState::default(),
            hold_duration,
            exit_key: codes::ESCAPE,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn progress(&self) -> f64 {
        self.state.progress
    }

    pub fn is_holding(&self) -> bool {
        self.phase == Phase::Holding
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Apply one key transition
    pub fn handle_event(&mut self, event: InputEvent, now: Instant) -> Option<GestureEvent> {
        match event {
            InputEvent::ModifierChange { command_held } => self.state.command_held = command_held,
            InputEvent::KeyDown { code } if code == self.exit_key => {
                self.state.exit_key_held = true
            }
            InputEvent::KeyUp { code } if code == self.exit_key => {
                self.state.exit_key_held = false
            }
            InputEvent::KeyDown { .. } | InputEvent::KeyUp { .. } => return None,
        }

        let combo_held = self.state.combo_held();
        match self.phase {
            Phase::Idle if combo_held => Some(self.begin_hold(now)),
            Phase::Holding if !combo_held => Some(self.cancel_hold(now)),
            Phase::Finished if !combo_held => {
                self.state.progress = 0.0;
                None
            }
            _ => None,
        }
    }

    /// Recompute progress; only meaningful while holding
    pub fn tick(&mut self, now: Instant) -> Option<GestureEvent> {
        if self.phase != Phase::Holding {
            return None;
        }
        let started_at = self.state.started_at?;
        let elapsed = now.saturating_duration_since(started_at);

        let progress = if self.hold_duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / self.hold_duration.as_secs_f64()).min(1.0)
        };
        self.state.progress = self.state.progress.max(progress);

        if self.state.progress < 1.0 {
            return Some(GestureEvent::Progress {
                value: self.state.progress,
            });
        }

        let held_ms = elapsed.as_millis() as u64;
        self.transition_to(Phase::Finished, held_ms);
        Some(GestureEvent::Completed { held_ms })
    }

    fn begin_hold(&mut self, now: Instant) -> GestureEvent {
        self.state.started_at = Some(now);
        self.state.progress = 0.0;
        self.transition_to(Phase::Holding, 0);
        GestureEvent::HoldStarted
    }

    fn cancel_hold(&mut self, now: Instant) -> GestureEvent {
        let held_ms = self
            .state
            .started_at
            .map(|t| now.saturating_duration_since(t).as_millis() as u64)
            .unwrap_or(0);

        self.state.started_at = None;
        self.state.progress = 0.0;
        self.transition_to(Phase::Idle, held_ms);
        GestureEvent::HoldCancelled { held_ms }
    }

    fn transition_to(&mut self, phase: Phase, held_ms: u64) {
        let from = self.phase;
        self.phase = phase;

        if phase == Phase::Finished {
            info!(from = %from, to = %phase, held_ms, "exit gesture completed");
        } else {
            debug!(from = %from, to = %phase, held_ms, "gesture transition");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOLD: Duration = Duration::from_millis(600);
    const TICK: Duration = Duration::from_millis(16);

    fn press_combo(detector: &mut HoldGestureDetector, now: Instant) {
        detector.handle_event(InputEvent::ModifierChange { command_held: true }, now);
        detector.handle_event(InputEvent::KeyDown { code: codes::ESCAPE }, now);
    }

    #[test]
    fn test_initial_state() {
        let detector = HoldGestureDetector::new(HOLD);
        assert_eq!(detector.phase(), Phase::Idle);
        assert_eq!(detector.progress(), 0.0);
        assert!(detector.state().started_at.is_none());
    }

    #[test]
    fn test_combo_starts_hold() {
        let mut detector = HoldGestureDetector::new(HOLD);
        let t0 = Instant::now();

        let first = detector.handle_event(InputEvent::ModifierChange { command_held: true }, t0);
        assert_eq!(first, None);
        let second = detector.handle_event(InputEvent::KeyDown { code: codes::ESCAPE }, t0);
        assert_eq!(second, Some(GestureEvent::HoldStarted));
        assert!(detector.is_holding());
    }

    #[test]
    fn test_escape_alone_does_not_start() {
        let mut detector = HoldGestureDetector::new(HOLD);
        let t0 = Instant::now();
        detector.handle_event(InputEvent::KeyDown { code: codes::ESCAPE }, t0);
        assert_eq!(detector.tick(t0 + HOLD), None);
        assert_eq!(detector.phase(), Phase::Idle);
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let mut detector = HoldGestureDetector::new(HOLD);
        let t0 = Instant::now();
        press_combo(&mut detector, t0);

        assert_eq!(detector.handle_event(InputEvent::KeyDown { code: codes::A }, t0), None);
        assert_eq!(detector.handle_event(InputEvent::KeyUp { code: codes::A }, t0), None);
        assert!(detector.is_holding());
    }

    #[test]
    fn test_key_repeat_does_not_restart_clock() {
        let mut detector = HoldGestureDetector::new(HOLD);
        let t0 = Instant::now();
        press_combo(&mut detector, t0);

        let repeat = detector.handle_event(
            InputEvent::KeyDown { code: codes::ESCAPE },
            t0 + Duration::from_millis(300),
        );
        assert_eq!(repeat, None);
        assert_eq!(detector.state().started_at, Some(t0));
    }

    #[test]
    fn test_full_hold_completes_once() {
        let mut detector = HoldGestureDetector::new(HOLD);
        let t0 = Instant::now();
        press_combo(&mut detector, t0);

        let mut completions = Vec::new();
        let mut last_progress = 0.0;
        for n in 1..=100u32 {
            let now = t0 + TICK * n;
            match detector.tick(now) {
                Some(GestureEvent::Progress { value }) => {
                    assert!(value >= last_progress);
                    last_progress = value;
                }
                Some(GestureEvent::Completed { .. }) => completions.push(now - t0),
                Some(other) => panic!("unexpected event {other}"),
                None => {}
            }
        }

        assert_eq!(completions.len(), 1);
        assert!(completions[0] >= HOLD);
        assert!(completions[0] < HOLD + TICK);
        assert_eq!(detector.progress(), 1.0);
        assert!(detector.is_finished());
    }

    #[test]
    fn test_early_release_resets_progress() {
        let mut detector = HoldGestureDetector::new(HOLD);
        let t0 = Instant::now();
        press_combo(&mut detector, t0);

        for n in 1..=18u32 {
            detector.tick(t0 + TICK * n);
        }
        assert!(detector.progress() > 0.4);

        let release_at = t0 + Duration::from_millis(300);
        let cancelled = detector.handle_event(InputEvent::KeyUp { code: codes::ESCAPE }, release_at);
        assert_eq!(cancelled, Some(GestureEvent::HoldCancelled { held_ms: 300 }));
        assert_eq!(detector.progress(), 0.0);

        for n in 19..=100u32 {
            assert_eq!(detector.tick(t0 + TICK * n), None);
        }
        assert!(!detector.is_finished());
    }

    #[test]
    fn test_command_release_resets_progress() {
        let mut detector = HoldGestureDetector::new(HOLD);
        let t0 = Instant::now();
        press_combo(&mut detector, t0);
        detector.tick(t0 + Duration::from_millis(200));

        let event = detector.handle_event(
            InputEvent::ModifierChange { command_held: false },
            t0 + Duration::from_millis(250),
        );
        assert!(matches!(event, Some(GestureEvent::HoldCancelled { .. })));
        assert_eq!(detector.progress(), 0.0);
        assert!(detector.state().exit_key_held);
    }

    #[test]
    fn test_repress_restarts_from_zero() {
        let mut detector = HoldGestureDetector::new(HOLD);
        let t0 = Instant::now();
        press_combo(&mut detector, t0);
        detector.tick(t0 + Duration::from_millis(400));

        let t1 = t0 + Duration::from_millis(450);
        detector.handle_event(InputEvent::KeyUp { code: codes::ESCAPE }, t1);
        detector.handle_event(InputEvent::KeyDown { code: codes::ESCAPE }, t1);
        assert_eq!(detector.state().started_at, Some(t1));

        match detector.tick(t1 + Duration::from_millis(60)) {
            Some(GestureEvent::Progress { value }) => assert!((value - 0.1).abs() < 1e-9),
            other => panic!("expected progress, got {other:?}"),
        }
        assert!(detector.tick(t1 + Duration::from_millis(599)).is_some());
        assert!(!detector.is_finished());
    }

    #[test]
    fn test_progress_zero_whenever_combo_not_held() {
        let mut detector = HoldGestureDetector::new(HOLD);
        let t0 = Instant::now();
        let script = [
            InputEvent::KeyDown { code: codes::ESCAPE },
            InputEvent::ModifierChange { command_held: true },
            InputEvent::ModifierChange { command_held: false },
            InputEvent::KeyUp { code: codes::ESCAPE },
            InputEvent::ModifierChange { command_held: true },
            InputEvent::KeyDown { code: codes::ESCAPE },
            InputEvent::KeyUp { code: codes::ESCAPE },
        ];

        for (n, event) in script.into_iter().enumerate() {
            let now = t0 + Duration::from_millis(100 * n as u64);
            detector.handle_event(event, now);
            detector.tick(now + Duration::from_millis(50));
            if !detector.state().combo_held() {
                assert_eq!(detector.progress(), 0.0, "after {event:?}");
            }
        }
    }

    #[test]
    fn test_finished_never_rearms() {
        let mut detector = HoldGestureDetector::new(HOLD);
        let t0 = Instant::now();
        press_combo(&mut detector, t0);
        assert!(matches!(detector.tick(t0 + HOLD), Some(GestureEvent::Completed { .. })));

        detector.handle_event(InputEvent::KeyUp { code: codes::ESCAPE }, t0 + HOLD);
        assert_eq!(detector.progress(), 0.0);

        let t1 = t0 + HOLD * 2;
        assert_eq!(
            detector.handle_event(InputEvent::KeyDown { code: codes::ESCAPE }, t1),
            None
        );
        assert_eq!(detector.tick(t1 + HOLD), None);
        assert!(detector.is_finished());
    }
}
