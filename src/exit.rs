//! Exit sequencing
//!
//! The visual effect plays before anything is torn down; tearing down first
//! would flash the desktop before the effect.

use std::time::Duration;

use tracing::info;

use crate::display::DisplayPresenter;
use crate::input::InputHook;

/// Plays the exit effect, then tears the session down
#[derive(Debug, Clone, Copy)]
pub struct ExitSequencer {
    grace: Duration,
}

impl ExitSequencer {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    /// Effect, grace period, teardown
    pub async fn run(&self, presenter: &mut dyn DisplayPresenter, hook: &mut InputHook) {
        info!(grace_ms = self.grace.as_millis() as u64, "exit sequence started");
        presenter.begin_exit_effect(self.grace);
        tokio::time::sleep(self.grace).await;
        Self::teardown(presenter, hook);
    }

    /// Release everything the session holds; safe to call more than once
    pub fn teardown(presenter: &mut dyn DisplayPresenter, hook: &mut InputHook) {
        presenter.restore_cursor();
        presenter.dismiss_auxiliary();
        hook.stop();
        info!("session torn down");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use tokio_test::{assert_pending, assert_ready};

    use super::*;
    use crate::input::testing::{FakeState, FakeStrategy};
    use crate::input::HookMode;
    use crate::permission::testing::FakeProber;

    const GRACE: Duration = Duration::from_millis(800);

    /// Presenter that writes each call into a shared log
    struct RecordingPresenter {
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl DisplayPresenter for RecordingPresenter {
        fn present_all(&mut self) {
            self.log.lock().unwrap().push("present_all");
        }

        fn dismiss_auxiliary(&mut self) {
            self.log.lock().unwrap().push("dismiss_auxiliary");
        }

        fn show_progress(&mut self, _progress: f64) {}

        fn reset_progress(&mut self) {}

        fn begin_exit_effect(&mut self, _duration: Duration) {
            self.log.lock().unwrap().push("exit_effect");
        }

        fn restore_cursor(&mut self) {
            self.log.lock().unwrap().push("restore_cursor");
        }
    }

    fn running_hook() -> (InputHook, Arc<Mutex<FakeState>>) {
        let (global, state) = FakeStrategy::new(HookMode::GlobalSwallowing, false);
        let (local, _) = FakeStrategy::new(HookMode::LocalPassthrough, false);
        let (mut hook, _rx) = InputHook::new(
            Arc::new(FakeProber::new(true)),
            Box::new(global),
            Box::new(local),
        );
        hook.start();
        (hook, state)
    }

    #[tokio::test(start_paused = true)]
    async fn test_effect_plays_before_teardown() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut presenter = RecordingPresenter {
            log: Arc::clone(&log),
        };
        let (mut hook, hook_state) = running_hook();
        let sequencer = ExitSequencer::new(GRACE);

        {
            let mut run = tokio_test::task::spawn(sequencer.run(&mut presenter, &mut hook));
            assert_pending!(run.poll());
            assert_eq!(*log.lock().unwrap(), vec!["exit_effect"]);
            assert_eq!(hook_state.lock().unwrap().uninstalls, 0);

            tokio::time::advance(GRACE).await;
            assert_ready!(run.poll());
        }

        assert_eq!(
            *log.lock().unwrap(),
            vec!["exit_effect", "restore_cursor", "dismiss_auxiliary"]
        );
        assert!(!hook.is_running());
        assert_eq!(hook_state.lock().unwrap().uninstalls, 1);
    }

    #[tokio::test]
    async fn test_teardown_twice_is_safe() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut presenter = RecordingPresenter {
            log: Arc::clone(&log),
        };
        let (mut hook, hook_state) = running_hook();

        ExitSequencer::teardown(&mut presenter, &mut hook);
        ExitSequencer::teardown(&mut presenter, &mut hook);

        assert_eq!(hook_state.lock().unwrap().uninstalls, 1);
        assert_eq!(log.lock().unwrap().len(), 4);
    }
}
