//! In-process keyboard observer used when the event tap is unavailable
//!
//! Polls the combined session key state on a dedicated thread and turns
//! snapshot differences into [`InputEvent`]s. It never needs elevated
//! permission and it cannot stop a key from reaching other apps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use super::hook::{EventSink, HookError, HookHandle, HookStrategy, ThreadHookHandle};
use super::keys::KeyboardSnapshot;
use super::types::HookMode;

/// Somewhere to read the current keyboard state from
pub trait KeyStateSource: Send + Sync + 'static {
    fn snapshot(&self) -> KeyboardSnapshot;
}

/// Local passthrough hook strategy
pub struct PollingMonitor<S> {
    source: Arc<S>,
    interval: Duration,
}

impl<S: KeyStateSource> PollingMonitor<S> {
    pub fn new(source: S, interval: Duration) -> Self {
        Self {
            source: Arc::new(source),
            interval,
        }
    }
}

impl<S: KeyStateSource> HookStrategy for PollingMonitor<S> {
    fn mode(&self) -> HookMode {
        HookMode::LocalPassthrough
    }

    fn install(&mut self, sink: EventSink) -> Result<Box<dyn HookHandle>, HookError> {
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = Arc::clone(&running);
        let source = Arc::clone(&self.source);
        let interval = self.interval;

        let thread = thread::Builder::new()
            .name("input-key-poller".to_string())
            .spawn(move || {
                debug!(?interval, "key poller started");
                poll_loop(source.as_ref(), &sink, &thread_running, interval);
                debug!("key poller stopped");
            })
            .map_err(|e| HookError::ThreadSpawn(e.to_string()))?;

        Ok(Box::new(ThreadHookHandle::new(running, thread)))
    }
}

fn poll_loop<S: KeyStateSource>(
    source: &S,
    sink: &EventSink,
    running: &AtomicBool,
    interval: Duration,
) {
    // Keys already down at install time are a baseline, not new presses.
    let mut last = source.snapshot();

    while running.load(Ordering::SeqCst) {
        thread::sleep(interval);

        let next = source.snapshot();
        if next == last {
            continue;
        }

        for event in next.transitions_from(&last) {
            trace!(?event, "polled transition");
            if !sink.deliver(event) {
                return;
            }
        }
        last = next;
    }
}

/// Source with no keyboard, for platforms without a key state API
#[derive(Debug, Default)]
pub struct NoKeyboard;

impl KeyStateSource for NoKeyboard {
    fn snapshot(&self) -> KeyboardSnapshot {
        KeyboardSnapshot::default()
    }
}

#[cfg(target_os = "macos")]
pub use session::SessionKeyState;

#[cfg(target_os = "macos")]
mod session {
    use core_graphics::event::CGEventFlags;

    use super::KeyStateSource;
    use crate::input::keys::{KeyboardSnapshot, KEY_CODE_LIMIT};

    /// `kCGEventSourceStateCombinedSessionState`
    const COMBINED_SESSION_STATE: i32 = 0;

    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        fn CGEventSourceKeyState(state_id: i32, key: u16) -> bool;
        fn CGEventSourceFlagsState(state_id: i32) -> u64;
    }

    /// Reads the session-wide key state; needs no Accessibility trust
    #[derive(Debug, Default)]
    pub struct SessionKeyState;

    impl KeyStateSource for SessionKeyState {
        fn snapshot(&self) -> KeyboardSnapshot {
            let flags = CGEventFlags::from_bits_truncate(unsafe {
                CGEventSourceFlagsState(COMBINED_SESSION_STATE)
            });
            let mut snapshot =
                KeyboardSnapshot::new(flags.contains(CGEventFlags::CGEventFlagCommand));

            for code in 0..KEY_CODE_LIMIT {
                if unsafe { CGEventSourceKeyState(COMBINED_SESSION_STATE, code) } {
                    snapshot.set_pressed(code, true);
                }
            }
            snapshot
        }
    }
}
