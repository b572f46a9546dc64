//! Keyboard interception
//!
//! Two hook strategies feed one event stream:
//! - a system-wide event tap that swallows everything except the exit combo
//!   (needs Accessibility permission)
//! - a local key-state poller that only observes (always available)
//!
//! [`InputHook`] picks between them and the gesture detector consumes the
//! resulting [`InputEvent`]s without knowing which one is active.

#[cfg(target_os = "macos")]
mod event_tap;
mod hook;
pub mod keys;
mod policy;
mod poller;
mod types;

use std::time::Duration;

pub use hook::{EventSink, HookError, HookHandle, HookStrategy, InputHook};
pub use types::{HookMode, InputEvent};

/// Global strategy for platforms without an event tap
#[cfg(not(target_os = "macos"))]
#[derive(Debug, Default)]
struct UnsupportedGlobalHook;

#[cfg(not(target_os = "macos"))]
impl HookStrategy for UnsupportedGlobalHook {
    fn mode(&self) -> HookMode {
        HookMode::GlobalSwallowing
    }

    fn install(&mut self, _sink: EventSink) -> Result<Box<dyn HookHandle>, HookError> {
        Err(HookError::Unsupported)
    }
}

/// The (global, local) strategy pair for the running platform
pub fn platform_strategies(
    poll_interval: Duration,
) -> (Box<dyn HookStrategy>, Box<dyn HookStrategy>) {
    #[cfg(target_os = "macos")]
    {
        (
            Box::new(event_tap::EventTapStrategy::new()),
            Box::new(poller::PollingMonitor::new(
                poller::SessionKeyState,
                poll_interval,
            )),
        )
    }
    #[cfg(not(target_os = "macos"))]
    {
        (
            Box::new(UnsupportedGlobalHook),
            Box::new(poller::PollingMonitor::new(poller::NoKeyboard, poll_interval)),
        )
    }
}

#[cfg(test)]
pub(crate) use hook::testing;
