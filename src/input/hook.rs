//! Input hook manager
//!
//! Owns whichever hook strategy is installed and hands the gesture detector a
//! single stream of [`InputEvent`]s. The global strategy is preferred; any
//! failure to install it falls back to the local strategy without surfacing
//! an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::permission::PermissionProber;

use super::keys::codes;
use super::types::{HookMode, InputEvent};

/// Errors that can occur while installing a hook strategy
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("this platform has no system-wide event tap")]
    Unsupported,

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to create run loop source for event tap")]
    RunLoopSource,

    #[error("failed to spawn hook thread: {0}")]
    ThreadSpawn(String),

    #[error("hook thread exited before reporting installation")]
    ThreadExited,
}

/// Delivery end handed to an installed strategy
///
/// Each installation gets its own sink. Once the installation is torn down the
/// sink goes dead, so a straggling hook thread can never double-deliver into
/// a newer installation's stream.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<InputEvent>,
    live: Arc<AtomicBool>,
}

impl EventSink {
    fn new(tx: mpsc::UnboundedSender<InputEvent>) -> Self {
        Self {
            tx,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Queue an event for the detector; never blocks
    ///
    /// Returns false when the installation was torn down or the receiver is
    /// gone.
    pub fn deliver(&self, event: InputEvent) -> bool {
        if !self.is_live() {
            return false;
        }
        self.tx.send(event).is_ok()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

/// A live installation; dropping it without `uninstall` leaks the hook
pub trait HookHandle: Send {
    /// Tear the installation down, waiting for its callback context to exit
    fn uninstall(self: Box<Self>);
}

/// One way of installing an input hook
pub trait HookStrategy: Send {
    /// The mode this strategy provides once installed
    fn mode(&self) -> HookMode;

    /// Install the hook, delivering every transition into `sink`
    fn install(&mut self, sink: EventSink) -> Result<Box<dyn HookHandle>, HookError>;
}

/// Handle for a hook running on its own thread until a flag clears
pub struct ThreadHookHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ThreadHookHandle {
    pub fn new(running: Arc<AtomicBool>, thread: JoinHandle<()>) -> Self {
        Self {
            running,
            thread: Some(thread),
        }
    }
}

impl HookHandle for ThreadHookHandle {
    fn uninstall(mut self: Box<Self>) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let name = thread.thread().name().unwrap_or("hook").to_string();
            if thread.join().is_err() {
                warn!(thread = %name, "hook thread panicked");
            }
        }
    }
}

struct ActiveHook {
    mode: HookMode,
    handle: Option<Box<dyn HookHandle>>,
    sink: EventSink,
}

/// Installs, tracks and removes the input hook
pub struct InputHook {
    prober: Arc<dyn PermissionProber>,
    global: Box<dyn HookStrategy>,
    local: Box<dyn HookStrategy>,
    event_tx: mpsc::UnboundedSender<InputEvent>,
    active: Option<ActiveHook>,
}

impl InputHook {
    /// Create a stopped hook and the receiving end of its event stream
    pub fn new(
        prober: Arc<dyn PermissionProber>,
        global: Box<dyn HookStrategy>,
        local: Box<dyn HookStrategy>,
    ) -> (Self, mpsc::UnboundedReceiver<InputEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let hook = Self {
            prober,
            global,
            local,
            event_tx,
            active: None,
        };
        (hook, event_rx)
    }

    /// Install the best available hook; a no-op when already running
    pub fn start(&mut self) -> HookMode {
        if let Some(active) = &self.active {
            debug!(mode = %active.mode, "input hook already running");
            return active.mode;
        }

        let active = self
            .try_global()
            .unwrap_or_else(|| Self::install_local(self.local.as_mut(), &self.event_tx));

        info!(mode = %active.mode, "input hook started");
        let mode = active.mode;
        self.active = Some(active);
        mode
    }

    /// Remove the installed hook; safe to call repeatedly
    pub fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        active.sink.close();
        if let Some(handle) = active.handle {
            handle.uninstall();
        }
        info!(mode = %active.mode, "input hook stopped");
    }

    /// Mode of the running installation, if any
    pub fn mode(&self) -> Option<HookMode> {
        self.active.as_ref().map(|active| active.mode)
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Reinstall with the global strategy when permission arrived while degraded
    ///
    /// Returns true when the hook was upgraded.
    pub fn upgrade_if_permitted(&mut self) -> bool {
        if self.mode() != Some(HookMode::LocalPassthrough) || !self.prober.is_granted() {
            return false;
        }

        info!("permission granted while degraded, reinstalling input hook");
        self.reinstall() == HookMode::GlobalSwallowing
    }

    /// Fall back to the local strategy when permission was revoked
    ///
    /// The OS stops feeding an untrusted tap, so staying on it would leave the
    /// exit gesture deaf. Returns true when the hook was downgraded.
    pub fn downgrade_if_revoked(&mut self) -> bool {
        if self.mode() != Some(HookMode::GlobalSwallowing) || self.prober.is_granted() {
            return false;
        }

        warn!("permission revoked, reinstalling input hook without blocking");
        self.reinstall() == HookMode::LocalPassthrough
    }

    /// Move to whichever mode the current permission allows
    ///
    /// Returns the new mode when it changed.
    pub fn follow_permission(&mut self) -> Option<HookMode> {
        let before = self.mode();
        let changed = match before {
            Some(HookMode::LocalPassthrough) => self.upgrade_if_permitted(),
            Some(HookMode::GlobalSwallowing) => self.downgrade_if_revoked(),
            None => false,
        };
        if changed {
            self.mode()
        } else {
            None
        }
    }

    /// Swap installations, reporting held keys as released in between
    ///
    /// Releases that happen while no hook is installed are never observed,
    /// and the new hook only reports changes from its own baseline.
    fn reinstall(&mut self) -> HookMode {
        self.stop();
        for event in [
            InputEvent::KeyUp { code: codes::ESCAPE },
            InputEvent::ModifierChange { command_held: false },
        ] {
            let _ = self.event_tx.send(event);
        }
        self.start()
    }

    fn try_global(&mut self) -> Option<ActiveHook> {
        if !self.prober.is_granted() {
            debug!("elevated permission not granted, skipping global hook");
            return None;
        }

        let sink = EventSink::new(self.event_tx.clone());
        match self.global.install(sink.clone()) {
            Ok(handle) => Some(ActiveHook {
                mode: self.global.mode(),
                handle: Some(handle),
                sink,
            }),
            Err(e) => {
                sink.close();
                debug!(%e, "global hook unavailable, falling back");
                None
            }
        }
    }

    fn install_local(
        local: &mut dyn HookStrategy,
        event_tx: &mpsc::UnboundedSender<InputEvent>,
    ) -> ActiveHook {
        let sink = EventSink::new(event_tx.clone());
        let handle = match local.install(sink.clone()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(%e, "local hook failed to install, no input will be observed");
                None
            }
        };

        ActiveHook {
            mode: local.mode(),
            handle,
            sink,
        }
    }
}

impl Drop for InputHook {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Shared view into a [`FakeStrategy`] after it moved into an `InputHook`
    #[derive(Debug, Default)]
    pub struct FakeState {
        pub installs: usize,
        pub uninstalls: usize,
        pub sinks: Vec<EventSink>,
    }

    /// Strategy that records installs and exposes its sinks for injection
    pub struct FakeStrategy {
        mode: HookMode,
        fail: bool,
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeStrategy {
        pub fn new(mode: HookMode, fail: bool) -> (Self, Arc<Mutex<FakeState>>) {
            let state = Arc::new(Mutex::new(FakeState::default()));
            let strategy = Self {
                mode,
                fail,
                state: Arc::clone(&state),
            };
            (strategy, state)
        }
    }

    struct FakeHandle {
        state: Arc<Mutex<FakeState>>,
    }

    impl HookHandle for FakeHandle {
        fn uninstall(self: Box<Self>) {
            self.state.lock().unwrap().uninstalls += 1;
        }
    }

    impl HookStrategy for FakeStrategy {
        fn mode(&self) -> HookMode {
            self.mode
        }

        fn install(&mut self, sink: EventSink) -> Result<Box<dyn HookHandle>, HookError> {
            if self.fail {
                return Err(HookError::EventTapCreation);
            }
            let mut state = self.state.lock().unwrap();
            state.installs += 1;
            state.sinks.push(sink);
            Ok(Box::new(FakeHandle {
                state: Arc::clone(&self.state),
            }))
        }
    }
}
