//! clean-screen: blank every display and block the keyboard for cleaning
//!
//! - Covers each connected display with an opaque surface
//! - Swallows keyboard input through a Quartz event tap when Accessibility
//!   permission is granted, otherwise observes keys in-process
//! - Exits when Command+Escape is held for the hold duration
//!
//! Without Accessibility permission the app still runs and the exit gesture
//! still works, but keys reach other apps.

mod cli;
mod config;
mod display;
mod events;
mod exit;
mod gesture;
mod input;
mod lifecycle;
mod permission;
mod preferences;
mod scheduler;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::Config;
use crate::events::GestureEvent;
use crate::exit::ExitSequencer;
use crate::gesture::{DriverOutcome, GestureDriver};
use crate::input::{HookMode, InputHook};
use crate::lifecycle::{cover_displays, ShutdownSignal};
use crate::preferences::PreferenceStore;

/// Why the main loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// The exit gesture completed
    Gesture,
    /// SIGINT/SIGTERM
    Signal,
    /// The gesture detector stopped without completing
    DetectorStopped,
}

// Single-threaded: the detector, hook and presenter all live on this thread;
// the OS hook threads only push into channels.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "clean-screen starting");

    // Load configuration; nothing here may stop the session from starting
    let mut config = Config::load_or_fallback();
    if let Err(e) = config.set_hold_ms(cli.hold_ms) {
        warn!(%e, "keeping the default hold duration");
    }
    info!(
        data_dir = ?config.data_dir,
        hold_ms = config.hold_duration.as_millis() as u64,
        "configuration loaded"
    );

    let store = PreferenceStore::new(&config.preferences_path);
    if cli.skip_onboarding || cli.reset_onboarding {
        match store.set_suppress_onboarding(cli.skip_onboarding) {
            Ok(()) => info!(suppressed = cli.skip_onboarding, "onboarding preference saved"),
            Err(e) => warn!(%e, "failed to save onboarding preference"),
        }
    }

    // Cover the displays before the keyboard goes away, but not over the
    // permission dialog
    let prober = permission::platform_prober();
    let mut presenter = display::platform_presenter();
    let onboarding = cover_displays(prober.as_ref(), &store, presenter.as_mut(), &config).await;
    debug!(?onboarding, "permission onboarding checked");

    let (global, local) = input::platform_strategies(config.local_poll_interval);
    let (mut hook, input_rx) = InputHook::new(Arc::clone(&prober), global, local);
    if !hook.start().can_swallow() {
        warn!("keyboard blocking unavailable, keys still reach other apps");
    }

    let (gesture_tx, mut gesture_rx) = mpsc::unbounded_channel();
    let driver = GestureDriver::new(config.hold_duration, config.tick_interval, gesture_tx);
    let mut driver_task = tokio::spawn(driver.run(input_rx));

    let mut permission_poll = time::interval(config.permission_poll_interval);
    permission_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = ShutdownSignal::new();
    let shutdown_wait = shutdown.wait();
    tokio::pin!(shutdown_wait);

    info!("displays covered, hold Command+Escape to exit");

    let outcome = loop {
        tokio::select! {
            Some(gesture) = gesture_rx.recv() => match gesture {
                GestureEvent::HoldStarted => presenter.show_progress(0.0),
                GestureEvent::Progress { value } => presenter.show_progress(value),
                GestureEvent::HoldCancelled { .. } => presenter.reset_progress(),
                GestureEvent::Completed { .. } => {
                    presenter.show_progress(1.0);
                    break Outcome::Gesture;
                }
            },

            result = &mut driver_task => match result {
                Ok(DriverOutcome::Completed) => break Outcome::Gesture,
                Ok(DriverOutcome::InputClosed) => {
                    error!("input stream closed before the exit gesture");
                    break Outcome::DetectorStopped;
                }
                Err(e) => {
                    error!(?e, "gesture detector task failed");
                    break Outcome::DetectorStopped;
                }
            },

            _ = permission_poll.tick(), if hook.is_running() => match hook.follow_permission() {
                Some(HookMode::GlobalSwallowing) => info!("keyboard blocking enabled"),
                Some(HookMode::LocalPassthrough) => {
                    warn!("Accessibility permission revoked, keys reach other apps again")
                }
                None => {}
            },

            _ = &mut shutdown_wait => {
                info!("shutdown signal received");
                break Outcome::Signal;
            }
        }
    };

    match outcome {
        Outcome::Gesture => {
            ExitSequencer::new(config.exit_grace)
                .run(presenter.as_mut(), &mut hook)
                .await;
        }
        Outcome::Signal | Outcome::DetectorStopped => {
            ExitSequencer::teardown(presenter.as_mut(), &mut hook);
        }
    }

    drop(presenter);
    info!(?outcome, "clean-screen stopped");

    Ok(())
}
