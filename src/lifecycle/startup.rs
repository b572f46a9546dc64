//! Startup ordering
//!
//! Capturing the displays hides every window, including the OS permission
//! dialog. When onboarding prompted, the displays stay uncovered until the
//! user answers or the wait runs out.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::Config;
use crate::display::DisplayPresenter;
use crate::permission::{run_onboarding, Onboarding, PermissionProber};
use crate::preferences::PreferenceStore;

/// Run onboarding, then cover every display
pub async fn cover_displays(
    prober: &dyn PermissionProber,
    store: &PreferenceStore,
    presenter: &mut dyn DisplayPresenter,
    config: &Config,
) -> Onboarding {
    let onboarding = run_onboarding(prober, store);
    if onboarding == Onboarding::Prompted {
        wait_for_grant(
            prober,
            config.permission_poll_interval,
            config.permission_prompt_timeout,
        )
        .await;
    }

    presenter.present_all();
    onboarding
}

/// Poll until permission is granted or `timeout` passes
///
/// Returns whether permission was granted.
pub async fn wait_for_grant(
    prober: &dyn PermissionProber,
    poll_interval: Duration,
    timeout: Duration,
) -> bool {
    info!(
        timeout_s = timeout.as_secs(),
        "waiting for Accessibility permission before covering displays"
    );

    let granted = async {
        let mut poll = time::interval(poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            poll.tick().await;
            if prober.is_granted() {
                return;
            }
        }
    };

    match time::timeout(timeout, granted).await {
        Ok(()) => {
            info!("Accessibility permission granted");
            true
        }
        Err(_) => {
            warn!("no answer to the permission prompt, continuing without keyboard blocking");
            false
        }
    }
}
