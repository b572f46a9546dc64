//! First-run permission onboarding

use tracing::{info, warn};

use crate::preferences::PreferenceStore;

use super::PermissionProber;

/// Outcome of the startup onboarding check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Onboarding {
    /// Permission already granted, nothing to do
    NotNeeded,
    /// User opted out of being asked
    Suppressed,
    /// The OS consent flow was requested
    Prompted,
}

/// Ask for the elevated permission unless it is granted or the user opted out
pub fn run_onboarding(prober: &dyn PermissionProber, store: &PreferenceStore) -> Onboarding {
    if prober.is_granted() {
        return Onboarding::NotNeeded;
    }

    if store.suppress_onboarding() {
        info!("permission onboarding suppressed by preference");
        return Onboarding::Suppressed;
    }

    warn!(
        "keyboard blocking needs Accessibility permission; \
         until it is granted keys still reach other apps"
    );
    info!("run with --skip-onboarding to stop this prompt");
    prober.prompt_for_permission();
    Onboarding::Prompted
}
