//! Permission probing for the system-wide event tap
//!
//! Probing is kept separate from hook installation so the app can pick the
//! degraded mode before it pays for creating a tap. The answer is never
//! cached: the user may grant or revoke access at any time.

#[cfg(target_os = "macos")]
mod accessibility;
mod onboarding;

use std::sync::Arc;

#[cfg(target_os = "macos")]
pub use accessibility::AccessibilityProber;
pub use onboarding::{run_onboarding, Onboarding};

/// Capability check for the elevated input hook
pub trait PermissionProber: Send + Sync {
    /// Whether the elevated hook is authorized right now; never shows a dialog
    fn is_granted(&self) -> bool;

    /// Ask the OS to show its consent flow
    ///
    /// Advisory only. The outcome is observed by polling
    /// [`is_granted`](Self::is_granted) later.
    fn prompt_for_permission(&self);
}

/// Prober for platforms without an elevated hook
#[derive(Debug, Default)]
pub struct UnsupportedProber;

impl PermissionProber for UnsupportedProber {
    fn is_granted(&self) -> bool {
        false
    }

    fn prompt_for_permission(&self) {
        tracing::debug!("no permission flow on this platform");
    }
}

/// The prober for the running platform
pub fn platform_prober() -> Arc<dyn PermissionProber> {
    #[cfg(target_os = "macos")]
    {
        Arc::new(AccessibilityProber::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Arc::new(UnsupportedProber)
    }
}
