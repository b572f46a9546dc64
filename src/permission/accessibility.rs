//! macOS Accessibility trust check
//!
//! An event tap that can modify or drop keyboard events only installs when
//! the process is trusted for Accessibility.

use core_foundation::base::TCFType;
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
use core_foundation::string::CFString;
use tracing::{debug, info, warn};

use super::PermissionProber;

/// Deep link to System Settings > Privacy & Security > Accessibility
const ACCESSIBILITY_SETTINGS_URL: &str =
    "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility";

/// Value of `kAXTrustedCheckOptionPrompt`
const TRUSTED_CHECK_OPTION_PROMPT: &str = "AXTrustedCheckOptionPrompt";

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
}

/// Probes and requests Accessibility trust for this process
#[derive(Debug, Default)]
pub struct AccessibilityProber;

impl AccessibilityProber {
    pub fn new() -> Self {
        Self
    }
}

impl PermissionProber for AccessibilityProber {
    fn is_granted(&self) -> bool {
        let trusted = unsafe { AXIsProcessTrusted() };
        debug!(trusted, "accessibility trust probed");
        trusted
    }

    fn prompt_for_permission(&self) {
        let options = CFDictionary::from_CFType_pairs(&[(
            CFString::new(TRUSTED_CHECK_OPTION_PROMPT),
            CFBoolean::true_value(),
        )]);
        let trusted = unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef()) };
        if trusted {
            return;
        }

        info!("opening Accessibility settings");
        if let Err(e) = open::that(ACCESSIBILITY_SETTINGS_URL) {
            warn!(?e, "failed to open Accessibility settings");
        }
    }
}
