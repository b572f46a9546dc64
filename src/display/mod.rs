//! Display presentation
//!
//! The presenter covers every connected display with an opaque surface,
//! renders the hold progress indicator and plays the exit effect. The core
//! only talks to it through [`DisplayPresenter`].

#[cfg(target_os = "macos")]
mod capture;
mod headless;

use std::time::Duration;

#[cfg(target_os = "macos")]
pub use capture::CapturedDisplays;
pub use headless::HeadlessPresenter;

/// Identifier of a physical display
pub type DisplayId = u32;

/// One opaque full-coverage surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    pub display: DisplayId,
    /// The primary surface hosts the progress indicator and lives until exit
    pub primary: bool,
}

/// Surfaces for the connected displays
///
/// The primary surface goes on `main`, or on the first display when `main` is
/// not among them. With no displays reported a single primary surface is
/// planned on `main` (or display 0).
pub fn plan_surfaces(displays: &[DisplayId], main: Option<DisplayId>) -> Vec<Surface> {
    if displays.is_empty() {
        return vec![Surface {
            display: main.unwrap_or(0),
            primary: true,
        }];
    }

    let primary = main
        .filter(|id| displays.contains(id))
        .unwrap_or(displays[0]);

    displays
        .iter()
        .map(|&display| Surface {
            display,
            primary: display == primary,
        })
        .collect()
}

/// Collaborator that owns the on-screen surfaces
pub trait DisplayPresenter {
    /// Cover every display; a second call while presented is a no-op
    fn present_all(&mut self);

    /// Destroy every non-primary surface; a no-op when there are none
    fn dismiss_auxiliary(&mut self);

    /// Render hold progress in `[0, 1]`
    fn show_progress(&mut self, progress: f64);

    /// Animate the indicator back to zero after a cancelled hold
    fn reset_progress(&mut self);

    /// Start the terminal effect; it should finish within `duration`
    fn begin_exit_effect(&mut self, duration: Duration);

    /// Undo any OS-wide cursor hiding
    fn restore_cursor(&mut self);
}

/// The presenter for the running platform
pub fn platform_presenter() -> Box<dyn DisplayPresenter> {
    #[cfg(target_os = "macos")]
    {
        Box::new(CapturedDisplays::new())
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(HeadlessPresenter::new(Vec::new(), None))
    }
}
