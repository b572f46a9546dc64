//! Presenter without a window system
//!
//! Keeps the surface bookkeeping and logs what a windowed presenter would
//! draw. Used on platforms without display capture.

use std::time::Duration;

use tracing::{debug, info};

use super::{plan_surfaces, DisplayId, DisplayPresenter, Surface};

#[derive(Debug, Default)]
pub struct HeadlessPresenter {
    displays: Vec<DisplayId>,
    main: Option<DisplayId>,
    surfaces: Vec<Surface>,
    progress: f64,
    cursor_hidden: bool,
}

impl HeadlessPresenter {
    pub fn new(displays: Vec<DisplayId>, main: Option<DisplayId>) -> Self {
        Self {
            displays,
            main,
            ..Self::default()
        }
    }

    #[cfg(test)]
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    #[cfg(test)]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    #[cfg(test)]
    pub fn cursor_hidden(&self) -> bool {
        self.cursor_hidden
    }
}

impl DisplayPresenter for HeadlessPresenter {
    fn present_all(&mut self) {
        if !self.surfaces.is_empty() {
            debug!("surfaces already presented");
            return;
        }
        self.surfaces = plan_surfaces(&self.displays, self.main);
        self.cursor_hidden = true;
        info!(surfaces = self.surfaces.len(), "displays covered");
    }

    fn dismiss_auxiliary(&mut self) {
        let before = self.surfaces.len();
        self.surfaces.retain(|surface| surface.primary);
        if before != self.surfaces.len() {
            info!(dismissed = before - self.surfaces.len(), "auxiliary surfaces dismissed");
        }
    }

    fn show_progress(&mut self, progress: f64) {
        self.progress = progress.clamp(0.0, 1.0);
    }

    fn reset_progress(&mut self) {
        if self.progress > 0.0 {
            debug!(from = self.progress, "progress reset");
        }
        self.progress = 0.0;
    }

    fn begin_exit_effect(&mut self, duration: Duration) {
        info!(
            duration_ms = duration.as_millis() as u64,
            progress = self.progress,
            "exit effect started"
        );
    }

    fn restore_cursor(&mut self) {
        if self.cursor_hidden {
            debug!("cursor restored");
        }
        self.cursor_hidden = false;
    }
}
