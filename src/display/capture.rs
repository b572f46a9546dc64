//! Display capture presenter for macOS
//!
//! Captures every active display, which blanks it to black and keeps other
//! apps from drawing over it. The progress indicator is drawn straight into
//! the primary display's capture context.

use std::time::Duration;

use core_graphics::display::CGDisplay;
use core_graphics::geometry::{CGPoint, CGRect, CGSize};
use tracing::{debug, info, warn};

use super::{plan_surfaces, DisplayId, DisplayPresenter, Surface};

type CGError = i32;
type CGContextRef = *mut std::ffi::c_void;
type FadeToken = u32;

const CG_SUCCESS: CGError = 0;
/// `kCGDisplayBlendNormal`
const BLEND_NORMAL: f32 = 0.0;
/// `kCGDisplayBlendSolidColor`
const BLEND_SOLID: f32 = 1.0;
/// Height of the progress bar in points
const PROGRESS_BAR_HEIGHT: f64 = 6.0;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGDisplayCapture(display: DisplayId) -> CGError;
    fn CGDisplayRelease(display: DisplayId) -> CGError;
    fn CGDisplayHideCursor(display: DisplayId) -> CGError;
    fn CGDisplayShowCursor(display: DisplayId) -> CGError;
    fn CGDisplayGetDrawingContext(display: DisplayId) -> CGContextRef;
    fn CGContextSetRGBFillColor(context: CGContextRef, red: f64, green: f64, blue: f64, alpha: f64);
    fn CGContextFillRect(context: CGContextRef, rect: CGRect);
    fn CGContextFlush(context: CGContextRef);
    fn CGAcquireDisplayFadeReservation(seconds: f32, token: *mut FadeToken) -> CGError;
    fn CGDisplayFade(
        token: FadeToken,
        duration: f32,
        start_blend: f32,
        end_blend: f32,
        red: f32,
        green: f32,
        blue: f32,
        synchronous: u32,
    ) -> CGError;
    fn CGReleaseDisplayFadeReservation(token: FadeToken) -> CGError;
}

/// Presenter backed by `CGDisplayCapture`
#[derive(Debug, Default)]
pub struct CapturedDisplays {
    surfaces: Vec<Surface>,
    cursor_hidden_on: Option<DisplayId>,
    fade: Option<FadeToken>,
}

impl CapturedDisplays {
    pub fn new() -> Self {
        Self::default()
    }

    fn primary(&self) -> Option<DisplayId> {
        self.surfaces.iter().find(|s| s.primary).map(|s| s.display)
    }

    fn draw_progress(&self, progress: f64) {
        let Some(display) = self.primary() else {
            return;
        };

        let context = unsafe { CGDisplayGetDrawingContext(display) };
        if context.is_null() {
            return;
        }

        let size = CGDisplay::new(display).bounds().size;
        let track = CGRect::new(
            &CGPoint::new(0.0, 0.0),
            &CGSize::new(size.width, PROGRESS_BAR_HEIGHT),
        );
        let bar = CGRect::new(
            &CGPoint::new(0.0, 0.0),
            &CGSize::new(size.width * progress, PROGRESS_BAR_HEIGHT),
        );

        unsafe {
            CGContextSetRGBFillColor(context, 0.0, 0.0, 0.0, 1.0);
            CGContextFillRect(context, track);
            CGContextSetRGBFillColor(context, 1.0, 1.0, 1.0, 1.0);
            CGContextFillRect(context, bar);
            CGContextFlush(context);
        }
    }
}

impl DisplayPresenter for CapturedDisplays {
    fn present_all(&mut self) {
        if !self.surfaces.is_empty() {
            debug!("displays already captured");
            return;
        }

        let displays = CGDisplay::active_displays().unwrap_or_else(|e| {
            warn!(?e, "failed to list displays, using the main display");
            Vec::new()
        });
        let main = CGDisplay::main().id;

        for surface in plan_surfaces(&displays, Some(main)) {
            let result = unsafe { CGDisplayCapture(surface.display) };
            if result != CG_SUCCESS {
                warn!(display = surface.display, result, "failed to capture display");
                continue;
            }
            self.surfaces.push(surface);
        }

        if let Some(primary) = self.primary() {
            if unsafe { CGDisplayHideCursor(primary) } == CG_SUCCESS {
                self.cursor_hidden_on = Some(primary);
            }
        }

        info!(surfaces = self.surfaces.len(), "displays captured");
    }

    fn dismiss_auxiliary(&mut self) {
        self.surfaces.retain(|surface| {
            if surface.primary {
                return true;
            }
            unsafe { CGDisplayRelease(surface.display) };
            debug!(display = surface.display, "auxiliary display released");
            false
        });
    }

    fn show_progress(&mut self, progress: f64) {
        self.draw_progress(progress.clamp(0.0, 1.0));
    }

    fn reset_progress(&mut self) {
        self.draw_progress(0.0);
    }

    fn begin_exit_effect(&mut self, duration: Duration) {
        let seconds = duration.as_secs_f32();
        let mut token: FadeToken = 0;

        // The reservation outlives the fade so the OS lifts it shortly after exit.
        let reserved = unsafe { CGAcquireDisplayFadeReservation(seconds * 2.0, &mut token) };
        if reserved != CG_SUCCESS {
            warn!(result = reserved, "display fade unavailable");
            return;
        }

        unsafe {
            CGDisplayFade(token, seconds, BLEND_NORMAL, BLEND_SOLID, 0.0, 0.0, 0.0, 0);
        }
        self.fade = Some(token);
    }

    fn restore_cursor(&mut self) {
        if let Some(display) = self.cursor_hidden_on.take() {
            unsafe { CGDisplayShowCursor(display) };
        }
    }
}

impl Drop for CapturedDisplays {
    fn drop(&mut self) {
        self.restore_cursor();
        for surface in self.surfaces.drain(..) {
            unsafe { CGDisplayRelease(surface.display) };
        }
        if let Some(token) = self.fade.take() {
            unsafe {
                CGDisplayFade(token, 0.3, BLEND_SOLID, BLEND_NORMAL, 0.0, 0.0, 0.0, 0);
                CGReleaseDisplayFadeReservation(token);
            }
        }
    }
}
