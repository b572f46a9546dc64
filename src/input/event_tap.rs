//! System-wide keyboard hook using a macOS Quartz event tap
//!
//! The tap is created with default (filtering) options so its callback can
//! drop events before any application sees them. It runs on a dedicated
//! thread with its own CFRunLoop. The `core-graphics` tap wrapper cannot
//! subscribe to system-defined events, so the tap itself is created through
//! the raw C API.

use std::cell::Cell;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use core_foundation::base::TCFType;
use core_foundation::mach_port::{CFMachPort, CFMachPortRef};
use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{CGEventFlags, EventField};
use tracing::{debug, info, warn};

use super::hook::{EventSink, HookError, HookHandle, HookStrategy, ThreadHookHandle};
use super::keys::KeyCode;
use super::policy::{self, event_kind, TapAction, Verdict};
use super::types::HookMode;

type CGEventRef = *mut c_void;
type CGEventTapProxy = *mut c_void;
type CGEventTapCallBack =
    unsafe extern "C" fn(CGEventTapProxy, u32, CGEventRef, *mut c_void) -> CGEventRef;

/// `kCGSessionEventTap`
const SESSION_EVENT_TAP: u32 = 1;
/// `kCGHeadInsertEventTap`
const HEAD_INSERT_EVENT_TAP: u32 = 0;
/// `kCGEventTapOptionDefault`: the callback may modify or drop events
const TAP_OPTION_DEFAULT: u32 = 0;

/// How long one run loop slice lasts before the stop flag is rechecked
const RUN_LOOP_SLICE: Duration = Duration::from_millis(100);

const EVENT_MASK: u64 = (1 << event_kind::KEY_DOWN)
    | (1 << event_kind::KEY_UP)
    | (1 << event_kind::FLAGS_CHANGED)
    | (1 << event_kind::SYSTEM_DEFINED);

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: CGEventTapCallBack,
        user_info: *mut c_void,
    ) -> CFMachPortRef;
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
    fn CGEventGetFlags(event: CGEventRef) -> u64;
    fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortInvalidate(port: CFMachPortRef);
}

/// State reachable from the tap callback; only touched on the tap thread
struct TapContext {
    sink: EventSink,
    port: Cell<CFMachPortRef>,
}

/// Global, swallowing hook strategy
#[derive(Debug, Default)]
pub struct EventTapStrategy;

impl EventTapStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl HookStrategy for EventTapStrategy {
    fn mode(&self) -> HookMode {
        HookMode::GlobalSwallowing
    }

    fn install(&mut self, sink: EventSink) -> Result<Box<dyn HookHandle>, HookError> {
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = sync_channel(1);
        let thread_running = Arc::clone(&running);

        let thread = thread::Builder::new()
            .name("input-event-tap".to_string())
            .spawn(move || {
                debug!("event tap thread started");
                run_tap_loop(sink, thread_running, ready_tx);
                debug!("event tap thread stopped");
            })
            .map_err(|e| HookError::ThreadSpawn(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Box::new(ThreadHookHandle::new(running, thread))),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(HookError::ThreadExited)
            }
        }
    }
}

/// Create the tap, report the outcome, then pump the run loop until stopped
fn run_tap_loop(
    sink: EventSink,
    running: Arc<AtomicBool>,
    ready: SyncSender<Result<(), HookError>>,
) {
    let context = Box::into_raw(Box::new(TapContext {
        sink,
        port: Cell::new(ptr::null_mut()),
    }));

    let raw_port = unsafe {
        CGEventTapCreate(
            SESSION_EVENT_TAP,
            HEAD_INSERT_EVENT_TAP,
            TAP_OPTION_DEFAULT,
            EVENT_MASK,
            tap_callback,
            context.cast(),
        )
    };

    if raw_port.is_null() {
        // Expected without Accessibility trust; the caller falls back quietly.
        drop(unsafe { Box::from_raw(context) });
        let _ = ready.send(Err(HookError::EventTapCreation));
        return;
    }

    unsafe { (*context).port.set(raw_port) };
    let port = unsafe { CFMachPort::wrap_under_create_rule(raw_port) };

    let Ok(source) = port.create_runloop_source(0) else {
        unsafe {
            CFMachPortInvalidate(raw_port);
            drop(Box::from_raw(context));
        }
        let _ = ready.send(Err(HookError::RunLoopSource));
        return;
    };

    let run_loop = CFRunLoop::get_current();
    unsafe {
        run_loop.add_source(&source, kCFRunLoopCommonModes);
        CGEventTapEnable(raw_port, true);
    }

    info!("event tap created and enabled");
    let _ = ready.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, RUN_LOOP_SLICE, true);
        }
    }

    // No callback can be executing: they only run inside `run_in_mode` above.
    unsafe {
        CGEventTapEnable(raw_port, false);
        run_loop.remove_source(&source, kCFRunLoopCommonModes);
        CFMachPortInvalidate(raw_port);
        drop(Box::from_raw(context));
    }
}

/// Tap callback; must be fast and never block
unsafe extern "C" fn tap_callback(
    _proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef {
    let context = &*(user_info as *const TapContext);

    let raw = match policy::tap_action(event_type, || key_fields(event)) {
        TapAction::Reenable => {
            warn!(event_type, "event tap disabled by the system, re-enabling");
            let port = context.port.get();
            if !port.is_null() {
                CGEventTapEnable(port, true);
            }
            return event;
        }
        TapAction::Ignore => return event,
        TapAction::Handle(raw) => raw,
    };

    if let Some(input) = raw.to_input() {
        context.sink.deliver(input);
    }

    match policy::verdict(HookMode::GlobalSwallowing, raw) {
        Verdict::Forward => event,
        Verdict::Suppress => ptr::null_mut(),
    }
}

/// Keycode and Command flag of a keyboard event
unsafe fn key_fields(event: CGEventRef) -> (KeyCode, bool) {
    let flags = CGEventFlags::from_bits_truncate(CGEventGetFlags(event));
    let code = CGEventGetIntegerValueField(event, EventField::KEYBOARD_EVENT_KEYCODE) as KeyCode;
    (code, flags.contains(CGEventFlags::CGEventFlagCommand))
}
