//! Suppression policy for the global event tap
//!
//! Decides, per raw OS event, whether the hook forwards it to the rest of the
//! system or swallows it. Exactly one combination is allowed through while
//! swallowing: Escape with Command held, so the hold-to-exit gesture still
//! reaches the session.

use super::keys::{codes, KeyCode};
use super::types::{HookMode, InputEvent};

/// Raw event classes seen by a system-wide tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawEvent {
    KeyDown { code: KeyCode, command_held: bool },
    KeyUp { code: KeyCode, command_held: bool },
    FlagsChanged { command_held: bool },
    /// Media, brightness and other "system-defined" keys
    SystemDefined,
}

/// What the hook does with a raw event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Forward,
    Suppress,
}

/// Raw `CGEventType` values seen by the tap callback
pub mod event_kind {
    pub const KEY_DOWN: u32 = 10;
    pub const KEY_UP: u32 = 11;
    pub const FLAGS_CHANGED: u32 = 12;
    /// `NX_SYSDEFINED`: media, brightness and volume keys
    pub const SYSTEM_DEFINED: u32 = 14;
    pub const TAP_DISABLED_BY_TIMEOUT: u32 = 0xFFFF_FFFE;
    pub const TAP_DISABLED_BY_USER_INPUT: u32 = 0xFFFF_FFFF;
}

/// First decision the tap callback makes for an incoming event type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAction {
    /// The OS disabled the tap; turn it back on and pass the event along
    Reenable,
    /// A keyboard event to deliver and then judge with [`verdict`]
    Handle(RawEvent),
    /// Not a type the tap subscribes to; pass it along untouched
    Ignore,
}

/// Classify a raw event type
///
/// `fields` reads the keycode and the Command flag from the event. It is only
/// called for event types that carry them.
pub fn tap_action(event_type: u32, fields: impl FnOnce() -> (KeyCode, bool)) -> TapAction {
    match event_type {
        event_kind::TAP_DISABLED_BY_TIMEOUT | event_kind::TAP_DISABLED_BY_USER_INPUT => {
            TapAction::Reenable
        }
        event_kind::KEY_DOWN => {
            let (code, command_held) = fields();
            TapAction::Handle(RawEvent::KeyDown { code, command_held })
        }
        event_kind::KEY_UP => {
            let (code, command_held) = fields();
            TapAction::Handle(RawEvent::KeyUp { code, command_held })
        }
        event_kind::FLAGS_CHANGED => {
            let (_, command_held) = fields();
            TapAction::Handle(RawEvent::FlagsChanged { command_held })
        }
        event_kind::SYSTEM_DEFINED => TapAction::Handle(RawEvent::SystemDefined),
        _ => TapAction::Ignore,
    }
}

impl RawEvent {
    /// The normalized event delivered to the gesture detector, if any
    pub fn to_input(self) -> Option<InputEvent> {
        match self {
            RawEvent::KeyDown { code, .. } => Some(InputEvent::KeyDown { code }),
            RawEvent::KeyUp { code, .. } => Some(InputEvent::KeyUp { code }),
            RawEvent::FlagsChanged { command_held } => {
                Some(InputEvent::ModifierChange { command_held })
            }
            RawEvent::SystemDefined => None,
        }
    }
}

/// Decide whether `event` continues past the hook
pub fn verdict(mode: HookMode, event: RawEvent) -> Verdict {
    if !mode.can_swallow() {
        return Verdict::Forward;
    }

    match event {
        RawEvent::KeyDown { code, command_held } | RawEvent::KeyUp { code, command_held }
            if code == codes::ESCAPE && command_held =>
        {
            Verdict::Forward
        }
        RawEvent::KeyDown { .. }
        | RawEvent::KeyUp { .. }
        | RawEvent::FlagsChanged { .. }
        | RawEvent::SystemDefined => Verdict::Suppress,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLOBAL: HookMode = HookMode::GlobalSwallowing;
    const LOCAL: HookMode = HookMode::LocalPassthrough;

    #[test]
    fn test_escape_with_command_is_forwarded() {
        let down = RawEvent::KeyDown { code: codes::ESCAPE, command_held: true };
        let up = RawEvent::KeyUp { code: codes::ESCAPE, command_held: true };
        assert_eq!(verdict(GLOBAL, down), Verdict::Forward);
        assert_eq!(verdict(GLOBAL, up), Verdict::Forward);
    }

    #[test]
    fn test_escape_without_command_is_suppressed() {
        let down = RawEvent::KeyDown { code: codes::ESCAPE, command_held: false };
        assert_eq!(verdict(GLOBAL, down), Verdict::Suppress);
    }

    #[test]
    fn test_other_keys_always_suppressed() {
        for code in [codes::A, codes::F1, 36, 49] {
            for command_held in [false, true] {
                assert_eq!(
                    verdict(GLOBAL, RawEvent::KeyDown { code, command_held }),
                    Verdict::Suppress,
                    "key {code} command={command_held}"
                );
                assert_eq!(
                    verdict(GLOBAL, RawEvent::KeyUp { code, command_held }),
                    Verdict::Suppress
                );
            }
        }
    }

    #[test]
    fn test_modifier_and_system_events_suppressed() {
        assert_eq!(
            verdict(GLOBAL, RawEvent::FlagsChanged { command_held: true }),
            Verdict::Suppress
        );
        assert_eq!(verdict(GLOBAL, RawEvent::SystemDefined), Verdict::Suppress);
    }

    #[test]
    fn test_passthrough_forwards_everything() {
        let events = [
            RawEvent::KeyDown { code: codes::A, command_held: false },
            RawEvent::KeyUp { code: codes::ESCAPE, command_held: false },
            RawEvent::FlagsChanged { command_held: true },
            RawEvent::SystemDefined,
        ];
        for event in events {
            assert_eq!(verdict(LOCAL, event), Verdict::Forward);
        }
    }

    #[test]
    fn test_disabled_tap_is_reenabled_without_reading_fields() {
        for event_type in [
            event_kind::TAP_DISABLED_BY_TIMEOUT,
            event_kind::TAP_DISABLED_BY_USER_INPUT,
        ] {
            let action = tap_action(event_type, || panic!("disabled notice has no key fields"));
            assert_eq!(action, TapAction::Reenable);
        }
    }

    #[test]
    fn test_key_events_are_handled() {
        assert_eq!(
            tap_action(event_kind::KEY_DOWN, || (codes::ESCAPE, true)),
            TapAction::Handle(RawEvent::KeyDown { code: codes::ESCAPE, command_held: true })
        );
        assert_eq!(
            tap_action(event_kind::KEY_UP, || (codes::A, false)),
            TapAction::Handle(RawEvent::KeyUp { code: codes::A, command_held: false })
        );
        assert_eq!(
            tap_action(event_kind::FLAGS_CHANGED, || (codes::COMMAND, true)),
            TapAction::Handle(RawEvent::FlagsChanged { command_held: true })
        );
        assert_eq!(
            tap_action(event_kind::SYSTEM_DEFINED, || panic!("no key fields")),
            TapAction::Handle(RawEvent::SystemDefined)
        );
    }

    #[test]
    fn test_unsubscribed_types_are_ignored() {
        // mouse moved
        assert_eq!(tap_action(5, || panic!("no key fields")), TapAction::Ignore);
    }

    #[test]
    fn test_system_defined_has_no_input_event() {
        assert_eq!(RawEvent::SystemDefined.to_input(), None);
        assert_eq!(
            RawEvent::FlagsChanged { command_held: false }.to_input(),
            Some(InputEvent::ModifierChange { command_held: false })
        );
    }
}
