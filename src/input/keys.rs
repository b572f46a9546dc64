//! Key code definitions and keyboard state snapshots
//!
//! Key codes are macOS virtual key codes (`kVK_*`, ANSI layout). A
//! [`KeyboardSnapshot`] records which keys are down at one instant; the
//! polling monitor diffs successive snapshots into [`InputEvent`]s.

use super::types::InputEvent;

/// Hardware-independent virtual key code
pub type KeyCode = u16;

/// Virtual key codes referenced by the app
pub mod codes {
    use super::KeyCode;

    /// Escape, the non-modifier half of the exit combo
    pub const ESCAPE: KeyCode = 53;
    /// Right Command key
    pub const RIGHT_COMMAND: KeyCode = 54;
    /// Left Command key
    pub const COMMAND: KeyCode = 55;
    /// Function (fn / Globe) key, the last modifier code
    pub const FUNCTION: KeyCode = 63;
    /// F1
    pub const F1: KeyCode = 122;
    /// Letter A
    pub const A: KeyCode = 0;
}

/// Number of key codes tracked in a snapshot (codes `0..KEY_CODE_LIMIT`)
pub const KEY_CODE_LIMIT: KeyCode = 128;

/// Modifier keys are reported through `ModifierChange`, never as key events
pub fn is_modifier(code: KeyCode) -> bool {
    (codes::RIGHT_COMMAND..=codes::FUNCTION).contains(&code)
}

/// Keys held down at one instant, plus the command modifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardSnapshot {
    command: bool,
    pressed: u128,
}

impl KeyboardSnapshot {
    /// Empty snapshot with the given command modifier state
    pub fn new(command: bool) -> Self {
        Self { command, pressed: 0 }
    }

    /// Builder form of [`set_pressed`](Self::set_pressed)
    pub fn with_key(mut self, code: KeyCode) -> Self {
        self.set_pressed(code, true);
        self
    }

    /// Record a key as down or up; modifier and out-of-range codes are ignored
    pub fn set_pressed(&mut self, code: KeyCode, down: bool) {
        if code >= KEY_CODE_LIMIT || is_modifier(code) {
            return;
        }
        let bit = 1u128 << code;
        if down {
            self.pressed |= bit;
        } else {
            self.pressed &= !bit;
        }
    }

    pub fn is_pressed(&self, code: KeyCode) -> bool {
        code < KEY_CODE_LIMIT && self.pressed & (1u128 << code) != 0
    }

    #[cfg(test)]
    pub fn command_held(&self) -> bool {
        self.command
    }

    /// Transitions that lead from `previous` to `self`
    ///
    /// A command press is reported before key presses and a command release
    /// after key releases, so a combo pressed within one poll window reads the
    /// same as one pressed slowly.
    pub fn transitions_from(&self, previous: &KeyboardSnapshot) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let modifier_change = (self.command != previous.command).then_some(
            InputEvent::ModifierChange {
                command_held: self.command,
            },
        );

        if self.command {
            events.extend(modifier_change);
        }

        let changed = self.pressed ^ previous.pressed;
        if changed != 0 {
            for code in 0..KEY_CODE_LIMIT {
                if changed & (1u128 << code) == 0 {
                    continue;
                }
                if self.is_pressed(code) {
                    events.push(InputEvent::KeyDown { code });
                } else {
                    events.push(InputEvent::KeyUp { code });
                }
            }
        }

        if !self.command {
            events.extend(modifier_change);
        }

        events
    }
}
