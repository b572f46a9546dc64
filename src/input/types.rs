//! Event and mode types shared by every hook strategy

use std::fmt;

use serde::{Deserialize, Serialize};

use super::keys::KeyCode;

/// A single keyboard transition, normalized across hook strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    /// The command modifier changed state
    ModifierChange { command_held: bool },
    /// A non-modifier key went down (auto-repeat included)
    KeyDown { code: KeyCode },
    /// A non-modifier key went up
    KeyUp { code: KeyCode },
}

/// Which installation strategy is feeding events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookMode {
    /// System-wide tap that can suppress events at the source
    GlobalSwallowing,
    /// In-process observer; every event continues on unmodified
    LocalPassthrough,
}

impl HookMode {
    /// Whether this mode is able to keep keys from reaching other apps
    pub fn can_swallow(self) -> bool {
        matches!(self, HookMode::GlobalSwallowing)
    }
}

impl fmt::Display for HookMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookMode::GlobalSwallowing => write!(f, "GlobalSwallowing"),
            HookMode::LocalPassthrough => write!(f, "LocalPassthrough"),
        }
    }
}
