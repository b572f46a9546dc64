//! Events emitted by the hold-gesture detector
//!
//! The main loop turns these into presenter updates; they are also logged
//! as structured JSON-able values.

use serde::{Deserialize, Serialize};

/// Observable progress of the hold-to-exit gesture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GestureEvent {
    /// Command+Escape became held together
    HoldStarted,

    /// Hold progress recomputed on a tick
    Progress {
        /// Normalized progress in `[0, 1]`
        value: f64,
    },

    /// One of the keys was released before the hold completed
    HoldCancelled {
        /// How long the combo was held in milliseconds
        held_ms: u64,
    },

    /// The hold completed; the session is over
    Completed {
        /// How long the combo was held in milliseconds
        held_ms: u64,
    },
}

impl std::fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GestureEvent::HoldStarted => write!(f, "HOLD_STARTED"),
            GestureEvent::Progress { value } => write!(f, "PROGRESS ({:.0}%)", value * 100.0),
            GestureEvent::HoldCancelled { held_ms } => {
                write!(f, "HOLD_CANCELLED ({}ms)", held_ms)
            }
            GestureEvent::Completed { held_ms } => write!(f, "COMPLETED ({}ms)", held_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = GestureEvent::HoldCancelled { held_ms: 300 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("hold_cancelled"));
        assert!(json.contains("300"));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"progress","value":0.5}"#;
        let event: GestureEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, GestureEvent::Progress { value: 0.5 });
        assert_eq!(event.to_string(), "PROGRESS (50%)");
    }
}
