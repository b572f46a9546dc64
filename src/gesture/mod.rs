//! Hold-to-exit gesture detection
//!
//! The detector is a pure state machine fed explicit timestamps; the driver
//! connects it to the input stream and a repeating tick.

mod detector;
mod driver;

pub use driver::{DriverOutcome, GestureDriver};
